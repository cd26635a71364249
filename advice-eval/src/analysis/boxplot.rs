//! Grouped boxplots rendered as SVG
//!
//! Quartiles use linear interpolation between order statistics. Whiskers
//! reach the most extreme observation within 1.5 IQR of the box; anything
//! beyond is drawn as an outlier.

use std::fmt::Write as _;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

const WIDTH: f64 = 900.0;
const HEIGHT: f64 = 560.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 170.0;
const Y_TICKS: usize = 5;
const PALETTE: &[&str] = &[
    "#4c72b0", "#dd8452", "#55a868", "#c44e52", "#8172b3", "#937860", "#da8bc3", "#8c8c8c",
];

/// Five-number summary of one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxStats {
    pub label: String,
    pub count: usize,
    pub mean: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_low: f64,
    pub whisker_high: f64,
    pub outliers: Vec<f64>,
}

/// Quantile with linear interpolation; `sorted` must be ascending and non-empty
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = (sorted.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

impl BoxStats {
    /// Summarize `values`; `None` for an empty group
    pub fn from_values(label: impl Into<String>, values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let q1 = quantile(&sorted, 0.25);
        let median = quantile(&sorted, 0.5);
        let q3 = quantile(&sorted, 0.75);
        let iqr = q3 - q1;
        let (fence_low, fence_high) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

        let inside: Vec<f64> = sorted
            .iter()
            .copied()
            .filter(|v| *v >= fence_low && *v <= fence_high)
            .collect();
        let outliers = sorted
            .iter()
            .copied()
            .filter(|v| *v < fence_low || *v > fence_high)
            .collect();

        Some(Self {
            label: label.into(),
            count: sorted.len(),
            mean: sorted.iter().sum::<f64>() / sorted.len() as f64,
            q1,
            median,
            q3,
            whisker_low: inside.first().copied().unwrap_or(q1),
            whisker_high: inside.last().copied().unwrap_or(q3),
            outliers,
        })
    }
}

/// A titled set of box summaries sharing one y axis
#[derive(Debug, Clone, PartialEq)]
pub struct Boxplot {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub boxes: Vec<BoxStats>,
}

impl Boxplot {
    /// Build from grouped values; empty groups are skipped
    pub fn from_groups(
        title: impl Into<String>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
        groups: &IndexMap<String, Vec<f64>>,
    ) -> Self {
        Self {
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            boxes: groups
                .iter()
                .filter_map(|(label, values)| BoxStats::from_values(label.clone(), values))
                .collect(),
        }
    }

    fn value_range(&self) -> (f64, f64) {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for b in &self.boxes {
            lo = lo.min(b.whisker_low);
            hi = hi.max(b.whisker_high);
            for &o in &b.outliers {
                lo = lo.min(o);
                hi = hi.max(o);
            }
        }
        if !lo.is_finite() || !hi.is_finite() {
            return (0.0, 1.0);
        }
        if (hi - lo).abs() < f64::EPSILON {
            return (lo - 1.0, hi + 1.0);
        }
        let pad = (hi - lo) * 0.05;
        (lo - pad, hi + pad)
    }

    /// Render the plot as a standalone SVG document
    pub fn to_svg(&self) -> String {
        let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        let (lo, hi) = self.value_range();
        let y = |v: f64| MARGIN_TOP + plot_h * (1.0 - (v - lo) / (hi - lo));

        let mut svg = String::new();
        // Writing into a String cannot fail
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif" font-size="12">"#,
            w = WIDTH,
            h = HEIGHT
        );
        let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle" font-size="16">{}</text>"#,
            WIDTH / 2.0,
            MARGIN_TOP / 2.0 + 6.0,
            escape(&self.title)
        );

        // Axes and y ticks
        let _ = writeln!(
            svg,
            r#"<line x1="{x}" y1="{t}" x2="{x}" y2="{b}" stroke="black"/><line x1="{x}" y1="{b}" x2="{r}" y2="{b}" stroke="black"/>"#,
            x = MARGIN_LEFT,
            t = MARGIN_TOP,
            b = MARGIN_TOP + plot_h,
            r = MARGIN_LEFT + plot_w
        );
        for i in 0..=Y_TICKS {
            let v = lo + (hi - lo) * i as f64 / Y_TICKS as f64;
            let ty = y(v);
            let _ = writeln!(
                svg,
                r##"<line x1="{x0}" y1="{ty:.1}" x2="{x1}" y2="{ty:.1}" stroke="#dddddd"/><text x="{lx}" y="{ly:.1}" text-anchor="end">{v:.2}</text>"##,
                x0 = MARGIN_LEFT,
                x1 = MARGIN_LEFT + plot_w,
                lx = MARGIN_LEFT - 6.0,
                ly = ty + 4.0,
            );
        }
        let _ = writeln!(
            svg,
            r#"<text x="20" y="{cy}" text-anchor="middle" transform="rotate(-90 20 {cy})">{}</text>"#,
            escape(&self.y_label),
            cy = MARGIN_TOP + plot_h / 2.0
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle">{}</text>"#,
            MARGIN_LEFT + plot_w / 2.0,
            HEIGHT - 10.0,
            escape(&self.x_label)
        );

        let slot = plot_w / self.boxes.len().max(1) as f64;
        let box_w = (slot * 0.6).min(80.0);

        for (i, b) in self.boxes.iter().enumerate() {
            let cx = MARGIN_LEFT + slot * (i as f64 + 0.5);
            let left = cx - box_w / 2.0;
            let color = PALETTE[i % PALETTE.len()];

            // Whiskers and caps
            let _ = writeln!(
                svg,
                r#"<line x1="{cx:.1}" y1="{a:.1}" x2="{cx:.1}" y2="{q3:.1}" stroke="black"/><line x1="{cx:.1}" y1="{q1:.1}" x2="{cx:.1}" y2="{z:.1}" stroke="black"/>"#,
                a = y(b.whisker_high),
                q3 = y(b.q3),
                q1 = y(b.q1),
                z = y(b.whisker_low),
            );
            for w in [b.whisker_low, b.whisker_high] {
                let _ = writeln!(
                    svg,
                    r#"<line x1="{:.1}" y1="{wy:.1}" x2="{:.1}" y2="{wy:.1}" stroke="black"/>"#,
                    cx - box_w / 4.0,
                    cx + box_w / 4.0,
                    wy = y(w)
                );
            }

            // Box and median
            let _ = writeln!(
                svg,
                r#"<rect x="{left:.1}" y="{top:.1}" width="{box_w:.1}" height="{h:.1}" fill="{color}" stroke="black"/>"#,
                top = y(b.q3),
                h = (y(b.q1) - y(b.q3)).max(1.0),
            );
            let _ = writeln!(
                svg,
                r#"<line x1="{left:.1}" y1="{my:.1}" x2="{right:.1}" y2="{my:.1}" stroke="black" stroke-width="2"/>"#,
                right = left + box_w,
                my = y(b.median),
            );

            for &o in &b.outliers {
                let _ = writeln!(
                    svg,
                    r#"<circle cx="{cx:.1}" cy="{:.1}" r="3" fill="none" stroke="black"/>"#,
                    y(o)
                );
            }

            // Rotated x label
            let lx = cx;
            let ly = MARGIN_TOP + plot_h + 14.0;
            let _ = writeln!(
                svg,
                r#"<text x="{lx:.1}" y="{ly:.1}" text-anchor="end" transform="rotate(-45 {lx:.1} {ly:.1})">{}</text>"#,
                escape(&b.label)
            );
        }

        svg.push_str("</svg>\n");
        svg
    }

    /// Write the SVG, creating parent directories when needed
    pub fn write_svg(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_svg())
    }

    /// Plain-text summary table for the console
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.title);
        let _ = writeln!(out, "{:-<96}", "");
        let _ = writeln!(
            out,
            "{:<40} {:>6} {:>9} {:>9} {:>9} {:>9} {:>9}",
            self.x_label, "n", "min", "q1", "median", "q3", "max"
        );
        let _ = writeln!(out, "{:-<96}", "");
        for b in &self.boxes {
            let _ = writeln!(
                out,
                "{:<40} {:>6} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>9.2}",
                truncate(&b.label, 40),
                b.count,
                b.whisker_low,
                b.q1,
                b.median,
                b.q3,
                b.whisker_high
            );
        }
        let _ = writeln!(out, "{:-<96}", "");
        out
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut t: String = s.chars().take(max - 1).collect();
        t.push('…');
        t
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantiles_interpolate() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&sorted, 0.25), 1.75);
        assert_eq!(quantile(&sorted, 0.5), 2.5);
        assert_eq!(quantile(&sorted, 0.75), 3.25);
    }

    #[test]
    fn test_outliers_fall_outside_whiskers() {
        let stats = BoxStats::from_values("m", &[1.0, 2.0, 3.0, 4.0, 5.0, 100.0]).unwrap();
        assert_eq!(stats.outliers, vec![100.0]);
        assert_eq!(stats.whisker_high, 5.0);
        assert_eq!(stats.whisker_low, 1.0);
        assert_eq!(stats.count, 6);
    }

    #[test]
    fn test_empty_group_is_skipped() {
        let mut groups = IndexMap::new();
        groups.insert("a".to_string(), vec![1.0, 2.0]);
        groups.insert("b".to_string(), vec![]);
        let plot = Boxplot::from_groups("t", "Model", "Score", &groups);
        assert_eq!(plot.boxes.len(), 1);
    }

    #[test]
    fn test_svg_contains_escaped_labels_and_one_box_per_group() {
        let mut groups = IndexMap::new();
        groups.insert("gpt <mini> & co".to_string(), vec![1.0, 2.0, 3.0]);
        groups.insert("llama".to_string(), vec![2.0, 2.0, 2.0]);
        let svg = Boxplot::from_groups("Reading ease by model", "Model", "ReadingEase", &groups).to_svg();

        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains("gpt &lt;mini&gt; &amp; co"));
        assert_eq!(svg.matches("<rect x=").count(), 2);
    }

    #[test]
    fn test_write_svg_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plots/nested/box.svg");
        let mut groups = IndexMap::new();
        groups.insert("a".to_string(), vec![1.0]);

        Boxplot::from_groups("t", "x", "y", &groups).write_svg(&path).unwrap();
        assert!(path.exists());
    }
}
