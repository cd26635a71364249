//! Progress reporting while querying models row by row

/// Progress callback for tracking collection
pub trait ProgressCallback: Send + Sync {
    fn on_model_start(&self, model: &str, total_rows: usize);
    fn on_row_complete(&self, model: &str, row: usize, success: bool);
    fn on_model_complete(&self, model: &str, failures: usize, total_rows: usize);
}

/// Default no-op progress callback
pub struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_model_start(&self, _model: &str, _total_rows: usize) {}
    fn on_row_complete(&self, _model: &str, _row: usize, _success: bool) {}
    fn on_model_complete(&self, _model: &str, _failures: usize, _total_rows: usize) {}
}

/// Console progress callback
pub struct ConsoleProgress;

impl ProgressCallback for ConsoleProgress {
    fn on_model_start(&self, model: &str, total_rows: usize) {
        println!("Querying model: {} ({} rows)", model, total_rows);
    }

    fn on_row_complete(&self, model: &str, row: usize, success: bool) {
        let status = if success { "OK" } else { "ERROR" };
        println!("  [{}] row {} on {}", status, row + 1, model);
    }

    fn on_model_complete(&self, model: &str, failures: usize, total_rows: usize) {
        println!(
            "Finished {}: {}/{} rows answered",
            model,
            total_rows - failures,
            total_rows
        );
    }
}
