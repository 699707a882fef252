use std::sync::Arc;

use eyre::{ensure, Result};
use log::info;

use types::error::Error;
use types::model::ModelArtifact;
use types::table::Table;

use crate::domain::report::Report;
use crate::repository::history::HistoryRepository;
use crate::service::reporting::build_report;
use crate::service::scoring::score;

/// Upload, history and download for a signed-in user.
#[derive(Clone)]
pub struct ScanService {
    pub model: Arc<ModelArtifact>,
    pub history_repository: HistoryRepository,
}

impl ScanService {
    /// Parses and scores `body`, stores the scored table as the user's history,
    /// and returns the report. Nothing is stored when scoring fails.
    pub fn upload(&self, email: &str, body: &[u8]) -> Result<Report> {
        ensure!(!body.iter().all(u8::is_ascii_whitespace), Error::EmptyUpload);
        let upload = Table::from_reader(body)?;
        let scored = score(&upload, self.model.as_ref())?;
        let report = build_report(&upload, &scored, self.model.as_ref())?;
        self.history_repository.save(email, &scored.table)?;
        info!(
            "scored {} rows for {} with {} model",
            upload.height(),
            email,
            self.model.kind()
        );
        Ok(report)
    }

    pub fn history(&self, email: &str) -> Result<Option<Table>> {
        self.history_repository.load(email)
    }

    pub fn download(&self, email: &str) -> Result<Option<Vec<u8>>> {
        self.history_repository.load_bytes(email)
    }
}
