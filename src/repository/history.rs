use std::path::PathBuf;

use eyre::{Result, WrapErr};
use log::debug;

use types::table::Table;

/// One CSV per user holding their most recent scored upload.
#[derive(Clone)]
pub struct HistoryRepository {
    dir: PathBuf,
}

/// `@` becomes `_at_`; path separators become `_`.
pub fn history_file_name(email: &str) -> String {
    let safe = email.replace('@', "_at_").replace(['/', '\\'], "_");
    format!("{}.csv", safe)
}

impl HistoryRepository {
    pub fn new(dir: PathBuf) -> Self {
        HistoryRepository { dir }
    }

    pub fn path_for(&self, email: &str) -> PathBuf {
        self.dir.join(history_file_name(email))
    }

    /// Overwrites whatever was stored for `email`.
    pub fn save(&self, email: &str, table: &Table) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .wrap_err_with(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.path_for(email);
        table.write_to_path(&path)?;
        debug!("saved {} rows of history to {}", table.height(), path.display());
        Ok(())
    }

    pub fn load(&self, email: &str) -> Result<Option<Table>> {
        let path = self.path_for(email);
        if !path.exists() {
            return Ok(None);
        }
        Table::from_path(&path).map(Some)
    }

    /// Raw bytes of the stored file, for download.
    pub fn load_bytes(&self, email: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(email);
        if !path.exists() {
            return Ok(None);
        }
        std::fs::read(&path)
            .map(Some)
            .wrap_err_with(|| format!("Failed to read {}", path.display()))
    }
}
