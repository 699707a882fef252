use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use eyre::{eyre, Result, WrapErr};
use log::{debug, warn};

/// `email -> hex sha256(password)`, stored as one JSON object.
pub type Credentials = BTreeMap<String, String>;

/// Missing, empty and undecodable files all read as an empty store.
fn read_credentials(path: &Path) -> Result<Credentials> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Credentials::new()),
        Err(e) => {
            return Err(e).wrap_err_with(|| format!("Failed to read {}", path.display()));
        }
    };
    if content.trim().is_empty() {
        return Ok(Credentials::new());
    }
    match serde_json::from_str(&content) {
        Ok(credentials) => Ok(credentials),
        Err(e) => {
            warn!("ignoring unreadable credential file {}: {}", path.display(), e);
            Ok(Credentials::new())
        }
    }
}

/// Rewrites the whole file through a sibling temp file.
fn write_credentials(path: &Path, credentials: &Credentials) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let staging = path.with_extension("json.tmp");
    std::fs::write(&staging, serde_json::to_vec(credentials)?)
        .wrap_err_with(|| format!("Failed to write {}", staging.display()))?;
    std::fs::rename(&staging, path)
        .wrap_err_with(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

#[cfg_attr(test, faux::create)]
#[derive(Clone)]
pub struct CredentialRepository {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

#[cfg_attr(test, faux::methods)]
impl CredentialRepository {
    pub fn new(path: PathBuf) -> Self {
        CredentialRepository {
            path,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn get_hash(&self, email: String) -> Result<Option<String>> {
        Ok(read_credentials(&self.path)?.remove(&email))
    }

    pub fn exists(&self, email: String) -> Result<bool> {
        Ok(read_credentials(&self.path)?.contains_key(&email))
    }

    /// Inserts unless the email is already taken. Returns whether it inserted.
    pub fn insert(&self, email: String, password_hash: String) -> Result<bool> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| eyre!("Credential lock poisoned: {}", e))?;
        let mut credentials = read_credentials(&self.path)?;
        if credentials.contains_key(&email) {
            debug!("{} is already registered", email);
            return Ok(false);
        }
        credentials.insert(email, password_hash);
        write_credentials(&self.path, &credentials)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn repository(dir: &tempfile::TempDir) -> CredentialRepository {
        CredentialRepository::new(dir.path().join("users.json"))
    }

    #[test]
    fn test_insert_once_per_email() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let repository = repository(&dir);
        assert!(repository.insert("a@x.com".to_string(), "h1".to_string())?);
        assert!(!repository.insert("a@x.com".to_string(), "h2".to_string())?);
        assert_eq!(
            repository.get_hash("a@x.com".to_string())?,
            Some("h1".to_string())
        );
        Ok(())
    }

    #[test]
    fn test_file_is_a_flat_json_object() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let repository = repository(&dir);
        repository.insert("a@x.com".to_string(), "h1".to_string())?;
        repository.insert("b@x.com".to_string(), "h2".to_string())?;
        let content = std::fs::read_to_string(dir.path().join("users.json"))?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        assert_eq!(value, serde_json::json!({"a@x.com": "h1", "b@x.com": "h2"}));
        Ok(())
    }

    #[rstest]
    #[case("")]
    #[case("   \n")]
    #[case("{not json")]
    #[case("[1, 2, 3]")]
    fn test_unreadable_store_is_empty(#[case] content: &str) -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("users.json"), content)?;
        let repository = repository(&dir);
        assert!(!repository.exists("a@x.com".to_string())?);
        assert!(repository.insert("a@x.com".to_string(), "h1".to_string())?);
        assert!(repository.exists("a@x.com".to_string())?);
        Ok(())
    }

    #[test]
    fn test_missing_file_is_empty() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let repository =
            CredentialRepository::new(dir.path().join("nested").join("users.json"));
        assert_eq!(repository.get_hash("a@x.com".to_string())?, None);
        assert!(repository.insert("a@x.com".to_string(), "h1".to_string())?);
        Ok(())
    }

    #[test]
    fn test_no_cache_between_calls() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let repository = repository(&dir);
        repository.insert("a@x.com".to_string(), "h1".to_string())?;
        std::fs::write(dir.path().join("users.json"), r#"{"b@x.com":"h2"}"#)?;
        assert!(!repository.exists("a@x.com".to_string())?);
        assert!(repository.exists("b@x.com".to_string())?);
        Ok(())
    }
}
