use std::path::PathBuf;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_USERS_PATH: &str = "users.json";
pub const DEFAULT_HISTORY_DIR: &str = "history";
pub const DEFAULT_MODEL_PATH: &str = "model/fraud_model.json";
pub const DEFAULT_STATIC_DIR: &str = "static";
/// Largest accepted upload body, in bytes.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind_addr: String,
    pub users_path: PathBuf,
    pub history_dir: PathBuf,
    pub model_path: PathBuf,
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads each setting through `lookup`, falling back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let path = |key: &str, default: &str| PathBuf::from(value(key, default));
        Config {
            bind_addr: value("FRAUD_BIND_ADDR", DEFAULT_BIND_ADDR),
            users_path: path("FRAUD_USERS_PATH", DEFAULT_USERS_PATH),
            history_dir: path("FRAUD_HISTORY_DIR", DEFAULT_HISTORY_DIR),
            model_path: path("FRAUD_MODEL_PATH", DEFAULT_MODEL_PATH),
            static_dir: path("FRAUD_STATIC_DIR", DEFAULT_STATIC_DIR),
            max_upload_bytes: lookup("FRAUD_MAX_UPLOAD_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        }
    }
}
