pub mod credentials;
pub mod history;
pub mod sessions;
