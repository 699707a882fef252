pub mod auth;
pub mod charts;
pub mod reporting;
pub mod scan;
pub mod scoring;
