//! Drives a running fraud scan server over HTTP. Start the server with a
//! trained model, then run `cargo test -p e2e -- --ignored`.

pub mod client;
pub mod util;
