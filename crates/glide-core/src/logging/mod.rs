//! Logger initialisation for glide binaries.
//!
//! Library code only uses the `log` facade; a binary calls
//! [`init_logging`] once, early in `main`.

mod init;

pub use init::{LoggingConfig, init_logging};
