//! discodj Console
//!
//! Drives the playback core from a terminal. Voice, the message channel and
//! presence are simulated in-process; resolution and persistence are real.

#![forbid(unsafe_code)]

pub mod commands;
pub mod config;
pub mod error;
pub mod session;
pub mod signal;
pub mod sim;

pub use commands::{parse_line, Command};
pub use config::ConsoleConfig;
pub use error::{ConsoleError, Result};
pub use session::{Outcome, Session};
pub use signal::shutdown_signal;
