// Library surface for the binary, headless/integration tests and reuse.
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod cursor;
pub mod deviation;
pub mod entry_policy;
pub mod error;
pub mod ledger;
pub mod line;
pub mod logging;
pub mod outline;
pub mod profile;
pub mod project;
pub mod rangefinder;
pub mod report;
pub mod runtime;
pub mod session;
pub mod ui;

pub use error::{Error, Result};
