#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod config;
pub mod content;
pub mod data;
pub mod github;
pub mod loader;
pub mod logging;
pub mod page;
pub mod present;
pub mod toc;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
