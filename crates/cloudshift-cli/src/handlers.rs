//! Command handlers for CLI subcommands
//!
//! Each subcommand has its own module; shared catalog and request helpers
//! live in `utils`.

mod catalog;
mod completions;
mod config;
mod detect;
mod transform;
mod utils;

pub use catalog::handle_catalog;
pub use completions::handle_completions;
pub use config::handle_config;
pub use detect::handle_detect;
pub use transform::handle_transform;
