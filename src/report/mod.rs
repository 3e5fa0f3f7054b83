pub mod commands;
pub mod formatters;

pub use formatters::{Explorer, OutputFormat};
