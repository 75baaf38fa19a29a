//! Terminal output.
//!
//! Format-only: every function here turns domain values into text.

pub mod console;
pub mod tables;

pub use console::{ConsoleEmitter, format_event};
pub use tables::{format_voice_row, print_separator, truncate_string};
