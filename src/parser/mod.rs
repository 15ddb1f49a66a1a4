// Request parser for the dashboard shell

pub mod lexer;
pub mod request;

// Public API re-exports
pub use request::{parse_command, parse_request, ShellCommand};
