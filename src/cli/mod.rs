//! Command-line interface.

mod args;
pub mod minify;
pub mod serve;

pub use args::{Cli, Commands, MinifyArgs, ServeArgs, SwitchArgs};
