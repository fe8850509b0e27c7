//! Line oriented front end for `blockvfs`: splits input lines into commands,
//! runs them against one file system and prints what happened.
mod parse;
mod shell;

pub use crate::parse::{parse, Command, ParseError};
pub use crate::shell::{run_script, Shell};
