//! Library half of the `reckon` binary, split out so commands can be tested

pub mod cli;
pub mod settings;
