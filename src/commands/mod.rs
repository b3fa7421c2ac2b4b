// src/commands/mod.rs

pub mod cli;
pub mod common;
pub mod console;
pub mod dotted;
pub mod parser;

pub use common::{Command, CommandExecutor, ConsoleState, Diagnostic};
pub use console::Console;
