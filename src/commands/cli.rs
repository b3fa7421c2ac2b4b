// src/commands/cli.rs
use clap::Parser;
use std::{fs, error::Error};
use std::io::{self, Write};

use super::console::Console;
use super::common::ConsoleState;

#[derive(Parser, Debug)]
#[command(name = "hbnb", about = "Interactive console for the hbnb object store")]
pub struct ConsoleArgs {
    /// JSON file holding the objects (overrides `storage_file`)
    #[arg(long, short)]
    pub file: Option<String>,
}

#[derive(Parser, Debug)]
#[command(name = "hbnb_script", about = "Run console commands without a prompt")]
pub struct ScriptArgs {
    /// JSON file holding the objects (overrides `storage_file`)
    #[arg(long, short)]
    pub file: Option<String>,

    /// File with one console command per line
    #[arg(long, short)]
    pub script: Option<String>,

    /// Console command to run after the script, e.g. `create User`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

pub fn parse_cli_args(args: &[String]) -> Result<ScriptArgs, Box<dyn Error>> {
    Ok(ScriptArgs::try_parse_from(args)?)
}

/// Lines to execute, or `None` when neither a script nor a command was given
/// and input should come from stdin.
pub fn script_lines(args: &ScriptArgs) -> Result<Option<Vec<String>>, Box<dyn Error>> {
    if args.script.is_none() && args.command.is_empty() {
        return Ok(None);
    }

    let mut lines = Vec::new();
    if let Some(script_file) = &args.script {
        let content = fs::read_to_string(script_file)
            .map_err(|e| format!("Failed to read script {}: {}", script_file, e))?;
        lines.extend(content.lines().map(str::to_string));
    }
    if !args.command.is_empty() {
        lines.push(join_command_words(&args.command));
    }
    Ok(Some(lines))
}

/// Rebuilds a console line from shell words. A single word is used as is so
/// dotted calls pass through untouched; otherwise words containing whitespace
/// are quoted again.
pub fn join_command_words(words: &[String]) -> String {
    if let [single] = words {
        return single.clone();
    }
    words
        .iter()
        .map(|word| {
            if word.is_empty() || word.chars().any(char::is_whitespace) {
                format!("\"{}\"", word.replace('\\', "\\\\").replace('"', "\\\""))
            } else {
                word.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs each line through the console, stopping early on `quit`.
pub fn execute_lines<W: Write>(console: &mut Console, lines: &[String], output: &mut W) -> io::Result<()> {
    for line in lines {
        if console.onecmd(line, output)? == ConsoleState::Terminated {
            break;
        }
    }
    Ok(())
}
