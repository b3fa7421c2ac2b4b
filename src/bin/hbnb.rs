// src/bin/hbnb.rs

use clap::Parser;
use hbnb::commands::cli::ConsoleArgs;
use hbnb::{initialize_environment, initialize_system};
use std::io::{self, IsTerminal};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    initialize_environment();
    let args = ConsoleArgs::parse();

    let (mut console, _config) = initialize_system(args.file)?;

    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let mut stdout = io::stdout();
    console.run(stdin.lock(), &mut stdout, interactive)?;

    Ok(())
}
