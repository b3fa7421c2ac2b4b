// src/bin/hbnb_script.rs

use hbnb::commands::cli::{execute_lines, parse_cli_args, script_lines};
use hbnb::{initialize_environment, initialize_system};
use std::env;
use std::io;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    initialize_environment();

    let args: Vec<String> = env::args().collect();
    let script_args = parse_cli_args(&args)?;

    let (mut console, _config) = initialize_system(script_args.file.clone())?;
    let mut stdout = io::stdout();

    match script_lines(&script_args)? {
        Some(lines) => execute_lines(&mut console, &lines, &mut stdout)?,
        None => console.run(io::stdin().lock(), &mut stdout, false)?,
    }

    Ok(())
}
