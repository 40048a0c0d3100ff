//! REPL implementation

use super::{cast, output, types};
use anyhow::{Result, bail};
use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use sqlcoerce_eval::{CastEngine, EquivalentType};
use std::path::PathBuf;

/// Run the interactive REPL
pub fn run(engine: &CastEngine) -> Result<()> {
    println!("{}", "sqlcoerce interactive REPL".cyan().bold());
    println!("Type {} for help, {} to quit", ":help".green(), ":quit".green());
    println!();

    let mut rl = DefaultEditor::new()?;

    let history_file = std::env::var_os("HOME").map(|home| {
        let mut path = PathBuf::from(home);
        path.push(".sqlcoerce_history");
        path
    });

    if let Some(ref path) = history_file {
        let _ = rl.load_history(path);
    }

    loop {
        match rl.readline("sql> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;

                if line.starts_with(':') {
                    match handle_command(line, engine) {
                        Ok(false) => break,
                        Ok(true) => {}
                        Err(e) => eprintln!("{}", output::format_error(&e)),
                    }
                    continue;
                }

                match cast::run(engine, line) {
                    Ok(outcome) => println!("{}", cast::format_outcome(engine, &outcome)),
                    Err(e) => eprintln!("{}", output::format_error(&e)),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {err:?}");
                break;
            }
        }
    }

    if let Some(ref path) = history_file {
        let _ = rl.save_history(path);
    }

    println!("Goodbye!");
    Ok(())
}

/// Handle REPL commands (starting with :); `Ok(false)` means quit
fn handle_command(command: &str, engine: &CastEngine) -> Result<bool> {
    let parts: Vec<&str> = command.split_whitespace().collect();

    match parts.as_slice() {
        [":help" | ":h", ..] => {
            print_help();
            Ok(true)
        }
        [":quit" | ":q" | ":exit", ..] => Ok(false),
        [":types" | ":t", ..] => {
            println!("{}", output::table(types::rows(&engine.snapshot())));
            Ok(true)
        }
        [":register" | ":r", name, base] => {
            let ty = engine.register_equivalent(EquivalentType::new(*name, *base))?;
            println!(
                "{}",
                output::format_success(&format!("registered {ty} as {base}"))
            );
            Ok(true)
        }
        [":register" | ":r", ..] => bail!("Usage: :register <name> <equivalent type>"),
        [other, ..] => bail!("Unknown command: {other}. Type :help for help"),
        [] => Ok(true),
    }
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  {:<28} Show this help", ":help".green());
    println!("  {:<28} Exit the REPL", ":quit".green());
    println!("  {:<28} List registered types", ":types".green());
    println!(
        "  {:<28} Register an equivalent type",
        ":register <name> <type>".green()
    );
    println!();
    println!("{}", "Expressions:".bold());
    println!("  select '42'::int + 1.5");
    println!("  CAST('2017-01-03' AS date) = to_date('20170103', 'YYYYMMDD')");
    println!("  case when true then 1 else '2' end");
}
