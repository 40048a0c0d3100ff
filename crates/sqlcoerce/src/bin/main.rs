//! sqlcoerce command-line interface

use anyhow::Result;
use clap::{Parser, Subcommand};
use sqlcoerce::cli::output::{self, ColorChoice, OutputFormat};
use sqlcoerce::cli::{cast, load_engine, repl, resolve, types};
use std::path::PathBuf;

/// SQL type coercion tool
#[derive(Parser)]
#[command(name = "sqlcoerce")]
#[command(author, version, about = "SQL type coercion and casting tools", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Pretty, global = true)]
    format: OutputFormat,

    /// Color output
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto, global = true)]
    color: ColorChoice,

    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a cast expression
    Cast {
        /// Expression, e.g. "'42.5'::jsonb::int"
        #[arg(required = true, num_args = 1..)]
        expression: Vec<String>,
    },

    /// Explain how operands are unified in a usage context
    Resolve {
        /// Usage: +, =, binary:<op>, comparison:<op>, case, assign:<type>, subquery
        usage: String,

        /// Operands: 'literal', null, or a type name
        #[arg(required = true, num_args = 1..)]
        operands: Vec<String>,
    },

    /// List registered types
    Types,

    /// Start interactive REPL
    Repl,
}

fn main() {
    human_panic::setup_panic!();

    let cli = Cli::parse();

    output::setup_colors(cli.color);

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{}", output::format_error(&e));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let engine = load_engine(cli.config.as_deref())?;
    match cli.command {
        Commands::Cast { expression } => cast::cast(
            &engine,
            cast::CastConfig {
                expression: expression.join(" "),
                format: cli.format,
            },
        ),
        Commands::Resolve { usage, operands } => resolve::resolve(
            &engine,
            resolve::ResolveConfig {
                usage,
                operands,
                format: cli.format,
            },
        ),
        Commands::Types => types::list(&engine, cli.format),
        Commands::Repl => repl::run(&engine),
    }
}
