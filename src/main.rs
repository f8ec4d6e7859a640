// Main entry point for the weatherdal CLI
// Runs parameterized SQL against the embedded weather database, either once
// from the command line or from an interactive shell

use anyhow::{anyhow, Context, Result};
use clap::Parser as ClapParser;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use weatherdal::display::{format_json_lines, format_table, format_update};
use weatherdal::{ArgumentList, Dal, DalConfig, QueryExecution, TypedArgument};

/// weatherdal - query the weather database with typed, positional arguments
#[derive(ClapParser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML config file (defaults are used if it does not exist)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Execute a single SQL statement and exit
    #[arg(short, long)]
    execute: Option<String>,

    /// Argument for the next `?` placeholder, as KIND:VALUE
    /// (int, str, time, date, bin, or file:PATH for a binary stream)
    #[arg(short, long = "arg", value_name = "KIND:VALUE")]
    args: Vec<String>,

    /// Print rows as JSON lines instead of a table
    #[arg(long)]
    json: bool,

    /// Write the effective configuration to PATH and exit
    #[arg(long, value_name = "PATH")]
    write_config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = DalConfig::load_or_default(args.config.as_deref())?;

    if let Some(path) = &args.write_config {
        config.save(path)?;
        println!("Configuration written to {}", path.display());
        return Ok(());
    }

    init_tracing(&config.logging.filter).ok();
    let dal = Dal::open(&config)?;

    if let Some(sql) = &args.execute {
        let arguments = args
            .args
            .iter()
            .map(|arg| parse_argument(arg))
            .collect::<Result<ArgumentList>>()?;
        return run_query(&dal, sql, arguments, args.json);
    }

    println!("╔════════════════════════════════════════════╗");
    println!("║        weatherdal Interactive Shell        ║");
    println!("╚════════════════════════════════════════════╝");
    println!();
    println!("Database '{}' ready", config.database.name);
    println!("Type SQL commands or '.help' for help");
    println!("Type '.exit' to quit");
    println!();

    repl(&dal, args.json)
}

fn init_tracing(filter: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}

/// Parse KIND:VALUE; `file:PATH` reads the file as a binary stream
fn parse_argument(text: &str) -> Result<TypedArgument> {
    if let Some(path) = text.strip_prefix("file:") {
        let bytes = fs::read(path).with_context(|| format!("failed to read {}", path))?;
        return Ok(TypedArgument::Binary(bytes));
    }
    Ok(text.parse::<TypedArgument>()?)
}

/// REPL (Read-Eval-Print Loop)
/// Arguments bound with `.bind` are used by the next statement, then cleared
fn repl(dal: &Dal, json: bool) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut pending = ArgumentList::new();

    loop {
        print!("weatherdal> ");
        stdout.flush()?;

        let mut input = String::new();
        if stdin.read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if input.starts_with('.') {
            let (command, rest) = input.split_once(' ').unwrap_or((input, ""));
            match command {
                ".exit" | ".quit" => {
                    println!("Goodbye!");
                    break;
                }
                ".help" => print_help(),
                ".tables" => match dal.database() {
                    Some(database) => {
                        for table in database.table_names() {
                            println!("  {}", table);
                        }
                    }
                    None => println!("No embedded database attached"),
                },
                ".bind" => match parse_argument(rest.trim()) {
                    Ok(argument) => {
                        pending.push(argument);
                        println!("Bound ?{}", pending.len());
                    }
                    Err(e) => eprintln!("Error: {:#}", e),
                },
                ".args" => {
                    if pending.is_empty() {
                        println!("No arguments bound");
                    }
                    for (i, argument) in pending.iter().enumerate() {
                        println!("  ?{} {}: {:?}", i + 1, argument.kind(), argument);
                    }
                }
                ".clear" => {
                    pending = ArgumentList::new();
                    println!("Arguments cleared");
                }
                _ => {
                    println!("Unknown command: {}", input);
                    println!("Type '.help' for help");
                }
            }
            continue;
        }

        let arguments = std::mem::take(&mut pending);
        if let Err(e) = run_query(dal, input, arguments, json) {
            eprintln!("Error: {:#}", e);
        }
    }

    Ok(())
}

fn run_query(dal: &Dal, sql: &str, arguments: ArgumentList, json: bool) -> Result<()> {
    let mut query = QueryExecution::new(sql, arguments, dal.provider());
    query.execute()?;

    if query.has_result_set() {
        let columns = query
            .result_set()
            .map(|cursor| cursor.columns().to_vec())
            .unwrap_or_default();
        let rows = query.rows()?;
        if json {
            if !rows.is_empty() {
                println!("{}", format_json_lines(&rows));
            }
        } else {
            println!("{}", format_table(&columns, &rows));
        }
    } else {
        println!(
            "{}",
            format_update(query.affected_rows().unwrap_or(0), query.generated_key())
        );
    }

    query.close();
    Ok(())
}

fn print_help() {
    println!("╔════════════════════════════════════════════╗");
    println!("║              weatherdal Help               ║");
    println!("╚════════════════════════════════════════════╝");
    println!();
    println!("Special Commands:");
    println!("  .help              Show this help message");
    println!("  .exit, .quit       Exit the shell");
    println!("  .tables            List the tables");
    println!("  .bind KIND:VALUE   Bind an argument for the next statement");
    println!("  .args              Show the bound arguments");
    println!("  .clear             Drop the bound arguments");
    println!();
    println!("Argument kinds:");
    println!("  int:5  str:KPIT  time:12:30:00  date:2024-01-31  bin:text  file:PATH");
    println!("  (date arguments are rejected by the query runner)");
    println!();
    println!("Examples:");
    println!("  SELECT * FROM forecaster_stations WHERE stationCode = ?");
    println!("  {{call sp_getStationsByState(?)}}");
    println!("  INSERT INTO forecaster_stations VALUES (?, ?, ?)");
    println!();
    println!("Notes:");
    println!("  - `?` placeholders bind left to right, starting at 1");
    println!("  - String values in SQL text must be in single quotes");
    println!();
}
