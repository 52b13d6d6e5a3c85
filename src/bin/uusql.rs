//! uusql: plan and apply schema migrations from a `.uusql` file.
//!
//! # Usage
//!
//! ```bash
//! # Show the SQL moving version 1 to the newest version
//! uusql plan league.uusql --from 1
//!
//! # Apply to a database
//! uusql migrate league.uusql --database-url sqlite://league.db
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use tracing_subscriber::EnvFilter;
use uusql::migrate::{DatabaseDefinition, Schema, plan_creation, to_schema_string};
use uusql::prelude::*;

#[derive(Parser)]
#[command(name = "uusql")]
#[command(version)]
#[command(about = "Schema-versioned SQLite migrations", long_about = None)]
#[command(after_help = "EXAMPLES:
    uusql plan league.uusql --from 1 --to 2
    uusql create league.uusql --schema-version 1
    uusql migrate league.uusql --database-url sqlite://league.db --dry-run
    uusql status --database-url sqlite://league.db")]
struct Cli {
    /// Config file (default: ./uusql.toml, then the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the statements migrating between two versions
    Plan {
        /// Schema file (default: schema_path from the config)
        schema: Option<PathBuf>,

        /// Installed version (0 for an empty database)
        #[arg(long)]
        from: u32,

        /// Target version (default: newest declared version)
        #[arg(long)]
        to: Option<u32>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Print CREATE statements for every table at a version
    Create {
        schema: Option<PathBuf>,

        /// Version to create (default: newest declared version)
        #[arg(long)]
        schema_version: Option<u32>,
    },
    /// Print the schema, normalized, version by version
    Show { schema: Option<PathBuf> },
    /// Migrate a database to a version
    Migrate {
        schema: Option<PathBuf>,

        /// Database connection URL
        #[arg(long, env = "UUSQL_DATABASE_URL")]
        database_url: Option<String>,

        /// Target version (default: newest declared version)
        #[arg(long)]
        to: Option<u32>,

        /// Don't execute, just show the plan
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the installed version of a database
    Status {
        schema: Option<PathBuf>,

        /// Database connection URL
        #[arg(long, env = "UUSQL_DATABASE_URL")]
        database_url: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    init_tracing(&config.log_level, cli.verbose);

    match cli.command {
        Commands::Plan {
            schema,
            from,
            to,
            format,
        } => {
            let schema = load_schema(schema.as_deref(), &config)?;
            let to = to.unwrap_or_else(|| schema.current_version());
            let plan = plan_migration(&schema, from, to)?;
            print_plan(from, to, &plan, &format)?;
        }
        Commands::Create {
            schema,
            schema_version,
        } => {
            let schema = load_schema(schema.as_deref(), &config)?;
            let version = schema_version.unwrap_or_else(|| schema.current_version());
            let statements = plan_creation(&schema, version)?;
            if statements.is_empty() {
                println!("{}", format!("(no tables at version {})", version).dimmed());
            }
            for sql in statements {
                println!("{}", sql.white());
            }
        }
        Commands::Show { schema } => {
            let schema = load_schema(schema.as_deref(), &config)?;
            print!("{}", to_schema_string(&schema));
        }
        Commands::Migrate {
            schema,
            database_url,
            to,
            dry_run,
        } => {
            let schema = load_schema(schema.as_deref(), &config)?;
            let config = with_url(config, database_url)?;
            let target = to.unwrap_or_else(|| schema.current_version());
            let db = Database::connect(&config, Arc::new(schema)).await?;
            let installed = db.installed_version().await?;

            if dry_run {
                let plan = plan_migration(db.definition(), installed, target)?;
                print_plan(installed, target, &plan, &OutputFormat::Text)?;
                println!("\n{}", "No changes made.".yellow());
            } else {
                let applied = db.migrate_to(target).await?;
                if applied.is_empty() {
                    println!("{} Already at version {}", "✓".green(), target.to_string().cyan());
                } else {
                    for sql in &applied {
                        println!("  {} {}", "→".dimmed(), sql.white());
                    }
                    println!(
                        "{} Migrated {} -> {} ({} statements)",
                        "✓".green(),
                        installed.to_string().cyan(),
                        target.to_string().cyan(),
                        applied.len()
                    );
                }
            }
            db.close().await;
        }
        Commands::Status {
            schema,
            database_url,
        } => {
            let schema = match schema.as_deref().or(config.schema_path.as_deref()) {
                Some(path) => read_schema(path)?,
                None => Schema::new(uusql::migrate::parser::DEFAULT_DATABASE_NAME),
            };
            let config = status_config(config, database_url)?;
            let target = schema.current_version();
            let db = Database::connect(&config, Arc::new(schema)).await?;
            let installed = db.installed_version().await?;

            println!("  Installed version: {}", installed.to_string().cyan());
            if target > 0 {
                println!("  Schema version:    {}", target.to_string().cyan());
                if installed == target {
                    println!("{} Up to date", "✓".green());
                } else {
                    println!("{} Migration pending", "⚠".yellow());
                }
            }
            db.close().await;
        }
    }

    Ok(())
}

fn init_tracing(level: &str, verbose: bool) {
    let default = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn with_url(config: Config, url: Option<String>) -> Result<Config> {
    let config = match url {
        Some(url) => Config {
            database_url: Some(url),
            ..config
        },
        None => config,
    };
    if config.database_url.is_none() {
        bail!("No database URL. Use --database-url, set UUSQL_DATABASE_URL or database_url in uusql.toml");
    }
    Ok(config)
}

/// `status` only inspects, so a missing database file is an error.
fn status_config(config: Config, url: Option<String>) -> Result<Config> {
    Ok(Config {
        create_if_missing: false,
        ..with_url(config, url)?
    })
}

fn load_schema(path: Option<&Path>, config: &Config) -> Result<Schema> {
    match path.or(config.schema_path.as_deref()) {
        Some(path) => read_schema(path),
        None => bail!("No schema file. Pass one or set schema_path in uusql.toml"),
    }
}

fn read_schema(path: &Path) -> Result<Schema> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_schema(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_plan(from: u32, to: u32, plan: &[String], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let doc = serde_json::json!({
                "from": from,
                "to": to,
                "statements": plan,
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        OutputFormat::Text => {
            println!(
                "{} {} -> {}",
                "Migration plan:".green().bold(),
                from.to_string().cyan(),
                to.to_string().cyan()
            );
            if plan.is_empty() {
                println!("{}", "(nothing to do)".dimmed());
            }
            for (i, sql) in plan.iter().enumerate() {
                println!("  {} {}", format!("{:>2}.", i + 1).dimmed(), sql.white());
            }
        }
    }
    Ok(())
}
