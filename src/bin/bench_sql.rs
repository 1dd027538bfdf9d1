//! # bench-sql
//!
//! Runs the `benchmark_users` statements against the configured database,
//! one subcommand per statement, or the whole demonstration sequence.
//!
//! ```bash
//! bench-sql walkthrough
//! bench-sql insert --email alice@example.com --permission-group 25
//! bench-sql page --limit 10 --offset 0
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;

use benchmark_api::config::ConfigManager;
use benchmark_api::constants::ADULT_PERMISSION_GROUP;
use benchmark_api::database::{is_undefined_table, DatabaseConnection};
use benchmark_api::logging;
use benchmark_api::models::benchmark_user::{list_tables, walkthrough, BenchmarkUser};

#[derive(Parser, Debug)]
#[command(name = "bench-sql")]
#[command(about = "Run the benchmark_users SQL walkthrough against PostgreSQL")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Database URL (defaults to the configured database.url)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Subcommands
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run every statement in order and print what each step saw
    Walkthrough {
        /// Leave the table in place instead of dropping it at the end
        #[arg(long)]
        keep_table: bool,
    },

    /// CREATE TABLE IF NOT EXISTS benchmark_users
    CreateTable,

    /// SELECT * FROM benchmark_users
    All,

    /// SELECT email FROM benchmark_users
    Emails,

    /// Rows with permission_group >= MIN
    MinGroup {
        #[arg(default_value_t = ADULT_PERMISSION_GROUP)]
        min: i32,
    },

    /// Insert one row
    Insert {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        permission_group: Option<i32>,
    },

    /// Rows with the given email
    Find { email: String },

    /// Set permission_group for an email
    Update {
        email: String,
        permission_group: i32,
    },

    /// Delete rows with permission_group < THRESHOLD
    DeleteBelow {
        #[arg(default_value_t = ADULT_PERMISSION_GROUP)]
        threshold: i32,
    },

    /// One page ordered by id
    Page {
        #[arg(long, default_value_t = 10)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },

    /// Tables in the public schema
    ListTables,

    /// DROP TABLE benchmark_users
    Drop,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let manager = ConfigManager::load().context("Failed to load configuration")?;
    let mut config = manager.config().clone();
    logging::init_structured_logging(&config.logging);
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }

    let db = DatabaseConnection::connect(&config.database)
        .await
        .context("Failed to connect to database")?;

    let result = run(db.pool(), cli.command).await;
    db.close().await;

    match result {
        Err(e) if is_undefined_table(&e) => {
            anyhow::bail!("benchmark_users does not exist (run `bench-sql create-table` first): {e}")
        }
        other => other.context("Statement failed"),
    }
}

async fn run(pool: &PgPool, command: Commands) -> Result<(), sqlx::Error> {
    match command {
        Commands::Walkthrough { keep_table } => {
            let report = walkthrough(pool, keep_table).await?;
            info!(
                inserted = report.inserted.len(),
                updated = report.updated,
                deleted = report.deleted,
                dropped = report.dropped,
                "Walkthrough complete"
            );
            print_json(&report);
        }
        Commands::CreateTable => {
            BenchmarkUser::create_table(pool).await?;
            println!("created benchmark_users");
        }
        Commands::All => print_json(&BenchmarkUser::fetch_all(pool).await?),
        Commands::Emails => print_json(&BenchmarkUser::emails(pool).await?),
        Commands::MinGroup { min } => {
            print_json(&BenchmarkUser::with_min_permission_group(pool, min).await?)
        }
        Commands::Insert {
            email,
            permission_group,
        } => print_json(&BenchmarkUser::insert(pool, email.as_deref(), permission_group).await?),
        Commands::Find { email } => print_json(&BenchmarkUser::find_by_email(pool, &email).await?),
        Commands::Update {
            email,
            permission_group,
        } => {
            let rows = BenchmarkUser::update_permission_group(pool, &email, permission_group).await?;
            println!("updated {rows} row(s)");
        }
        Commands::DeleteBelow { threshold } => {
            let rows = BenchmarkUser::delete_below_permission_group(pool, threshold).await?;
            println!("deleted {rows} row(s)");
        }
        Commands::Page { limit, offset } => {
            print_json(&BenchmarkUser::page(pool, limit, offset).await?)
        }
        Commands::ListTables => {
            for table in list_tables(pool).await? {
                println!("{table}");
            }
        }
        Commands::Drop => {
            BenchmarkUser::drop_table(pool).await?;
            println!("dropped benchmark_users");
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("failed to render output: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_use_threshold() {
        let cli = Cli::try_parse_from(["bench-sql", "delete-below"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::DeleteBelow { threshold } if threshold == ADULT_PERMISSION_GROUP
        ));

        let cli = Cli::try_parse_from(["bench-sql", "page"]).unwrap();
        assert!(matches!(cli.command, Commands::Page { limit: 10, offset: 0 }));
    }
}
