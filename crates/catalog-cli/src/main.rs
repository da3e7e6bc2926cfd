mod import;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "catalog-cli")]
#[command(about = "Product catalog command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Sync products from a spreadsheet export (CSV) by SKU
    Import {
        /// Path to the CSV file; the first row holds column headers
        file: PathBuf,
        /// Field delimiter; spreadsheet exports in pt-BR locales use ';'
        #[arg(long, default_value_t = ',')]
        delimiter: char,
        /// Print the reconciled records without writing them
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Insert seed categories and attribute definitions
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let directives = log_directives(
        std::env::var("RUST_LOG").ok(),
        std::env::var("CATALOG_LOG_LEVEL").ok(),
    );
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(directives)?)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Db { command }) => run_db(command).await?,
        Some(Commands::Import {
            file,
            delimiter,
            dry_run,
        }) => {
            let rows = import::read_sheet(&file, delimiter)?;
            let reconciled = import::reconcile(rows);
            if dry_run {
                import::print_dry_run(&reconciled)?;
            } else {
                let pool = connect().await?;
                import::run_import(&pool, &reconciled).await?;
            }
        }
        None => println!("catalog-cli ready; see --help for commands"),
    }

    Ok(())
}

/// `RUST_LOG` wins, then `CATALOG_LOG_LEVEL`, then `info`. Read straight from
/// the environment so `import --dry-run` works without `DATABASE_URL`.
fn log_directives(rust_log: Option<String>, catalog_level: Option<String>) -> String {
    rust_log
        .into_iter()
        .chain(catalog_level)
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
        .unwrap_or_else(|| "info".to_string())
}

async fn connect() -> anyhow::Result<sqlx::PgPool> {
    let config = catalog_core::load_app_config()?;
    let pool_config = catalog_db::PoolConfig::from_app_config(&config);
    Ok(catalog_db::connect_pool(&config.database_url, pool_config).await?)
}

async fn run_db(command: DbCommands) -> anyhow::Result<()> {
    match command {
        DbCommands::Ping => {
            let pool = connect().await?;
            catalog_db::ping(&pool).await?;
            println!("database reachable");
        }
        DbCommands::Migrate => {
            let pool = connect().await?;
            let applied = catalog_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        DbCommands::Seed => {
            let config = catalog_core::load_app_config()?;
            let seed = catalog_core::load_seed(&config.seed_path)?;
            let pool = connect().await?;
            let summary = catalog_db::seed_catalog(&pool, &seed).await?;
            println!(
                "seeded {} categories and {} attributes from {}",
                summary.categories_inserted,
                summary.attributes_inserted,
                config.seed_path.display()
            );
        }
    }
    Ok(())
}
