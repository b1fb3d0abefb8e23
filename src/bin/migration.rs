use carstock_api::{config, db};
use clap::{Parser, Subcommand};
use migrations::{Migrator, MigratorTrait};
use tracing::info;

/// Schema migrations for the carstock database
#[derive(Parser)]
#[command(name = "migration", version)]
struct Cli {
    /// Overrides the configured database URL
    #[arg(long)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<MigrationCommand>,
}

#[derive(Subcommand)]
enum MigrationCommand {
    /// Apply pending migrations (default)
    Up {
        #[arg(long)]
        steps: Option<u32>,
    },
    /// Roll back applied migrations
    Down {
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
    /// Show applied and pending migrations
    Status,
    /// Drop every table and re-apply all migrations
    Fresh,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::load_config()?;
    config::init_tracing(cfg.log_level(), cfg.log_json);
    if let Some(url) = cli.database_url {
        cfg.database_url = url;
    }

    info!("Starting database migration");
    let pool = db::establish_connection_from_app_config(&cfg).await?;

    match cli.command.unwrap_or(MigrationCommand::Up { steps: None }) {
        MigrationCommand::Up { steps } => {
            Migrator::up(&pool, steps).await?;
            info!("Migration completed successfully");
        }
        MigrationCommand::Down { steps } => {
            Migrator::down(&pool, Some(steps)).await?;
            info!(steps, "Rolled back migrations");
        }
        MigrationCommand::Status => {
            Migrator::status(&pool).await?;
        }
        MigrationCommand::Fresh => {
            Migrator::fresh(&pool).await?;
            info!("Database recreated");
        }
    }

    db::close_pool(pool).await?;
    Ok(())
}
