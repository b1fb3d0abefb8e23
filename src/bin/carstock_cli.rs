use std::{path::PathBuf, str::FromStr, sync::Arc};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use tracing::debug;

use carstock_api::{
    blob::{SharedBlobStore, SignedUrlBlobStore},
    common::sha256_hex,
    config::{self, AppConfig},
    db::{self, DbPool},
    entities::backup::BackupKind,
    services::{
        backups::{BackupService, BackupSummary},
        catalog::ProductCatalogService,
        legacy_import::{LegacyImporter, LEGACY_CACHE_FILE},
        users::{CreateUserInput, UserService, UserSummary},
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Backup(command) => handle_backup_command(&context, command, cli.json).await?,
        Commands::Users(command) => handle_users_command(&context, command, cli.json).await?,
        Commands::ImportCache(args) => handle_import_cache(&context, args, cli.json).await?,
        Commands::Export(args) => handle_export(&context, args).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "carstock-cli",
    about = "Carstock CLI for backups, staff accounts and catalog transfer",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(subcommand)]
    Backup(BackupCommands),
    #[command(subcommand)]
    Users(UsersCommands),
    /// Import the legacy product cache into the catalog
    ImportCache(ImportCacheArgs),
    /// Write the current catalog as a snapshot document
    Export(ExportArgs),
}

#[derive(Subcommand)]
enum BackupCommands {
    /// Snapshot the catalog and apply retention
    Run(BackupRunArgs),
    /// List the most recent backups
    List,
    /// Delete all but the newest backups
    Prune(BackupPruneArgs),
}

fn parse_kind(raw: &str) -> std::result::Result<BackupKind, String> {
    BackupKind::from_str(raw).map_err(|_| format!("unknown backup type '{raw}'"))
}

#[derive(Args)]
struct BackupRunArgs {
    #[arg(
        long = "type",
        default_value = "manual",
        value_parser = parse_kind,
        help = "manual, daily or weekly"
    )]
    kind: BackupKind,
    #[arg(long, help = "Backups to keep; defaults to the configured retention")]
    keep: Option<u64>,
    #[arg(long, default_value = "system")]
    created_by: String,
}

#[derive(Args)]
struct BackupPruneArgs {
    #[arg(long, help = "Number of newest backups to keep")]
    keep: u64,
}

#[derive(Subcommand)]
enum UsersCommands {
    Create(UserCreateArgs),
    List,
}

#[derive(Args)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
    #[arg(long, help = "Plaintext password; stored as its SHA-256 hex digest")]
    password: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    family_name: Option<String>,
    #[arg(long, help = "admin, employee or viewer")]
    role: String,
    #[arg(long)]
    photo: Option<String>,
}

#[derive(Args)]
struct ImportCacheArgs {
    #[arg(default_value = LEGACY_CACHE_FILE)]
    path: PathBuf,
}

#[derive(Args)]
struct ExportArgs {
    path: PathBuf,
    #[arg(long, default_value = "system")]
    created_by: String,
}

async fn handle_backup_command(
    context: &CliContext,
    command: BackupCommands,
    json: bool,
) -> Result<()> {
    let service = context.backup_service();

    match command {
        BackupCommands::Run(args) => {
            let outcome = service
                .snapshot(args.kind, &args.created_by, args.keep)
                .await
                .context("failed to create snapshot")?;
            if json {
                print_json(&outcome)?;
            } else {
                println!(
                    "Backup {} written ({} products); pruned {} old backup(s)",
                    outcome.filename, outcome.total_products, outcome.pruned
                );
            }
        }
        BackupCommands::List => {
            let backups = service.list().await.context("failed to list backups")?;
            if json {
                print_json(&backups)?;
            } else if backups.is_empty() {
                println!("No backups found");
            } else {
                backups.iter().for_each(render_backup);
            }
        }
        BackupCommands::Prune(args) => {
            let deleted = service
                .prune(args.keep)
                .await
                .context("failed to prune backups")?;
            if json {
                print_json(&serde_json::json!({ "deleted": deleted }))?;
            } else {
                println!("Deleted {} backup(s)", deleted);
            }
        }
    }

    Ok(())
}

async fn handle_users_command(
    context: &CliContext,
    command: UsersCommands,
    json: bool,
) -> Result<()> {
    let service = context.user_service();

    match command {
        UsersCommands::Create(args) => {
            let input = CreateUserInput {
                username: args.username.trim().to_string(),
                password: sha256_hex(&args.password),
                name: args.name,
                family_name: args.family_name,
                role: args.role,
                photo: args.photo,
            };
            let username = input.username.clone();
            let id = service
                .create_user(input)
                .await
                .context("failed to create user")?;
            if json {
                print_json(&serde_json::json!({ "id": id, "username": username }))?;
            } else {
                println!("Created user {} (id {})", username, id);
            }
        }
        UsersCommands::List => {
            let users = service.list_users().await.context("failed to list users")?;
            if json {
                print_json(&users)?;
            } else {
                users.iter().for_each(render_user);
            }
        }
    }

    Ok(())
}

async fn handle_import_cache(context: &CliContext, args: ImportCacheArgs, json: bool) -> Result<()> {
    let importer = LegacyImporter::new(context.catalog_service());
    let report = importer
        .import_file(&args.path)
        .await
        .with_context(|| format!("failed to import {}", args.path.display()))?;

    if json {
        print_json(&report)?;
    } else {
        println!(
            "Migrated {} product(s); {} failed",
            report.migrated, report.failed
        );
    }
    Ok(())
}

async fn handle_export(context: &CliContext, args: ExportArgs) -> Result<()> {
    let document = context
        .backup_service()
        .export(BackupKind::Manual, &args.created_by)
        .await
        .context("failed to export catalog")?;
    let body = serde_json::to_string_pretty(&document)?;
    tokio::fs::write(&args.path, body)
        .await
        .with_context(|| format!("failed to write {}", args.path.display()))?;

    println!(
        "Exported {} product(s) to {}",
        document.products.len(),
        args.path.display()
    );
    Ok(())
}

struct CliContext {
    config: AppConfig,
    db: Arc<DbPool>,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        if config.auto_migrate {
            db::run_migrations(&db_pool)
                .await
                .context("failed to run migrations")?;
        }
        debug!(target: "carstock_cli", "database ready");

        Ok(Self {
            config,
            db: Arc::new(db_pool),
        })
    }

    fn backup_service(&self) -> BackupService {
        BackupService::new(self.db.clone(), self.config.backup_retention)
    }

    fn user_service(&self) -> UserService {
        UserService::new(self.db.clone())
    }

    fn catalog_service(&self) -> ProductCatalogService {
        let blob_store: SharedBlobStore = Arc::new(SignedUrlBlobStore::from_config(&self.config));
        ProductCatalogService::new(self.db.clone(), blob_store)
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_backup(backup: &BackupSummary) {
    println!(
        "- {} • {} • {} products • {}",
        backup.filename,
        backup.kind,
        backup.total_products,
        backup.created_at.to_rfc3339()
    );
}

fn render_user(user: &UserSummary) {
    println!("- {} ({}) • {}", user.username, user.name, user.role);
}
