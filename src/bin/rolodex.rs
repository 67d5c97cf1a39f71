//! Rolodex CLI — contact directory backend.
//!
//! Usage:
//!   rolodex serve [--port 8080] [--db path] [--backup-dir path]
//!   rolodex admin create <username> <password> [--email addr] [--db path]
//!   rolodex import <file.xlsx> --fields name,city [--db path]
//!   rolodex backup <name> [--db path] [--backup-dir path]
//!   rolodex restore <file.csv> [--db path] [--backup-dir path]

use clap::{Parser, Subcommand};
use rolodex::http::{start_server, AppState};
use rolodex::{Config, ContactApi, OpenStore, SqliteStore, TokenSigner};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "rolodex", version, about = "Contact directory backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST server
    Serve {
        /// Port to listen on (defaults to ROLODEX_PORT or 8080)
        #[arg(long)]
        port: Option<u16>,
        /// Path to SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
        /// Directory for backup files
        #[arg(long)]
        backup_dir: Option<PathBuf>,
    },
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
        /// Path to SQLite database file
        #[arg(long, global = true)]
        db: Option<PathBuf>,
    },
    /// Import a spreadsheet into the contact table
    Import {
        /// Path to the .xlsx file
        file: PathBuf,
        /// Comma-separated column names to apply
        #[arg(long)]
        fields: String,
        /// Path to SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Write a backup of contacts not yet backed up
    Backup {
        /// Backup name (becomes <name>.csv)
        name: String,
        /// Path to SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
        /// Directory for backup files
        #[arg(long)]
        backup_dir: Option<PathBuf>,
    },
    /// Restore contacts from a backup file
    Restore {
        /// Backup file name (with .csv extension)
        file: String,
        /// Path to SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
        /// Directory for backup files
        #[arg(long)]
        backup_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create an admin account
    Create {
        username: String,
        password: String,
        /// Contact email for the account
        #[arg(long)]
        email: Option<String>,
    },
}

fn open_api(config: &Config, db: Option<PathBuf>, backup_dir: Option<PathBuf>) -> Result<ContactApi, String> {
    let db_path = db.unwrap_or_else(|| config.db_path.clone());
    let store =
        SqliteStore::open(&db_path).map_err(|e| format!("Failed to open database: {}", e))?;
    Ok(ContactApi::new(
        Arc::new(store),
        backup_dir.unwrap_or_else(|| config.backup_dir.clone()),
        TokenSigner::new(config.token_secret.clone()),
    ))
}

fn cmd_admin_create(api: &ContactApi, username: &str, password: &str, email: Option<&str>) -> i32 {
    match api.register_admin(username, password, email) {
        Ok(()) => {
            println!("Created admin '{}'", username);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_import(api: &ContactApi, file: &PathBuf, fields: &str) -> i32 {
    let bytes = match std::fs::read(file) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error reading {}: {}", file.display(), e);
            return 1;
        }
    };
    let mut selected = Vec::new();
    for name in fields.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match rolodex::Field::from_name(name) {
            Some(field) => selected.push(field),
            None => {
                eprintln!("Error: unknown field '{}'", name);
                return 1;
            }
        }
    }
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "import.xlsx".to_string());
    match api.import_workbook(&bytes, &selected, "cli", &file_name) {
        Ok(summary) => {
            println!(
                "Imported {}: {} inserted, {} updated",
                file_name, summary.inserted, summary.updated
            );
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_backup(api: &ContactApi, name: &str) -> i32 {
    match api.backup(name) {
        Ok(rolodex::BackupOutcome::Written { file_name, rows }) => {
            println!("Wrote {} ({} contacts)", file_name, rows);
            0
        }
        Ok(rolodex::BackupOutcome::NothingNew) => {
            println!("No new contacts to back up");
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_restore(api: &ContactApi, file: &str) -> i32 {
    match api.restore(file) {
        Ok(restored) => {
            println!("Restored {} contacts from {}", restored, file);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let config = Config::load();

    match cli.command {
        Commands::Serve {
            port,
            db,
            backup_dir,
        } => {
            let api = match open_api(&config, db, backup_dir) {
                Ok(api) => api,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            let port = port.unwrap_or(config.port);
            let runtime = tokio::runtime::Runtime::new().expect("Failed to start runtime");
            let result = runtime.block_on(start_server(AppState::new(Arc::new(api)), port));
            if let Err(e) = result {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Admin { action, db } => {
            let api = match open_api(&config, db, None) {
                Ok(api) => api,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            let code = match action {
                AdminAction::Create {
                    username,
                    password,
                    email,
                } => cmd_admin_create(&api, &username, &password, email.as_deref()),
            };
            std::process::exit(code);
        }
        Commands::Import { file, fields, db } => {
            let api = match open_api(&config, db, None) {
                Ok(api) => api,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            std::process::exit(cmd_import(&api, &file, &fields));
        }
        Commands::Backup {
            name,
            db,
            backup_dir,
        } => {
            let api = match open_api(&config, db, backup_dir) {
                Ok(api) => api,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            std::process::exit(cmd_backup(&api, &name));
        }
        Commands::Restore {
            file,
            db,
            backup_dir,
        } => {
            let api = match open_api(&config, db, backup_dir) {
                Ok(api) => api,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            std::process::exit(cmd_restore(&api, &file));
        }
    }
}
