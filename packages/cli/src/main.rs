#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Operational CLI for the water watch platform.
//!
//! ```text
//! water_watch serve
//! water_watch load-data [--data-dir data]
//! water_watch reset [--data-dir data]
//! ```
//!
//! `load-data` runs the one-time bulk loaders over the seed files
//! (municipal boundaries, parks, incidents, then blog users, posts, and
//! comments). `reset` deletes the database file first, then loads.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use water_watch_server_models::ServerConfig;

#[derive(Parser)]
#[command(name = "water_watch", about = "Water watch platform toolchain")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve,
    /// Load seed data into the database
    LoadData {
        /// Path to the seed data directory
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
    /// Delete the database file, then load seed data
    Reset {
        /// Path to the seed data directory
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let cli = Cli::parse();
    let config = ServerConfig::from_env();

    match cli.command {
        Commands::Serve => water_watch_server::run_server(config).await?,
        Commands::LoadData { data_dir } => {
            load_data(&config.database_path, &data_dir).await?;
        }
        Commands::Reset { data_dir } => {
            if config.database_path.exists() {
                std::fs::remove_file(&config.database_path)?;
                log::info!("Deleted database at {}", config.database_path.display());
            }
            load_data(&config.database_path, &data_dir).await?;
        }
    }

    Ok(())
}

/// Runs every bulk loader over the seed directory, in dependency order
/// (dashboard entities before blog entities, so post incident links can
/// resolve).
async fn load_data(database_path: &Path, data_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let db = water_watch_database::open_db(Some(database_path)).await?;
    let db = db.as_ref();

    use water_watch_dashboard::ingest;

    ingest::load_municipalities(db, &data_dir.join("mb_with_winnipeg.geojson")).await?;
    ingest::load_parks(db, &data_dir.join("Manitoba_Parks_full.geojson")).await?;
    ingest::load_incidents(db, &data_dir.join("incidents_dummy.geojson")).await?;

    use water_watch_blog::loaders;

    loaders::load_users(db, &data_dir.join("users.json")).await?;
    loaders::load_posts(db, &data_dir.join("posts.json")).await?;
    loaders::load_comments(db, &data_dir.join("comments.json")).await?;

    log::info!("Seed data load complete");

    Ok(())
}
