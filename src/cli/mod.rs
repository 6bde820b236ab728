use anyhow::Context;
use clap::{Parser, Subcommand};
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use crate::config;
use crate::domain::{playlist::Playlist, track::Track};
use crate::engine::RecommendationEngine;
use crate::storage::db::i64_seconds_to_local_time;
use crate::storage::operations::Storage;

#[derive(Parser)]
#[command(name = "moodlist")]
#[command(version = "0.1")]
#[command(about = "Mood playlist recommendations for a music catalog")]
pub struct Cli {
    /// Path to the config TOML file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the moods playlists can be generated for
    Moods,
    /// Import tracks from a JSON catalog
    Import {
        /// JSON file holding an array of tracks
        file: PathBuf,
    },
    /// Show catalog status
    Status,
    /// Generate a playlist for a mood
    Generate {
        mood: String,
        /// User the playlist is generated for
        #[arg(short, long, default_value = "cli")]
        user: String,
        /// Print the playlist as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run http server serving playlists
    Serve,
}

/// Entrypoint for CLI
pub fn run() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let cfg = config::Config::load(&cli.config)?;

    match &cli.command {
        Commands::Moods => {
            let taxonomy = cfg.load_taxonomy()?;
            for (mood, profile) in taxonomy.iter() {
                let tags = profile
                    .required_moods
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ");
                println!("{mood}: tags [{tags}]");
                for (feature, range) in &profile.audio_features {
                    println!("    - {feature} in [{}, {}]", range.min, range.max);
                }
            }
        }

        Commands::Import { file } => {
            let tracks = read_catalog(file)?;
            let mut storage = Storage::new(&cfg.database)?;
            let imported = storage.import_tracks(&tracks)?;
            println!("Imported {imported} tracks from {}", file.to_string_lossy());
        }

        Commands::Status => {
            let storage = Storage::new(&cfg.database)?;
            let status = storage.status()?;

            println!(
                "Catalog contains {} tracks, {} active",
                status.tracks, status.active_tracks
            );
            match status.imported_at {
                Some(secs) => println!(
                    "Last import at {}",
                    i64_seconds_to_local_time(secs)?
                ),
                None => println!("Nothing imported yet. Run \"import\" to load a catalog."),
            }
        }

        Commands::Generate { mood, user, json } => {
            let taxonomy = Arc::new(cfg.load_taxonomy()?);
            let storage = Storage::new(&cfg.database)?;
            let engine = RecommendationEngine::new(storage, taxonomy, cfg.engine.clone());

            let playlist = engine
                .generate(user, mood)
                .with_context(|| format!("Failed to generate playlist for mood '{mood}'"))?;

            if *json {
                println!("{}", serde_json::to_string_pretty(&playlist)?);
            } else {
                print!("{}", format_playlist(mood, &playlist));
            }
        }

        Commands::Serve => {
            println!("Starting HTTP server...");

            let taxonomy = Arc::new(cfg.load_taxonomy()?);
            let storage = Arc::new(Mutex::new(Storage::new(&cfg.database)?));
            let engine =
                RecommendationEngine::new(Arc::clone(&storage), taxonomy, cfg.engine.clone());

            let http_server = crate::http::server::HttpServer::new(engine, storage, cfg.http);

            println!(
                "HTTP server running at http://{}:{}",
                http_server.config.bind_addr, http_server.config.port
            );
            http_server.run();
        }
    }

    Ok(())
}

/// Reads a JSON array of tracks.
pub fn read_catalog(path: &Path) -> anyhow::Result<Vec<Track>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {}", path.to_string_lossy()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse catalog {}", path.to_string_lossy()))
}

fn format_playlist(mood: &str, playlist: &Playlist) -> String {
    if playlist.is_empty() {
        return format!("No active tracks match mood '{mood}'\n");
    }

    let mut out = format!("Playlist for '{mood}' ({} tracks):\n", playlist.len());
    for (position, entry) in playlist.iter().enumerate() {
        out.push_str(&format!(
            "{:>3}. {}  score {:.1}  plays {}\n",
            position + 1,
            entry.track.id,
            entry.score,
            entry.track.play_count()
        ));
    }
    out
}
