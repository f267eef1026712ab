//! # Spotkov
//!
//! Builds Spotify playlists from a Last.fm listening history.
//!
//! - `sync`: bring the local history cache of a user up to date
//! - `publish`: sync, pick candidate songs, resolve them to Spotify tracks
//!   and write them into the "Generated by Spotkov" playlist
//! - `complete`: suggest seed songs from the cached history

mod candidates;
mod cli;

use anyhow::Result;
use candidates::{clamp_length, CandidateSource, RecentSongs, SongListFile, DEFAULT_LENGTH, MAX_LENGTH};
use clap::Parser;
use cli::{Args, Command};
use skconfig::{get_config, Config};
use sklastfm::{best_matches, HistoryCache, HistorySync, MatchField, Song};
use skspotify::{PlaylistWriter, ResolutionCache, SpotifyClient, TrackResolver};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(dir) => Arc::new(Config::load_config(dir)?),
        None => get_config(),
    };
    init_tracing(&config);

    match args.command {
        Command::Sync { user } => sync(&config, &user).await,
        Command::Publish {
            user,
            songs,
            recent,
            seed_artist,
            seed_title,
        } => {
            let seed = seed_artist.zip(seed_title).map(|(a, t)| Song::new(a, t));
            publish(&config, &user, songs, recent, seed).await
        }
        Command::Complete {
            user,
            title,
            artist,
            limit,
        } => {
            let (field, query) = match (title, artist) {
                (Some(title), _) => (MatchField::Title, title),
                (None, Some(artist)) => (MatchField::Artist, artist),
                (None, None) => anyhow::bail!("--title or --artist is required"),
            };
            complete(&config, &user, field, &query, limit)
        }
    }
}

/// `RUST_LOG` wins over `host.logger.min_level`
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = config
            .get_log_min_level()
            .unwrap_or_else(|_| "INFO".to_string());
        EnvFilter::new(level.to_lowercase())
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn sync(config: &Config, user: &str) -> Result<()> {
    let songs = HistorySync::from_config(config)?.sync(user).await?;

    let times = songs.iter().filter_map(|s| s.timestamp);
    let oldest = times.clone().min();
    let newest = times.max();

    println!("{}: {} songs", user, songs.len());
    if let (Some(oldest), Some(newest)) = (oldest, newest) {
        println!("  oldest play: {}", oldest.to_rfc3339());
        println!("  newest play: {}", newest.to_rfc3339());
    }
    Ok(())
}

async fn publish(
    config: &Config,
    user: &str,
    songs: Option<PathBuf>,
    recent: Option<usize>,
    seed: Option<Song>,
) -> Result<()> {
    let history: Vec<Song> = HistorySync::from_config(config)?.sync(user).await?;

    let (source, length): (Box<dyn CandidateSource>, usize) = match songs {
        Some(path) => (Box::new(SongListFile::new(path)), MAX_LENGTH),
        None => (
            Box::new(RecentSongs),
            clamp_length(recent.unwrap_or(DEFAULT_LENGTH)),
        ),
    };
    let candidates = source.candidates(&history, seed.as_ref(), length)?;
    info!(user = %user, candidates = candidates.len(), "🎵 Candidate list ready");

    let api = Arc::new(SpotifyClient::from_config(config)?);
    let cache = Arc::new(ResolutionCache::from_config(config)?);

    let resolver = TrackResolver::from_config(Arc::clone(&api), Arc::clone(&cache), config)?;
    let resolved = resolver.resolve_all(&candidates).await;

    let writer = PlaylistWriter::from_config(api, cache, config)?;
    let spotify_user = writer.current_user_id().await?;
    let report = writer.publish(&spotify_user, &resolved).await?;

    println!(
        "✅ {} tracks written to \"{}\" ({}{})",
        report.tracks_written,
        writer.playlist_name(),
        report.playlist_id,
        if report.created { ", new playlist" } else { "" }
    );
    Ok(())
}

fn complete(config: &Config, user: &str, field: MatchField, query: &str, limit: usize) -> Result<()> {
    let songs = HistoryCache::from_config(config)?.unique_songs(user)?;
    let matches = best_matches(query, &songs, field, limit);

    info!(user = %user, query = %query, matches = matches.len(), "Autocomplete");
    for song in &matches {
        println!("{} - {}", song.artist, song.title);
    }
    Ok(())
}
