//! Command-line interface
//!
//! ```bash
//! spotkov sync rj
//! spotkov publish --user rj --recent 30
//! spotkov publish --user rj --songs mix.json
//! spotkov publish --user rj --seed-artist Pulp --seed-title "Common People"
//! spotkov complete rj --title wonder
//! ```

use clap::{Parser, Subcommand};
use sklastfm::DEFAULT_MATCH_LIMIT;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "spotkov")]
#[command(about = "Spotkov: playlists generated from your Last.fm history")]
#[command(version)]
pub struct Args {
    /// Configuration directory (defaults to $SPOTKOV_CONFIG, ./.spotkov or ~/.spotkov)
    #[arg(long, global = true, env = "SPOTKOV_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Synchronize a user's listening history into the local cache
    Sync {
        /// Last.fm user name
        user: String,
    },

    /// Build a song list, resolve it and publish it as a Spotify playlist
    Publish {
        /// Last.fm user whose history seeds the playlist
        #[arg(long)]
        user: String,

        /// JSON file holding the songs to publish (`[{"artist": .., "title": ..}]`)
        #[arg(long, conflicts_with = "recent")]
        songs: Option<PathBuf>,

        /// Publish the N most recently played songs (clamped to 1..=200)
        #[arg(long, value_name = "N")]
        recent: Option<usize>,

        /// Artist of the song the playlist starts from
        #[arg(long, requires = "seed_title")]
        seed_artist: Option<String>,

        /// Title of the song the playlist starts from
        #[arg(long, requires = "seed_artist")]
        seed_title: Option<String>,
    },

    /// Suggest songs from the cached history by title or artist
    Complete {
        /// Last.fm user name
        user: String,

        /// Match against song titles
        #[arg(long, conflicts_with = "artist", required_unless_present = "artist")]
        title: Option<String>,

        /// Match against artist names
        #[arg(long)]
        artist: Option<String>,

        /// Maximum number of suggestions
        #[arg(long, default_value_t = DEFAULT_MATCH_LIMIT)]
        limit: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_publish_recent() {
        let args = Args::parse_from(["spotkov", "publish", "--user", "rj", "--recent", "30"]);
        match args.command {
            Command::Publish {
                user,
                songs,
                recent,
                seed_artist,
                ..
            } => {
                assert_eq!(user, "rj");
                assert!(songs.is_none());
                assert_eq!(recent, Some(30));
                assert!(seed_artist.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_songs_and_recent_conflict() {
        let parsed = Args::try_parse_from([
            "spotkov", "publish", "--user", "rj", "--songs", "a.json", "--recent", "3",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_seed_needs_artist_and_title() {
        let parsed = Args::try_parse_from(["spotkov", "publish", "--user", "rj", "--seed-artist", "Pulp"]);
        assert!(parsed.is_err());

        let args = Args::parse_from([
            "spotkov", "publish", "--user", "rj", "--seed-artist", "Pulp", "--seed-title", "Disco 2000",
        ]);
        match args.command {
            Command::Publish {
                seed_artist,
                seed_title,
                ..
            } => {
                assert_eq!(seed_artist.as_deref(), Some("Pulp"));
                assert_eq!(seed_title.as_deref(), Some("Disco 2000"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_complete() {
        let args = Args::parse_from(["spotkov", "complete", "rj", "--artist", "oasis"]);
        match args.command {
            Command::Complete {
                user,
                title,
                artist,
                limit,
            } => {
                assert_eq!(user, "rj");
                assert!(title.is_none());
                assert_eq!(artist.as_deref(), Some("oasis"));
                assert_eq!(limit, DEFAULT_MATCH_LIMIT);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_complete_needs_exactly_one_field() {
        assert!(Args::try_parse_from(["spotkov", "complete", "rj"]).is_err());
        assert!(Args::try_parse_from([
            "spotkov", "complete", "rj", "--title", "a", "--artist", "b"
        ])
        .is_err());
    }
}
