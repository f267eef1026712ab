//! Candidate song lists
//!
//! The generator that picks which songs go into a playlist lives outside
//! Spotkov. `CandidateSource` is the seam it plugs into: it receives the
//! history, an optional seed song the playlist starts from, and the desired
//! length. Two simple sources ship with the binary.

use anyhow::{Context, Result};
use sklastfm::Song;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

/// Smallest playlist that can be requested
pub const MIN_LENGTH: usize = 1;

/// Largest playlist that can be requested
pub const MAX_LENGTH: usize = 200;

/// Length used when none is given
pub const DEFAULT_LENGTH: usize = 50;

/// Clamp a requested playlist length to `MIN_LENGTH..=MAX_LENGTH`
pub fn clamp_length(requested: usize) -> usize {
    requested.clamp(MIN_LENGTH, MAX_LENGTH)
}

/// Produces the ordered song list to publish
pub trait CandidateSource {
    fn candidates(&self, history: &[Song], seed: Option<&Song>, length: usize) -> Result<Vec<Song>>;
}

/// Put `seed` first and keep at most `length` songs
///
/// Other occurrences of the seed's (artist, title) are dropped.
fn seeded(seed: Option<&Song>, songs: Vec<Song>, length: usize) -> Vec<Song> {
    let Some(seed) = seed else {
        return songs.into_iter().take(length).collect();
    };
    let same = |s: &Song| s.artist == seed.artist && s.title == seed.title;

    std::iter::once(seed.clone())
        .chain(songs.into_iter().filter(|s| !same(s)))
        .take(length)
        .collect()
}

/// Songs read from a JSON array file
#[derive(Debug, Clone)]
pub struct SongListFile {
    path: PathBuf,
}

impl SongListFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CandidateSource for SongListFile {
    fn candidates(&self, _history: &[Song], seed: Option<&Song>, length: usize) -> Result<Vec<Song>> {
        let data = fs::read(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let songs: Vec<Song> = serde_json::from_slice(&data)
            .with_context(|| format!("Invalid song list in {}", self.path.display()))?;
        Ok(seeded(seed, songs, length))
    }
}

/// The most recently played distinct songs, newest first
#[derive(Debug, Clone, Copy, Default)]
pub struct RecentSongs;

impl CandidateSource for RecentSongs {
    fn candidates(&self, history: &[Song], seed: Option<&Song>, length: usize) -> Result<Vec<Song>> {
        let mut played: Vec<&Song> = history.iter().collect();
        played.sort_by_key(|s| std::cmp::Reverse(s.unix_time()));

        let mut seen = HashSet::new();
        let recent: Vec<Song> = played
            .into_iter()
            .filter(|s| seen.insert((s.artist.clone(), s.title.clone())))
            .take(length + 1)
            .cloned()
            .collect();
        Ok(seeded(seed, recent, length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_clamp_length() {
        assert_eq!(clamp_length(0), 1);
        assert_eq!(clamp_length(75), 75);
        assert_eq!(clamp_length(10_000), 200);
    }

    #[test]
    fn test_recent_songs_are_distinct_and_newest_first() -> Result<()> {
        let history = vec![
            Song::new("Blur", "Song 2").played_at(300),
            Song::new("Oasis", "Wonderwall").played_at(100),
            Song::new("Blur", "Song 2").played_at(200),
            Song::new("Pulp", "Common People").played_at(250),
        ];

        let picked = RecentSongs.candidates(&history, None, 2)?;

        let titles: Vec<_> = picked.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["Song 2", "Common People"]);
        Ok(())
    }

    #[test]
    fn test_seed_leads_recent_songs() -> Result<()> {
        let history = vec![
            Song::new("Blur", "Song 2").played_at(300),
            Song::new("Oasis", "Wonderwall").played_at(100),
            Song::new("Pulp", "Common People").played_at(250),
        ];
        let seed = Song::new("Pulp", "Common People");

        let picked = RecentSongs.candidates(&history, Some(&seed), 3)?;

        let titles: Vec<_> = picked.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["Common People", "Song 2", "Wonderwall"]);
        Ok(())
    }

    #[test]
    fn test_seeded_respects_length() {
        let seed = Song::new("Suede", "Animal Nitrate");
        let songs = vec![Song::new("Blur", "Song 2"), Song::new("Oasis", "Wonderwall")];

        assert_eq!(seeded(Some(&seed), songs.clone(), 2), vec![seed.clone(), songs[0].clone()]);
        assert_eq!(seeded(None, songs.clone(), 1), vec![songs[0].clone()]);
    }

    #[test]
    fn test_song_list_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("mix.json");
        fs::write(
            &path,
            r#"[{"artist": "Oasis", "title": "Wonderwall"},
                {"artist": "Blur", "title": "Song 2"},
                {"artist": "Pulp", "title": "Common People"}]"#,
        )?;

        let songs = SongListFile::new(&path).candidates(&[], None, 2)?;

        assert_eq!(songs, vec![Song::new("Oasis", "Wonderwall"), Song::new("Blur", "Song 2")]);
        Ok(())
    }

    #[test]
    fn test_missing_song_list_file_is_an_error() {
        let err = SongListFile::new("/nonexistent/mix.json")
            .candidates(&[], None, 10)
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/mix.json"));
    }
}
