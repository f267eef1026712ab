//! Song and artist autocompletion over a cached history
//!
//! Candidates are the user's distinct (artist, title) pairs. A candidate
//! matches when the query is a substring of its title (or artist), ignoring
//! case; matches are ranked by edit distance to the query, closest first.

use crate::cache::HistoryCache;
use crate::error::{Error, Result};
use crate::models::Song;
use std::collections::HashSet;
use tracing::debug;

/// Number of suggestions returned when the caller does not say
pub const DEFAULT_MATCH_LIMIT: usize = 10;

/// Which part of a song the query is compared against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchField {
    Title,
    Artist,
}

impl MatchField {
    fn of<'a>(&self, song: &'a Song) -> &'a str {
        match self {
            MatchField::Title => &song.title,
            MatchField::Artist => &song.artist,
        }
    }
}

/// Distinct (artist, title) pairs in first-played order, without timestamps
pub fn unique_songs(history: &[Song]) -> Vec<Song> {
    let mut seen = HashSet::new();
    history
        .iter()
        .filter(|s| seen.insert((s.artist.as_str(), s.title.as_str())))
        .map(|s| Song::new(s.artist.clone(), s.title.clone()))
        .collect()
}

/// Up to `limit` songs whose `field` contains `query`, closest first
///
/// Songs without a title are never suggested. Equal distances keep the
/// order of `candidates`.
pub fn best_matches(query: &str, candidates: &[Song], field: MatchField, limit: usize) -> Vec<Song> {
    let needle = query.to_lowercase();

    let mut ranked: Vec<(usize, &Song)> = candidates
        .iter()
        .filter(|s| !s.title.is_empty())
        .filter_map(|s| {
            let text = field.of(s).to_lowercase();
            text.contains(&needle)
                .then(|| (strsim::levenshtein(&needle, &text), s))
        })
        .collect();
    ranked.sort_by_key(|(distance, _)| *distance);

    ranked
        .into_iter()
        .take(limit)
        .map(|(_, s)| s.clone())
        .collect()
}

impl HistoryCache {
    /// Distinct songs of a user's cached history
    ///
    /// # Errors
    ///
    /// [`Error::NoHistory`] when the user has never been synchronized.
    pub fn unique_songs(&self, user: &str) -> Result<Vec<Song>> {
        let snapshot = self
            .read(user)?
            .ok_or_else(|| Error::NoHistory(user.to_string()))?;
        let songs = unique_songs(&snapshot.songs);
        debug!(user = %user, plays = snapshot.len(), unique = songs.len(), "Loaded unique songs");
        Ok(songs)
    }
}
