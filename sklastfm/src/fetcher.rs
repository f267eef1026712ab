//! Single-page fetch with bounded retry
//!
//! A page is requested up to [`MAX_PAGE_ATTEMPTS`] times back to back (no
//! delay). When every attempt fails the page degrades to an empty song list
//! instead of an error, so one bad page never aborts a sync.

use crate::client::{HistoryQuery, HistorySource};
use crate::error::Error;
use crate::models::{PageAttr, RawTrack, Song};
use tracing::{debug, warn};

/// Attempts per page before giving up
pub const MAX_PAGE_ATTEMPTS: u32 = 4;

/// Result of fetching one page
#[derive(Debug, Default)]
pub struct FetchedPage {
    /// 1-based page index
    pub page: u32,
    /// Songs of the page, oldest first
    pub songs: Vec<Song>,
    /// Total page count reported by the API (0 when the fetch failed)
    pub total_pages: u32,
    pub success: bool,
    /// Error of the last failed attempt
    pub error: Option<Error>,
}

/// Fetches pages from a [`HistorySource`] with retry
#[derive(Debug)]
pub struct PageFetcher<S> {
    source: S,
}

impl<S: HistorySource> PageFetcher<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch one page
    ///
    /// Never fails: after the last failed attempt the page comes back empty
    /// with `success == false`.
    pub async fn fetch(&self, query: &HistoryQuery, page: u32) -> FetchedPage {
        let mut last_error = None;

        for attempt in 1..=MAX_PAGE_ATTEMPTS {
            match self.source.recent_tracks(query, page).await {
                Ok(response) => {
                    let recent = response.recent_tracks;
                    let total_pages = reported_pages(&recent.attr);
                    let songs = page_songs(recent.tracks);
                    debug!(user = %query.user, page, attempt, songs = songs.len(), "Fetched page");
                    return FetchedPage {
                        page,
                        songs,
                        total_pages,
                        success: true,
                        error: None,
                    };
                }
                Err(e) => {
                    debug!(user = %query.user, page, attempt, error = %e, "Page fetch failed");
                    last_error = Some(e);
                }
            }
        }

        warn!(
            user = %query.user,
            page,
            attempts = MAX_PAGE_ATTEMPTS,
            "Giving up on page, it will contribute no songs"
        );
        FetchedPage {
            page,
            songs: Vec::new(),
            total_pages: 0,
            success: false,
            error: last_error,
        }
    }
}

/// Page count of a response, checked against its song count
///
/// A `totalPages` larger than `ceil(total / perPage)` is not trusted; the
/// computed count wins. When either figure is missing the reported value is
/// kept as is.
fn reported_pages(attr: &PageAttr) -> u32 {
    let mut pages = attr.total_pages;
    if attr.per_page > 0 && attr.total > 0 {
        let expected = attr.total.div_ceil(attr.per_page);
        if pages > expected {
            warn!(
                reported = pages,
                expected,
                total = attr.total,
                per_page = attr.per_page,
                "Page count does not match the song count"
            );
            pages = expected;
        }
    }
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Convert a raw page (newest first) into songs, oldest first
///
/// A leading "now playing" entry is dropped: it is not a finished play and
/// will show up again with a timestamp once it is.
pub fn page_songs(mut tracks: Vec<RawTrack>) -> Vec<Song> {
    if tracks.first().is_some_and(RawTrack::is_now_playing) {
        tracks.remove(0);
    }
    tracks.into_iter().rev().map(RawTrack::into_song).collect()
}
