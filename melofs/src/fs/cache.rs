use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::catalog::model::Track;
use crate::config;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Track fetch failed: {0}")]
    Fetch(#[from] CatalogError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// The seam to the remote catalog: one blocking call that writes the encoded
/// track to `dest`. The production implementation is
/// [`crate::catalog::BlockingFetcher`]; tests substitute a local fake.
pub trait TrackFetcher: Send + Sync {
    fn fetch(
        &self,
        track: &Track,
        dest: &Path,
        codec: &str,
        bitrate: u32,
    ) -> std::result::Result<(), CatalogError>;
}

/// On-disk track cache with deferred downloads.
///
/// Whether a track is cached is never stored; it is recomputed from disk on
/// every query, so the cache path stays the single source of truth and
/// out-of-process cache priming just works.
pub struct TrackCache {
    root: PathBuf,
    extension: &'static str,
    bitrate: u32,
    fetcher: Arc<dyn TrackFetcher>,
}

impl TrackCache {
    pub fn new(root: PathBuf, fetcher: Arc<dyn TrackFetcher>) -> Self {
        Self {
            root,
            extension: config::TRACK_EXTENSION,
            bitrate: config::TRACK_BITRATE,
            fetcher,
        }
    }

    pub fn with_bitrate(mut self, bitrate: u32) -> Self {
        self.bitrate = bitrate;
        self
    }

    /// Canonical cache path for a track:
    /// `<root>/<artist>/<album>/<title><extension>`, keyed by the track's
    /// first-listed artist and album. Pure; nothing is created here.
    /// `None` if the catalog gave the track no artist or album to key by.
    pub fn track_path(&self, track: &Track) -> Option<PathBuf> {
        let artist = track.primary_artist()?;
        let album = track.primary_album()?;

        Some(
            self.root
                .join(artist)
                .join(album)
                .join(self.track_filename(track)),
        )
    }

    /// Filename a track is listed under: its title plus the fixed extension.
    pub fn track_filename(&self, track: &Track) -> String {
        format!("{}{}", track.title, self.extension)
    }

    pub fn is_cached(&self, path: &Path) -> bool {
        path.is_file()
    }

    /// Size of the cached file, 0 if not cached. Never triggers a fetch.
    pub fn size_of(&self, path: &Path) -> u64 {
        fs::metadata(path).map(|m| m.len()).unwrap_or(0)
    }

    /// Full contents of the track, fetching from the catalog first if the
    /// cache file does not exist yet. Blocks for the duration of the
    /// transfer on a cache miss.
    pub fn contents_of(&self, track: &Track, path: &Path) -> Result<Vec<u8>> {
        if !self.is_cached(path) {
            self.fetch_to(track, path)?;
        }

        Ok(fs::read(path)?)
    }

    /// Download to a sibling temp file and rename into place, so a reader
    /// can never observe a partially written file as cached. On failure the
    /// temp file is removed and the final path is left absent.
    fn fetch_to(&self, track: &Track, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut partial = dest.as_os_str().to_owned();
        partial.push(".part");
        let partial = PathBuf::from(partial);

        let codec = self.extension.trim_start_matches('.');
        debug!("fetching track {} to {:?}", track.id, dest);

        match self.fetcher.fetch(track, &partial, codec, self.bitrate) {
            Ok(()) => {
                fs::rename(&partial, dest)?;
                Ok(())
            }
            Err(e) => {
                let _ = fs::remove_file(&partial);
                Err(e.into())
            }
        }
    }
}
