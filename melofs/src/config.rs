use std::env;
use std::path::PathBuf;

use dirs;

const DEFAULT_CACHE_DIR: &str = "~/.melofs/cache";

/// Extension appended to every track title to form its filename; the codec
/// requested from the catalog is this extension without the dot.
pub const TRACK_EXTENSION: &str = ".mp3";

/// Target bitrate requested for downloads, in kbit/s.
pub const TRACK_BITRATE: u32 = 192;

/// Page size used when enumerating an artist's tracks.
pub const CATALOG_PAGE_SIZE: u32 = 20;

/// Minimum number of bytes the synthetic placeholder buffer is filled to.
pub const PLACEHOLDER_MIN_LEN: usize = 1024;

/// Size advertised for a track file while it has not been fetched yet.
pub const PLACEHOLDER_REPORTED_LEN: u64 = 8192;

/// A track is fetched once the bytes requested from it exceed
/// `PLACEHOLDER_REPORTED_LEN * PROBE_READ_MULTIPLIER`. Tuned so that a
/// handful of format-sniffing reads stays under the threshold while
/// sequential playback crosses it almost immediately.
pub const PROBE_READ_MULTIPLIER: u64 = 6;

/// Marker filename some playback daemons probe for to skip a directory.
/// It is never listed and never resolves.
pub const IGNORE_MARKER: &str = ".mpdignore";

pub fn cache_dir() -> PathBuf {
    let cache_dir = env::var("MELOFS_CACHE_DIR").unwrap_or(DEFAULT_CACHE_DIR.to_string());
    if cache_dir.starts_with("~") {
        let home_dir = dirs::home_dir();
        if let Some(home_dir) = home_dir {
            return home_dir.join(&cache_dir[2..]);
        }
    }

    cache_dir.into()
}

pub fn api_url() -> Option<String> {
    env::var("MELOFS_API_URL").ok()
}

pub fn auth_token() -> Option<String> {
    env::var("MELOFS_TOKEN").ok()
}
