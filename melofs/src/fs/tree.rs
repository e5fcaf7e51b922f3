use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use log::warn;

use super::cache::TrackCache;
use crate::catalog::model::Track;

/// In-memory representative of one catalog track: the remote descriptor,
/// the cache path computed once at insertion, and the running total of bytes
/// requested across all reads of this track.
///
/// The counter's mutex doubles as the per-track gate: the filesystem holds
/// it across check-cached, maybe-fetch and read, so two concurrent readers
/// cannot both observe "not cached" and download the same track twice.
pub struct TrackHandle {
    track: Arc<Track>,
    cache_path: PathBuf,
    bytes_requested: Mutex<u64>,
}

impl TrackHandle {
    pub fn new(track: Arc<Track>, cache_path: PathBuf) -> Self {
        Self {
            track,
            cache_path,
            bytes_requested: Mutex::new(0),
        }
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Lock the read ledger. The counter only ever increases; hold the guard
    /// for the whole of a read so the fetch decision stays atomic.
    pub(crate) fn bytes_requested(&self) -> MutexGuard<'_, u64> {
        self.bytes_requested.lock().unwrap()
    }
}

type TrackMap = BTreeMap<String, Arc<TrackHandle>>;
type AlbumMap = BTreeMap<String, TrackMap>;

/// Three-level ordered mapping of artist name → album title → track title,
/// built once at mount time and read-only afterwards. A track appearing on
/// several albums or under several artists is inserted once per
/// (artist, album) pair, sharing a single handle.
pub struct CatalogTree {
    artists: BTreeMap<String, AlbumMap>,
}

pub struct TreeSummary {
    pub artists: usize,
    pub albums: usize,
    pub tracks: usize,
}

impl CatalogTree {
    pub fn build(tracks: &[Arc<Track>], cache: &TrackCache) -> Self {
        let mut artists: BTreeMap<String, AlbumMap> = BTreeMap::new();

        for track in tracks {
            if track.title.is_empty() {
                warn!("skipping track {} with empty title", track.id);
                continue;
            }

            let Some(cache_path) = cache.track_path(track) else {
                warn!("skipping track {}: no artist or album to file it under", track.id);
                continue;
            };

            let handle = Arc::new(TrackHandle::new(Arc::clone(track), cache_path));

            for album in &track.albums {
                if album.title.is_empty() {
                    continue;
                }
                for artist in &album.artists {
                    if artist.name.is_empty() {
                        continue;
                    }

                    artists
                        .entry(artist.name.clone())
                        .or_default()
                        .entry(album.title.clone())
                        .or_default()
                        .insert(track.title.clone(), Arc::clone(&handle));
                }
            }
        }

        Self { artists }
    }

    pub fn artists(&self) -> impl Iterator<Item = &str> {
        self.artists.keys().map(String::as_str)
    }

    pub fn albums(&self, artist: &str) -> Option<impl Iterator<Item = &str>> {
        self.artists
            .get(artist)
            .map(|albums| albums.keys().map(String::as_str))
    }

    pub fn tracks(
        &self,
        artist: &str,
        album: &str,
    ) -> Option<impl Iterator<Item = (&str, &Arc<TrackHandle>)>> {
        self.artists
            .get(artist)
            .and_then(|albums| albums.get(album))
            .map(|tracks| tracks.iter().map(|(title, handle)| (title.as_str(), handle)))
    }

    pub fn get(&self, artist: &str, album: &str, title: &str) -> Option<&Arc<TrackHandle>> {
        self.artists
            .get(artist)
            .and_then(|albums| albums.get(album))
            .and_then(|tracks| tracks.get(title))
    }

    pub fn is_empty(&self) -> bool {
        self.artists.is_empty()
    }

    pub fn summary(&self) -> TreeSummary {
        let albums = self.artists.values().map(|a| a.len()).sum();
        let tracks = self
            .artists
            .values()
            .flat_map(|albums| albums.values())
            .map(|tracks| tracks.len())
            .sum();

        TreeSummary {
            artists: self.artists.len(),
            albums,
            tracks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogError;
    use crate::catalog::model::{AlbumRef, ArtistRef};
    use crate::fs::cache::TrackFetcher;

    struct NoFetcher;

    impl TrackFetcher for NoFetcher {
        fn fetch(
            &self,
            _track: &Track,
            _dest: &Path,
            _codec: &str,
            _bitrate: u32,
        ) -> Result<(), CatalogError> {
            unreachable!("tree tests never fetch");
        }
    }

    fn artist(id: u64, name: &str) -> ArtistRef {
        ArtistRef {
            id,
            name: name.to_string(),
        }
    }

    fn track(id: u64, title: &str, album_title: &str, artists: Vec<ArtistRef>) -> Arc<Track> {
        Arc::new(Track {
            id,
            title: title.to_string(),
            artists: artists.clone(),
            albums: vec![AlbumRef {
                id: id * 10,
                title: album_title.to_string(),
                artists,
            }],
        })
    }

    fn test_cache() -> TrackCache {
        TrackCache::new(PathBuf::from("/cache"), Arc::new(NoFetcher))
    }

    #[test]
    fn test_names_come_back_ordered() {
        let tracks = vec![
            track(1, "Zebra", "B-Sides", vec![artist(1, "Mild Horses")]),
            track(2, "Apple", "B-Sides", vec![artist(1, "Mild Horses")]),
            track(3, "Middle", "Anthology", vec![artist(2, "Ada")]),
        ];
        let tree = CatalogTree::build(&tracks, &test_cache());

        let artists: Vec<_> = tree.artists().collect();
        assert_eq!(artists, vec!["Ada", "Mild Horses"]);

        let titles: Vec<_> = tree
            .tracks("Mild Horses", "B-Sides")
            .unwrap()
            .map(|(title, _)| title)
            .collect();
        assert_eq!(titles, vec!["Apple", "Zebra"]);
    }

    #[test]
    fn test_multi_artist_album_fans_out() {
        let both = vec![artist(1, "Ada"), artist(2, "Bela")];
        let tracks = vec![track(1, "Duet", "Together", both)];
        let tree = CatalogTree::build(&tracks, &test_cache());

        let ada = tree.get("Ada", "Together", "Duet").unwrap();
        let bela = tree.get("Bela", "Together", "Duet").unwrap();

        // one handle per catalog track, shared across both directories
        assert!(Arc::ptr_eq(ada, bela));
        assert_eq!(tree.summary().tracks, 2);
        assert_eq!(tree.summary().artists, 2);
    }

    #[test]
    fn test_empty_names_are_skipped() {
        let tracks = vec![
            track(1, "", "Album", vec![artist(1, "Ada")]),
            track(2, "Song", "", vec![artist(1, "Ada")]),
            track(3, "Song", "Album", vec![artist(1, "")]),
        ];
        let tree = CatalogTree::build(&tracks, &test_cache());

        // track 3 keeps its cache path (artist name from the track listing)
        // but lands in no directory, so the tree stays empty
        assert!(tree.is_empty());
    }

    #[test]
    fn test_handle_counter_is_monotonic() {
        let tracks = vec![track(1, "Song", "Album", vec![artist(1, "Ada")])];
        let tree = CatalogTree::build(&tracks, &test_cache());
        let handle = tree.get("Ada", "Album", "Song").unwrap();

        *handle.bytes_requested() += 4096;
        *handle.bytes_requested() += 100;
        assert_eq!(*handle.bytes_requested(), 4196);
    }
}
