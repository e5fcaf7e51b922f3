use std::sync::Arc;
use std::time::SystemTime;

use libc::{EIO, EISDIR, ENOENT, ENOTDIR};
use log::{error, info};

use super::cache::TrackCache;
use super::path::split_path;
use super::placeholder::PlaceholderStream;
use super::tree::{CatalogTree, TrackHandle};
use crate::config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

/// Host-agnostic file attributes; the mount glue translates these into
/// whatever the kernel interface wants.
#[derive(Debug, Clone)]
pub struct FileAttributes {
    pub kind: EntryKind,
    pub size: u64,
    pub perm: u16,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub mtime: SystemTime,
}

/// The read-only catalog filesystem: directory listing, attribute queries
/// and reads over the three-level artist/album/track tree.
///
/// Per-track read behavior is a one-way state machine driven purely by disk
/// state and the bytes-requested counter. While a track is uncached and its
/// counter is at or under the probe threshold, reads and sizes come from the
/// placeholder stream; the read that pushes the counter over the threshold
/// performs the blocking fetch; once the cache file exists everything is
/// served from it.
pub struct CatalogFs {
    tree: CatalogTree,
    cache: TrackCache,
    placeholder: PlaceholderStream,
    threshold: u64,
    uid: u32,
    gid: u32,
}

impl CatalogFs {
    pub fn new(tree: CatalogTree, cache: TrackCache) -> Self {
        let placeholder = PlaceholderStream::default();
        let threshold = placeholder.reported_len() * config::PROBE_READ_MULTIPLIER;

        info!(
            "catalog filesystem ready: placeholder {}/{} bytes, fetch threshold {}",
            placeholder.real_len(),
            placeholder.reported_len(),
            threshold
        );

        Self {
            tree,
            cache,
            placeholder,
            threshold,
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
        }
    }

    /// Ordered entries of a directory, `.` and `..` included.
    pub fn readdir(&self, path: &str) -> Result<Vec<String>, i32> {
        let parts = split_path(path);
        let mut names = vec![".".to_string(), "..".to_string()];

        match parts.as_slice() {
            [] => names.extend(self.tree.artists().map(str::to_string)),
            [artist] => {
                let albums = self.tree.albums(artist).ok_or(ENOENT)?;
                names.extend(albums.map(str::to_string));
            }
            [artist, album] => {
                let tracks = self.tree.tracks(artist, album).ok_or(ENOENT)?;
                names.extend(
                    tracks
                        .map(|(_, handle)| self.cache.track_filename(handle.track()))
                        .filter(|name| name != config::IGNORE_MARKER),
                );
            }
            _ => return Err(ENOTDIR),
        }

        Ok(names)
    }

    pub fn getattr(&self, path: &str) -> Result<FileAttributes, i32> {
        let parts = split_path(path);
        if parts.contains(&config::IGNORE_MARKER) {
            return Err(ENOENT);
        }

        match parts.as_slice() {
            [] => Ok(self.dir_attributes()),
            [artist] => {
                self.tree.albums(artist).ok_or(ENOENT)?;
                Ok(self.dir_attributes())
            }
            [artist, album] => {
                self.tree.tracks(artist, album).ok_or(ENOENT)?;
                Ok(self.dir_attributes())
            }
            [artist, album, filename] => {
                let handle = self.resolve_track(artist, album, filename)?;
                let size = if self.cache.is_cached(handle.cache_path()) {
                    self.cache.size_of(handle.cache_path())
                } else {
                    self.placeholder.reported_len()
                };
                Ok(self.file_attributes(size))
            }
            _ => Err(ENOENT),
        }
    }

    /// Read a window of a track file.
    ///
    /// The counter advances by `offset + length`, not `length`: high-offset
    /// seeks overshoot quickly, which is the intended bias towards treating
    /// them as real playback.
    pub fn read(&self, path: &str, length: usize, offset: u64) -> Result<Vec<u8>, i32> {
        let parts = split_path(path);
        if parts.contains(&config::IGNORE_MARKER) {
            return Err(ENOENT);
        }

        let [artist, album, filename] = parts.as_slice() else {
            return Err(if parts.len() < 3 { EISDIR } else { ENOTDIR });
        };
        let handle = self.resolve_track(artist, album, filename)?;

        // the guard spans check-cached, maybe-fetch and read, so concurrent
        // readers of one track cannot trigger a duplicate download
        let mut requested = handle.bytes_requested();
        *requested += offset + length as u64;

        if self.cache.is_cached(handle.cache_path()) || *requested > self.threshold {
            let contents = self
                .cache
                .contents_of(handle.track(), handle.cache_path())
                .map_err(|e| {
                    error!("read of track {} failed: {}", handle.track().id, e);
                    EIO
                })?;
            Ok(window(&contents, offset, length))
        } else {
            Ok(self.placeholder_window(offset, length))
        }
    }

    fn resolve_track(
        &self,
        artist: &str,
        album: &str,
        filename: &str,
    ) -> Result<&Arc<TrackHandle>, i32> {
        let title = filename
            .strip_suffix(config::TRACK_EXTENSION)
            .ok_or(ENOENT)?;
        self.tree.get(artist, album, title).ok_or(ENOENT)
    }

    /// Placeholder bytes for an unfetched track, clipped to the advertised
    /// file size. The stream itself loops forever; end-of-file lives here.
    fn placeholder_window(&self, offset: u64, length: usize) -> Vec<u8> {
        let reported = self.placeholder.reported_len();
        if offset >= reported {
            return Vec::new();
        }

        let available = (reported - offset).min(length as u64) as usize;
        self.placeholder.read_at(offset, available)
    }

    fn dir_attributes(&self) -> FileAttributes {
        FileAttributes {
            kind: EntryKind::Directory,
            size: 0,
            perm: 0o554,
            nlink: 2,
            uid: self.uid,
            gid: self.gid,
            mtime: SystemTime::now(),
        }
    }

    fn file_attributes(&self, size: u64) -> FileAttributes {
        FileAttributes {
            kind: EntryKind::File,
            size,
            perm: 0o444,
            nlink: 1,
            uid: self.uid,
            gid: self.gid,
            mtime: SystemTime::now(),
        }
    }
}

fn window(contents: &[u8], offset: u64, length: usize) -> Vec<u8> {
    let start = (offset.min(contents.len() as u64)) as usize;
    let end = (start + length).min(contents.len());
    contents[start..end].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};

    use crate::catalog::CatalogError;
    use crate::catalog::model::{AlbumRef, ArtistRef, Track};
    use crate::fs::cache::TrackFetcher;

    struct FakeFetcher {
        bytes: Vec<u8>,
    }

    impl TrackFetcher for FakeFetcher {
        fn fetch(
            &self,
            _track: &Track,
            dest: &Path,
            _codec: &str,
            _bitrate: u32,
        ) -> Result<(), CatalogError> {
            fs::write(dest, &self.bytes)?;
            Ok(())
        }
    }

    fn sample_track() -> Arc<Track> {
        let owls = ArtistRef {
            id: 7,
            name: "The Owls".to_string(),
        };
        Arc::new(Track {
            id: 101,
            title: "Intro".to_string(),
            artists: vec![owls.clone()],
            albums: vec![AlbumRef {
                id: 42,
                title: "Night Flight".to_string(),
                artists: vec![owls],
            }],
        })
    }

    fn sample_fs(cache_root: PathBuf, payload: Vec<u8>) -> CatalogFs {
        let cache = TrackCache::new(cache_root, Arc::new(FakeFetcher { bytes: payload }));
        let tree = CatalogTree::build(&[sample_track()], &cache);
        CatalogFs::new(tree, cache)
    }

    #[test]
    fn test_readdir_at_every_depth() {
        let dir = tempfile::tempdir().unwrap();
        let fs = sample_fs(dir.path().to_path_buf(), vec![]);

        assert_eq!(fs.readdir("/").unwrap(), vec![".", "..", "The Owls"]);
        assert_eq!(
            fs.readdir("/The Owls").unwrap(),
            vec![".", "..", "Night Flight"]
        );
        assert_eq!(
            fs.readdir("/The Owls/Night Flight").unwrap(),
            vec![".", "..", "Intro.mp3"]
        );

        assert_eq!(fs.readdir("/Nobody").unwrap_err(), ENOENT);
        assert_eq!(
            fs.readdir("/The Owls/Night Flight/Intro.mp3").unwrap_err(),
            ENOTDIR
        );
    }

    #[test]
    fn test_readdir_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let fs = sample_fs(dir.path().to_path_buf(), vec![]);

        assert_eq!(fs.readdir("/").unwrap(), fs.readdir("/").unwrap());
        assert_eq!(
            fs.readdir("/The Owls").unwrap(),
            fs.readdir("/The Owls").unwrap()
        );
    }

    #[test]
    fn test_getattr_modes_and_placeholder_size() {
        let dir = tempfile::tempdir().unwrap();
        let fs = sample_fs(dir.path().to_path_buf(), vec![]);

        let root = fs.getattr("/").unwrap();
        assert_eq!(root.kind, EntryKind::Directory);
        assert_eq!(root.nlink, 2);
        assert_eq!(root.size, 0);

        let album = fs.getattr("/The Owls/Night Flight").unwrap();
        assert_eq!(album.kind, EntryKind::Directory);
        assert_eq!(album.perm, 0o554);

        let file = fs.getattr("/The Owls/Night Flight/Intro.mp3").unwrap();
        assert_eq!(file.kind, EntryKind::File);
        assert_eq!(file.perm, 0o444);
        assert_eq!(file.nlink, 1);
        assert_eq!(file.size, config::PLACEHOLDER_REPORTED_LEN);

        assert_eq!(fs.getattr("/The Owls/Missing").unwrap_err(), ENOENT);
        assert_eq!(
            fs.getattr("/The Owls/Night Flight/Intro.flac").unwrap_err(),
            ENOENT
        );
        assert_eq!(fs.getattr("/a/b/c/d").unwrap_err(), ENOENT);
    }

    #[test]
    fn test_ignore_marker_is_never_found() {
        let dir = tempfile::tempdir().unwrap();
        let fs = sample_fs(dir.path().to_path_buf(), vec![]);

        assert_eq!(fs.getattr("/.mpdignore").unwrap_err(), ENOENT);
        assert_eq!(fs.getattr("/The Owls/.mpdignore").unwrap_err(), ENOENT);
        assert_eq!(
            fs.getattr("/The Owls/Night Flight/.mpdignore").unwrap_err(),
            ENOENT
        );
        assert_eq!(
            fs.read("/The Owls/Night Flight/.mpdignore", 16, 0)
                .unwrap_err(),
            ENOENT
        );
        assert!(
            !fs.readdir("/The Owls/Night Flight")
                .unwrap()
                .contains(&".mpdignore".to_string())
        );
    }

    #[test]
    fn test_probe_reads_serve_placeholder_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let catalog_fs = sample_fs(dir.path().to_path_buf(), b"real audio".to_vec());
        let path = "/The Owls/Night Flight/Intro.mp3";

        let expected = PlaceholderStream::default();
        let probe = catalog_fs.read(path, 64, 0).unwrap();
        assert_eq!(probe, expected.read_at(0, 64));

        // a probe near the reported end is clipped, not wrapped past EOF
        let tail_offset = config::PLACEHOLDER_REPORTED_LEN - 16;
        let tail = catalog_fs.read(path, 64, tail_offset).unwrap();
        assert_eq!(tail.len(), 16);
        assert_eq!(tail, expected.read_at(tail_offset, 16));

        // nothing past the advertised size
        assert!(
            catalog_fs
                .read(path, 16, config::PLACEHOLDER_REPORTED_LEN)
                .unwrap()
                .is_empty()
        );

        // none of that fetched anything
        let dir_is_empty = fs::read_dir(dir.path()).unwrap().next().is_none();
        assert!(dir_is_empty);
    }

    #[test]
    fn test_crossing_the_threshold_fetches_and_sticks() {
        let dir = tempfile::tempdir().unwrap();
        let payload = b"the genuine article".to_vec();
        let catalog_fs = sample_fs(dir.path().to_path_buf(), payload.clone());
        let path = "/The Owls/Night Flight/Intro.mp3";

        // a high-offset read overshoots the threshold on its own
        let threshold = config::PLACEHOLDER_REPORTED_LEN * config::PROBE_READ_MULTIPLIER;
        let first = catalog_fs.read(path, 4096, threshold + 1).unwrap();
        // the fetched file is shorter than the requested offset
        assert!(first.is_empty());

        let cached = dir
            .path()
            .join("The Owls")
            .join("Night Flight")
            .join("Intro.mp3");
        assert!(cached.is_file());

        // size and contents now reflect the real file
        let attr = catalog_fs.getattr(path).unwrap();
        assert_eq!(attr.size, payload.len() as u64);
        assert_eq!(catalog_fs.read(path, 64, 0).unwrap(), payload);

        // windowed reads of the cached bytes are stable
        assert_eq!(catalog_fs.read(path, 7, 4).unwrap(), payload[4..11].to_vec());
        assert_eq!(
            catalog_fs.read(path, 7, 4).unwrap(),
            catalog_fs.read(path, 7, 4).unwrap()
        );
    }

    #[test]
    fn test_externally_primed_cache_is_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        let catalog_fs = sample_fs(dir.path().to_path_buf(), vec![]);
        let path = "/The Owls/Night Flight/Intro.mp3";

        // someone else populates the cache out of process
        let album_dir = dir.path().join("The Owls").join("Night Flight");
        fs::create_dir_all(&album_dir).unwrap();
        fs::write(album_dir.join("Intro.mp3"), b"primed").unwrap();

        let attr = catalog_fs.getattr(path).unwrap();
        assert_eq!(attr.size, 6);
        assert_eq!(catalog_fs.read(path, 16, 0).unwrap(), b"primed");
    }

    #[test]
    fn test_read_of_a_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let fs = sample_fs(dir.path().to_path_buf(), vec![]);

        assert_eq!(fs.read("/", 16, 0).unwrap_err(), EISDIR);
        assert_eq!(fs.read("/The Owls", 16, 0).unwrap_err(), EISDIR);
        assert_eq!(fs.read("/a/b/c/d", 16, 0).unwrap_err(), ENOTDIR);
    }
}
