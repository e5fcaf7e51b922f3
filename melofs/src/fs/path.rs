/// Split a virtual filesystem path into its non-empty segments.
///
/// Leading, trailing and doubled separators collapse without producing
/// empty segments: `"/Artist/Album/Track.mp3"` becomes
/// `["Artist", "Album", "Track.mp3"]` and `"/"` becomes `[]`.
///
/// The segment count addresses the filesystem level: 0 is the root, 1 an
/// artist directory, 2 an album directory, 3 a track file. Anything deeper
/// is invalid and must be rejected by the caller.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
