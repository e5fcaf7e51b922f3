use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistRef {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumRef {
    pub id: u64,
    pub title: String,

    #[serde(default)]
    pub artists: Vec<ArtistRef>,
}

/// One track descriptor as the catalog reports it. A track may be listed on
/// several albums, and an album may be credited to several artists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: u64,
    pub title: String,

    #[serde(default)]
    pub artists: Vec<ArtistRef>,

    #[serde(default)]
    pub albums: Vec<AlbumRef>,
}

impl Track {
    /// First-listed artist name, the one the cache path is keyed by.
    pub fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(|a| a.name.as_str())
    }

    /// First-listed album title, the one the cache path is keyed by.
    pub fn primary_album(&self) -> Option<&str> {
        self.albums.first().map(|a| a.title.as_str())
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Pager {
    pub total: u64,
    pub page: u32,

    #[serde(rename = "perPage")]
    pub per_page: u32,
}

/// One page of an artist's track listing.
#[derive(Debug, Deserialize, Serialize)]
pub struct TrackPage {
    pub pager: Pager,

    #[serde(default)]
    pub tracks: Vec<Track>,
}
