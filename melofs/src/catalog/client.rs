use std::path::Path;
use std::sync::Arc;

use futures_util::StreamExt;
use log::debug;
use reqwest;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use super::model::{Track, TrackPage};
use super::progress::{NoopProgress, ProgressTracker};
use crate::config;
use crate::fs::cache::TrackFetcher;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Track listing failed with status code {0}")]
    ListingFailed(u16),

    #[error("Download failed with status code {0}")]
    DownloadFailed(u16),

    #[error("Response parse error: {0}")]
    ResponseParseError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    api_url: String,
    auth_token: Option<String>,
    progress: Arc<dyn ProgressTracker>,
}

impl CatalogClient {
    pub fn new(api_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            auth_token: None,
            progress: Arc::new(NoopProgress),
        }
    }

    pub fn with_token(api_url: &str, token: &str) -> Self {
        let mut client = Self::new(api_url);
        client.auth_token = Some(token.to_string());
        client
    }

    #[cfg(feature = "progress")]
    pub fn enable_progress(mut self) -> Self {
        self.progress = Arc::new(super::progress::IndicatifProgress::new());
        self
    }

    fn with_auth(&self, mut request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        request
    }

    /// Fetch one page of an artist's track listing.
    pub async fn artist_tracks(
        &self,
        artist_id: u64,
        page: u32,
        page_size: u32,
    ) -> Result<TrackPage> {
        let url = format!("{}/artists/{}/tracks", self.api_url, artist_id);

        let response = self
            .with_auth(
                self.http
                    .get(&url)
                    .query(&[("page", page), ("page-size", page_size)]),
            )
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CatalogError::ListingFailed(response.status().as_u16()));
        }

        Ok(response.json().await?)
    }

    /// Fetch every track of an artist, driving the pagination loop until the
    /// reported total is exhausted.
    pub async fn all_artist_tracks(&self, artist_id: u64) -> Result<Vec<Track>> {
        let page_size = config::CATALOG_PAGE_SIZE;
        let mut tracks = Vec::new();
        let mut page = 0;

        loop {
            let batch = self.artist_tracks(artist_id, page, page_size).await?;
            let total = batch.pager.total;

            if batch.tracks.is_empty() {
                break;
            }
            tracks.extend(batch.tracks);

            debug!(
                "artist {}: {}/{} tracks after page {}",
                artist_id,
                tracks.len(),
                total,
                page
            );

            if tracks.len() as u64 >= total {
                break;
            }
            page += 1;
        }

        Ok(tracks)
    }

    /// Stream the encoded audio of a track to `dest`. The caller owns the
    /// destination path; nothing is cleaned up here on failure.
    pub async fn download_track(
        &self,
        track: &Track,
        dest: &Path,
        codec: &str,
        bitrate: u32,
    ) -> Result<()> {
        let url = format!("{}/tracks/{}/download", self.api_url, track.id);

        let bitrate = bitrate.to_string();
        let response = self
            .with_auth(
                self.http
                    .get(&url)
                    .query(&[("codec", codec), ("bitrate", bitrate.as_str())]),
            )
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CatalogError::DownloadFailed(response.status().as_u16()));
        }

        let content_length = response.content_length().unwrap_or(0);
        self.progress
            .start_download(track.id, &track.title, content_length);

        let mut file = File::create(dest).await?;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            self.progress.update(track.id, chunk.len() as u64);
        }

        self.progress.finish(track.id);
        file.flush().await?;

        Ok(())
    }
}

/// Blocking facade over [`CatalogClient`] for the synchronous filesystem
/// path. Filesystem callbacks run on kernel-driven threads, so entering the
/// runtime via a stored handle is safe there.
pub struct BlockingFetcher {
    client: CatalogClient,
    handle: tokio::runtime::Handle,
}

impl BlockingFetcher {
    pub fn new(client: CatalogClient, handle: tokio::runtime::Handle) -> Self {
        Self { client, handle }
    }
}

impl TrackFetcher for BlockingFetcher {
    fn fetch(&self, track: &Track, dest: &Path, codec: &str, bitrate: u32) -> Result<()> {
        self.handle
            .block_on(self.client.download_track(track, dest, codec, bitrate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires a live catalog endpoint"]
    async fn test_artist_tracks() {
        let client = CatalogClient::new("https://catalog.example.com/api");
        let page = client.artist_tracks(1, 0, 20).await.unwrap();
        println!("First page: {:?}", page.tracks);
    }
}
