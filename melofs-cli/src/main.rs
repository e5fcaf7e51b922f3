use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{info, warn};

use melofs::catalog::{BlockingFetcher, CatalogClient};
use melofs::config;
use melofs::fs::CatalogFs;
use melofs::fs::cache::TrackCache;
use melofs::fs::tree::CatalogTree;
use melofs::mount;

#[derive(Parser)]
#[command(name = "melofs")]
#[command(about = "Mount a remote music catalog as a read-only filesystem")]
#[command(version = "0.1.0")]
struct Cli {
    /// Directory to mount the catalog at (created if absent)
    mountpoint: PathBuf,

    /// Artist id to index; repeat for several artists
    #[arg(short, long = "artist", value_name = "ID", required = true)]
    artists: Vec<u64>,

    /// Catalog API base URL (defaults to MELOFS_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Bearer token for the catalog API (defaults to MELOFS_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Track cache directory (defaults to MELOFS_CACHE_DIR)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Target bitrate for downloads, in kbit/s
    #[arg(long, default_value_t = config::TRACK_BITRATE)]
    bitrate: u32,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let api_url = cli
        .api_url
        .or_else(config::api_url)
        .context("no catalog API url; pass --api-url or set MELOFS_API_URL")?;
    let token = cli.token.or_else(config::auth_token);
    let cache_dir = cli.cache_dir.unwrap_or_else(config::cache_dir);

    fs::create_dir_all(&cli.mountpoint).context("failed to create the mount point")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let client = match &token {
        Some(token) => CatalogClient::with_token(&api_url, token),
        None => CatalogClient::new(&api_url),
    }
    .enable_progress();

    // a failing artist is skipped entirely rather than half-indexed
    let mut tracks = Vec::new();
    for artist_id in &cli.artists {
        match runtime.block_on(client.all_artist_tracks(*artist_id)) {
            Ok(batch) => {
                info!("indexed {} tracks for artist {}", batch.len(), artist_id);
                tracks.extend(batch.into_iter().map(Arc::new));
            }
            Err(e) => warn!("skipping artist {}: {}", artist_id, e),
        }
    }
    if tracks.is_empty() {
        bail!("no tracks indexed, nothing to mount");
    }

    let fetcher = Arc::new(BlockingFetcher::new(client, runtime.handle().clone()));
    let cache = TrackCache::new(cache_dir, fetcher).with_bitrate(cli.bitrate);
    let tree = CatalogTree::build(&tracks, &cache);

    let summary = tree.summary();
    info!(
        "mounting {} artists, {} albums, {} tracks at {}",
        summary.artists,
        summary.albums,
        summary.tracks,
        cli.mountpoint.display()
    );

    mount::mount(CatalogFs::new(tree, cache), &cli.mountpoint)
        .context("failed to mount the filesystem")?;

    Ok(())
}
