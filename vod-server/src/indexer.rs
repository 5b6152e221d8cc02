//! Background index building.
//!
//! Requests that find no usable index fire a notification into an
//! [`IndexSink`] and move on; the worker task drains the queue, rebuilds
//! the index and persists it atomically so the next request for the same
//! asset takes the fast path. Duplicate notifications are harmless: the
//! worker re-checks for a fresh index before doing any work.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use fragment::{FragmentListBuilder, index};
use mp4::Movie;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;

/// Request to (re)build the persisted index for one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRequest {
    pub asset: String,
}

/// Capability to enqueue an index build. Delivery is best-effort and
/// unacknowledged; the caller never waits.
pub trait IndexSink: Send + Sync {
    fn notify(&self, request: IndexRequest);
}

/// [`IndexSink`] backed by an unbounded channel to the worker task.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<IndexRequest>,
}

impl IndexSink for ChannelSink {
    fn notify(&self, request: IndexRequest) {
        if self.tx.send(request).is_err() {
            warn!("index worker is gone; dropping notification");
        }
    }
}

/// Index file path for an asset: the asset path mirrored under the index
/// directory with an `.idx` suffix.
pub fn index_path(config: &Config, asset: &str) -> PathBuf {
    let mut path = config.index_dir.join(asset).into_os_string();
    path.push(".idx");
    PathBuf::from(path)
}

/// Spawn the background index worker; returns the sink feeding it.
pub fn spawn_index_worker(config: Arc<Config>) -> (Arc<ChannelSink>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<IndexRequest>();
    let handle = tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            if let Err(err) = build_index(config.clone(), request.asset.clone()).await {
                warn!("index build for `{}` failed: {err:#}", request.asset);
            }
        }
        debug!("index worker shutting down");
    });
    (Arc::new(ChannelSink { tx }), handle)
}

/// Build and atomically persist the index for one asset.
///
/// Skips the build when a valid index already exists, which is what makes
/// duplicate/at-least-once notifications safe.
pub async fn build_index(config: Arc<Config>, asset: String) -> anyhow::Result<()> {
    tokio::task::spawn_blocking(move || {
        let target = index_path(&config, &asset);
        if let Ok(existing) = std::fs::read(&target)
            && index::read_index(&existing).is_ok()
        {
            debug!("index for `{asset}` is already fresh");
            return Ok(());
        }

        let media_path = config.media_dir.join(&asset);
        let mut file = std::fs::File::open(&media_path)
            .with_context(|| format!("opening {}", media_path.display()))?;
        let movie = Movie::parse(&mut file).context("parsing container")?;
        let list = FragmentListBuilder::build(&movie, config.fragment_duration);
        let encoded = index::write_index(&list);

        // Write-temp-then-rename: readers never observe a partial index.
        let parent = target
            .parent()
            .context("index path has no parent directory")?;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent).context("creating temp index")?;
        tmp.write_all(&encoded).context("writing index")?;
        tmp.persist(&target)
            .with_context(|| format!("replacing {}", target.display()))?;

        info!(
            "indexed `{asset}`: {} fragments, {} bytes",
            list.count(),
            encoded.len()
        );
        Ok(())
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use mp4::test_support::{TestTrack, build_movie_file};

    fn test_config(root: &std::path::Path) -> Arc<Config> {
        Arc::new(Config {
            listen: "127.0.0.1:0".parse().unwrap(),
            media_dir: root.join("media"),
            index_dir: root.join("index"),
            fragment_duration: 10.0,
        })
    }

    fn write_test_asset(config: &Config, name: &str) {
        let video: Vec<(u32, u32, bool)> = (0..300).map(|i| (120, 60, i % 10 == 0)).collect();
        let file = build_movie_file(1000, &[TestTrack::video(600, &video)]);
        std::fs::create_dir_all(&config.media_dir).unwrap();
        std::fs::write(config.media_dir.join(name), file).unwrap();
    }

    #[test]
    fn test_index_path_appends_suffix() {
        let config = test_config(std::path::Path::new("/data"));
        assert_eq!(
            index_path(&config, "movies/a.mp4"),
            PathBuf::from("/data/index/movies/a.mp4.idx")
        );
    }

    #[tokio::test]
    async fn test_build_index_persists_decodable_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_test_asset(&config, "a.mp4");

        build_index(config.clone(), "a.mp4".into()).await.unwrap();

        let bytes = std::fs::read(index_path(&config, "a.mp4")).unwrap();
        let list = index::read_index(&bytes).unwrap();
        assert_eq!(list.count(), 3);
    }

    #[tokio::test]
    async fn test_duplicate_build_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_test_asset(&config, "a.mp4");

        build_index(config.clone(), "a.mp4".into()).await.unwrap();
        let first = std::fs::metadata(index_path(&config, "a.mp4")).unwrap();

        // Second notification for the same asset: no rewrite.
        build_index(config.clone(), "a.mp4".into()).await.unwrap();
        let second = std::fs::metadata(index_path(&config, "a.mp4")).unwrap();
        assert_eq!(
            first.modified().unwrap(),
            second.modified().unwrap()
        );
    }

    #[tokio::test]
    async fn test_corrupt_index_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_test_asset(&config, "a.mp4");

        let target = index_path(&config, "a.mp4");
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&target, b"garbage").unwrap();

        build_index(config.clone(), "a.mp4".into()).await.unwrap();
        let bytes = std::fs::read(&target).unwrap();
        assert!(index::read_index(&bytes).is_ok());
    }

    #[tokio::test]
    async fn test_missing_asset_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        assert!(build_index(config, "nope.mp4".into()).await.is_err());
    }
}
