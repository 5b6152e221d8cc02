//! Per-request movie resolution.
//!
//! `open_movie` is the index-or-fallback orchestrator: read the persisted
//! index when it exists and decodes, otherwise notify the background
//! indexer and parse the container synchronously for this request only.
//! The returned context is owned by the request and dropped (handles
//! included) when the response is done.

use std::fs::File;
use std::io::ErrorKind;
use std::path::{Component, PathBuf};
use std::time::Instant;

use fragment::{FragmentList, FragmentListBuilder, index};
use mp4::Movie;
use tracing::debug;

use crate::error::ApiError;
use crate::indexer::{self, IndexRequest};
use crate::routes::AppState;

/// Everything a request needs once the asset is resolved: the open media
/// file, its size, and the fragment list (cached or freshly built).
pub struct MovieContext {
    pub file: File,
    pub file_size: u64,
    pub fragment_list: FragmentList,
}

/// Resolve the fragment list for `asset`, opening the media file and the
/// persisted index concurrently.
pub async fn open_movie(state: &AppState, asset: &str) -> Result<MovieContext, ApiError> {
    let started = Instant::now();
    let media_path = resolve_media_path(state, asset)?;
    let index_file = indexer::index_path(&state.config, asset);

    let media_task = tokio::task::spawn_blocking(move || -> std::io::Result<(File, u64)> {
        let file = File::open(&media_path)?;
        let size = file.metadata()?.len();
        Ok((file, size))
    });
    let index_task = tokio::task::spawn_blocking(move || -> Option<FragmentList> {
        let bytes = match std::fs::read(&index_file) {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!("no index file: {err}");
                return None;
            }
        };
        match index::read_index(&bytes) {
            Ok(list) => Some(list),
            Err(err) => {
                // Corrupt or outdated index: recover locally by treating
                // the asset as unindexed.
                debug!("discarding unusable index: {err}");
                None
            }
        }
    });

    let (media_result, index_result) = tokio::join!(media_task, index_task);
    let (file, file_size) = media_result?.map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            ApiError::not_found(format!("asset `{asset}` not found"))
        } else {
            ApiError::internal(format!("opening asset `{asset}`: {err}"))
        }
    })?;

    let (file, fragment_list) = match index_result? {
        Some(list) => (file, list),
        None => {
            // Ask the background worker to materialize the index for next
            // time, then parse synchronously to satisfy this request.
            state.index_sink.notify(IndexRequest {
                asset: asset.to_string(),
            });
            let fragment_duration = state.config.fragment_duration;
            let mut file = file;
            tokio::task::spawn_blocking(move || -> Result<(File, FragmentList), ApiError> {
                let movie = Movie::parse(&mut file)?;
                let list = FragmentListBuilder::build(&movie, fragment_duration);
                Ok((file, list))
            })
            .await??
        }
    };

    debug!(
        "resolved `{asset}` in {}ms ({} fragments)",
        started.elapsed().as_millis(),
        fragment_list.count()
    );
    Ok(MovieContext {
        file,
        file_size,
        fragment_list,
    })
}

/// Join the asset name onto the media root, refusing anything that could
/// escape it.
fn resolve_media_path(state: &AppState, asset: &str) -> Result<PathBuf, ApiError> {
    let relative = PathBuf::from(asset);
    let safe = !asset.is_empty()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !safe {
        return Err(ApiError::not_found(format!("asset `{asset}` not found")));
    }
    Ok(state.config.media_dir.join(relative))
}
