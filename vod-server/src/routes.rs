//! HTTP surface: playlist, chunk list and segment endpoints.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use hls::{HlsPacketizer, render_master, render_media};
use tracing::debug;

use crate::config::Config;
use crate::error::ApiError;
use crate::indexer::IndexSink;
use crate::movie::open_movie;

const CONTENT_TYPE_M3U8: &str = "application/x-mpegURL";
const CONTENT_TYPE_TS: &str = "video/MP2T";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub index_sink: Arc<dyn IndexSink>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/vod/{*path}", get(vod_handler))
}

async fn vod_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let Some((asset, action)) = path.rsplit_once('/') else {
        return Err(ApiError::not_found(format!("no route for `{path}`")));
    };
    let base_url = format!("/vod/{asset}");

    match action {
        "playlist.m3u8" => {
            let ctx = open_movie(&state, asset).await?;
            let body = render_master(&ctx.fragment_list, ctx.file_size, &base_url);
            Ok(([(header::CONTENT_TYPE, CONTENT_TYPE_M3U8)], body).into_response())
        }
        "chunklist.m3u8" => {
            let ctx = open_movie(&state, asset).await?;
            let body = render_media(&ctx.fragment_list, &base_url);
            Ok(([(header::CONTENT_TYPE, CONTENT_TYPE_M3U8)], body).into_response())
        }
        _ => match parse_segment_name(action) {
            Some(sequence) => serve_segment(&state, asset, sequence).await,
            None => Err(ApiError::not_found(format!("no route for `{path}`"))),
        },
    }
}

/// `media-{n}.ts` with n >= 1.
fn parse_segment_name(action: &str) -> Option<u32> {
    let n: u32 = action
        .strip_prefix("media-")?
        .strip_suffix(".ts")?
        .parse()
        .ok()?;
    (n >= 1).then_some(n)
}

async fn serve_segment(state: &AppState, asset: &str, sequence: u32) -> Result<Response, ApiError> {
    let ctx = open_movie(state, asset).await?;
    if ctx.fragment_list.count() < sequence as usize {
        return Err(ApiError::not_found(format!(
            "chunk {sequence} not found ({} available)",
            ctx.fragment_list.count()
        )));
    }

    // Move the context into a blocking task: sample reads and muxing are
    // synchronous CPU/disk work. The file handle is dropped with it.
    let buffer = tokio::task::spawn_blocking(move || -> Result<bytes::Bytes, ApiError> {
        let mut ctx = ctx;
        let fragment = ctx
            .fragment_list
            .get(sequence as usize - 1)
            .expect("sequence bounds checked above");
        let samples = fragment::reader::read_samples(fragment, &mut ctx.file)?;
        Ok(HlsPacketizer::packetize(&ctx.fragment_list, fragment, &samples)?)
    })
    .await??;

    debug!("serving segment {sequence} of `{asset}`: {} bytes", buffer.len());
    Ok(([(header::CONTENT_TYPE, CONTENT_TYPE_TS)], buffer).into_response())
}
