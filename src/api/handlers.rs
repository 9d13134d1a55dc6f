use super::error::ApiError;
use super::models::{
    BatchDownloadRequest, DownloadRequest, ExtractRequest, ExtractResponse, HealthResponse,
    ImageDownloadRequest, PlaylistDownloadRequest,
};
use super::AppState;
use crate::media::{parse_url, DownloadOutcome, DownloadSelection, Platform, PlaylistSelection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use tracing::info;

type ApiResult<T> = Result<Json<T>, ApiError>;

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "Post downloader API is running",
        download_dir: state.service.dirs().root().display().to_string(),
        supported_platforms: Platform::ALL.iter().map(Platform::as_str).collect(),
    })
}

pub async fn extract(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> ApiResult<ExtractResponse> {
    let platform: Platform = platform.parse()?;
    let Json(request) = payload?;
    let url = parse_url(&request.url)?;

    let metadata = state.service.extract(platform, &url).await?;
    Ok(Json(ExtractResponse::ok(metadata, "Metadata extracted successfully")))
}

pub async fn extract_playlist(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> ApiResult<ExtractResponse> {
    let platform: Platform = platform.parse()?;
    let Json(request) = payload?;
    let url = parse_url(&request.url)?;

    let playlist = state.service.extract_playlist(platform, &url).await?;
    let message = format!(
        "Playlist extracted with {} entries",
        playlist.playlist_count.unwrap_or_default()
    );
    Ok(Json(ExtractResponse::ok(playlist, message)))
}

pub async fn download(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> ApiResult<DownloadOutcome> {
    let platform: Platform = platform.parse()?;
    let Json(request) = payload?;
    let url = parse_url(&request.url)?;

    let selection = DownloadSelection {
        format_id: request.format_id,
        audio_only: request.audio_only,
        audio_format: request.audio_format,
        audio_quality: request.audio_quality,
    };
    Ok(Json(state.service.download(platform, &url, selection).await?))
}

pub async fn download_images(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    payload: Result<Json<ImageDownloadRequest>, JsonRejection>,
) -> ApiResult<DownloadOutcome> {
    let platform: Platform = platform.parse()?;
    let Json(request) = payload?;
    let url = parse_url(&request.url)?;

    Ok(Json(
        state
            .service
            .download_images(platform, &url, request.download_all)
            .await?,
    ))
}

pub async fn download_playlist(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    payload: Result<Json<PlaylistDownloadRequest>, JsonRejection>,
) -> ApiResult<DownloadOutcome> {
    let platform: Platform = platform.parse()?;
    let Json(request) = payload?;
    let url = parse_url(&request.url)?;

    let defaults = PlaylistSelection::default();
    let selection = PlaylistSelection {
        download_all: request.download_all,
        max_downloads: request.max_downloads.unwrap_or(defaults.max_downloads),
        start_index: request.start_index.unwrap_or(defaults.start_index),
        end_index: request.end_index,
    };
    Ok(Json(
        state
            .service
            .download_playlist(platform, &url, selection, request.audio_only)
            .await?,
    ))
}

pub async fn download_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchDownloadRequest>, JsonRejection>,
) -> ApiResult<DownloadOutcome> {
    let Json(request) = payload?;
    let urls = request
        .urls
        .iter()
        .map(|url| parse_url(url))
        .collect::<Result<Vec<_>, _>>()?;

    info!("Batch request with {} URLs", urls.len());
    Ok(Json(
        state
            .service
            .batch(
                urls,
                request.format_preference,
                request.audio_only,
                request.max_concurrent,
            )
            .await?,
    ))
}
