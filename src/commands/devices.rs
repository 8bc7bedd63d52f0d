use crate::media::{MediaDevices, MediaStream, MediaStreamTrack};
use crate::synth::encode_data_uri;
use crate::types::{MediaDeviceInfo, MediaStreamConstraints, TrackKind, TrackSettings};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Cursor;
use tauri::command;
use tokio::sync::RwLock;

// Streams handed to the frontend, keyed by stream id.
lazy_static::lazy_static! {
    static ref ACTIVE_STREAMS: RwLock<HashMap<String, MediaStream>> = RwLock::new(HashMap::new());
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub id: String,
    pub kind: TrackKind,
    pub label: String,
    pub settings: TrackSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInfo {
    pub id: String,
    pub tracks: Vec<TrackInfo>,
}

/// Latest frame of a stream, as a PNG data URI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FramePayload {
    pub sequence: u64,
    pub timestamp_us: u64,
    pub width: u32,
    pub height: u32,
    pub data_uri: String,
}

impl From<&MediaStreamTrack> for TrackInfo {
    fn from(track: &MediaStreamTrack) -> Self {
        Self {
            id: track.id().to_string(),
            kind: track.kind(),
            label: track.label().to_string(),
            settings: track.get_settings(),
        }
    }
}

impl From<&MediaStream> for StreamInfo {
    fn from(stream: &MediaStream) -> Self {
        Self {
            id: stream.id().to_string(),
            tracks: stream.tracks().iter().map(TrackInfo::from).collect(),
        }
    }
}

/// Real devices followed by the registry's synthetic cameras.
#[command]
pub async fn enumerate_devices() -> Result<Vec<MediaDeviceInfo>, String> {
    match super::shim().enumerate_devices().await {
        Ok(devices) => {
            log::info!("Enumerated {} device(s)", devices.len());
            Ok(devices)
        }
        Err(e) => {
            log::error!("Failed to enumerate devices: {}", e);
            Err(format!("Failed to enumerate devices: {}", e))
        }
    }
}

/// Acquire a stream and keep it alive until `stop_stream`.
#[command]
pub async fn get_user_media(constraints: MediaStreamConstraints) -> Result<StreamInfo, String> {
    log::info!("Acquiring stream for {:?}", constraints);

    let stream = super::shim()
        .get_user_media(&constraints)
        .await
        .map_err(|e| {
            log::error!("Failed to acquire stream: {}", e);
            format!("Failed to acquire stream: {}", e)
        })?;

    let info = StreamInfo::from(&stream);
    ACTIVE_STREAMS
        .write()
        .await
        .insert(stream.id().to_string(), stream);
    Ok(info)
}

#[command]
pub async fn stop_stream(stream_id: String) -> Result<(), String> {
    match ACTIVE_STREAMS.write().await.remove(&stream_id) {
        Some(stream) => {
            stream.stop();
            log::info!("Stopped stream {}", stream_id);
            Ok(())
        }
        None => Err(format!("Stream not found: {}", stream_id)),
    }
}

#[command]
pub async fn get_stream_settings(stream_id: String) -> Result<Vec<TrackSettings>, String> {
    let streams = ACTIVE_STREAMS.read().await;
    let stream = streams
        .get(&stream_id)
        .ok_or_else(|| format!("Stream not found: {}", stream_id))?;
    Ok(stream.tracks().iter().map(|t| t.get_settings()).collect())
}

/// Most recent frame of the stream's video track, if one was produced yet.
#[command]
pub async fn get_latest_frame(stream_id: String) -> Result<Option<FramePayload>, String> {
    let frame = {
        let streams = ACTIVE_STREAMS.read().await;
        let stream = streams
            .get(&stream_id)
            .ok_or_else(|| format!("Stream not found: {}", stream_id))?;
        stream.first_video_track().and_then(|t| t.latest_frame())
    };
    let Some(frame) = frame else {
        return Ok(None);
    };

    let (sequence, timestamp_us, width, height) =
        (frame.sequence, frame.timestamp_us, frame.width, frame.height);
    let png = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, String> {
        let image = frame.to_rgba_image().map_err(|e| e.to_string())?;
        let mut out = Cursor::new(Vec::new());
        image
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|e| format!("Failed to encode frame: {}", e))?;
        Ok(out.into_inner())
    })
    .await
    .map_err(|e| format!("Task join error: {}", e))??;

    Ok(Some(FramePayload {
        sequence,
        timestamp_us,
        width,
        height,
        data_uri: encode_data_uri("image/png", &png),
    }))
}
