//! Shared data types: camera definitions, registry snapshots, device
//! identifiers, constraints and the descriptors handed back to callers.

use crate::errors::CameraError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Prefix of every synthetic device identifier.
pub const SYNTHETIC_ID_PREFIX: &str = "fake-camera-";
/// Group identifier reported by every synthetic device and track.
pub const SYNTHETIC_GROUP_ID: &str = "fake-cameras-group";
/// Nominal capture rate of synthetic tracks.
pub const DEFAULT_FRAME_RATE: u32 = 30;
/// Largest encoded image accepted into the registry (10 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// A user-configured synthetic camera: a display name and an encoded still image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDefinition {
    pub name: String,
    /// Encoded still image, normally a `data:` URI.
    pub image: String,
}

impl CameraDefinition {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
        }
    }

    /// Check the record the way the registry owner is expected to before persisting it.
    ///
    /// Does not decode the image; that happens lazily at acquisition time.
    pub fn validate(&self, max_image_bytes: u64) -> Result<(), CameraError> {
        if self.name.trim().is_empty() {
            return Err(CameraError::Registry(
                "camera name must not be empty".to_string(),
            ));
        }
        if self.image.is_empty() {
            return Err(CameraError::Registry(format!(
                "camera '{}' has no image",
                self.name
            )));
        }
        if !self.image.starts_with("data:") {
            return Err(CameraError::Registry(format!(
                "camera '{}' image is not a data URI",
                self.name
            )));
        }
        if self.image.len() as u64 > max_image_bytes {
            return Err(CameraError::Registry(format!(
                "camera '{}' image is {} bytes, limit is {}",
                self.name,
                self.image.len(),
                max_image_bytes
            )));
        }
        Ok(())
    }
}

/// Immutable, ordered view of the registry at one point in time.
///
/// Cloning is cheap; the list is shared. Position in the list is the camera's
/// identity, so identifiers derived from one snapshot may point elsewhere in
/// the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    cameras: Arc<Vec<CameraDefinition>>,
}

impl RegistrySnapshot {
    pub fn new(cameras: Vec<CameraDefinition>) -> Self {
        Self {
            cameras: Arc::new(cameras),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CameraDefinition> {
        self.cameras.get(index)
    }

    pub fn first(&self) -> Option<&CameraDefinition> {
        self.cameras.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CameraDefinition> {
        self.cameras.iter()
    }

    pub fn to_vec(&self) -> Vec<CameraDefinition> {
        self.cameras.as_ref().clone()
    }

    /// True when both snapshots share the same underlying list.
    pub fn same_as(&self, other: &RegistrySnapshot) -> bool {
        Arc::ptr_eq(&self.cameras, &other.cameras)
    }

    /// Identifiers valid for this snapshot, in registry order.
    pub fn device_ids(&self) -> impl Iterator<Item = SyntheticDeviceId> + '_ {
        (0..self.cameras.len()).map(SyntheticDeviceId::new)
    }
}

impl From<Vec<CameraDefinition>> for RegistrySnapshot {
    fn from(cameras: Vec<CameraDefinition>) -> Self {
        Self::new(cameras)
    }
}

/// Identifier of a synthetic device: `fake-camera-<index>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SyntheticDeviceId(usize);

impl SyntheticDeviceId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }

    /// Naming-convention check: does the identifier claim to be synthetic?
    pub fn looks_synthetic(device_id: &str) -> bool {
        device_id.starts_with(SYNTHETIC_ID_PREFIX)
    }

    /// Strict parse: the prefix followed by a base-10 integer without
    /// leading zeros (other than "0" itself).
    pub fn parse(device_id: &str) -> Option<Self> {
        let digits = device_id.strip_prefix(SYNTHETIC_ID_PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if digits.len() > 1 && digits.starts_with('0') {
            return None;
        }
        digits.parse::<usize>().ok().map(Self)
    }

    /// Index a synthetic-looking identifier points at, read the lenient way
    /// page scripts read it: optional leading whitespace and `+`, then as many
    /// digits as follow. `fake-camera-01` and `fake-camera-1abc` both give 1.
    pub fn leading_index(device_id: &str) -> Option<usize> {
        let rest = device_id.strip_prefix(SYNTHETIC_ID_PREFIX)?.trim_start();
        let rest = rest.strip_prefix('+').unwrap_or(rest);
        let end = rest
            .bytes()
            .position(|b| !b.is_ascii_digit())
            .unwrap_or(rest.len());
        rest[..end].parse().ok()
    }
}

impl fmt::Display for SyntheticDeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", SYNTHETIC_ID_PREFIX, self.0)
    }
}

/// The `deviceId` member of a video constraint, decoded once at the boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<RawDeviceId>", into = "Option<RawDeviceId>")]
pub enum DeviceIdConstraint {
    Exact(String),
    Bare(String),
    #[default]
    Absent,
}

impl DeviceIdConstraint {
    pub fn exact(id: impl Into<String>) -> Self {
        Self::Exact(id.into())
    }

    pub fn bare(id: impl Into<String>) -> Self {
        Self::Bare(id.into())
    }

    /// The requested identifier regardless of form. Empty strings count as absent.
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Exact(id) | Self::Bare(id) if !id.is_empty() => Some(id.as_str()),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        self.value().is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawDeviceId {
    Bare(String),
    Exact { exact: String },
    Ideal { ideal: String },
}

impl From<Option<RawDeviceId>> for DeviceIdConstraint {
    fn from(raw: Option<RawDeviceId>) -> Self {
        match raw {
            Some(RawDeviceId::Bare(id)) => Self::Bare(id),
            Some(RawDeviceId::Exact { exact }) => Self::Exact(exact),
            // An ideal is a preference, not a requirement: same as a bare value.
            Some(RawDeviceId::Ideal { ideal }) => Self::Bare(ideal),
            None => Self::Absent,
        }
    }
}

impl From<DeviceIdConstraint> for Option<RawDeviceId> {
    fn from(constraint: DeviceIdConstraint) -> Self {
        match constraint {
            DeviceIdConstraint::Exact(exact) => Some(RawDeviceId::Exact { exact }),
            DeviceIdConstraint::Bare(id) => Some(RawDeviceId::Bare(id)),
            DeviceIdConstraint::Absent => None,
        }
    }
}

/// Video constraints. Members other than `deviceId` are carried verbatim so a
/// delegated call sees exactly what the caller asked for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoConstraints {
    #[serde(
        rename = "deviceId",
        default,
        skip_serializing_if = "DeviceIdConstraint::is_absent"
    )]
    pub device_id: DeviceIdConstraint,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

impl VideoConstraints {
    pub fn with_device_id(mut self, device_id: DeviceIdConstraint) -> Self {
        self.device_id = device_id;
        self
    }

    pub fn with_member(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.other.insert(key.into(), value);
        self
    }
}

/// The `video` member of an acquisition request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawVideoRequest", into = "RawVideoRequest")]
pub enum VideoRequest {
    #[default]
    Disabled,
    Any,
    Constrained(VideoConstraints),
}

impl VideoRequest {
    pub fn is_requested(&self) -> bool {
        !matches!(self, VideoRequest::Disabled)
    }

    pub fn device_id(&self) -> &DeviceIdConstraint {
        const ABSENT: &DeviceIdConstraint = &DeviceIdConstraint::Absent;
        match self {
            VideoRequest::Constrained(c) => &c.device_id,
            _ => ABSENT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawVideoRequest {
    Flag(bool),
    Constraints(VideoConstraints),
}

impl From<RawVideoRequest> for VideoRequest {
    fn from(raw: RawVideoRequest) -> Self {
        match raw {
            RawVideoRequest::Flag(false) => VideoRequest::Disabled,
            RawVideoRequest::Flag(true) => VideoRequest::Any,
            RawVideoRequest::Constraints(c) => VideoRequest::Constrained(c),
        }
    }
}

impl From<VideoRequest> for RawVideoRequest {
    fn from(request: VideoRequest) -> Self {
        match request {
            VideoRequest::Disabled => RawVideoRequest::Flag(false),
            VideoRequest::Any => RawVideoRequest::Flag(true),
            VideoRequest::Constrained(c) => RawVideoRequest::Constraints(c),
        }
    }
}

/// The `audio` member of an acquisition request. Never interpreted here,
/// only carried through to the real devices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawAudioRequest", into = "RawAudioRequest")]
pub enum AudioRequest {
    #[default]
    Disabled,
    Any,
    Constrained(serde_json::Map<String, serde_json::Value>),
}

impl AudioRequest {
    pub fn is_requested(&self) -> bool {
        !matches!(self, AudioRequest::Disabled)
    }
}

impl From<bool> for AudioRequest {
    fn from(requested: bool) -> Self {
        if requested {
            AudioRequest::Any
        } else {
            AudioRequest::Disabled
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawAudioRequest {
    Flag(bool),
    Constraints(serde_json::Map<String, serde_json::Value>),
}

impl From<RawAudioRequest> for AudioRequest {
    fn from(raw: RawAudioRequest) -> Self {
        match raw {
            RawAudioRequest::Flag(flag) => flag.into(),
            RawAudioRequest::Constraints(c) => AudioRequest::Constrained(c),
        }
    }
}

impl From<AudioRequest> for RawAudioRequest {
    fn from(request: AudioRequest) -> Self {
        match request {
            AudioRequest::Disabled => RawAudioRequest::Flag(false),
            AudioRequest::Any => RawAudioRequest::Flag(true),
            AudioRequest::Constrained(c) => RawAudioRequest::Constraints(c),
        }
    }
}

/// Argument of an acquisition call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaStreamConstraints {
    #[serde(default)]
    pub audio: AudioRequest,
    #[serde(default)]
    pub video: VideoRequest,
}

impl MediaStreamConstraints {
    /// `{ video: true }`
    pub fn video() -> Self {
        Self {
            audio: AudioRequest::Disabled,
            video: VideoRequest::Any,
        }
    }

    /// `{ audio: true }`
    pub fn audio_only() -> Self {
        Self {
            audio: AudioRequest::Any,
            video: VideoRequest::Disabled,
        }
    }

    /// `{ video: { deviceId: ... } }`
    pub fn video_device(device_id: DeviceIdConstraint) -> Self {
        Self {
            audio: AudioRequest::Disabled,
            video: VideoRequest::Constrained(VideoConstraints::default().with_device_id(device_id)),
        }
    }

    pub fn with_audio(mut self, audio: impl Into<AudioRequest>) -> Self {
        self.audio = audio.into();
        self
    }
}

/// Kind of a track inside a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

/// Kind of an enumerated device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaDeviceKind {
    VideoInput,
    AudioInput,
    AudioOutput,
}

impl MediaDeviceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaDeviceKind::VideoInput => "videoinput",
            MediaDeviceKind::AudioInput => "audioinput",
            MediaDeviceKind::AudioOutput => "audiooutput",
        }
    }
}

/// One entry of an enumeration result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDeviceInfo {
    pub device_id: String,
    pub group_id: String,
    pub kind: MediaDeviceKind,
    pub label: String,
}

impl MediaDeviceInfo {
    pub fn new(device_id: impl Into<String>, kind: MediaDeviceKind) -> Self {
        Self {
            device_id: device_id.into(),
            group_id: String::new(),
            kind,
            label: String::new(),
        }
    }

    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = group_id.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Descriptor of the synthetic device backed by `definition` at `id`.
    pub fn synthetic(id: SyntheticDeviceId, definition: &CameraDefinition) -> Self {
        Self::new(id.to_string(), MediaDeviceKind::VideoInput)
            .with_group_id(SYNTHETIC_GROUP_ID)
            .with_label(definition.name.clone())
    }

    pub fn is_synthetic(&self) -> bool {
        SyntheticDeviceId::looks_synthetic(&self.device_id) && self.group_id == SYNTHETIC_GROUP_ID
    }

    /// Self-serialization, as a JSON object with the four descriptor members.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "deviceId": self.device_id,
            "groupId": self.group_id,
            "kind": self.kind.as_str(),
            "label": self.label,
        })
    }
}

/// Metadata reported by a track's settings accessor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resize_mode: Option<String>,
}
