use serde::{Deserialize, Serialize};

/// Player state reported by a backend and relayed by its session.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    /// No pipeline built yet.
    #[default]
    Null,
    /// Pipeline built but idle; resources released.
    Stopped,
    /// Media loaded and prerolled.
    Paused,
    /// Media is rendering.
    Playing,
}

impl PlayerState {
    /// Stable name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            PlayerState::Null => "PlayerStateNull",
            PlayerState::Stopped => "PlayerStateStopped",
            PlayerState::Paused => "PlayerStatePaused",
            PlayerState::Playing => "PlayerStatePlaying",
        }
    }
}

/// How video is fitted into the output rectangle.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMode {
    /// Leave the output x/y as the input.
    NoScale,
    /// Fill the whole target regardless of aspect ratio.
    Fill,
    /// Respect the source aspect ratio.
    #[default]
    KeepAspectRatio,
    /// Fill the target keeping the ratio; part of the video may be cropped.
    FillKeepAspectRatio,
}

/// Unit used by buffer-depth properties.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BufferFormat {
    /// Depth expressed in milliseconds.
    ByTime,
    /// Depth expressed in bytes.
    ByBytes,
}

/// Output rectangle for video rendering.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl VideoRect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
}

/// Tag of a [`Target`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    XWindow,
    DataCopy,
    Socket,
    Plane,
}

/// Where a backend renders video.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Target {
    /// Render into an existing X window.
    XWindow { window_id: u64 },
    /// Hand decoded frames back to the client.
    DataCopy,
    /// Stream decoded frames to a local socket.
    Socket { path: String },
    /// Render directly to a hardware video plane.
    Plane {
        plane_id: i32,
        rectangle: Option<VideoRect>,
    },
}

impl Target {
    pub fn target_type(&self) -> TargetType {
        match self {
            Target::XWindow { .. } => TargetType::XWindow,
            Target::DataCopy => TargetType::DataCopy,
            Target::Socket { .. } => TargetType::Socket,
            Target::Plane { .. } => TargetType::Plane,
        }
    }
}

/// HTTP proxy credentials pushed into network-capable backends.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Proxy {
    pub uri: String,
    pub id: Option<String>,
    pub password: Option<String>,
}

/// Scarce hardware resource classes arbitrated between sessions.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// Hardware video output plane.
    Plane,
    /// Hardware presentation clock.
    HwClock,
    /// Hardware video decoder.
    VideoDecoder,
    /// Hardware audio decoder.
    AudioDecoder,
    /// Broadcast tuner.
    Tuner,
}

impl ResourceType {
    pub const ALL: [ResourceType; 5] = [
        ResourceType::Plane,
        ResourceType::HwClock,
        ResourceType::VideoDecoder,
        ResourceType::AudioDecoder,
        ResourceType::Tuner,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ResourceType::Plane => "plane",
            ResourceType::HwClock => "hw_clock",
            ResourceType::VideoDecoder => "video_decoder",
            ResourceType::AudioDecoder => "audio_decoder",
            ResourceType::Tuner => "tuner",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Physical audio outputs handled by the audio manager.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AudioOutputType {
    Hdmi,
    Spdif,
    I2s0,
    I2s1,
}

/// Power state of an audio output.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AudioOutputState {
    Off,
    On,
}

/// One program entry of an MPEG-TS program association table.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatEntry {
    pub program_number: u16,
    pub pid: u16,
}

/// One elementary stream listed by a program map table.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PmtStream {
    pub pid: u16,
    pub stream_type: u8,
}

/// Program map table of the currently tuned program.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PmtInfo {
    pub program_number: u16,
    pub pcr_pid: u16,
    pub streams: Vec<PmtStream>,
}

/// Snapshot of what a session is currently playing.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentMetadata {
    pub session: String,
    pub uri: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub state: PlayerState,
}

/// Events emitted by a session to its client.
///
/// Backend events are relayed unchanged; `Initialized`, `NeedReply` and
/// `ClientNoReply` originate in the session itself.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Initialized,
    Eof,
    Error { code: u32, description: String },
    Buffering { percent: u8 },
    Buffered,
    Seeked,
    Stopped,
    PlayerStateChanged { old: PlayerState, new: PlayerState },
    NeedReply,
    ClientNoReply,
    Suspended,
    Restored,
    NoResource,
    VideoTagChanged { channel: i32 },
    AudioTagChanged { channel: i32 },
    TextTagChanged { channel: i32 },
    MetadataChanged,
    RecordStart,
    RecordStop,
}
