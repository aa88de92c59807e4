//! Backend capability interfaces.
//!
//! Every operation has a default body reporting `MethodNotImplemented`; concrete
//! backends override only what they support.

pub mod audio_manager;
pub mod common;
pub mod dvb;
pub mod generic;
pub mod probe;
pub mod video_output;

use playmux_types::{
    AudioOutputState, AudioOutputType, BufferFormat, PatEntry, PlayerState, PmtInfo, Proxy,
    ScaleMode, SessionEvent, Target, VideoRect,
};

use crate::error::{PlayerError, PlayerResult};
use crate::events::EventBus;
use crate::resource::ResourceArbiter;

pub use common::BackendCore;

/// Services handed to a plugin factory.
#[derive(Clone)]
pub struct BackendContext {
    pub arbiter: ResourceArbiter,
    pub events: EventBus<SessionEvent>,
}

impl BackendContext {
    pub fn new(arbiter: ResourceArbiter, events: EventBus<SessionEvent>) -> Self {
        Self { arbiter, events }
    }
}

/// What a plugin factory produces.
pub enum BackendInstance {
    Player(Box<dyn PlayerBackend>),
    VideoOutput(Box<dyn VideoOutputBackend>),
    AudioManager(Box<dyn AudioManagerBackend>),
}

fn not_implemented<T>(op: &'static str) -> PlayerResult<T> {
    Err(PlayerError::MethodNotImplemented(op))
}

/// Playback capability interface implemented by player backends.
///
/// Dropping a backend must stop playback and release every held resource.
#[allow(unused_variables)]
pub trait PlayerBackend: Send {
    fn set_uri(&mut self, uri: &str) -> PlayerResult<()> {
        not_implemented("set_uri")
    }
    fn play(&mut self) -> PlayerResult<()> {
        not_implemented("play")
    }
    fn pause(&mut self) -> PlayerResult<()> {
        not_implemented("pause")
    }
    fn stop(&mut self) -> PlayerResult<()> {
        not_implemented("stop")
    }
    fn suspend(&mut self) -> PlayerResult<()> {
        not_implemented("suspend")
    }
    fn restore(&mut self) -> PlayerResult<()> {
        not_implemented("restore")
    }

    fn set_volume(&mut self, volume: i32) -> PlayerResult<()> {
        not_implemented("set_volume")
    }
    fn volume(&self) -> PlayerResult<i32> {
        not_implemented("volume")
    }
    fn set_mute(&mut self, mute: bool) -> PlayerResult<()> {
        not_implemented("set_mute")
    }
    fn is_mute(&self) -> PlayerResult<bool> {
        not_implemented("is_mute")
    }
    fn set_scale_mode(&mut self, mode: ScaleMode) -> PlayerResult<()> {
        not_implemented("set_scale_mode")
    }
    fn scale_mode(&self) -> PlayerResult<ScaleMode> {
        not_implemented("scale_mode")
    }
    fn set_video_size(&mut self, rect: VideoRect) -> PlayerResult<()> {
        not_implemented("set_video_size")
    }
    fn video_size(&self) -> PlayerResult<VideoRect> {
        not_implemented("video_size")
    }
    fn set_playback_rate(&mut self, rate: f64) -> PlayerResult<()> {
        not_implemented("set_playback_rate")
    }
    fn playback_rate(&self) -> PlayerResult<f64> {
        not_implemented("playback_rate")
    }
    /// Seek to `position_ms`.
    fn set_position(&mut self, position_ms: i64) -> PlayerResult<()> {
        not_implemented("set_position")
    }
    fn position(&self) -> PlayerResult<i64> {
        not_implemented("position")
    }
    fn set_proxy(&mut self, proxy: &Proxy) -> PlayerResult<()> {
        not_implemented("set_proxy")
    }
    fn set_target(&mut self, target: &Target) -> PlayerResult<()> {
        not_implemented("set_target")
    }
    fn set_subtitle_uri(&mut self, uri: &str) -> PlayerResult<()> {
        not_implemented("set_subtitle_uri")
    }
    fn set_buffer_depth(&mut self, format: BufferFormat, depth: i64) -> PlayerResult<()> {
        not_implemented("set_buffer_depth")
    }
    fn buffer_depth(&self, format: BufferFormat) -> PlayerResult<i64> {
        not_implemented("buffer_depth")
    }

    fn has_video(&self) -> PlayerResult<bool> {
        not_implemented("has_video")
    }
    fn has_audio(&self) -> PlayerResult<bool> {
        not_implemented("has_audio")
    }
    fn is_streaming(&self) -> PlayerResult<bool> {
        not_implemented("is_streaming")
    }
    fn is_seekable(&self) -> PlayerResult<bool> {
        not_implemented("is_seekable")
    }
    fn support_fullscreen(&self) -> PlayerResult<bool> {
        not_implemented("support_fullscreen")
    }
    fn player_state(&self) -> PlayerResult<PlayerState> {
        not_implemented("player_state")
    }
    fn buffered_time(&self) -> PlayerResult<i64> {
        not_implemented("buffered_time")
    }
    fn buffered_bytes(&self) -> PlayerResult<i64> {
        not_implemented("buffered_bytes")
    }
    fn media_size_time(&self) -> PlayerResult<i64> {
        not_implemented("media_size_time")
    }
    fn media_size_bytes(&self) -> PlayerResult<i64> {
        not_implemented("media_size_bytes")
    }

    fn video_num(&self) -> PlayerResult<i32> {
        not_implemented("video_num")
    }
    fn audio_num(&self) -> PlayerResult<i32> {
        not_implemented("audio_num")
    }
    fn subtitle_num(&self) -> PlayerResult<i32> {
        not_implemented("subtitle_num")
    }
    fn set_current_video(&mut self, channel: i32) -> PlayerResult<()> {
        not_implemented("set_current_video")
    }
    fn current_video(&self) -> PlayerResult<i32> {
        not_implemented("current_video")
    }
    fn set_current_audio(&mut self, channel: i32) -> PlayerResult<()> {
        not_implemented("set_current_audio")
    }
    fn current_audio(&self) -> PlayerResult<i32> {
        not_implemented("current_audio")
    }
    fn set_current_subtitle(&mut self, channel: i32) -> PlayerResult<()> {
        not_implemented("set_current_subtitle")
    }
    fn current_subtitle(&self) -> PlayerResult<i32> {
        not_implemented("current_subtitle")
    }

    fn video_codec(&self, channel: i32) -> PlayerResult<String> {
        not_implemented("video_codec")
    }
    fn audio_codec(&self, channel: i32) -> PlayerResult<String> {
        not_implemented("audio_codec")
    }
    fn video_bitrate(&self, channel: i32) -> PlayerResult<i32> {
        not_implemented("video_bitrate")
    }
    fn audio_bitrate(&self, channel: i32) -> PlayerResult<i32> {
        not_implemented("audio_bitrate")
    }
    fn audio_samplerate(&self, channel: i32) -> PlayerResult<i32> {
        not_implemented("audio_samplerate")
    }
    /// Frame rate as numerator/denominator.
    fn video_framerate(&self, channel: i32) -> PlayerResult<(i32, i32)> {
        not_implemented("video_framerate")
    }
    /// Width and height in pixels.
    fn video_resolution(&self, channel: i32) -> PlayerResult<(i32, i32)> {
        not_implemented("video_resolution")
    }
    fn video_aspect_ratio(&self, channel: i32) -> PlayerResult<(i32, i32)> {
        not_implemented("video_aspect_ratio")
    }

    fn protocol_name(&self) -> PlayerResult<String> {
        not_implemented("protocol_name")
    }
    fn current_uri(&self) -> PlayerResult<String> {
        not_implemented("current_uri")
    }
    fn title(&self) -> PlayerResult<String> {
        not_implemented("title")
    }
    fn artist(&self) -> PlayerResult<String> {
        not_implemented("artist")
    }

    /// Start (`true`) or stop recording to `location`.
    fn record(&mut self, enable: bool, location: Option<&str>) -> PlayerResult<()> {
        not_implemented("record")
    }
    fn pat(&self) -> PlayerResult<Vec<PatEntry>> {
        not_implemented("pat")
    }
    fn pmt(&self) -> PlayerResult<PmtInfo> {
        not_implemented("pmt")
    }
    /// Address of the side channel carrying broadcast data services.
    fn associated_data_channel(&self) -> PlayerResult<(String, u16)> {
        not_implemented("associated_data_channel")
    }
}

/// Display-output control, one instance per service.
#[allow(unused_variables)]
pub trait VideoOutputBackend: Send {
    fn valid_outputs(&self) -> PlayerResult<Vec<String>> {
        not_implemented("valid_outputs")
    }
    fn valid_modes(&self, output: &str) -> PlayerResult<Vec<String>> {
        not_implemented("valid_modes")
    }
    fn set_mode(&mut self, output: &str, mode: &str) -> PlayerResult<()> {
        not_implemented("set_mode")
    }
    fn mode(&self, output: &str) -> PlayerResult<String> {
        not_implemented("mode")
    }
}

/// Physical audio output control, one instance per service.
#[allow(unused_variables)]
pub trait AudioManagerBackend: Send {
    fn set_volume(&mut self, output: AudioOutputType, volume: i32) -> PlayerResult<()> {
        not_implemented("set_volume")
    }
    fn volume(&self, output: AudioOutputType) -> PlayerResult<i32> {
        not_implemented("volume")
    }
    fn set_state(&mut self, output: AudioOutputType, state: AudioOutputState) -> PlayerResult<()> {
        not_implemented("set_state")
    }
    fn state(&self, output: AudioOutputType) -> PlayerResult<AudioOutputState> {
        not_implemented("state")
    }
}
