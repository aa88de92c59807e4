//! Generic player backend for local files and network streams.
//!
//! Local files are probed with symphonia when first prepared. `restore()` seeks to
//! the position captured by `suspend()` and plays again.

use std::time::Duration;

use playmux_types::{
    BufferFormat, PlayerState, Proxy, ResourceType, ScaleMode, SessionEvent, Target, VideoRect,
};

use crate::error::{PlayerError, PlayerResult};
use crate::plugin::{PluginDescriptor, PluginKind};
use crate::protocol::{uri_is_valid, uri_protocol};
use crate::timer::TimerTask;

use super::common::{OutputSettings, PlaybackClock};
use super::probe::{self, MediaInfo};
use super::{BackendContext, BackendCore, BackendInstance, PlayerBackend};

pub const GENERIC_FILENAME: &str = "libplaymux-generic.so";

/// Protocols whose sources run in real time and cannot be seeked.
const LIVE_PROTOCOLS: &[&str] = &["rtsp", "rtp", "udp", "mms"];

pub fn descriptor() -> PluginDescriptor {
    PluginDescriptor::builder(PluginKind::PlayerBackend, "generic")
        .filename(GENERIC_FILENAME)
        .description("Player backend for local files and network streams")
        .unsupported_protocols(["dvb"])
        .factory(|ctx| Some(BackendInstance::Player(Box::new(GenericBackend::new(ctx)))))
        .build()
}

pub struct GenericBackend {
    core: BackendCore,
    output: OutputSettings,
    clock: PlaybackClock,
    media: Option<MediaInfo>,
    eof_timer: Option<TimerTask>,
    subtitle_uri: Option<String>,
    buffer_depth_ms: i64,
    buffer_depth_bytes: i64,
    current_audio: i32,
    current_subtitle: i32,
}

impl GenericBackend {
    pub fn new(ctx: &BackendContext) -> Self {
        Self {
            core: BackendCore::new(ctx),
            output: OutputSettings::default(),
            clock: PlaybackClock::default(),
            media: None,
            eof_timer: None,
            subtitle_uri: None,
            buffer_depth_ms: 2_000,
            buffer_depth_bytes: 2 * 1024 * 1024,
            current_audio: 0,
            current_subtitle: -1,
        }
    }

    fn is_local(&self) -> bool {
        self.core
            .uri
            .as_deref()
            .is_some_and(|uri| probe::file_path(uri).is_some())
    }

    fn media(&self) -> PlayerResult<&MediaInfo> {
        self.media
            .as_ref()
            .ok_or_else(|| PlayerError::operation_failed("media not prepared"))
    }

    /// Probe the media once per URI and refresh the per-URI facts in the core.
    fn prepare(&mut self) -> PlayerResult<()> {
        let uri = self.core.require_uri()?.to_string();
        if self.media.is_none() {
            let info = match probe::file_path(&uri) {
                Some(path) => probe::probe_file(&path)?,
                None => probe::guess_stream(&uri),
            };
            tracing::debug!(
                uri = %uri,
                has_video = info.has_video,
                duration_ms = ?info.duration_ms,
                codec = ?info.audio_codec,
                "media prepared"
            );
            self.core.title = info.title.clone();
            self.core.artist = info.artist.clone();
            let tagged = info.title.is_some() || info.artist.is_some();
            self.media = Some(info);
            if tagged {
                self.core.emit(SessionEvent::MetadataChanged);
            }
        }

        let live = uri_protocol(&uri).is_some_and(|p| LIVE_PROTOCOLS.contains(&p.as_str()));
        let media = self.media()?;
        let duration = media.duration_ms;
        let total_bytes = media.total_bytes;
        self.core.is_live = live;
        self.core.duration_ms = duration;
        self.core.total_bytes = total_bytes;
        self.core.seekable = !live && duration.is_some();
        Ok(())
    }

    fn wanted_resources(&self) -> Vec<(ResourceType, Option<i32>)> {
        let mut wanted = vec![(ResourceType::HwClock, None)];
        if self.media.as_ref().is_some_and(|m| m.has_video) {
            wanted.push((ResourceType::VideoDecoder, None));
            wanted.push((ResourceType::Plane, self.output.plane_preference()));
        }
        wanted
    }

    fn transition(&mut self, to: PlayerState) -> PlayerResult<()> {
        self.prepare()?;
        let wanted = self.wanted_resources();
        self.core.acquire(&wanted)?;
        self.core.suspended = false;
        if to == PlayerState::Playing {
            self.clock.start();
            self.arm_eof();
        } else {
            self.clock.pause();
            self.eof_timer = None;
        }
        self.core.set_state(to);
        Ok(())
    }

    fn current_position(&self) -> i64 {
        let position = self.clock.position_ms();
        match self.core.duration_ms {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    fn arm_eof(&mut self) {
        self.eof_timer = None;
        if self.core.is_live || !self.clock.is_running() {
            return;
        }
        let Some(duration) = self.core.duration_ms else {
            return;
        };
        let remaining = (duration - self.current_position()).max(0) as f64 / self.clock.rate();
        let events = self.core.events().clone();
        self.eof_timer = Some(TimerTask::once(
            Duration::from_millis(remaining as u64),
            move || events.emit(SessionEvent::Eof),
        ));
    }

    fn check_audio_channel(&self, channel: i32) -> PlayerResult<&MediaInfo> {
        let media = self.media()?;
        if channel < 0 || channel >= media.audio_tracks {
            return Err(PlayerError::invalid_param(format!(
                "audio channel {channel} out of range"
            )));
        }
        Ok(media)
    }
}

impl PlayerBackend for GenericBackend {
    fn set_uri(&mut self, uri: &str) -> PlayerResult<()> {
        if matches!(
            self.core.player_state,
            PlayerState::Paused | PlayerState::Playing
        ) {
            self.stop()?;
        }
        self.core.uri = Some(uri.to_string());
        self.core.suspended = false;
        self.core.title = None;
        self.core.artist = None;
        self.media = None;
        self.clock.reset();
        self.current_audio = 0;
        if self.core.player_state == PlayerState::Null {
            self.core.set_state(PlayerState::Stopped);
        }
        Ok(())
    }

    fn play(&mut self) -> PlayerResult<()> {
        self.transition(PlayerState::Playing)
    }

    fn pause(&mut self) -> PlayerResult<()> {
        self.transition(PlayerState::Paused)
    }

    fn stop(&mut self) -> PlayerResult<()> {
        self.eof_timer = None;
        self.clock.reset();
        self.core.stop();
        Ok(())
    }

    fn suspend(&mut self) -> PlayerResult<()> {
        if self.core.suspended {
            return Ok(());
        }
        let snapshot = self.core.snapshot_position(self.current_position());
        self.stop()?;
        self.core.mark_suspended(snapshot);
        tracing::info!(position_ms = snapshot, "generic backend suspended");
        Ok(())
    }

    fn restore(&mut self) -> PlayerResult<()> {
        self.core.check_restorable()?;
        let snapshot = self.core.pos_snapshot_ms;
        self.pause()?;
        if self.core.seekable && snapshot > 0 {
            self.clock.seek(snapshot);
            self.core.emit(SessionEvent::Seeked);
        }
        self.play()?;
        self.core.mark_restored();
        Ok(())
    }

    fn set_volume(&mut self, volume: i32) -> PlayerResult<()> {
        self.output.set_volume(volume)
    }

    fn volume(&self) -> PlayerResult<i32> {
        Ok(self.output.volume)
    }

    fn set_mute(&mut self, mute: bool) -> PlayerResult<()> {
        self.output.mute = mute;
        Ok(())
    }

    fn is_mute(&self) -> PlayerResult<bool> {
        Ok(self.output.mute)
    }

    fn set_scale_mode(&mut self, mode: ScaleMode) -> PlayerResult<()> {
        self.output.scale_mode = mode;
        Ok(())
    }

    fn scale_mode(&self) -> PlayerResult<ScaleMode> {
        Ok(self.output.scale_mode)
    }

    fn set_video_size(&mut self, rect: VideoRect) -> PlayerResult<()> {
        self.output.video_rect = rect;
        Ok(())
    }

    fn video_size(&self) -> PlayerResult<VideoRect> {
        Ok(self.output.video_rect)
    }

    fn set_playback_rate(&mut self, rate: f64) -> PlayerResult<()> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(PlayerError::invalid_param(format!(
                "unsupported playback rate {rate}"
            )));
        }
        if self.core.is_live && rate != 1.0 {
            return Err(PlayerError::operation_failed("live source only plays at 1.0"));
        }
        self.clock.set_rate(rate);
        if self.clock.is_running() {
            self.arm_eof();
        }
        Ok(())
    }

    fn playback_rate(&self) -> PlayerResult<f64> {
        Ok(self.clock.rate())
    }

    fn set_position(&mut self, position_ms: i64) -> PlayerResult<()> {
        if !matches!(
            self.core.player_state,
            PlayerState::Paused | PlayerState::Playing
        ) {
            return Err(PlayerError::operation_failed("seek requires paused or playing"));
        }
        if !self.core.seekable {
            return Err(PlayerError::operation_failed("media is not seekable"));
        }
        let target = match self.core.duration_ms {
            Some(duration) => position_ms.clamp(0, duration),
            None => position_ms.max(0),
        };
        self.clock.seek(target);
        self.arm_eof();
        self.core.emit(SessionEvent::Seeked);
        Ok(())
    }

    fn position(&self) -> PlayerResult<i64> {
        Ok(self.current_position())
    }

    fn set_proxy(&mut self, proxy: &Proxy) -> PlayerResult<()> {
        self.core.proxy = Some(proxy.clone());
        Ok(())
    }

    fn set_target(&mut self, target: &Target) -> PlayerResult<()> {
        self.output.set_target(target);
        Ok(())
    }

    fn set_subtitle_uri(&mut self, uri: &str) -> PlayerResult<()> {
        if !uri_is_valid(uri) {
            return Err(PlayerError::invalid_param(format!("bad subtitle uri {uri}")));
        }
        self.subtitle_uri = Some(uri.to_string());
        self.current_subtitle = 0;
        Ok(())
    }

    fn set_buffer_depth(&mut self, format: BufferFormat, depth: i64) -> PlayerResult<()> {
        if depth < 0 {
            return Err(PlayerError::invalid_param("negative buffer depth"));
        }
        match format {
            BufferFormat::ByTime => self.buffer_depth_ms = depth,
            BufferFormat::ByBytes => self.buffer_depth_bytes = depth,
        }
        Ok(())
    }

    fn buffer_depth(&self, format: BufferFormat) -> PlayerResult<i64> {
        Ok(match format {
            BufferFormat::ByTime => self.buffer_depth_ms,
            BufferFormat::ByBytes => self.buffer_depth_bytes,
        })
    }

    fn has_video(&self) -> PlayerResult<bool> {
        Ok(self.media()?.has_video)
    }

    fn has_audio(&self) -> PlayerResult<bool> {
        Ok(self.media()?.has_audio)
    }

    fn is_streaming(&self) -> PlayerResult<bool> {
        self.core.require_uri()?;
        Ok(!self.is_local())
    }

    fn is_seekable(&self) -> PlayerResult<bool> {
        Ok(self.core.seekable)
    }

    fn support_fullscreen(&self) -> PlayerResult<bool> {
        Ok(self.media()?.has_video)
    }

    fn player_state(&self) -> PlayerResult<PlayerState> {
        Ok(self.core.player_state)
    }

    /// Local files are fully available; streams report the configured depth.
    fn buffered_time(&self) -> PlayerResult<i64> {
        if self.is_local() {
            Ok(self.core.duration_ms.unwrap_or(0))
        } else {
            Ok(self.buffer_depth_ms)
        }
    }

    fn buffered_bytes(&self) -> PlayerResult<i64> {
        if self.is_local() {
            Ok(self.core.total_bytes.unwrap_or(0))
        } else {
            Ok(self.buffer_depth_bytes)
        }
    }

    /// `-1` when the duration is unknown.
    fn media_size_time(&self) -> PlayerResult<i64> {
        Ok(self.core.duration_ms.unwrap_or(-1))
    }

    fn media_size_bytes(&self) -> PlayerResult<i64> {
        Ok(self.core.total_bytes.unwrap_or(-1))
    }

    fn video_num(&self) -> PlayerResult<i32> {
        Ok(i32::from(self.media()?.has_video))
    }

    fn audio_num(&self) -> PlayerResult<i32> {
        Ok(self.media()?.audio_tracks)
    }

    fn subtitle_num(&self) -> PlayerResult<i32> {
        Ok(i32::from(self.subtitle_uri.is_some()))
    }

    fn current_video(&self) -> PlayerResult<i32> {
        Ok(if self.media()?.has_video { 0 } else { -1 })
    }

    fn set_current_audio(&mut self, channel: i32) -> PlayerResult<()> {
        self.check_audio_channel(channel)?;
        if self.current_audio != channel {
            self.current_audio = channel;
            self.core.emit(SessionEvent::AudioTagChanged { channel });
        }
        Ok(())
    }

    fn current_audio(&self) -> PlayerResult<i32> {
        self.media()?;
        Ok(self.current_audio)
    }

    fn set_current_subtitle(&mut self, channel: i32) -> PlayerResult<()> {
        let available = i32::from(self.subtitle_uri.is_some());
        if channel < -1 || channel >= available {
            return Err(PlayerError::invalid_param(format!(
                "subtitle channel {channel} out of range"
            )));
        }
        if self.current_subtitle != channel {
            self.current_subtitle = channel;
            self.core.emit(SessionEvent::TextTagChanged { channel });
        }
        Ok(())
    }

    fn current_subtitle(&self) -> PlayerResult<i32> {
        Ok(self.current_subtitle)
    }

    fn audio_codec(&self, channel: i32) -> PlayerResult<String> {
        self.check_audio_channel(channel)?
            .audio_codec
            .clone()
            .ok_or_else(|| PlayerError::operation_failed("codec unknown"))
    }

    fn audio_bitrate(&self, channel: i32) -> PlayerResult<i32> {
        let media = self.check_audio_channel(channel)?;
        match (media.duration_ms, media.total_bytes) {
            (Some(duration), Some(bytes)) if duration > 0 => {
                Ok((bytes.saturating_mul(8_000) / duration) as i32)
            }
            _ => Err(PlayerError::operation_failed("bitrate unknown")),
        }
    }

    fn audio_samplerate(&self, channel: i32) -> PlayerResult<i32> {
        self.check_audio_channel(channel)?
            .sample_rate
            .map(|rate| rate as i32)
            .ok_or_else(|| PlayerError::operation_failed("sample rate unknown"))
    }

    fn protocol_name(&self) -> PlayerResult<String> {
        uri_protocol(self.core.require_uri()?)
            .ok_or_else(|| PlayerError::invalid_param("uri has no protocol"))
    }

    fn current_uri(&self) -> PlayerResult<String> {
        Ok(self.core.require_uri()?.to_string())
    }

    fn title(&self) -> PlayerResult<String> {
        self.core
            .title
            .clone()
            .ok_or_else(|| PlayerError::operation_failed("no title tag"))
    }

    fn artist(&self) -> PlayerResult<String> {
        self.core
            .artist
            .clone()
            .ok_or_else(|| PlayerError::operation_failed("no artist tag"))
    }
}
