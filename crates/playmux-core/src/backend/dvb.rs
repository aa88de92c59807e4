//! Live broadcast backend.
//!
//! URIs have the form `dvb://<frequency>.<program>[?adc=<ip>:<port>]`. The feed is
//! live, so `restore()` retunes and continues from "now" instead of seeking.

use playmux_types::{
    PatEntry, PlayerState, PmtInfo, PmtStream, ResourceType, ScaleMode, SessionEvent, Target,
    VideoRect,
};

use crate::error::{PlayerError, PlayerResult};
use crate::plugin::{PluginDescriptor, PluginKind};

use super::common::{OutputSettings, PlaybackClock};
use super::{BackendContext, BackendCore, BackendInstance, PlayerBackend};

pub const DVB_FILENAME: &str = "libplaymux-dvb.so";

const STREAM_TYPE_H264: u8 = 0x1b;
const STREAM_TYPE_AAC: u8 = 0x0f;
const NIT_PID: u16 = 0x0010;

pub fn descriptor() -> PluginDescriptor {
    PluginDescriptor::builder(PluginKind::PlayerBackend, "dvb")
        .filename(DVB_FILENAME)
        .description("Live broadcast backend with tuner and recording support")
        .supported_protocols(["dvb"])
        .factory(|ctx| Some(BackendInstance::Player(Box::new(DvbBackend::new(ctx)))))
        .build()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DvbChannel {
    frequency: u32,
    program_number: u16,
    data_channel: Option<(String, u16)>,
}

impl DvbChannel {
    fn parse(uri: &str) -> PlayerResult<Self> {
        let bad = || PlayerError::invalid_param(format!("malformed dvb uri {uri}"));
        let rest = uri
            .get(..6)
            .filter(|scheme| scheme.eq_ignore_ascii_case("dvb://"))
            .map(|_| &uri[6..])
            .ok_or_else(bad)?;
        let (location, query) = match rest.split_once('?') {
            Some((location, query)) => (location, Some(query)),
            None => (rest, None),
        };
        let (frequency, program) = location.split_once('.').ok_or_else(bad)?;
        let frequency = frequency.parse().map_err(|_| bad())?;
        let program_number = program.parse().map_err(|_| bad())?;

        let mut data_channel = None;
        for pair in query.into_iter().flat_map(|q| q.split('&')) {
            if let Some(value) = pair.strip_prefix("adc=") {
                let (ip, port) = value.rsplit_once(':').ok_or_else(bad)?;
                data_channel = Some((ip.to_string(), port.parse().map_err(|_| bad())?));
            }
        }

        Ok(Self {
            frequency,
            program_number,
            data_channel,
        })
    }

    fn pmt_pid(&self) -> u16 {
        0x0100 | (self.program_number & 0x00ff)
    }

    fn video_pid(&self) -> u16 {
        0x0200 | (self.program_number & 0x00ff)
    }

    fn audio_pid(&self) -> u16 {
        0x0300 | (self.program_number & 0x00ff)
    }
}

pub struct DvbBackend {
    core: BackendCore,
    output: OutputSettings,
    clock: PlaybackClock,
    channel: Option<DvbChannel>,
    recording: Option<String>,
}

impl DvbBackend {
    pub fn new(ctx: &BackendContext) -> Self {
        Self {
            core: BackendCore::new(ctx),
            output: OutputSettings::default(),
            clock: PlaybackClock::default(),
            channel: None,
            recording: None,
        }
    }

    fn tuned(&self) -> PlayerResult<&DvbChannel> {
        match (&self.channel, self.core.player_state) {
            (Some(channel), PlayerState::Paused | PlayerState::Playing) => Ok(channel),
            _ => Err(PlayerError::operation_failed("no channel tuned")),
        }
    }

    fn channel(&self) -> PlayerResult<&DvbChannel> {
        self.channel
            .as_ref()
            .ok_or_else(|| PlayerError::operation_failed("no channel set"))
    }

    fn transition(&mut self, to: PlayerState) -> PlayerResult<()> {
        let channel = self.channel()?.clone();
        self.core.acquire(&[
            (ResourceType::HwClock, None),
            (ResourceType::Tuner, None),
            (ResourceType::VideoDecoder, None),
            (ResourceType::Plane, self.output.plane_preference()),
        ])?;
        self.core.suspended = false;
        if !matches!(
            self.core.player_state,
            PlayerState::Paused | PlayerState::Playing
        ) {
            tracing::info!(
                frequency = channel.frequency,
                program = channel.program_number,
                "dvb tuned"
            );
        }
        self.core.is_live = true;
        self.core.seekable = false;
        if to == PlayerState::Playing {
            self.clock.start();
        } else {
            self.clock.pause();
        }
        self.core.set_state(to);
        Ok(())
    }

    fn stop_recording(&mut self) {
        if let Some(location) = self.recording.take() {
            tracing::info!(location = %location, "dvb recording stopped");
            self.core.emit(SessionEvent::RecordStop);
        }
    }

    fn check_channel_index(channel: i32) -> PlayerResult<()> {
        if channel == 0 {
            Ok(())
        } else {
            Err(PlayerError::invalid_param(format!(
                "channel {channel} out of range"
            )))
        }
    }
}

impl PlayerBackend for DvbBackend {
    fn set_uri(&mut self, uri: &str) -> PlayerResult<()> {
        let channel = DvbChannel::parse(uri)?;
        if matches!(
            self.core.player_state,
            PlayerState::Paused | PlayerState::Playing
        ) {
            self.stop()?;
        }
        self.core.uri = Some(uri.to_string());
        self.core.suspended = false;
        self.channel = Some(channel);
        self.clock.reset();
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
        self.stop_recording();
        self.clock.reset();
        self.core.stop();
        Ok(())
    }

    fn suspend(&mut self) -> PlayerResult<()> {
        if self.core.suspended {
            return Ok(());
        }
        let snapshot = self.core.snapshot_position(self.clock.position_ms());
        self.stop()?;
        self.core.mark_suspended(snapshot);
        Ok(())
    }

    /// Retunes and continues the live feed; the snapshot is not used.
    fn restore(&mut self) -> PlayerResult<()> {
        self.core.check_restorable()?;
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

    fn set_target(&mut self, target: &Target) -> PlayerResult<()> {
        self.output.set_target(target);
        Ok(())
    }

    fn playback_rate(&self) -> PlayerResult<f64> {
        Ok(1.0)
    }

    fn set_position(&mut self, _position_ms: i64) -> PlayerResult<()> {
        Err(PlayerError::operation_failed("live source is not seekable"))
    }

    /// Time since the channel was tuned.
    fn position(&self) -> PlayerResult<i64> {
        Ok(self.clock.position_ms())
    }

    fn has_video(&self) -> PlayerResult<bool> {
        self.channel()?;
        Ok(true)
    }

    fn has_audio(&self) -> PlayerResult<bool> {
        self.channel()?;
        Ok(true)
    }

    fn is_streaming(&self) -> PlayerResult<bool> {
        Ok(true)
    }

    fn is_seekable(&self) -> PlayerResult<bool> {
        Ok(false)
    }

    fn support_fullscreen(&self) -> PlayerResult<bool> {
        Ok(true)
    }

    fn player_state(&self) -> PlayerResult<PlayerState> {
        Ok(self.core.player_state)
    }

    fn media_size_time(&self) -> PlayerResult<i64> {
        Ok(-1)
    }

    fn media_size_bytes(&self) -> PlayerResult<i64> {
        Ok(-1)
    }

    fn video_num(&self) -> PlayerResult<i32> {
        self.channel()?;
        Ok(1)
    }

    fn audio_num(&self) -> PlayerResult<i32> {
        self.channel()?;
        Ok(1)
    }

    fn subtitle_num(&self) -> PlayerResult<i32> {
        Ok(0)
    }

    fn current_video(&self) -> PlayerResult<i32> {
        self.channel()?;
        Ok(0)
    }

    fn current_audio(&self) -> PlayerResult<i32> {
        self.channel()?;
        Ok(0)
    }

    fn video_codec(&self, channel: i32) -> PlayerResult<String> {
        Self::check_channel_index(channel)?;
        self.tuned()?;
        Ok("h264".to_string())
    }

    fn audio_codec(&self, channel: i32) -> PlayerResult<String> {
        Self::check_channel_index(channel)?;
        self.tuned()?;
        Ok("aac".to_string())
    }

    fn protocol_name(&self) -> PlayerResult<String> {
        self.channel()?;
        Ok("dvb".to_string())
    }

    fn current_uri(&self) -> PlayerResult<String> {
        Ok(self.core.require_uri()?.to_string())
    }

    fn record(&mut self, enable: bool, location: Option<&str>) -> PlayerResult<()> {
        if !enable {
            self.stop_recording();
            return Ok(());
        }
        self.tuned()?;
        let location = location
            .filter(|l| !l.is_empty())
            .ok_or_else(|| PlayerError::invalid_param("record location required"))?;
        if self.recording.is_some() {
            return Err(PlayerError::operation_failed("already recording"));
        }
        tracing::info!(location = %location, "dvb recording started");
        self.recording = Some(location.to_string());
        self.core.emit(SessionEvent::RecordStart);
        Ok(())
    }

    fn pat(&self) -> PlayerResult<Vec<PatEntry>> {
        let channel = self.tuned()?;
        Ok(vec![
            PatEntry {
                program_number: 0,
                pid: NIT_PID,
            },
            PatEntry {
                program_number: channel.program_number,
                pid: channel.pmt_pid(),
            },
        ])
    }

    fn pmt(&self) -> PlayerResult<PmtInfo> {
        let channel = self.tuned()?;
        Ok(PmtInfo {
            program_number: channel.program_number,
            pcr_pid: channel.video_pid(),
            streams: vec![
                PmtStream {
                    pid: channel.video_pid(),
                    stream_type: STREAM_TYPE_H264,
                },
                PmtStream {
                    pid: channel.audio_pid(),
                    stream_type: STREAM_TYPE_AAC,
                },
            ],
        })
    }

    fn associated_data_channel(&self) -> PlayerResult<(String, u16)> {
        self.channel()?
            .data_channel
            .clone()
            .ok_or_else(|| PlayerError::operation_failed("no associated data channel"))
    }
}
