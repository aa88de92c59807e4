//! Per-client session controller.
//!
//! A session owns at most one player backend, created lazily on the first
//! `play`/`pause`. Property setters forward to the backend when one is loaded
//! and otherwise land in a cache that is flushed into every newly created
//! backend. Backends emit straight into the session's event bus, so the client
//! sees one event stream regardless of which backend is loaded.

use crossbeam_channel::Receiver;

use playmux_types::{
    BufferFormat, ContentMetadata, PatEntry, PlayerState, PmtInfo, Proxy, ScaleMode, SessionEvent,
    Target, VideoRect,
};

use crate::backend::PlayerBackend;
use crate::error::{PlayerError, PlayerResult};
use crate::events::EventBus;
use crate::factory::{BackendFactory, LoadedBackend};
use crate::protocol::uri_protocol;
use crate::watchdog::WatchdogTask;

/// Properties remembered while no backend is loaded.
///
/// Successful forwards to a loaded backend are mirrored here as well so that a
/// replacement backend starts from the values the client last set.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCache {
    pub uri: Option<String>,
    pub sub_uri: Option<String>,
    pub volume: i32,
    pub mute: bool,
    pub scale_mode: ScaleMode,
    pub video_rect: VideoRect,
    pub video_rect_cached: bool,
    pub target: Option<Target>,
    pub proxy: Option<Proxy>,
}

impl Default for SessionCache {
    fn default() -> Self {
        Self {
            uri: None,
            sub_uri: None,
            volume: 50,
            mute: false,
            scale_mode: ScaleMode::KeepAspectRatio,
            video_rect: VideoRect::default(),
            video_rect_cached: false,
            target: None,
            proxy: None,
        }
    }
}

pub struct Session {
    name: String,
    attended: bool,
    factory: BackendFactory,
    events: EventBus<SessionEvent>,
    cache: SessionCache,
    uri_dirty: bool,
    backend: Option<LoadedBackend>,
    watchdog: Option<WatchdogTask>,
}

impl Session {
    /// Create a session; attended sessions start their liveness watchdog immediately.
    pub fn new(name: impl Into<String>, attended: bool, factory: BackendFactory) -> Self {
        let name = name.into();
        let events = EventBus::new();
        let watchdog =
            attended.then(|| WatchdogTask::spawn(factory.config().watchdog(), events.clone()));
        tracing::info!(session = %name, attended, "session created");
        Self {
            name,
            attended,
            factory,
            events,
            cache: SessionCache::default(),
            uri_dirty: false,
            backend: None,
            watchdog,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_attended(&self) -> bool {
        self.attended
    }

    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus<SessionEvent> {
        &self.events
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Filename of the plugin behind the loaded backend.
    pub fn backend_plugin(&self) -> Option<&str> {
        self.backend.as_ref().map(|loaded| loaded.descriptor.filename())
    }

    fn backend(&self) -> PlayerResult<&dyn PlayerBackend> {
        self.backend
            .as_ref()
            .map(|loaded| loaded.backend.as_ref())
            .ok_or(PlayerError::BackendNotLoaded)
    }

    fn backend_mut(&mut self) -> PlayerResult<&mut (dyn PlayerBackend + 'static)> {
        self.backend
            .as_mut()
            .map(|loaded| loaded.backend.as_mut())
            .ok_or(PlayerError::BackendNotLoaded)
    }

    // Lifecycle

    /// Remember `uri` for the next `play`/`pause`; never touches the backend.
    pub fn set_uri(&mut self, uri: &str) -> PlayerResult<()> {
        if uri.is_empty() {
            return Err(PlayerError::invalid_param("uri must not be empty"));
        }
        tracing::info!(session = %self.name, uri, "uri set");
        self.cache.uri = Some(uri.to_string());
        self.uri_dirty = true;
        Ok(())
    }

    pub fn play(&mut self) -> PlayerResult<()> {
        self.activate(PlayerState::Playing)
    }

    pub fn pause(&mut self) -> PlayerResult<()> {
        self.activate(PlayerState::Paused)
    }

    /// Bring the session to `target`, creating or replacing the backend as needed.
    pub fn activate(&mut self, target: PlayerState) -> PlayerResult<()> {
        if !matches!(target, PlayerState::Paused | PlayerState::Playing) {
            return Err(PlayerError::invalid_param(format!(
                "cannot activate to {}",
                target.name()
            )));
        }
        let uri = self
            .cache
            .uri
            .clone()
            .ok_or_else(|| PlayerError::invalid_param("no uri set"))?;
        let protocol = uri_protocol(&uri)
            .ok_or_else(|| PlayerError::invalid_param(format!("invalid uri {uri:?}")))?;

        if let Some(loaded) = self.backend.as_ref() {
            if !loaded.descriptor.supports_protocol(&protocol) {
                tracing::info!(
                    session = %self.name,
                    protocol = %protocol,
                    plugin = loaded.descriptor.name(),
                    "loaded backend does not support protocol, replacing"
                );
                self.reset_backend();
            }
        }

        if self.backend.is_none() {
            if let Err(err) = self.load_backend(&uri) {
                self.events.emit(SessionEvent::Error {
                    code: err.code(),
                    description: err.to_string(),
                });
                return Err(err);
            }
        } else if self.uri_dirty {
            let backend = self.backend_mut()?;
            backend.stop()?;
            backend.set_uri(&uri)?;
            self.uri_dirty = false;
        }

        let backend = self.backend_mut()?;
        match target {
            PlayerState::Playing => backend.play(),
            _ => backend.pause(),
        }
    }

    fn load_backend(&mut self, uri: &str) -> PlayerResult<()> {
        let loaded = self
            .factory
            .make_backend_for_uri(uri, &self.events)?
            .ok_or_else(|| PlayerError::operation_failed("failed to load backend"))?;
        tracing::info!(
            session = %self.name,
            plugin = loaded.descriptor.name(),
            "backend loaded"
        );
        self.backend = Some(loaded);
        if let Err(err) = self.flush_cache(uri) {
            self.reset_backend();
            return Err(err);
        }
        self.uri_dirty = false;
        self.events.emit(SessionEvent::Initialized);
        Ok(())
    }

    /// Push cached properties into a freshly created backend.
    ///
    /// Only the URI must be accepted; other refusals (typically capability gaps)
    /// are logged and skipped.
    fn flush_cache(&mut self, uri: &str) -> PlayerResult<()> {
        let cache = self.cache.clone();
        let proxy = self
            .factory
            .config()
            .proxy
            .clone()
            .or_else(|| cache.proxy.clone());
        let name = self.name.clone();
        let backend = self.backend_mut()?;

        backend.set_uri(uri)?;
        let mut results = vec![
            ("volume", backend.set_volume(cache.volume)),
            ("mute", backend.set_mute(cache.mute)),
            ("scale_mode", backend.set_scale_mode(cache.scale_mode)),
        ];
        if cache.video_rect_cached {
            results.push(("video_size", backend.set_video_size(cache.video_rect)));
        }
        if let Some(proxy) = proxy.as_ref() {
            results.push(("proxy", backend.set_proxy(proxy)));
        }
        if let Some(target) = cache.target.as_ref() {
            results.push(("target", backend.set_target(target)));
        }
        if let Some(sub_uri) = cache.sub_uri.as_deref() {
            results.push(("subtitle_uri", backend.set_subtitle_uri(sub_uri)));
        }
        for (property, result) in results {
            if let Err(err) = result {
                tracing::debug!(session = %name, property, error = %err, "cached property not applied");
            }
        }
        Ok(())
    }

    /// Stop and dispose the loaded backend, if any.
    fn reset_backend(&mut self) {
        if let Some(mut loaded) = self.backend.take() {
            if let Err(err) = loaded.backend.stop() {
                tracing::warn!(session = %self.name, error = %err, "backend stop failed");
            }
            tracing::info!(
                session = %self.name,
                plugin = loaded.descriptor.name(),
                "backend disposed"
            );
        }
    }

    /// Stop playback and dispose the backend. Succeeds without a backend.
    pub fn stop(&mut self) -> PlayerResult<()> {
        self.reset_backend();
        Ok(())
    }

    pub fn suspend(&mut self) -> PlayerResult<()> {
        self.backend_mut()?.suspend()
    }

    pub fn restore(&mut self) -> PlayerResult<()> {
        self.backend_mut()?.restore()
    }

    /// Acknowledge liveness; resets the watchdog accumulator.
    pub fn reply(&mut self) -> PlayerResult<()> {
        if let Some(watchdog) = self.watchdog.as_ref() {
            watchdog.reply();
        }
        Ok(())
    }

    /// Milliseconds since the client last replied, for attended sessions.
    pub fn no_reply_ms(&self) -> Option<u64> {
        self.watchdog.as_ref().map(WatchdogTask::no_reply_ms)
    }

    // Cached properties

    pub fn set_volume(&mut self, volume: i32) -> PlayerResult<()> {
        if !(0..=100).contains(&volume) {
            return Err(PlayerError::invalid_param(format!(
                "volume {volume} outside 0..=100"
            )));
        }
        if let Some(loaded) = self.backend.as_mut() {
            loaded.backend.set_volume(volume)?;
        }
        self.cache.volume = volume;
        Ok(())
    }

    pub fn volume(&self) -> PlayerResult<i32> {
        self.backend()?.volume()
    }

    pub fn set_mute(&mut self, mute: bool) -> PlayerResult<()> {
        if let Some(loaded) = self.backend.as_mut() {
            loaded.backend.set_mute(mute)?;
        }
        self.cache.mute = mute;
        Ok(())
    }

    pub fn is_mute(&self) -> PlayerResult<bool> {
        self.backend()?.is_mute()
    }

    pub fn set_scale_mode(&mut self, mode: ScaleMode) -> PlayerResult<()> {
        if let Some(loaded) = self.backend.as_mut() {
            loaded.backend.set_scale_mode(mode)?;
        }
        self.cache.scale_mode = mode;
        Ok(())
    }

    pub fn scale_mode(&self) -> PlayerResult<ScaleMode> {
        self.backend()?.scale_mode()
    }

    pub fn set_video_size(&mut self, rect: VideoRect) -> PlayerResult<()> {
        if let Some(loaded) = self.backend.as_mut() {
            loaded.backend.set_video_size(rect)?;
        }
        self.cache.video_rect = rect;
        self.cache.video_rect_cached = true;
        Ok(())
    }

    pub fn video_size(&self) -> PlayerResult<VideoRect> {
        self.backend()?.video_size()
    }

    pub fn set_proxy(&mut self, proxy: Proxy) -> PlayerResult<()> {
        if proxy.uri.is_empty() {
            return Err(PlayerError::invalid_param("proxy uri must not be empty"));
        }
        if let Some(loaded) = self.backend.as_mut() {
            loaded.backend.set_proxy(&proxy)?;
        }
        self.cache.proxy = Some(proxy);
        Ok(())
    }

    pub fn set_target(&mut self, target: Target) -> PlayerResult<()> {
        if let Some(loaded) = self.backend.as_mut() {
            loaded.backend.set_target(&target)?;
        }
        self.cache.target = Some(target);
        Ok(())
    }

    pub fn set_subtitle_uri(&mut self, uri: &str) -> PlayerResult<()> {
        if uri.is_empty() {
            return Err(PlayerError::invalid_param("subtitle uri must not be empty"));
        }
        if let Some(loaded) = self.backend.as_mut() {
            loaded.backend.set_subtitle_uri(uri)?;
        }
        self.cache.sub_uri = Some(uri.to_string());
        Ok(())
    }

    // Backend-only properties

    pub fn set_playback_rate(&mut self, rate: f64) -> PlayerResult<()> {
        self.backend_mut()?.set_playback_rate(rate)
    }

    pub fn playback_rate(&self) -> PlayerResult<f64> {
        self.backend()?.playback_rate()
    }

    pub fn set_position(&mut self, position_ms: i64) -> PlayerResult<()> {
        self.backend_mut()?.set_position(position_ms)
    }

    pub fn position(&self) -> PlayerResult<i64> {
        self.backend()?.position()
    }

    pub fn set_buffer_depth(&mut self, format: BufferFormat, depth: i64) -> PlayerResult<()> {
        self.backend_mut()?.set_buffer_depth(format, depth)
    }

    pub fn buffer_depth(&self, format: BufferFormat) -> PlayerResult<i64> {
        self.backend()?.buffer_depth(format)
    }

    // Introspection

    pub fn has_video(&self) -> PlayerResult<bool> {
        self.backend()?.has_video()
    }

    pub fn has_audio(&self) -> PlayerResult<bool> {
        self.backend()?.has_audio()
    }

    pub fn is_streaming(&self) -> PlayerResult<bool> {
        self.backend()?.is_streaming()
    }

    pub fn is_seekable(&self) -> PlayerResult<bool> {
        self.backend()?.is_seekable()
    }

    pub fn support_fullscreen(&self) -> PlayerResult<bool> {
        self.backend()?.support_fullscreen()
    }

    pub fn player_state(&self) -> PlayerResult<PlayerState> {
        self.backend()?.player_state()
    }

    pub fn buffered_time(&self) -> PlayerResult<i64> {
        self.backend()?.buffered_time()
    }

    pub fn buffered_bytes(&self) -> PlayerResult<i64> {
        self.backend()?.buffered_bytes()
    }

    pub fn media_size_time(&self) -> PlayerResult<i64> {
        self.backend()?.media_size_time()
    }

    pub fn media_size_bytes(&self) -> PlayerResult<i64> {
        self.backend()?.media_size_bytes()
    }

    pub fn video_num(&self) -> PlayerResult<i32> {
        self.backend()?.video_num()
    }

    pub fn audio_num(&self) -> PlayerResult<i32> {
        self.backend()?.audio_num()
    }

    pub fn subtitle_num(&self) -> PlayerResult<i32> {
        self.backend()?.subtitle_num()
    }

    pub fn set_current_video(&mut self, channel: i32) -> PlayerResult<()> {
        self.backend_mut()?.set_current_video(channel)
    }

    pub fn current_video(&self) -> PlayerResult<i32> {
        self.backend()?.current_video()
    }

    pub fn set_current_audio(&mut self, channel: i32) -> PlayerResult<()> {
        self.backend_mut()?.set_current_audio(channel)
    }

    pub fn current_audio(&self) -> PlayerResult<i32> {
        self.backend()?.current_audio()
    }

    pub fn set_current_subtitle(&mut self, channel: i32) -> PlayerResult<()> {
        self.backend_mut()?.set_current_subtitle(channel)
    }

    pub fn current_subtitle(&self) -> PlayerResult<i32> {
        self.backend()?.current_subtitle()
    }

    pub fn video_codec(&self, channel: i32) -> PlayerResult<String> {
        self.backend()?.video_codec(channel)
    }

    pub fn audio_codec(&self, channel: i32) -> PlayerResult<String> {
        self.backend()?.audio_codec(channel)
    }

    pub fn video_bitrate(&self, channel: i32) -> PlayerResult<i32> {
        self.backend()?.video_bitrate(channel)
    }

    pub fn audio_bitrate(&self, channel: i32) -> PlayerResult<i32> {
        self.backend()?.audio_bitrate(channel)
    }

    pub fn audio_samplerate(&self, channel: i32) -> PlayerResult<i32> {
        self.backend()?.audio_samplerate(channel)
    }

    pub fn video_framerate(&self, channel: i32) -> PlayerResult<(i32, i32)> {
        self.backend()?.video_framerate(channel)
    }

    pub fn video_resolution(&self, channel: i32) -> PlayerResult<(i32, i32)> {
        self.backend()?.video_resolution(channel)
    }

    pub fn video_aspect_ratio(&self, channel: i32) -> PlayerResult<(i32, i32)> {
        self.backend()?.video_aspect_ratio(channel)
    }

    pub fn protocol_name(&self) -> PlayerResult<String> {
        self.backend()?.protocol_name()
    }

    pub fn current_uri(&self) -> PlayerResult<String> {
        self.backend()?.current_uri()
    }

    pub fn title(&self) -> PlayerResult<String> {
        self.backend()?.title()
    }

    pub fn artist(&self) -> PlayerResult<String> {
        self.backend()?.artist()
    }

    pub fn record(&mut self, enable: bool, location: Option<&str>) -> PlayerResult<()> {
        self.backend_mut()?.record(enable, location)
    }

    pub fn pat(&self) -> PlayerResult<Vec<PatEntry>> {
        self.backend()?.pat()
    }

    pub fn pmt(&self) -> PlayerResult<PmtInfo> {
        self.backend()?.pmt()
    }

    pub fn associated_data_channel(&self) -> PlayerResult<(String, u16)> {
        self.backend()?.associated_data_channel()
    }

    /// What this session is playing, if a backend is loaded.
    pub fn metadata(&self) -> Option<ContentMetadata> {
        let backend = self.backend().ok()?;
        Some(ContentMetadata {
            session: self.name.clone(),
            uri: backend.current_uri().ok(),
            title: backend.title().ok(),
            artist: backend.artist().ok(),
            state: backend.player_state().unwrap_or_default(),
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.watchdog.take();
        self.reset_backend();
        tracing::info!(session = %self.name, "session disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceCapacity;
    use crate::testing::{Observed, SharedObserved, factory_with, mock_descriptor};
    use playmux_types::ResourceType;
    use std::sync::{Arc, Mutex};

    fn observed() -> SharedObserved {
        Arc::new(Mutex::new(Observed::default()))
    }

    fn web_factory(observed: &SharedObserved) -> BackendFactory {
        factory_with(
            vec![mock_descriptor("web", &["http", "https"], &[], observed)],
            "",
            ResourceCapacity::default(),
        )
    }

    fn drain(rx: &Receiver<SessionEvent>) -> Vec<SessionEvent> {
        rx.try_iter().collect()
    }

    #[test]
    fn play_constructs_backend_with_cached_defaults() {
        let observed = observed();
        let mut session = Session::new("s", false, web_factory(&observed));
        let rx = session.subscribe();

        session.set_uri("http://x/a.mp4").unwrap();
        session.play().unwrap();

        let seen = observed.lock().unwrap();
        assert_eq!(seen.created, 1);
        assert_eq!(seen.volume, Some(50));
        assert_eq!(seen.uri.as_deref(), Some("http://x/a.mp4"));
        drop(seen);
        assert!(drain(&rx).contains(&SessionEvent::PlayerStateChanged {
            old: PlayerState::Stopped,
            new: PlayerState::Playing,
        }));
        assert_eq!(session.player_state(), Ok(PlayerState::Playing));
    }

    #[test]
    fn denied_protocol_fails_to_load() {
        let observed = observed();
        let factory = factory_with(
            vec![mock_descriptor("generic", &[], &["dvb"], &observed)],
            "",
            ResourceCapacity::default(),
        );
        let mut session = Session::new("s", false, factory);
        let rx = session.subscribe();

        session.set_uri("dvb://1.2").unwrap();
        assert_eq!(
            session.play(),
            Err(PlayerError::OperationFailed("failed to load backend".to_string()))
        );
        assert!(!session.has_backend());
        assert_eq!(observed.lock().unwrap().created, 0);
        assert!(matches!(
            drain(&rx).as_slice(),
            [SessionEvent::Error { code: 5, .. }]
        ));
    }

    #[test]
    fn contended_decoder_is_granted_after_stop() {
        let observed = observed();
        let factory = factory_with(
            vec![mock_descriptor("web", &["http"], &[], &observed)],
            "",
            ResourceCapacity::default().with(ResourceType::VideoDecoder, 1),
        );
        let mut first = Session::new("s1", false, factory.clone());
        let mut second = Session::new("s2", false, factory.clone());
        let second_rx = second.subscribe();

        first.set_uri("http://x/a.mp4").unwrap();
        first.play().unwrap();
        second.set_uri("http://x/b.mp4").unwrap();
        assert!(matches!(second.play(), Err(PlayerError::NoResource(_))));
        assert!(drain(&second_rx).contains(&SessionEvent::NoResource));

        first.stop().unwrap();
        second.play().unwrap();
        assert_eq!(second.player_state(), Ok(PlayerState::Playing));
        assert_eq!(factory.arbiter().granted(ResourceType::VideoDecoder), 1);
    }

    #[test]
    fn volume_set_before_uri_reaches_backend() {
        let observed = observed();
        let mut session = Session::new("s", false, web_factory(&observed));

        session.set_volume(80).unwrap();
        assert_eq!(session.cache().volume, 80);
        session.set_uri("http://x/a.mp4").unwrap();
        session.play().unwrap();

        assert_eq!(observed.lock().unwrap().volume, Some(80));
        assert_eq!(session.volume(), Ok(80));
    }

    #[test]
    fn stop_without_backend_is_a_no_op() {
        let observed = observed();
        let mut session = Session::new("s", false, web_factory(&observed));
        let rx = session.subscribe();
        assert_eq!(session.stop(), Ok(()));
        assert_eq!(session.stop(), Ok(()));
        assert!(drain(&rx).is_empty());
        assert_eq!(observed.lock().unwrap().created, 0);
    }

    #[test]
    fn getters_need_a_backend() {
        let observed = observed();
        let session = Session::new("s", false, web_factory(&observed));
        assert_eq!(session.volume(), Err(PlayerError::BackendNotLoaded));
        assert_eq!(session.player_state(), Err(PlayerError::BackendNotLoaded));
        assert!(session.metadata().is_none());
    }

    #[test]
    fn activate_rejects_missing_uri_and_bad_state() {
        let observed = observed();
        let mut session = Session::new("s", false, web_factory(&observed));
        assert!(matches!(session.play(), Err(PlayerError::InvalidParam(_))));
        session.set_uri("http://x").unwrap();
        assert!(matches!(
            session.activate(PlayerState::Stopped),
            Err(PlayerError::InvalidParam(_))
        ));
        assert!(matches!(session.set_uri(""), Err(PlayerError::InvalidParam(_))));
    }

    #[test]
    fn cache_is_flushed_in_fixed_order() {
        let observed = observed();
        let factory = factory_with(
            vec![mock_descriptor("web", &["http"], &[], &observed)],
            "[proxy]\nuri = \"http://proxy:3128\"\n",
            ResourceCapacity::default(),
        );
        let mut session = Session::new("s", false, factory);
        let rx = session.subscribe();

        session.set_subtitle_uri("file:///tmp/a.srt").unwrap();
        session
            .set_target(Target::XWindow { window_id: 42 })
            .unwrap();
        session.set_video_size(VideoRect::new(0, 0, 640, 480)).unwrap();
        session
            .set_proxy(Proxy {
                uri: "http://session:8080".to_string(),
                ..Proxy::default()
            })
            .unwrap();
        session.set_uri("http://x/a.mp4").unwrap();
        session.pause().unwrap();

        let seen = observed.lock().unwrap();
        assert_eq!(
            seen.calls,
            vec![
                "set_uri",
                "set_volume",
                "set_mute",
                "set_scale_mode",
                "set_video_size",
                "set_proxy",
                "set_target",
                "set_subtitle_uri",
                "pause",
            ]
        );
        assert_eq!(
            seen.proxy.as_ref().map(|p| p.uri.as_str()),
            Some("http://proxy:3128")
        );
        drop(seen);

        let events = drain(&rx);
        let initialized = events
            .iter()
            .position(|e| *e == SessionEvent::Initialized)
            .unwrap();
        let paused = events
            .iter()
            .position(|e| {
                *e == SessionEvent::PlayerStateChanged {
                    old: PlayerState::Stopped,
                    new: PlayerState::Paused,
                }
            })
            .unwrap();
        assert!(initialized < paused);
    }

    #[test]
    fn protocol_swap_replaces_backend_after_release() {
        let observed = observed();
        let factory = factory_with(
            vec![
                mock_descriptor("web", &["http"], &[], &observed),
                mock_descriptor("live", &["rtsp"], &[], &observed),
            ],
            "",
            ResourceCapacity::default().with(ResourceType::VideoDecoder, 1),
        );
        let mut session = Session::new("s", false, factory.clone());

        session.set_uri("http://x/a.mp4").unwrap();
        session.play().unwrap();
        assert_eq!(session.backend_plugin(), Some("libplaymux-web.so"));

        session.set_volume(30).unwrap();
        session.set_uri("rtsp://cam/1").unwrap();
        session.play().unwrap();

        assert_eq!(session.backend_plugin(), Some("libplaymux-live.so"));
        assert_eq!(observed.lock().unwrap().created, 2);
        assert_eq!(observed.lock().unwrap().volume, Some(30));
        assert_eq!(factory.arbiter().granted(ResourceType::VideoDecoder), 1);
    }

    #[test]
    fn dirty_uri_restarts_same_backend() {
        let observed = observed();
        let mut session = Session::new("s", false, web_factory(&observed));
        session.set_uri("http://x/a.mp4").unwrap();
        session.play().unwrap();
        observed.lock().unwrap().calls.clear();

        session.set_uri("http://x/b.mp4").unwrap();
        session.play().unwrap();

        let seen = observed.lock().unwrap();
        assert_eq!(seen.created, 1);
        assert_eq!(seen.calls, vec!["stop", "set_uri", "play"]);
        assert_eq!(seen.uri.as_deref(), Some("http://x/b.mp4"));
    }

    #[test]
    fn suspend_and_restore_round_trip() {
        let observed = observed();
        let factory = web_factory(&observed);
        let mut session = Session::new("s", false, factory.clone());
        assert_eq!(session.suspend(), Err(PlayerError::BackendNotLoaded));

        session.set_uri("http://x/a.mp4").unwrap();
        session.play().unwrap();
        session.suspend().unwrap();
        assert_eq!(factory.arbiter().granted(ResourceType::VideoDecoder), 0);
        session.restore().unwrap();
        assert_eq!(session.player_state(), Ok(PlayerState::Playing));
        assert_eq!(factory.arbiter().granted(ResourceType::VideoDecoder), 1);
    }

    #[test]
    fn play_after_suspend_can_be_suspended_again() {
        let observed = observed();
        let factory = web_factory(&observed);
        let mut session = Session::new("s", false, factory.clone());
        session.set_uri("http://x/a.mp4").unwrap();
        session.play().unwrap();
        session.suspend().unwrap();

        session.play().unwrap();
        assert_eq!(factory.arbiter().granted(ResourceType::VideoDecoder), 1);

        session.suspend().unwrap();
        assert_eq!(session.player_state(), Ok(PlayerState::Stopped));
        assert_eq!(factory.arbiter().granted(ResourceType::VideoDecoder), 0);
        session.restore().unwrap();
        assert_eq!(session.player_state(), Ok(PlayerState::Playing));
    }

    #[test]
    fn dropping_session_releases_resources() {
        let observed = observed();
        let factory = web_factory(&observed);
        let mut session = Session::new("s", false, factory.clone());
        session.set_uri("http://x/a.mp4").unwrap();
        session.play().unwrap();
        drop(session);
        assert_eq!(factory.arbiter().granted(ResourceType::VideoDecoder), 0);
    }

    #[test]
    fn attended_session_asks_for_replies() {
        let observed = observed();
        let factory = factory_with(
            vec![mock_descriptor("web", &["http"], &[], &observed)],
            "[watchdog]\nperiod_ms = 5\ntimeout_ms = 1000\n",
            ResourceCapacity::default(),
        );
        let mut session = Session::new("s", true, factory);
        let rx = session.subscribe();

        let event = rx.recv_timeout(std::time::Duration::from_secs(2));
        assert_eq!(event, Ok(SessionEvent::NeedReply));
        session.reply().unwrap();
        assert!(session.no_reply_ms().unwrap() <= 1000);
    }

    #[test]
    fn dropping_attended_session_cancels_watchdog() {
        let observed = observed();
        let factory = factory_with(
            vec![mock_descriptor("web", &["http"], &[], &observed)],
            "[watchdog]\nperiod_ms = 5\ntimeout_ms = 60000\n",
            ResourceCapacity::default(),
        );
        let session = Session::new("s", true, factory);
        let rx = session.subscribe();
        assert_eq!(
            rx.recv_timeout(std::time::Duration::from_secs(2)),
            Ok(SessionEvent::NeedReply)
        );

        drop(session);
        rx.try_iter().for_each(drop);
        assert_eq!(
            rx.recv_timeout(std::time::Duration::from_millis(100)),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected)
        );
    }
}
