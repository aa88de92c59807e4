//! Command implementations.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::{after, never, select, unbounded};
use serde::Serialize;

use playmux_core::builtin::register_builtin_plugins;
use playmux_core::config::ServiceConfig;
use playmux_core::factory::BackendFactory;
use playmux_core::manager::{SessionManager, lock_session};
use playmux_core::outputs::{AudioManager, VideoOutput};
use playmux_core::plugin::PluginRegistry;
use playmux_core::resource::ResourceArbiter;
use playmux_types::{AudioOutputState, AudioOutputType, PlayerState, ResourceType, SessionEvent};

/// How long a probe session may live before the manager reclaims it.
const PROBE_TIME_TO_EXECUTION: Duration = Duration::from_secs(30);

/// Load the configuration file, or defaults when none was given.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig> {
    match path {
        Some(path) => {
            let cfg = ServiceConfig::load(path)?;
            tracing::info!(path = ?path, "configuration loaded");
            Ok(cfg)
        }
        None => Ok(ServiceConfig::default()),
    }
}

/// Register builtin plugins and wire the arbiter, factory and manager together.
pub fn build_manager(config: ServiceConfig) -> Result<SessionManager> {
    let mut registry = PluginRegistry::new();
    register_builtin_plugins(&mut registry).context("register builtin plugins")?;
    let capacity = config.resource_capacity();
    for kind in ResourceType::ALL {
        tracing::debug!(resource = %kind, units = capacity.get(kind), "resource capacity");
    }
    let arbiter = ResourceArbiter::new(&capacity);
    Ok(SessionManager::new(BackendFactory::new(registry, config, arbiter)))
}

/// Print registered plugins to stdout.
pub fn list_plugins(manager: &SessionManager) -> Result<()> {
    for plugin in manager.factory().registry().iter() {
        let protocols = if plugin.supported_protocols().is_empty() {
            format!("all except [{}]", plugin.unsupported_protocols().join(", "))
        } else {
            format!("[{}]", plugin.supported_protocols().join(", "))
        };
        println!(
            "{:<12} {:<26} v{} {:<14} {}",
            plugin.name(),
            plugin.filename(),
            plugin.version(),
            plugin.kind().name(),
            protocols
        );
        if !plugin.description().is_empty() {
            println!("{:12} {}", "", plugin.description());
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ProbeReport {
    uri: String,
    plugin: Option<String>,
    state: Option<PlayerState>,
    protocol: Option<String>,
    has_video: Option<bool>,
    has_audio: Option<bool>,
    is_streaming: Option<bool>,
    is_seekable: Option<bool>,
    duration_ms: Option<i64>,
    size_bytes: Option<i64>,
    audio_codec: Option<String>,
    audio_sample_rate: Option<i32>,
    title: Option<String>,
    artist: Option<String>,
}

/// Pause a backend on `uri` and print what it reports as JSON.
pub fn run_probe(manager: &SessionManager, uri: &str) -> Result<()> {
    let (name, handle) = manager.create_unattended(PROBE_TIME_TO_EXECUTION)?;
    let report = {
        let mut session = lock_session(&handle);
        session.set_uri(uri)?;
        session
            .pause()
            .with_context(|| format!("load backend for {uri}"))?;
        ProbeReport {
            uri: uri.to_string(),
            plugin: session.backend_plugin().map(str::to_string),
            state: session.player_state().ok(),
            protocol: session.protocol_name().ok(),
            has_video: session.has_video().ok(),
            has_audio: session.has_audio().ok(),
            is_streaming: session.is_streaming().ok(),
            is_seekable: session.is_seekable().ok(),
            duration_ms: session.media_size_time().ok().filter(|d| *d >= 0),
            size_bytes: session.media_size_bytes().ok().filter(|b| *b >= 0),
            audio_codec: session.audio_codec(0).ok(),
            audio_sample_rate: session.audio_samplerate(0).ok(),
            title: session.title().ok(),
            artist: session.artist().ok(),
        }
    };
    drop(handle);
    manager.remove_session(&name);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Play `uri` in an attended session, printing events until the media ends,
/// an error occurs, the deadline passes or Ctrl-C is pressed.
pub fn run_play(
    manager: &SessionManager,
    uri: &str,
    seconds: Option<u64>,
    volume: i32,
) -> Result<()> {
    let (interrupt_tx, interrupt_rx) = unbounded::<()>();
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.send(());
    })
    .context("install Ctrl-C handler")?;

    let (name, handle) = manager.create_attended();
    let events = lock_session(&handle).subscribe();
    {
        let mut session = lock_session(&handle);
        session.set_volume(volume)?;
        session.set_uri(uri)?;
        session.play().with_context(|| format!("play {uri}"))?;
    }
    tracing::info!(session = %name, uri, "playing");

    let deadline = seconds.map(|s| after(Duration::from_secs(s))).unwrap_or_else(never);
    loop {
        select! {
            recv(events) -> event => {
                let Ok(event) = event else {
                    break;
                };
                println!("{}", serde_json::to_string(&event)?);
                match event {
                    SessionEvent::NeedReply => {
                        lock_session(&handle).reply()?;
                    }
                    SessionEvent::Eof
                    | SessionEvent::Error { .. }
                    | SessionEvent::ClientNoReply => break,
                    _ => {}
                }
            }
            recv(deadline) -> _ => {
                tracing::info!("play time elapsed");
                break;
            }
            recv(interrupt_rx) -> _ => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    if let Ok(position) = lock_session(&handle).position() {
        tracing::info!(position_ms = position, "stopping");
    }
    lock_session(&handle).stop()?;
    drop(handle);
    manager.remove_session(&name);
    Ok(())
}

#[derive(Serialize)]
struct VideoOutputReport {
    output: String,
    mode: Option<String>,
    valid_modes: Vec<String>,
}

#[derive(Serialize)]
struct AudioOutputReport {
    output: AudioOutputType,
    volume: Option<i32>,
    state: Option<AudioOutputState>,
}

#[derive(Serialize)]
struct OutputsReport {
    video: Vec<VideoOutputReport>,
    audio: Vec<AudioOutputReport>,
}

/// Print display and audio output settings as JSON.
pub fn show_outputs(manager: &SessionManager) -> Result<()> {
    let video_output = VideoOutput::new(manager.factory());
    let audio_manager = AudioManager::new(manager.factory());

    let mut video = Vec::new();
    for output in video_output.valid_outputs().unwrap_or_default() {
        video.push(VideoOutputReport {
            mode: video_output.mode(&output).ok(),
            valid_modes: video_output.valid_modes(&output).unwrap_or_default(),
            output,
        });
    }
    let audio = [
        AudioOutputType::Hdmi,
        AudioOutputType::Spdif,
        AudioOutputType::I2s0,
        AudioOutputType::I2s1,
    ]
    .into_iter()
    .map(|output| AudioOutputReport {
        output,
        volume: audio_manager.volume(output).ok(),
        state: audio_manager.state(output).ok(),
    })
    .collect();

    println!(
        "{}",
        serde_json::to_string_pretty(&OutputsReport { video, audio })?
    );
    Ok(())
}
