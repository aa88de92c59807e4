//! State and lifecycle helpers shared by the builtin player backends.

use std::time::Instant;

use playmux_types::{PlayerState, Proxy, ResourceType, ScaleMode, SessionEvent, Target, VideoRect};

use crate::error::{PlayerError, PlayerResult};
use crate::events::EventBus;
use crate::resource::{ResourceArbiter, ResourceTicket};

use super::BackendContext;

/// Per-instance facts every player backend tracks.
///
/// Owns the resource tickets of its backend; dropping the core returns them.
pub struct BackendCore {
    pub uri: Option<String>,
    pub proxy: Option<Proxy>,
    pub player_state: PlayerState,
    pub pending_state: PlayerState,
    pub buffering: bool,
    pub buffer_percent: u8,
    pub seekable: bool,
    pub is_live: bool,
    pub duration_ms: Option<i64>,
    pub total_bytes: Option<i64>,
    pub suspended: bool,
    pub pos_snapshot_ms: i64,
    pub title: Option<String>,
    pub artist: Option<String>,
    tickets: Vec<ResourceTicket>,
    arbiter: ResourceArbiter,
    events: EventBus<SessionEvent>,
}

impl BackendCore {
    pub fn new(ctx: &BackendContext) -> Self {
        Self {
            uri: None,
            proxy: None,
            player_state: PlayerState::Null,
            pending_state: PlayerState::Null,
            buffering: false,
            buffer_percent: 0,
            seekable: false,
            is_live: false,
            duration_ms: None,
            total_bytes: None,
            suspended: false,
            pos_snapshot_ms: 0,
            title: None,
            artist: None,
            tickets: Vec::new(),
            arbiter: ctx.arbiter.clone(),
            events: ctx.events.clone(),
        }
    }

    pub fn events(&self) -> &EventBus<SessionEvent> {
        &self.events
    }

    pub fn emit(&self, event: SessionEvent) {
        self.events.emit(event);
    }

    pub fn require_uri(&self) -> PlayerResult<&str> {
        self.uri
            .as_deref()
            .ok_or_else(|| PlayerError::operation_failed("no uri set"))
    }

    /// Move to `new`, emitting `PlayerStateChanged` when the state actually changes.
    pub fn set_state(&mut self, new: PlayerState) {
        self.pending_state = new;
        let old = self.player_state;
        if old == new {
            return;
        }
        self.player_state = new;
        tracing::debug!(old = old.name(), new = new.name(), "player state changed");
        self.emit(SessionEvent::PlayerStateChanged { old, new });
    }

    pub fn holds(&self, kind: ResourceType) -> bool {
        self.tickets.iter().any(|ticket| ticket.kind() == kind)
    }

    /// Physical handle of the held unit of `kind`.
    pub fn held_handle(&self, kind: ResourceType) -> Option<i32> {
        self.tickets
            .iter()
            .find(|ticket| ticket.kind() == kind)
            .map(ResourceTicket::handle)
    }

    pub fn held_count(&self) -> usize {
        self.tickets.len()
    }

    /// Acquire every resource in `wanted` that is not already held.
    ///
    /// All or nothing: on the first refusal every ticket taken during this call is
    /// returned, `NoResource` is emitted and the error is reported.
    pub fn acquire(&mut self, wanted: &[(ResourceType, Option<i32>)]) -> PlayerResult<()> {
        let mut fresh = Vec::with_capacity(wanted.len());
        for &(kind, preference) in wanted {
            if self.holds(kind) {
                continue;
            }
            match self.arbiter.request(kind, preference) {
                Ok(ticket) => fresh.push(ticket),
                Err(err) => {
                    for ticket in fresh {
                        self.arbiter.release(ticket);
                    }
                    tracing::info!(resource = %kind, "resource unavailable");
                    self.emit(SessionEvent::NoResource);
                    return Err(err.into());
                }
            }
        }
        self.tickets.extend(fresh);
        Ok(())
    }

    /// Return every held ticket to the arbiter.
    pub fn release_resource(&mut self) {
        for ticket in self.tickets.drain(..) {
            self.arbiter.release(ticket);
        }
    }

    /// Forget facts derived from the current media.
    pub fn reset_transient(&mut self) {
        self.buffering = false;
        self.buffer_percent = 0;
        self.seekable = false;
        self.is_live = false;
        self.duration_ms = None;
        self.total_bytes = None;
    }

    /// Common part of `stop`: release, reset, move to `Stopped`, emit `Stopped`.
    pub fn stop(&mut self) {
        self.release_resource();
        self.reset_transient();
        self.suspended = false;
        self.set_state(PlayerState::Stopped);
        self.emit(SessionEvent::Stopped);
    }

    /// Position worth resuming from, given the current playback position.
    pub fn snapshot_position(&self, position_ms: i64) -> i64 {
        match self.player_state {
            PlayerState::Paused | PlayerState::Playing => position_ms,
            _ => 0,
        }
    }

    /// Record the suspension after the backend has stopped.
    pub fn mark_suspended(&mut self, snapshot_ms: i64) {
        self.suspended = true;
        self.pos_snapshot_ms = snapshot_ms;
        self.emit(SessionEvent::Suspended);
    }

    pub fn check_restorable(&self) -> PlayerResult<()> {
        if self.player_state == PlayerState::Stopped && self.suspended {
            Ok(())
        } else {
            Err(PlayerError::operation_failed("backend is not suspended"))
        }
    }

    pub fn mark_restored(&mut self) {
        self.suspended = false;
        self.emit(SessionEvent::Restored);
    }
}

impl Drop for BackendCore {
    fn drop(&mut self) {
        self.release_resource();
    }
}

/// Wall-clock playback position.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    base_ms: i64,
    running_since: Option<Instant>,
    rate: f64,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self {
            base_ms: 0,
            running_since: None,
            rate: 1.0,
        }
    }
}

impl PlaybackClock {
    pub fn position_ms(&self) -> i64 {
        let running = self
            .running_since
            .map(|since| (since.elapsed().as_millis() as f64 * self.rate) as i64)
            .unwrap_or(0);
        self.base_ms + running
    }

    pub fn start(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    pub fn pause(&mut self) {
        self.base_ms = self.position_ms();
        self.running_since = None;
    }

    pub fn seek(&mut self, position_ms: i64) {
        self.base_ms = position_ms.max(0);
        if self.running_since.is_some() {
            self.running_since = Some(Instant::now());
        }
    }

    pub fn reset(&mut self) {
        *self = Self {
            rate: self.rate,
            ..Self::default()
        };
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn set_rate(&mut self, rate: f64) {
        let position = self.position_ms();
        self.rate = rate;
        self.seek(position);
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }
}

/// Render settings shared by the builtin player backends.
#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub volume: i32,
    pub mute: bool,
    pub scale_mode: ScaleMode,
    pub video_rect: VideoRect,
    pub target: Option<Target>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            volume: 50,
            mute: false,
            scale_mode: ScaleMode::default(),
            video_rect: VideoRect::default(),
            target: None,
        }
    }
}

impl OutputSettings {
    pub fn set_volume(&mut self, volume: i32) -> PlayerResult<()> {
        if !(0..=100).contains(&volume) {
            return Err(PlayerError::invalid_param(format!(
                "volume {volume} outside 0..=100"
            )));
        }
        self.volume = volume;
        Ok(())
    }

    /// Plane requested by a `Target::Plane` target, if any.
    pub fn plane_preference(&self) -> Option<i32> {
        match self.target {
            Some(Target::Plane { plane_id, .. }) => Some(plane_id),
            _ => None,
        }
    }

    pub fn set_target(&mut self, target: &Target) {
        if let Target::Plane {
            rectangle: Some(rect),
            ..
        } = target
        {
            self.video_rect = *rect;
        }
        self.target = Some(target.clone());
    }
}
