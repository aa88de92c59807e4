//! Session lifecycle management.
//!
//! The manager names sessions, keeps them alive, and removes them when an
//! attended client stops replying or an unattended session's time runs out.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use crossbeam_channel::Receiver;
use serde::Serialize;

use playmux_types::{ContentMetadata, SessionEvent};

use crate::error::{PlayerError, PlayerResult};
use crate::events::EventBus;
use crate::factory::BackendFactory;
use crate::session::Session;
use crate::timer::TimerTask;

/// Prefix of every session name; a sequence number follows.
pub const SESSION_NAME_PREFIX: &str = "/playmux/MediaPlayer";

pub type SessionHandle = Arc<Mutex<Session>>;

/// Notifications about the set of live sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ManagerEvent {
    SessionAdded { name: String, attended: bool },
    SessionRemoved { name: String },
}

struct ManagedSession {
    session: SessionHandle,
    _expiry: Option<TimerTask>,
}

struct ManagerInner {
    factory: BackendFactory,
    sessions: Mutex<BTreeMap<String, ManagedSession>>,
    next_id: AtomicU64,
    events: EventBus<ManagerEvent>,
}

impl ManagerInner {
    fn sessions(&self) -> MutexGuard<'_, BTreeMap<String, ManagedSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, name: &str) -> bool {
        let removed = self.sessions().remove(name);
        let Some(managed) = removed else {
            return false;
        };
        // Dropped outside the map lock: disposal stops the backend and joins timers.
        drop(managed);
        tracing::info!(session = %name, "session removed");
        self.events.emit(ManagerEvent::SessionRemoved {
            name: name.to_string(),
        });
        true
    }
}

/// Lock a session, recovering the guard if a previous holder panicked.
pub fn lock_session(handle: &SessionHandle) -> MutexGuard<'_, Session> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<ManagerInner>,
}

impl SessionManager {
    pub fn new(factory: BackendFactory) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                factory,
                sessions: Mutex::new(BTreeMap::new()),
                next_id: AtomicU64::new(0),
                events: EventBus::new(),
            }),
        }
    }

    pub fn factory(&self) -> &BackendFactory {
        &self.inner.factory
    }

    pub fn subscribe(&self) -> Receiver<ManagerEvent> {
        self.inner.events.subscribe()
    }

    fn next_name(&self) -> String {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        format!("{SESSION_NAME_PREFIX}{id}")
    }

    fn insert(&self, session: Session, expiry: Option<TimerTask>) -> (String, SessionHandle) {
        let name = session.name().to_string();
        let attended = session.is_attended();
        let handle = Arc::new(Mutex::new(session));
        self.inner.sessions().insert(
            name.clone(),
            ManagedSession {
                session: handle.clone(),
                _expiry: expiry,
            },
        );
        self.inner.events.emit(ManagerEvent::SessionAdded {
            name: name.clone(),
            attended,
        });
        (name, handle)
    }

    /// Create a session watched by the liveness watchdog.
    ///
    /// The session is removed once it reports `ClientNoReply`.
    pub fn create_attended(&self) -> (String, SessionHandle) {
        let name = self.next_name();
        let session = Session::new(name, true, self.inner.factory.clone());
        let events = session.subscribe();
        self.adopt_attended(session, events)
    }

    /// Register `session` and start reaping it. `events` must have been subscribed
    /// before the watchdog could fire so an early `ClientNoReply` is still seen.
    fn adopt_attended(
        &self,
        session: Session,
        events: Receiver<SessionEvent>,
    ) -> (String, SessionHandle) {
        let (name, handle) = self.insert(session, None);
        let weak = Arc::downgrade(&self.inner);
        let reaped = name.clone();
        std::thread::spawn(move || reap_on_no_reply(events, weak, reaped));
        (name, handle)
    }

    /// Create a session that is removed after `time_to_execution`.
    pub fn create_unattended(
        &self,
        time_to_execution: Duration,
    ) -> PlayerResult<(String, SessionHandle)> {
        if time_to_execution.is_zero() {
            return Err(PlayerError::invalid_param(
                "unattended sessions need a positive time to execution",
            ));
        }
        let name = self.next_name();
        let session = Session::new(name.clone(), false, self.inner.factory.clone());
        let weak = Arc::downgrade(&self.inner);
        let expired = name.clone();
        let expiry = TimerTask::once(time_to_execution, move || {
            if let Some(inner) = weak.upgrade() {
                tracing::info!(session = %expired, "unattended session expired");
                inner.remove(&expired);
            }
        });
        Ok(self.insert(session, Some(expiry)))
    }

    pub fn session(&self, name: &str) -> Option<SessionHandle> {
        self.inner
            .sessions()
            .get(name)
            .map(|managed| managed.session.clone())
    }

    /// Run `f` against the named session.
    pub fn with_session<R>(&self, name: &str, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let handle = self.session(name)?;
        let mut session = lock_session(&handle);
        Some(f(&mut session))
    }

    pub fn remove_session(&self, name: &str) -> bool {
        self.inner.remove(name)
    }

    pub fn session_names(&self) -> Vec<String> {
        self.inner.sessions().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// What every session with a loaded backend is playing.
    pub fn playing_content_metadata(&self) -> Vec<ContentMetadata> {
        let handles: Vec<SessionHandle> = self
            .inner
            .sessions()
            .values()
            .map(|managed| managed.session.clone())
            .collect();
        handles
            .iter()
            .filter_map(|handle| lock_session(handle).metadata())
            .collect()
    }
}

fn reap_on_no_reply(events: Receiver<SessionEvent>, manager: Weak<ManagerInner>, name: String) {
    for event in events {
        if event == SessionEvent::ClientNoReply {
            if let Some(inner) = manager.upgrade() {
                tracing::warn!(session = %name, "client not replying, removing session");
                inner.remove(&name);
            }
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceCapacity;
    use crate::testing::{Observed, factory_with, mock_descriptor};
    use playmux_types::PlayerState;
    use std::time::Instant;

    fn manager(config: &str) -> SessionManager {
        let observed = Arc::new(Mutex::new(Observed::default()));
        SessionManager::new(factory_with(
            vec![mock_descriptor("web", &["http"], &[], &observed)],
            config,
            ResourceCapacity::default(),
        ))
    }

    fn wait_until(mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(3);
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        done()
    }

    #[test]
    fn sessions_get_sequential_names() {
        let manager = manager("[watchdog]\nperiod_ms = 1000\ntimeout_ms = 60000\n");
        let events = manager.subscribe();
        let (first, _) = manager.create_attended();
        let (second, _) = manager.create_unattended(Duration::from_secs(60)).unwrap();

        assert_eq!(first, "/playmux/MediaPlayer0");
        assert_eq!(second, "/playmux/MediaPlayer1");
        assert_eq!(manager.session_names(), vec![first.clone(), second.clone()]);
        assert_eq!(
            events.try_recv(),
            Ok(ManagerEvent::SessionAdded {
                name: first.clone(),
                attended: true,
            })
        );

        assert!(manager.remove_session(&first));
        assert!(!manager.remove_session(&first));
        assert!(manager.session(&first).is_none());
        assert!(manager.session(&second).is_some());
    }

    #[test]
    fn silent_attended_client_is_removed() {
        let manager = manager("[watchdog]\nperiod_ms = 2\ntimeout_ms = 10\n");
        let events = manager.subscribe();
        let (name, _) = manager.create_attended();

        assert!(wait_until(|| manager.session(&name).is_none()));
        let removed: Vec<ManagerEvent> = events.try_iter().collect();
        assert!(removed.contains(&ManagerEvent::SessionRemoved { name }));
    }

    #[test]
    fn no_reply_before_registration_still_reaps() {
        let manager = manager("[watchdog]\nperiod_ms = 1\ntimeout_ms = 0\n");
        let session = Session::new(manager.next_name(), true, manager.factory().clone());
        let events = session.subscribe();
        let watched = session.subscribe();
        assert!(
            watched
                .iter()
                .any(|event| event == SessionEvent::ClientNoReply)
        );

        let (name, _) = manager.adopt_attended(session, events);
        assert!(wait_until(|| manager.session(&name).is_none()));
    }

    #[test]
    fn unattended_session_expires() {
        let manager = manager("");
        let (name, _) = manager.create_unattended(Duration::from_millis(20)).unwrap();
        assert!(manager.session(&name).is_some());
        assert!(wait_until(|| manager.is_empty()));
    }

    #[test]
    fn unattended_session_needs_positive_time() {
        let manager = manager("");
        assert!(matches!(
            manager.create_unattended(Duration::ZERO),
            Err(PlayerError::InvalidParam(_))
        ));
    }

    #[test]
    fn metadata_lists_sessions_with_backends() {
        let manager = manager("");
        let (playing, _) = manager.create_unattended(Duration::from_secs(60)).unwrap();
        let (_idle, _) = manager.create_unattended(Duration::from_secs(60)).unwrap();
        manager
            .with_session(&playing, |session| {
                session.set_uri("http://x/a.mp4")?;
                session.play()
            })
            .unwrap()
            .unwrap();

        let metadata = manager.playing_content_metadata();
        assert_eq!(
            metadata,
            vec![ContentMetadata {
                session: playing,
                uri: Some("http://x/a.mp4".to_string()),
                title: Some("Mock Title".to_string()),
                artist: None,
                state: PlayerState::Playing,
            }]
        );
    }
}
