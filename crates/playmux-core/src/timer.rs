//! Cancellable background timers.

use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Sender, after, bounded, select, tick};

/// Handle to a timer thread; dropping it cancels the timer and joins the thread.
pub struct TimerTask {
    cancel: Option<Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl TimerTask {
    /// Run `f` once after `delay` unless cancelled first.
    pub fn once<F>(delay: Duration, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let (cancel, cancelled) = bounded::<()>(0);
        let join = std::thread::spawn(move || {
            let fire = after(delay);
            select! {
                recv(fire) -> _ => f(),
                recv(cancelled) -> _ => {}
            }
        });
        Self {
            cancel: Some(cancel),
            join: Some(join),
        }
    }

    /// Run `f` every `period` until it returns `false` or the task is cancelled.
    pub fn periodic<F>(period: Duration, mut f: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (cancel, cancelled) = bounded::<()>(0);
        let join = std::thread::spawn(move || {
            let ticker = tick(period);
            loop {
                select! {
                    recv(ticker) -> _ => {
                        if !f() {
                            break;
                        }
                    }
                    recv(cancelled) -> _ => break,
                }
            }
        });
        Self {
            cancel: Some(cancel),
            join: Some(join),
        }
    }

    /// True once the timer thread has exited.
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(JoinHandle::is_finished)
    }

    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Disconnecting the channel wakes the select.
        self.cancel.take();
        if let Some(join) = self.join.take() {
            // The callback itself may drop its own handle.
            if join.thread().id() != std::thread::current().id() {
                let _ = join.join();
            }
        }
    }
}

impl Drop for TimerTask {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn once_fires_after_delay() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let _task = TimerTask::once(Duration::from_millis(5), move || {
            let _ = tx.send(());
        });
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn cancelled_once_never_fires() {
        let (tx, rx) = crossbeam_channel::unbounded::<()>();
        let task = TimerTask::once(Duration::from_millis(200), move || {
            let _ = tx.send(());
        });
        task.cancel();
        assert!(rx.recv_timeout(Duration::from_millis(400)).is_err());
    }

    #[test]
    fn periodic_stops_when_callback_declines() {
        let count = Arc::new(AtomicU32::new(0));
        let seen = count.clone();
        let task = TimerTask::periodic(Duration::from_millis(2), move || {
            seen.fetch_add(1, Ordering::SeqCst) + 1 < 3
        });
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while !task.is_finished() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(task.is_finished());
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
