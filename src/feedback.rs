use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use arboard::Clipboard as SystemBoard;

/// Write access to a clipboard. Shared with the delayed clear thread.
pub trait Clipboard: Send + Sync {
    fn write(&self, text: &str) -> Result<()>;

    fn clear(&self) -> Result<()> {
        self.write("")
    }
}

/// System clipboard via `arboard`. The handle is created lazily and kept alive so
/// X11/Wayland selections survive after the write returns.
#[derive(Default)]
pub struct SystemClipboard {
    board: Mutex<Option<SystemBoard>>,
}

impl Clipboard for SystemClipboard {
    fn write(&self, text: &str) -> Result<()> {
        let mut guard = self
            .board
            .lock()
            .map_err(|_| anyhow!("Clipboard lock poisoned"))?;
        if guard.is_none() {
            *guard = Some(SystemBoard::new().map_err(|e| anyhow!("Clipboard unavailable: {e}"))?);
        }
        match guard.as_mut() {
            Some(board) => board
                .set_text(text.to_string())
                .map_err(|e| anyhow!("Failed to set clipboard: {e}")),
            None => Err(anyhow!("Clipboard unavailable")),
        }
    }
}

/// Handle to a pending clipboard clear. Dropping it leaves the clear scheduled.
pub struct ClearHandle {
    cancelled: Arc<(Mutex<bool>, Condvar)>,
    thread: thread::JoinHandle<bool>,
}

impl ClearHandle {
    pub fn cancel(&self) {
        let (lock, cvar) = &*self.cancelled;
        if let Ok(mut cancelled) = lock.lock() {
            *cancelled = true;
            cvar.notify_all();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits for the clear thread; `true` when the clipboard was cleared.
    #[cfg(test)]
    pub fn join(self) -> bool {
        self.thread.join().unwrap_or(false)
    }
}

/// Clears `clipboard` once after `delay` unless cancelled. Failures are logged only.
pub fn schedule_clear(clipboard: Arc<dyn Clipboard>, delay: Duration) -> ClearHandle {
    let cancelled = Arc::new((Mutex::new(false), Condvar::new()));
    let flag = Arc::clone(&cancelled);
    let thread = thread::spawn(move || {
        let (lock, cvar) = &*flag;
        let Ok(guard) = lock.lock() else {
            return false;
        };
        let Ok((guard, _)) = cvar.wait_timeout_while(guard, delay, |cancelled| !*cancelled) else {
            return false;
        };
        if *guard {
            tracing::debug!("clipboard clear cancelled");
            return false;
        }
        drop(guard);
        match clipboard.clear() {
            Ok(()) => {
                tracing::info!("clipboard cleared");
                true
            }
            Err(e) => {
                tracing::warn!("clipboard clear failed: {e}");
                false
            }
        }
    });
    ClearHandle { cancelled, thread }
}

/// Copies `secret` and arms the delayed clear. A failed write is logged and otherwise ignored.
pub fn copy_secret(clipboard: &Arc<dyn Clipboard>, secret: &str, clear_after: Duration) -> ClearHandle {
    if let Err(e) = clipboard.write(secret) {
        tracing::warn!("clipboard write failed: {e}");
    }
    schedule_clear(Arc::clone(clipboard), clear_after)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Percent still above zero; schedule the next tick.
    Continue,
    /// Percent reached zero; the chain ends here.
    Stop,
}

/// Copy-feedback bar counting down in whole ticks from full to empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecayTimer {
    remaining: u32,
    total: u32,
    armed: bool,
}

impl DecayTimer {
    pub fn new(total_ticks: u32) -> Self {
        Self {
            remaining: 0,
            total: total_ticks.max(1),
            armed: false,
        }
    }

    pub fn percent(&self) -> f64 {
        f64::from(self.remaining) / f64::from(self.total)
    }

    /// Fills the bar. Returns `true` when the caller must schedule the first tick.
    pub fn start(&mut self) -> bool {
        self.remaining = self.total;
        let needs_tick = !self.armed;
        self.armed = true;
        needs_tick
    }

    /// Empties the bar; a pending tick still arrives and ends the chain.
    pub fn reset(&mut self) {
        self.remaining = 0;
    }

    pub fn tick(&mut self) -> TickOutcome {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.armed = false;
            TickOutcome::Stop
        } else {
            TickOutcome::Continue
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::time::Instant;

    /// In-memory clipboard recording every write.
    #[derive(Default)]
    pub(crate) struct RecordingClipboard {
        pub(crate) writes: Mutex<Vec<String>>,
        pub(crate) fail: bool,
    }

    impl RecordingClipboard {
        pub(crate) fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub(crate) fn writes(&self) -> Vec<String> {
            self.writes.lock().unwrap().clone()
        }
    }

    impl Clipboard for RecordingClipboard {
        fn write(&self, text: &str) -> Result<()> {
            if self.fail {
                return Err(anyhow!("no clipboard"));
            }
            self.writes.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    #[test]
    fn decay_follows_linear_schedule() {
        let mut timer = DecayTimer::new(150);
        assert!(timer.start());
        assert_eq!(timer.percent(), 1.0);
        for n in 1..150u32 {
            assert_eq!(timer.tick(), TickOutcome::Continue);
            let expected = (1.0 - f64::from(n) / 150.0).max(0.0);
            assert!((timer.percent() - expected).abs() < 1e-12);
        }
        assert_eq!(timer.tick(), TickOutcome::Stop);
        assert!(timer.percent() <= 0.0);
        assert!(!timer.armed);
    }

    #[test]
    fn ticks_after_empty_change_nothing() {
        let mut timer = DecayTimer::new(3);
        timer.start();
        while timer.tick() == TickOutcome::Continue {}
        let settled = timer;
        assert_eq!(timer.tick(), TickOutcome::Stop);
        assert_eq!(timer, settled);
    }

    #[test]
    fn restart_while_armed_does_not_request_second_chain() {
        let mut timer = DecayTimer::new(10);
        assert!(timer.start());
        timer.tick();
        assert!(!timer.start());
        assert_eq!(timer.percent(), 1.0);
    }

    #[test]
    fn reset_ends_chain_on_next_tick() {
        let mut timer = DecayTimer::new(10);
        timer.start();
        timer.reset();
        assert_eq!(timer.percent(), 0.0);
        assert!(timer.armed);
        assert_eq!(timer.tick(), TickOutcome::Stop);
        assert!(!timer.armed);
    }

    #[test]
    fn scheduled_clear_fires_once() {
        let board = Arc::new(RecordingClipboard::default());
        let handle = schedule_clear(board.clone(), Duration::from_millis(20));
        assert!(handle.join());
        assert_eq!(board.writes(), vec![String::new()]);
    }

    #[test]
    fn cancelled_clear_does_not_touch_clipboard() {
        let board = Arc::new(RecordingClipboard::default());
        let started = Instant::now();
        let handle = schedule_clear(board.clone(), Duration::from_secs(30));
        handle.cancel();
        assert!(!handle.join());
        assert!(started.elapsed() < Duration::from_secs(30));
        assert!(board.writes().is_empty());
    }

    #[test]
    fn copy_writes_secret_then_clears() {
        let board = Arc::new(RecordingClipboard::default());
        let shared: Arc<dyn Clipboard> = board.clone();
        let handle = copy_secret(&shared, "Xy9!", Duration::from_millis(10));
        assert!(handle.join());
        assert_eq!(board.writes(), vec!["Xy9!".to_string(), String::new()]);
    }

    #[test]
    fn copy_failure_is_swallowed() {
        let shared: Arc<dyn Clipboard> = Arc::new(RecordingClipboard::failing());
        let handle = copy_secret(&shared, "pw", Duration::from_millis(1));
        assert!(!handle.join());
    }
}
