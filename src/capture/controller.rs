//! The capture state machine.
//!
//! The underlying recognition engine ends its sessions on its own after
//! silence, so "continuous" listening is reproduced here: while capture is
//! active, every session end immediately requests a new session. The single
//! `active` flag is checked when a session-end event is *handled*, not when
//! the session was started, which resolves the stop-vs-end race.

use thiserror::Error;
use tracing::{debug, warn};

/// Control surface of the underlying speech-to-text engine.
///
/// The engine is exclusively owned by the controller; nothing else may start
/// or stop it. Recognition results arrive out of band (the engine emits
/// events that the caller routes to the controller's handlers).
pub trait SpeechEngine {
    /// Begin a new recognition session.
    fn start_session(&mut self) -> anyhow::Result<()>;

    /// Terminate the current session, if any.
    fn stop_session(&mut self);
}

/// Recoverable capture failures. Capture stays (or returns to) `Idle`;
/// nothing is retried beyond the documented restart-on-end behavior.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The speech-to-text capability is unavailable or failed to start.
    #[error("speech recognition unavailable: {0}")]
    Unavailable(String),

    /// A restart after a natural session end failed.
    #[error("failed to restart recognition session: {0}")]
    Restart(String),
}

/// Externally observable controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Listening,
}

/// Controller for one continuous listening activation.
///
/// `active` is the single source of truth for whether the engine should keep
/// being restarted; `transcript` holds only finalized results.
pub struct CaptureController<E: SpeechEngine> {
    engine: E,
    active: bool,
    transcript: String,
    torn_down: bool,
}

impl<E: SpeechEngine> CaptureController<E> {
    pub fn new(engine: E) -> Self {
        Self { engine, active: false, transcript: String::new(), torn_down: false }
    }

    /// Current state: `Listening` iff a start has been requested and no stop
    /// (or teardown) has occurred since.
    pub fn state(&self) -> CaptureState {
        if self.active { CaptureState::Listening } else { CaptureState::Idle }
    }

    /// Request activation. Idempotent if already listening.
    ///
    /// # Errors
    /// Returns [`CaptureError::Unavailable`] if the engine fails to start;
    /// the controller stays `Idle`.
    pub fn start_capture(&mut self) -> Result<(), CaptureError> {
        if self.torn_down {
            warn!("start_capture after teardown ignored");
            return Err(CaptureError::Unavailable("controller torn down".to_string()));
        }
        if self.active {
            debug!("start_capture: already listening");
            return Ok(());
        }

        self.engine.start_session().map_err(|e| CaptureError::Unavailable(e.to_string()))?;
        self.active = true;
        debug!("Capture started");
        Ok(())
    }

    /// Request deactivation. Idempotent if already idle. Also cancels any
    /// restart implied by a session end that has not been handled yet.
    pub fn stop_capture(&mut self) {
        if !self.active {
            debug!("stop_capture: already idle");
            return;
        }
        self.active = false;
        self.engine.stop_session();
        debug!("Capture stopped");
    }

    /// An interim (non-final) hypothesis from the engine. Observed, never
    /// stored.
    pub fn on_interim_result(&self, text: &str) {
        debug!("Interim hypothesis (discarded): \"{}\"", text);
    }

    /// A finalized utterance from the engine. Replaces the transcript
    /// (last write wins, in delivery order).
    pub fn on_final_result(&mut self, text: String) {
        debug!("Final result: \"{}\"", text);
        self.transcript = text;
    }

    /// The engine's session ended, whether from an explicit stop or the
    /// engine's own silence policy. Restarts iff capture is still active.
    ///
    /// # Errors
    /// Returns [`CaptureError::Restart`] if the restart fails; the controller
    /// drops back to `Idle` and does not retry.
    pub fn on_session_end(&mut self) -> Result<(), CaptureError> {
        if !self.active {
            debug!("Session ended while idle, no restart");
            return Ok(());
        }

        debug!("Session ended while active, restarting");
        if let Err(e) = self.engine.start_session() {
            self.active = false;
            return Err(CaptureError::Restart(e.to_string()));
        }
        Ok(())
    }

    /// Finalized transcript accumulated so far.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Take the transcript, leaving the buffer empty.
    pub fn take_transcript(&mut self) -> String {
        std::mem::take(&mut self.transcript)
    }

    /// Release the engine: exactly one forced stop, regardless of `active`.
    /// Subsequent session-end events cause no restarts.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.active = false;
        self.engine.stop_session();
        debug!("Capture controller torn down");
    }
}

impl<E: SpeechEngine> Drop for CaptureController<E> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;

    #[derive(Clone, Default)]
    struct EngineProbe {
        starts: Arc<AtomicUsize>,
        stops: Arc<AtomicUsize>,
        fail_next_start: Arc<AtomicBool>,
    }

    impl EngineProbe {
        fn starts(&self) -> usize {
            self.starts.load(Ordering::SeqCst)
        }

        fn stops(&self) -> usize {
            self.stops.load(Ordering::SeqCst)
        }
    }

    struct FakeEngine {
        probe: EngineProbe,
    }

    impl SpeechEngine for FakeEngine {
        fn start_session(&mut self) -> anyhow::Result<()> {
            if self.probe.fail_next_start.swap(false, Ordering::SeqCst) {
                anyhow::bail!("microphone unavailable");
            }
            self.probe.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn stop_session(&mut self) {
            self.probe.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn controller() -> (CaptureController<FakeEngine>, EngineProbe) {
        let probe = EngineProbe::default();
        (CaptureController::new(FakeEngine { probe: probe.clone() }), probe)
    }

    #[test]
    fn test_state_tracks_most_recent_call() {
        let (mut c, _) = controller();
        assert_eq!(c.state(), CaptureState::Idle);

        c.start_capture().unwrap();
        assert_eq!(c.state(), CaptureState::Listening);

        c.stop_capture();
        assert_eq!(c.state(), CaptureState::Idle);

        c.start_capture().unwrap();
        c.start_capture().unwrap();
        assert_eq!(c.state(), CaptureState::Listening);
    }

    #[test]
    fn test_start_is_idempotent_while_listening() {
        let (mut c, probe) = controller();
        c.start_capture().unwrap();
        c.start_capture().unwrap();
        c.start_capture().unwrap();
        assert_eq!(probe.starts(), 1);
    }

    #[test]
    fn test_stop_is_idempotent_while_idle() {
        let (mut c, probe) = controller();
        c.stop_capture();
        c.stop_capture();
        assert_eq!(probe.stops(), 0);
        assert_eq!(c.state(), CaptureState::Idle);
    }

    #[test]
    fn test_interim_results_never_reach_transcript() {
        let (mut c, _) = controller();
        c.start_capture().unwrap();

        c.on_interim_result("I lo");
        c.on_interim_result("I love distrib");
        assert_eq!(c.transcript(), "");

        c.on_final_result("I love distributed systems".to_string());
        assert_eq!(c.transcript(), "I love distributed systems");
    }

    #[test]
    fn test_final_results_last_write_wins() {
        let (mut c, _) = controller();
        c.on_final_result("first answer".to_string());
        c.on_final_result("second answer".to_string());
        assert_eq!(c.transcript(), "second answer");
    }

    #[test]
    fn test_session_end_restarts_exactly_once_while_active() {
        let (mut c, probe) = controller();
        c.start_capture().unwrap();
        assert_eq!(probe.starts(), 1);

        c.on_session_end().unwrap();
        assert_eq!(probe.starts(), 2);
        assert_eq!(c.state(), CaptureState::Listening);
    }

    #[test]
    fn test_stop_before_session_end_cancels_restart() {
        let (mut c, probe) = controller();
        c.start_capture().unwrap();

        // The session that is about to end was started while active, but the
        // stop must win: no restart when the end event is finally handled.
        c.stop_capture();
        c.on_session_end().unwrap();

        assert_eq!(probe.starts(), 1);
        assert_eq!(c.state(), CaptureState::Idle);
    }

    #[test]
    fn test_failed_start_reports_and_stays_idle() {
        let (mut c, probe) = controller();
        probe.fail_next_start.store(true, Ordering::SeqCst);

        let err = c.start_capture().unwrap_err();
        assert!(matches!(err, CaptureError::Unavailable(_)));
        assert_eq!(c.state(), CaptureState::Idle);
        assert_eq!(probe.starts(), 0);
    }

    #[test]
    fn test_failed_restart_reports_and_drops_to_idle() {
        let (mut c, probe) = controller();
        c.start_capture().unwrap();

        probe.fail_next_start.store(true, Ordering::SeqCst);
        let err = c.on_session_end().unwrap_err();
        assert!(matches!(err, CaptureError::Restart(_)));
        assert_eq!(c.state(), CaptureState::Idle);

        // Reported, not retried: a later session end does nothing
        c.on_session_end().unwrap();
        assert_eq!(probe.starts(), 1);
    }

    #[test]
    fn test_teardown_stops_exactly_once_while_listening() {
        let (mut c, probe) = controller();
        c.start_capture().unwrap();

        c.teardown();
        assert_eq!(probe.stops(), 1);

        // Drop after explicit teardown must not stop again
        drop(c);
        assert_eq!(probe.stops(), 1);
    }

    #[test]
    fn test_teardown_stops_exactly_once_while_idle() {
        let (c, probe) = controller();
        drop(c);
        assert_eq!(probe.stops(), 1);
    }

    #[test]
    fn test_no_restart_after_teardown() {
        let (mut c, probe) = controller();
        c.start_capture().unwrap();
        c.teardown();

        c.on_session_end().unwrap();
        assert_eq!(probe.starts(), 1);
        assert_eq!(c.state(), CaptureState::Idle);
    }
}
