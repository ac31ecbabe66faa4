use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};

use log::{error, info, warn};

use super::aggregate::{AggregateSnapshot, AggregateState};
use super::alarm::AlarmPlayer;
use super::config::SessionConfig;
use super::worker::{CaptureWorker, Phase, StopSignal, cancel_pair, get_phase, set_phase};
use crate::capture::{CaptureRegion, Rect, RegionCapturer, Side, Sides};
use crate::error::ConfigError;
use crate::ocr::TextRecognizer;

struct ActiveSession {
    stop: StopSignal,
    handle: JoinHandle<()>,
    state: Arc<RwLock<AggregateState>>,
    stop_requested: bool,
}

/// Session control surface. Owns at most one capture worker at a time.
pub struct Monitor {
    capturer: Arc<dyn RegionCapturer>,
    recognizer: Arc<dyn TextRecognizer>,
    player: Arc<dyn AlarmPlayer>,
    phase: Arc<Mutex<Phase>>,
    session: Mutex<Option<ActiveSession>>,
}

impl Monitor {
    pub fn new(
        capturer: Arc<dyn RegionCapturer>,
        recognizer: Arc<dyn TextRecognizer>,
        player: Arc<dyn AlarmPlayer>,
    ) -> Self {
        Self {
            capturer,
            recognizer,
            player,
            phase: Arc::new(Mutex::new(Phase::Idle)),
            session: Mutex::new(None),
        }
    }

    /// Starts a session. No-op if one is already active.
    ///
    /// The aggregate starts from zero; configuration is validated first and
    /// nothing starts if it is malformed.
    pub fn start_session(
        &self,
        regions: Sides<Rect>,
        config: &SessionConfig,
    ) -> Result<(), ConfigError> {
        let mut session = self.lock_session();
        if session.is_some() {
            info!("Session already running");
            return Ok(());
        }

        let plan = config.validate()?;

        for side in Side::ALL {
            if let Err(e) = regions.get(side).validate() {
                warn!("{} region will score 0: {}", side, e);
            }
        }

        let state = Arc::new(RwLock::new(AggregateState::new(
            &plan.horizons,
            plan.latest_alarm,
        )));
        let (stop, token) = cancel_pair();

        info!(
            "Starting session: bid {:?}, ask {:?}, periods {:?}",
            regions.bid, regions.ask, config.time_periods
        );
        set_phase(&self.phase, Phase::Armed);

        let worker = CaptureWorker {
            capturer: Arc::clone(&self.capturer),
            recognizer: Arc::clone(&self.recognizer),
            player: Arc::clone(&self.player),
            regions: CaptureRegion::pair(regions),
            plan,
            state: Arc::clone(&state),
            phase: Arc::clone(&self.phase),
        };
        let handle = thread::spawn(move || worker.run(token));

        *session = Some(ActiveSession {
            stop,
            handle,
            state,
            stop_requested: false,
        });
        Ok(())
    }

    /// Signals the worker to stop and returns immediately. The phase stays
    /// `Stopping` until `poll_stopped` sees the worker exit. No-op when idle
    /// or already stopping.
    pub fn request_stop(&self) {
        let mut session = self.lock_session();
        let Some(active) = session.as_mut() else {
            return;
        };
        if active.stop_requested {
            return;
        }

        info!("Stopping session");
        set_phase(&self.phase, Phase::Stopping);
        active.stop.stop();
        active.stop_requested = true;
    }

    /// Completes a requested stop once the worker has exited. Returns the
    /// final aggregate exactly once; `None` while the worker is still running.
    pub fn poll_stopped(&self) -> Option<AggregateSnapshot> {
        let mut session = self.lock_session();
        let finished = session
            .as_ref()
            .is_some_and(|active| active.stop_requested && active.handle.is_finished());
        if !finished {
            return None;
        }
        session.take().map(|active| self.finish(active))
    }

    /// Stops the session and waits for the worker to drain. Returns the final
    /// aggregate, or `None` if no session was active.
    pub fn stop_session(&self) -> Option<AggregateSnapshot> {
        self.request_stop();
        let mut session = self.lock_session();
        session.take().map(|active| self.finish(active))
    }

    /// Joins the worker and returns to `Idle`. Called with the session lock
    /// held, so no new session can start in between.
    fn finish(&self, active: ActiveSession) -> AggregateSnapshot {
        if active.handle.join().is_err() {
            error!("Capture worker panicked");
        }
        set_phase(&self.phase, Phase::Idle);

        let snapshot = read_snapshot(&active.state);
        info!("Session stopped after {} cycles", snapshot.total_cycles);
        snapshot
    }

    pub fn phase(&self) -> Phase {
        get_phase(&self.phase)
    }

    /// Current aggregate, or `None` when idle. Still available while
    /// stopping.
    pub fn snapshot(&self) -> Option<AggregateSnapshot> {
        self.lock_session()
            .as_ref()
            .map(|active| read_snapshot(&active.state))
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, Option<ActiveSession>> {
        match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop_session();
    }
}

fn read_snapshot(state: &RwLock<AggregateState>) -> AggregateSnapshot {
    match state.read() {
        Ok(guard) => guard.snapshot(),
        Err(poisoned) => poisoned.into_inner().snapshot(),
    }
}
