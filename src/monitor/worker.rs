//! Capture worker: the single producer of cycle scalars.
//!
//! One cycle captures and reads both regions outside any lock, then takes the
//! aggregate write lock just long enough to push the pair and evaluate alarms.
//! Cycles never overlap, so aggregate updates land in capture order.
//!
//! Stop is checked between the two region reads, so at most one capture and
//! recognition call runs after a stop request.

use std::cell::Cell;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use log::{debug, info, warn};

use super::aggregate::AggregateState;
use super::alarm::{self, AlarmPlayer};
use super::config::SessionPlan;
use crate::capture::{CaptureRegion, RegionCapturer, Side, Sides};
use crate::ocr::{ReadSettings, TextRecognizer, read_region};

/// Session lifecycle: `Idle -> Armed -> Running -> Stopping -> Idle`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    /// No session
    #[default]
    Idle,
    /// Session started, first cycle not fired yet
    Armed,
    Running,
    /// Stop requested, draining the in-flight cycle
    Stopping,
}

impl Phase {
    pub fn is_active(&self) -> bool {
        !matches!(self, Phase::Idle)
    }
}

/// Creates a connected stop signal / cancel token pair.
pub fn cancel_pair() -> (StopSignal, CancelToken) {
    let (tx, rx) = mpsc::channel();
    (
        StopSignal { tx },
        CancelToken {
            rx,
            stopped: Cell::new(false),
        },
    )
}

/// Held by the session controller.
pub struct StopSignal {
    tx: Sender<()>,
}

impl StopSignal {
    pub fn stop(&self) {
        // The worker may already be gone; that is a stop too.
        let _ = self.tx.send(());
    }
}

/// Held by the worker. A message or a dropped `StopSignal` both mean stop.
pub struct CancelToken {
    rx: Receiver<()>,
    stopped: Cell<bool>,
}

impl CancelToken {
    /// Waits up to `timeout`. Returns true if stop was requested.
    pub fn wait(&self, timeout: Duration) -> bool {
        if self.stopped.get() {
            return true;
        }
        let stop = match self.rx.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => false,
        };
        self.stopped.set(stop);
        stop
    }

    /// Non-blocking check.
    pub fn is_cancelled(&self) -> bool {
        if self.stopped.get() {
            return true;
        }
        let stop = match self.rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => true,
            Err(TryRecvError::Empty) => false,
        };
        self.stopped.set(stop);
        stop
    }
}

/// Result of one capture cycle, before it is published.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CycleResult {
    pub scalars: Sides<f64>,
    pub nothing_found: bool,
}

pub struct CaptureWorker {
    pub capturer: Arc<dyn RegionCapturer>,
    pub recognizer: Arc<dyn TextRecognizer>,
    pub player: Arc<dyn AlarmPlayer>,
    pub regions: Sides<CaptureRegion>,
    pub plan: SessionPlan,
    pub state: Arc<RwLock<AggregateState>>,
    pub phase: Arc<Mutex<Phase>>,
}

impl CaptureWorker {
    /// Runs cycles until `token` fires. A cycle interrupted by a stop is
    /// abandoned and never published.
    pub fn run(self, token: CancelToken) {
        info!(
            "Capture worker started: interval {:?}, {} horizons",
            self.plan.interval,
            self.plan.horizons.len()
        );

        let mut first = true;
        loop {
            if token.wait(self.plan.interval) {
                break;
            }
            if first {
                advance_phase(&self.phase, Phase::Armed, Phase::Running);
                first = false;
            }

            let Some(result) = self.run_cycle(&token) else {
                debug!("Stop requested during cycle, discarding result");
                break;
            };
            self.publish(result);
        }

        info!("Capture worker finished");
    }

    /// Reads both regions. A failed region scores 0. Returns `None` if
    /// `token` fired at any point during the cycle.
    pub fn run_cycle(&self, token: &CancelToken) -> Option<CycleResult> {
        let read = |side: Side| {
            read_side(
                &*self.capturer,
                &*self.recognizer,
                self.regions.get(side),
                &self.plan.read,
            )
        };
        let bid = read(Side::Bid);
        if token.is_cancelled() {
            return None;
        }
        let ask = read(Side::Ask);
        if token.is_cancelled() {
            return None;
        }

        let nothing_found = bid.1 == 0 && ask.1 == 0;
        if nothing_found {
            warn!("Nothing found");
        }

        Some(CycleResult {
            scalars: Sides::new(bid.0, ask.0),
            nothing_found,
        })
    }

    /// Pushes a cycle into the aggregate and sounds the alarm if due.
    pub fn publish(&self, result: CycleResult) {
        let fire = {
            let mut state = match self.state.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            state.push(result.scalars);
            state.nothing_found = result.nothing_found;
            alarm::evaluate_alarms(&mut state)
        };

        debug!(
            "Cycle: bid {} ask {}",
            result.scalars.bid, result.scalars.ask
        );

        if fire {
            alarm::trigger(&*self.player);
        }
    }
}

/// `(value, fragment count)` for one region, `(0, 0)` on error.
fn read_side(
    capturer: &dyn RegionCapturer,
    recognizer: &dyn TextRecognizer,
    region: &CaptureRegion,
    settings: &ReadSettings,
) -> (f64, usize) {
    match read_region(capturer, recognizer, region, settings) {
        Ok(reading) => (reading.value, reading.fragments),
        Err(e) => {
            warn!("{} region failed: {}", region.side, e);
            (0.0, 0)
        }
    }
}

pub fn set_phase(phase: &Mutex<Phase>, next: Phase) {
    let mut guard = match phase.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if *guard != next {
        debug!("Phase {:?} -> {:?}", *guard, next);
        *guard = next;
    }
}

/// Moves to `next` only from `from`, so a late worker never overwrites
/// `Stopping`.
fn advance_phase(phase: &Mutex<Phase>, from: Phase, next: Phase) {
    let mut guard = match phase.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if *guard == from {
        debug!("Phase {:?} -> {:?}", from, next);
        *guard = next;
    }
}

pub fn get_phase(phase: &Mutex<Phase>) -> Phase {
    match phase.lock() {
        Ok(guard) => *guard,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::thread;
    use std::time::Instant;

    use image::{GrayImage, Rgb, RgbImage};

    use crate::capture::Rect;
    use crate::error::{CaptureError, RecognitionError};
    use crate::monitor::alarm::AlarmConfig;
    use crate::monitor::config::SessionConfig;
    use crate::ocr::CharsetProfile;
    use crate::ocr::engine::TextFragment;

    /// Bid region is 4 px wide, ask region 5 px, so the recognizer can tell
    /// them apart by the upscaled width.
    pub fn test_regions() -> Sides<Rect> {
        Sides::new(Rect::new(0, 0, 4, 3), Rect::new(10, 0, 15, 3))
    }

    pub const BID_WIDTH: u32 = 16;

    /// White image of the requested size, after an optional delay.
    #[derive(Default)]
    pub struct CountingCapturer {
        pub calls: AtomicUsize,
        pub delay: Duration,
    }

    impl CountingCapturer {
        pub fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::default()
            }
        }
    }

    impl RegionCapturer for CountingCapturer {
        fn capture(&self, rect: &Rect) -> Result<RgbImage, CaptureError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            rect.validate()?;
            Ok(RgbImage::from_pixel(rect.width(), rect.height(), Rgb([255, 255, 255])))
        }
    }

    /// Returns one fragment per side; fails on the bid side if asked to.
    pub struct SideRecognizer {
        pub bid: Option<&'static str>,
        pub ask: Option<&'static str>,
    }

    impl TextRecognizer for SideRecognizer {
        fn recognize(
            &self,
            img: &GrayImage,
            _profile: &CharsetProfile,
        ) -> Result<Vec<TextFragment>, RecognitionError> {
            let text = if img.width() == BID_WIDTH { self.bid } else { self.ask };
            let Some(text) = text else {
                return Err(RecognitionError::EngineFailed("simulated".to_string()));
            };
            Ok(vec![TextFragment {
                x1: 0,
                y1: 0,
                x2: 10,
                y2: 10,
                text: text.to_string(),
                confidence: 95.0,
            }])
        }
    }

    #[derive(Default)]
    pub struct SilentPlayer {
        pub plays: AtomicU32,
    }

    impl AlarmPlayer for SilentPlayer {
        fn play_alarm(&self) {
            self.plays.fetch_add(1, Ordering::SeqCst);
        }

        fn is_busy(&self) -> bool {
            false
        }
    }

    fn worker(recognizer: SideRecognizer, config: SessionConfig) -> (CaptureWorker, Arc<SilentPlayer>) {
        worker_with(Arc::new(CountingCapturer::default()), recognizer, config)
    }

    fn worker_with(
        capturer: Arc<CountingCapturer>,
        recognizer: SideRecognizer,
        config: SessionConfig,
    ) -> (CaptureWorker, Arc<SilentPlayer>) {
        let plan = config.validate().unwrap();
        let player = Arc::new(SilentPlayer::default());
        let state = Arc::new(RwLock::new(AggregateState::new(&plan.horizons, plan.latest_alarm)));
        let worker = CaptureWorker {
            capturer,
            recognizer: Arc::new(recognizer),
            player: player.clone(),
            regions: CaptureRegion::pair(test_regions()),
            plan,
            state,
            phase: Arc::new(Mutex::new(Phase::Armed)),
        };
        (worker, player)
    }

    fn fast_config() -> SessionConfig {
        SessionConfig {
            cycle_interval_secs: 0.01,
            time_periods: vec![1],
            ..SessionConfig::default()
        }
    }

    #[test]
    fn test_cancel_token_wait() {
        let (signal, token) = cancel_pair();
        assert!(!token.wait(Duration::from_millis(1)));
        assert!(!token.is_cancelled());
        signal.stop();
        assert!(token.wait(Duration::from_secs(5)));
        // Remembered
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancel_token_dropped_signal_stops() {
        let (signal, token) = cancel_pair();
        drop(signal);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_failed_region_scores_zero() {
        let (worker, _) = worker(
            SideRecognizer {
                bid: None,
                ask: Some("12"),
            },
            fast_config(),
        );
        let (_signal, token) = cancel_pair();
        let result = worker.run_cycle(&token).unwrap();
        assert_eq!(result.scalars, Sides::new(0.0, 12.0));
        assert!(!result.nothing_found);
    }

    #[test]
    fn test_both_failed_is_nothing_found() {
        let (worker, _) = worker(SideRecognizer { bid: None, ask: None }, fast_config());
        let (_signal, token) = cancel_pair();
        let result = worker.run_cycle(&token).unwrap();
        assert_eq!(result.scalars, Sides::new(0.0, 0.0));
        assert!(result.nothing_found);

        worker.publish(result);
        let state = worker.state.read().unwrap();
        assert_eq!(state.total_cycles, 1);
        assert!(state.nothing_found);
    }

    #[test]
    fn test_publish_triggers_alarm() {
        let mut config = fast_config();
        config.alarms.insert(
            0,
            AlarmConfig {
                active: true,
                bid_threshold: 1_000.0,
                ask_threshold: 10.0,
            },
        );
        let (worker, player) = worker(
            SideRecognizer {
                bid: Some("5"),
                ask: Some("1,250"),
            },
            config,
        );
        let (_signal, token) = cancel_pair();
        let result = worker.run_cycle(&token).unwrap();
        worker.publish(result);
        assert_eq!(player.plays.load(Ordering::SeqCst), 1);
        assert!(worker.state.read().unwrap().latest_alarmed);
    }

    #[test]
    fn test_stop_before_first_cycle() {
        let (worker, _) = worker(
            SideRecognizer {
                bid: Some("1"),
                ask: Some("1"),
            },
            SessionConfig {
                cycle_interval_secs: 30.0,
                ..fast_config()
            },
        );
        let state = worker.state.clone();
        let phase = worker.phase.clone();
        let (signal, token) = cancel_pair();
        let handle = thread::spawn(move || worker.run(token));
        signal.stop();
        handle.join().unwrap();
        assert_eq!(state.read().unwrap().total_cycles, 0);
        assert_eq!(get_phase(&phase), Phase::Armed);
    }

    #[test]
    fn test_cancelled_cycle_skips_second_region() {
        let capturer = Arc::new(CountingCapturer::default());
        let (worker, _) = worker_with(
            capturer.clone(),
            SideRecognizer {
                bid: Some("1"),
                ask: Some("1"),
            },
            fast_config(),
        );
        let (signal, token) = cancel_pair();
        signal.stop();
        assert!(worker.run_cycle(&token).is_none());
        assert_eq!(capturer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_mid_cycle_discards_result() {
        let delay = Duration::from_millis(300);
        let capturer = Arc::new(CountingCapturer::slow(delay));
        let (worker, _) = worker_with(
            capturer.clone(),
            SideRecognizer {
                bid: Some("4"),
                ask: Some("2"),
            },
            fast_config(),
        );
        let state = worker.state.clone();
        let (signal, token) = cancel_pair();
        let handle = thread::spawn(move || worker.run(token));

        // Wait until the bid capture is in flight
        for _ in 0..2000 {
            if capturer.calls.load(Ordering::SeqCst) >= 1 {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(capturer.calls.load(Ordering::SeqCst), 1);

        let stopped_at = Instant::now();
        signal.stop();
        handle.join().unwrap();
        let drained = stopped_at.elapsed();

        assert!(drained < 2 * delay, "worker took {:?} to stop", drained);
        assert_eq!(capturer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.read().unwrap().total_cycles, 0);
    }

    #[test]
    fn test_run_publishes_cycles() {
        let (worker, _) = worker(
            SideRecognizer {
                bid: Some("2"),
                ask: Some("1"),
            },
            fast_config(),
        );
        let state = worker.state.clone();
        let phase = worker.phase.clone();
        let (signal, token) = cancel_pair();
        let handle = thread::spawn(move || worker.run(token));

        for _ in 0..500 {
            if state.read().unwrap().total_cycles >= 3 {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(get_phase(&phase), Phase::Running);
        signal.stop();
        handle.join().unwrap();

        let state = state.read().unwrap();
        assert!(state.total_cycles >= 3);
        assert_eq!(state.latest, Sides::new(2.0, 1.0));
        // 1 s horizon at 10 ms is a 100-cycle window, still filling
        let n = state.total_cycles as f64;
        assert_eq!(state.horizons[0].sums(), Sides::new(2.0 * n, n));
    }
}
