//! Alarm evaluation and playback.
//!
//! The latest slot is checked every cycle, a horizon only on cycles where it
//! is due. Playback is fire-and-forget: a trigger that arrives while the
//! player is still busy is dropped, never queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::aggregate::AggregateState;
use crate::capture::Sides;

/// Thresholds for one horizon, or for the latest slot (key `0` in config).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AlarmConfig {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub bid_threshold: f64,
    #[serde(default)]
    pub ask_threshold: f64,
}

impl AlarmConfig {
    /// True when active and either side reaches its threshold (inclusive).
    pub fn should_sound(&self, values: Sides<f64>) -> bool {
        self.active && (values.bid >= self.bid_threshold || values.ask >= self.ask_threshold)
    }
}

/// Re-evaluates every alarm slot after a push and records the flags in
/// `state`. Returns true if any slot fired this cycle.
pub fn evaluate_alarms(state: &mut AggregateState) -> bool {
    let latest = state.latest_alarm.should_sound(state.latest);
    state.latest_alarmed = latest;
    let mut fired = latest;

    for horizon in state.horizons.iter_mut().filter(|h| h.due) {
        let Some(reading) = &horizon.reading else {
            continue;
        };
        horizon.alarmed = horizon.alarm.should_sound(reading.sums);
        if horizon.alarmed {
            debug!(
                "Alarm condition on {}s horizon: bid {} ask {}",
                horizon.seconds, reading.sums.bid, reading.sums.ask
            );
        }
        fired |= horizon.alarmed;
    }

    fired
}

/// Alarm-playback collaborator.
pub trait AlarmPlayer: Send + Sync {
    /// Starts playback and returns immediately.
    fn play_alarm(&self);
    fn is_busy(&self) -> bool;
}

/// Plays unless the player is busy. Returns whether playback was started.
pub fn trigger(player: &dyn AlarmPlayer) -> bool {
    if player.is_busy() {
        debug!("Alarm dropped, player busy");
        return false;
    }
    info!("Alarm!");
    player.play_alarm();
    true
}

/// Short burst of system beeps on a background thread.
pub struct BeepAlarm {
    beeps: u32,
    gap: Duration,
    busy: Arc<AtomicBool>,
}

impl BeepAlarm {
    pub fn new(beeps: u32, gap: Duration) -> Self {
        Self {
            beeps: beeps.max(1),
            gap,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl AlarmPlayer for BeepAlarm {
    fn play_alarm(&self) {
        if self.busy.swap(true, Ordering::SeqCst) {
            return;
        }

        let busy = Arc::clone(&self.busy);
        let beeps = self.beeps;
        let gap = self.gap;
        thread::spawn(move || {
            for i in 0..beeps {
                if i > 0 {
                    thread::sleep(gap);
                }
                beep();
            }
            busy.store(false, Ordering::SeqCst);
        });
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

#[cfg(windows)]
fn beep() {
    use windows::Win32::System::Diagnostics::Debug::MessageBeep;
    use windows::Win32::UI::WindowsAndMessaging::MB_ICONEXCLAMATION;

    unsafe {
        let _ = MessageBeep(MB_ICONEXCLAMATION);
    }
}

#[cfg(not(windows))]
fn beep() {
    use std::io::Write;

    // Terminal bell
    let mut out = std::io::stdout();
    let _ = out.write_all(b"\x07");
    let _ = out.flush();
}
