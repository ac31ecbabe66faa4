//! Rolling multi-horizon aggregation of cycle scalars.

use super::alarm::AlarmConfig;
use super::config::HorizonSpec;
use super::window::RingWindow;
use crate::capture::Sides;

/// Dominance of one side over the other across a horizon.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Ratio {
    /// One side summed to 0: not enough data yet
    Undefined,
    /// Equal sums, shown as 1 : 1
    Even,
    /// Bid is larger, by this factor
    Bid(f64),
    /// Ask is larger, by this factor
    Ask(f64),
}

impl Ratio {
    pub fn from_sums(sums: Sides<f64>) -> Self {
        let Sides { bid, ask } = sums;
        if bid == 0.0 || ask == 0.0 {
            Ratio::Undefined
        } else if bid == ask {
            Ratio::Even
        } else if bid > ask {
            Ratio::Bid(bid / ask)
        } else {
            Ratio::Ask(ask / bid)
        }
    }
}

/// Sums and ratio captured on a horizon's due cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HorizonReading {
    pub sums: Sides<f64>,
    pub ratio: Ratio,
    /// `total_cycles` at the time of the reading
    pub cycle: u64,
}

#[derive(Clone, Debug)]
pub struct HorizonState {
    pub seconds: u32,
    pub period: usize,
    pub windows: Sides<RingWindow>,
    pub alarm: AlarmConfig,
    /// Refreshed only on due cycles
    pub reading: Option<HorizonReading>,
    /// Due on the most recent cycle
    pub due: bool,
    /// Alarm condition on the most recent due cycle
    pub alarmed: bool,
}

impl HorizonState {
    fn new(spec: &HorizonSpec) -> Self {
        Self {
            seconds: spec.seconds,
            period: spec.period,
            windows: Sides::new(RingWindow::new(spec.period), RingWindow::new(spec.period)),
            alarm: spec.alarm,
            reading: None,
            due: false,
            alarmed: false,
        }
    }

    pub fn sums(&self) -> Sides<f64> {
        Sides::new(self.windows.bid.sum(), self.windows.ask.sum())
    }
}

/// Session-scoped aggregate, written only by the capture worker.
#[derive(Clone, Debug)]
pub struct AggregateState {
    pub latest: Sides<f64>,
    /// Cycle counter, wraps at the largest period
    pub counter: usize,
    pub total_cycles: u64,
    max_period: usize,
    pub horizons: Vec<HorizonState>,
    pub latest_alarm: AlarmConfig,
    pub latest_alarmed: bool,
    /// Neither region returned any fragment on the most recent cycle
    pub nothing_found: bool,
}

impl AggregateState {
    pub fn new(horizons: &[HorizonSpec], latest_alarm: AlarmConfig) -> Self {
        let max_period = horizons.iter().map(|h| h.period).max().unwrap_or(1).max(1);
        Self {
            latest: Sides::default(),
            counter: 0,
            total_cycles: 0,
            max_period,
            horizons: horizons.iter().map(HorizonState::new).collect(),
            latest_alarm,
            latest_alarmed: false,
            nothing_found: false,
        }
    }

    /// Applies one cycle's scalar pair.
    pub fn push(&mut self, scalars: Sides<f64>) {
        self.latest = scalars;
        self.counter += 1;
        self.total_cycles += 1;

        for horizon in &mut self.horizons {
            horizon.windows.bid.push(scalars.bid);
            horizon.windows.ask.push(scalars.ask);

            horizon.due = self.counter % horizon.period == 0;
            if horizon.due {
                let sums = horizon.sums();
                horizon.reading = Some(HorizonReading {
                    sums,
                    ratio: Ratio::from_sums(sums),
                    cycle: self.total_cycles,
                });
            }
        }

        if self.counter >= self.max_period {
            self.counter = 0;
        }
    }

    pub fn snapshot(&self) -> AggregateSnapshot {
        AggregateSnapshot {
            latest: self.latest,
            counter: self.counter,
            total_cycles: self.total_cycles,
            nothing_found: self.nothing_found,
            latest_alarmed: self.latest_alarmed,
            horizons: self
                .horizons
                .iter()
                .map(|h| HorizonSnapshot {
                    seconds: h.seconds,
                    period: h.period,
                    sums: h.sums(),
                    filled: h.windows.bid.len(),
                    reading: h.reading,
                    due: h.due,
                    alarmed: h.alarmed,
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HorizonSnapshot {
    pub seconds: u32,
    pub period: usize,
    /// Running sums, updated every cycle
    pub sums: Sides<f64>,
    /// Cycles currently held in the window
    pub filled: usize,
    pub reading: Option<HorizonReading>,
    pub due: bool,
    pub alarmed: bool,
}

/// Consistent copy of the aggregate handed to readers.
#[derive(Clone, Debug, PartialEq)]
pub struct AggregateSnapshot {
    pub latest: Sides<f64>,
    pub counter: usize,
    pub total_cycles: u64,
    pub nothing_found: bool,
    pub latest_alarmed: bool,
    pub horizons: Vec<HorizonSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(periods: &[usize]) -> Vec<HorizonSpec> {
        periods
            .iter()
            .map(|&p| HorizonSpec {
                seconds: p as u32,
                period: p,
                alarm: AlarmConfig::default(),
            })
            .collect()
    }

    #[test]
    fn test_ratio_cases() {
        assert_eq!(Ratio::from_sums(Sides::new(10.0, 0.0)), Ratio::Undefined);
        assert_eq!(Ratio::from_sums(Sides::new(0.0, 0.0)), Ratio::Undefined);
        assert_eq!(Ratio::from_sums(Sides::new(10.0, 5.0)), Ratio::Bid(2.0));
        assert_eq!(Ratio::from_sums(Sides::new(5.0, 20.0)), Ratio::Ask(4.0));
        assert_eq!(Ratio::from_sums(Sides::new(5.0, 5.0)), Ratio::Even);
    }

    #[test]
    fn test_ten_cycles_two_horizons() {
        let mut state = AggregateState::new(&specs(&[5, 10]), AlarmConfig::default());
        let mut due_5 = Vec::new();
        let mut due_10 = Vec::new();

        for cycle in 1..=10u64 {
            state.push(Sides::new(2.0, 1.0));
            if state.horizons[0].due {
                due_5.push(cycle);
            }
            if state.horizons[1].due {
                due_10.push(cycle);
            }
            if cycle == 5 {
                let reading = state.horizons[0].reading.unwrap();
                assert_eq!(reading.sums, Sides::new(10.0, 5.0));
                assert_eq!(reading.ratio, Ratio::Bid(2.0));
            }
        }

        assert_eq!(due_5, vec![5, 10]);
        assert_eq!(due_10, vec![10]);

        let h5 = state.horizons[0].reading.unwrap();
        assert_eq!(h5.sums, Sides::new(10.0, 5.0));
        assert_eq!(h5.ratio, Ratio::Bid(2.0));
        assert_eq!(h5.cycle, 10);

        let h10 = state.horizons[1].reading.unwrap();
        assert_eq!(h10.sums, Sides::new(20.0, 10.0));
        assert_eq!(h10.ratio, Ratio::Bid(2.0));

        assert_eq!(state.total_cycles, 10);
        assert_eq!(state.counter, 0);
    }

    #[test]
    fn test_reading_held_between_due_cycles() {
        let mut state = AggregateState::new(&specs(&[3]), AlarmConfig::default());
        for _ in 0..3 {
            state.push(Sides::new(1.0, 1.0));
        }
        let first = state.horizons[0].reading.unwrap();
        assert_eq!(first.ratio, Ratio::Even);

        state.push(Sides::new(9.0, 0.0));
        assert!(!state.horizons[0].due);
        assert_eq!(state.horizons[0].reading, Some(first));
        // Running sums move every cycle
        assert_eq!(state.horizons[0].sums(), Sides::new(11.0, 2.0));
    }

    #[test]
    fn test_counter_wraps_at_largest_period() {
        let mut state = AggregateState::new(&specs(&[2, 4]), AlarmConfig::default());
        let mut counters = Vec::new();
        for _ in 0..6 {
            state.push(Sides::new(0.0, 0.0));
            counters.push(state.counter);
        }
        assert_eq!(counters, vec![1, 2, 3, 0, 1, 2]);
        assert_eq!(state.total_cycles, 6);
    }

    #[test]
    fn test_zero_cycles_extend_window() {
        let mut state = AggregateState::new(&specs(&[2]), AlarmConfig::default());
        state.push(Sides::new(4.0, 2.0));
        state.push(Sides::new(0.0, 0.0));
        assert_eq!(state.horizons[0].reading.unwrap().sums, Sides::new(4.0, 2.0));
        state.push(Sides::new(0.0, 0.0));
        state.push(Sides::new(0.0, 0.0));
        let reading = state.horizons[0].reading.unwrap();
        assert_eq!(reading.sums, Sides::new(0.0, 0.0));
        assert_eq!(reading.ratio, Ratio::Undefined);
    }

    #[test]
    fn test_snapshot_copies_state() {
        let mut state = AggregateState::new(&specs(&[1, 3]), AlarmConfig::default());
        state.push(Sides::new(3.0, 1.5));
        state.nothing_found = true;
        let snap = state.snapshot();
        assert_eq!(snap.latest, Sides::new(3.0, 1.5));
        assert_eq!(snap.total_cycles, 1);
        assert!(snap.nothing_found);
        assert_eq!(snap.horizons.len(), 2);
        assert!(snap.horizons[0].due);
        assert!(!snap.horizons[1].due);
        assert_eq!(snap.horizons[1].filled, 1);
        assert_eq!(snap.horizons[1].reading, None);
    }
}
