//! Test utilities for synchronized PWM

#[cfg(feature = "test-utils")]
pub mod phase_sequences {
    //! Phase sample sequence builders

    use crate::types::PhaseSample;
    use std::vec::Vec;

    /// Parse a sequence written as two-character codes, e.g. `"11 11 00"`
    ///
    /// Returns `None` on any token that is not a two-bit code.
    pub fn parse(codes: &str) -> Option<Vec<PhaseSample>> {
        codes
            .split_whitespace()
            .map(|token| match token {
                "00" => Some(PhaseSample::LOW),
                "01" => Some(PhaseSample::FALLING),
                "10" => Some(PhaseSample::RISING),
                "11" => Some(PhaseSample::HIGH),
                _ => None,
            })
            .collect()
    }

    /// Period expected after applying `samples` without saturation
    pub fn unclamped_period(start: u16, samples: &[PhaseSample]) -> i64 {
        samples
            .iter()
            .fold(start as i64, |period, sample| period + sample.correction().delta() as i64)
    }
}

#[cfg(feature = "test-utils")]
pub mod two_board {
    //! Reference and follower boards sharing one simulated timeline

    use crate::fsm::SyncPwm;
    use crate::hal::mock::{MockPinMap, MockWaveform};
    use crate::types::{PhaseSample, SyncConfig};
    use std::vec::Vec;

    /// Free-running reference square wave in timer ticks
    #[derive(Copy, Clone, Debug)]
    pub struct ReferenceWave {
        /// Ticks per cycle (TOP + 1)
        pub cycle: u64,
        /// Ticks the output stays high at the start of each cycle (compare + 1)
        pub high: u64,
    }

    impl ReferenceWave {
        /// Wave emitted by a reference board using `config`
        pub fn from_config(config: &SyncConfig) -> Self {
            Self {
                cycle: config.nominal_period as u64 + 1,
                high: config.half_duty() as u64 + 1,
            }
        }

        /// Position of `t` inside the reference cycle
        pub fn phase_at(&self, t: u64) -> u64 {
            t % self.cycle
        }

        pub fn level_at(&self, t: u64) -> bool {
            self.phase_at(t) < self.high
        }
    }

    /// Follower board driven by a reference wave
    pub struct FollowerSim {
        pub board: SyncPwm<MockWaveform, MockPinMap>,
        pub reference: ReferenceWave,
        /// Time of the last follower period end
        pub now: u64,
        /// Reference phase observed at every follower period end
        pub phases: Vec<u64>,
    }

    impl FollowerSim {
        /// Follower on `sync_pin`, starting `start_offset` ticks into the reference cycle
        pub fn new(config: SyncConfig, sync_pin: u8, start_offset: u64) -> Option<Self> {
            let mut board = SyncPwm::new(config, MockWaveform::new(), MockPinMap::new());
            board.become_follower(sync_pin).ok()?;
            Some(Self {
                board,
                reference: ReferenceWave::from_config(&config),
                now: start_offset,
                phases: Vec::new(),
            })
        }

        /// Advance one follower period and run the handler at its end
        pub fn step(&mut self) -> Option<PhaseSample> {
            self.now += self.board.period() as u64 + 1;
            let level = self.reference.level_at(self.now);
            self.phases.push(self.reference.phase_at(self.now));
            self.board
                .pin_map()
                .push_sample(PhaseSample::from_reads(level, level));
            self.board.on_period_elapsed()
        }

        /// Run `periods` follower periods
        pub fn run(&mut self, periods: usize) {
            for _ in 0..periods {
                self.step();
            }
        }

        /// Last observed reference phase
        pub fn last_phase(&self) -> Option<u64> {
            self.phases.last().copied()
        }
    }
}
