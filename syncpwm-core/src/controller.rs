//! Phase-lock and duty controller implementations

use portable_atomic::{AtomicU32, Ordering};
use crate::types::{Correction, CorrectionMode, PhaseSample, SyncConfig};

/// Bang-bang phase-lock rule
///
/// Nudges the period by one tick per invocation toward the phase of the
/// observed reference edge. The result never leaves the period register bounds.
#[derive(Copy, Clone, Debug)]
pub struct PhaseLockController {
    nominal: u16,
    min_period: u16,
    max_period: u16,
    mode: CorrectionMode,
}

impl PhaseLockController {
    /// Create a controller for the given configuration
    pub const fn new(config: &SyncConfig) -> Self {
        Self {
            nominal: config.nominal_period,
            min_period: config.timer_width.min_period(),
            max_period: config.timer_width.max_period(),
            mode: config.correction,
        }
    }

    /// Period register value after applying `sample` to `current`
    pub fn next_period(&self, current: u16, sample: PhaseSample) -> u16 {
        let correction = sample.correction();
        let base = match (self.mode, correction) {
            (_, Correction::Hold) => return current,
            (CorrectionMode::Cumulative, _) => current,
            (CorrectionMode::NominalOffset, _) => self.nominal,
        };
        self.saturate(base as i32 + correction.delta())
    }

    /// Feed a whole sequence of samples starting from `start`
    pub fn run<I>(&self, start: u16, samples: I) -> u16
    where
        I: IntoIterator<Item = PhaseSample>,
    {
        samples
            .into_iter()
            .fold(start, |period, sample| self.next_period(period, sample))
    }

    /// Lower saturation bound
    pub const fn min_period(&self) -> u16 {
        self.min_period
    }

    /// Upper saturation bound
    pub const fn max_period(&self) -> u16 {
        self.max_period
    }

    fn saturate(&self, period: i32) -> u16 {
        period.clamp(self.min_period as i32, self.max_period as i32) as u16
    }
}

/// Clamp rule for runtime duty changes
#[derive(Copy, Clone, Debug)]
pub struct DutyController {
    max_duty: u16,
}

impl DutyController {
    pub const fn new(config: &SyncConfig) -> Self {
        Self {
            max_duty: config.nominal_period,
        }
    }

    /// Clamp a requested compare value to `[0, nominal period]`
    pub fn clamp(&self, value: u16) -> u16 {
        value.min(self.max_duty)
    }

    pub const fn max_duty(&self) -> u16 {
        self.max_duty
    }
}

/// Snapshot of the per-code sample counters
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhaseCounts {
    pub low: u32,
    pub falling: u32,
    pub rising: u32,
    pub high: u32,
    pub read_errors: u32,
}

impl PhaseCounts {
    /// Number of successfully sampled periods
    pub fn total(&self) -> u32 {
        self.low
            .wrapping_add(self.falling)
            .wrapping_add(self.rising)
            .wrapping_add(self.high)
    }
}

/// Atomic per-code sample counters
/// Safe for use in interrupt contexts
pub struct PhaseStats {
    low: AtomicU32,
    falling: AtomicU32,
    rising: AtomicU32,
    high: AtomicU32,
    read_errors: AtomicU32,
}

impl PhaseStats {
    pub const fn new() -> Self {
        Self {
            low: AtomicU32::new(0),
            falling: AtomicU32::new(0),
            rising: AtomicU32::new(0),
            high: AtomicU32::new(0),
            read_errors: AtomicU32::new(0),
        }
    }

    /// Count one observed sample (called from interrupt handler)
    pub fn record(&self, sample: PhaseSample) {
        let counter = match sample.code() {
            0b00 => &self.low,
            0b01 => &self.falling,
            0b10 => &self.rising,
            _ => &self.high,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one failed input read
    pub fn record_read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PhaseCounts {
        PhaseCounts {
            low: self.low.load(Ordering::Relaxed),
            falling: self.falling.load(Ordering::Relaxed),
            rising: self.rising.load(Ordering::Relaxed),
            high: self.high.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
        }
    }
}

impl Default for PhaseStats {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for PhaseStats {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("PhaseStats").field(&self.snapshot()).finish()
    }
}
