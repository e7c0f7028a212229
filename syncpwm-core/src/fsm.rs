//! Role state machine and phase-lock handler for one synchronized output

use crate::controller::{DutyController, PhaseCounts, PhaseLockController, PhaseStats};
use crate::diagnostics::DiagnosticReport;
use crate::hal::{HalError, PinMap, WaveformGenerator};
use crate::types::{PhaseSample, Role, RoleOutcome, SyncBinding, SyncConfig};

/// Role selection failures
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncError {
    /// The requested sync input is the PWM output pin
    ReservedPin,
    /// The requested sync input does not resolve to a port
    UnresolvedPin,
    /// Configuring the sync input failed
    InputConfig(HalError),
    /// A synchronized output is already installed in the shared cell
    AlreadyInstalled,
    /// Nothing is installed in the shared cell yet
    NotInstalled,
}

impl From<HalError> for SyncError {
    fn from(error: HalError) -> Self {
        SyncError::InputConfig(error)
    }
}

#[cfg(feature = "std")]
impl core::fmt::Display for SyncError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SyncError::ReservedPin => write!(f, "Pin is reserved for the PWM output"),
            SyncError::UnresolvedPin => write!(f, "Pin does not resolve to a port"),
            SyncError::InputConfig(e) => write!(f, "Sync input configuration failed: {}", e),
            SyncError::AlreadyInstalled => write!(f, "Synchronized output already installed"),
            SyncError::NotInstalled => write!(f, "No synchronized output installed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SyncError {}

/// One synchronized PWM output
///
/// Owns the waveform generator and the pin map. The role is chosen once and
/// never changes afterwards; until then every other operation is inert.
pub struct SyncPwm<G, M> {
    role: Role,
    config: SyncConfig,
    binding: Option<SyncBinding>,
    generator: G,
    pins: M,
    phase_lock: PhaseLockController,
    duty: DutyController,
    stats: PhaseStats,
}

impl<G, M> SyncPwm<G, M>
where
    G: WaveformGenerator,
    M: PinMap,
    SyncError: From<M::Error>,
{
    /// Create an uninitialized output with given configuration
    pub fn new(config: SyncConfig, generator: G, pins: M) -> Self {
        Self {
            role: Role::Uninitialized,
            config,
            binding: None,
            generator,
            pins,
            phase_lock: PhaseLockController::new(&config),
            duty: DutyController::new(&config),
            stats: PhaseStats::new(),
        }
    }

    /// Current role
    pub fn role(&self) -> Role {
        self.role
    }

    /// Emit the free-running 50% reference square wave
    pub fn become_reference(&mut self) -> RoleOutcome {
        if self.role.is_assigned() {
            return RoleOutcome::AlreadyAssigned(self.role);
        }

        self.role = Role::Reference;
        self.generator
            .configure(self.config.nominal_period, self.config.half_duty());

        #[cfg(feature = "defmt")]
        defmt::info!("Reference clock started, period {}", self.config.nominal_period);

        RoleOutcome::Entered(Role::Reference)
    }

    /// Lock the output period to the reference observed on `input_pin`
    ///
    /// On error the role stays `Uninitialized`.
    pub fn become_follower(&mut self, input_pin: u8) -> Result<RoleOutcome, SyncError> {
        if self.role.is_assigned() {
            return Ok(RoleOutcome::AlreadyAssigned(self.role));
        }
        if input_pin == self.config.output_pin {
            #[cfg(feature = "defmt")]
            defmt::warn!("Pin {} is the PWM output, not a sync input", input_pin);
            return Err(SyncError::ReservedPin);
        }
        let binding = match self.pins.resolve(input_pin) {
            Some(binding) => binding,
            None => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Pin {} does not resolve to a port", input_pin);
                return Err(SyncError::UnresolvedPin);
            }
        };
        self.pins.configure_input(input_pin)?;

        // Bound before the interrupt is armed, read-only afterwards
        self.binding = Some(binding);
        self.role = Role::Follower;
        self.generator.configure(self.config.nominal_period, 0);
        self.generator.arm_period_interrupt();

        #[cfg(feature = "defmt")]
        defmt::info!("Follower locked to pin {} ({})", input_pin, binding);

        Ok(RoleOutcome::Entered(Role::Follower))
    }

    /// Change the output duty, effective only in follower role
    ///
    /// The value is clamped to the nominal period, not to the current TOP.
    /// After the phase lock has shortened TOP below the compare value the
    /// output stays high for the whole period until TOP grows back.
    /// Returns the compare value written, `None` when ignored.
    pub fn set_duty_cycle(&mut self, value: u16) -> Option<u16> {
        if self.role != Role::Follower {
            return None;
        }
        let duty = self.duty.clamp(value);
        self.generator.set_duty(duty);
        Some(duty)
    }

    /// Periodic handler body, called once per waveform period
    ///
    /// Samples the sync input twice, applies one correction, writes TOP back
    /// and acknowledges the interrupt. Returns the sample taken, if any.
    pub fn on_period_elapsed(&mut self) -> Option<PhaseSample> {
        let sample = match self.binding {
            Some(binding) if self.role.runs_phase_lock() => self.sample_phase(binding),
            _ => None,
        };

        if let Some(sample) = sample {
            self.stats.record(sample);
            let current = self.generator.period();
            let next = self.phase_lock.next_period(current, sample);
            if next != current {
                self.generator.set_period(next);
            }
        }

        self.generator.acknowledge_period_interrupt();
        sample
    }

    fn sample_phase(&mut self, binding: SyncBinding) -> Option<PhaseSample> {
        let first = self.pins.read_level(binding);
        let second = self.pins.read_level(binding);
        match (first, second) {
            (Ok(first), Ok(second)) => Some(PhaseSample::from_reads(first, second)),
            _ => {
                self.stats.record_read_error();
                None
            }
        }
    }

    /// Sync input binding, `None` unless in follower role
    pub fn sync_binding(&self) -> Option<SyncBinding> {
        self.binding
    }

    /// Per-code sample counters
    pub fn phase_counts(&self) -> PhaseCounts {
        self.stats.snapshot()
    }

    /// Binding, input register address and counters for an external log sink
    pub fn diagnostics(&self) -> Option<DiagnosticReport> {
        self.binding.map(|binding| DiagnosticReport {
            binding,
            input_register: self.pins.input_register(binding.port),
            counts: self.stats.snapshot(),
        })
    }

    /// Current period register value
    pub fn period(&self) -> u16 {
        self.generator.period()
    }

    /// Current duty register value
    pub fn duty(&self) -> u16 {
        self.generator.duty()
    }

    /// Get current configuration
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Access to the waveform generator
    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Access to the pin map
    pub fn pin_map(&mut self) -> &mut M {
        &mut self.pins
    }
}
