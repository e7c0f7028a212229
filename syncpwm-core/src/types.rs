//! Core data types for synchronized PWM

/// Nominal TOP value of the waveform counter at startup
pub const NOMINAL_PERIOD: u16 = 254;

/// Largest timer prescaler (divider register holds `prescaler - 1` in 16 bits)
pub const MAX_PRESCALER: u32 = 65_536;

/// Synchronization role of a board
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    /// No role selected yet, all other state is inert
    Uninitialized,
    /// Emits the free-running 50% square wave other boards lock to
    Reference,
    /// Adjusts its own period to track the reference
    Follower,
}

impl Role {
    /// Returns true once a role has been chosen
    pub const fn is_assigned(&self) -> bool {
        !matches!(self, Role::Uninitialized)
    }

    /// Returns true if the periodic phase-lock handler runs in this role
    pub const fn runs_phase_lock(&self) -> bool {
        matches!(self, Role::Follower)
    }
}

/// Result of a role selection request that did not fail
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RoleOutcome {
    /// The call performed the Uninitialized -> role transition
    Entered(Role),
    /// A role was already chosen, nothing changed
    AlreadyAssigned(Role),
}

impl RoleOutcome {
    /// The role in effect after the call
    pub const fn role(&self) -> Role {
        match self {
            RoleOutcome::Entered(role) | RoleOutcome::AlreadyAssigned(role) => *role,
        }
    }

    /// Returns true if this call changed the role
    pub const fn entered(&self) -> bool {
        matches!(self, RoleOutcome::Entered(_))
    }
}

/// Digital input used to observe the reference signal
///
/// Bound once when the board becomes a follower and never rebound.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SyncBinding {
    /// Platform port identifier
    pub port: u8,
    /// Bit mask of the pin within the port input register
    pub mask: u8,
}

impl SyncBinding {
    pub const fn new(port: u8, mask: u8) -> Self {
        Self { port, mask }
    }

    /// Logic level of the bound pin given the raw port input value
    pub const fn level(&self, port_value: u8) -> bool {
        port_value & self.mask != 0
    }
}

/// Two-bit phase code built from two consecutive reads of the sync input
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhaseSample(u8);

impl PhaseSample {
    /// Input low on both reads
    pub const LOW: Self = Self(0b00);
    /// First read high, second read low
    pub const FALLING: Self = Self(0b01);
    /// First read low, second read high
    pub const RISING: Self = Self(0b10);
    /// Input high on both reads
    pub const HIGH: Self = Self(0b11);

    /// Compose `(second << 1) | first`
    pub const fn from_reads(first: bool, second: bool) -> Self {
        Self(((second as u8) << 1) | first as u8)
    }

    /// Build from a raw code, only the two low bits are kept
    pub const fn from_code(code: u8) -> Self {
        Self(code & 0b11)
    }

    pub const fn code(&self) -> u8 {
        self.0
    }

    /// Correction the phase-lock rule table assigns to this code
    pub const fn correction(&self) -> Correction {
        match self.0 {
            // late or anti-phase
            0b00 | 0b01 => Correction::Shorten,
            // early
            0b11 => Correction::Lengthen,
            _ => Correction::Hold,
        }
    }
}

/// Period adjustment chosen for one handler invocation
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Correction {
    /// Period register -1
    Shorten,
    /// Period register unchanged
    Hold,
    /// Period register +1
    Lengthen,
}

impl Correction {
    /// Signed tick delta of this correction
    pub const fn delta(&self) -> i32 {
        match self {
            Correction::Shorten => -1,
            Correction::Hold => 0,
            Correction::Lengthen => 1,
        }
    }
}

/// Width of the hardware period register
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerWidth {
    /// 8-bit TOP register (AVR Timer2, Timer4 in 8-bit mode)
    Bits8,
    /// 16-bit auto-reload register
    Bits16,
}

impl TimerWidth {
    /// Smallest period the phase-lock loop will write
    pub const fn min_period(&self) -> u16 {
        1
    }

    /// Largest value the period register can hold
    pub const fn max_period(&self) -> u16 {
        match self {
            TimerWidth::Bits8 => u8::MAX as u16,
            TimerWidth::Bits16 => u16::MAX,
        }
    }
}

/// How a correction is applied to the period register
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CorrectionMode {
    /// Each correction adds its delta to the current period, saturating at the register bounds
    Cumulative,
    /// Each correction writes `nominal + delta`, holding keeps the last written value
    ///
    /// Opt-in. TOP is not limited to a ±1 step per period here: a shorten
    /// right after a lengthen moves it from `nominal + 1` to `nominal - 1`.
    NominalOffset,
}

/// Synchronization configuration for one timer/output
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SyncConfig {
    /// TOP value programmed at startup
    pub nominal_period: u16,
    /// Pin reserved as the synchronized PWM output
    pub output_pin: u8,
    /// Period register width, defines saturation bounds
    pub timer_width: TimerWidth,
    /// Timer input clock in Hz
    pub clock_hz: u32,
    /// Timer prescaler
    pub prescaler: u32,
    /// Correction accumulation mode
    pub correction: CorrectionMode,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::atmega328p()
    }
}

impl SyncConfig {
    /// Create a new configuration with validation
    pub fn new(
        nominal_period: u16,
        output_pin: u8,
        timer_width: TimerWidth,
        clock_hz: u32,
        prescaler: u32,
    ) -> Result<Self, &'static str> {
        if nominal_period < 2 {
            return Err("Nominal period must be at least 2 ticks");
        }
        if nominal_period >= timer_width.max_period() {
            return Err("Nominal period must leave room for +1 correction");
        }
        if clock_hz == 0 {
            return Err("Timer clock must be non-zero");
        }
        if prescaler == 0 {
            return Err("Prescaler must be non-zero");
        }
        if prescaler > MAX_PRESCALER {
            return Err("Prescaler exceeds the 16-bit prescaler register");
        }
        if prescaler as u64 * (timer_width.max_period() as u64 + 1) > u32::MAX as u64 {
            return Err("Prescaler times period range must fit in 32 bits");
        }

        Ok(Self {
            nominal_period,
            output_pin,
            timer_width,
            clock_hz,
            prescaler,
            correction: CorrectionMode::Cumulative,
        })
    }

    /// ATmega168/328P: Timer2 fast PWM, output on pin 3, prescaler 64
    pub const fn atmega328p() -> Self {
        Self {
            nominal_period: NOMINAL_PERIOD,
            output_pin: 3,
            timer_width: TimerWidth::Bits8,
            clock_hz: 16_000_000,
            prescaler: 64,
            correction: CorrectionMode::Cumulative,
        }
    }

    /// ATmega32U4: Timer4 in 8-bit mode, output on pin 6 (OC4D), prescaler 64
    pub const fn atmega32u4() -> Self {
        Self {
            output_pin: 6,
            ..Self::atmega328p()
        }
    }

    /// CH32V003: TIM1 channel 1 on PD2, 24 MHz core clock
    pub const fn ch32v003() -> Self {
        Self {
            nominal_period: NOMINAL_PERIOD,
            output_pin: 26,
            timer_width: TimerWidth::Bits16,
            clock_hz: 24_000_000,
            prescaler: 96,
            correction: CorrectionMode::Cumulative,
        }
    }

    /// Same configuration with another correction mode
    pub const fn with_correction(mut self, correction: CorrectionMode) -> Self {
        self.correction = correction;
        self
    }

    /// Compare value producing a 50% duty cycle at nominal period
    pub const fn half_duty(&self) -> u16 {
        self.nominal_period / 2
    }

    /// Output frequency in Hz for a given period register value
    ///
    /// Returns 0 for a zero prescaler.
    pub fn output_frequency_hz(&self, period: u16) -> u32 {
        let ticks = self.prescaler as u64 * (period as u64 + 1);
        (self.clock_hz as u64).checked_div(ticks).unwrap_or(0) as u32
    }
}
