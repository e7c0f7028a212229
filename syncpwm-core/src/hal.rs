//! Hardware Abstraction Layer for synchronized PWM

use embedded_hal::digital::InputPin;
use crate::types::SyncBinding;

/// Error types for HAL operations
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// GPIO operation failed
    GpioError,
    /// Invalid configuration
    InvalidConfig,
}

#[cfg(feature = "std")]
impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HalError::GpioError => write!(f, "GPIO operation failed"),
            HalError::InvalidConfig => write!(f, "Invalid configuration"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

/// Hardware counter producing a periodic pulse output
///
/// Register writes must be single indivisible stores; the phase-lock handler
/// may preempt any foreground caller between two calls.
pub trait WaveformGenerator {
    /// Program periodic-pulse mode with TOP = `period`, compare = `duty`, and enable the output
    fn configure(&mut self, period: u16, duty: u16);

    /// Current TOP value
    fn period(&self) -> u16;

    /// Write the TOP register
    fn set_period(&mut self, period: u16);

    /// Current compare value
    fn duty(&self) -> u16;

    /// Write the compare register
    fn set_duty(&mut self, duty: u16);

    /// Enable the once-per-period interrupt
    fn arm_period_interrupt(&mut self);

    /// Clear the triggering condition on handler exit
    ///
    /// Hardware that clears the flag automatically keeps the default.
    fn acknowledge_period_interrupt(&mut self) {}
}

/// Pin-to-port resolution and raw port access
pub trait PinMap {
    type Error: From<HalError>;

    /// Resolve a board pin number to its port and bit mask, `None` if it is not a pin
    fn resolve(&self, pin: u8) -> Option<SyncBinding>;

    /// Configure a pin as a digital input
    fn configure_input(&mut self, pin: u8) -> Result<(), Self::Error>;

    /// Read the raw input register of a port
    fn read_port(&mut self, port: u8) -> Result<u8, Self::Error>;

    /// Address of the port input register, for diagnostics
    fn input_register(&self, _port: u8) -> Option<u32> {
        None
    }

    /// Read the logic level of a bound pin
    fn read_level(&mut self, binding: SyncBinding) -> Result<bool, Self::Error> {
        let value = self.read_port(binding.port)?;
        Ok(binding.level(value))
    }
}

/// Single-pin map backed by an embedded-hal input pin
///
/// Only `pin_number` resolves; it is reported as bit 0 of port 0.
pub struct EmbeddedHalPinMap<P> {
    pin: P,
    pin_number: u8,
    configured: bool,
}

impl<P> EmbeddedHalPinMap<P>
where
    P: InputPin,
{
    /// Port identifier reported for the wrapped pin
    pub const PORT: u8 = 0;
    /// Bit mask reported for the wrapped pin
    pub const MASK: u8 = 0b0000_0001;

    pub fn new(pin: P, pin_number: u8) -> Self {
        Self {
            pin,
            pin_number,
            configured: false,
        }
    }

    /// Returns true once the pin was configured as the sync input
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Release the wrapped pin
    pub fn release(self) -> P {
        self.pin
    }
}

impl<P> PinMap for EmbeddedHalPinMap<P>
where
    P: InputPin,
{
    type Error = HalError;

    fn resolve(&self, pin: u8) -> Option<SyncBinding> {
        (pin == self.pin_number).then_some(SyncBinding::new(Self::PORT, Self::MASK))
    }

    fn configure_input(&mut self, pin: u8) -> Result<(), Self::Error> {
        if pin != self.pin_number {
            return Err(HalError::InvalidConfig);
        }
        // Typed embedded-hal pins are already in input mode
        self.configured = true;
        Ok(())
    }

    fn read_port(&mut self, port: u8) -> Result<u8, Self::Error> {
        if port != Self::PORT {
            return Err(HalError::InvalidConfig);
        }
        let high = self.pin.is_high().map_err(|_| HalError::GpioError)?;
        Ok(if high { Self::MASK } else { 0 })
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! Mock implementations for testing

    use super::*;
    use crate::types::PhaseSample;
    use heapless::Deque;

    /// Waveform generator that records register writes
    #[derive(Debug, Default, Clone)]
    pub struct MockWaveform {
        period: u16,
        duty: u16,
        configure_calls: u32,
        period_writes: u32,
        interrupt_armed: bool,
        acknowledged: u32,
    }

    impl MockWaveform {
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of `configure` calls
        pub fn configure_calls(&self) -> u32 {
            self.configure_calls
        }

        /// Number of TOP writes after configuration
        pub fn period_writes(&self) -> u32 {
            self.period_writes
        }

        pub fn is_interrupt_armed(&self) -> bool {
            self.interrupt_armed
        }

        /// Number of handler acknowledgements
        pub fn acknowledged(&self) -> u32 {
            self.acknowledged
        }
    }

    impl WaveformGenerator for MockWaveform {
        fn configure(&mut self, period: u16, duty: u16) {
            self.period = period;
            self.duty = duty;
            self.configure_calls += 1;
        }

        fn period(&self) -> u16 {
            self.period
        }

        fn set_period(&mut self, period: u16) {
            self.period = period;
            self.period_writes += 1;
        }

        fn duty(&self) -> u16 {
            self.duty
        }

        fn set_duty(&mut self, duty: u16) {
            self.duty = duty;
        }

        fn arm_period_interrupt(&mut self) {
            self.interrupt_armed = true;
        }

        fn acknowledge_period_interrupt(&mut self) {
            self.acknowledged += 1;
        }
    }

    /// Arduino-style pin map: pins 0-7 on port D, 8-13 on port B, 14-19 on port C
    #[derive(Debug, Clone)]
    pub struct MockPinMap {
        ports: [u8; 3],
        scripted: Deque<bool, 256>,
        configured: Option<u8>,
        fail_reads: bool,
    }

    impl Default for MockPinMap {
        fn default() -> Self {
            Self {
                ports: [0; 3],
                scripted: Deque::new(),
                configured: None,
                fail_reads: false,
            }
        }
    }

    impl MockPinMap {
        pub const PORT_B: u8 = 2;
        pub const PORT_C: u8 = 3;
        pub const PORT_D: u8 = 4;

        pub fn new() -> Self {
            Self::default()
        }

        /// Drive the static level of a pin
        pub fn set_level(&mut self, pin: u8, high: bool) {
            if let Some(binding) = self.resolve(pin) {
                let slot = &mut self.ports[Self::slot(binding.port)];
                if high {
                    *slot |= binding.mask;
                } else {
                    *slot &= !binding.mask;
                }
            }
        }

        /// Queue the two reads that make up one phase sample
        ///
        /// Scripted reads apply to whichever port is read next, ahead of the static levels.
        pub fn push_sample(&mut self, sample: PhaseSample) -> bool {
            let first = sample.code() & 0b01 != 0;
            let second = sample.code() & 0b10 != 0;
            self.scripted.push_back(first).is_ok() && self.scripted.push_back(second).is_ok()
        }

        /// Number of scripted reads not consumed yet
        pub fn pending_reads(&self) -> usize {
            self.scripted.len()
        }

        /// Pin last configured as an input
        pub fn configured_input(&self) -> Option<u8> {
            self.configured
        }

        /// Make every port read fail
        pub fn set_fail_reads(&mut self, fail: bool) {
            self.fail_reads = fail;
        }

        fn slot(port: u8) -> usize {
            (port - Self::PORT_B) as usize
        }
    }

    impl PinMap for MockPinMap {
        type Error = HalError;

        fn resolve(&self, pin: u8) -> Option<SyncBinding> {
            match pin {
                0..=7 => Some(SyncBinding::new(Self::PORT_D, 1 << pin)),
                8..=13 => Some(SyncBinding::new(Self::PORT_B, 1 << (pin - 8))),
                14..=19 => Some(SyncBinding::new(Self::PORT_C, 1 << (pin - 14))),
                _ => None,
            }
        }

        fn configure_input(&mut self, pin: u8) -> Result<(), Self::Error> {
            self.configured = Some(pin);
            Ok(())
        }

        fn read_port(&mut self, port: u8) -> Result<u8, Self::Error> {
            if self.fail_reads {
                return Err(HalError::GpioError);
            }
            if !(Self::PORT_B..=Self::PORT_D).contains(&port) {
                return Err(HalError::InvalidConfig);
            }
            match self.scripted.pop_front() {
                Some(true) => Ok(0xFF),
                Some(false) => Ok(0x00),
                None => Ok(self.ports[Self::slot(port)]),
            }
        }

        fn input_register(&self, port: u8) -> Option<u32> {
            // PINB/PINC/PIND on the ATmega328P
            match port {
                Self::PORT_B => Some(0x23),
                Self::PORT_C => Some(0x26),
                Self::PORT_D => Some(0x29),
                _ => None,
            }
        }
    }
}
