//! CH32V003 specific hardware implementations
//!
//! TIM1 channel 1 drives the synchronized PWM output on PD2. Its update event
//! fires once per period and runs the phase-lock handler. Sync inputs are read
//! straight from the GPIO input data registers.

use syncpwm_core::{HalError, PinMap, SyncBinding, WaveformGenerator, MAX_PRESCALER};

/// CH32V003 Memory Map and Register Base Addresses
const RCC_BASE: u32 = 0x4002_1000;
const GPIOA_BASE: u32 = 0x4001_0800;
const GPIOC_BASE: u32 = 0x4001_1000;
const GPIOD_BASE: u32 = 0x4001_1400;
const TIM1_BASE: u32 = 0x4001_2C00;
const PFIC_BASE: u32 = 0xE000_E000;

/// RCC Register offsets
const RCC_APB2PCENR: u32 = 0x18; // APB2 peripheral clock enable register

/// GPIO Register offsets
const GPIO_CFGLR: u32 = 0x00;  // Configuration Register Low
const GPIO_INDR: u32 = 0x08;   // Input Data Register

/// TIM1 Register offsets
const TIM_CTLR1: u32 = 0x00;   // Control Register 1
const TIM_DMAINTENR: u32 = 0x0C; // DMA/Interrupt Enable Register
const TIM_INTFR: u32 = 0x10;   // Interrupt Flag Register
const TIM_SWEVGR: u32 = 0x14;  // Software Event Generation Register
const TIM_CHCTLR1: u32 = 0x18; // Compare/Capture Control Register 1
const TIM_CCER: u32 = 0x20;    // Compare/Capture Enable Register
const TIM_PSC: u32 = 0x28;     // Prescaler
const TIM_ATRLR: u32 = 0x2C;   // Auto-reload Register (TOP)
const TIM_CH1CVR: u32 = 0x34;  // Channel 1 Compare Value Register
const TIM_BDTR: u32 = 0x44;    // Break and Dead-time Register

/// PFIC interrupt enable register covering IRQ 32-63
const PFIC_IENR2: u32 = 0x104;
/// TIM1 update interrupt number
const TIM1_UP_IRQ: u32 = 35;

/// Port identifiers used in pin numbers (`port * 8 + bit`)
pub const PORT_A: u8 = 0;
pub const PORT_C: u8 = 2;
pub const PORT_D: u8 = 3;

#[inline(always)]
fn read_reg(address: u32) -> u32 {
    unsafe { core::ptr::read_volatile(address as *const u32) }
}

#[inline(always)]
fn write_reg(address: u32, value: u32) {
    unsafe { core::ptr::write_volatile(address as *mut u32, value) }
}

fn modify_reg(address: u32, f: impl FnOnce(u32) -> u32) {
    write_reg(address, f(read_reg(address)));
}

/// TIM1 based waveform generator, output on PD2 (TIM1_CH1)
pub struct Ch32v003Timer {
    prescaler: u32,
}

impl Ch32v003Timer {
    /// Create generator with given prescaler (timer clock = HCLK / prescaler)
    pub const fn new(prescaler: u32) -> Self {
        Self { prescaler }
    }

    fn enable_clocks() {
        // Bit 0 = AFIO, Bit 2 = GPIOA, Bit 4 = GPIOC, Bit 5 = GPIOD, Bit 11 = TIM1
        modify_reg(RCC_BASE + RCC_APB2PCENR, |v| {
            v | (1 << 0) | (1 << 2) | (1 << 4) | (1 << 5) | (1 << 11)
        });
    }

    fn configure_output_pin() {
        // PD2: CNF=10 (AF push-pull), MODE=11 (50MHz output)
        modify_reg(GPIOD_BASE + GPIO_CFGLR, |v| (v & !(0xF << (2 * 4))) | (0xB << (2 * 4)));
    }
}

impl WaveformGenerator for Ch32v003Timer {
    fn configure(&mut self, period: u16, duty: u16) {
        Self::enable_clocks();
        Self::configure_output_pin();

        // PSC holds prescaler - 1 in 16 bits
        write_reg(TIM1_BASE + TIM_PSC, self.prescaler.clamp(1, MAX_PRESCALER) - 1);
        write_reg(TIM1_BASE + TIM_ATRLR, period as u32);
        write_reg(TIM1_BASE + TIM_CH1CVR, duty as u32);
        // PWM mode 1 on channel 1, compare preload enable
        write_reg(TIM1_BASE + TIM_CHCTLR1, (0x6 << 4) | (1 << 3));
        write_reg(TIM1_BASE + TIM_CCER, 1); // CC1E
        write_reg(TIM1_BASE + TIM_BDTR, 1 << 15); // MOE
        write_reg(TIM1_BASE + TIM_SWEVGR, 1); // UG, load shadow registers
        write_reg(TIM1_BASE + TIM_INTFR, 0);
        // ARPE=1, CEN=1
        write_reg(TIM1_BASE + TIM_CTLR1, (1 << 7) | 1);

        #[cfg(feature = "defmt")]
        defmt::debug!("TIM1 configured: TOP={} compare={}", period, duty);
    }

    fn period(&self) -> u16 {
        read_reg(TIM1_BASE + TIM_ATRLR) as u16
    }

    fn set_period(&mut self, period: u16) {
        // Single store, buffered until the next update event
        write_reg(TIM1_BASE + TIM_ATRLR, period as u32);
    }

    fn duty(&self) -> u16 {
        read_reg(TIM1_BASE + TIM_CH1CVR) as u16
    }

    fn set_duty(&mut self, duty: u16) {
        write_reg(TIM1_BASE + TIM_CH1CVR, duty as u32);
    }

    fn arm_period_interrupt(&mut self) {
        modify_reg(TIM1_BASE + TIM_DMAINTENR, |v| v | 1); // UIE
        write_reg(PFIC_BASE + PFIC_IENR2, 1 << (TIM1_UP_IRQ - 32));

        #[cfg(feature = "defmt")]
        defmt::debug!("TIM1 update interrupt armed");
    }

    fn acknowledge_period_interrupt(&mut self) {
        // UIF is cleared by writing 0, other flags are left untouched by writing 1
        write_reg(TIM1_BASE + TIM_INTFR, !1);
    }
}

/// GPIO pin map, pin number = `port * 8 + bit`
///
/// Port A exposes PA1-PA2, ports C and D expose bits 0-7. PD1 carries SWIO
/// and is not available.
pub struct Ch32v003Pins;

impl Ch32v003Pins {
    pub const fn new() -> Self {
        Self
    }

    const fn port_base(port: u8) -> Option<u32> {
        match port {
            PORT_A => Some(GPIOA_BASE),
            PORT_C => Some(GPIOC_BASE),
            PORT_D => Some(GPIOD_BASE),
            _ => None,
        }
    }
}

impl Default for Ch32v003Pins {
    fn default() -> Self {
        Self::new()
    }
}

impl PinMap for Ch32v003Pins {
    type Error = HalError;

    fn resolve(&self, pin: u8) -> Option<SyncBinding> {
        let port = pin / 8;
        let bit = pin % 8;
        let available = match port {
            PORT_A => bit == 1 || bit == 2,
            PORT_C => true,
            PORT_D => bit != 1,
            _ => false,
        };
        available.then_some(SyncBinding::new(port, 1 << bit))
    }

    fn configure_input(&mut self, pin: u8) -> Result<(), Self::Error> {
        let base = Self::port_base(pin / 8).ok_or(HalError::InvalidConfig)?;
        let shift = (pin % 8) as u32 * 4;
        // CNF=01 (floating input), MODE=00 (input)
        modify_reg(base + GPIO_CFGLR, |v| (v & !(0xF << shift)) | (0x4 << shift));
        Ok(())
    }

    fn read_port(&mut self, port: u8) -> Result<u8, Self::Error> {
        let base = Self::port_base(port).ok_or(HalError::InvalidConfig)?;
        Ok(read_reg(base + GPIO_INDR) as u8)
    }

    fn input_register(&self, port: u8) -> Option<u32> {
        Self::port_base(port).map(|base| base + GPIO_INDR)
    }
}

/// CH32V003 pin configuration constants
pub mod pins {
    /// Synchronized PWM output (PD2, TIM1_CH1)
    pub const PWM_OUTPUT: u8 = 3 * 8 + 2;

    /// Default sync input (PC4)
    pub const SYNC_INPUT: u8 = 2 * 8 + 4;
}

/// Core clock after reset with the internal 24 MHz oscillator
pub const CORE_CLOCK_HZ: u32 = 24_000_000;
