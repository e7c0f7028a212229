#![no_std]
#![no_main]

#[cfg(feature = "defmt")]
use defmt_rtt as _;

// RISC-V runtime
use riscv_rt as _;

// Panic handler
use panic_halt as _;

use embassy_executor::Spawner;
use embassy_time::Duration;

use syncpwm_firmware::*;
use syncpwm_firmware::time_driver;

// Shared between the foreground and TIM1_UP_IRQHandler
static SYNC_PWM: Board = Board::new();

/// Main firmware entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    #[cfg(feature = "defmt")]
    defmt::info!("SyncPWM firmware v{} starting...", VERSION);

    time_driver::configure_systick(CORE_CLOCK_HZ);

    let config = SyncConfig::ch32v003();
    #[cfg(feature = "defmt")]
    defmt::info!("Nominal output: {} Hz", config.output_frequency_hz(config.nominal_period));

    if SYNC_PWM.install(build_sync_pwm(config)).is_err() {
        #[cfg(feature = "defmt")]
        defmt::error!("Synchronized output already installed");
    }

    select_role();

    spawner.must_spawn(diagnostics_task(&SYNC_PWM, Duration::from_secs(1)));

    #[cfg(feature = "defmt")]
    defmt::info!("SyncPWM ready as {}", SYNC_PWM.role());

    // Main supervision loop
    loop {
        embassy_time::Timer::after(Duration::from_secs(1)).await;
        #[cfg(feature = "defmt")]
        if let Some((period, duty)) = SYNC_PWM.registers() {
            defmt::trace!("TOP={} compare={}", period, duty);
        }
    }
}

#[cfg(feature = "reference")]
fn select_role() {
    SYNC_PWM.become_reference();
}

#[cfg(not(feature = "reference"))]
fn select_role() {
    match SYNC_PWM.become_follower(pins::SYNC_INPUT) {
        Ok(_outcome) => {
            SYNC_PWM.set_duty_cycle(DEFAULT_FOLLOWER_DUTY);
        }
        Err(_e) => {
            #[cfg(feature = "defmt")]
            defmt::error!("Follower setup failed: {}", _e);
        }
    }
}

// ========================================
// Interrupt Handlers
// ========================================

/// TIM1 update interrupt, once per PWM period
#[no_mangle]
extern "C" fn TIM1_UP_IRQHandler() {
    SYNC_PWM.on_period_elapsed();
}

/// SysTick interrupt handler
#[no_mangle]
extern "C" fn SysTick() {
    time_driver::on_systick();
}
