#![no_std]

//! Firmware library for the CH32V003 synchronized PWM node

pub use embassy_executor::Spawner;
pub use embassy_time::Duration;

pub use syncpwm_core::*;

// Re-export hardware implementations
pub use crate::ch32v003_hardware::*;
pub use crate::tasks::*;

/// Synchronized output shared between `main` and the TIM1 update interrupt
pub type Board = SharedSyncPwm<Ch32v003Timer, Ch32v003Pins>;

/// Compare value applied once a follower is running (25% of nominal period)
pub const DEFAULT_FOLLOWER_DUTY: u16 = NOMINAL_PERIOD / 4;

/// Build the uninstalled synchronized output for this board
pub fn build_sync_pwm(config: SyncConfig) -> SyncPwm<Ch32v003Timer, Ch32v003Pins> {
    SyncPwm::new(config, Ch32v003Timer::new(config.prescaler), Ch32v003Pins::new())
}

// Embassy tasks module
pub mod tasks {
    use super::*;
    use embassy_time::Timer;

    /// Periodically forward the sync binding and phase counters to the log sink
    #[embassy_executor::task]
    pub async fn diagnostics_task(board: &'static Board, interval: Duration) {
        #[cfg(feature = "defmt")]
        defmt::info!("Diagnostics task started");

        loop {
            Timer::after(interval).await;

            match board.diagnostics() {
                Some(report) => {
                    let _line = report.to_line();
                    #[cfg(feature = "defmt")]
                    defmt::info!("sync {}", _line.as_str());
                }
                None => {
                    #[cfg(feature = "defmt")]
                    defmt::trace!("Role {}: no sync input bound", board.role());
                }
            }
        }
    }
}

// CH32V003 hardware module
pub mod ch32v003_hardware;

// Time driver for embassy
pub mod time_driver;
