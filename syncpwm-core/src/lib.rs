#![cfg_attr(not(feature = "std"), no_std)]

//! # SyncPWM Core
//!
//! Phase-locks the period of a hardware PWM output to a reference square
//! wave from another board. One board is the reference, every other board
//! follows it with a bang-bang correction run once per PWM period.

pub mod types;
pub mod hal;
pub mod controller;
pub mod fsm;
pub mod shared;
pub mod diagnostics;

#[cfg(feature = "test-utils")]
pub mod test_utils;


pub use types::*;
pub use hal::*;
pub use controller::*;
pub use fsm::*;
pub use shared::SharedSyncPwm;
pub use diagnostics::DiagnosticReport;

/// SyncPWM library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
