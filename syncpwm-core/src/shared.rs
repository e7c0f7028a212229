//! Interrupt-safe cell sharing one synchronized output between the
//! foreground API and the periodic handler

use core::cell::RefCell;
use critical_section::Mutex;
use crate::controller::PhaseCounts;
use crate::diagnostics::DiagnosticReport;
use crate::fsm::{SyncError, SyncPwm};
use crate::hal::{PinMap, WaveformGenerator};
use crate::types::{PhaseSample, Role, RoleOutcome, SyncBinding};

/// Synchronized output reachable from interrupt context
///
/// Every access runs inside `critical_section::with`, which masks the
/// periodic interrupt for its duration and restores it on every exit path.
/// Intended for `static` placement.
pub struct SharedSyncPwm<G, M> {
    inner: Mutex<RefCell<Option<SyncPwm<G, M>>>>,
}

impl<G, M> SharedSyncPwm<G, M> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }
}

impl<G, M> Default for SharedSyncPwm<G, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G, M> SharedSyncPwm<G, M>
where
    G: WaveformGenerator,
    M: PinMap,
    SyncError: From<M::Error>,
{
    /// Move the output into the cell, once
    pub fn install(&self, pwm: SyncPwm<G, M>) -> Result<(), SyncError> {
        critical_section::with(|cs| {
            let mut slot = self.inner.borrow(cs).borrow_mut();
            if slot.is_some() {
                return Err(SyncError::AlreadyInstalled);
            }
            *slot = Some(pwm);
            Ok(())
        })
    }

    /// Run `f` on the installed output, `None` if nothing is installed
    pub fn with<R>(&self, f: impl FnOnce(&mut SyncPwm<G, M>) -> R) -> Option<R> {
        critical_section::with(|cs| {
            let mut slot = self.inner.borrow(cs).borrow_mut();
            slot.as_mut().map(f)
        })
    }

    pub fn is_installed(&self) -> bool {
        self.with(|_| ()).is_some()
    }

    /// See [`SyncPwm::become_reference`]
    pub fn become_reference(&self) -> Option<RoleOutcome> {
        self.with(|pwm| pwm.become_reference())
    }

    /// See [`SyncPwm::become_follower`]
    pub fn become_follower(&self, input_pin: u8) -> Result<RoleOutcome, SyncError> {
        self.with(|pwm| pwm.become_follower(input_pin))
            .unwrap_or(Err(SyncError::NotInstalled))
    }

    /// See [`SyncPwm::set_duty_cycle`]
    pub fn set_duty_cycle(&self, value: u16) -> Option<u16> {
        self.with(|pwm| pwm.set_duty_cycle(value)).flatten()
    }

    /// Interrupt handler entry point
    pub fn on_period_elapsed(&self) -> Option<PhaseSample> {
        self.with(|pwm| pwm.on_period_elapsed()).flatten()
    }

    /// Current role, `Uninitialized` when nothing is installed
    pub fn role(&self) -> Role {
        self.with(|pwm| pwm.role()).unwrap_or(Role::Uninitialized)
    }

    pub fn sync_binding(&self) -> Option<SyncBinding> {
        self.with(|pwm| pwm.sync_binding()).flatten()
    }

    pub fn diagnostics(&self) -> Option<DiagnosticReport> {
        self.with(|pwm| pwm.diagnostics()).flatten()
    }

    pub fn phase_counts(&self) -> PhaseCounts {
        self.with(|pwm| pwm.phase_counts()).unwrap_or_default()
    }

    /// Period and duty register values, read together
    pub fn registers(&self) -> Option<(u16, u16)> {
        self.with(|pwm| (pwm.period(), pwm.duty()))
    }
}
