//! SysTick based embassy time driver for CH32V003

use core::cell::Cell;
use critical_section::Mutex;
use embassy_time_driver::{AlarmHandle, Driver};
use portable_atomic::{AtomicBool, AtomicU64, Ordering};

/// SysTick Register Base Address and offsets
const SYSTICK_BASE: u32 = 0xE000_F000;
const SYSTICK_CTLR: u32 = 0x00;
const SYSTICK_SR: u32 = 0x04;
const SYSTICK_CNT: u32 = 0x08;
const SYSTICK_CMP: u32 = 0x10;

/// Millisecond tick driver with a single alarm
pub struct SysTickDriver {
    ticks: AtomicU64,
    alarm_taken: AtomicBool,
    alarm_at: AtomicU64,
    callback: Mutex<Cell<Option<(fn(*mut ()), usize)>>>,
}

impl SysTickDriver {
    const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            alarm_taken: AtomicBool::new(false),
            alarm_at: AtomicU64::new(u64::MAX),
            callback: Mutex::new(Cell::new(None)),
        }
    }

    /// Advance one tick (called from SysTick interrupt)
    fn tick(&self) {
        let now = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        if now >= self.alarm_at.load(Ordering::Relaxed) {
            self.alarm_at.store(u64::MAX, Ordering::Relaxed);
            let callback = critical_section::with(|cs| self.callback.borrow(cs).get());
            if let Some((callback, ctx)) = callback {
                callback(ctx as *mut ());
            }
        }
    }
}

impl Driver for SysTickDriver {
    fn now(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    unsafe fn allocate_alarm(&self) -> Option<AlarmHandle> {
        if self.alarm_taken.swap(true, Ordering::Relaxed) {
            None
        } else {
            Some(AlarmHandle::new(0))
        }
    }

    fn set_alarm_callback(&self, _alarm: AlarmHandle, callback: fn(*mut ()), ctx: *mut ()) {
        critical_section::with(|cs| self.callback.borrow(cs).set(Some((callback, ctx as usize))));
    }

    fn set_alarm(&self, _alarm: AlarmHandle, timestamp: u64) -> bool {
        if timestamp <= self.now() {
            self.alarm_at.store(u64::MAX, Ordering::Relaxed);
            return false;
        }
        self.alarm_at.store(timestamp, Ordering::Relaxed);
        true
    }
}

embassy_time_driver::time_driver_impl!(static DRIVER: SysTickDriver = SysTickDriver::new());

/// SysTick interrupt body
pub fn on_systick() {
    // Clear the compare flag
    unsafe {
        core::ptr::write_volatile((SYSTICK_BASE + SYSTICK_SR) as *mut u32, 0);
    }
    DRIVER.tick();
}

/// Start SysTick with a 1 ms compare interval
pub fn configure_systick(core_clock_hz: u32) {
    unsafe {
        let systick_cmp = (SYSTICK_BASE + SYSTICK_CMP) as *mut u32;
        core::ptr::write_volatile(systick_cmp, core_clock_hz / 1000 - 1);

        let systick_cnt = (SYSTICK_BASE + SYSTICK_CNT) as *mut u32;
        core::ptr::write_volatile(systick_cnt, 0);

        // STE, STIE, STCLK = HCLK, STRE (auto reload)
        let systick_ctlr = (SYSTICK_BASE + SYSTICK_CTLR) as *mut u32;
        core::ptr::write_volatile(systick_ctlr, 0xF);
    }
}

// Critical section implementation for single-core RISC-V
critical_section::set_impl!(RiscvCriticalSection);

struct RiscvCriticalSection;

unsafe impl critical_section::Impl for RiscvCriticalSection {
    unsafe fn acquire() -> critical_section::RawRestoreState {
        let enabled = riscv::register::mstatus::read().mie();
        riscv::register::mstatus::clear_mie();
        enabled as u8
    }

    unsafe fn release(was_enabled: critical_section::RawRestoreState) {
        if was_enabled != 0 {
            riscv::register::mstatus::set_mie();
        }
    }
}
