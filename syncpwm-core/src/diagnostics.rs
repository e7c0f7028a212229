//! Read-only introspection of the sync input for external log sinks

use core::fmt::{self, Write};
use heapless::String;
use crate::controller::PhaseCounts;
use crate::types::SyncBinding;

/// Maximum length of a formatted diagnostic line
pub const REPORT_CAPACITY: usize = 96;

/// Snapshot of the sync input binding and sample counters
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DiagnosticReport {
    pub binding: SyncBinding,
    /// Address of the port input register, when the platform knows it
    pub input_register: Option<u32>,
    pub counts: PhaseCounts,
}

impl DiagnosticReport {
    /// Format into a fixed-capacity line for sinks without an allocator
    pub fn to_line(&self) -> String<REPORT_CAPACITY> {
        let mut line = String::new();
        // Fits REPORT_CAPACITY for any u32 counter values
        let _ = write!(line, "{}", self);
        line
    }
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "port={} mask={}", self.binding.port, self.binding.mask)?;
        if let Some(address) = self.input_register {
            write!(f, " @={:X}", address)?;
        }
        write!(
            f,
            " 00={} 01={} 10={} 11={}",
            self.counts.low, self.counts.falling, self.counts.rising, self.counts.high
        )
    }
}
