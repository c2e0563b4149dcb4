//! Sinks for non-recoverable integrity faults.

use crate::error::IntegrityFault;
use parking_lot::Mutex;

/// Receives integrity faults detected by the engine.
///
/// The engine keeps going after reporting (it returns the fault as an
/// error); the host decides whether the node halts.
pub trait FaultReporter: Send + Sync {
    fn report(&self, fault: &IntegrityFault);
}

/// Logs faults at `error` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFaultReporter;

impl FaultReporter for TracingFaultReporter {
    fn report(&self, fault: &IntegrityFault) {
        tracing::error!(target: "dpos::fault", "Integrity fault: {}", fault);
    }
}

/// Keeps every reported fault in memory.
#[derive(Debug, Default)]
pub struct RecordingFaultReporter {
    faults: Mutex<Vec<IntegrityFault>>,
}

impl RecordingFaultReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Faults reported so far, oldest first.
    pub fn faults(&self) -> Vec<IntegrityFault> {
        self.faults.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.faults.lock().is_empty()
    }
}

impl FaultReporter for RecordingFaultReporter {
    fn report(&self, fault: &IntegrityFault) {
        tracing::error!(target: "dpos::fault", "Integrity fault: {}", fault);
        self.faults.lock().push(fault.clone());
    }
}
