//! Amplifier network built from connected VMs.
//!
//! VMs exchange words through blocking FIFO channels. A network chains one
//! VM per phase setting, linearly or in a feedback ring, and searches phase
//! permutations for the strongest output signal.
//!
//! - [`channel`]: Unbounded blocking FIFO shared between two VMs
//! - [`amplifier`]: Network configuration, wiring, task-based runner and search
//! - [`scheduler`]: Single-threaded ready-queue runner with deadlock detection

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::program::Word;
use intcode_derive::Error;

pub mod amplifier;
pub mod channel;
pub mod scheduler;

/// Errors that can occur while running an amplifier network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// No phase settings were given.
    #[error("phase set is empty")]
    EmptyPhaseSet,
    /// A phase setting appears more than once.
    #[error("phase setting {phase} appears more than once")]
    DuplicatePhase { phase: Word },
    /// An amplifier faulted; the whole permutation is invalid.
    #[error("amplifier {amplifier} faulted: {source}")]
    AmplifierFault { amplifier: usize, source: VMError },
    /// Every unfinished amplifier is waiting on an empty channel.
    #[error("network deadlocked with {blocked} amplifiers waiting for input")]
    Deadlocked { blocked: usize },
    /// The last amplifier halted without producing a value.
    #[error("last amplifier produced no output")]
    NoOutput,
    /// An amplifier task panicked or was cancelled.
    #[error("amplifier task failed: {reason}")]
    TaskFailed { reason: String },
}
