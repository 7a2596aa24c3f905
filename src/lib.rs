//! IntCode virtual machine and amplifier network.
//!
//! Provides a small stored-program interpreter with addressing modes and
//! blocking input/output, and a network that chains VM instances to search
//! phase settings for the strongest output signal.

pub mod network;
pub mod utils;
pub mod virtual_machine;

#[cfg(test)]
mod test_utils;
