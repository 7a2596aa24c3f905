//! IntCode virtual machine.
//!
//! A VM executes a program whose memory holds both code and data. Each VM
//! owns a private copy of its program and talks to the outside world only
//! through INPUT and OUTPUT.
//!
//! # Architecture
//!
//! - **Memory**: zero-indexed, bounds-checked 64-bit words
//! - **Instruction format**: `modes * 100 + opcode`, followed by its parameters
//! - **Parameter modes**: position (address to dereference) or immediate (the value)
//! - **Execution model**: single-step state machine; INPUT suspends the VM
//!   until a value is available, which lets a scheduler interleave many VMs
//!
//! # Modules
//!
//! - [`errors`]: Parse, decode and execution error types
//! - [`isa`]: Opcode table and per-opcode parameter kinds
//! - [`operand`]: Instruction word decoding and parameter modes
//! - [`program`]: Program memory and its text form
//! - [`vm`]: Core virtual machine implementation

pub mod errors;
pub mod isa;
#[cfg(test)]
mod isa_static_check;
pub mod operand;
pub mod program;
pub mod vm;
