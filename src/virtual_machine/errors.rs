use crate::virtual_machine::program::Word;
use intcode_derive::Error;

/// Errors that can occur while parsing, decoding or executing a program.
///
/// Every execution error is fatal for the VM that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VMError {
    /// Unknown opcode encountered at `offset`.
    #[error("malformed instruction: unknown opcode {opcode} at offset {offset}")]
    InvalidOpcode { opcode: Word, offset: usize },
    /// A parameter mode digit other than 0 (position) or 1 (immediate).
    #[error("malformed instruction: invalid parameter mode {mode} in {word} at offset {offset}")]
    InvalidParameterMode { mode: Word, word: Word, offset: usize },
    /// Operand address or instruction pointer outside program memory.
    #[error("address {address} out of bounds for memory of {len} words")]
    OutOfBounds { address: Word, len: usize },
    /// INPUT executed with no value available and none able to arrive.
    #[error("no input available for INPUT at offset {ip}")]
    StarvedInput { ip: usize },
    /// Result of an arithmetic instruction does not fit in a 64-bit word.
    #[error("arithmetic overflow in {instruction} at offset {ip}")]
    ArithmeticOverflow { instruction: &'static str, ip: usize },
    /// The VM already stopped on a fault and cannot be resumed.
    #[error("vm faulted at offset {ip} and cannot be resumed")]
    Faulted { ip: usize },
    /// Program text contained something other than an integer.
    #[error("invalid program token {token:?} at index {index}")]
    ParseError { token: String, index: usize },
}

impl VMError {
    /// Attaches the instruction offset to decode errors, which are raised
    /// without one.
    pub(crate) fn at_offset(self, offset: usize) -> Self {
        match self {
            VMError::InvalidOpcode { opcode, .. } => VMError::InvalidOpcode { opcode, offset },
            VMError::InvalidParameterMode { mode, word, .. } => {
                VMError::InvalidParameterMode { mode, word, offset }
            }
            other => other,
        }
    }
}
