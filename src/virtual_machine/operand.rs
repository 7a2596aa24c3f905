//! Instruction word decoding.
//!
//! Splits an instruction word into its [`Opcode`] and the addressing mode of
//! each parameter. Decoding is pure; the VM attaches the offset to errors.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{MAX_PARAMS, Opcode};
use crate::virtual_machine::program::Word;

/// Addressing mode of a single parameter.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ParameterMode {
    /// The parameter is an address to dereference.
    #[default]
    Position = 0,
    /// The parameter is the value itself.
    Immediate = 1,
}

impl TryFrom<Word> for ParameterMode {
    type Error = VMError;

    fn try_from(value: Word) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Position),
            1 => Ok(Self::Immediate),
            _ => Err(VMError::InvalidParameterMode {
                mode: value,
                word: 0,
                offset: 0,
            }),
        }
    }
}

/// A decoded instruction word.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    /// Modes for parameters 1..=3, least significant digit first.
    pub modes: [ParameterMode; MAX_PARAMS],
}

impl Instruction {
    /// Returns the mode of parameter `index` (zero based).
    pub fn mode(&self, index: usize) -> ParameterMode {
        self.modes.get(index).copied().unwrap_or_default()
    }
}

/// Decodes an instruction word into its opcode and parameter modes.
///
/// The opcode is `word % 100`; the hundreds, thousands and ten-thousands
/// digits give the modes of parameters one to three. Missing digits are
/// position mode.
pub fn decode(word: Word) -> Result<Instruction, VMError> {
    let opcode = Opcode::try_from(word % 100)?;

    let mut modes = [ParameterMode::Position; MAX_PARAMS];
    let mut digits = word / 100;
    for mode in modes.iter_mut() {
        *mode = ParameterMode::try_from(digits % 10).map_err(|_| {
            VMError::InvalidParameterMode {
                mode: digits % 10,
                word,
                offset: 0,
            }
        })?;
        digits /= 10;
    }

    Ok(Instruction { opcode, modes })
}
