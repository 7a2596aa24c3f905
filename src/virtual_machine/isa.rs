//! Instruction Set Architecture (ISA) definitions.
//!
//! The [`for_each_opcode!`](crate::for_each_opcode) macro holds the canonical
//! opcode table and invokes a callback macro for code generation, so the VM
//! dispatch table and the static checks share one definition.
//!
//! This module generates:
//! - The [`Opcode`] enum with its numeric values
//! - `TryFrom<Word>` for decoding the low two digits of an instruction word
//! - Parameter kinds and arity per opcode
//!
//! # Instruction format
//!
//! An instruction word is `modes * 100 + opcode`. Each parameter occupies
//! the word following the previous one:
//! - `Read` parameters are values, resolved through their mode digit
//! - `Write` parameters are always addresses

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::program::Word;

/// Maximum number of parameters any instruction takes.
pub const MAX_PARAMS: usize = 3;

/// How an instruction uses one of its parameters.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ParamKind {
    /// Operand value, dereferenced in position mode.
    Read,
    /// Destination address.
    Write,
}

/// Invokes a callback macro with the complete opcode definition list.
#[macro_export]
macro_rules! for_each_opcode {
    ($callback:ident) => {
        $callback! {
            /// ADD a, b, dst ; mem[dst] = a + b
            Add = 1, "ADD" => [a: Read, b: Read, dst: Write],
            /// MUL a, b, dst ; mem[dst] = a * b
            Multiply = 2, "MUL" => [a: Read, b: Read, dst: Write],
            /// IN dst ; mem[dst] = next input value, suspends while none is available
            Input = 3, "IN" => [dst: Write],
            /// OUT a ; emit a
            Output = 4, "OUT" => [a: Read],
            /// JNZ cond, target ; if cond != 0 then ip = target
            JumpIfTrue = 5, "JNZ" => [cond: Read, target: Read],
            /// JZ cond, target ; if cond == 0 then ip = target
            JumpIfFalse = 6, "JZ" => [cond: Read, target: Read],
            /// LT a, b, dst ; mem[dst] = (a < b) as 1 or 0
            LessThan = 7, "LT" => [a: Read, b: Read, dst: Write],
            /// EQ a, b, dst ; mem[dst] = (a == b) as 1 or 0
            Equals = 8, "EQ" => [a: Read, b: Read, dst: Write],
            /// HALT ; stop execution
            Halt = 99, "HALT" => [],
        }
    };
}

#[macro_export]
macro_rules! define_opcodes {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $opcode:literal, $mnemonic:literal => [
                $( $field:ident : $kind:ident ),* $(,)?
            ]
        ),* $(,)?
    ) => {
        #[derive(Copy, Clone, Debug, Eq, PartialEq)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name = $opcode,
            )*
        }

        impl TryFrom<Word> for Opcode {
            type Error = VMError;

            fn try_from(value: Word) -> Result<Self, Self::Error> {
                match value {
                    $( $opcode => Ok(Opcode::$name), )*
                    _ => Err(VMError::InvalidOpcode {
                        opcode: value,
                        offset: 0,
                    }),
                }
            }
        }

        impl Opcode {
            /// Returns the mnemonic used in logs and errors.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            /// Returns how each parameter is used, in order.
            pub const fn params(&self) -> &'static [ParamKind] {
                match self {
                    $( Opcode::$name => &[$( ParamKind::$kind ),*], )*
                }
            }
        }
    };
}

for_each_opcode!(define_opcodes);

impl Opcode {
    /// Number of parameters following the instruction word.
    pub const fn arity(&self) -> usize {
        self.params().len()
    }

    /// Number of words the instruction occupies, including the opcode word.
    pub const fn width(&self) -> usize {
        self.arity() + 1
    }
}
