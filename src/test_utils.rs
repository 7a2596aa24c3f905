//! Program fixtures shared by tests.

#[cfg(test)]
pub mod utils {
    use crate::virtual_machine::program::{Program, Word};

    /// Parses a fixture, panicking on malformed text.
    pub fn program(source: &str) -> Program {
        Program::parse(source).unwrap()
    }

    /// Reads phase then signal, outputs `signal * 10 + phase`.
    ///
    /// Linear network over phases 4,3,2,1,0 yields 43210.
    pub const LINEAR_43210: &str = "3,15,3,16,1002,16,10,16,1,16,15,15,4,15,99,0,0";

    /// Linear network over phases 0,1,2,3,4 yields 54321.
    pub const LINEAR_54321: &str =
        "3,23,3,24,1002,24,10,24,1002,23,-1,23,101,5,23,23,1,24,23,23,4,23,99,0,0";

    /// Linear network over phases 1,0,4,3,2 yields 65210.
    pub const LINEAR_65210: &str = "3,31,3,32,1002,32,10,32,1001,31,-2,31,1007,31,0,33,\
         1002,33,7,33,1,33,31,31,1,32,31,31,4,31,99,0,0,0";

    /// Feedback network over phases 9,8,7,6,5 yields 139629729.
    pub const FEEDBACK_139629729: &str = "3,26,1001,26,-4,26,3,27,1002,27,2,27,1,27,26,\
         27,4,27,1001,28,-1,28,1005,28,6,99,0,0,5";

    /// Feedback network over phases 9,7,8,5,6 yields 18216.
    pub const FEEDBACK_18216: &str = "3,52,1001,52,-5,52,3,53,1,52,56,54,1007,54,5,55,\
         1005,55,26,1001,54,-5,54,1105,1,12,1,53,54,53,1008,54,0,55,1001,55,1,55,2,53,\
         55,53,4,53,1001,56,-1,56,1005,56,6,99,0,0,0,0,10";

    /// Outputs 1 if the input equals 8, else 0.
    pub const EQUALS_8: [Word; 11] = [3, 9, 8, 9, 10, 9, 4, 9, 99, -1, 8];

    /// Echoes one input to the output, then halts.
    pub const ECHO: [Word; 5] = [3, 0, 4, 0, 99];

    /// Reads a phase. Phase 0 then reads input forever; any other phase
    /// jumps to the invalid opcode 42 at offset 10.
    pub const LOOP_OR_FAULT: &str = "3,13,1005,13,10,3,14,1105,1,5,42,0,0,0,0";

    /// Reads one input and halts without producing output.
    pub const SWALLOW: [Word; 3] = [3, 0, 99];
}
