//! Core virtual machine implementation.
//!
//! The VM is a fetch-decode-execute loop over its own private [`Program`].
//! [`VM::step`] executes one instruction and reports what happened, which
//! lets an external scheduler suspend a VM at INPUT and resume it later.
//! Two drivers are provided on top of it:
//!
//! - [`VM::run`]: async, reads from and writes to wired [`Channel`]s
//! - [`VM::run_with_inputs`]: synchronous, feeds values from an iterator

use crate::error;
use crate::network::channel::Channel;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Opcode;
use crate::virtual_machine::operand::{Instruction, ParameterMode, decode};
use crate::virtual_machine::program::{Program, Word};
use std::sync::Arc;


/// Lifecycle of a VM.
///
/// `Ready -> Running -> (BlockedOnInput <-> Running) -> Halted`, or
/// `Faulted` once any instruction fails.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Status {
    /// Constructed, no instruction executed yet.
    Ready,
    /// Executing instructions.
    Running,
    /// Stopped at INPUT until a value is provided.
    BlockedOnInput,
    /// Executed HALT.
    Halted,
    /// Stopped on an error. Terminal.
    Faulted,
}

/// Outcome of a single [`VM::step`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Event {
    /// An instruction without side effects visible to the driver ran.
    Continue,
    /// OUTPUT produced a value.
    Output(Word),
    /// INPUT needs a value; the instruction pointer did not move.
    NeedsInput,
    /// HALT was reached.
    Halted,
}

/// Sequential reader for the parameters of the instruction being executed.
struct Params<'a> {
    memory: &'a Program,
    instr: Instruction,
    base: usize,
    next: usize,
}

impl<'a> Params<'a> {
    fn new(memory: &'a Program, ip: usize, instr: Instruction) -> Self {
        Self {
            memory,
            instr,
            base: ip + 1,
            next: 0,
        }
    }

    /// Returns the literal parameter word and advances to the next one.
    fn literal(&mut self) -> Result<(Word, ParameterMode), VMError> {
        let mode = self.instr.mode(self.next);
        let word = self.memory.fetch(self.base + self.next)?;
        self.next += 1;
        Ok((word, mode))
    }

    /// Reads a value parameter, dereferencing it in position mode.
    fn read(&mut self) -> Result<Word, VMError> {
        match self.literal()? {
            (address, ParameterMode::Position) => self.memory.read(address),
            (value, ParameterMode::Immediate) => Ok(value),
        }
    }

    /// Reads a destination parameter. Destinations are always addresses.
    fn address(&mut self) -> Result<Word, VMError> {
        self.literal().map(|(address, _)| address)
    }
}

macro_rules! exec_vm {
    (
        vm = $vm:ident,
        instr = $instr:ident,
        { $( $variant:ident => $handler:ident ( $( $field:ident : $kind:ident ),* $(,)? ) ),* $(,)? }
    ) => {{
        match $instr.opcode {
            $(
                Opcode::$variant => {
                    #[allow(unused_mut, unused_variables)]
                    let mut params = Params::new(&$vm.memory, $vm.ip, $instr);
                    $( let $field = exec_vm!(@read params, $kind)?; )*
                    $vm.$handler($instr.opcode.mnemonic(), $( $field ),*)
                }
            ),*
        }
    }};

    (@read $params:ident, Read) => {
        $params.read()
    };

    (@read $params:ident, Write) => {
        $params.address()
    };
}

/// IntCode virtual machine.
///
/// Owns a private copy of its program. Channels are shared handles; the VM
/// only ever reads from its input and writes to its output.
#[derive(Debug)]
pub struct VM {
    /// Program memory, code and data.
    memory: Program,
    /// Instruction pointer.
    ip: usize,
    status: Status,
    /// Value for the INPUT the VM is blocked on.
    pending_input: Option<Word>,
    input: Option<Arc<Channel>>,
    output: Option<Arc<Channel>>,
    /// Values emitted by [`VM::run`] while no output channel is wired.
    outputs: Vec<Word>,
    last_output: Option<Word>,
    /// Number of executed instructions.
    steps: u64,
}

impl VM {
    /// Creates a VM over a deep copy of `program`.
    pub fn new(program: &Program) -> Self {
        Self {
            memory: program.clone(),
            ip: 0,
            status: Status::Ready,
            pending_input: None,
            input: None,
            output: None,
            outputs: Vec::new(),
            last_output: None,
            steps: 0,
        }
    }

    /// Creates a VM over a copy of `words`.
    pub fn from_words(words: &[Word]) -> Self {
        Self::new(&Program::from(words))
    }

    /// Connects the VM to its input and output channels.
    pub fn wire(&mut self, input: Arc<Channel>, output: Arc<Channel>) {
        self.input = Some(input);
        self.output = Some(output);
    }

    pub fn wire_input(&mut self, input: Arc<Channel>) {
        self.input = Some(input);
    }

    pub fn wire_output(&mut self, output: Arc<Channel>) {
        self.output = Some(output);
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    /// Current program memory.
    pub fn memory(&self) -> &Program {
        &self.memory
    }

    /// Values emitted by [`VM::run`] without a wired output channel.
    pub fn outputs(&self) -> &[Word] {
        &self.outputs
    }

    /// The most recent value produced by OUTPUT, whichever driver ran it.
    pub fn last_output(&self) -> Option<Word> {
        self.last_output
    }

    pub fn is_finished(&self) -> bool {
        self.status == Status::Halted
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Supplies the value for the INPUT the VM is blocked on.
    ///
    /// The value is consumed by the next [`VM::step`].
    pub fn provide_input(&mut self, value: Word) {
        self.pending_input = Some(value);
    }

    /// Executes a single instruction.
    ///
    /// Reaching INPUT without a provided value returns [`Event::NeedsInput`]
    /// and leaves the instruction pointer on the INPUT. A halted VM keeps
    /// returning [`Event::Halted`]; a faulted VM returns [`VMError::Faulted`].
    pub fn step(&mut self) -> Result<Event, VMError> {
        match self.status {
            Status::Halted => return Ok(Event::Halted),
            Status::Faulted => return Err(VMError::Faulted { ip: self.ip }),
            _ => {}
        }

        match self.exec() {
            Ok(event) => {
                self.status = match event {
                    Event::NeedsInput => Status::BlockedOnInput,
                    Event::Halted => Status::Halted,
                    Event::Continue | Event::Output(_) => Status::Running,
                };
                if event != Event::NeedsInput {
                    self.steps += 1;
                }
                Ok(event)
            }
            Err(err) => Err(self.fault(err)),
        }
    }

    /// Runs until HALT using the wired channels.
    ///
    /// Outputs go to the output channel, or to [`VM::outputs`] when none is
    /// wired. INPUT awaits the input channel; with no input channel wired it
    /// fails with [`VMError::StarvedInput`]. Returns the final `memory[0]`.
    ///
    /// An input channel that never receives a value suspends this future
    /// forever.
    pub async fn run(&mut self) -> Result<Word, VMError> {
        loop {
            match self.step()? {
                Event::Continue => {}
                Event::Output(value) => match &self.output {
                    Some(channel) => channel.put(value),
                    None => self.outputs.push(value),
                },
                Event::NeedsInput => {
                    let Some(channel) = self.input.clone() else {
                        return Err(self.fault(VMError::StarvedInput { ip: self.ip }));
                    };
                    let value = channel.get().await;
                    self.provide_input(value);
                }
                Event::Halted => return self.memory.read(0),
            }
        }
    }

    /// Runs until HALT, feeding INPUT from `inputs` and ignoring any wiring.
    ///
    /// Returns every value produced by OUTPUT during this call. Running out
    /// of inputs is [`VMError::StarvedInput`].
    pub fn run_with_inputs<I>(&mut self, inputs: I) -> Result<Vec<Word>, VMError>
    where
        I: IntoIterator<Item = Word>,
    {
        let mut inputs = inputs.into_iter();
        let mut produced = Vec::new();
        loop {
            match self.step()? {
                Event::Continue => {}
                Event::Output(value) => produced.push(value),
                Event::NeedsInput => match inputs.next() {
                    Some(value) => self.provide_input(value),
                    None => return Err(self.fault(VMError::StarvedInput { ip: self.ip })),
                },
                Event::Halted => return Ok(produced),
            }
        }
    }

    /// Runs a program that takes no input until HALT and returns `memory[0]`.
    pub fn run_to_halt(&mut self) -> Result<Word, VMError> {
        self.run_with_inputs(std::iter::empty())?;
        self.memory.read(0)
    }

    /// Marks the VM as faulted and passes the error through.
    fn fault(&mut self, err: VMError) -> VMError {
        self.status = Status::Faulted;
        error!("vm fault at offset {}: {}", self.ip, err);
        err
    }

    /// Decodes and executes the instruction at the instruction pointer.
    fn exec(&mut self) -> Result<Event, VMError> {
        let offset = self.ip;
        let word = self.memory.fetch(offset)?;
        let instr = decode(word).map_err(|e| e.at_offset(offset))?;

        if instr.opcode == Opcode::Input && self.pending_input.is_none() {
            return Ok(Event::NeedsInput);
        }

        exec_vm! {
            vm = self,
            instr = instr,
            {
                Add => op_add(a: Read, b: Read, dst: Write),
                Multiply => op_mul(a: Read, b: Read, dst: Write),
                Input => op_input(dst: Write),
                Output => op_output(a: Read),
                JumpIfTrue => op_jump_if_true(cond: Read, target: Read),
                JumpIfFalse => op_jump_if_false(cond: Read, target: Read),
                LessThan => op_less_than(a: Read, b: Read, dst: Write),
                Equals => op_equals(a: Read, b: Read, dst: Write),
                Halt => op_halt(),
            }
        }
    }

    /// Moves past the current instruction.
    fn advance(&mut self, opcode: Opcode) -> Result<Event, VMError> {
        self.ip += opcode.width();
        Ok(Event::Continue)
    }

    /// Sets the instruction pointer to `target`.
    fn jump(&mut self, target: Word) -> Result<Event, VMError> {
        self.ip = usize::try_from(target).map_err(|_| VMError::OutOfBounds {
            address: target,
            len: self.memory.len(),
        })?;
        Ok(Event::Continue)
    }

    fn op_add(
        &mut self,
        instr: &'static str,
        a: Word,
        b: Word,
        dst: Word,
    ) -> Result<Event, VMError> {
        let sum = a.checked_add(b).ok_or(VMError::ArithmeticOverflow {
            instruction: instr,
            ip: self.ip,
        })?;
        self.memory.write(dst, sum)?;
        self.advance(Opcode::Add)
    }

    fn op_mul(
        &mut self,
        instr: &'static str,
        a: Word,
        b: Word,
        dst: Word,
    ) -> Result<Event, VMError> {
        let product = a.checked_mul(b).ok_or(VMError::ArithmeticOverflow {
            instruction: instr,
            ip: self.ip,
        })?;
        self.memory.write(dst, product)?;
        self.advance(Opcode::Multiply)
    }

    fn op_input(&mut self, _instr: &'static str, dst: Word) -> Result<Event, VMError> {
        let value = self
            .pending_input
            .take()
            .ok_or(VMError::StarvedInput { ip: self.ip })?;
        self.memory.write(dst, value)?;
        self.advance(Opcode::Input)
    }

    fn op_output(&mut self, _instr: &'static str, a: Word) -> Result<Event, VMError> {
        self.last_output = Some(a);
        self.advance(Opcode::Output)?;
        Ok(Event::Output(a))
    }

    fn op_jump_if_true(
        &mut self,
        _instr: &'static str,
        cond: Word,
        target: Word,
    ) -> Result<Event, VMError> {
        if cond != 0 {
            self.jump(target)
        } else {
            self.advance(Opcode::JumpIfTrue)
        }
    }

    fn op_jump_if_false(
        &mut self,
        _instr: &'static str,
        cond: Word,
        target: Word,
    ) -> Result<Event, VMError> {
        if cond == 0 {
            self.jump(target)
        } else {
            self.advance(Opcode::JumpIfFalse)
        }
    }

    fn op_less_than(
        &mut self,
        _instr: &'static str,
        a: Word,
        b: Word,
        dst: Word,
    ) -> Result<Event, VMError> {
        self.memory.write(dst, Word::from(a < b))?;
        self.advance(Opcode::LessThan)
    }

    fn op_equals(
        &mut self,
        _instr: &'static str,
        a: Word,
        b: Word,
        dst: Word,
    ) -> Result<Event, VMError> {
        self.memory.write(dst, Word::from(a == b))?;
        self.advance(Opcode::Equals)
    }

    fn op_halt(&mut self, _instr: &'static str) -> Result<Event, VMError> {
        Ok(Event::Halted)
    }
}
