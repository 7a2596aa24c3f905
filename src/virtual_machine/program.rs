//! Program memory and its textual representation.
//!
//! A [`Program`] is a zero-indexed sequence of [`Word`]s that is both the
//! code and the data of a VM. Cloning a program is a deep copy, so every VM
//! works on private memory.

use crate::virtual_machine::errors::VMError;
use std::fmt;
use std::str::FromStr;

/// Machine word. Programs routinely exceed 32 bits.
pub type Word = i64;

/// Mutable, bounds-checked program memory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Program {
    words: Vec<Word>,
}

impl Program {
    /// Creates a program from its words.
    pub fn new(words: Vec<Word>) -> Self {
        Self { words }
    }

    /// Parses the comma-separated text form. See the [`FromStr`] impl.
    pub fn parse(source: &str) -> Result<Self, VMError> {
        source.parse()
    }

    /// Number of words in memory.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn as_slice(&self) -> &[Word] {
        &self.words
    }

    pub fn into_vec(self) -> Vec<Word> {
        self.words
    }

    /// Converts `address` to an index inside `[0, len)`.
    ///
    /// Returns [`VMError::OutOfBounds`] for negative or too large addresses.
    pub fn index(&self, address: Word) -> Result<usize, VMError> {
        usize::try_from(address)
            .ok()
            .filter(|&idx| idx < self.words.len())
            .ok_or(VMError::OutOfBounds {
                address,
                len: self.words.len(),
            })
    }

    /// Reads the word at memory index `offset`, e.g. the instruction pointer.
    pub fn fetch(&self, offset: usize) -> Result<Word, VMError> {
        self.words
            .get(offset)
            .copied()
            .ok_or(VMError::OutOfBounds {
                address: Word::try_from(offset).unwrap_or(Word::MAX),
                len: self.words.len(),
            })
    }

    /// Reads the word at `address`.
    pub fn read(&self, address: Word) -> Result<Word, VMError> {
        let idx = self.index(address)?;
        Ok(self.words[idx])
    }

    /// Overwrites the word at `address`.
    pub fn write(&mut self, address: Word, value: Word) -> Result<(), VMError> {
        let idx = self.index(address)?;
        self.words[idx] = value;
        Ok(())
    }
}

impl From<Vec<Word>> for Program {
    fn from(words: Vec<Word>) -> Self {
        Self::new(words)
    }
}

impl From<&[Word]> for Program {
    fn from(words: &[Word]) -> Self {
        Self::new(words.to_vec())
    }
}

impl FromStr for Program {
    type Err = VMError;

    /// Parses comma-separated integers, possibly spread over several lines.
    ///
    /// Lines are concatenated. Blank lines, surrounding whitespace and a
    /// trailing comma at the end of a line are ignored; any other empty or
    /// non-integer token is an error.
    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let mut words = Vec::new();
        for line in source.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let line = line.strip_suffix(',').unwrap_or(line);
            for token in line.split(',') {
                let token = token.trim();
                let word = token.parse::<Word>().map_err(|_| VMError::ParseError {
                    token: token.to_string(),
                    index: words.len(),
                })?;
                words.push(word);
            }
        }
        Ok(Self::new(words))
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, word) in self.words.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", word)?;
        }
        Ok(())
    }
}
