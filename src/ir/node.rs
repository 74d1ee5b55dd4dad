//! IR nodes and sections

use super::op::Op;
use crate::lexer::Location;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result identifier of an IR node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Id(pub u32);

impl Id {
    /// No result / invalid identifier
    pub const NONE: Id = Id(0);

    /// First identifier handed out by a builder
    pub const FIRST: Id = Id(100);

    /// Whether this refers to a node
    pub fn is_some(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Named IR sections, written out in this order by a generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionId {
    /// Entry point declarations
    Entries,
    /// Debug strings and names
    Strings,
    /// Decorations and annotations
    Annotations,
    /// Types, constants and global variables
    Variables,
    /// Function bodies
    Functions,
    /// Scratch code (global initializers)
    Temporary,
}

impl SectionId {
    /// Number of sections
    pub const COUNT: usize = 6;

    /// All sections in output order
    pub const ALL: [SectionId; Self::COUNT] = [
        SectionId::Entries,
        SectionId::Strings,
        SectionId::Annotations,
        SectionId::Variables,
        SectionId::Functions,
        SectionId::Temporary,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// One IR instruction
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Operation
    pub op: Op,
    /// Result identifier (`Id::NONE` for side-effect-only nodes)
    pub result: Id,
    /// Result type identifier (`Id::NONE` if untyped)
    pub result_type: Id,
    /// Operand words (identifiers and literals)
    pub operands: Vec<u32>,
    /// Position within the owning section
    pub index: usize,
    /// Source location
    pub location: Location,
}

impl Node {
    /// Append a literal operand word
    pub fn add(&mut self, word: u32) -> &mut Self {
        self.operands.push(word);
        self
    }

    /// Append an identifier operand
    pub fn add_id(&mut self, id: Id) -> &mut Self {
        self.operands.push(id.0);
        self
    }

    /// Append a NUL-terminated UTF-8 string packed into little-endian words
    pub fn add_string(&mut self, s: &str) -> &mut Self {
        let bytes = s.as_bytes();
        for chunk in bytes.chunks(4) {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            self.operands.push(u32::from_le_bytes(word));
        }
        if bytes.len() % 4 == 0 {
            self.operands.push(0);
        }
        self
    }

    /// Operand `i` read as an identifier
    pub fn operand_id(&self, i: usize) -> Id {
        Id(self.operands.get(i).copied().unwrap_or(0))
    }

    /// Decode a string operand starting at word `start`
    pub fn string_at(&self, start: usize) -> String {
        let mut bytes = Vec::new();
        'words: for word in self.operands.iter().skip(start) {
            for b in word.to_le_bytes() {
                if b == 0 {
                    break 'words;
                }
                bytes.push(b);
            }
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> Node {
        Node {
            op: Op::Name,
            result: Id::NONE,
            result_type: Id::NONE,
            operands: Vec::new(),
            index: 0,
            location: Location::default(),
        }
    }

    #[test]
    fn test_string_packing() {
        let mut n = node();
        n.add_id(Id(123)).add_string("main");
        assert_eq!(n.operands.len(), 3);
        assert_eq!(n.operand_id(0), Id(123));
        assert_eq!(n.string_at(1), "main");

        let mut n = node();
        n.add_string("abcde");
        assert_eq!(n.operands.len(), 2);
        assert_eq!(n.string_at(0), "abcde");
    }
}
