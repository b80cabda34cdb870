//! Card-level input handling: surface, cell and TR cards, the
//! `i j m r` repetition grammar, and FILL/LATTICE expansion.
//!
//! Everything here works on already-joined single-line cards; comment
//! stripping and line splicing are the reader's business, not ours.

pub mod card;
pub mod cell_card;
pub mod fill;
pub mod ijmr;
pub mod surface_card;
pub mod tr_card;

/// One card with its source position, the unit every rewriting pass
/// operates on.
#[derive(Clone, Debug, PartialEq)]
pub struct DataLine {
  pub file: String,
  pub line: u64,
  pub data: String,
}

impl DataLine {
  pub fn new(file: impl Into<String>, line: u64, data: impl Into<String>) -> DataLine {
    DataLine {
      file: file.into(),
      line,
      data: data.into(),
    }
  }

  /// Bare card without position info (generated cards).
  pub fn generated(data: impl Into<String>) -> DataLine {
    DataLine::new("<generated>", 0, data)
  }

  pub fn pos(&self) -> String {
    format!("{}:{}", self.file, self.line)
  }
}
