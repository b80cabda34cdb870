//! The closed error set of the resolution pipeline.
//!
//! Every fallible operation in this crate returns [`Result`]. Parse
//! errors carry exact `file:line` context; cooperative aborts
//! (`Timeout` / `Cancelled`) and the memory guard surface as their own
//! variants so the caller can map them to distinct exit codes.

/// Everything that can go wrong between raw cards and a resolved model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
  /// Syntactic failure in a surface or cell card.
  #[error("{file}:{line} bad card: {what}")]
  BadCard {
    file: String,
    line: u64,
    what: String,
  },

  /// Surface mnemonic not in the registered set.
  #[error("unknown surface symbol \"{0}\"")]
  UnknownSymbol(String),

  /// Surface id already registered.
  #[error("surface id {0} is already registered")]
  DuplicateId(i32),

  /// Surface or TR name already registered.
  #[error("\"{0}\" is already defined")]
  DuplicateName(String),

  /// A TRCL/TRSF references a TR number that was never defined.
  #[error("TR{0} is used but not defined")]
  UndefinedTr(usize),

  /// Cycle in the cell dependency graph (like / complement / fill).
  #[error("circular cell reference involving {}", .0.join(", "))]
  CircularReference(Vec<String>),

  /// A lattice extends without bound inside its outer cell.
  #[error("infinite lattice")]
  InfiniteLattice,

  /// A computed dimension declarator exceeds the index cap.
  #[error("lattice dimension declarator exceeds the maximum index")]
  ExcessMaxIndex,

  /// The timeout flag tripped inside a bounding-box routine.
  #[error("bounding box computation timed out")]
  Timeout,

  /// The cancel flag tripped during FILL expansion.
  #[error("resolution cancelled")]
  Cancelled,

  /// The plane-vector merge would exceed the memory budget.
  #[error("plane-vector merge refused: not enough available memory")]
  OutOfMemory,

  /// Out-of-domain arithmetic in the expression oracle.
  #[error("numeric domain error: {0}")]
  NumericDomain(String),

  /// Geometrically meaningless input (collinear plane points, zero
  /// torus radius, non-orthogonal REC axes, ...).
  #[error("degenerate geometry: {0}")]
  DegenerateGeometry(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
  /// Attach `file:line` context to a raw parse failure.
  pub fn bad_card(file: impl Into<String>, line: u64, what: impl Into<String>) -> Self {
    Error::BadCard {
      file: file.into(),
      line,
      what: what.into(),
    }
  }

  /// Process exit code mandated for this error kind.
  pub fn exit_code(&self) -> i32 {
    match self {
      Error::BadCard { .. }
      | Error::UnknownSymbol(_)
      | Error::DuplicateId(_)
      | Error::DuplicateName(_)
      | Error::UndefinedTr(_)
      | Error::NumericDomain(_) => 1,
      Error::CircularReference(_) => 2,
      Error::DegenerateGeometry(_) => 3,
      Error::InfiniteLattice | Error::ExcessMaxIndex | Error::Timeout => 4,
      Error::OutOfMemory => 5,
      Error::Cancelled => 6,
    }
  }
}
