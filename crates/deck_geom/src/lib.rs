//! deck_geom - MCNP/PHITS-style geometry deck resolution
//!
//! This crate ingests the surface, cell and transform sections of a
//! Monte-Carlo particle-transport geometry deck and produces a fully
//! resolved constructive solid geometry model: every macrobody expanded
//! into primitive surfaces, every `LIKE n BUT` / complement / TRCL
//! reference rewritten, every lattice FILL expanded into explicit
//! element cells, and an axis-aligned bounding box derived for every
//! resolved cell.
//!
//! The crate is engine independent: no file I/O, no rendering, no
//! persisted state. Inputs are already-joined card strings, the output
//! is an in-memory [`resolve::ResolvedModel`].
//!
//! # Example
//!
//! ```ignore
//! use deck_geom::resolve::{DeckInput, Resolver};
//!
//! let input = DeckInput::from_strings(
//!   &["1 0 -B", "2 0 B -W"],
//!   &["B rpp 0 10 0 10 0 10", "W so 50"],
//!   &[],
//! );
//! let model = Resolver::new(Default::default()).resolve(input)?;
//! for cell in &model.cells {
//!   println!("{} -> {}", cell.name, cell.bounding_box);
//! }
//! ```

pub mod constants;
pub mod error;

// Numerics: vectors/matrices with the row-vector affine convention and
// the polynomial solvers backing torus ray intersection.
pub mod math;

// Fortran-style scalar expression oracle for `{...}` card parameters.
pub mod formula;

// Card-level string utilities (brace-aware splitting, dequoting).
pub(crate) mod strings;

// TR argument list -> affine matrix.
pub mod transform;

// Primitive surfaces and the id-keyed surface registry.
pub mod surface;

// Axis-aligned bounding boxes and the plane-vector algebra above them.
pub mod bbox;

// User-level composite bodies expanded into primitive surfaces.
pub mod macrobody;

// Card parsing: surface / cell / TR cards, ijmr expansion, FILL.
pub mod input;

// Resolved cells: logical polynomial over surface ids + bounding box.
pub mod cell;

// Whole-deck orchestration.
pub mod resolve;

pub use error::{Error, Result};
pub use math::{Affine, Mat3, Point, Vector};
pub use surface::{Surface, SurfaceMap};
pub use bbox::BoundingBox;
