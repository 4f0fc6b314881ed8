//! nooc-util - Core Utilities and Foundation Types
//!
//! Foundation types shared by every phase of the Noolang compiler:
//!
//! - [`span`]: source locations ([`Span`], [`FileId`]) and the [`SourceMap`]
//!   that turns byte offsets back into file/line/column for diagnostics.
//! - [`symbol`]: interned strings. Identifiers, field names and trait names
//!   appear thousands of times during a typing run; a [`Symbol`] is a 4-byte
//!   handle with O(1) equality and hashing.
//! - [`index_vec`]: typed indices. The typer juggles several id spaces
//!   (type variables, files, scopes); newtyped indices stop them from being
//!   mixed up at compile time.
//! - [`diagnostic`]: structured error reporting with codes, notes, help
//!   hints and source snippets, collected by a [`Handler`].
//!
//! Everything here is deliberately boring: no phase-specific logic, only the
//! plumbing the phases share.

pub mod diagnostic;
pub mod error;
pub mod index_vec;
pub mod span;
pub mod symbol;

pub use diagnostic::{Diagnostic, DiagnosticBuilder, DiagnosticCode, Handler, Level, SourceSnippet};
pub use error::{SourceMapError, SourceMapResult};
pub use index_vec::{Idx, IndexVec};
pub use span::{FileId, SourceFile, SourceMap, Span};
pub use symbol::Symbol;

// Re-export commonly used hash collections
pub use rustc_hash::FxHashMap;
pub use rustc_hash::FxHashSet;
