//! Shared type definitions for the unipack crate
//!
//! This module contains the asset model and the hashing aliases that are used
//! across the graph builder and the code generator.

use std::path::PathBuf;

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHasher;

/// Type alias for FxHasher-based IndexMap
pub type FxIndexMap<K, V> = IndexMap<K, V, std::hash::BuildHasherDefault<FxHasher>>;

/// Type alias for FxHasher-based IndexSet
pub type FxIndexSet<T> = IndexSet<T, std::hash::BuildHasherDefault<FxHasher>>;

/// Unique identifier for a module within one build
///
/// Identities form a dense range starting at 0, assigned in discovery order.
/// The entry module is always [`ModuleId::ENTRY`]. Generated code references
/// modules exclusively through this identity, never through file paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(u32);

impl ModuleId {
    /// The identity of the entry module
    pub const ENTRY: Self = Self(0);

    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the underlying u32 value of the ModuleId
    #[inline]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Whether this is the entry module's identity
    pub const fn is_entry(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One discovered module and everything the code generator needs to emit it
///
/// Assets are created once during traversal and never mutated after their
/// dependency map is finalized. They live for the duration of one build
/// invocation; nothing is shared across builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Identity assigned at first discovery; 0 is the entry
    pub id: ModuleId,
    /// Absolute, lexically normalized path; the deduplication key
    pub source_path: PathBuf,
    /// Dependency specifiers exactly as written, in source order,
    /// duplicates preserved
    pub raw_dependencies: Vec<String>,
    /// Module code rewritten as a function body expecting call-time
    /// `require`, `module` and `exports` bindings
    pub transpiled_body: String,
    /// Specifier-as-written to resolved identity; keys are the distinct
    /// elements of `raw_dependencies` in first-occurrence order
    pub dependency_map: FxIndexMap<String, ModuleId>,
}
