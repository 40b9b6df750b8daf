//! Utility types.

type BuildHasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

/// An insertion-ordered hash map.
///
/// Iteration order of these maps is what makes state numbering, fixpoint
/// iteration and conflict reporting reproducible across runs.
pub type Map<K, V> = indexmap::IndexMap<K, V, BuildHasher>;
pub type Set<T> = indexmap::IndexSet<T, BuildHasher>;
