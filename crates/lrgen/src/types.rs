//! Hash map/set aliases used across the crate.
//!
//! Insertion order is part of the contract: every map iterated during
//! automaton and table construction must yield a deterministic order, so
//! plain `HashMap` is not an option here.

type BuildHasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

pub type Map<K, V> = indexmap::IndexMap<K, V, BuildHasher>;
pub type Set<T> = indexmap::IndexSet<T, BuildHasher>;
