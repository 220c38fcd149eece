//! Backing-collection abstraction for ShelfDB
//!
//! The facade treats the backing store as an opaque document collection
//! offering insert / find / multi-document update / existence probe. The
//! [`BackingCollection`] trait is that seam; [`MemoryCollection`] is the
//! bundled implementation, a Mongo-style matcher over an ordered in-memory
//! map. Production deployments substitute a driver-backed implementation
//! behind the same trait.

pub mod matcher;
pub mod memory;
pub mod traits;

pub use memory::MemoryCollection;
pub use traits::BackingCollection;
