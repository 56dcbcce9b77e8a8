//! Access and storage/linkage resolution.

mod access;
mod storage;

pub use access::AccessResolver;
pub use storage::StorageResolver;
