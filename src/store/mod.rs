//! Credential persistence.
//!
//! `storage` holds the raw key/value back-ends, `token_store` the access and
//! refresh credential semantics on top of them.

pub mod storage;
pub mod token_store;

pub use storage::{CredentialStorage, DisabledStorage, FileStorage, MemoryStorage, StorageError};
pub use token_store::{Lookup, RefreshPersistence, TokenStore};
