//! Capability tokens for delegated session access
//!
//! A session owner can hand a third party a share token that grants access
//! to exactly one agent session, without disclosing their own credentials.
//! Each session has at most one live share: issuing a new one makes the old
//! token unresolvable.
//!
//! Storage is pluggable through [`ShareStore`]; [`MemoryShareStore`] is the
//! in-process implementation. Expired shares are removed by calling
//! `cleanup_expired()`; the crate runs no scheduler of its own.

pub mod error;
pub mod memory;
pub mod registry;
pub mod share;
pub mod store;

pub use error::{Result, ShareError};
pub use memory::MemoryShareStore;
pub use registry::ShareRegistry;
pub use share::{SessionShare, TOKEN_LEN, generate_token};
pub use store::{ShareStore, StoreFuture};
