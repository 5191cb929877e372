//! Hierarchical resource authorization.
//!
//! ```text
//! identifier ──► hierarchy ──► engine ──► RuleStore
//! (canonicalize,  (ScopeWalk)   (conjunctive   (memory / sql)
//!  split)                        claim check)
//! ```

pub mod credentials;
pub mod engine;
pub mod errors;
pub mod hierarchy;
pub mod identifier;
pub mod loader;
pub mod manager;
pub mod memory;
pub mod policy;
pub mod store;
pub mod types;

pub use errors::AuthzError;
pub use identifier::ClaimSet;
pub use manager::SecurityManager;
pub use memory::MemoryRuleStore;
pub use store::{RuleStore, StoreError};
pub use types::Credentials;
