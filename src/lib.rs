//! Warden - hierarchical resource authorization
//!
//! Decides whether a caller may use a resource identified by a path plus
//! `name=value` claims, using rules scoped to the caller's groups.
//! Rules live behind the [`authz::RuleStore`] trait; an in-memory and a
//! SeaORM-backed implementation are provided.

pub mod authz;
pub mod entities;
pub mod errors;
pub mod settings;
pub mod storage;
