use miette::Diagnostic;
use thiserror::Error;

use crate::authz::store::StoreError;

#[derive(Debug, Error, Diagnostic)]
pub enum AuthzError {
    #[error("Invalid resource identifier: {0}")]
    #[diagnostic(
        code(warden::authz::invalid_identifier),
        help("Identifiers look like `/base/path` or `/base/path?name=value&name2=value2`")
    )]
    InvalidIdentifier(String),

    #[error("Invalid input: {0}")]
    #[diagnostic(
        code(warden::authz::invalid_input),
        help("Names, descriptions, passwords and privilege values must be non-empty and unique, and references must point at existing entities")
    )]
    InvalidInput(String),

    #[error("Rule store unavailable: {0}")]
    #[diagnostic(
        code(warden::authz::rule_store_unavailable),
        help("Check the database connection configured under [database]")
    )]
    RuleStoreUnavailable(#[source] StoreError),

    #[error("Failed to load policy file `{path}`")]
    #[diagnostic(
        code(warden::authz::policy_load),
        help("Check that the file exists and contains valid KDL syntax")
    )]
    PolicyLoadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid policy: {0}")]
    #[diagnostic(
        code(warden::authz::invalid_policy),
        help("Each policy file may contain `user`, `group`, `privilege`, `resource` or `grant` KDL nodes")
    )]
    InvalidPolicy(String),

    #[error("Invalid grant: {0}")]
    #[diagnostic(
        code(warden::authz::invalid_grant),
        help("Grant syntax: grant \"privilege=value\" on=\"/resource/url\" to=\"group\"")
    )]
    InvalidGrant(String),

    #[error("Undefined {kind} `{name}`")]
    #[diagnostic(
        code(warden::authz::undefined_reference),
        help("Declare the referenced entity in one of the policy files before using it")
    )]
    UndefinedReference { kind: &'static str, name: String },

    #[error("KDL parse error: {0}")]
    #[diagnostic(
        code(warden::authz::kdl_parse),
        help("Check your KDL file syntax, see https://kdl.dev")
    )]
    KdlParse(String),

    #[error("I/O error: {0}")]
    #[diagnostic(code(warden::authz::io))]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for AuthzError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Constraint(msg) => AuthzError::InvalidInput(msg),
            other => AuthzError::RuleStoreUnavailable(other),
        }
    }
}
