use thiserror::Error;

use crate::authz::types::{
    AuthorizationRule, Credentials, GroupId, PrivilegeId, PrivilegeValueId, ResourceUrlId, UserId,
};

/// Failure of the persistence layer behind a [`RuleStore`].
///
/// Distinct from a negative answer: a store that cannot be reached must
/// never be read as "access denied".
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    #[error("rule store lock poisoned: {0}")]
    Poisoned(String),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("constraint violated: {0}")]
    Constraint(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence collaborator of the authorization engine.
///
/// The two decision queries are all the engine needs; the remaining
/// operations back the peripheral helpers of the security manager and the
/// policy loader.
#[async_trait::async_trait]
pub trait RuleStore: Send + Sync {
    /// Exact lookup of a registered resource url. No pattern matching.
    async fn resource_url_registered(&self, url: &str) -> StoreResult<bool>;

    /// True when some group the caller belongs to holds a rule granting
    /// `claim_name = claim_value` at `url`. Unknown users, wrong passwords,
    /// unknown privileges and unknown values are all `false`.
    async fn claim_authorized(
        &self,
        url: &str,
        claim_name: &str,
        claim_value: &str,
        credentials: &Credentials,
    ) -> StoreResult<bool>;

    async fn create_group(&self, description: &str) -> StoreResult<GroupId>;

    async fn create_privilege(&self, description: &str) -> StoreResult<PrivilegeId>;

    async fn create_privilege_value(
        &self,
        privilege: PrivilegeId,
        value: &str,
    ) -> StoreResult<PrivilegeValueId>;

    /// Registers an already canonical url. Registering the same url twice
    /// returns the existing id.
    async fn create_resource_url(&self, url: &str) -> StoreResult<ResourceUrlId>;

    async fn create_user(&self, user_name: &str, password: &str) -> StoreResult<UserId>;

    async fn add_user_to_group(&self, group: GroupId, user: UserId) -> StoreResult<()>;

    async fn create_authorization_rule(&self, rule: AuthorizationRule) -> StoreResult<()>;

    async fn group_exists(&self, id: GroupId) -> StoreResult<bool>;

    async fn privilege_exists(&self, id: PrivilegeId) -> StoreResult<bool>;

    async fn privilege_value_exists(&self, id: PrivilegeValueId) -> StoreResult<bool>;

    async fn resource_url_exists(&self, id: ResourceUrlId) -> StoreResult<bool>;

    async fn user_exists(&self, id: UserId) -> StoreResult<bool>;

    async fn find_group(&self, description: &str) -> StoreResult<Option<GroupId>>;

    async fn find_privilege(&self, description: &str) -> StoreResult<Option<PrivilegeId>>;

    async fn find_privilege_value(
        &self,
        privilege: PrivilegeId,
        value: &str,
    ) -> StoreResult<Option<PrivilegeValueId>>;

    async fn find_resource_url(&self, url: &str) -> StoreResult<Option<ResourceUrlId>>;

    async fn find_user(&self, user_name: &str) -> StoreResult<Option<UserId>>;

    async fn authorization_rules(&self) -> StoreResult<Vec<AuthorizationRule>>;
}
