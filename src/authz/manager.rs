use std::sync::Arc;

use crate::authz::engine;
use crate::authz::errors::AuthzError;
use crate::authz::identifier::{self, ClaimSet};
use crate::authz::store::RuleStore;
use crate::authz::types::*;

/// Entry point of the authorization subsystem.
///
/// Wraps an injected [`RuleStore`]: decisions go through the engine, entity
/// creation and lookup are validated and delegated to the store. Holds no
/// state of its own, so clones are cheap and can be shared across tasks.
#[derive(Debug)]
pub struct SecurityManager<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for SecurityManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> SecurityManager<S>
where
    S: RuleStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Check a combined identifier, e.g. `/reports?dept=eng`.
    pub async fn check_permission(
        &self,
        full_url: &str,
        user_name: &str,
        password: &str,
    ) -> Result<bool, AuthzError> {
        let credentials = Credentials::new(user_name, password);
        engine::check_permission_url(self.store.as_ref(), full_url, &credentials).await
    }

    /// Check an explicit claim set against `resource_url`, which is
    /// canonicalized like a registration.
    pub async fn check_permission_with_claims(
        &self,
        resource_url: &str,
        claims: &ClaimSet,
        user_name: &str,
        password: &str,
    ) -> Result<bool, AuthzError> {
        let credentials = Credentials::new(user_name, password);
        engine::check_permission(self.store.as_ref(), resource_url, claims, &credentials).await
    }

    pub async fn create_group(&self, description: &str) -> Result<SecurityGroup, AuthzError> {
        validate("group description", description)?;
        let id = self.store.create_group(description).await?;
        let group = SecurityGroup { id };
        tracing::info!("{group} is created");
        Ok(group)
    }

    pub async fn create_privilege(
        &self,
        description: &str,
    ) -> Result<SecurityPrivilege, AuthzError> {
        validate("privilege description", description)?;
        let id = self.store.create_privilege(description).await?;
        let privilege = SecurityPrivilege { id };
        tracing::info!("{privilege} is created");
        Ok(privilege)
    }

    /// Add an allowed value to a privilege. Returns `None` when the privilege
    /// does not exist.
    pub async fn create_privilege_value(
        &self,
        privilege: &SecurityPrivilege,
        value: &str,
    ) -> Result<Option<PrivilegeValueId>, AuthzError> {
        validate("privilege value", value)?;
        if !self.store.privilege_exists(privilege.id).await? {
            tracing::info!("Can't create value `{value}` for missing {}", privilege.id);
            return Ok(None);
        }
        let id = self.store.create_privilege_value(privilege.id, value).await?;
        tracing::info!(value, "{id} is created for {}", privilege.id);
        Ok(Some(id))
    }

    /// Register a resource url in canonical form.
    pub async fn create_resource_url(
        &self,
        resource_url: &str,
    ) -> Result<SecurityResourceUrl, AuthzError> {
        let canonical = identifier::canonicalize(resource_url)?;
        let id = self.store.create_resource_url(&canonical).await?;
        let url = SecurityResourceUrl { id };
        tracing::info!(url = %canonical, "{url} is created");
        Ok(url)
    }

    pub async fn create_user(
        &self,
        user_name: &str,
        password: &str,
    ) -> Result<SecurityUser, AuthzError> {
        validate("user name", user_name)?;
        validate("password", password)?;
        let id = self.store.create_user(user_name, password).await?;
        let user = SecurityUser { id };
        tracing::info!("{user} is created");
        Ok(user)
    }

    pub async fn add_user_to_group(
        &self,
        group: &SecurityGroup,
        user: &SecurityUser,
    ) -> Result<(), AuthzError> {
        self.store.add_user_to_group(group.id, user.id).await?;
        tracing::info!("{user} added to {group}");
        Ok(())
    }

    /// Returns `None` when the privilege value does not exist.
    pub async fn create_authorization_rule(
        &self,
        group: &SecurityGroup,
        privilege_value: PrivilegeValueId,
        resource_url: &SecurityResourceUrl,
    ) -> Result<Option<AuthorizationRule>, AuthzError> {
        if !self.store.privilege_value_exists(privilege_value).await? {
            tracing::info!(
                "Can't create an authorization rule with: {}; {}; {}",
                group.id,
                privilege_value,
                resource_url.id
            );
            return Ok(None);
        }

        let rule = AuthorizationRule {
            group: group.id,
            resource_url: resource_url.id,
            privilege_value,
        };
        self.store.create_authorization_rule(rule).await?;
        tracing::info!("{rule} is created");
        Ok(Some(rule))
    }

    pub async fn get_group(&self, id: i64) -> Result<Option<SecurityGroup>, AuthzError> {
        let id = GroupId(id);
        if self.store.group_exists(id).await? {
            Ok(Some(SecurityGroup { id }))
        } else {
            tracing::info!("The {id} doesn't exist");
            Ok(None)
        }
    }

    pub async fn get_privilege(&self, id: i64) -> Result<Option<SecurityPrivilege>, AuthzError> {
        let id = PrivilegeId(id);
        if self.store.privilege_exists(id).await? {
            Ok(Some(SecurityPrivilege { id }))
        } else {
            tracing::info!("The {id} doesn't exist");
            Ok(None)
        }
    }

    pub async fn get_resource_url(
        &self,
        id: i64,
    ) -> Result<Option<SecurityResourceUrl>, AuthzError> {
        let id = ResourceUrlId(id);
        if self.store.resource_url_exists(id).await? {
            Ok(Some(SecurityResourceUrl { id }))
        } else {
            tracing::info!("The {id} doesn't exist");
            Ok(None)
        }
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<SecurityUser>, AuthzError> {
        let id = UserId(id);
        if self.store.user_exists(id).await? {
            Ok(Some(SecurityUser { id }))
        } else {
            tracing::info!("The {id} doesn't exist");
            Ok(None)
        }
    }

    pub async fn authorization_rules(&self) -> Result<Vec<AuthorizationRule>, AuthzError> {
        Ok(self.store.authorization_rules().await?)
    }
}

fn validate(what: &str, value: &str) -> Result<(), AuthzError> {
    if value.trim().is_empty() {
        return Err(AuthzError::InvalidInput(format!("{what} must not be empty")));
    }
    Ok(())
}
