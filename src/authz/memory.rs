use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::authz::credentials::{hash_password, verify_password};
use crate::authz::store::{RuleStore, StoreError, StoreResult};
use crate::authz::types::{
    AuthorizationRule, Credentials, GroupId, PrivilegeId, PrivilegeValueId, ResourceUrlId, UserId,
};

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    users: HashMap<UserId, (String, String)>,
    users_by_name: HashMap<String, UserId>,
    groups: HashMap<GroupId, String>,
    groups_by_description: HashMap<String, GroupId>,
    memberships: HashSet<(GroupId, UserId)>,
    privileges: HashMap<PrivilegeId, String>,
    privileges_by_description: HashMap<String, PrivilegeId>,
    privilege_values: HashMap<PrivilegeValueId, (PrivilegeId, String)>,
    privilege_values_by_key: HashMap<(PrivilegeId, String), PrivilegeValueId>,
    urls: HashMap<ResourceUrlId, String>,
    urls_by_value: HashMap<String, ResourceUrlId>,
    rules: BTreeSet<AuthorizationRule>,
}

impl Tables {
    fn allocate(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory rule store for tests and policy-file-only deployments.
#[derive(Debug, Default)]
pub struct MemoryRuleStore {
    tables: RwLock<Tables>,
}

impl MemoryRuleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap in an Arc for sharing.
    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

#[async_trait::async_trait]
impl RuleStore for MemoryRuleStore {
    async fn resource_url_registered(&self, url: &str) -> StoreResult<bool> {
        Ok(self.read()?.urls_by_value.contains_key(url))
    }

    async fn claim_authorized(
        &self,
        url: &str,
        claim_name: &str,
        claim_value: &str,
        credentials: &Credentials,
    ) -> StoreResult<bool> {
        // Copy what is needed out of the lock; password verification is slow
        let (user, password_hash) = {
            let tables = self.read()?;
            let Some(&user) = tables.users_by_name.get(&credentials.user_name) else {
                return Ok(false);
            };
            let Some((_, hash)) = tables.users.get(&user) else {
                return Ok(false);
            };
            (user, hash.clone())
        };

        if !verify_password(&credentials.password, &password_hash)? {
            return Ok(false);
        }

        let tables = self.read()?;
        let Some(&url_id) = tables.urls_by_value.get(url) else {
            return Ok(false);
        };
        let Some(&privilege) = tables.privileges_by_description.get(claim_name) else {
            return Ok(false);
        };
        let Some(&value) = tables
            .privilege_values_by_key
            .get(&(privilege, claim_value.to_string()))
        else {
            return Ok(false);
        };

        Ok(tables.memberships.iter().any(|&(group, member)| {
            member == user
                && tables.rules.contains(&AuthorizationRule {
                    group,
                    resource_url: url_id,
                    privilege_value: value,
                })
        }))
    }

    async fn create_group(&self, description: &str) -> StoreResult<GroupId> {
        let mut tables = self.write()?;
        if tables.groups_by_description.contains_key(description) {
            return Err(StoreError::Constraint(format!(
                "group `{description}` already exists"
            )));
        }
        let id = GroupId(tables.allocate());
        tables.groups.insert(id, description.to_string());
        tables
            .groups_by_description
            .insert(description.to_string(), id);
        Ok(id)
    }

    async fn create_privilege(&self, description: &str) -> StoreResult<PrivilegeId> {
        let mut tables = self.write()?;
        if tables.privileges_by_description.contains_key(description) {
            return Err(StoreError::Constraint(format!(
                "privilege `{description}` already exists"
            )));
        }
        let id = PrivilegeId(tables.allocate());
        tables.privileges.insert(id, description.to_string());
        tables
            .privileges_by_description
            .insert(description.to_string(), id);
        Ok(id)
    }

    async fn create_privilege_value(
        &self,
        privilege: PrivilegeId,
        value: &str,
    ) -> StoreResult<PrivilegeValueId> {
        let mut tables = self.write()?;
        if !tables.privileges.contains_key(&privilege) {
            return Err(StoreError::Constraint(format!("no {privilege}")));
        }
        let key = (privilege, value.to_string());
        if tables.privilege_values_by_key.contains_key(&key) {
            return Err(StoreError::Constraint(format!(
                "value `{value}` already exists for {privilege}"
            )));
        }
        let id = PrivilegeValueId(tables.allocate());
        tables
            .privilege_values
            .insert(id, (privilege, value.to_string()));
        tables.privilege_values_by_key.insert(key, id);
        Ok(id)
    }

    async fn create_resource_url(&self, url: &str) -> StoreResult<ResourceUrlId> {
        let mut tables = self.write()?;
        if let Some(&id) = tables.urls_by_value.get(url) {
            return Ok(id);
        }
        let id = ResourceUrlId(tables.allocate());
        tables.urls.insert(id, url.to_string());
        tables.urls_by_value.insert(url.to_string(), id);
        Ok(id)
    }

    async fn create_user(&self, user_name: &str, password: &str) -> StoreResult<UserId> {
        let password_hash = hash_password(password)?;
        let mut tables = self.write()?;
        if tables.users_by_name.contains_key(user_name) {
            return Err(StoreError::Constraint(format!(
                "user `{user_name}` already exists"
            )));
        }
        let id = UserId(tables.allocate());
        tables
            .users
            .insert(id, (user_name.to_string(), password_hash));
        tables.users_by_name.insert(user_name.to_string(), id);
        Ok(id)
    }

    async fn add_user_to_group(&self, group: GroupId, user: UserId) -> StoreResult<()> {
        let mut tables = self.write()?;
        if !tables.groups.contains_key(&group) {
            return Err(StoreError::Constraint(format!("no {group}")));
        }
        if !tables.users.contains_key(&user) {
            return Err(StoreError::Constraint(format!("no {user}")));
        }
        tables.memberships.insert((group, user));
        Ok(())
    }

    async fn create_authorization_rule(&self, rule: AuthorizationRule) -> StoreResult<()> {
        let mut tables = self.write()?;
        if !tables.groups.contains_key(&rule.group)
            || !tables.urls.contains_key(&rule.resource_url)
            || !tables.privilege_values.contains_key(&rule.privilege_value)
        {
            return Err(StoreError::Constraint(format!(
                "{rule} references a missing entity"
            )));
        }
        tables.rules.insert(rule);
        Ok(())
    }

    async fn group_exists(&self, id: GroupId) -> StoreResult<bool> {
        Ok(self.read()?.groups.contains_key(&id))
    }

    async fn privilege_exists(&self, id: PrivilegeId) -> StoreResult<bool> {
        Ok(self.read()?.privileges.contains_key(&id))
    }

    async fn privilege_value_exists(&self, id: PrivilegeValueId) -> StoreResult<bool> {
        Ok(self.read()?.privilege_values.contains_key(&id))
    }

    async fn resource_url_exists(&self, id: ResourceUrlId) -> StoreResult<bool> {
        Ok(self.read()?.urls.contains_key(&id))
    }

    async fn user_exists(&self, id: UserId) -> StoreResult<bool> {
        Ok(self.read()?.users.contains_key(&id))
    }

    async fn find_group(&self, description: &str) -> StoreResult<Option<GroupId>> {
        Ok(self.read()?.groups_by_description.get(description).copied())
    }

    async fn find_privilege(&self, description: &str) -> StoreResult<Option<PrivilegeId>> {
        Ok(self
            .read()?
            .privileges_by_description
            .get(description)
            .copied())
    }

    async fn find_privilege_value(
        &self,
        privilege: PrivilegeId,
        value: &str,
    ) -> StoreResult<Option<PrivilegeValueId>> {
        Ok(self
            .read()?
            .privilege_values_by_key
            .get(&(privilege, value.to_string()))
            .copied())
    }

    async fn find_resource_url(&self, url: &str) -> StoreResult<Option<ResourceUrlId>> {
        Ok(self.read()?.urls_by_value.get(url).copied())
    }

    async fn find_user(&self, user_name: &str) -> StoreResult<Option<UserId>> {
        Ok(self.read()?.users_by_name.get(user_name).copied())
    }

    async fn authorization_rules(&self) -> StoreResult<Vec<AuthorizationRule>> {
        Ok(self.read()?.rules.iter().copied().collect())
    }
}
