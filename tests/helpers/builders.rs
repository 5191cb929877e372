use warden::authz::types::{AuthorizationRule, SecurityGroup, SecurityPrivilege, SecurityUser};
use warden::authz::{RuleStore, SecurityManager};

async fn group_named<S: RuleStore + ?Sized>(
    mgr: &SecurityManager<S>,
    description: &str,
) -> SecurityGroup {
    match mgr
        .store()
        .find_group(description)
        .await
        .expect("Failed to look up group")
    {
        Some(id) => SecurityGroup { id },
        None => mgr
            .create_group(description)
            .await
            .expect("Failed to create test group"),
    }
}

/// Builder for creating test users
pub struct UserBuilder {
    user_name: String,
    password: String,
    groups: Vec<String>,
}

impl UserBuilder {
    pub fn new(user_name: &str) -> Self {
        Self {
            user_name: user_name.to_string(),
            password: "password123".to_string(),
            groups: Vec::new(),
        }
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = password.to_string();
        self
    }

    /// Add the user to a group, creating the group if needed
    pub fn in_group(mut self, group: &str) -> Self {
        self.groups.push(group.to_string());
        self
    }

    pub async fn create<S: RuleStore + ?Sized>(self, mgr: &SecurityManager<S>) -> SecurityUser {
        let user = mgr
            .create_user(&self.user_name, &self.password)
            .await
            .expect("Failed to create test user");

        for group in &self.groups {
            let group = group_named(mgr, group).await;
            mgr.add_user_to_group(&group, &user)
                .await
                .expect("Failed to add user to group");
        }

        user
    }
}

/// Builder for a rule granting `privilege=value` at a resource url to a group
pub struct GrantBuilder {
    group: String,
    privilege: String,
    value: String,
    resource_url: String,
}

impl GrantBuilder {
    pub fn new(privilege: &str, value: &str) -> Self {
        Self {
            group: "default".to_string(),
            privilege: privilege.to_string(),
            value: value.to_string(),
            resource_url: "/".to_string(),
        }
    }

    pub fn on(mut self, resource_url: &str) -> Self {
        self.resource_url = resource_url.to_string();
        self
    }

    pub fn to(mut self, group: &str) -> Self {
        self.group = group.to_string();
        self
    }

    /// Creates whatever group, privilege, value and url are missing
    pub async fn create<S: RuleStore + ?Sized>(
        self,
        mgr: &SecurityManager<S>,
    ) -> AuthorizationRule {
        let store = mgr.store();
        let group = group_named(mgr, &self.group).await;

        let privilege = match store
            .find_privilege(&self.privilege)
            .await
            .expect("Failed to look up privilege")
        {
            Some(id) => SecurityPrivilege { id },
            None => mgr
                .create_privilege(&self.privilege)
                .await
                .expect("Failed to create privilege"),
        };

        let value = match store
            .find_privilege_value(privilege.id, &self.value)
            .await
            .expect("Failed to look up privilege value")
        {
            Some(id) => id,
            None => mgr
                .create_privilege_value(&privilege, &self.value)
                .await
                .expect("Failed to create privilege value")
                .expect("Privilege vanished"),
        };

        let url = mgr
            .create_resource_url(&self.resource_url)
            .await
            .expect("Failed to register resource url");

        mgr.create_authorization_rule(&group, value, &url)
            .await
            .expect("Failed to create rule")
            .expect("Privilege value vanished")
    }
}
