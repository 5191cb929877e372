use crate::authz::credentials::{hash_password, verify_password};
use crate::authz::store::{RuleStore, StoreError, StoreResult};
use crate::authz::types::{
    AuthorizationRule, Credentials, GroupId, PrivilegeId, PrivilegeValueId, ResourceUrlId, UserId,
};
use crate::entities;
use crate::errors::WardenError;
use crate::settings::Database as DbCfg;
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

pub async fn init(cfg: &DbCfg) -> Result<DatabaseConnection, WardenError> {
    let db = Database::connect(&cfg.url).await?;
    Ok(db)
}

/// Apply any pending schema migrations.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), WardenError> {
    Migrator::up(db, None).await?;
    Ok(())
}

/// Rule store backed by a SeaORM connection.
#[derive(Debug, Clone)]
pub struct SqlRuleStore {
    db: DatabaseConnection,
}

impl SqlRuleStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Group ids the user is a member of.
    async fn groups_of(&self, user_id: i64) -> StoreResult<Vec<i64>> {
        use entities::group_user::{Column, Entity};

        Ok(Entity::find()
            .filter(Column::UserId.eq(user_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| m.group_id)
            .collect())
    }
}

#[async_trait::async_trait]
impl RuleStore for SqlRuleStore {
    async fn resource_url_registered(&self, url: &str) -> StoreResult<bool> {
        use entities::resource_url::{Column, Entity};

        let count = Entity::find()
            .filter(Column::Url.eq(url))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn claim_authorized(
        &self,
        url: &str,
        claim_name: &str,
        claim_value: &str,
        credentials: &Credentials,
    ) -> StoreResult<bool> {
        let Some(user) = entities::SecurityUser::find()
            .filter(entities::security_user::Column::UserName.eq(credentials.user_name.as_str()))
            .one(&self.db)
            .await?
        else {
            return Ok(false);
        };

        if !verify_password(&credentials.password, &user.password_hash)? {
            return Ok(false);
        }

        let Some(url_model) = entities::ResourceUrl::find()
            .filter(entities::resource_url::Column::Url.eq(url))
            .one(&self.db)
            .await?
        else {
            return Ok(false);
        };

        let Some(privilege) = entities::Privilege::find()
            .filter(entities::privilege::Column::Description.eq(claim_name))
            .one(&self.db)
            .await?
        else {
            return Ok(false);
        };

        let Some(value) = entities::PrivilegeValue::find()
            .filter(entities::privilege_value::Column::PrivilegeId.eq(privilege.id))
            .filter(entities::privilege_value::Column::Value.eq(claim_value))
            .one(&self.db)
            .await?
        else {
            return Ok(false);
        };

        let groups = self.groups_of(user.id).await?;
        if groups.is_empty() {
            return Ok(false);
        }

        use entities::authorization_rule::Column;
        let count = entities::AuthorizationRule::find()
            .filter(Column::GroupId.is_in(groups))
            .filter(Column::UrlId.eq(url_model.id))
            .filter(Column::PrivilegeValueId.eq(value.id))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn create_group(&self, description: &str) -> StoreResult<GroupId> {
        if self.find_group(description).await?.is_some() {
            return Err(StoreError::Constraint(format!(
                "group `{description}` already exists"
            )));
        }
        let group = entities::security_group::ActiveModel {
            description: Set(description.to_string()),
            created_at: Set(Utc::now().timestamp()),
            ..Default::default()
        };
        let model = group.insert(&self.db).await?;
        Ok(GroupId(model.id))
    }

    async fn create_privilege(&self, description: &str) -> StoreResult<PrivilegeId> {
        if self.find_privilege(description).await?.is_some() {
            return Err(StoreError::Constraint(format!(
                "privilege `{description}` already exists"
            )));
        }
        let privilege = entities::privilege::ActiveModel {
            description: Set(description.to_string()),
            ..Default::default()
        };
        let model = privilege.insert(&self.db).await?;
        Ok(PrivilegeId(model.id))
    }

    async fn create_privilege_value(
        &self,
        privilege: PrivilegeId,
        value: &str,
    ) -> StoreResult<PrivilegeValueId> {
        if !self.privilege_exists(privilege).await? {
            return Err(StoreError::Constraint(format!("no {privilege}")));
        }
        if self.find_privilege_value(privilege, value).await?.is_some() {
            return Err(StoreError::Constraint(format!(
                "value `{value}` already exists for {privilege}"
            )));
        }
        let privilege_value = entities::privilege_value::ActiveModel {
            privilege_id: Set(privilege.get()),
            value: Set(value.to_string()),
            ..Default::default()
        };
        let model = privilege_value.insert(&self.db).await?;
        Ok(PrivilegeValueId(model.id))
    }

    async fn create_resource_url(&self, url: &str) -> StoreResult<ResourceUrlId> {
        if let Some(id) = self.find_resource_url(url).await? {
            return Ok(id);
        }
        let resource_url = entities::resource_url::ActiveModel {
            url: Set(url.to_string()),
            ..Default::default()
        };
        let model = resource_url.insert(&self.db).await?;
        Ok(ResourceUrlId(model.id))
    }

    async fn create_user(&self, user_name: &str, password: &str) -> StoreResult<UserId> {
        if self.find_user(user_name).await?.is_some() {
            return Err(StoreError::Constraint(format!(
                "user `{user_name}` already exists"
            )));
        }
        let password_hash = hash_password(password)?;
        let user = entities::security_user::ActiveModel {
            user_name: Set(user_name.to_string()),
            password_hash: Set(password_hash),
            created_at: Set(Utc::now().timestamp()),
            ..Default::default()
        };
        let model = user.insert(&self.db).await?;
        Ok(UserId(model.id))
    }

    async fn add_user_to_group(&self, group: GroupId, user: UserId) -> StoreResult<()> {
        if !self.group_exists(group).await? {
            return Err(StoreError::Constraint(format!("no {group}")));
        }
        if !self.user_exists(user).await? {
            return Err(StoreError::Constraint(format!("no {user}")));
        }
        if entities::GroupUser::find_by_id((group.get(), user.get()))
            .one(&self.db)
            .await?
            .is_some()
        {
            return Ok(());
        }

        let membership = entities::group_user::ActiveModel {
            group_id: Set(group.get()),
            user_id: Set(user.get()),
        };
        membership.insert(&self.db).await?;
        Ok(())
    }

    async fn create_authorization_rule(&self, rule: AuthorizationRule) -> StoreResult<()> {
        if !self.group_exists(rule.group).await?
            || !self.resource_url_exists(rule.resource_url).await?
            || !self.privilege_value_exists(rule.privilege_value).await?
        {
            return Err(StoreError::Constraint(format!(
                "{rule} references a missing entity"
            )));
        }

        let key = (
            rule.group.get(),
            rule.resource_url.get(),
            rule.privilege_value.get(),
        );
        if entities::AuthorizationRule::find_by_id(key)
            .one(&self.db)
            .await?
            .is_some()
        {
            return Ok(());
        }

        let model = entities::authorization_rule::ActiveModel {
            group_id: Set(key.0),
            url_id: Set(key.1),
            privilege_value_id: Set(key.2),
        };
        model.insert(&self.db).await?;
        Ok(())
    }

    async fn group_exists(&self, id: GroupId) -> StoreResult<bool> {
        Ok(entities::SecurityGroup::find_by_id(id.get())
            .one(&self.db)
            .await?
            .is_some())
    }

    async fn privilege_exists(&self, id: PrivilegeId) -> StoreResult<bool> {
        Ok(entities::Privilege::find_by_id(id.get())
            .one(&self.db)
            .await?
            .is_some())
    }

    async fn privilege_value_exists(&self, id: PrivilegeValueId) -> StoreResult<bool> {
        Ok(entities::PrivilegeValue::find_by_id(id.get())
            .one(&self.db)
            .await?
            .is_some())
    }

    async fn resource_url_exists(&self, id: ResourceUrlId) -> StoreResult<bool> {
        Ok(entities::ResourceUrl::find_by_id(id.get())
            .one(&self.db)
            .await?
            .is_some())
    }

    async fn user_exists(&self, id: UserId) -> StoreResult<bool> {
        Ok(entities::SecurityUser::find_by_id(id.get())
            .one(&self.db)
            .await?
            .is_some())
    }

    async fn find_group(&self, description: &str) -> StoreResult<Option<GroupId>> {
        use entities::security_group::{Column, Entity};

        Ok(Entity::find()
            .filter(Column::Description.eq(description))
            .one(&self.db)
            .await?
            .map(|m| GroupId(m.id)))
    }

    async fn find_privilege(&self, description: &str) -> StoreResult<Option<PrivilegeId>> {
        use entities::privilege::{Column, Entity};

        Ok(Entity::find()
            .filter(Column::Description.eq(description))
            .one(&self.db)
            .await?
            .map(|m| PrivilegeId(m.id)))
    }

    async fn find_privilege_value(
        &self,
        privilege: PrivilegeId,
        value: &str,
    ) -> StoreResult<Option<PrivilegeValueId>> {
        use entities::privilege_value::{Column, Entity};

        Ok(Entity::find()
            .filter(Column::PrivilegeId.eq(privilege.get()))
            .filter(Column::Value.eq(value))
            .one(&self.db)
            .await?
            .map(|m| PrivilegeValueId(m.id)))
    }

    async fn find_resource_url(&self, url: &str) -> StoreResult<Option<ResourceUrlId>> {
        use entities::resource_url::{Column, Entity};

        Ok(Entity::find()
            .filter(Column::Url.eq(url))
            .one(&self.db)
            .await?
            .map(|m| ResourceUrlId(m.id)))
    }

    async fn find_user(&self, user_name: &str) -> StoreResult<Option<UserId>> {
        use entities::security_user::{Column, Entity};

        Ok(Entity::find()
            .filter(Column::UserName.eq(user_name))
            .one(&self.db)
            .await?
            .map(|m| UserId(m.id)))
    }

    async fn authorization_rules(&self) -> StoreResult<Vec<AuthorizationRule>> {
        use entities::authorization_rule::{Column, Entity};

        Ok(Entity::find()
            .order_by_asc(Column::GroupId)
            .order_by_asc(Column::UrlId)
            .order_by_asc(Column::PrivilegeValueId)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| AuthorizationRule {
                group: GroupId(m.group_id),
                resource_url: ResourceUrlId(m.url_id),
                privilege_value: PrivilegeValueId(m.privilege_value_id),
            })
            .collect())
    }
}
