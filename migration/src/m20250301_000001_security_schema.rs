use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Enable foreign keys for SQLite
        if manager.get_database_backend() == sea_orm::DatabaseBackend::Sqlite {
            manager
                .get_connection()
                .execute_unprepared("PRAGMA foreign_keys = ON")
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(SecurityUsers::Table)
                    .if_not_exists()
                    .col(pk_auto(SecurityUsers::Id))
                    .col(string_uniq(SecurityUsers::UserName))
                    .col(string(SecurityUsers::PasswordHash))
                    .col(big_integer(SecurityUsers::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SecurityGroups::Table)
                    .if_not_exists()
                    .col(pk_auto(SecurityGroups::Id))
                    .col(string_uniq(SecurityGroups::Description))
                    .col(big_integer(SecurityGroups::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GroupUsers::Table)
                    .if_not_exists()
                    .col(big_integer(GroupUsers::GroupId))
                    .col(big_integer(GroupUsers::UserId))
                    .primary_key(
                        Index::create()
                            .col(GroupUsers::GroupId)
                            .col(GroupUsers::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_users_group")
                            .from(GroupUsers::Table, GroupUsers::GroupId)
                            .to(SecurityGroups::Table, SecurityGroups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_users_user")
                            .from(GroupUsers::Table, GroupUsers::UserId)
                            .to(SecurityUsers::Table, SecurityUsers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Privileges::Table)
                    .if_not_exists()
                    .col(pk_auto(Privileges::Id))
                    .col(string_uniq(Privileges::Description))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PrivilegeValues::Table)
                    .if_not_exists()
                    .col(pk_auto(PrivilegeValues::Id))
                    .col(big_integer(PrivilegeValues::PrivilegeId))
                    .col(string(PrivilegeValues::Value))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_privilege_values_privilege")
                            .from(PrivilegeValues::Table, PrivilegeValues::PrivilegeId)
                            .to(Privileges::Table, Privileges::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // A privilege carries each value at most once
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_privilege_values_privilege_value")
                    .table(PrivilegeValues::Table)
                    .col(PrivilegeValues::PrivilegeId)
                    .col(PrivilegeValues::Value)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ResourceUrls::Table)
                    .if_not_exists()
                    .col(pk_auto(ResourceUrls::Id))
                    .col(string_uniq(ResourceUrls::Url))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AuthorizationRules::Table)
                    .if_not_exists()
                    .col(big_integer(AuthorizationRules::GroupId))
                    .col(big_integer(AuthorizationRules::UrlId))
                    .col(big_integer(AuthorizationRules::PrivilegeValueId))
                    .primary_key(
                        Index::create()
                            .col(AuthorizationRules::GroupId)
                            .col(AuthorizationRules::UrlId)
                            .col(AuthorizationRules::PrivilegeValueId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_authorization_rules_group")
                            .from(AuthorizationRules::Table, AuthorizationRules::GroupId)
                            .to(SecurityGroups::Table, SecurityGroups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_authorization_rules_url")
                            .from(AuthorizationRules::Table, AuthorizationRules::UrlId)
                            .to(ResourceUrls::Table, ResourceUrls::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_authorization_rules_privilege_value")
                            .from(
                                AuthorizationRules::Table,
                                AuthorizationRules::PrivilegeValueId,
                            )
                            .to(PrivilegeValues::Table, PrivilegeValues::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Rule lookups always go through the url first
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_authorization_rules_url")
                    .table(AuthorizationRules::Table)
                    .col(AuthorizationRules::UrlId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuthorizationRules::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ResourceUrls::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PrivilegeValues::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Privileges::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GroupUsers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SecurityGroups::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SecurityUsers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SecurityUsers {
    Table,
    Id,
    UserName,
    PasswordHash,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SecurityGroups {
    Table,
    Id,
    Description,
    CreatedAt,
}

#[derive(DeriveIden)]
enum GroupUsers {
    Table,
    GroupId,
    UserId,
}

#[derive(DeriveIden)]
enum Privileges {
    Table,
    Id,
    Description,
}

#[derive(DeriveIden)]
enum PrivilegeValues {
    Table,
    Id,
    PrivilegeId,
    Value,
}

#[derive(DeriveIden)]
enum ResourceUrls {
    Table,
    Id,
    Url,
}

#[derive(DeriveIden)]
enum AuthorizationRules {
    Table,
    GroupId,
    UrlId,
    PrivilegeValueId,
}
