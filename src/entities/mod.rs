pub mod authorization_rule;
pub mod group_user;
pub mod privilege;
pub mod privilege_value;
pub mod resource_url;
pub mod security_group;
pub mod security_user;

pub use authorization_rule::Entity as AuthorizationRule;
pub use group_user::Entity as GroupUser;
pub use privilege::Entity as Privilege;
pub use privilege_value::Entity as PrivilegeValue;
pub use resource_url::Entity as ResourceUrl;
pub use security_group::Entity as SecurityGroup;
pub use security_user::Entity as SecurityUser;
