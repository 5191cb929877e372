use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{} id = {}", $label, self.0)
            }
        }
    };
}

entity_id!(
    /// Identifier of a security group.
    GroupId,
    "group"
);
entity_id!(
    /// Identifier of a privilege (the claim name side of a rule).
    PrivilegeId,
    "privilege"
);
entity_id!(
    /// Identifier of one value a privilege can take.
    PrivilegeValueId,
    "privilege value"
);
entity_id!(
    /// Identifier of a registered resource url.
    ResourceUrlId,
    "resource url"
);
entity_id!(UserId, "user");

/// Caller credentials. Opaque to the engine, forwarded to the rule store.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user_name: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            password: password.into(),
        }
    }
}

// Never print the password, even in debug logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_name", &self.user_name)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A stored association permitting one privilege value at one resource url
/// for every member of one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AuthorizationRule {
    pub group: GroupId,
    pub resource_url: ResourceUrlId,
    pub privilege_value: PrivilegeValueId,
}

impl fmt::Display for AuthorizationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "authorization rule ({}; {}; {})",
            self.group, self.resource_url, self.privilege_value
        )
    }
}

// ---------- Handles returned by the security manager ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SecurityGroup {
    pub id: GroupId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SecurityPrivilege {
    pub id: PrivilegeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SecurityResourceUrl {
    pub id: ResourceUrlId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SecurityUser {
    pub id: UserId,
}

impl fmt::Display for SecurityGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "security group ({})", self.id)
    }
}

impl fmt::Display for SecurityPrivilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "security privilege ({})", self.id)
    }
}

impl fmt::Display for SecurityResourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "security resource url ({})", self.id)
    }
}

impl fmt::Display for SecurityUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "security user ({})", self.id)
    }
}

// ---------- Policy file types ----------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDef {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDef {
    pub description: String,
    /// User names
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegeDef {
    pub description: String,
    pub values: Vec<String>,
}

/// A single `grant "privilege=value" on="/url" to="group"` node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantDef {
    pub privilege: String,
    pub value: String,
    pub resource_url: String,
    pub group: String,
}

/// Intermediate result from parsing a single KDL file.
#[derive(Debug, Clone, Default)]
pub struct ParsedPolicy {
    pub users: Vec<UserDef>,
    pub groups: Vec<GroupDef>,
    pub privileges: Vec<PrivilegeDef>,
    pub resources: Vec<String>,
    pub grants: Vec<GrantDef>,
}
