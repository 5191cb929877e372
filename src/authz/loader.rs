use std::path::Path;

use crate::authz::errors::AuthzError;
use crate::authz::identifier;
use crate::authz::manager::SecurityManager;
use crate::authz::policy::parse_kdl_document;
use crate::authz::store::RuleStore;
use crate::authz::types::*;

/// Counts of what a policy load touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolicySummary {
    pub files: usize,
    pub users: usize,
    pub groups: usize,
    pub privileges: usize,
    pub resources: usize,
    pub grants: usize,
}

/// Parse every `.kdl` file in `dir` (in file name order).
pub fn read_policies(dir: &Path) -> Result<Vec<ParsedPolicy>, AuthzError> {
    if !dir.is_dir() {
        return Err(AuthzError::InvalidPolicy(format!(
            "policies directory `{}` does not exist or is not a directory",
            dir.display()
        )));
    }

    let mut entries: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == "kdl")
                .unwrap_or(false)
        })
        .collect();
    entries.sort_by_key(|e| e.path());

    let mut all_parsed = Vec::with_capacity(entries.len());
    for entry in entries {
        let path = entry.path();
        let contents =
            std::fs::read_to_string(&path).map_err(|source| AuthzError::PolicyLoadError {
                path: path.display().to_string(),
                source,
            })?;
        all_parsed.push(parse_kdl_document(&contents)?);
    }

    Ok(all_parsed)
}

/// Load all `.kdl` policy files from `dir` into the manager's store.
pub async fn load_policies<S>(
    manager: &SecurityManager<S>,
    dir: &Path,
) -> Result<PolicySummary, AuthzError>
where
    S: RuleStore + ?Sized,
{
    let parsed = read_policies(dir)?;
    let files = parsed.len();
    let summary = PolicySummary {
        files,
        ..apply_policies(manager, parsed).await?
    };

    tracing::info!(
        files = summary.files,
        users = summary.users,
        groups = summary.groups,
        privileges = summary.privileges,
        resources = summary.resources,
        grants = summary.grants,
        "Loaded authorization policies"
    );

    Ok(summary)
}

/// Merge parsed policies and write them to the store.
///
/// Entities are applied kind by kind so references may point at entities
/// declared later or in another file. Entities that already exist are
/// reused, which makes re-applying the same policies a no-op.
pub async fn apply_policies<S>(
    manager: &SecurityManager<S>,
    parsed: Vec<ParsedPolicy>,
) -> Result<PolicySummary, AuthzError>
where
    S: RuleStore + ?Sized,
{
    let mut merged = ParsedPolicy::default();
    for p in parsed {
        merged.users.extend(p.users);
        merged.groups.extend(p.groups);
        merged.privileges.extend(p.privileges);
        merged.resources.extend(p.resources);
        merged.grants.extend(p.grants);
    }

    let store = manager.store();

    for user in &merged.users {
        if store.find_user(&user.name).await?.is_none() {
            manager.create_user(&user.name, &user.password).await?;
        }
    }

    for group in &merged.groups {
        let group_handle = match store.find_group(&group.description).await? {
            Some(id) => SecurityGroup { id },
            None => manager.create_group(&group.description).await?,
        };
        for member in &group.members {
            let id = store
                .find_user(member)
                .await?
                .ok_or_else(|| AuthzError::UndefinedReference {
                    kind: "user",
                    name: member.clone(),
                })?;
            manager
                .add_user_to_group(&group_handle, &SecurityUser { id })
                .await?;
        }
    }

    for privilege in &merged.privileges {
        let handle = match store.find_privilege(&privilege.description).await? {
            Some(id) => SecurityPrivilege { id },
            None => manager.create_privilege(&privilege.description).await?,
        };
        for value in &privilege.values {
            if store.find_privilege_value(handle.id, value).await?.is_none() {
                manager.create_privilege_value(&handle, value).await?;
            }
        }
    }

    for url in &merged.resources {
        manager.create_resource_url(url).await?;
    }

    for grant in &merged.grants {
        let group = store
            .find_group(&grant.group)
            .await?
            .ok_or_else(|| AuthzError::UndefinedReference {
                kind: "group",
                name: grant.group.clone(),
            })?;
        let privilege = store
            .find_privilege(&grant.privilege)
            .await?
            .ok_or_else(|| AuthzError::UndefinedReference {
                kind: "privilege",
                name: grant.privilege.clone(),
            })?;
        let value = store
            .find_privilege_value(privilege, &grant.value)
            .await?
            .ok_or_else(|| AuthzError::UndefinedReference {
                kind: "privilege value",
                name: format!("{}={}", grant.privilege, grant.value),
            })?;
        let canonical = identifier::canonicalize(&grant.resource_url)?;
        let url = store
            .find_resource_url(&canonical)
            .await?
            .ok_or_else(|| AuthzError::UndefinedReference {
                kind: "resource",
                name: canonical.clone(),
            })?;

        manager
            .create_authorization_rule(
                &SecurityGroup { id: group },
                value,
                &SecurityResourceUrl { id: url },
            )
            .await?;
    }

    Ok(PolicySummary {
        files: 0,
        users: merged.users.len(),
        groups: merged.groups.len(),
        privileges: merged.privileges.len(),
        resources: merged.resources.len(),
        grants: merged.grants.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::memory::MemoryRuleStore;

    const REPORTS_POLICY: &str = r#"
user "alice" password="pw"
user "bob" password="pw"

group "engineering" {
    members {
        - "alice"
    }
}

privilege "dept" {
    values {
        - "eng"
        - "ops"
    }
}
privilege "year" {
    values {
        - "2024"
    }
}

resource "/reports"

grant "dept=eng" on="/reports" to="engineering"
"#;

    fn manager() -> SecurityManager<MemoryRuleStore> {
        SecurityManager::new(MemoryRuleStore::new().shared())
    }

    #[tokio::test]
    async fn test_apply_and_check() {
        let mgr = manager();
        let parsed = vec![parse_kdl_document(REPORTS_POLICY).unwrap()];
        let summary = apply_policies(&mgr, parsed).await.unwrap();
        assert_eq!(summary.users, 2);
        assert_eq!(summary.grants, 1);

        assert!(mgr
            .check_permission("/reports?dept=eng", "alice", "pw")
            .await
            .unwrap());
        // bob is not in engineering
        assert!(!mgr
            .check_permission("/reports?dept=eng", "bob", "pw")
            .await
            .unwrap());
        // year=2024 is never granted
        assert!(!mgr
            .check_permission("/reports?dept=eng&year=2024", "alice", "pw")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_apply_twice_is_idempotent() {
        let mgr = manager();
        for _ in 0..2 {
            let parsed = vec![parse_kdl_document(REPORTS_POLICY).unwrap()];
            apply_policies(&mgr, parsed).await.unwrap();
        }
        assert_eq!(mgr.authorization_rules().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_grant_to_undefined_group() {
        let mgr = manager();
        let parsed = vec![parse_kdl_document(
            r#"
privilege "dept" {
    values {
        - "eng"
    }
}
resource "/reports"
grant "dept=eng" on="/reports" to="nobody"
"#,
        )
        .unwrap()];
        let err = apply_policies(&mgr, parsed).await.unwrap_err();
        assert!(matches!(
            err,
            AuthzError::UndefinedReference { kind: "group", .. }
        ));
    }

    #[tokio::test]
    async fn test_member_must_be_declared() {
        let mgr = manager();
        let parsed = vec![parse_kdl_document(
            r#"
group "ops" {
    members {
        - "ghost"
    }
}
"#,
        )
        .unwrap()];
        let err = apply_policies(&mgr, parsed).await.unwrap_err();
        assert!(matches!(
            err,
            AuthzError::UndefinedReference { kind: "user", .. }
        ));
    }

    #[tokio::test]
    async fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();

        // Grants in one file may reference entities from another
        std::fs::write(
            dir.path().join("10_people.kdl"),
            r#"
user "carol" password="pw"
group "finance" {
    members {
        - "carol"
    }
}
"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("20_invoices.kdl"),
            r#"
privilege "action" {
    values {
        - "view"
    }
}
resource "/invoices"
grant "action=view" on="/invoices" to="finance"
"#,
        )
        .unwrap();
        // Also write a non-KDL file that should be ignored
        std::fs::write(dir.path().join("README.md"), "not a policy").unwrap();

        let mgr = manager();
        let summary = load_policies(&mgr, dir.path()).await.unwrap();
        assert_eq!(summary.files, 2);
        assert_eq!(summary.grants, 1);

        assert!(mgr
            .check_permission("/invoices?action=view", "carol", "pw")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_load_nonexistent_directory() {
        let mgr = manager();
        let err = load_policies(&mgr, Path::new("/nonexistent/path"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::InvalidPolicy(_)));
    }
}
