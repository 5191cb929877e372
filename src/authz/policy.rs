use crate::authz::errors::AuthzError;
use crate::authz::types::*;
use kdl::KdlDocument;

/// Parse a KDL document string into typed policy structs.
pub fn parse_kdl_document(source: &str) -> Result<ParsedPolicy, AuthzError> {
    let doc: KdlDocument = source
        .parse()
        .map_err(|e: kdl::KdlError| AuthzError::KdlParse(e.to_string()))?;

    let mut policy = ParsedPolicy::default();

    for node in doc.nodes() {
        match node.name().value() {
            "user" => {
                let name = first_string_arg(node).ok_or_else(|| {
                    AuthzError::InvalidPolicy(
                        "user node requires a name argument (e.g. user \"alice\" password=\"...\")"
                            .into(),
                    )
                })?;

                let password = node
                    .get("password")
                    .and_then(|v| v.as_string())
                    .ok_or_else(|| {
                        AuthzError::InvalidPolicy(format!(
                            "user `{name}` missing `password` property"
                        ))
                    })?
                    .to_string();

                policy.users.push(UserDef { name, password });
            }
            "group" => {
                let description = first_string_arg(node).ok_or_else(|| {
                    AuthzError::InvalidPolicy(
                        "group node requires a string argument (e.g. group \"engineering\")".into(),
                    )
                })?;

                let mut members = Vec::new();

                if let Some(children) = node.children() {
                    for child in children.nodes() {
                        match child.name().value() {
                            "members" => {
                                members = dash_list(child);
                            }
                            other => {
                                return Err(AuthzError::InvalidPolicy(format!(
                                    "unexpected child `{other}` in group `{description}` (expected `members`)"
                                )));
                            }
                        }
                    }
                }

                policy.groups.push(GroupDef {
                    description,
                    members,
                });
            }
            "privilege" => {
                let description = first_string_arg(node).ok_or_else(|| {
                    AuthzError::InvalidPolicy(
                        "privilege node requires a string argument (e.g. privilege \"dept\")"
                            .into(),
                    )
                })?;

                let mut values = Vec::new();

                if let Some(children) = node.children() {
                    for child in children.nodes() {
                        match child.name().value() {
                            "values" => {
                                values = dash_list(child);
                            }
                            other => {
                                return Err(AuthzError::InvalidPolicy(format!(
                                    "unexpected child `{other}` in privilege `{description}` (expected `values`)"
                                )));
                            }
                        }
                    }
                }

                policy.privileges.push(PrivilegeDef {
                    description,
                    values,
                });
            }
            "resource" => {
                let url = first_string_arg(node).ok_or_else(|| {
                    AuthzError::InvalidPolicy(
                        "resource node requires a url argument (e.g. resource \"/reports\")"
                            .into(),
                    )
                })?;
                policy.resources.push(url);
            }
            "grant" => {
                let claim = first_string_arg(node).ok_or_else(|| {
                    AuthzError::InvalidGrant(
                        "grant node requires a claim argument (e.g. grant \"dept=eng\" on=\"/reports\" to=\"engineering\")"
                            .into(),
                    )
                })?;

                let (privilege, value) = claim
                    .split_once('=')
                    .filter(|(name, value)| !name.is_empty() && !value.is_empty())
                    .ok_or_else(|| {
                        AuthzError::InvalidGrant(format!(
                            "invalid claim `{claim}` (expected \"privilege=value\")"
                        ))
                    })?;

                let on = node
                    .get("on")
                    .and_then(|v| v.as_string())
                    .ok_or_else(|| {
                        AuthzError::InvalidGrant(format!(
                            "grant `{claim}` missing `on` property (e.g. on=\"/reports\")"
                        ))
                    })?;

                let to = node
                    .get("to")
                    .and_then(|v| v.as_string())
                    .ok_or_else(|| {
                        AuthzError::InvalidGrant(format!(
                            "grant `{claim}` missing `to` property (e.g. to=\"engineering\")"
                        ))
                    })?;

                policy.grants.push(GrantDef {
                    privilege: privilege.to_string(),
                    value: value.to_string(),
                    resource_url: on.to_string(),
                    group: to.to_string(),
                });
            }
            other => {
                // Ignore comments and unknown top-level nodes with a warning
                tracing::warn!("ignoring unknown top-level KDL node `{other}`");
            }
        }
    }

    Ok(policy)
}

/// Extract the first string argument from a KDL node.
fn first_string_arg(node: &kdl::KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

/// Extract dash-list children: nodes named "-" whose first argument is a string.
/// Example KDL:
/// ```kdl
/// members {
///     - "alice"
///     - "bob"
/// }
/// ```
fn dash_list(node: &kdl::KdlNode) -> Vec<String> {
    let Some(children) = node.children() else {
        return Vec::new();
    };
    children
        .nodes()
        .iter()
        .filter(|n| n.name().value() == "-")
        .filter_map(first_string_arg)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_users_and_groups() {
        let kdl = r#"
user "alice" password="pw1"
user "bob" password="pw2"

group "engineering" {
    members {
        - "alice"
        - "bob"
    }
}
"#;
        let policy = parse_kdl_document(kdl).unwrap();
        assert_eq!(policy.users.len(), 2);
        assert_eq!(policy.users[0].name, "alice");
        assert_eq!(policy.users[0].password, "pw1");
        assert_eq!(policy.groups.len(), 1);
        assert_eq!(policy.groups[0].description, "engineering");
        assert_eq!(policy.groups[0].members, vec!["alice", "bob"]);
    }

    #[test]
    fn test_parse_privilege_and_resource() {
        let kdl = r#"
privilege "dept" {
    values {
        - "eng"
        - "ops"
    }
}
resource "/reports"
resource "/reports?dept=eng"
"#;
        let policy = parse_kdl_document(kdl).unwrap();
        assert_eq!(policy.privileges.len(), 1);
        assert_eq!(policy.privileges[0].description, "dept");
        assert_eq!(policy.privileges[0].values, vec!["eng", "ops"]);
        assert_eq!(policy.resources, vec!["/reports", "/reports?dept=eng"]);
    }

    #[test]
    fn test_parse_grant() {
        let kdl = r#"grant "dept=eng" on="/reports" to="engineering""#;
        let policy = parse_kdl_document(kdl).unwrap();
        assert_eq!(
            policy.grants,
            vec![GrantDef {
                privilege: "dept".into(),
                value: "eng".into(),
                resource_url: "/reports".into(),
                group: "engineering".into(),
            }]
        );
    }

    #[test]
    fn test_parse_grant_bad_claim() {
        let kdl = r#"grant "dept" on="/reports" to="engineering""#;
        let err = parse_kdl_document(kdl).unwrap_err();
        assert!(matches!(err, AuthzError::InvalidGrant(_)));
    }

    #[test]
    fn test_parse_grant_missing_on() {
        let kdl = r#"grant "dept=eng" to="engineering""#;
        let err = parse_kdl_document(kdl).unwrap_err();
        assert!(matches!(err, AuthzError::InvalidGrant(_)));
    }

    #[test]
    fn test_parse_user_missing_password() {
        let kdl = r#"user "alice""#;
        let err = parse_kdl_document(kdl).unwrap_err();
        assert!(matches!(err, AuthzError::InvalidPolicy(_)));
    }

    #[test]
    fn test_unexpected_group_child() {
        let kdl = r#"
group "ops" {
    owners {
        - "carol"
    }
}
"#;
        let err = parse_kdl_document(kdl).unwrap_err();
        assert!(matches!(err, AuthzError::InvalidPolicy(_)));
    }

    #[test]
    fn test_unknown_nodes_ignored() {
        let kdl = r#"
resource "/reports"
metadata "something"
"#;
        let policy = parse_kdl_document(kdl).unwrap();
        assert_eq!(policy.resources.len(), 1);
    }

    #[test]
    fn test_kdl_syntax_error() {
        let err = parse_kdl_document("resource \"unterminated").unwrap_err();
        assert!(matches!(err, AuthzError::KdlParse(_)));
    }
}
