//! Resource identifier canonicalization.
//!
//! A resource identifier is a base path, optionally followed by `?` and an
//! `&`-joined list of `name=value` claims:
//!
//! ```text
//! /reports?dept=eng&year=2024
//! └──┬───┘ └──┬───┘ └──┬────┘
//!  base     claim    claim
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::authz::errors::AuthzError;

/// Claims attached to a request: claim name -> claim value.
///
/// Names are unique. Built left to right, so a repeated name keeps its last
/// value. Iteration is ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet(BTreeMap<String, String>);

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the set with `name = value` added, replacing any previous value.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ClaimSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Normalize a raw identifier.
///
/// Surrounding whitespace is dropped, as is a `?` with nothing after it.
/// Empty `&` segments are rejected. Claim order is preserved: the hierarchy walk
/// narrows from the right, so reordering would change which scopes are tried.
pub fn canonicalize(raw: &str) -> Result<String, AuthzError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AuthzError::InvalidIdentifier(
            "identifier must not be empty".into(),
        ));
    }

    let (base, query) = match trimmed.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (trimmed, None),
    };

    if base.is_empty() {
        return Err(AuthzError::InvalidIdentifier(format!(
            "identifier `{trimmed}` has an empty base path"
        )));
    }
    if base.contains('&') {
        return Err(AuthzError::InvalidIdentifier(format!(
            "base path `{base}` must not contain `&`"
        )));
    }

    match query {
        None | Some("") => Ok(base.to_string()),
        Some(query) if query.split('&').any(str::is_empty) => {
            Err(AuthzError::InvalidIdentifier(format!(
                "identifier `{trimmed}` has an empty claim segment"
            )))
        }
        Some(query) => Ok(format!("{base}?{query}")),
    }
}

/// Split a combined identifier into its base path and claims.
///
/// Every claim segment must contain `=` and a non-empty name; only the first
/// `=` separates name from value.
pub fn split(full: &str) -> Result<(String, ClaimSet), AuthzError> {
    let canonical = canonicalize(full)?;

    let (base, claims) = match canonical.split_once('?') {
        Some((base, query)) => (base, parse_claims(query)?),
        None => (canonical.as_str(), ClaimSet::default()),
    };

    Ok((base.to_string(), claims))
}

/// Rebuild `base?name=value&...` with claims in name order.
pub fn join(base: &str, claims: &ClaimSet) -> String {
    if claims.is_empty() {
        return base.to_string();
    }
    let query: Vec<String> = claims.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{base}?{}", query.join("&"))
}

fn parse_claims(query: &str) -> Result<ClaimSet, AuthzError> {
    let mut claims = BTreeMap::new();
    for segment in query.split('&') {
        let (name, value) = segment.split_once('=').ok_or_else(|| {
            AuthzError::InvalidIdentifier(format!(
                "claim segment `{segment}` is missing `=` (expected name=value)"
            ))
        })?;
        if name.is_empty() {
            return Err(AuthzError::InvalidIdentifier(format!(
                "claim segment `{segment}` has an empty name"
            )));
        }
        claims.insert(name.to_string(), value.to_string());
    }
    Ok(ClaimSet(claims))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_bare_path() {
        let (base, claims) = split("/reports").unwrap();
        assert_eq!(base, "/reports");
        assert!(claims.is_empty());
    }

    #[test]
    fn test_split_with_claims() {
        let (base, claims) = split("/reports?dept=eng&year=2024").unwrap();
        assert_eq!(base, "/reports");
        assert_eq!(claims.len(), 2);
        assert_eq!(claims.get("dept"), Some("eng"));
        assert_eq!(claims.get("year"), Some("2024"));
    }

    #[test]
    fn test_split_duplicate_name_last_wins() {
        let (_, claims) = split("/r?x=1&x=2").unwrap();
        assert_eq!(claims.len(), 1);
        assert_eq!(claims.get("x"), Some("2"));
    }

    #[test]
    fn test_split_value_may_contain_equals() {
        let (_, claims) = split("/r?filter=a=b").unwrap();
        assert_eq!(claims.get("filter"), Some("a=b"));
    }

    #[test]
    fn test_split_empty_value_allowed() {
        let (_, claims) = split("/r?flag=").unwrap();
        assert_eq!(claims.get("flag"), Some(""));
    }

    #[test]
    fn test_split_rejects_empty() {
        assert!(matches!(split(""), Err(AuthzError::InvalidIdentifier(_))));
        assert!(matches!(split("   "), Err(AuthzError::InvalidIdentifier(_))));
    }

    #[test]
    fn test_split_rejects_segment_without_equals() {
        let err = split("/r?x=1&broken").unwrap_err();
        assert!(matches!(err, AuthzError::InvalidIdentifier(_)));
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_split_rejects_empty_name() {
        assert!(matches!(
            split("/r?=1"),
            Err(AuthzError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_split_idempotent_through_join() {
        let (base, claims) = split("/reports?year=2024&dept=eng&region=emea").unwrap();
        let rebuilt = join(&base, &claims);
        let (base2, claims2) = split(&rebuilt).unwrap();
        assert_eq!(base, base2);
        assert_eq!(claims, claims2);
    }

    #[test]
    fn test_canonicalize_trims() {
        assert_eq!(canonicalize(" /a?x=1&y=2 ").unwrap(), "/a?x=1&y=2");
        assert_eq!(canonicalize("/a?").unwrap(), "/a");
    }

    #[test]
    fn test_empty_claim_segments_rejected() {
        for raw in ["/r?x=1&&y=2", "/r?x=1&", "/r?&x=1", "/r?&"] {
            assert!(
                matches!(canonicalize(raw), Err(AuthzError::InvalidIdentifier(_))),
                "{raw}"
            );
            assert!(
                matches!(split(raw), Err(AuthzError::InvalidIdentifier(_))),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_canonicalize_preserves_claim_order() {
        assert_eq!(canonicalize("/a?z=1&a=2").unwrap(), "/a?z=1&a=2");
    }

    #[test]
    fn test_canonicalize_rejects_bad_base() {
        assert!(canonicalize("?x=1").is_err());
        assert!(canonicalize("/a&b").is_err());
    }

    #[test]
    fn test_join_orders_by_name() {
        let claims = ClaimSet::new().with("year", "2024").with("dept", "eng");
        assert_eq!(join("/reports", &claims), "/reports?dept=eng&year=2024");
        assert_eq!(join("/reports", &ClaimSet::new()), "/reports");
    }

    #[test]
    fn test_claim_set_from_iter() {
        let claims: ClaimSet = vec![("a", "1"), ("b", "2"), ("a", "3")].into_iter().collect();
        assert_eq!(claims.len(), 2);
        assert_eq!(claims.get("a"), Some("3"));
    }
}
