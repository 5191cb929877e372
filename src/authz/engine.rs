use crate::authz::errors::AuthzError;
use crate::authz::hierarchy::ScopeWalk;
use crate::authz::identifier::{self, ClaimSet};
use crate::authz::store::RuleStore;
use crate::authz::types::Credentials;

/// Check a combined identifier such as `/reports?dept=eng&year=2024`.
///
/// The claims are taken from the identifier itself; the walk starts from the
/// canonical form of the full identifier.
pub async fn check_permission_url<S>(
    store: &S,
    full_url: &str,
    credentials: &Credentials,
) -> Result<bool, AuthzError>
where
    S: RuleStore + ?Sized,
{
    let resource_url = identifier::canonicalize(full_url)?;
    let (_, claims) = identifier::split(&resource_url)?;
    check_permission(store, &resource_url, &claims, credentials).await
}

/// Decide whether every claim in `claims` is granted to the caller at
/// `resource_url`.
///
/// `resource_url` is canonicalized first, the same way registrations are.
/// The most specific registered scope of `resource_url` is located first
/// (see [`ScopeWalk`]); all claims are then evaluated against that scope
/// only. One denied claim denies the whole request. An unregistered
/// identifier with no coarser scope is denied without consulting any rule.
pub async fn check_permission<S>(
    store: &S,
    resource_url: &str,
    claims: &ClaimSet,
    credentials: &Credentials,
) -> Result<bool, AuthzError>
where
    S: RuleStore + ?Sized,
{
    let resource_url = identifier::canonicalize(resource_url)?;

    for candidate in ScopeWalk::new(&resource_url) {
        if !store.resource_url_registered(candidate).await? {
            tracing::debug!(candidate, "resource url not registered, narrowing");
            continue;
        }

        for (name, value) in claims.iter() {
            if !store
                .claim_authorized(candidate, name, value, credentials)
                .await?
            {
                tracing::debug!(
                    scope = candidate,
                    claim = name,
                    user = %credentials.user_name,
                    "claim denied"
                );
                return Ok(false);
            }
        }

        tracing::debug!(
            scope = candidate,
            claims = claims.len(),
            user = %credentials.user_name,
            "access granted"
        );
        return Ok(true);
    }

    tracing::debug!(%resource_url, "no registered scope");
    Ok(false)
}
