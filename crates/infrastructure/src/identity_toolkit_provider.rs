use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use sitegate_application::IdentityProvider;
use sitegate_core::{AppError, AppResult, IdentitySelector, UserIdentity};
use sitegate_domain::CustomClaims;
use tracing::debug;

/// Largest serialized custom-claims payload the provider accepts.
pub const MAX_CUSTOM_CLAIMS_BYTES: usize = 1000;

/// Connection settings for [`IdentityToolkitProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityToolkitConfig {
    /// API origin, e.g. `https://identitytoolkit.googleapis.com`.
    pub base_url: String,
    /// Project the accounts belong to.
    pub project_id: String,
    /// Bearer token sent with every request.
    pub access_token: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountRecord {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    custom_attributes: Option<String>,
}

/// Identity provider adapter over the identity-toolkit accounts REST API.
pub struct IdentityToolkitProvider {
    http_client: reqwest::Client,
    base_url: String,
    project_id: String,
    access_token: String,
}

impl IdentityToolkitProvider {
    /// Creates an adapter with its own HTTP client.
    pub fn new(config: IdentityToolkitConfig) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|error| AppError::Internal(format!("failed to build http client: {error}")))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            project_id: config.project_id,
            access_token: config.access_token,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/v1/projects/{}/accounts:{method}",
            self.base_url, self.project_id
        )
    }

    async fn post(&self, method: &str, body: &Value) -> AppResult<Value> {
        let response = self
            .http_client
            .post(self.endpoint(method))
            .bearer_auth(self.access_token.as_str())
            .json(body)
            .send()
            .await
            .map_err(|error| {
                AppError::Internal(format!("identity provider transport error: {error}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response body unavailable>".to_owned());
            if body.contains("USER_NOT_FOUND") {
                return Err(AppError::IdentityResolution(format!(
                    "identity provider has no such account: {body}"
                )));
            }
            return Err(AppError::Internal(format!(
                "identity provider accounts:{method} failed with status {status}: {body}"
            )));
        }

        response.json::<Value>().await.map_err(|error| {
            AppError::Internal(format!(
                "identity provider returned an unreadable body: {error}"
            ))
        })
    }

    async fn lookup(&self, selector: &IdentitySelector) -> AppResult<AccountRecord> {
        let body = match selector {
            IdentitySelector::Uid(uid) => json!({ "localId": [uid] }),
            IdentitySelector::Email(email) => json!({ "email": [email] }),
        };

        let response = self.post("lookup", &body).await?;
        let account = single_account(response).map_err(|error| match error {
            AppError::NotFound(_) => {
                AppError::IdentityResolution(format!("no account matches {selector}"))
            }
            other => other,
        })?;

        debug!(uid = %account.local_id, "identity resolved");
        Ok(account)
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitProvider {
    async fn resolve_identity(&self, selector: &IdentitySelector) -> AppResult<UserIdentity> {
        let account = self.lookup(selector).await?;
        Ok(UserIdentity::new(
            account.local_id,
            account.email,
            account.display_name,
        ))
    }

    async fn custom_claims(&self, uid: &str) -> AppResult<CustomClaims> {
        let account = self
            .lookup(&IdentitySelector::Uid(uid.to_owned()))
            .await?;
        parse_custom_attributes(account.custom_attributes.as_deref())
    }

    async fn set_custom_claims(&self, uid: &str, claims: &CustomClaims) -> AppResult<()> {
        let attributes = serialize_custom_attributes(claims)?;
        self.post(
            "update",
            &json!({ "localId": uid, "customAttributes": attributes }),
        )
        .await?;

        debug!(uid = %uid, bytes = attributes.len(), "custom claims updated");
        Ok(())
    }
}

fn single_account(response: Value) -> AppResult<AccountRecord> {
    let lookup: LookupResponse = serde_json::from_value(response).map_err(|error| {
        AppError::Decode(format!("identity lookup response is malformed: {error}"))
    })?;

    let mut users = lookup.users.into_iter();
    match (users.next(), users.next()) {
        (Some(account), None) => Ok(account),
        (None, _) => Err(AppError::NotFound("account".to_owned())),
        (Some(_), Some(_)) => Err(AppError::IdentityResolution(
            "identity lookup matched more than one account".to_owned(),
        )),
    }
}

fn parse_custom_attributes(raw: Option<&str>) -> AppResult<CustomClaims> {
    match raw.map(str::trim) {
        None | Some("") => Ok(CustomClaims::default()),
        Some(raw) => serde_json::from_str(raw).map_err(|error| {
            AppError::Decode(format!("custom claims are not a valid claims object: {error}"))
        }),
    }
}

fn serialize_custom_attributes(claims: &CustomClaims) -> AppResult<String> {
    let attributes = serde_json::to_string(claims)
        .map_err(|error| AppError::Internal(format!("failed to serialize claims: {error}")))?;

    if attributes.len() > MAX_CUSTOM_CLAIMS_BYTES {
        return Err(AppError::Validation(format!(
            "custom claims are {} bytes, above the {MAX_CUSTOM_CLAIMS_BYTES} byte limit",
            attributes.len()
        )));
    }

    Ok(attributes)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use sitegate_core::AppError;
    use sitegate_domain::{CustomClaims, RoleName, UserRole};

    use super::{
        IdentityToolkitConfig, IdentityToolkitProvider, parse_custom_attributes,
        serialize_custom_attributes, single_account,
    };

    #[test]
    fn endpoint_includes_project_and_method() {
        let provider = IdentityToolkitProvider::new(IdentityToolkitConfig {
            base_url: "https://identity.example.test/".to_owned(),
            project_id: "demo".to_owned(),
            access_token: "token".to_owned(),
            timeout: Duration::from_secs(5),
        });
        let Ok(provider) = provider else {
            panic!("provider should build");
        };

        assert_eq!(
            provider.endpoint("lookup"),
            "https://identity.example.test/v1/projects/demo/accounts:lookup"
        );
    }

    #[test]
    fn lookup_response_yields_one_account() {
        let account = single_account(json!({
            "kind": "identitytoolkit#GetAccountInfoResponse",
            "users": [{
                "localId": "uid-1",
                "email": "a@x.test",
                "customAttributes": "{\"admin\":true}"
            }]
        }));
        let Ok(account) = account else {
            panic!("single account should parse");
        };

        assert_eq!(account.local_id, "uid-1");
        assert_eq!(account.email.as_deref(), Some("a@x.test"));
        assert!(account.display_name.is_none());
    }

    #[test]
    fn empty_lookup_is_not_found() {
        assert!(matches!(single_account(json!({})), Err(AppError::NotFound(_))));
    }

    #[test]
    fn missing_attributes_are_empty_claims() {
        assert_eq!(parse_custom_attributes(None).ok(), Some(CustomClaims::default()));
        assert_eq!(parse_custom_attributes(Some(" ")).ok(), Some(CustomClaims::default()));
        assert!(matches!(
            parse_custom_attributes(Some("[1]")),
            Err(AppError::Decode(_))
        ));
    }

    #[test]
    fn attributes_roundtrip_through_the_wire_string() {
        let mut claims = CustomClaims::default().with_roles(vec![UserRole {
            site_id: "site-1".to_owned(),
            role: RoleName::SiteAdmin,
            site_name: "Site One".to_owned(),
        }]);
        claims.admin = true;

        let Ok(wire) = serialize_custom_attributes(&claims) else {
            panic!("claims should serialize");
        };
        assert!(wire.contains("\"siteRoles\""));
        assert_eq!(parse_custom_attributes(Some(&wire)).ok(), Some(claims));
    }

    #[test]
    fn oversized_claims_are_rejected() {
        let roles = (0..40)
            .map(|index| UserRole {
                site_id: format!("site-{index}"),
                role: RoleName::SiteAdmin,
                site_name: format!("Site number {index}"),
            })
            .collect();
        let claims = CustomClaims::default().with_roles(roles);

        assert!(matches!(
            serialize_custom_attributes(&claims),
            Err(AppError::Validation(_))
        ));
    }
}
