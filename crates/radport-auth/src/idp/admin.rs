//! User management through the identity provider's admin API.
//!
//! Every operation runs under a short-lived admin credential: the service
//! account logs in, performs the call, and the credential is revoked before
//! the result is returned. Revocation happens on the failure path too, so a
//! rejected admin call never leaks a live admin token.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use url::Url;

use crate::idp::client::IdpClient;
use crate::idp::error::IdpError;
use crate::types::Role;

/// Profile fields for creating a provider-side user.
#[derive(Debug, Clone)]
pub struct NewProviderUser {
    /// Login name, conventionally the local part of the email.
    pub username: String,
    /// Email address, unique within the realm.
    pub email: String,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
}

/// Partial update applied to a provider-side user.
///
/// `None` fields are left untouched at the provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderUserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    /// Replaces the user's password when set.
    pub new_password: Option<String>,
    /// Replaces the user's platform roles when set.
    pub roles: Option<Vec<Role>>,
}

/// User representation returned by the provider's admin API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Realm role representation used by the role-mapping API.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RealmRole {
    id: String,
    name: String,
}

/// Admin tokens held for the duration of a single operation.
struct AdminCredential {
    access_token: String,
    refresh_token: Option<String>,
}

impl IdpClient {
    /// Creates a user in the realm, sets its initial password, and assigns
    /// its platform roles.
    ///
    /// Returns the provider-assigned user id.
    ///
    /// # Errors
    ///
    /// Returns an error if the admin login fails, the provider rejects the
    /// creation, or role assignment fails.
    pub async fn create_user(
        &self,
        user: &NewProviderUser,
        password: &str,
        roles: &[Role],
    ) -> Result<String, IdpError> {
        let admin = self.admin_login().await?;
        let result = self.create_user_with(&admin.access_token, user, password, roles).await;
        self.admin_logout(admin).await;
        result
    }

    /// Looks up a user by exact email address.
    ///
    /// # Errors
    ///
    /// Returns an error if the admin login or the lookup fails.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<ProviderUser>, IdpError> {
        let admin = self.admin_login().await?;
        let result = self.find_user_by_email_with(&admin.access_token, email).await;
        self.admin_logout(admin).await;
        result
    }

    /// Applies a partial update to a user: profile fields, password, and
    /// platform roles, each only when present in `update`.
    ///
    /// # Errors
    ///
    /// Returns an error if the admin login fails or any of the update calls
    /// is rejected.
    pub async fn update_user(
        &self,
        user_id: &str,
        update: &ProviderUserUpdate,
    ) -> Result<(), IdpError> {
        let admin = self.admin_login().await?;
        let result = self.update_user_with(&admin.access_token, user_id, update).await;
        self.admin_logout(admin).await;
        result
    }

    /// Deletes a user from the realm.
    ///
    /// # Errors
    ///
    /// Returns an error if the admin login fails or the provider rejects the
    /// deletion.
    pub async fn delete_user(&self, user_id: &str) -> Result<(), IdpError> {
        let admin = self.admin_login().await?;
        let result = self.delete_user_with(&admin.access_token, user_id).await;
        self.admin_logout(admin).await;
        result
    }

    /// Replaces the user's platform roles, leaving other realm roles alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the admin login fails or the provider rejects the
    /// role change.
    pub async fn assign_roles(&self, user_id: &str, roles: &[Role]) -> Result<(), IdpError> {
        let admin = self.admin_login().await?;
        let result = self.sync_roles_with(&admin.access_token, user_id, roles).await;
        self.admin_logout(admin).await;
        result
    }

    async fn admin_login(&self) -> Result<AdminCredential, IdpError> {
        debug!("Acquiring admin credential");

        let params = [
            ("grant_type", "password"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("username", self.config.admin_username.as_str()),
            ("password", self.config.admin_password.as_str()),
            ("scope", "openid"),
        ];

        let response = self.exchange(&params).await?;
        Ok(AdminCredential {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
        })
    }

    async fn admin_logout(&self, credential: AdminCredential) {
        if let Some(refresh_token) = credential.refresh_token {
            self.revoke_token(&refresh_token).await;
        }
    }

    async fn create_user_with(
        &self,
        token: &str,
        user: &NewProviderUser,
        password: &str,
        roles: &[Role],
    ) -> Result<String, IdpError> {
        let endpoint = self.admin_endpoint("users")?;
        let body = json!({
            "username": user.username,
            "email": user.email,
            "enabled": true,
            "emailVerified": true,
            "firstName": user.first_name,
            "lastName": user.last_name,
            "credentials": [{
                "type": "password",
                "value": password,
                "temporary": false,
            }],
        });

        let response = self
            .http_client
            .post(endpoint)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let response = expect_success(response).await?;

        // The provider returns the new user's URL in the Location header.
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| IdpError::MissingField("Location header".to_string()))?;
        let user_id = location
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or_default()
            .to_string();
        if user_id.is_empty() {
            return Err(IdpError::MissingField("user id in Location header".to_string()));
        }

        self.sync_roles_with(token, &user_id, roles).await?;

        info!(user_id = %user_id, username = %user.username, "Created provider user");
        Ok(user_id)
    }

    async fn find_user_by_email_with(
        &self,
        token: &str,
        email: &str,
    ) -> Result<Option<ProviderUser>, IdpError> {
        let endpoint = self.admin_endpoint("users")?;

        let response = self
            .http_client
            .get(endpoint)
            .bearer_auth(token)
            .query(&[("email", email), ("exact", "true")])
            .send()
            .await?;
        let response = expect_success(response).await?;

        let users: Vec<ProviderUser> = response.json().await.map_err(|e| {
            IdpError::TokenExchangeFailed(format!("Failed to parse user search response: {e}"))
        })?;
        Ok(users.into_iter().next())
    }

    async fn update_user_with(
        &self,
        token: &str,
        user_id: &str,
        update: &ProviderUserUpdate,
    ) -> Result<(), IdpError> {
        let mut profile = serde_json::Map::new();
        if let Some(first_name) = &update.first_name {
            profile.insert("firstName".to_string(), json!(first_name));
        }
        if let Some(last_name) = &update.last_name {
            profile.insert("lastName".to_string(), json!(last_name));
        }
        if let Some(email) = &update.email {
            profile.insert("email".to_string(), json!(email));
        }

        if !profile.is_empty() {
            let endpoint = self.admin_endpoint(&format!("users/{user_id}"))?;
            let response = self
                .http_client
                .put(endpoint)
                .bearer_auth(token)
                .json(&profile)
                .send()
                .await?;
            expect_success(response).await?;
        }

        if let Some(password) = &update.new_password {
            let endpoint = self.admin_endpoint(&format!("users/{user_id}/reset-password"))?;
            let body = json!({
                "type": "password",
                "value": password,
                "temporary": false,
            });
            let response = self
                .http_client
                .put(endpoint)
                .bearer_auth(token)
                .json(&body)
                .send()
                .await?;
            expect_success(response).await?;
        }

        if let Some(roles) = &update.roles {
            self.sync_roles_with(token, user_id, roles).await?;
        }

        debug!(user_id = %user_id, "Updated provider user");
        Ok(())
    }

    async fn delete_user_with(&self, token: &str, user_id: &str) -> Result<(), IdpError> {
        let endpoint = self.admin_endpoint(&format!("users/{user_id}"))?;

        let response = self
            .http_client
            .delete(endpoint)
            .bearer_auth(token)
            .send()
            .await?;
        expect_success(response).await?;

        info!(user_id = %user_id, "Deleted provider user");
        Ok(())
    }

    /// Replaces the user's platform role mappings with `roles`.
    ///
    /// Realm roles outside the platform namespace (provider defaults such as
    /// `offline_access`) are left untouched.
    async fn sync_roles_with(
        &self,
        token: &str,
        user_id: &str,
        roles: &[Role],
    ) -> Result<(), IdpError> {
        let mappings_endpoint =
            self.admin_endpoint(&format!("users/{user_id}/role-mappings/realm"))?;

        let response = self
            .http_client
            .get(mappings_endpoint.clone())
            .bearer_auth(token)
            .send()
            .await?;
        let response = expect_success(response).await?;
        let current: Vec<RealmRole> = response.json().await.map_err(|e| {
            IdpError::TokenExchangeFailed(format!("Failed to parse role mappings: {e}"))
        })?;

        let desired: Vec<&str> = roles.iter().map(Role::provider_name).collect();

        let stale: Vec<RealmRole> = current
            .iter()
            .filter(|mapping| {
                Role::from_provider_name(&mapping.name).is_some()
                    && !desired.contains(&mapping.name.as_str())
            })
            .cloned()
            .collect();
        if !stale.is_empty() {
            let response = self
                .http_client
                .delete(mappings_endpoint.clone())
                .bearer_auth(token)
                .json(&stale)
                .send()
                .await?;
            expect_success(response).await?;
        }

        let mut additions = Vec::new();
        for name in desired {
            if current.iter().any(|mapping| mapping.name == name) {
                continue;
            }
            let endpoint = self.admin_endpoint(&format!("roles/{name}"))?;
            let response = self.http_client.get(endpoint).bearer_auth(token).send().await?;
            let response = expect_success(response).await?;
            let role: RealmRole = response.json().await.map_err(|e| {
                IdpError::TokenExchangeFailed(format!("Failed to parse role representation: {e}"))
            })?;
            additions.push(role);
        }
        if !additions.is_empty() {
            let response = self
                .http_client
                .post(mappings_endpoint)
                .bearer_auth(token)
                .json(&additions)
                .send()
                .await?;
            expect_success(response).await?;
        }

        debug!(user_id = %user_id, roles = ?roles, "Synced provider roles");
        Ok(())
    }

    fn admin_endpoint(&self, suffix: &str) -> Result<Url, IdpError> {
        let raw = format!(
            "{}/admin/realms/{}/{}",
            self.config.base_url.as_str().trim_end_matches('/'),
            self.config.realm,
            suffix
        );
        Ok(Url::parse(&raw)?)
    }
}

async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, IdpError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(IdpError::admin_request_failed(status, body))
}
