//! Auth collaborator: GoTrue-style session endpoints plus the admin user
//! directory.
//!
//! The client owns the current session and notifies registered listeners on
//! every change (sign-in, sign-out, refresh). Listeners are invoked with the
//! state as read at notification time — asynchronous callers must never
//! compare against a session value they captured earlier.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use url::Url;

use crate::config::Config;
use crate::types::{NewUser, UserPatch, UserRecord, UserStatus};

/// Refresh proactively once remaining session lifetime drops below an hour.
pub const SESSION_REFRESH_THRESHOLD_SECS: i64 = 3600;

// ---------------------------------------------------------------------------
// Session types
// ---------------------------------------------------------------------------

/// The authenticated identity carried by a session. `role` and `department`
/// are identity-provider metadata, not first-class columns.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub department: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether the session should be refreshed proactively.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now < Duration::seconds(SESSION_REFRESH_THRESHOLD_SECS)
    }
}

/// Per-session capability object, resolved once from the role metadata.
/// Consumers branch on these flags, never on an API call happening to fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub can_list_user_emails: bool,
    pub can_create_users: bool,
    pub can_edit_users: bool,
    pub can_delete_users: bool,
}

impl Capabilities {
    pub fn for_session(session: &Session) -> Self {
        let elevated = matches!(
            session
                .user
                .role
                .as_deref()
                .map(|r| r.trim().to_lowercase())
                .as_deref(),
            Some("admin") | Some("service_role")
        );
        Self {
            can_list_user_emails: elevated,
            can_create_users: elevated,
            can_edit_users: elevated,
            can_delete_users: elevated,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("auth service error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("no active session")]
    NotAuthenticated,
    #[error("session expired or revoked")]
    SessionExpired,
    #[error("operation requires elevated privileges")]
    Forbidden,
    #[error("could not decode auth response: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Admin user directory seam
// ---------------------------------------------------------------------------

/// Privileged user-management surface of the identity provider. A trait so
/// the user repository can be exercised without the hosted service.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn list_users(&self) -> Result<Vec<UserRecord>, AuthError>;
    async fn create_user(&self, user: &NewUser) -> Result<UserRecord, AuthError>;
    async fn update_user(&self, id: &str, patch: &UserPatch) -> Result<UserRecord, AuthError>;
    async fn delete_user(&self, id: &str) -> Result<(), AuthError>;
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub type SessionListener = Box<dyn Fn(Option<&Session>) + Send + Sync>;

pub struct AuthClient {
    http: reqwest::Client,
    base: Url,
    key: String,
    current: RwLock<Option<Session>>,
    listeners: Mutex<Vec<SessionListener>>,
}

impl AuthClient {
    pub fn new(base_url: &str, key: impl Into<String>) -> Result<Self, AuthError> {
        let base = Url::parse(base_url)
            .map_err(|e| AuthError::Decode(format!("invalid auth URL {}: {}", base_url, e)))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base,
            key: key.into(),
            current: RwLock::new(None),
            listeners: Mutex::new(Vec::new()),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AuthError> {
        Self::new(&config.store_url, config.store_key.clone())
    }

    pub fn current_session(&self) -> Option<Session> {
        self.current.read().clone()
    }

    /// Register a session-change listener. Fired on sign-in, sign-out, and
    /// refresh, always with the state as of the notification.
    pub fn on_session_change(&self, listener: SessionListener) {
        self.listeners.lock().push(listener);
    }

    fn replace_session(&self, session: Option<Session>) {
        *self.current.write() = session;
        self.notify();
    }

    fn notify(&self) {
        // Read the state at call time; never hand listeners a stale capture.
        let snapshot = self.current.read().clone();
        for listener in self.listeners.lock().iter() {
            listener(snapshot.as_ref());
        }
    }

    fn auth_url(&self, path: &str) -> Result<Url, AuthError> {
        self.base
            .join(&format!("auth/v1/{}", path))
            .map_err(|e| AuthError::Decode(format!("invalid auth path {}: {}", path, e)))
    }

    /// Authenticate with email + password and make the result the current
    /// session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let mut url = self.auth_url("token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let resp = self
            .http
            .post(url)
            .header("apikey", &self.key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            if status.as_u16() == 400 && body.contains("Invalid login credentials") {
                return Err(AuthError::InvalidCredentials);
            }
            return Err(api_error(status.as_u16(), &body));
        }

        let body: Value = resp.json().await?;
        let session = session_from_value(&body)?;
        log::info!("signed in as {}", session.user.email.as_deref().unwrap_or(&session.user.id));
        self.replace_session(Some(session.clone()));
        Ok(session)
    }

    /// End the current session. Local state is cleared even when the revoke
    /// call fails — the failure is still reported.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let previous = self.current.write().take();
        self.notify();

        let Some(session) = previous else {
            return Ok(());
        };

        let url = self.auth_url("logout")?;
        let resp = self
            .http
            .post(url)
            .header("apikey", &self.key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            log::warn!("sign-out revoke failed with status {}: {}", status, body);
            return Err(api_error(status, &body));
        }
        Ok(())
    }

    /// Exchange the refresh token for a new session. An expired or revoked
    /// refresh token clears the session.
    pub async fn refresh(&self) -> Result<Session, AuthError> {
        let refresh_token = self
            .current
            .read()
            .as_ref()
            .and_then(|s| s.refresh_token.clone())
            .ok_or(AuthError::NotAuthenticated)?;

        let mut url = self.auth_url("token")?;
        url.query_pairs_mut()
            .append_pair("grant_type", "refresh_token");

        let resp = self
            .http
            .post(url)
            .header("apikey", &self.key)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            if body.contains("invalid_grant") || body.contains("Invalid Refresh Token") {
                log::warn!("refresh token rejected; clearing session");
                self.replace_session(None);
                return Err(AuthError::SessionExpired);
            }
            return Err(api_error(status.as_u16(), &body));
        }

        let body: Value = resp.json().await?;
        let session = session_from_value(&body)?;
        self.replace_session(Some(session.clone()));
        Ok(session)
    }

    /// Return a session that is good for at least the refresh threshold,
    /// refreshing proactively when needed.
    pub async fn ensure_fresh(&self) -> Result<Session, AuthError> {
        let session = self.current_session().ok_or(AuthError::NotAuthenticated)?;
        if session.needs_refresh(Utc::now()) {
            self.refresh().await
        } else {
            Ok(session)
        }
    }

    fn bearer(&self) -> Result<String, AuthError> {
        self.current
            .read()
            .as_ref()
            .map(|s| s.access_token.clone())
            .ok_or(AuthError::NotAuthenticated)
    }

    #[cfg(test)]
    pub(crate) fn install_session(&self, session: Option<Session>) {
        self.replace_session(session);
    }
}

// ---------------------------------------------------------------------------
// Admin user directory over /auth/v1/admin/users
// ---------------------------------------------------------------------------

#[async_trait]
impl UserDirectory for AuthClient {
    async fn list_users(&self) -> Result<Vec<UserRecord>, AuthError> {
        let url = self.auth_url("admin/users")?;
        let resp = self
            .http
            .get(url)
            .header("apikey", &self.key)
            .bearer_auth(self.bearer()?)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }

        let body: Value = resp.json().await?;
        let raw_users = body["users"]
            .as_array()
            .or_else(|| body.as_array())
            .cloned()
            .unwrap_or_default();

        Ok(raw_users.iter().filter_map(admin_user_record).collect())
    }

    async fn create_user(&self, user: &NewUser) -> Result<UserRecord, AuthError> {
        let url = self.auth_url("admin/users")?;
        let payload = json!({
            "email": user.email,
            "password": user.password,
            "email_confirm": true,
            "user_metadata": {
                "full_name": user.name,
                "department": user.department,
                "role": user.role,
                "status": user.status.as_str(),
            },
        });

        let resp = self
            .http
            .post(url)
            .header("apikey", &self.key)
            .bearer_auth(self.bearer()?)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }

        let body: Value = resp.json().await?;
        admin_user_record(&body)
            .ok_or_else(|| AuthError::Decode("create reply had no user id".to_string()))
    }

    async fn update_user(&self, id: &str, patch: &UserPatch) -> Result<UserRecord, AuthError> {
        let url = self.auth_url(&format!("admin/users/{}", id))?;

        let mut metadata = serde_json::Map::new();
        if let Some(ref v) = patch.name {
            metadata.insert("full_name".to_string(), json!(v));
        }
        if let Some(ref v) = patch.department {
            metadata.insert("department".to_string(), json!(v));
        }
        if let Some(ref v) = patch.role {
            metadata.insert("role".to_string(), json!(v));
        }
        if let Some(v) = patch.status {
            metadata.insert("status".to_string(), json!(v.as_str()));
        }

        let mut payload = serde_json::Map::new();
        if !metadata.is_empty() {
            payload.insert("user_metadata".to_string(), Value::Object(metadata));
        }
        if let Some(ref password) = patch.password {
            payload.insert("password".to_string(), json!(password));
        }

        let resp = self
            .http
            .put(url)
            .header("apikey", &self.key)
            .bearer_auth(self.bearer()?)
            .json(&Value::Object(payload))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }

        let body: Value = resp.json().await?;
        admin_user_record(&body)
            .ok_or_else(|| AuthError::Decode("update reply had no user id".to_string()))
    }

    async fn delete_user(&self, id: &str) -> Result<(), AuthError> {
        let url = self.auth_url(&format!("admin/users/{}", id))?;
        let resp = self
            .http
            .delete(url)
            .header("apikey", &self.key)
            .bearer_auth(self.bearer()?)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Response mapping
// ---------------------------------------------------------------------------

fn api_error(status: u16, body: &str) -> AuthError {
    if status == 401 || status == 403 {
        return AuthError::Forbidden;
    }
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["msg", "message", "error_description", "error"]
                .iter()
                .find_map(|key| v[key].as_str().map(|s| s.to_string()))
        })
        .unwrap_or_else(|| body.to_string());
    AuthError::Api { status, message }
}

fn session_from_value(body: &Value) -> Result<Session, AuthError> {
    let access_token = body["access_token"]
        .as_str()
        .ok_or_else(|| AuthError::Decode("no access_token in response".to_string()))?
        .to_string();

    let expires_at = body["expires_at"]
        .as_i64()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .unwrap_or_else(|| {
            let expires_in = body["expires_in"].as_i64().unwrap_or(3600);
            Utc::now() + Duration::seconds(expires_in)
        });

    let user = auth_user_from_value(&body["user"])
        .ok_or_else(|| AuthError::Decode("no user in response".to_string()))?;

    Ok(Session {
        access_token,
        refresh_token: body["refresh_token"].as_str().map(|s| s.to_string()),
        expires_at,
        user,
    })
}

fn auth_user_from_value(value: &Value) -> Option<AuthUser> {
    let id = value["id"].as_str()?.to_string();
    let meta = &value["user_metadata"];
    Some(AuthUser {
        id,
        email: value["email"].as_str().map(|s| s.to_string()),
        name: meta["full_name"]
            .as_str()
            .or_else(|| meta["name"].as_str())
            .map(|s| s.to_string()),
        department: meta["department"].as_str().map(|s| s.to_string()),
        role: meta["role"]
            .as_str()
            .or_else(|| value["app_metadata"]["role"].as_str())
            .map(|s| s.to_string()),
    })
}

/// Map an admin-API user object onto the table shape.
fn admin_user_record(value: &Value) -> Option<UserRecord> {
    let id = value["id"].as_str()?.to_string();
    let meta = &value["user_metadata"];
    let email = value["email"].as_str().map(|s| s.to_string());

    let name = meta["full_name"]
        .as_str()
        .or_else(|| meta["name"].as_str())
        .map(|s| s.to_string())
        .or_else(|| email.clone())
        .unwrap_or_else(|| id.clone());

    let status = match meta["status"].as_str() {
        Some(s) if s.eq_ignore_ascii_case("inactive") => UserStatus::Inactive,
        _ => UserStatus::Active,
    };

    Some(UserRecord {
        id,
        name,
        email,
        department: meta["department"].as_str().map(|s| s.to_string()),
        role: meta["role"].as_str().map(|s| s.to_string()),
        status: Some(status),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
