//! Session store: the explicit, injectable owner of authentication state.
//!
//! In-memory state (current user + authenticated flag) lives behind a lock;
//! durable state (bearer token + login email) lives in a credential store,
//! written and cleared together, never independently. The invariant: the
//! session is authenticated iff a user is loaded and a token is persisted.

use std::path::PathBuf;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

use crate::client::ApiClient;
use crate::config::SessionConfig;
use crate::error::ApiError;
use crate::models::User;

/// Professional name of the default advisor assignment used when no
/// specific advisor context is selected.
pub const GENERAL_ADVISOR: &str = "Consulta General";

// ============================================================================
// Credential persistence
// ============================================================================

/// The durable token/email pair. `saved_at` records the last write; expiry
/// is driven by the server, not tracked locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub token: String,
    pub email: String,
    pub saved_at: DateTime<Utc>,
}

impl StoredCredentials {
    pub fn new(token: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            email: email.into(),
            saved_at: Utc::now(),
        }
    }
}

/// Durable local key-value storage for the session. Token and email are one
/// record: both saved together, both cleared together.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Option<StoredCredentials>;
    fn save(&self, creds: &StoredCredentials) -> Result<(), std::io::Error>;
    fn clear(&self) -> Result<(), std::io::Error>;
}

/// JSON file in the platform config directory, written with owner-only
/// permissions.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Option<StoredCredentials> {
        let data = std::fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&data).ok()
    }

    fn save(&self, creds: &StoredCredentials) -> Result<(), std::io::Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(creds)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&self.path, data)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    fn clear(&self) -> Result<(), std::io::Error> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// In-memory store for tests and isolated sessions.
#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: RwLock<Option<StoredCredentials>>,
}

impl MemoryCredentialStore {
    /// A store pre-seeded with a token/email pair.
    pub fn with(token: &str, email: &str) -> Self {
        Self {
            inner: RwLock::new(Some(StoredCredentials::new(token, email))),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Option<StoredCredentials> {
        self.inner.read().expect("credential store lock poisoned").clone()
    }

    fn save(&self, creds: &StoredCredentials) -> Result<(), std::io::Error> {
        *self.inner.write().expect("credential store lock poisoned") = Some(creds.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), std::io::Error> {
        *self.inner.write().expect("credential store lock poisoned") = None;
        Ok(())
    }
}

// ============================================================================
// Session
// ============================================================================

#[derive(Default)]
struct SessionState {
    user: Option<User>,
    authenticated: bool,
}

/// The authenticated session. Constructed explicitly and shared by handle;
/// the HTTP client reads its token and triggers its teardown, the refresh
/// loop renews it in the background.
pub struct Session {
    store: Box<dyn CredentialStore>,
    state: RwLock<SessionState>,
    /// Single-flight guard: at most one refresh in progress; concurrent
    /// callers await its completion instead of racing it.
    refresh_gate: Mutex<()>,
}

impl Session {
    pub fn new(store: Box<dyn CredentialStore>) -> Self {
        Self {
            store,
            state: RwLock::new(SessionState::default()),
            refresh_gate: Mutex::new(()),
        }
    }

    /// A session persisting to the configured credentials file, defaulting
    /// to `<config dir>/mymentor/credentials.json`.
    pub fn with_file_store(config: &SessionConfig) -> Self {
        let path = config.credentials_path.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("mymentor")
                .join("credentials.json")
        });
        Self::new(Box::new(FileCredentialStore::new(path)))
    }

    // ------------------------------------------------------------------------
    // State accessors
    // ------------------------------------------------------------------------

    /// Read the persisted bearer token. Durable storage is re-read on every
    /// call so the latest write always wins.
    pub fn token(&self) -> Option<String> {
        self.store.load().map(|c| c.token)
    }

    pub fn email(&self) -> Option<String> {
        self.store.load().map(|c| c.email)
    }

    pub fn is_authenticated(&self) -> bool {
        let flag = self.state.read().expect("session state lock poisoned").authenticated;
        flag && self.store.load().is_some()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state
            .read()
            .expect("session state lock poisoned")
            .user
            .clone()
    }

    /// The assignment id of the well-known general-consultation advisor, if
    /// the loaded user has one.
    pub fn general_asesor_id(&self) -> Option<i64> {
        let state = self.state.read().expect("session state lock poisoned");
        state.user.as_ref().and_then(|u| {
            u.asesores
                .iter()
                .find(|a| a.professional.name == GENERAL_ADVISOR)
                .map(|a| a.id)
        })
    }

    /// Unconditionally clear durable credentials and in-memory user state.
    /// Safe to call repeatedly; a missing credentials file is not an error.
    pub fn teardown(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "failed to clear persisted credentials");
        }
        let mut state = self.state.write().expect("session state lock poisoned");
        state.user = None;
        state.authenticated = false;
    }

    fn install_user(&self, user: User) {
        let mut state = self.state.write().expect("session state lock poisoned");
        state.user = Some(user);
        state.authenticated = true;
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    /// Log in and load the full user record. If the user fetch fails after
    /// the credential check succeeded, the session is torn down: there is no
    /// partially-authenticated state.
    pub async fn login(
        &self,
        client: &ApiClient,
        email: &str,
        password: &str,
    ) -> Result<User, ApiError> {
        let login = client.login(email, password).await.map_err(|e| match e {
            ApiError::Http {
                status: 401 | 403,
                message,
            } => ApiError::Auth(message),
            other => other,
        })?;

        self.store
            .save(&StoredCredentials::new(login.token, login.email.clone()))?;

        match client.get_user_by_email(&login.email).await {
            Ok(resp) => {
                tracing::info!(email = %login.email, "login succeeded");
                self.install_user(resp.usuario.clone());
                Ok(resp.usuario)
            }
            Err(e) => {
                self.teardown();
                Err(e)
            }
        }
    }

    /// Best-effort server-side logout, then unconditional local teardown.
    /// Idempotent; never leaves stale local state even if the call fails.
    pub async fn logout(&self, client: &ApiClient) {
        if let Err(e) = client.logout().await {
            tracing::debug!(error = %e, "server-side logout failed, clearing local state anyway");
        }
        self.teardown();
    }

    /// Run once at process start: if credentials were persisted, renew them
    /// and re-hydrate the user. Returns false when there is nothing to
    /// restore.
    pub async fn bootstrap(&self, client: &ApiClient) -> Result<bool, ApiError> {
        if self.store.load().is_none() {
            return Ok(false);
        }
        self.refresh(client).await?;
        Ok(true)
    }

    /// Renew the token and re-fetch the user by persisted email. Any failure
    /// tears the session down. Single-flight: concurrent calls serialize on
    /// the gate rather than racing each other.
    pub async fn refresh(&self, client: &ApiClient) -> Result<String, ApiError> {
        let _flight = self.refresh_gate.lock().await;

        let creds = match self.store.load() {
            Some(c) => c,
            None => {
                self.teardown();
                return Err(ApiError::SessionExpired);
            }
        };

        let result = self.refresh_inner(client, &creds.email).await;
        if result.is_err() {
            // The guard may already have cleared things; teardown is
            // idempotent.
            self.teardown();
        }
        result
    }

    async fn refresh_inner(&self, client: &ApiClient, email: &str) -> Result<String, ApiError> {
        let renewed = client.refresh_token().await?;
        self.store
            .save(&StoredCredentials::new(renewed.token.clone(), email))?;

        let resp = client.get_user_by_email(email).await?;
        self.install_user(resp.usuario);
        tracing::debug!("session token renewed");
        Ok(renewed.token)
    }
}

// ============================================================================
// Refresh loop
// ============================================================================

/// Silent token renewal: fires `refresh()` on a fixed interval strictly
/// shorter than the server-side token expiry. Stops on the shutdown signal,
/// on logout, or once a failed refresh has torn the session down.
pub async fn run_refresh_loop(
    client: ApiClient,
    interval: std::time::Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick fires immediately; bootstrap already refreshed at
    // startup, so consume it.
    ticker.tick().await;

    tracing::info!(interval_secs = interval.as_secs(), "refresh loop started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let session = client.session();
                if session.token().is_none() {
                    tracing::info!("refresh loop stopping: session is gone");
                    break;
                }
                match session.refresh(&client).await {
                    Ok(_) => tracing::debug!("background refresh ok"),
                    Err(e) => {
                        tracing::warn!(error = %e, "background refresh failed, stopping loop");
                        break;
                    }
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("refresh loop stopping: shutdown signal");
                break;
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
