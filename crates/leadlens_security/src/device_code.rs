//! OpenID Connect Device Authorization Flow
//!
//! Interactive sign-in for terminals: the user opens a verification URL in any
//! browser and enters a short code while the client polls the token endpoint.
//! Uses raw HTTP requests (no heavy SDK dependencies).
//!
//! The provider keeps its own session cache so a later process still sees an
//! active user until the token expires. Tokens are never refreshed.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use leadlens_protocol::IdentityConfig;
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::{watch, OnceCell};
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::identity::{Credential, Identity, ProviderUser, SignIn};
use crate::provider::{IdentityProvider, ProviderSession};

const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_DEVICE_CODE_LIFETIME_SECS: u64 = 900;
const SLOW_DOWN_INCREMENT: Duration = Duration::from_secs(5);
const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Subset of the OpenID discovery document used here.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenIdConfig {
    pub issuer: String,
    pub token_endpoint: String,
    pub device_authorization_endpoint: String,
    #[serde(default)]
    pub revocation_endpoint: Option<String>,
}

/// Device authorization response.
#[derive(Debug, Deserialize)]
pub struct DeviceCodeResponse {
    pub device_code: String,
    pub user_code: String,
    #[serde(alias = "verification_url")]
    pub verification_uri: String,
    #[serde(default)]
    pub verification_uri_complete: Option<String>,
    // Some providers send these as strings.
    #[serde(default, deserialize_with = "lenient_u64")]
    pub expires_in: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub interval: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct TokenError {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// What the user needs to complete sign-in in a browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCodePrompt {
    pub verification_uri: String,
    pub verification_uri_complete: Option<String>,
    pub user_code: String,
    pub message: Option<String>,
    pub expires_in: Duration,
}

pub type PromptHook = Arc<dyn Fn(&DeviceCodePrompt) + Send + Sync>;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedSession {
    identity: Identity,
    credential: Credential,
    /// Unix seconds
    #[serde(default)]
    expires_at: Option<i64>,
}

impl CachedSession {
    fn is_expired(&self, now: i64) -> bool {
        self.expires_at.map_or(false, |exp| exp <= now)
    }
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    sub: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
}

#[derive(Debug, PartialEq, Eq)]
enum PollStep {
    Pending,
    SlowDown,
    Cancelled,
    Failed(String),
}

fn classify_token_error(error: &TokenError) -> PollStep {
    match error.error.as_str() {
        "authorization_pending" => PollStep::Pending,
        "slow_down" => PollStep::SlowDown,
        "access_denied" | "authorization_declined" => PollStep::Cancelled,
        "expired_token" => PollStep::Failed("Device code expired".to_string()),
        other => PollStep::Failed(match &error.error_description {
            Some(description) => format!("{} - {}", other, description),
            None => other.to_string(),
        }),
    }
}

/// OIDC identity provider using the device authorization grant.
pub struct DeviceCodeProvider {
    issuer: String,
    client_id: String,
    scope: String,
    http_client: reqwest::Client,
    discovery: OnceCell<OpenIdConfig>,
    cache_path: PathBuf,
    state: watch::Sender<ProviderSession>,
    prompt: PromptHook,
}

impl DeviceCodeProvider {
    /// Create the provider and restore any cached session.
    pub fn new(
        issuer: impl Into<String>,
        client_id: impl Into<String>,
        scope: impl Into<String>,
        cache_path: impl Into<PathBuf>,
    ) -> Self {
        let (state, _) = watch::channel(ProviderSession::Restoring);
        let provider = Self {
            issuer: issuer.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            scope: scope.into(),
            http_client: reqwest::Client::new(),
            discovery: OnceCell::new(),
            cache_path: cache_path.into(),
            state,
            prompt: Arc::new(print_prompt),
        };
        provider.restore();
        provider
    }

    pub fn from_config(config: &IdentityConfig, cache_path: &Path) -> Result<Self, AuthError> {
        let issuer = config.issuer.clone().ok_or_else(|| {
            AuthError::NotConfigured("issuer is not set (LEADLENS_ISSUER or [identity] issuer)".into())
        })?;
        let client_id = config.client_id.clone().ok_or_else(|| {
            AuthError::NotConfigured(
                "client_id is not set (LEADLENS_CLIENT_ID or [identity] client_id)".into(),
            )
        })?;
        Ok(Self::new(issuer, client_id, config.scope.clone(), cache_path))
    }

    /// Replace how the verification URL and code are shown to the user.
    pub fn with_prompt(mut self, prompt: PromptHook) -> Self {
        self.prompt = prompt;
        self
    }

    /// Re-read the session cache and publish the result.
    pub fn restore(&self) {
        let restored = match self.read_cache() {
            Ok(Some(cached)) if !cached.is_expired(now_unix()) => {
                debug!(uid = %cached.identity.uid, "restored cached identity session");
                ProviderSession::SignedIn(ProviderUser {
                    identity: cached.identity,
                    credential: Some(cached.credential),
                })
            }
            Ok(Some(_)) => {
                info!("cached identity session expired; sign in again");
                let _ = self.clear_cache();
                ProviderSession::SignedOut
            }
            Ok(None) => ProviderSession::SignedOut,
            Err(err) => {
                warn!("Ignoring unreadable identity session cache: {}", err);
                ProviderSession::SignedOut
            }
        };
        self.state.send_replace(restored);
    }

    async fn discover(&self) -> Result<&OpenIdConfig, AuthError> {
        self.discovery
            .get_or_try_init(|| async {
                let config_url = format!("{}/.well-known/openid-configuration", self.issuer);
                info!("Fetching OpenID configuration from {}", config_url);

                let response = self
                    .http_client
                    .get(&config_url)
                    .send()
                    .await
                    .map_err(|e| {
                        AuthError::Http(format!("Failed to fetch OpenID configuration: {}", e))
                    })?;
                if !response.status().is_success() {
                    return Err(AuthError::Http(format!(
                        "OpenID configuration request returned HTTP {}",
                        response.status()
                    )));
                }
                let config: OpenIdConfig = response.json().await.map_err(|e| {
                    AuthError::Http(format!("Failed to parse OpenID configuration: {}", e))
                })?;
                debug!("OpenID config: {:?}", config);
                Ok::<_, AuthError>(config)
            })
            .await
    }

    async fn start_device_code_flow(
        &self,
        config: &OpenIdConfig,
    ) -> Result<DeviceCodeResponse, AuthError> {
        let params = [("client_id", self.client_id.as_str()), ("scope", self.scope.as_str())];
        info!("Starting device code flow with scope: {}", self.scope);

        let response = self
            .http_client
            .post(&config.device_authorization_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::Http(format!("Failed to request device code: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected(format!(
                "Device code request failed (HTTP {}): {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::Http(format!("Failed to parse device code response: {}", e)))
    }

    async fn poll_for_token(
        &self,
        config: &OpenIdConfig,
        device_code: &str,
        mut interval: Duration,
        timeout: Duration,
    ) -> Result<TokenResponse, AuthError> {
        let start = Instant::now();
        let form = [
            ("client_id", self.client_id.as_str()),
            ("grant_type", DEVICE_CODE_GRANT),
            ("device_code", device_code),
        ];

        loop {
            if start.elapsed() > timeout {
                return Err(AuthError::Rejected(format!(
                    "Device code flow timed out after {:?}",
                    timeout
                )));
            }

            debug!("Polling token endpoint...");
            let response = self
                .http_client
                .post(&config.token_endpoint)
                .form(&form)
                .send()
                .await
                .map_err(|e| AuthError::Http(format!("Failed to poll token endpoint: {}", e)))?;

            let status = response.status();
            let body = response
                .bytes()
                .await
                .map_err(|e| AuthError::Http(format!("Failed to read token response: {}", e)))?;

            if status.is_success() {
                let token: TokenResponse = serde_json::from_slice(&body).map_err(|e| {
                    AuthError::InvalidToken(format!("Failed to parse token response: {}", e))
                })?;
                info!("Successfully obtained token");
                return Ok(token);
            }

            let error: TokenError = serde_json::from_slice(&body).map_err(|_| {
                AuthError::Rejected(format!(
                    "Token request failed (HTTP {}): {}",
                    status,
                    String::from_utf8_lossy(&body)
                ))
            })?;

            match classify_token_error(&error) {
                PollStep::Pending => debug!("Authorization pending, continuing to poll..."),
                PollStep::SlowDown => {
                    interval += SLOW_DOWN_INCREMENT;
                    warn!("Received slow_down, poll interval now {:?}", interval);
                }
                PollStep::Cancelled => return Err(AuthError::Cancelled),
                PollStep::Failed(reason) => return Err(AuthError::Rejected(reason)),
            }

            tokio::time::sleep(interval).await;
        }
    }

    fn read_cache(&self) -> Result<Option<CachedSession>, String> {
        if !self.cache_path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.cache_path)
            .map_err(|e| format!("{}: {}", self.cache_path.display(), e))?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| format!("{}: {}", self.cache_path.display(), e))
    }

    fn write_cache(&self, session: &CachedSession) -> std::io::Result<()> {
        if let Some(parent) = self.cache_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(session)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&self.cache_path, json)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.cache_path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn clear_cache(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.cache_path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    async fn revoke(&self, credential: &Credential) -> Result<(), AuthError> {
        let config = self
            .discover()
            .await
            .map_err(|e| AuthError::SignOut(e.to_string()))?;
        let Some(endpoint) = config.revocation_endpoint.as_deref() else {
            debug!("issuer advertises no revocation endpoint");
            return Ok(());
        };

        let form = [
            ("client_id", self.client_id.as_str()),
            ("token", credential.expose()),
        ];
        let response = self
            .http_client
            .post(endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::SignOut(format!("Failed to reach revocation endpoint: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.bytes().await.unwrap_or_default();
        if let Ok(error) = serde_json::from_slice::<TokenError>(&body) {
            // RFC 7009: the server cannot revoke this token type; nothing to undo.
            if error.error == "unsupported_token_type" {
                debug!("issuer cannot revoke this token type");
                return Ok(());
            }
        }
        Err(AuthError::SignOut(format!(
            "Revocation failed (HTTP {}): {}",
            status,
            String::from_utf8_lossy(&body)
        )))
    }
}

#[async_trait]
impl IdentityProvider for DeviceCodeProvider {
    fn name(&self) -> &str {
        "oidc-device-code"
    }

    async fn sign_in(&self) -> Result<SignIn, AuthError> {
        let config = self.discover().await?;
        let device = self.start_device_code_flow(config).await?;

        let expires_in = Duration::from_secs(
            device
                .expires_in
                .unwrap_or(DEFAULT_DEVICE_CODE_LIFETIME_SECS),
        );
        (self.prompt)(&DeviceCodePrompt {
            verification_uri: device.verification_uri.clone(),
            verification_uri_complete: device.verification_uri_complete.clone(),
            user_code: device.user_code.clone(),
            message: device.message.clone(),
            expires_in,
        });

        let interval =
            Duration::from_secs(device.interval.unwrap_or(DEFAULT_POLL_INTERVAL_SECS));
        let token = self
            .poll_for_token(config, &device.device_code, interval, expires_in)
            .await?;
        let (sign_in, expires_at) = sign_in_from_token(&token, now_unix())?;

        let cached = CachedSession {
            identity: sign_in.identity.clone(),
            credential: sign_in.credential.clone(),
            expires_at,
        };
        if let Err(err) = self.write_cache(&cached) {
            warn!("Failed to write identity session cache: {}", err);
        }

        self.state.send_replace(ProviderSession::SignedIn(ProviderUser {
            identity: sign_in.identity.clone(),
            credential: Some(sign_in.credential.clone()),
        }));
        Ok(sign_in)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let cached = self.read_cache().unwrap_or_else(|err| {
            warn!("Ignoring unreadable identity session cache: {}", err);
            None
        });
        if let Some(session) = cached {
            self.revoke(&session.credential).await?;
        }

        self.clear_cache().map_err(|e| {
            AuthError::SignOut(format!(
                "Failed to remove {}: {}",
                self.cache_path.display(),
                e
            ))
        })?;
        self.state.send_replace(ProviderSession::SignedOut);
        Ok(())
    }

    fn on_session_change(&self) -> watch::Receiver<ProviderSession> {
        self.state.subscribe()
    }
}

/// Build the sign-in result from a token response.
///
/// Claims are read for display only; the enrichment service verifies the token.
fn sign_in_from_token(
    token: &TokenResponse,
    now: i64,
) -> Result<(SignIn, Option<i64>), AuthError> {
    let raw = token
        .id_token
        .as_deref()
        .or(token.access_token.as_deref())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::InvalidToken("token response carried no token".into()))?;

    let claims = decode_claims(raw)?;
    let expires_at = claims
        .exp
        .or_else(|| token.expires_in.map(|secs| now + secs as i64));
    let identity = Identity {
        uid: claims.sub,
        display_name: claims.name,
        email: claims.email,
    };

    Ok((
        SignIn {
            identity,
            credential: Credential::new(raw),
        },
        expires_at,
    ))
}

fn decode_claims(jwt: &str) -> Result<TokenClaims, AuthError> {
    let payload = jwt
        .split('.')
        .nth(1)
        .ok_or_else(|| AuthError::InvalidToken("not a JWT".into()))?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AuthError::InvalidToken(format!("bad JWT payload encoding: {}", e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::InvalidToken(format!("bad JWT claims: {}", e)))
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrString {
        Num(u64),
        Str(String),
    }

    Ok(match Option::<NumOrString>::deserialize(deserializer)? {
        Some(NumOrString::Num(n)) => Some(n),
        Some(NumOrString::Str(s)) => s.trim().parse().ok(),
        None => None,
    })
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

fn print_prompt(prompt: &DeviceCodePrompt) {
    eprintln!();
    eprintln!("Sign-in required");
    eprintln!("1. Open your browser and navigate to:");
    eprintln!("   {}", prompt.verification_uri);
    eprintln!("2. Enter the code:");
    eprintln!("   {}", prompt.user_code);
    eprintln!(
        "Waiting for sign-in (expires in {}s)...",
        prompt.expires_in.as_secs()
    );
    eprintln!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(claims: serde_json::Value) -> String {
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        format!(
            "{}.{}.sig",
            engine.encode(br#"{"alg":"RS256"}"#),
            engine.encode(claims.to_string())
        )
    }

    #[test]
    fn classifies_poll_errors() {
        let err = |code: &str| TokenError {
            error: code.to_string(),
            error_description: None,
        };
        assert_eq!(classify_token_error(&err("authorization_pending")), PollStep::Pending);
        assert_eq!(classify_token_error(&err("slow_down")), PollStep::SlowDown);
        assert_eq!(classify_token_error(&err("access_denied")), PollStep::Cancelled);
        assert_eq!(classify_token_error(&err("authorization_declined")), PollStep::Cancelled);
        assert!(matches!(classify_token_error(&err("expired_token")), PollStep::Failed(_)));
        assert_eq!(
            classify_token_error(&TokenError {
                error: "invalid_client".into(),
                error_description: Some("unknown app".into()),
            }),
            PollStep::Failed("invalid_client - unknown app".into())
        );
    }

    #[test]
    fn device_code_accepts_string_numbers() {
        let parsed: DeviceCodeResponse = serde_json::from_str(
            r#"{"device_code":"d","user_code":"ABCD","verification_url":"https://v","expires_in":"900","interval":"5"}"#,
        )
        .unwrap();
        assert_eq!(parsed.expires_in, Some(900));
        assert_eq!(parsed.interval, Some(5));
        assert_eq!(parsed.verification_uri, "https://v");

        let parsed: DeviceCodeResponse = serde_json::from_str(
            r#"{"device_code":"d","user_code":"ABCD","verification_uri":"https://v","expires_in":600}"#,
        )
        .unwrap();
        assert_eq!(parsed.expires_in, Some(600));
        assert_eq!(parsed.interval, None);
    }

    #[test]
    fn identity_comes_from_id_token_claims() {
        let id_token = jwt(serde_json::json!({
            "sub": "user-1", "name": "Ada Lovelace", "email": "ada@example.com", "exp": 2_000_000_000i64
        }));
        let token = TokenResponse {
            access_token: Some("opaque-access".into()),
            id_token: Some(id_token.clone()),
            token_type: Some("Bearer".into()),
            expires_in: Some(3600),
        };

        let (sign_in, expires_at) = sign_in_from_token(&token, 1_000).unwrap();

        assert_eq!(sign_in.identity.uid, "user-1");
        assert_eq!(sign_in.identity.display_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(sign_in.identity.email.as_deref(), Some("ada@example.com"));
        assert_eq!(sign_in.credential.expose(), id_token);
        assert_eq!(expires_at, Some(2_000_000_000));
    }

    #[test]
    fn expiry_falls_back_to_expires_in() {
        let token = TokenResponse {
            access_token: Some(jwt(serde_json::json!({"sub": "svc"}))),
            id_token: None,
            token_type: None,
            expires_in: Some(60),
        };
        let (sign_in, expires_at) = sign_in_from_token(&token, 1_000).unwrap();
        assert_eq!(sign_in.identity.uid, "svc");
        assert_eq!(expires_at, Some(1_060));
    }

    #[test]
    fn rejects_tokens_without_claims() {
        let token = TokenResponse {
            access_token: Some("opaque".into()),
            id_token: None,
            token_type: None,
            expires_in: None,
        };
        assert!(matches!(
            sign_in_from_token(&token, 0),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn from_config_requires_issuer_and_client() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("provider_session.json");
        let config = IdentityConfig {
            issuer: None,
            client_id: Some("c".into()),
            scope: "openid".into(),
        };
        assert!(matches!(
            DeviceCodeProvider::from_config(&config, &cache),
            Err(AuthError::NotConfigured(_))
        ));
    }

    #[test]
    fn restores_unexpired_cache_and_drops_expired() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("provider_session.json");
        let write = |expires_at: i64| {
            let session = CachedSession {
                identity: Identity::new("u1", Some("Ada".into())),
                credential: Credential::new("tok"),
                expires_at: Some(expires_at),
            };
            std::fs::write(&cache, serde_json::to_string(&session).unwrap()).unwrap();
        };

        write(now_unix() + 3600);
        let provider = DeviceCodeProvider::new("https://issuer", "client", "openid", &cache);
        assert!(matches!(
            &*provider.on_session_change().borrow(),
            ProviderSession::SignedIn(user) if user.credential == Some(Credential::new("tok"))
        ));

        write(now_unix() - 1);
        provider.restore();
        assert_eq!(*provider.on_session_change().borrow(), ProviderSession::SignedOut);
        assert!(!cache.exists());
    }
}
