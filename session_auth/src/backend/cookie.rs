use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use http::HeaderMap;
use ring::aead::{AES_128_GCM, AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::SystemRandom;
use serde::{Deserialize, Serialize};

use super::SessionBackend;
use super::cookies::{chunk_cookies, header_clear_cookie, header_set_cookie};
use crate::config::CookieConfig;
use crate::errors::SessionError;
use crate::session::{SessionData, SessionState};
use crate::utils::{base64url_decode, base64url_encode, fill_random};

/// Maximum size of one cookie value, leaving room for the attributes
pub(crate) const CHUNK_SIZE: usize = 4096 - 64;

#[derive(Debug, Serialize, Deserialize)]
struct AssociatedData {
    expires_at: DateTime<Utc>,
}

/// Client side sessions: the session data is encrypted with AES-GCM and
/// carried by the cookies `<key>-0`, `<key>-1`, ...
///
/// The token is `<associated data>.<nonce || ciphertext>`, both base64url.
/// The associated data holds the expiry, so altering it breaks the tag.
pub struct CookieBackend {
    key: LessSafeKey,
    rng: SystemRandom,
    config: CookieConfig,
}

impl std::fmt::Debug for CookieBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieBackend")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CookieBackend {
    /// `secret` must be 16 (AES-128) or 32 (AES-256) bytes.
    pub fn new(secret: &[u8], config: CookieConfig) -> Result<Self, SessionError> {
        let algorithm = match secret.len() {
            16 => &AES_128_GCM,
            32 => &AES_256_GCM,
            len => {
                return Err(SessionError::InvalidSecret(format!(
                    "secret must be 16 or 32 bytes long, got {len}"
                )));
            }
        };
        let unbound = UnboundKey::new(algorithm, secret)
            .map_err(|_| SessionError::Crypto("Failed to create AEAD key".to_string()))?;

        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
            config,
        })
    }

    fn expires_at(&self) -> DateTime<Utc> {
        i64::try_from(self.config.max_age)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|max_age| Utc::now().checked_add_signed(max_age))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Encrypt the session data into cookie-sized chunks
    fn dump_data(&self, data: &SessionData) -> Result<Vec<String>, SessionError> {
        let aad = serde_json::to_vec(&AssociatedData {
            expires_at: self.expires_at(),
        })?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        fill_random(&self.rng, &mut nonce_bytes)?;

        let mut in_out = serde_json::to_vec(data)?;
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::from(aad.as_slice()),
                &mut in_out,
            )
            .map_err(|_| SessionError::Crypto("Failed to encrypt session data".to_string()))?;

        let mut sealed = nonce_bytes.to_vec();
        sealed.extend_from_slice(&in_out);

        let token = format!("{}.{}", base64url_encode(&aad), base64url_encode(&sealed));

        // base64url and '.' are ASCII, so byte chunks are valid UTF-8
        Ok(token
            .as_bytes()
            .chunks(CHUNK_SIZE)
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect())
    }

    /// Decrypt a reassembled token. Any failure means "no session".
    fn load_data(&self, token: &str) -> Result<SessionData, SessionError> {
        let (aad_part, sealed_part) = token
            .split_once('.')
            .ok_or_else(|| SessionError::Cookie("Malformed session token".to_string()))?;

        let aad = base64url_decode(aad_part)?;
        let mut sealed = base64url_decode(sealed_part)?;
        if sealed.len() < NONCE_LEN {
            return Err(SessionError::Cookie("Session token too short".to_string()));
        }

        let mut in_out = sealed.split_off(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(&sealed)
            .map_err(|_| SessionError::Crypto("Invalid nonce".to_string()))?;

        let plaintext = self
            .key
            .open_in_place(nonce, Aad::from(aad.as_slice()), &mut in_out)
            .map_err(|_| SessionError::Crypto("Failed to decrypt session data".to_string()))?;

        let associated: AssociatedData = serde_json::from_slice(&aad)?;
        if associated.expires_at <= Utc::now() {
            return Err(SessionError::Cookie(format!(
                "Session expired at {}",
                associated.expires_at
            )));
        }

        Ok(serde_json::from_slice(plaintext)?)
    }
}

#[async_trait]
impl SessionBackend for CookieBackend {
    #[tracing::instrument(skip_all, fields(key = %self.config.key))]
    async fn load(&self, request_headers: &HeaderMap) -> Result<SessionState, SessionError> {
        let chunks = chunk_cookies(request_headers, &self.config.key);
        if chunks.is_empty() {
            tracing::debug!("No session cookie found");
            return Ok(SessionState::Absent);
        }

        let token: String = chunks.into_iter().map(|(_, _, value)| value).collect();
        match self.load_data(&token) {
            Ok(data) => Ok(SessionState::Data(data)),
            Err(e) => {
                tracing::debug!("Discarding session cookie: {e}");
                Ok(SessionState::Absent)
            }
        }
    }

    #[tracing::instrument(skip_all, fields(key = %self.config.key))]
    async fn store(
        &self,
        request_headers: &HeaderMap,
        state: &SessionState,
        response_headers: &mut HeaderMap,
    ) -> Result<(), SessionError> {
        let existing: Vec<String> = chunk_cookies(request_headers, &self.config.key)
            .into_iter()
            .map(|(_, name, _)| name)
            .collect();

        let to_clear = match state {
            SessionState::Data(data) if !data.is_empty() => {
                let chunks = self.dump_data(data)?;
                for (index, chunk) in chunks.iter().enumerate() {
                    let name = format!("{}-{index}", self.config.key);
                    header_set_cookie(response_headers, &self.config, &name, chunk)?;
                }
                // Leftover chunks from a previously larger session
                let written = chunks.len();
                existing
                    .into_iter()
                    .filter(|name| {
                        name.rsplit('-')
                            .next()
                            .and_then(|index| index.parse::<usize>().ok())
                            .is_some_and(|index| index >= written)
                    })
                    .collect()
            }
            SessionState::Cleared if existing.is_empty() => {
                vec![format!("{}-0", self.config.key)]
            }
            SessionState::Cleared | SessionState::Data(_) | SessionState::Absent => existing,
        };

        for name in to_clear {
            header_clear_cookie(response_headers, &self.config, &name)?;
        }

        Ok(())
    }

    fn cookie_config(&self) -> &CookieConfig {
        &self.config
    }
}
