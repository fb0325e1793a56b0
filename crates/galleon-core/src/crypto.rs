//! Timestamped, signed tokens and the secret they are signed with.
//!
//! Token layout: `base64url(json) "." base64url(ts_be_u64) "." base64url(mac)`,
//! where `mac = HMAC-SHA256(key, "<json part>.<ts part>")` and `key` is derived
//! from the site secret and a per-purpose namespace.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const SECRET_FILE_NAME: &str = "itsdangeroussecret.bin";
const SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("malformed token")]
    Malformed,
    #[error("signature does not match")]
    BadSignature,
    #[error("token expired: {age_secs}s old, max {max_age_secs}s")]
    Expired { age_secs: u64, max_age_secs: u64 },
    #[error("invalid payload: {0}")]
    Payload(String),
}

/// Signs values with an expiry check on load.
#[derive(Clone)]
pub struct TimedSigner {
    key: [u8; 32],
}

impl std::fmt::Debug for TimedSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimedSigner").finish_non_exhaustive()
    }
}

impl TimedSigner {
    /// Signer for one purpose (`namespace`), e.g. `mail_verification_token`.
    /// Tokens from one namespace never validate in another.
    pub fn new(secret: &[u8], namespace: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(namespace.as_bytes());
        hasher.update(b"signer");
        hasher.update(secret);
        Self {
            key: hasher.finalize().into(),
        }
    }

    pub fn dumps<T: Serialize>(&self, value: &T) -> Result<String, SignatureError> {
        self.dumps_at(value, now_secs())
    }

    pub fn dumps_at<T: Serialize>(&self, value: &T, timestamp: u64) -> Result<String, SignatureError> {
        let json = serde_json::to_vec(value).map_err(|e| SignatureError::Payload(e.to_string()))?;
        let signed = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(json),
            URL_SAFE_NO_PAD.encode(timestamp.to_be_bytes())
        );
        let tag = self.mac(signed.as_bytes()).finalize().into_bytes();
        Ok(format!("{}.{}", signed, URL_SAFE_NO_PAD.encode(tag)))
    }

    pub fn loads<T: DeserializeOwned>(&self, token: &str, max_age_secs: u64) -> Result<T, SignatureError> {
        self.loads_at(token, max_age_secs, now_secs())
    }

    pub fn loads_at<T: DeserializeOwned>(
        &self,
        token: &str,
        max_age_secs: u64,
        now: u64,
    ) -> Result<T, SignatureError> {
        let (signed, tag) = token.rsplit_once('.').ok_or(SignatureError::Malformed)?;
        let (payload, ts) = signed.split_once('.').ok_or(SignatureError::Malformed)?;

        let tag = URL_SAFE_NO_PAD
            .decode(tag)
            .map_err(|_| SignatureError::Malformed)?;
        self.mac(signed.as_bytes())
            .verify_slice(&tag)
            .map_err(|_| SignatureError::BadSignature)?;

        let ts_bytes: [u8; 8] = URL_SAFE_NO_PAD
            .decode(ts)
            .map_err(|_| SignatureError::Malformed)?
            .try_into()
            .map_err(|_| SignatureError::Malformed)?;
        let timestamp = u64::from_be_bytes(ts_bytes);
        let age_secs = now.saturating_sub(timestamp);
        if age_secs > max_age_secs {
            return Err(SignatureError::Expired {
                age_secs,
                max_age_secs,
            });
        }

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| SignatureError::Malformed)?;
        serde_json::from_slice(&json).map_err(|e| SignatureError::Payload(e.to_string()))
    }

    fn mac(&self, data: &[u8]) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key size");
        mac.update(data);
        mac
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Path of the secret file inside `dir`
pub fn secret_path(dir: &Path) -> PathBuf {
    dir.join(SECRET_FILE_NAME)
}

/// Load the site secret from `dir`, generating and persisting one if absent.
pub fn load_or_create_key(dir: &Path) -> io::Result<Vec<u8>> {
    let path = secret_path(dir);
    match fs::read(&path) {
        Ok(key) if !key.is_empty() => return Ok(key),
        Ok(_) => tracing::warn!(path = %path.display(), "Secret file is empty, regenerating"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    fs::create_dir_all(dir)?;
    let key: [u8; SECRET_LEN] = rand::random();
    fs::write(&path, key)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
    }
    tracing::info!(path = %path.display(), "Generated new signing secret");
    Ok(key.to_vec())
}
