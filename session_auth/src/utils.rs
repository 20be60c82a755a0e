use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use ring::rand::{SecureRandom, SystemRandom};

use crate::errors::SessionError;

pub(crate) fn base64url_decode(input: &str) -> Result<Vec<u8>, SessionError> {
    URL_SAFE_NO_PAD
        .decode(input)
        .map_err(|_| SessionError::Cookie("Failed to decode base64url".to_string()))
}

pub(crate) fn base64url_encode(input: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

pub(crate) fn fill_random(rng: &SystemRandom, buf: &mut [u8]) -> Result<(), SessionError> {
    rng.fill(buf)
        .map_err(|_| SessionError::Crypto("Failed to generate random bytes".to_string()))
}

/// Generate a URL-safe random string from `len` random bytes
pub fn gen_random_string(len: usize) -> Result<String, SessionError> {
    let rng = SystemRandom::new();
    let mut bytes = vec![0u8; len];
    fill_random(&rng, &mut bytes)?;
    Ok(base64url_encode(&bytes))
}
