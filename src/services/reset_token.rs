use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use std::fmt;

use crate::models::RawResetToken;

type HmacSha256 = Hmac<Sha256>;

/// 32 random bytes (256 bits), hex encoded to 64 characters
pub const RESET_TOKEN_BYTES: usize = 32;
pub const RESET_TOKEN_LEN: usize = RESET_TOKEN_BYTES * 2;

/// Generate a reset token from the operating system CSPRNG
pub fn generate_reset_token() -> RawResetToken {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    RawResetToken::new(hex::encode(bytes))
}

/// Cheap shape check so garbage never reaches the store
pub fn is_well_formed(token: &str) -> bool {
    token.len() == RESET_TOKEN_LEN
        && token
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Keyed hash of raw tokens. The store only ever sees the output, so a leaked
/// table cannot be replayed without the server-side pepper.
#[derive(Clone)]
pub struct ResetTokenHasher {
    mac: HmacSha256,
}

impl ResetTokenHasher {
    pub fn new(pepper: &[u8]) -> Result<Self, hmac::digest::InvalidLength> {
        Ok(Self {
            mac: HmacSha256::new_from_slice(pepper)?,
        })
    }

    pub fn hash(&self, token: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

impl fmt::Debug for ResetTokenHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResetTokenHasher(<keyed>)")
    }
}
