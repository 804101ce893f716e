use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Header Vercel puts the body signature in.
pub const SIGNATURE_HEADER: &str = "x-vercel-signature";

/// Length of a lowercase hex SHA-1 digest.
const SIGNATURE_HEX_LEN: usize = 40;

/// HMAC-SHA1 verifier for Vercel webhook signatures
///
/// Vercel signs the raw request body with the integration secret and sends
/// the lowercase hex digest. Verification must run on the exact bytes
/// received; re-serialized JSON will not match.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Vec<u8>,
}

impl SignatureVerifier {
    /// New verifier with the given shared secret
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Hex digest of a body, as Vercel would send it
    pub fn sign(&self, body: &[u8]) -> String {
        let mac = self.mac(body);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verify a signature header value against the raw body.
    ///
    /// The header must be exactly the digest [`sign`](Self::sign) produces:
    /// 40 lowercase hex characters, nothing around them. Anything else fails.
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> bool {
        let Some(signature) = signature.filter(|s| is_lowercase_hex_digest(s)) else {
            return false;
        };

        let Ok(expected) = hex::decode(signature) else {
            return false;
        };

        // verify_slice compares in constant time and rejects wrong lengths
        self.mac(body).verify_slice(&expected).is_ok()
    }

    fn mac(&self, body: &[u8]) -> HmacSha1 {
        let mut mac = match HmacSha1::new_from_slice(&self.secret) {
            Ok(mac) => mac,
            Err(_) => unreachable!("HMAC key can be of any size, as per crate documentation"),
        };
        mac.update(body);
        mac
    }
}

fn is_lowercase_hex_digest(value: &str) -> bool {
    value.len() == SIGNATURE_HEX_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
