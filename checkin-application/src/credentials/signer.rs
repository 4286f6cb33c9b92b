use anyhow::anyhow;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use checkin_domain::{AttendeeId, EventId, Registration, RegistrationId};

use crate::AppError;

/// Fixed application-level salt mixed into every credential hash.
pub const CREDENTIAL_SALT: &str = "checkin|registration-credential";

type HmacSha256 = Hmac<Sha256>;

/// The registration fields a security hash binds together.
#[derive(Debug, Clone, Copy)]
pub struct SignedFields<'a> {
    pub registration_id: RegistrationId,
    pub registration_code: &'a str,
    pub event_id: EventId,
    pub attendee_id: AttendeeId,
    pub registered_at: DateTime<Utc>,
}

impl<'a> SignedFields<'a> {
    pub fn of(registration: &'a Registration) -> Self {
        Self {
            registration_id: registration.id,
            registration_code: registration.registration_code.as_str(),
            event_id: registration.event_id,
            attendee_id: registration.attendee_id,
            registered_at: registration.registration_date,
        }
    }

    fn canonical(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}",
            CREDENTIAL_SALT,
            self.registration_id,
            self.registration_code,
            self.event_id,
            self.attendee_id,
            self.registered_at.timestamp_micros()
        )
    }
}

/// HMAC-SHA256 over the canonical registration fields, keyed by the deployment secret.
/// Rotating the secret invalidates every credential issued before the rotation.
#[derive(Clone)]
pub struct CredentialSigner {
    secret: Vec<u8>,
}

impl std::fmt::Debug for CredentialSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSigner").finish_non_exhaustive()
    }
}

impl CredentialSigner {
    pub fn new(secret_key: &str) -> Result<Self, AppError> {
        let secret = secret_key.trim();
        if secret.is_empty() {
            return Err(AppError::Internal(anyhow!("credential secret must not be empty")));
        }
        Ok(Self {
            secret: secret.as_bytes().to_vec(),
        })
    }

    fn mac(&self, fields: &SignedFields<'_>) -> Result<HmacSha256, AppError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|err| AppError::Internal(anyhow!("hmac init failed: {err}")))?;
        mac.update(fields.canonical().as_bytes());
        Ok(mac)
    }

    pub fn sign(&self, fields: &SignedFields<'_>) -> Result<String, AppError> {
        let digest = self.mac(fields)?.finalize().into_bytes();
        Ok(hex::encode(digest))
    }

    /// Constant-time comparison of `claimed_hash` against the recomputed digest.
    pub fn verify(&self, claimed_hash: &str, fields: &SignedFields<'_>) -> bool {
        let Ok(claimed) = hex::decode(claimed_hash.trim()) else {
            return false;
        };
        match self.mac(fields) {
            Ok(mac) => mac.verify_slice(&claimed).is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(code: &str) -> SignedFields<'_> {
        SignedFields {
            registration_id: RegistrationId(11),
            registration_code: code,
            event_id: EventId(5),
            attendee_id: AttendeeId(8),
            registered_at: DateTime::from_timestamp(1_760_000_000, 0).expect("timestamp"),
        }
    }

    #[test]
    fn signing_is_deterministic_hex() {
        let signer = CredentialSigner::new("secret").expect("signer");
        let first = signer.sign(&fields("AB12CD34")).expect("sign");
        let second = signer.sign(&fields("AB12CD34")).expect("sign");
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn verify_accepts_own_signature() {
        let signer = CredentialSigner::new("secret").expect("signer");
        let hash = signer.sign(&fields("AB12CD34")).expect("sign");
        assert!(signer.verify(&hash, &fields("AB12CD34")));
    }

    #[test]
    fn flipping_any_hash_byte_fails_verification() {
        let signer = CredentialSigner::new("secret").expect("signer");
        let hash = signer.sign(&fields("AB12CD34")).expect("sign");
        let bytes = hex::decode(&hash).expect("hex");
        for index in 0..bytes.len() {
            let mut tampered = bytes.clone();
            tampered[index] ^= 0x01;
            assert!(!signer.verify(&hex::encode(tampered), &fields("AB12CD34")));
        }
    }

    #[test]
    fn different_fields_or_secret_do_not_verify() {
        let signer = CredentialSigner::new("secret").expect("signer");
        let hash = signer.sign(&fields("AB12CD34")).expect("sign");
        assert!(!signer.verify(&hash, &fields("AB12CD35")));

        let rotated = CredentialSigner::new("rotated").expect("signer");
        assert!(!rotated.verify(&hash, &fields("AB12CD34")));
        assert!(!signer.verify("not-hex", &fields("AB12CD34")));
    }

    #[test]
    fn empty_secret_is_refused() {
        assert!(CredentialSigner::new("   ").is_err());
    }
}
