//! Web Push message encryption (RFC 8291, `aes128gcm`) and VAPID
//! authorization (RFC 8292).

use crate::domain::model::SubscriptionKeys;
use crate::utils::error::{ProxiError, Result};
use aes_gcm::aead::Aead;
use aes_gcm::{Aes128Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hkdf::Hkdf;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;
use sha2::Sha256;

/// 單一 record 的大小（含 16 bytes tag）
pub const RECORD_SIZE: u32 = 4096;
/// salt(16) + rs(4) + idlen(1) + keyid(65)
pub const HEADER_LEN: usize = 86;
/// 推播服務接受的 body 上限為 4096 bytes，扣掉 header、分隔字元與 tag
pub const MAX_PAYLOAD_LEN: usize = 4096 - HEADER_LEN - 1 - 16;

const UNCOMPRESSED_KEY_LEN: usize = 65;
const AUTH_SECRET_LEN: usize = 16;
const VAPID_EXPIRY_SECS: i64 = 12 * 60 * 60;

/// Decodes base64url with or without padding; standard-alphabet input is accepted too.
pub fn decode_base64url(value: &str) -> Result<Vec<u8>> {
    let normalized: String = value
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    URL_SAFE_NO_PAD
        .decode(normalized.as_bytes())
        .map_err(|e| ProxiError::PushEncryption {
            message: format!("invalid base64url value: {}", e),
        })
}

/// Encrypts `payload` for the subscription with a fresh ephemeral key and salt.
pub fn encrypt(payload: &[u8], keys: &SubscriptionKeys) -> Result<Vec<u8>> {
    let ua_public = decode_base64url(&keys.p256dh)?;
    let auth_secret = decode_base64url(&keys.auth)?;

    let as_secret = SecretKey::random(&mut OsRng);
    let mut salt = [0u8; 16];
    OsRng.fill_bytes(&mut salt);

    encrypt_with(payload, &ua_public, &auth_secret, &as_secret, salt)
}

/// Deterministic core of [`encrypt`].
pub fn encrypt_with(
    payload: &[u8],
    ua_public: &[u8],
    auth_secret: &[u8],
    as_secret: &SecretKey,
    salt: [u8; 16],
) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(ProxiError::PushEncryption {
            message: format!(
                "payload is {} bytes, the limit is {}",
                payload.len(),
                MAX_PAYLOAD_LEN
            ),
        });
    }
    if ua_public.len() != UNCOMPRESSED_KEY_LEN {
        return Err(ProxiError::PushEncryption {
            message: format!("p256dh key must be {} bytes", UNCOMPRESSED_KEY_LEN),
        });
    }
    if auth_secret.len() != AUTH_SECRET_LEN {
        return Err(ProxiError::PushEncryption {
            message: format!("auth secret must be {} bytes", AUTH_SECRET_LEN),
        });
    }

    let ua_key = PublicKey::from_sec1_bytes(ua_public).map_err(|_| ProxiError::PushEncryption {
        message: "p256dh is not a valid P-256 point".to_string(),
    })?;
    let as_public = as_secret.public_key().to_encoded_point(false);

    let shared = p256::ecdh::diffie_hellman(as_secret.to_nonzero_scalar(), ua_key.as_affine());

    let (cek, nonce) = derive_content_keys(
        shared.raw_secret_bytes().as_slice(),
        auth_secret,
        ua_public,
        as_public.as_bytes(),
        &salt,
    )?;

    // 單一 record：內容後面接 0x02 分隔字元，不加 padding
    let mut plaintext = Vec::with_capacity(payload.len() + 1);
    plaintext.extend_from_slice(payload);
    plaintext.push(0x02);

    let cipher = Aes128Gcm::new_from_slice(&cek).map_err(|_| ProxiError::PushEncryption {
        message: "invalid content encryption key".to_string(),
    })?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
        .map_err(|_| ProxiError::PushEncryption {
            message: "AES-GCM encryption failed".to_string(),
        })?;

    let mut body = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    body.extend_from_slice(&salt);
    body.extend_from_slice(&RECORD_SIZE.to_be_bytes());
    body.push(UNCOMPRESSED_KEY_LEN as u8);
    body.extend_from_slice(as_public.as_bytes());
    body.extend_from_slice(&ciphertext);
    Ok(body)
}

/// Key schedule shared by sender and receiver: returns (CEK, NONCE).
pub fn derive_content_keys(
    ecdh_secret: &[u8],
    auth_secret: &[u8],
    ua_public: &[u8],
    as_public: &[u8],
    salt: &[u8],
) -> Result<([u8; 16], [u8; 12])> {
    let mut key_info = Vec::with_capacity(14 + UNCOMPRESSED_KEY_LEN * 2);
    key_info.extend_from_slice(b"WebPush: info\0");
    key_info.extend_from_slice(ua_public);
    key_info.extend_from_slice(as_public);

    let mut ikm = [0u8; 32];
    Hkdf::<Sha256>::new(Some(auth_secret), ecdh_secret)
        .expand(&key_info, &mut ikm)
        .map_err(hkdf_error)?;

    let prk = Hkdf::<Sha256>::new(Some(salt), &ikm);
    let mut cek = [0u8; 16];
    prk.expand(b"Content-Encoding: aes128gcm\0", &mut cek)
        .map_err(hkdf_error)?;
    let mut nonce = [0u8; 12];
    prk.expand(b"Content-Encoding: nonce\0", &mut nonce)
        .map_err(hkdf_error)?;

    Ok((cek, nonce))
}

fn hkdf_error(_: hkdf::InvalidLength) -> ProxiError {
    ProxiError::PushEncryption {
        message: "HKDF output length invalid".to_string(),
    }
}

#[derive(Serialize)]
struct VapidClaims<'a> {
    aud: &'a str,
    exp: i64,
    sub: &'a str,
}

/// Signs VAPID tokens with the application server's P-256 key.
#[derive(Clone)]
pub struct VapidSigner {
    signing_key: SigningKey,
    public_key: String,
    subject: String,
}

impl std::fmt::Debug for VapidSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VapidSigner")
            .field("public_key", &self.public_key)
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

impl VapidSigner {
    /// `public_key` is the uncompressed point, `private_key` the 32-byte
    /// scalar, both base64url. The pair must match.
    pub fn from_base64(public_key: &str, private_key: &str, subject: &str) -> Result<Self> {
        let private_bytes = decode_base64url(private_key)
            .map_err(|_| vapid_error("private key is not base64url"))?;
        let signing_key = SigningKey::from_slice(&private_bytes)
            .map_err(|_| vapid_error("private key is not a valid P-256 scalar"))?;

        let public_bytes =
            decode_base64url(public_key).map_err(|_| vapid_error("public key is not base64url"))?;
        let derived = PublicKey::from(signing_key.verifying_key()).to_encoded_point(false);
        if public_bytes.as_slice() != derived.as_bytes() {
            return Err(vapid_error("public key does not match the private key"));
        }

        Ok(Self {
            signing_key,
            public_key: URL_SAFE_NO_PAD.encode(derived.as_bytes()),
            subject: subject.to_string(),
        })
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// `Authorization` header value for a push to `endpoint`.
    pub fn authorization(&self, endpoint: &str, now_secs: i64) -> Result<String> {
        let token = self.token(endpoint, now_secs)?;
        Ok(format!("vapid t={}, k={}", token, self.public_key))
    }

    pub fn token(&self, endpoint: &str, now_secs: i64) -> Result<String> {
        let url = url::Url::parse(endpoint)
            .map_err(|e| vapid_error(&format!("invalid endpoint {}: {}", endpoint, e)))?;
        let audience = url.origin().ascii_serialization();

        let header = URL_SAFE_NO_PAD.encode(br#"{"typ":"JWT","alg":"ES256"}"#);
        let claims = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&VapidClaims {
            aud: &audience,
            exp: now_secs + VAPID_EXPIRY_SECS,
            sub: &self.subject,
        })?);

        let signing_input = format!("{}.{}", header, claims);
        let signature: Signature = self.signing_key.sign(signing_input.as_bytes());

        Ok(format!(
            "{}.{}",
            signing_input,
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }
}

fn vapid_error(message: &str) -> ProxiError {
    ProxiError::Vapid {
        message: message.to_string(),
    }
}

/// New VAPID key pair as (public, private), base64url.
pub fn generate_vapid_keys() -> (String, String) {
    let signing_key = SigningKey::random(&mut OsRng);
    let public = PublicKey::from(signing_key.verifying_key()).to_encoded_point(false);
    (
        URL_SAFE_NO_PAD.encode(public.as_bytes()),
        URL_SAFE_NO_PAD.encode(signing_key.to_bytes()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::signature::Verifier;
    use p256::ecdsa::VerifyingKey;

    /// 瀏覽器端的解密流程，用來驗證加密結果
    fn decrypt(body: &[u8], ua_secret: &SecretKey, auth_secret: &[u8]) -> Vec<u8> {
        let salt = &body[0..16];
        let rs = u32::from_be_bytes([body[16], body[17], body[18], body[19]]);
        assert_eq!(rs, RECORD_SIZE);
        let idlen = body[20] as usize;
        let as_public = &body[21..21 + idlen];
        let ciphertext = &body[21 + idlen..];

        let as_key = PublicKey::from_sec1_bytes(as_public).unwrap();
        let shared = p256::ecdh::diffie_hellman(ua_secret.to_nonzero_scalar(), as_key.as_affine());
        let ua_public = ua_secret.public_key().to_encoded_point(false);

        let (cek, nonce) = derive_content_keys(
            shared.raw_secret_bytes().as_slice(),
            auth_secret,
            ua_public.as_bytes(),
            as_public,
            salt,
        )
        .unwrap();

        let cipher = Aes128Gcm::new_from_slice(&cek).unwrap();
        let mut plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext)
            .unwrap();
        assert_eq!(plaintext.pop(), Some(0x02));
        plaintext
    }

    fn subscriber() -> (SecretKey, SubscriptionKeys, [u8; 16]) {
        let ua_secret = SecretKey::random(&mut OsRng);
        let auth = [7u8; 16];
        let keys = SubscriptionKeys {
            p256dh: URL_SAFE_NO_PAD.encode(ua_secret.public_key().to_encoded_point(false).as_bytes()),
            auth: URL_SAFE_NO_PAD.encode(auth),
        };
        (ua_secret, keys, auth)
    }

    #[test]
    fn test_encrypted_payload_decrypts_for_subscriber() {
        let (ua_secret, keys, auth) = subscriber();
        let payload = br#"{"title":"New message","body":"Your order is ready"}"#;

        let body = encrypt(payload, &keys).unwrap();

        assert_eq!(body[20] as usize, 65);
        assert_eq!(body.len(), HEADER_LEN + payload.len() + 1 + 16);
        assert_eq!(decrypt(&body, &ua_secret, &auth), payload.to_vec());
    }

    #[test]
    fn test_fresh_salt_and_key_per_message() {
        let (_, keys, _) = subscriber();
        let first = encrypt(b"hello", &keys).unwrap();
        let second = encrypt(b"hello", &keys).unwrap();
        assert_ne!(first[..HEADER_LEN], second[..HEADER_LEN]);
    }

    #[test]
    fn test_rejects_oversized_payload_and_bad_keys() {
        let (_, keys, _) = subscriber();
        assert!(encrypt(&vec![b'x'; MAX_PAYLOAD_LEN + 1], &keys).is_err());
        assert!(encrypt(&vec![b'x'; MAX_PAYLOAD_LEN], &keys).is_ok());

        let short_auth = SubscriptionKeys {
            auth: URL_SAFE_NO_PAD.encode([1u8; 8]),
            ..keys.clone()
        };
        assert!(encrypt(b"hi", &short_auth).is_err());

        let bad_point = SubscriptionKeys {
            p256dh: URL_SAFE_NO_PAD.encode([4u8; 65]),
            ..keys
        };
        assert!(encrypt(b"hi", &bad_point).is_err());
    }

    #[test]
    fn test_decode_accepts_padding_and_standard_alphabet() {
        assert_eq!(decode_base64url("-_8=").unwrap(), vec![0xfb, 0xff]);
        assert_eq!(decode_base64url("+/8").unwrap(), vec![0xfb, 0xff]);
        assert!(decode_base64url("@@@").is_err());
    }

    #[test]
    fn test_vapid_token_is_verifiable() {
        let (public, private) = generate_vapid_keys();
        let signer =
            VapidSigner::from_base64(&public, &private, "mailto:support@proxilink.com").unwrap();

        let token = signer
            .token("https://fcm.googleapis.com/fcm/send/abc123", 1_700_000_000)
            .unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);

        let claims: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        assert_eq!(claims["aud"], "https://fcm.googleapis.com");
        assert_eq!(claims["exp"], 1_700_000_000 + 12 * 60 * 60);
        assert_eq!(claims["sub"], "mailto:support@proxilink.com");

        let verifying_key =
            VerifyingKey::from_sec1_bytes(&URL_SAFE_NO_PAD.decode(&public).unwrap()).unwrap();
        let signature =
            Signature::from_slice(&URL_SAFE_NO_PAD.decode(parts[2]).unwrap()).unwrap();
        let signing_input = format!("{}.{}", parts[0], parts[1]);
        assert!(verifying_key
            .verify(signing_input.as_bytes(), &signature)
            .is_ok());

        let header = signer
            .authorization("https://updates.push.services.mozilla.com/wpush/v2/x", 0)
            .unwrap();
        assert!(header.starts_with("vapid t="));
        assert!(header.ends_with(&format!(", k={}", public)));
    }

    #[test]
    fn test_vapid_rejects_mismatched_pair() {
        let (public, _) = generate_vapid_keys();
        let (_, other_private) = generate_vapid_keys();
        assert!(matches!(
            VapidSigner::from_base64(&public, &other_private, "mailto:a@b.c"),
            Err(ProxiError::Vapid { .. })
        ));
        assert!(VapidSigner::from_base64("", "", "mailto:a@b.c").is_err());
    }
}
