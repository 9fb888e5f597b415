//! Device identity sent during the installation handshake
use anyhow::{Result, anyhow};
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use tracing::{debug, warn};
use uuid::Uuid;

/// Returns the configured installation id, or a fresh random one.
pub fn installation_id(app_id: Option<&str>) -> String {
    if let Some(id) = app_id.map(str::trim).filter(|id| !id.is_empty()) {
        return id.to_string();
    }

    let generated = Uuid::new_v4().to_string();
    warn!(
        app_id = %generated,
        "No app_id configured, generated a new installation id. Set a stable app_id to reuse it across runs"
    );
    generated
}

/// Generates an RSA keypair and returns the public half as a
/// SubjectPublicKeyInfo PEM document. The private key is discarded.
pub fn generate_public_key_pem(bits: usize) -> Result<String> {
    debug!(bits, "Generating RSA keypair");
    let mut rng = rand::thread_rng();
    let private_key = RsaPrivateKey::new(&mut rng, bits)
        .map_err(|e| anyhow!("Failed to generate {bits}-bit RSA key: {e}"))?;
    let public_key = RsaPublicKey::from(&private_key);

    public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| anyhow!("Failed to encode public key as PEM: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::DecodePublicKey;
    use rsa::traits::PublicKeyParts;

    #[test]
    fn test_configured_installation_id_is_kept() {
        assert_eq!(installation_id(Some(" my-app ")), "my-app");
    }

    #[test]
    fn test_installation_id_is_generated_when_missing() {
        let first = installation_id(None);
        let second = installation_id(Some(""));
        assert!(Uuid::parse_str(&first).is_ok());
        assert!(Uuid::parse_str(&second).is_ok());
        assert_ne!(first, second);
    }

    #[test]
    fn test_generate_public_key_pem() {
        let pem = generate_public_key_pem(1024).unwrap();
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
        assert!(pem.trim_end().ends_with("-----END PUBLIC KEY-----"));

        let key = RsaPublicKey::from_public_key_pem(&pem).unwrap();
        assert_eq!(key.size() * 8, 1024);
    }
}
