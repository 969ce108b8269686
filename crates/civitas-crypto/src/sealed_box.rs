//! Anonymous public-key sealing: X25519 + BLAKE3 KDF + XChaCha20-Poly1305.
//!
//! The sender generates a fresh ephemeral key pair per message, so only the
//! holder of the recipient's static secret can open the payload and two seals
//! of the same plaintext never share a key or nonce.

use crate::kdf::derive_witness_key;
use crate::random::{random_bytes, RandomSource};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use civitas_types::{
    CivitasError, CivitasResult, ProverPublicKey, X25519_PUBLIC_KEY_SIZE, XCHACHA_NONCE_SIZE,
};
use x25519_dalek::{PublicKey, StaticSecret};

pub const TAG_SIZE: usize = 16;

pub struct EphemeralKeypair {
    secret: StaticSecret,
    public: PublicKey,
}

impl EphemeralKeypair {
    pub fn generate(rng: &dyn RandomSource) -> CivitasResult<Self> {
        let secret_bytes = random_bytes::<32>(rng)?;
        Ok(Self::from_secret(secret_bytes))
    }

    pub fn from_secret(secret: [u8; 32]) -> Self {
        let secret = StaticSecret::from(secret);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    pub fn public_key(&self) -> [u8; X25519_PUBLIC_KEY_SIZE] {
        *self.public.as_bytes()
    }

    /// Rejects low-order peer keys, which would yield an all-zero secret.
    pub fn diffie_hellman(&self, their_public: &[u8; X25519_PUBLIC_KEY_SIZE]) -> CivitasResult<[u8; 32]> {
        let shared = self.secret.diffie_hellman(&PublicKey::from(*their_public));
        if !shared.was_contributory() {
            return Err(CivitasError::InvalidKey(
                "peer public key is a low-order point".into(),
            ));
        }
        Ok(*shared.as_bytes())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedPayload {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; XCHACHA_NONCE_SIZE],
    pub ephemeral_public: [u8; X25519_PUBLIC_KEY_SIZE],
}

pub fn seal(
    recipient: &ProverPublicKey,
    plaintext: &[u8],
    rng: &dyn RandomSource,
) -> CivitasResult<SealedPayload> {
    let ephemeral = EphemeralKeypair::generate(rng)?;
    let shared = ephemeral.diffie_hellman(recipient.as_bytes())?;
    let key = derive_witness_key(&shared);

    let nonce_bytes = random_bytes::<XCHACHA_NONCE_SIZE>(rng)?;
    let ephemeral_public = ephemeral.public_key();

    let cipher = XChaCha20Poly1305::new_from_slice(key.as_bytes())
        .map_err(|e| CivitasError::Crypto(format!("Cipher init: {}", e)))?;

    let ciphertext = cipher
        .encrypt(
            XNonce::from_slice(&nonce_bytes),
            Payload {
                msg: plaintext,
                aad: &ephemeral_public,
            },
        )
        .map_err(|e| CivitasError::Crypto(format!("Encrypt: {}", e)))?;

    Ok(SealedPayload {
        ciphertext,
        nonce: nonce_bytes,
        ephemeral_public,
    })
}

/// Recipient side of [`seal`].
pub fn open(recipient_secret: &[u8; 32], sealed: &SealedPayload) -> CivitasResult<Vec<u8>> {
    if sealed.ciphertext.len() < TAG_SIZE {
        return Err(CivitasError::Crypto("Ciphertext too short".into()));
    }

    let recipient = EphemeralKeypair::from_secret(*recipient_secret);
    let shared = recipient.diffie_hellman(&sealed.ephemeral_public)?;
    let key = derive_witness_key(&shared);

    let cipher = XChaCha20Poly1305::new_from_slice(key.as_bytes())
        .map_err(|e| CivitasError::Crypto(format!("Cipher init: {}", e)))?;

    cipher
        .decrypt(
            XNonce::from_slice(&sealed.nonce),
            Payload {
                msg: &sealed.ciphertext,
                aad: &sealed.ephemeral_public,
            },
        )
        .map_err(|e| CivitasError::Crypto(format!("Decryption failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{DeterministicRandom, OsRandom};

    fn recipient() -> ([u8; 32], ProverPublicKey) {
        let secret = [0x5au8; 32];
        let public = EphemeralKeypair::from_secret(secret).public_key();
        (secret, ProverPublicKey::from_bytes(public))
    }

    #[test]
    fn test_diffie_hellman_agreement() {
        let alice = EphemeralKeypair::from_secret([1u8; 32]);
        let bob = EphemeralKeypair::from_secret([2u8; 32]);
        assert_eq!(
            alice.diffie_hellman(&bob.public_key()).unwrap(),
            bob.diffie_hellman(&alice.public_key()).unwrap()
        );
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let (secret, public) = recipient();
        let sealed = seal(&public, b"witness bytes", &OsRandom).unwrap();
        assert_eq!(open(&secret, &sealed).unwrap(), b"witness bytes");
    }

    #[test]
    fn test_fresh_randomness_per_seal() {
        let (_, public) = recipient();
        let a = seal(&public, b"same", &OsRandom).unwrap();
        let b = seal(&public, b"same", &OsRandom).unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ephemeral_public, b.ephemeral_public);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_deterministic_source_reproduces_seal() {
        let (_, public) = recipient();
        let a = seal(&public, b"same", &DeterministicRandom::from_seed(1)).unwrap();
        let b = seal(&public, b"same", &DeterministicRandom::from_seed(1)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_wrong_recipient_fails() {
        let (_, public) = recipient();
        let sealed = seal(&public, b"secret", &OsRandom).unwrap();
        assert!(open(&[0x77u8; 32], &sealed).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let (secret, public) = recipient();
        let mut sealed = seal(&public, b"secret", &OsRandom).unwrap();
        let last = sealed.ciphertext.len() - 1;
        sealed.ciphertext[last] ^= 0xff;
        assert!(open(&secret, &sealed).is_err());
    }

    #[test]
    fn test_swapped_ephemeral_key_fails() {
        let (secret, public) = recipient();
        let mut sealed = seal(&public, b"secret", &OsRandom).unwrap();
        sealed.ephemeral_public = EphemeralKeypair::from_secret([9u8; 32]).public_key();
        assert!(open(&secret, &sealed).is_err());
    }

    #[test]
    fn test_low_order_key_rejected() {
        let zero_key = ProverPublicKey::from_bytes([0u8; 32]);
        assert!(matches!(
            seal(&zero_key, b"x", &OsRandom),
            Err(CivitasError::InvalidKey(_))
        ));
    }
}
