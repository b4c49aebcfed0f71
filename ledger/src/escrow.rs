//! Dual-control identity escrow.
//!
//! A reporter's identity is encrypted with ChaCha20-Poly1305 under a fresh
//! 256-bit key at write time. The key is split 2-of-2 with Shamir sharing
//! and handed to two independent holders; only the ciphertext stays in the
//! vault. Reconstruction needs both parts plus a court-order reference.
//!
//! Every reconstruction attempt, revealed or denied, appends exactly one
//! entry to the audit chain. A refusal is an expected outcome
//! ([`EscrowOutcome::Denied`]), not an error.

use std::collections::HashMap;
use std::sync::Arc;

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::audit::{AuditChain, AuditRecord};
use crate::shamir::{self, KeyShare};
use crate::types::{require, LedgerError, Result};

/// Escrow key length (ChaCha20-Poly1305).
pub const KEY_LEN: usize = 32;
/// Nonce length (ChaCha20-Poly1305).
pub const NONCE_LEN: usize = 12;

/// Audit action recorded for every reconstruction attempt.
pub const RECONSTRUCT_ACTION: &str = "identity_reconstruct";

/// Request to unmask a redacted identity.
#[derive(Clone, Default, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct IdentityUnlockRequest {
    /// Report or user whose identity is escrowed
    pub target_id: String,
    pub key_part1: String,
    pub key_part2: String,
    /// Reference to the authorizing court order
    pub court_order_hash: String,
}

impl std::fmt::Debug for IdentityUnlockRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityUnlockRequest")
            .field("target_id", &self.target_id)
            .field("key_part1", &"<redacted>")
            .field("key_part2", &"<redacted>")
            .field("court_order_hash", &self.court_order_hash)
            .finish()
    }
}

/// Result of a reconstruction attempt.
pub enum EscrowOutcome {
    /// Plaintext identity, zeroized on drop
    Revealed(Zeroizing<String>),
    /// Reconstruction refused
    Denied { reason: String },
}

impl EscrowOutcome {
    /// Whether the identity was revealed.
    pub fn is_revealed(&self) -> bool {
        matches!(self, EscrowOutcome::Revealed(_))
    }
}

impl std::fmt::Debug for EscrowOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EscrowOutcome::Revealed(_) => f.write_str("Revealed(<redacted>)"),
            EscrowOutcome::Denied { reason } => {
                f.debug_struct("Denied").field("reason", reason).finish()
            }
        }
    }
}

/// Encrypted identity as held in the vault and in persistent storage.
///
/// Holds no key material; without both key parts it reveals nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedIdentity {
    pub target_id: String,
    #[serde(with = "base64_bytes")]
    nonce: Vec<u8>,
    #[serde(with = "base64_bytes")]
    ciphertext: Vec<u8>,
}

impl SealedIdentity {
    /// Encrypt an identity under a fresh key and split the key in two.
    ///
    /// Nothing is stored; the caller decides where the sealed record goes
    /// and distributes the parts to separate holders.
    pub fn encrypt(target_id: &str, identity: &str) -> Result<(Self, [String; 2])> {
        require("target_id", target_id)?;
        require("identity", identity)?;

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        OsRng.fill_bytes(&mut key[..]);
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key[..]));
        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: identity.as_bytes(),
                    aad: target_id.as_bytes(),
                },
            )
            .map_err(|e| LedgerError::Crypto(format!("Encryption failed: {e}")))?;

        let shares = shamir::split(&key[..], 2, 2)?;
        let sealed = Self {
            target_id: target_id.to_string(),
            nonce: nonce.to_vec(),
            ciphertext,
        };
        Ok((sealed, [shares[0].encode(), shares[1].encode()]))
    }

    fn check(&self) -> Result<()> {
        require("target_id", &self.target_id)?;
        if self.nonce.len() != NONCE_LEN {
            return Err(LedgerError::InvalidInput(format!(
                "sealed identity for {} has a {}-byte nonce",
                self.target_id,
                self.nonce.len()
            )));
        }
        Ok(())
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

/// Vault of sealed identities, audited on every unlock attempt.
pub struct IdentityEscrow {
    vault: Arc<RwLock<HashMap<String, SealedIdentity>>>,
    audit: Arc<AuditChain>,
}

impl IdentityEscrow {
    /// Create an empty escrow that records attempts in `audit`.
    pub fn new(audit: Arc<AuditChain>) -> Self {
        Self {
            vault: Arc::new(RwLock::new(HashMap::new())),
            audit,
        }
    }

    /// Rebuild an escrow from previously sealed records.
    pub fn restore(audit: Arc<AuditChain>, sealed: Vec<SealedIdentity>) -> Result<Self> {
        let mut vault = HashMap::with_capacity(sealed.len());
        for record in sealed {
            record.check()?;
            vault.insert(record.target_id.clone(), record);
        }
        Ok(Self {
            vault: Arc::new(RwLock::new(vault)),
            audit,
        })
    }

    /// Seal an identity and return the two encoded key parts.
    ///
    /// The caller distributes the parts to separate holders; the escrow
    /// keeps neither.
    pub async fn seal(&self, target_id: &str, identity: &str) -> Result<[String; 2]> {
        let (sealed, parts) = SealedIdentity::encrypt(target_id, identity)?;
        self.insert(sealed).await?;
        Ok(parts)
    }

    /// Add a sealed record to the vault. Fails if the target already has one.
    pub async fn insert(&self, sealed: SealedIdentity) -> Result<()> {
        sealed.check()?;

        let mut vault = self.vault.write().await;
        if vault.contains_key(&sealed.target_id) {
            return Err(LedgerError::InvalidInput(format!(
                "identity for {} is already sealed",
                sealed.target_id
            )));
        }

        info!(target_id = %sealed.target_id, "Identity sealed in escrow");
        vault.insert(sealed.target_id.clone(), sealed);
        Ok(())
    }

    /// Whether an identity is sealed for `target_id`.
    pub async fn is_sealed(&self, target_id: &str) -> bool {
        self.vault.read().await.contains_key(target_id)
    }

    /// Attempt to reconstruct an identity.
    ///
    /// Appends one audit entry per call. If that append fails, the call
    /// errors and no plaintext is returned.
    pub async fn reconstruct(
        &self,
        actor: &str,
        role: &str,
        request: &IdentityUnlockRequest,
    ) -> Result<EscrowOutcome> {
        require("actor", actor)?;
        require("role", role)?;
        require("target_id", &request.target_id)?;

        let attempt = self.try_reveal(request).await;

        let court_order = request.court_order_hash.trim();
        let record = AuditRecord::new(actor, role, RECONSTRUCT_ACTION, request.target_id.as_str());
        let record = match &attempt {
            Ok(_) => record
                .with_details(serde_json::json!({
                    "court_order": court_order,
                    "outcome": "revealed",
                }))
                .with_reason_code("COURT_ORDER"),
            Err(reason) => record
                .with_details(serde_json::json!({
                    "court_order": court_order,
                    "outcome": "denied",
                    "reason": reason,
                }))
                .with_reason_code("RECONSTRUCT_DENIED"),
        };
        self.audit.append(record).await?;

        match attempt {
            Ok(identity) => {
                warn!(
                    actor = %actor,
                    target_id = %request.target_id,
                    court_order = %court_order,
                    "Escrowed identity revealed"
                );
                Ok(EscrowOutcome::Revealed(identity))
            }
            Err(reason) => {
                info!(
                    actor = %actor,
                    target_id = %request.target_id,
                    reason = %reason,
                    "Identity reconstruction denied"
                );
                Ok(EscrowOutcome::Denied { reason })
            }
        }
    }

    async fn try_reveal(
        &self,
        request: &IdentityUnlockRequest,
    ) -> std::result::Result<Zeroizing<String>, String> {
        if request.key_part1.trim().is_empty() || request.key_part2.trim().is_empty() {
            return Err("both key parts are required".to_string());
        }
        if request.court_order_hash.trim().is_empty() {
            return Err("court order reference is required".to_string());
        }

        let shares = [
            KeyShare::decode(&request.key_part1),
            KeyShare::decode(&request.key_part2),
        ];
        let shares: Vec<KeyShare> = shares
            .into_iter()
            .collect::<Result<_>>()
            .map_err(|_| "malformed key part".to_string())?;

        let key = shamir::combine(&shares)
            .map_err(|_| "key parts do not form a valid pair".to_string())?;
        if key.len() != KEY_LEN {
            return Err("key parts do not reconstruct the escrow key".to_string());
        }

        let vault = self.vault.read().await;
        let sealed = vault
            .get(&request.target_id)
            .ok_or_else(|| "no escrowed identity for target".to_string())?;

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(&sealed.nonce),
                Payload {
                    msg: &sealed.ciphertext,
                    aad: request.target_id.as_bytes(),
                },
            )
            .map(Zeroizing::new)
            .map_err(|_| "key parts do not reconstruct the escrow key".to_string())?;

        String::from_utf8(plaintext.to_vec())
            .map(Zeroizing::new)
            .map_err(|_| "escrowed identity is not valid text".to_string())
    }
}
