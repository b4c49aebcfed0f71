//! Shamir secret sharing over GF(2^8).
//!
//! Each secret byte is the constant term of a random polynomial of degree
//! `threshold - 1`; share `x` holds the polynomial evaluated at `x`. Any
//! `threshold` shares recover the secret by Lagrange interpolation at 0,
//! fewer reveal nothing about it.

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::types::{LedgerError, Result};

/// Multiply in GF(2^8) modulo the AES polynomial x^8 + x^4 + x^3 + x + 1.
fn gf_mul(mut a: u8, mut b: u8) -> u8 {
    let mut product = 0u8;
    while b != 0 {
        if b & 1 != 0 {
            product ^= a;
        }
        let carry = a & 0x80;
        a <<= 1;
        if carry != 0 {
            a ^= 0x1b;
        }
        b >>= 1;
    }
    product
}

/// Multiplicative inverse (a^254). `a` must be non-zero.
fn gf_inv(a: u8) -> u8 {
    let mut result = 1u8;
    let mut base = a;
    let mut exp = 254u8;
    while exp > 0 {
        if exp & 1 == 1 {
            result = gf_mul(result, base);
        }
        base = gf_mul(base, base);
        exp >>= 1;
    }
    result
}

/// One share of a split secret.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyShare {
    /// Evaluation point (1 - 255)
    pub index: u8,
    /// Shares needed to reconstruct
    pub threshold: u8,
    data: Vec<u8>,
}

impl std::fmt::Debug for KeyShare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyShare")
            .field("index", &self.index)
            .field("threshold", &self.threshold)
            .field("data", &"<redacted>")
            .finish()
    }
}

impl KeyShare {
    /// Encode as `<index>-<threshold>-<base64 data>`.
    pub fn encode(&self) -> String {
        format!("{}-{}-{}", self.index, self.threshold, STANDARD.encode(&self.data))
    }

    /// Parse an encoded share.
    pub fn decode(encoded: &str) -> Result<Self> {
        let malformed = || LedgerError::InvalidInput("malformed key share".to_string());

        let mut parts = encoded.trim().splitn(3, '-');
        let index: u8 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(malformed)?;
        let threshold: u8 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(malformed)?;
        let data = parts
            .next()
            .and_then(|p| STANDARD.decode(p).ok())
            .ok_or_else(malformed)?;

        if index == 0 || threshold < 2 || data.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            index,
            threshold,
            data,
        })
    }

    /// Length of the shared secret in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the share carries no data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Split `secret` into `shares` shares, any `threshold` of which recover it.
pub fn split(secret: &[u8], threshold: u8, shares: u8) -> Result<Vec<KeyShare>> {
    if secret.is_empty() {
        return Err(LedgerError::InvalidInput("secret must not be empty".to_string()));
    }
    if threshold < 2 || threshold > shares {
        return Err(LedgerError::InvalidInput(format!(
            "threshold must be between 2 and {}, got {}",
            shares, threshold
        )));
    }

    let mut output: Vec<KeyShare> = (1..=shares)
        .map(|index| KeyShare {
            index,
            threshold,
            data: Vec::with_capacity(secret.len()),
        })
        .collect();

    let mut coefficients = Zeroizing::new(vec![0u8; threshold as usize]);
    for &byte in secret {
        coefficients[0] = byte;
        OsRng.fill_bytes(&mut coefficients[1..]);

        for share in output.iter_mut() {
            // Horner evaluation at x = index
            let y = coefficients
                .iter()
                .rev()
                .fold(0u8, |acc, &c| gf_mul(acc, share.index) ^ c);
            share.data.push(y);
        }
    }

    Ok(output)
}

/// Recover a secret from at least `threshold` distinct shares.
pub fn combine(shares: &[KeyShare]) -> Result<Zeroizing<Vec<u8>>> {
    let first = shares
        .first()
        .ok_or_else(|| LedgerError::InvalidInput("no shares supplied".to_string()))?;
    let threshold = first.threshold as usize;

    if shares.len() < threshold {
        return Err(LedgerError::InvalidInput(format!(
            "{} of {} required shares supplied",
            shares.len(),
            threshold
        )));
    }

    for (i, share) in shares.iter().enumerate() {
        if share.threshold != first.threshold || share.data.len() != first.data.len() {
            return Err(LedgerError::InvalidInput(
                "shares belong to different splits".to_string(),
            ));
        }
        if share.index == 0 || shares[..i].iter().any(|s| s.index == share.index) {
            return Err(LedgerError::InvalidInput(format!(
                "duplicate or invalid share index {}",
                share.index
            )));
        }
    }

    let used = &shares[..threshold];
    let mut secret = Zeroizing::new(vec![0u8; first.data.len()]);

    for (i, share) in used.iter().enumerate() {
        let mut numerator = 1u8;
        let mut denominator = 1u8;
        for (j, other) in used.iter().enumerate() {
            if i != j {
                numerator = gf_mul(numerator, other.index);
                denominator = gf_mul(denominator, other.index ^ share.index);
            }
        }
        let basis = gf_mul(numerator, gf_inv(denominator));

        for (out, &y) in secret.iter_mut().zip(share.data.iter()) {
            *out ^= gf_mul(y, basis);
        }
    }

    Ok(secret)
}
