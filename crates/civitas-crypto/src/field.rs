//! BN254 scalar field elements with a fixed-width hex wire form.
//!
//! Every value that enters a Poseidon hash or leaves this workspace as a
//! proof input is a [`FieldElement`]. The canonical text encoding is `0x`
//! followed by exactly 64 lowercase big-endian hex digits, which round-trips
//! losslessly through JSON and any string-keyed store.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use civitas_types::{CivitasError, CivitasResult, FIELD_ELEMENT_SIZE};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

const HEX_DIGITS: usize = FIELD_ELEMENT_SIZE * 2;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldElement(Fr);

impl FieldElement {
    pub fn zero() -> Self {
        Self(Fr::from(0u64))
    }

    pub fn from_u64(value: u64) -> Self {
        Self(Fr::from(value))
    }

    pub fn from_fr(value: Fr) -> Self {
        Self(value)
    }

    pub fn as_fr(&self) -> Fr {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == Fr::from(0u64)
    }

    /// Parses a canonical field element. Values at or above the field
    /// modulus are rejected rather than silently reduced.
    pub fn from_hex(s: &str) -> CivitasResult<Self> {
        let bytes = decode_padded_hex(s)?;
        let reduced = Fr::from_be_bytes_mod_order(&bytes);
        if fr_to_be_bytes(&reduced) != bytes {
            return Err(CivitasError::Construction(
                "field element is not below the field modulus".into(),
            ));
        }
        Ok(Self(reduced))
    }

    /// Parses a 256-bit hex digest and reduces it into the field. Used for
    /// SHA-256 commitments and raw entropy, which may exceed the modulus.
    pub fn from_hex_reduced(s: &str) -> CivitasResult<Self> {
        let bytes = decode_padded_hex(s)?;
        Ok(Self(Fr::from_be_bytes_mod_order(&bytes)))
    }

    pub fn from_be_bytes_reduced(bytes: &[u8]) -> Self {
        Self(Fr::from_be_bytes_mod_order(bytes))
    }

    pub fn to_be_bytes(&self) -> [u8; FIELD_ELEMENT_SIZE] {
        fr_to_be_bytes(&self.0)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_be_bytes()))
    }

    /// The `count` least-significant bits, lowest first.
    pub fn low_bits(&self, count: usize) -> Vec<bool> {
        let mut bits = self.0.into_bigint().to_bits_le();
        bits.resize(count.max(bits.len()), false);
        bits.truncate(count);
        bits
    }
}

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<Fr> for FieldElement {
    fn from(value: Fr) -> Self {
        Self(value)
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement({})", self.to_hex())
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for FieldElement {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FieldElement::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

fn fr_to_be_bytes(f: &Fr) -> [u8; FIELD_ELEMENT_SIZE] {
    let bytes = f.into_bigint().to_bytes_be();
    let mut out = [0u8; FIELD_ELEMENT_SIZE];
    out[FIELD_ELEMENT_SIZE - bytes.len()..].copy_from_slice(&bytes);
    out
}

/// Accepts 1..=64 hex digits with an optional `0x` prefix and left-pads to
/// 32 bytes.
fn decode_padded_hex(s: &str) -> CivitasResult<[u8; FIELD_ELEMENT_SIZE]> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() {
        return Err(CivitasError::Construction("empty field element".into()));
    }
    if digits.len() > HEX_DIGITS {
        return Err(CivitasError::Construction(format!(
            "field element has {} hex digits, maximum is {}",
            digits.len(),
            HEX_DIGITS
        )));
    }

    let padded = format!("{:0>width$}", digits, width = HEX_DIGITS);
    let bytes = hex::decode(&padded)
        .map_err(|_| CivitasError::Construction("malformed field element hex".into()))?;

    let mut out = [0u8; FIELD_ELEMENT_SIZE];
    out.copy_from_slice(&bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip_is_fixed_width() {
        let value = FieldElement::from_u64(0xdeadbeef);
        let hex = value.to_hex();
        assert_eq!(hex.len(), 66);
        assert!(hex.starts_with("0x"));
        assert!(hex.ends_with("deadbeef"));
        assert_eq!(FieldElement::from_hex(&hex).unwrap(), value);
    }

    #[test]
    fn test_short_and_unprefixed_hex() {
        assert_eq!(FieldElement::from_hex("0x1").unwrap(), FieldElement::from_u64(1));
        assert_eq!(FieldElement::from_hex("ff").unwrap(), FieldElement::from_u64(255));
    }

    #[test]
    fn test_malformed_hex_rejected() {
        assert!(matches!(FieldElement::from_hex(""), Err(CivitasError::Construction(_))));
        assert!(matches!(FieldElement::from_hex("0x"), Err(CivitasError::Construction(_))));
        assert!(matches!(FieldElement::from_hex("0xzz"), Err(CivitasError::Construction(_))));
        let too_long = format!("0x{}", "1".repeat(65));
        assert!(matches!(FieldElement::from_hex(&too_long), Err(CivitasError::Construction(_))));
    }

    #[test]
    fn test_modulus_overflow_strict_vs_reduced() {
        let max = format!("0x{}", "f".repeat(64));
        assert!(FieldElement::from_hex(&max).is_err());

        let reduced = FieldElement::from_hex_reduced(&max).unwrap();
        assert!(FieldElement::from_hex(&reduced.to_hex()).is_ok());
    }

    #[test]
    fn test_rejection_errors_do_not_echo_input() {
        let secret_like = format!("0x{}", "fedcba98".repeat(8));
        let err = FieldElement::from_hex(&secret_like).unwrap_err().to_string();
        assert!(!err.contains("fedcba98"));

        let bad = "0x5ec7e7zz";
        let err = FieldElement::from_hex(bad).unwrap_err().to_string();
        assert!(!err.contains("5ec7e7"));
        assert!(!err.contains('z'));
    }

    #[test]
    fn test_low_bits() {
        let value = FieldElement::from_u64(0b1011);
        let bits = value.low_bits(6);
        assert_eq!(bits, vec![true, true, false, true, false, false]);
        assert_eq!(FieldElement::zero().low_bits(20), vec![false; 20]);
    }

    #[test]
    fn test_serde_as_hex_string() {
        let value = FieldElement::from_u64(42);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, format!("\"{}\"", value.to_hex()));
        let back: FieldElement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);

        assert!(serde_json::from_str::<FieldElement>("\"0xnothex\"").is_err());
    }
}
