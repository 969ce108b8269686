//! Canonical Poseidon hashing over the BN254 scalar field.
//!
//! Every commitment, tree leaf and tree node in Civitas goes through the
//! functions in this module so that the client, the registry and the proving
//! service agree bit-for-bit.
//!
//! ## Parameters (BN254 Scalar Field)
//! - Width: 3 (rate=2, capacity=1)
//! - Full rounds: 8
//! - Partial rounds: 57
//! - S-box: x^5
//! - Round constants: Grain LFSR (arkworks standard)
//!
//! ## Domain separation
//! Each fixed-arity hash absorbs a distinct domain tag before its inputs, so
//! `hash2(a, b)` can never equal `hash3(a, b, 0)`. The fixed-width sponge
//! additionally absorbs its width.
//!
//! ## Output Convention
//! All hash functions output the FIRST element of the sponge state after
//! squeezing, as arkworks `PoseidonSponge` does.

use crate::field::FieldElement;
use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    poseidon::{find_poseidon_ark_and_mds, PoseidonConfig, PoseidonSponge},
    CryptographicSponge,
};
use civitas_types::{CivitasError, CivitasResult, DISTRICT_SLOTS};
use std::sync::OnceLock;

pub const HASH1_DOMAIN: u64 = 0x4831;
pub const HASH2_DOMAIN: u64 = 0x4832;
pub const HASH3_DOMAIN: u64 = 0x4833;
pub const HASH4_DOMAIN: u64 = 0x4834;
pub const SPONGE_DOMAIN: u64 = 0x53_50_4f_4e_47_45;

static CANONICAL_CONFIG: OnceLock<PoseidonConfig<Fr>> = OnceLock::new();

pub fn canonical_config() -> &'static PoseidonConfig<Fr> {
    CANONICAL_CONFIG.get_or_init(|| {
        let rate = 2;
        let alpha = 5u64;
        let full_rounds = 8;
        let partial_rounds = 57;
        let field_bits = 254;

        let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
            field_bits,
            rate,
            full_rounds,
            partial_rounds,
            0, // skip_matrices
        );

        PoseidonConfig {
            full_rounds: full_rounds as usize,
            partial_rounds: partial_rounds as usize,
            alpha,
            ark,
            mds,
            rate,
            capacity: 1,
        }
    })
}

/// Raw sponge over field elements, no domain tag. Returns the first squeezed
/// element.
pub fn poseidon_hash_fields(inputs: &[Fr]) -> Fr {
    let config = canonical_config();
    let mut sponge = PoseidonSponge::new(config);
    for input in inputs {
        sponge.absorb(input);
    }
    let output: Vec<Fr> = sponge.squeeze_field_elements(1);
    output[0]
}

fn hash_with_domain(domain: u64, inputs: &[FieldElement]) -> FieldElement {
    let mut absorbed = Vec::with_capacity(inputs.len() + 1);
    absorbed.push(Fr::from(domain));
    absorbed.extend(inputs.iter().map(FieldElement::as_fr));
    FieldElement::from_fr(poseidon_hash_fields(&absorbed))
}

pub fn hash1(a: &FieldElement) -> FieldElement {
    hash_with_domain(HASH1_DOMAIN, &[*a])
}

/// Two-to-one compression. Used for every Merkle node.
pub fn hash2(left: &FieldElement, right: &FieldElement) -> FieldElement {
    hash_with_domain(HASH2_DOMAIN, &[*left, *right])
}

pub fn hash3(a: &FieldElement, b: &FieldElement, c: &FieldElement) -> FieldElement {
    hash_with_domain(HASH3_DOMAIN, &[*a, *b, *c])
}

pub fn hash4(
    a: &FieldElement,
    b: &FieldElement,
    c: &FieldElement,
    d: &FieldElement,
) -> FieldElement {
    hash_with_domain(HASH4_DOMAIN, &[*a, *b, *c, *d])
}

/// Reduces exactly `width` inputs to one element. The width is part of the
/// domain so sponges of different widths never collide.
pub fn sponge_fixed(inputs: &[FieldElement], width: usize) -> CivitasResult<FieldElement> {
    if inputs.len() != width {
        return Err(CivitasError::Construction(format!(
            "sponge expects exactly {} inputs, got {}",
            width,
            inputs.len()
        )));
    }

    let mut absorbed = Vec::with_capacity(width + 2);
    absorbed.push(Fr::from(SPONGE_DOMAIN));
    absorbed.push(Fr::from(width as u64));
    absorbed.extend(inputs.iter().map(FieldElement::as_fr));
    Ok(FieldElement::from_fr(poseidon_hash_fields(&absorbed)))
}

/// The 24-slot district sponge.
pub fn sponge24(districts: &[FieldElement; DISTRICT_SLOTS]) -> FieldElement {
    let mut absorbed = Vec::with_capacity(DISTRICT_SLOTS + 2);
    absorbed.push(Fr::from(SPONGE_DOMAIN));
    absorbed.push(Fr::from(DISTRICT_SLOTS as u64));
    absorbed.extend(districts.iter().map(FieldElement::as_fr));
    FieldElement::from_fr(poseidon_hash_fields(&absorbed))
}

// ============================================================================
// Hex Interface
// ============================================================================

/// Hashes 1 to 4 hex-encoded field elements with the matching fixed-arity
/// function and returns the canonical hex digest. Malformed inputs surface as
/// construction errors.
pub fn hash_hex(inputs: &[&str]) -> CivitasResult<String> {
    let parsed = inputs
        .iter()
        .map(|s| FieldElement::from_hex(s))
        .collect::<CivitasResult<Vec<_>>>()?;

    let digest = match parsed.as_slice() {
        [a] => hash1(a),
        [a, b] => hash2(a, b),
        [a, b, c] => hash3(a, b, c),
        [a, b, c, d] => hash4(a, b, c, d),
        other => {
            return Err(CivitasError::Construction(format!(
                "no fixed-arity hash for {} inputs",
                other.len()
            )))
        }
    };

    Ok(digest.to_hex())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fe(v: u64) -> FieldElement {
        FieldElement::from_u64(v)
    }

    #[test]
    fn test_hash_deterministic() {
        let h1 = hash2(&fe(12345), &fe(67890));
        let h2 = hash2(&fe(12345), &fe(67890));
        assert_eq!(h1, h2);

        // Order matters
        let h3 = hash2(&fe(67890), &fe(12345));
        assert_ne!(h1, h3);
    }

    #[test]
    fn test_known_answers() {
        assert_eq!(
            hash1(&FieldElement::zero()).to_hex(),
            "0x1675971732a988658bb37127c336fe5925425f575653a1b3bab903d3615870e7"
        );
        assert_eq!(
            hash2(&fe(1), &fe(2)).to_hex(),
            "0x13f721c0c374c93d0f2690c84eb8c360dbda40c727dac357f5a2b377b4ce8264"
        );
        assert_eq!(
            hash3(&fe(1), &fe(2), &fe(3)).to_hex(),
            "0x2bd304d1b2cf20ef5a9dfa115c18789522109714ba02917cdb6e3638a8d70147"
        );
        assert_eq!(
            hash4(&fe(1), &fe(2), &fe(3), &fe(4)).to_hex(),
            "0x1438bb268d468a41e3e616dfd28d12a2a473b190aa91386233c948c429fa2e5a"
        );
    }

    #[test]
    fn test_arity_domain_separation() {
        let a = fe(1);
        let b = fe(2);
        let zero = FieldElement::zero();

        assert_ne!(hash2(&a, &b), hash3(&a, &b, &zero));
        assert_ne!(hash3(&a, &b, &zero), hash4(&a, &b, &zero, &zero));
        assert_ne!(hash1(&a), hash2(&a, &zero));
    }

    #[test]
    fn test_zero_inputs_hash_to_nonzero() {
        let zero = FieldElement::zero();
        assert!(!hash2(&zero, &zero).is_zero());
        assert!(!hash1(&zero).is_zero());
    }

    #[test]
    fn test_sponge_width_enforced() {
        let inputs: Vec<FieldElement> = (0..23).map(fe).collect();
        assert!(matches!(
            sponge_fixed(&inputs, DISTRICT_SLOTS),
            Err(CivitasError::Construction(_))
        ));
    }

    #[test]
    fn test_sponge24_matches_generic_sponge() {
        let inputs: [FieldElement; DISTRICT_SLOTS] = std::array::from_fn(|i| fe(i as u64 + 1));
        let specific = sponge24(&inputs);
        let generic = sponge_fixed(&inputs, DISTRICT_SLOTS).unwrap();
        assert_eq!(specific, generic);
    }

    #[test]
    fn test_sponge_order_sensitive() {
        let forward: [FieldElement; DISTRICT_SLOTS] = std::array::from_fn(|i| fe(i as u64));
        let mut reversed = forward;
        reversed.reverse();
        assert_ne!(sponge24(&forward), sponge24(&reversed));
    }

    #[test]
    fn test_hash_hex_dispatch() {
        let a_hex = fe(7).to_hex();
        let b_hex = fe(9).to_hex();
        let (a, b) = (a_hex.as_str(), b_hex.as_str());

        let digest = hash_hex(&[a, b]).unwrap();
        assert_eq!(digest, hash2(&fe(7), &fe(9)).to_hex());
        assert_eq!(digest.len(), 66);

        assert!(hash_hex(&[]).is_err());
        assert!(hash_hex(&[a, a, a, a, a]).is_err());
        assert!(matches!(hash_hex(&["0xnothex", b]), Err(CivitasError::Construction(_))));
    }

    #[test]
    fn test_raw_sponge_multiple_inputs() {
        let inputs = vec![Fr::from(1u64), Fr::from(2u64), Fr::from(3u64), Fr::from(4u64)];

        let h1 = poseidon_hash_fields(&inputs);
        let h2 = poseidon_hash_fields(&inputs);
        assert_eq!(h1, h2);

        // Different order -> different hash
        let inputs_rev: Vec<Fr> = inputs.iter().rev().cloned().collect();
        assert_ne!(h1, poseidon_hash_fields(&inputs_rev));
    }
}
