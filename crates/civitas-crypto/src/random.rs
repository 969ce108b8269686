//! Single source of randomness for key, nonce and entropy generation.
//!
//! Everything that needs random bytes takes a `&dyn RandomSource` so that
//! production code draws from the operating system while tests can inject a
//! seeded generator.

use civitas_types::{CivitasError, CivitasResult};
use parking_lot::Mutex;
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};

pub trait RandomSource: Send + Sync {
    fn fill(&self, dest: &mut [u8]) -> CivitasResult<()>;
}

/// Operating-system CSPRNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, dest: &mut [u8]) -> CivitasResult<()> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| CivitasError::Crypto(format!("OS random source failed: {}", e)))
    }
}

/// Seeded generator for reproducible tests. Not for production keys.
pub struct DeterministicRandom {
    rng: Mutex<StdRng>,
}

impl DeterministicRandom {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for DeterministicRandom {
    fn fill(&self, dest: &mut [u8]) -> CivitasResult<()> {
        self.rng.lock().fill_bytes(dest);
        Ok(())
    }
}

pub fn random_bytes<const N: usize>(source: &dyn RandomSource) -> CivitasResult<[u8; N]> {
    let mut bytes = [0u8; N];
    source.fill(&mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_random_fills() {
        let a = random_bytes::<32>(&OsRandom).unwrap();
        let b = random_bytes::<32>(&OsRandom).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_deterministic_random_reproducible() {
        let first = DeterministicRandom::from_seed(7);
        let second = DeterministicRandom::from_seed(7);

        assert_eq!(
            random_bytes::<24>(&first).unwrap(),
            random_bytes::<24>(&second).unwrap()
        );

        let other = DeterministicRandom::from_seed(8);
        assert_ne!(
            random_bytes::<24>(&first).unwrap(),
            random_bytes::<24>(&other).unwrap()
        );
    }
}
