use crate::error::CivitasError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordinal strength of a user's identity verification, 1 (weakest) to 5.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum AuthorityLevel {
    Basic = 1,
    Established = 2,
    IdentityVerified = 3,
    PassportVerified = 4,
    GovernmentCredential = 5,
}

impl AuthorityLevel {
    pub const MIN: AuthorityLevel = AuthorityLevel::Basic;
    pub const MAX: AuthorityLevel = AuthorityLevel::GovernmentCredential;

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn meets(self, minimum: AuthorityLevel) -> bool {
        self >= minimum
    }
}

impl TryFrom<u8> for AuthorityLevel {
    type Error = CivitasError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AuthorityLevel::Basic),
            2 => Ok(AuthorityLevel::Established),
            3 => Ok(AuthorityLevel::IdentityVerified),
            4 => Ok(AuthorityLevel::PassportVerified),
            5 => Ok(AuthorityLevel::GovernmentCredential),
            other => Err(CivitasError::validation(
                "authority_level",
                format!("{} is outside 1..=5", other),
            )),
        }
    }
}

impl From<AuthorityLevel> for u8 {
    fn from(level: AuthorityLevel) -> u8 {
        level.as_u8()
    }
}

impl fmt::Display for AuthorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Cumulative verification tier. Reaching tier `n` implies every predicate
/// of the tiers below it holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum TrustTier {
    /// No account. Exists for policy configuration only; classification
    /// never yields it.
    Anonymous = 0,
    Authenticated = 1,
    DistrictAttested = 2,
    IdentityVerified = 3,
    PassportVerified = 4,
    GovernmentCredential = 5,
}

impl TrustTier {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn meets(self, minimum: TrustTier) -> bool {
        self >= minimum
    }
}

impl TryFrom<u8> for TrustTier {
    type Error = CivitasError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TrustTier::Anonymous),
            1 => Ok(TrustTier::Authenticated),
            2 => Ok(TrustTier::DistrictAttested),
            3 => Ok(TrustTier::IdentityVerified),
            4 => Ok(TrustTier::PassportVerified),
            5 => Ok(TrustTier::GovernmentCredential),
            other => Err(CivitasError::validation(
                "trust_tier",
                format!("{} is outside 0..=5", other),
            )),
        }
    }
}

impl From<TrustTier> for u8 {
    fn from(tier: TrustTier) -> u8 {
        tier.as_u8()
    }
}

impl fmt::Display for TrustTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}
