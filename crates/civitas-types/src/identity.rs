use crate::error::{CivitasError, CivitasResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Passport,
    DriversLicense,
    NationalId,
    StateId,
    /// Government-issued mobile credential (ISO 18013-5 mDL) presented
    /// through a wallet. Never carried by an [`IdentityProof`].
    MobileDriversLicense,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Passport => "passport",
            DocumentType::DriversLicense => "drivers_license",
            DocumentType::NationalId => "national_id",
            DocumentType::StateId => "state_id",
            DocumentType::MobileDriversLicense => "mdl",
        }
    }

    /// Physical documents are the ones an identity-proof scan can yield.
    pub fn is_physical(&self) -> bool {
        !matches!(self, DocumentType::MobileDriversLicense)
    }
}

impl FromStr for DocumentType {
    type Err = CivitasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "passport" => Ok(DocumentType::Passport),
            "drivers_license" => Ok(DocumentType::DriversLicense),
            "national_id" => Ok(DocumentType::NationalId),
            "state_id" => Ok(DocumentType::StateId),
            "mdl" | "mobile_drivers_license" => Ok(DocumentType::MobileDriversLicense),
            other => Err(CivitasError::validation(
                "document_type",
                format!("unrecognized document type '{}'", other),
            )),
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationMethod {
    /// NFC passport chip read through the self.xyz scanner.
    #[serde(rename = "self.xyz")]
    PassportNfc,
    /// Photo document scan through Didit.
    #[serde(rename = "didit")]
    DocumentScan,
    /// W3C Digital Credentials API presentation (mDL).
    #[serde(rename = "digital-credentials-api")]
    DigitalCredential,
}

impl VerificationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationMethod::PassportNfc => "self.xyz",
            VerificationMethod::DocumentScan => "didit",
            VerificationMethod::DigitalCredential => "digital-credentials-api",
        }
    }

    pub fn is_passport_scan(&self) -> bool {
        matches!(self, VerificationMethod::PassportNfc)
    }
}

impl FromStr for VerificationMethod {
    type Err = CivitasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "self.xyz" | "self" => Ok(VerificationMethod::PassportNfc),
            "didit" => Ok(VerificationMethod::DocumentScan),
            "digital-credentials-api" | "mdl" => Ok(VerificationMethod::DigitalCredential),
            other => Err(CivitasError::validation(
                "verification_method",
                format!("unrecognized verification method '{}'", other),
            )),
        }
    }
}

impl fmt::Display for VerificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw facts returned by an identity verification provider.
///
/// Held only long enough to derive a commitment. The `Debug` impl never
/// prints field contents and the strings are wiped on drop.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProof {
    pub document_number: String,
    pub nationality: String,
    pub birth_year: i32,
    pub document_type: String,
}

impl IdentityProof {
    pub fn new(
        document_number: impl Into<String>,
        nationality: impl Into<String>,
        birth_year: i32,
        document_type: impl Into<String>,
    ) -> Self {
        Self {
            document_number: document_number.into(),
            nationality: nationality.into(),
            birth_year,
            document_type: document_type.into(),
        }
    }

    pub fn parsed_document_type(&self) -> CivitasResult<DocumentType> {
        if self.document_type.trim().is_empty() {
            return Err(CivitasError::validation("document_type", "missing"));
        }
        self.document_type.parse()
    }
}

impl fmt::Debug for IdentityProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityProof([REDACTED])")
    }
}

impl Drop for IdentityProof {
    fn drop(&mut self) {
        self.document_number.zeroize();
        self.nationality.zeroize();
        self.birth_year.zeroize();
    }
}
