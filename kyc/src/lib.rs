//! Voter credential issuance.
//!
//! An administrator approves a pending KYC request: the extracted identity
//! data is checked, the face photo and ERC-721 metadata are pinned, the
//! credential is minted and the approval is recorded in the mirror. The
//! mint and the approval go through the two-phase reconciler, so an
//! approval is never recorded for a mint that did not confirm.

pub mod error;
pub mod identity;
pub mod issuer;
pub mod metadata;
pub mod photo;

pub use error::{KycError, NidRegistry};
pub use identity::{
    age_on, clean_name, validate_dob, validate_nid, IdentityError, Nid, MAX_AGE, MIN_AGE,
    NID_LENGTHS, NOT_DETECTED,
};
pub use issuer::{CredentialIssuer, Minted};
pub use metadata::{network_name, Attribute, IdentityRecord, MetadataProperties, VoterMetadata};
pub use photo::PhotoSource;
