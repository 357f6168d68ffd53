//! Election form input and its local validation.

use nftvote_types::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::same_area;

pub const MIN_CANDIDATES: usize = 2;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDraft {
    pub name: String,
    pub party: String,
    #[serde(default)]
    pub description: String,
}

impl CandidateDraft {
    pub fn new(name: &str, party: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            party: party.to_string(),
            description: description.to_string(),
        }
    }

    /// A row counts only when both name and party are filled in.
    fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.party.trim().is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionDraft {
    pub title: String,
    pub description: String,
    pub start: Timestamp,
    pub end: Timestamp,
    pub voting_area: String,
    pub eligible_areas: Vec<String>,
    pub candidates: Vec<CandidateDraft>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("please enter an election title")]
    BlankTitle,
    #[error("please enter a description")]
    BlankDescription,
    #[error("please select a primary voting area")]
    MissingVotingArea,
    #[error("please select at least one eligible area")]
    NoEligibleAreas,
    #[error("end date must be after start date")]
    EndNotAfterStart { start: Timestamp, end: Timestamp },
    #[error("please add at least {} candidates with name and party (found {complete})", MIN_CANDIDATES)]
    TooFewCandidates { complete: usize },
}

/// A draft that passed validation, with incomplete candidate rows dropped,
/// fields trimmed and eligible areas deduplicated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedDraft(ElectionDraft);

impl ValidatedDraft {
    pub fn draft(&self) -> &ElectionDraft {
        &self.0
    }

    pub fn into_inner(self) -> ElectionDraft {
        self.0
    }
}

impl std::ops::Deref for ValidatedDraft {
    type Target = ElectionDraft;

    fn deref(&self) -> &ElectionDraft {
        &self.0
    }
}

impl ElectionDraft {
    pub fn validate(&self) -> Result<ValidatedDraft, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::BlankTitle);
        }
        let description = self.description.trim();
        if description.is_empty() {
            return Err(ValidationError::BlankDescription);
        }
        let voting_area = self.voting_area.trim();
        if voting_area.is_empty() {
            return Err(ValidationError::MissingVotingArea);
        }

        let mut eligible_areas: Vec<String> = Vec::new();
        for area in self.eligible_areas.iter().map(|a| a.trim()) {
            if !area.is_empty() && !eligible_areas.iter().any(|kept| same_area(kept, area)) {
                eligible_areas.push(area.to_string());
            }
        }
        if eligible_areas.is_empty() {
            return Err(ValidationError::NoEligibleAreas);
        }

        if self.start >= self.end {
            return Err(ValidationError::EndNotAfterStart {
                start: self.start,
                end: self.end,
            });
        }

        let candidates: Vec<CandidateDraft> = self
            .candidates
            .iter()
            .filter(|c| c.is_complete())
            .map(|c| CandidateDraft {
                name: c.name.trim().to_string(),
                party: c.party.trim().to_string(),
                description: c.description.trim().to_string(),
            })
            .collect();
        if candidates.len() < MIN_CANDIDATES {
            return Err(ValidationError::TooFewCandidates {
                complete: candidates.len(),
            });
        }

        Ok(ValidatedDraft(ElectionDraft {
            title: title.to_string(),
            description: description.to_string(),
            start: self.start,
            end: self.end,
            voting_area: voting_area.to_string(),
            eligible_areas,
            candidates,
        }))
    }
}
