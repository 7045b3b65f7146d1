use crate::Identity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Nanoseconds since the Unix epoch
pub type Time = i64;

const LEAD_ID_PREFIX: &str = "lead-";

/// Identifier assigned to a lead at creation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(String);

impl LeadId {
    /// Render the id allocated for the given creation sequence number
    pub fn from_sequence(sequence: u64) -> Self {
        Self(format!("{}{}", LEAD_ID_PREFIX, sequence))
    }

    /// Creation sequence number, if the id was allocated by this service
    pub fn sequence(&self) -> Option<u64> {
        self.0.strip_prefix(LEAD_ID_PREFIX)?.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LeadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for LeadId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Pipeline stage of a lead. Any stage may move to any other stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    ProposalSent,
    Negotiation,
    Won,
    Lost,
}

impl LeadStatus {
    /// Every status, in pipeline order
    pub const ALL: [LeadStatus; 7] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Qualified,
        LeadStatus::ProposalSent,
        LeadStatus::Negotiation,
        LeadStatus::Won,
        LeadStatus::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::ProposalSent => "proposalSent",
            LeadStatus::Negotiation => "negotiation",
            LeadStatus::Won => "won",
            LeadStatus::Lost => "lost",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| crate::Error::Validation(format!("Unknown lead status: {}", s)))
    }
}

/// A tracked sales inquiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: LeadId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub status: LeadStatus,
    pub created_time: Time,
    pub last_updated: Time,
    pub notes: Vec<String>,
    pub creator: Identity,
}

impl Lead {
    /// Create a fresh lead in the `new` stage with both timestamps at `now`
    pub fn new(id: LeadId, input: CreateLeadInput, creator: Identity, now: Time) -> Self {
        Self {
            id,
            name: input.name,
            email: input.email,
            company: input.company,
            status: LeadStatus::New,
            created_time: now,
            last_updated: now,
            notes: Vec::new(),
            creator,
        }
    }

    /// Append a note and stamp the mutation
    pub fn append_note(&mut self, note: String, now: Time) {
        self.notes.push(note);
        self.touch(now);
    }

    /// Move to another stage and stamp the mutation
    pub fn set_status(&mut self, status: LeadStatus, now: Time) {
        self.status = status;
        self.touch(now);
    }

    /// `(created_time, last_updated)`
    pub fn timeline(&self) -> (Time, Time) {
        (self.created_time, self.last_updated)
    }

    fn touch(&mut self, now: Time) {
        // lastUpdated never moves backwards past creation
        self.last_updated = now.max(self.created_time);
    }
}

/// Input for lead creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLeadInput {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

/// Input for appending a note to a lead
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddNoteInput {
    pub lead_id: LeadId,
    pub note: String,
}

/// Input for moving a lead to another stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusInput {
    pub lead_id: LeadId,
    pub new_status: LeadStatus,
}
