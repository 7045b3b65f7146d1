//! Read-only projections over the lead repository

use crate::repository::LeadRepository;
use leads_common::{Error, Identity, Lead, LeadId, LeadStatus, Result, Time};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Number of leads currently in each stage. Every stage is present.
pub type StatusSummary = BTreeMap<LeadStatus, usize>;

/// Stateless views computed from the repository at call time
#[derive(Clone)]
pub struct QueryService {
    repository: Arc<LeadRepository>,
}

impl QueryService {
    pub fn new(repository: Arc<LeadRepository>) -> Self {
        Self { repository }
    }

    pub async fn lead(&self, id: &LeadId) -> Result<Lead> {
        self.repository.get(id).await
    }

    pub async fn all_leads(&self) -> Vec<Lead> {
        self.repository.all().await
    }

    pub async fn leads_by_status(&self, status: LeadStatus) -> Vec<Lead> {
        self.repository
            .view(|leads| {
                leads
                    .iter()
                    .filter(|lead| lead.status == status)
                    .cloned()
                    .collect()
            })
            .await
    }

    pub async fn total_leads(&self) -> usize {
        self.repository.len().await
    }

    pub async fn lead_creator(&self, id: &LeadId) -> Result<Identity> {
        self.repository
            .view_lead(id, |lead| lead.creator.clone())
            .await
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub async fn lead_timeline(&self, id: &LeadId) -> Result<(Time, Time)> {
        self.repository
            .view_lead(id, Lead::timeline)
            .await
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub async fn status_summary(&self) -> StatusSummary {
        self.repository
            .view(|leads| {
                let mut summary: StatusSummary =
                    LeadStatus::ALL.into_iter().map(|status| (status, 0)).collect();
                for lead in leads {
                    *summary.entry(lead.status).or_default() += 1;
                }
                summary
            })
            .await
    }
}
