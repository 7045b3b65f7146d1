//! Lead service: authorization in front of every store operation

use crate::access::{authorize, Decision, Operation};
use crate::identity_store::IdentityStore;
use crate::query::{QueryService, StatusSummary};
use crate::repository::LeadRepository;
use crate::storage::Backend;
use crate::validation::{validate_lead_input, validate_note, validate_profile};
use leads_common::{
    AddNoteInput, CreateLeadInput, Identity, Lead, LeadId, LeadStatus, Result, Time,
    UpdateStatusInput, UserProfile, UserRole,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The lead management service
pub struct LeadService {
    repository: Arc<LeadRepository>,
    queries: QueryService,
    identities: IdentityStore,
    backend: Arc<dyn Backend>,
}

impl LeadService {
    /// Open the service over `backend`, granting admin to `bootstrap_admins`
    pub async fn open(backend: Arc<dyn Backend>, bootstrap_admins: &[Identity]) -> Result<Self> {
        info!("Opening lead service on {} backend", backend.name());

        let identities = IdentityStore::open(Arc::clone(&backend), bootstrap_admins).await?;
        let repository = Arc::new(LeadRepository::open(Arc::clone(&backend)).await?);
        let queries = QueryService::new(Arc::clone(&repository));

        Ok(Self {
            repository,
            queries,
            identities,
            backend,
        })
    }

    pub async fn shutdown(&self) {
        self.identities.shutdown().await;
        info!(
            "Lead service closed with {} leads on {} backend",
            self.repository.len().await,
            self.backend.name()
        );
    }

    /// Check `caller` against `operation`; returns the caller's role on success
    async fn guard(&self, caller: &Identity, operation: Operation) -> Result<UserRole> {
        let role = self.identities.role_of(caller).await;
        let decision = authorize(caller, role, operation);
        if let Decision::Denied(denial) = &decision {
            warn!("Denied {}: {}", caller, denial);
        }
        decision.into_result()?;
        Ok(role)
    }

    // ---- Leads ----

    pub async fn create_lead(&self, caller: &Identity, input: CreateLeadInput) -> Result<LeadId> {
        self.guard(caller, Operation::WriteLeads).await?;
        let input = validate_lead_input(input)?;
        self.repository.create(input, caller.clone()).await
    }

    pub async fn get_all_leads(&self, caller: &Identity) -> Result<Vec<Lead>> {
        self.guard(caller, Operation::ReadLeads).await?;
        Ok(self.queries.all_leads().await)
    }

    pub async fn get_lead(&self, caller: &Identity, id: &LeadId) -> Result<Lead> {
        self.guard(caller, Operation::ReadLeads).await?;
        self.queries.lead(id).await
    }

    pub async fn get_leads_by_status(
        &self,
        caller: &Identity,
        status: LeadStatus,
    ) -> Result<Vec<Lead>> {
        self.guard(caller, Operation::ReadLeads).await?;
        Ok(self.queries.leads_by_status(status).await)
    }

    pub async fn get_total_leads(&self, caller: &Identity) -> Result<usize> {
        self.guard(caller, Operation::ReadLeads).await?;
        Ok(self.queries.total_leads().await)
    }

    pub async fn get_status_summary(&self, caller: &Identity) -> Result<StatusSummary> {
        self.guard(caller, Operation::ReadLeads).await?;
        Ok(self.queries.status_summary().await)
    }

    pub async fn get_lead_creator(&self, caller: &Identity, id: &LeadId) -> Result<Identity> {
        self.guard(caller, Operation::ReadLeads).await?;
        self.queries.lead_creator(id).await
    }

    pub async fn get_lead_timeline(&self, caller: &Identity, id: &LeadId) -> Result<(Time, Time)> {
        self.guard(caller, Operation::ReadLeads).await?;
        self.queries.lead_timeline(id).await
    }

    /// Append a note. `Ok(None)` means the lead does not exist.
    pub async fn add_lead_note(&self, caller: &Identity, input: AddNoteInput) -> Result<Option<Lead>> {
        self.guard(caller, Operation::WriteLeads).await?;
        validate_note(&input.note)?;
        self.repository.add_note(&input.lead_id, input.note).await
    }

    pub async fn update_lead_status(&self, caller: &Identity, input: UpdateStatusInput) -> Result<()> {
        self.guard(caller, Operation::WriteLeads).await?;
        self.repository
            .update_status(&input.lead_id, input.new_status)
            .await?;
        info!("Lead {} moved to {} by {}", input.lead_id, input.new_status, caller);
        Ok(())
    }

    // ---- Identities ----

    /// `Ok(None)` means the caller has not saved a profile yet
    pub async fn get_caller_user_profile(&self, caller: &Identity) -> Result<Option<UserProfile>> {
        self.guard(caller, Operation::ReadOwnAccount).await?;
        Ok(self.identities.profile_of(caller).await)
    }

    pub async fn get_user_profile(
        &self,
        caller: &Identity,
        user: &Identity,
    ) -> Result<Option<UserProfile>> {
        self.guard(caller, Operation::ReadOtherProfile).await?;
        Ok(self.identities.profile_of(user).await)
    }

    pub async fn save_caller_user_profile(&self, caller: &Identity, profile: UserProfile) -> Result<()> {
        self.guard(caller, Operation::SaveOwnProfile).await?;
        let profile = validate_profile(profile)?;
        self.identities.save_profile(caller, profile).await
    }

    pub async fn get_caller_user_role(&self, caller: &Identity) -> Result<UserRole> {
        self.guard(caller, Operation::ReadOwnAccount).await
    }

    pub async fn is_caller_admin(&self, caller: &Identity) -> Result<bool> {
        let role = self.guard(caller, Operation::ReadOwnAccount).await?;
        debug!("{} is {}", caller, role);
        Ok(role == UserRole::Admin)
    }

    pub async fn assign_caller_user_role(
        &self,
        caller: &Identity,
        user: &Identity,
        role: UserRole,
    ) -> Result<()> {
        self.guard(caller, Operation::AssignRole).await?;
        self.identities.assign_role(user, role).await
    }
}
