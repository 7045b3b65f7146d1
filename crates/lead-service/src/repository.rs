//! Lead record store

use crate::clock::Clock;
use crate::storage::Backend;
use leads_common::{CreateLeadInput, Error, Identity, Lead, LeadId, LeadStatus, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Leads in creation order, with an id index into that order
#[derive(Debug, Default)]
struct LeadTable {
    leads: Vec<Lead>,
    index: HashMap<LeadId, usize>,
}

impl LeadTable {
    fn get(&self, id: &LeadId) -> Option<&Lead> {
        self.index.get(id).map(|&pos| &self.leads[pos])
    }

    fn get_mut(&mut self, id: &LeadId) -> Option<&mut Lead> {
        let pos = *self.index.get(id)?;
        self.leads.get_mut(pos)
    }

    fn push(&mut self, lead: Lead) {
        self.index.insert(lead.id.clone(), self.leads.len());
        self.leads.push(lead);
    }
}

/// Authoritative lead store.
///
/// A mutation holds the write lock across persistence and commit, so readers
/// only ever see fully applied mutations.
pub struct LeadRepository {
    table: RwLock<LeadTable>,
    next_sequence: AtomicU64,
    clock: Clock,
    backend: Arc<dyn Backend>,
}

impl LeadRepository {
    /// Load persisted leads and resume id allocation after the highest one
    pub async fn open(backend: Arc<dyn Backend>) -> Result<Self> {
        let mut leads = backend.load_leads().await?;
        leads.sort_by(|a, b| {
            a.created_time
                .cmp(&b.created_time)
                .then_with(|| a.id.sequence().cmp(&b.id.sequence()))
        });

        let next_sequence = leads
            .iter()
            .filter_map(|lead| lead.id.sequence())
            .max()
            .map_or(1, |max| max + 1);
        let latest_time = leads
            .iter()
            .map(|lead| lead.last_updated)
            .max()
            .unwrap_or(0);

        let mut table = LeadTable::default();
        for lead in leads {
            table.push(lead);
        }

        info!(
            "Lead repository opened: {} leads, next id {}",
            table.leads.len(),
            LeadId::from_sequence(next_sequence)
        );

        Ok(Self {
            table: RwLock::new(table),
            next_sequence: AtomicU64::new(next_sequence),
            clock: Clock::starting_after(latest_time),
            backend,
        })
    }

    /// Store a new lead in the `new` stage and return its id.
    ///
    /// Ids come from an atomic counter and are never handed out twice, even
    /// when the backend write fails.
    pub async fn create(&self, input: CreateLeadInput, creator: Identity) -> Result<LeadId> {
        let id = LeadId::from_sequence(self.next_sequence.fetch_add(1, Ordering::SeqCst));

        let mut table = self.table.write().await;
        let lead = Lead::new(id.clone(), input, creator, self.clock.now());

        self.backend.save_lead(&lead).await?;
        table.push(lead);

        info!("Created lead {}", id);
        Ok(id)
    }

    pub async fn get(&self, id: &LeadId) -> Result<Lead> {
        let table = self.table.read().await;
        table
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Run `f` over every lead in creation order under one consistent read
    pub async fn view<R>(&self, f: impl FnOnce(&[Lead]) -> R) -> R {
        let table = self.table.read().await;
        f(&table.leads)
    }

    /// Run `f` over one lead; `None` when the id is unknown
    pub async fn view_lead<R>(&self, id: &LeadId, f: impl FnOnce(&Lead) -> R) -> Option<R> {
        let table = self.table.read().await;
        table.get(id).map(f)
    }

    pub async fn all(&self) -> Vec<Lead> {
        self.view(|leads| leads.to_vec()).await
    }

    pub async fn len(&self) -> usize {
        self.view(|leads| leads.len()).await
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Append a note. An unknown id is reported as `Ok(None)`, not an error.
    pub async fn add_note(&self, id: &LeadId, note: String) -> Result<Option<Lead>> {
        self.mutate(id, |lead, now| lead.append_note(note, now))
            .await
            .map(|updated| {
                if updated.is_none() {
                    debug!("Note not added, lead {} does not exist", id);
                }
                updated
            })
    }

    /// Move a lead to `status`. Any stage may follow any other.
    pub async fn update_status(&self, id: &LeadId, status: LeadStatus) -> Result<()> {
        match self.mutate(id, |lead, now| lead.set_status(status, now)).await? {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(id.to_string())),
        }
    }

    /// Apply `change` to a copy, persist the copy, then commit it.
    async fn mutate(
        &self,
        id: &LeadId,
        change: impl FnOnce(&mut Lead, leads_common::Time),
    ) -> Result<Option<Lead>> {
        let mut table = self.table.write().await;

        let Some(current) = table.get(id) else {
            return Ok(None);
        };

        let mut updated = current.clone();
        change(&mut updated, self.clock.now());

        self.backend.save_lead(&updated).await?;

        if let Some(slot) = table.get_mut(id) {
            *slot = updated.clone();
        }

        debug!("Updated lead {} at {}", id, updated.last_updated);
        Ok(Some(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    fn input(name: &str) -> CreateLeadInput {
        CreateLeadInput {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            company: None,
        }
    }

    async fn open_empty() -> LeadRepository {
        LeadRepository::open(Arc::new(MemoryBackend::new()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let repo = open_empty().await;
        let first = repo.create(input("Sarah"), Identity::from("u")).await.unwrap();
        let second = repo.create(input("Tom"), Identity::from("u")).await.unwrap();

        assert_eq!(first.as_str(), "lead-1");
        assert_eq!(second.as_str(), "lead-2");
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn test_new_lead_state() {
        let repo = open_empty().await;
        let id = repo.create(input("Sarah"), Identity::from("creator")).await.unwrap();

        let lead = repo.get(&id).await.unwrap();
        assert_eq!(lead.status, LeadStatus::New);
        assert!(lead.notes.is_empty());
        assert_eq!(lead.created_time, lead.last_updated);
        assert_eq!(lead.creator, Identity::from("creator"));
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let repo = open_empty().await;
        let err = repo.get(&LeadId::from("lead-99")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_add_note_missing_lead_is_soft() {
        let repo = open_empty().await;
        let result = repo
            .add_note(&LeadId::from("lead-99"), "hello".to_string())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_update_status_missing_lead_is_hard() {
        let repo = open_empty().await;
        let err = repo
            .update_status(&LeadId::from("lead-99"), LeadStatus::Won)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_notes_append_in_order_and_bump_timestamp() {
        let repo = open_empty().await;
        let id = repo.create(input("Sarah"), Identity::from("u")).await.unwrap();
        let created = repo.get(&id).await.unwrap();

        let first = repo.add_note(&id, "one".to_string()).await.unwrap().unwrap();
        let second = repo.add_note(&id, "two".to_string()).await.unwrap().unwrap();

        assert_eq!(second.notes, vec!["one".to_string(), "two".to_string()]);
        assert!(first.last_updated > created.last_updated);
        assert!(second.last_updated > first.last_updated);
        assert_eq!(second.created_time, created.created_time);
    }

    #[tokio::test]
    async fn test_terminal_stages_can_be_left() {
        let repo = open_empty().await;
        let id = repo.create(input("Sarah"), Identity::from("u")).await.unwrap();

        repo.update_status(&id, LeadStatus::Won).await.unwrap();
        repo.update_status(&id, LeadStatus::New).await.unwrap();

        assert_eq!(repo.get(&id).await.unwrap().status, LeadStatus::New);
    }

    #[tokio::test]
    async fn test_concurrent_creates_never_collide() {
        let repo = Arc::new(open_empty().await);

        let mut handles = Vec::new();
        for i in 0..64 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.create(input(&format!("Lead{}", i)), Identity::from("u"))
                    .await
                    .unwrap()
            }));
        }

        let mut ids = std::collections::HashSet::new();
        for handle in handles {
            assert!(ids.insert(handle.await.unwrap()));
        }

        assert_eq!(ids.len(), 64);
        assert_eq!(repo.len().await, 64);
    }

    #[tokio::test]
    async fn test_reopen_restores_order_and_continues_ids() {
        let backend = MemoryBackend::new();
        let repo = LeadRepository::open(Arc::new(backend.clone())).await.unwrap();
        let a = repo.create(input("A"), Identity::from("u")).await.unwrap();
        let b = repo.create(input("B"), Identity::from("u")).await.unwrap();
        repo.add_note(&a, "kept".to_string()).await.unwrap();

        let reopened = LeadRepository::open(Arc::new(backend)).await.unwrap();
        let ids: Vec<LeadId> = reopened.all().await.into_iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![a.clone(), b]);
        assert_eq!(reopened.get(&a).await.unwrap().notes, vec!["kept".to_string()]);

        let c = reopened.create(input("C"), Identity::from("u")).await.unwrap();
        assert_eq!(c.as_str(), "lead-3");
        let touched = reopened.get(&a).await.unwrap().last_updated;
        assert!(reopened.get(&c).await.unwrap().created_time > touched);
    }
}
