use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::cycles::{default_cycles, NewCycle};
use crate::error::StoreError;
use crate::models::{
    CanonicalRecord, EventCycle, ProposalFeedback, RecordFilter, SurveyResponse,
};

#[async_trait]
pub trait Repository: Send + Sync {
    async fn find_cycles_ordered(&self) -> Result<Vec<EventCycle>, StoreError>;

    async fn create_cycle(&self, cycle: &NewCycle) -> Result<EventCycle, StoreError>;

    /// Inserts or updates the record stored under `(cycle_id, source_id)` and returns its id.
    /// A record that already exists keeps its id.
    async fn upsert_record(
        &self,
        cycle_id: Uuid,
        source_id: &str,
        record: &CanonicalRecord,
    ) -> Result<Uuid, StoreError>;

    async fn find_survey_responses(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<SurveyResponse>, StoreError>;

    async fn find_proposal_feedback(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<ProposalFeedback>, StoreError>;

    async fn reset(&self) -> Result<(), StoreError>;
}

pub async fn seed_default_cycles(repo: &dyn Repository) -> Result<usize, StoreError> {
    let existing = repo.find_cycles_ordered().await?;
    let mut created = 0usize;
    for cycle in default_cycles() {
        if existing.iter().any(|c| c.name == cycle.name) {
            continue;
        }
        repo.create_cycle(&cycle).await?;
        created += 1;
    }
    info!("seeded {} event cycles", created);
    Ok(created)
}

#[derive(Debug, Default)]
struct MemoryState {
    cycles: Vec<EventCycle>,
    responses: Vec<SurveyResponse>,
    feedback: Vec<ProposalFeedback>,
}

#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: RwLock<MemoryState>,
}

impl MemoryRepository {
    pub fn new() -> MemoryRepository {
        MemoryRepository::default()
    }

    pub async fn with_default_cycles() -> Result<MemoryRepository, StoreError> {
        let repo = MemoryRepository::new();
        seed_default_cycles(&repo).await?;
        Ok(repo)
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_cycles_ordered(&self) -> Result<Vec<EventCycle>, StoreError> {
        let state = self.state.read().await;
        let mut cycles = state.cycles.clone();
        cycles.sort_by(|a, b| {
            a.start_date
                .cmp(&b.start_date)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(cycles)
    }

    async fn create_cycle(&self, cycle: &NewCycle) -> Result<EventCycle, StoreError> {
        let created = EventCycle {
            id: Uuid::new_v4(),
            name: cycle.name.clone(),
            start_date: cycle.start_date,
            end_date: cycle.end_date,
            created_at: Utc::now(),
        };
        self.state.write().await.cycles.push(created.clone());
        Ok(created)
    }

    async fn upsert_record(
        &self,
        cycle_id: Uuid,
        source_id: &str,
        record: &CanonicalRecord,
    ) -> Result<Uuid, StoreError> {
        let mut state = self.state.write().await;
        if !state.cycles.iter().any(|c| c.id == cycle_id) {
            return Err(StoreError::UnknownCycle(cycle_id));
        }
        match record {
            CanonicalRecord::Evaluation(fields) => {
                if let Some(existing) = state
                    .responses
                    .iter_mut()
                    .find(|r| r.cycle_id == cycle_id && r.source_id == source_id)
                {
                    existing.fields = fields.clone();
                    return Ok(existing.id);
                }
                let id = Uuid::new_v4();
                state.responses.push(SurveyResponse {
                    id,
                    cycle_id,
                    source_id: source_id.to_string(),
                    fields: fields.clone(),
                });
                Ok(id)
            }
            CanonicalRecord::Proposal(fields) => {
                if let Some(existing) = state
                    .feedback
                    .iter_mut()
                    .find(|r| r.cycle_id == cycle_id && r.source_id == source_id)
                {
                    existing.fields = fields.clone();
                    return Ok(existing.id);
                }
                let id = Uuid::new_v4();
                state.feedback.push(ProposalFeedback {
                    id,
                    cycle_id,
                    source_id: source_id.to_string(),
                    fields: fields.clone(),
                });
                Ok(id)
            }
        }
    }

    async fn find_survey_responses(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<SurveyResponse>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .responses
            .iter()
            .filter(|r| filter.matches_survey(r.cycle_id, &r.fields))
            .cloned()
            .collect())
    }

    async fn find_proposal_feedback(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<ProposalFeedback>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .feedback
            .iter()
            .filter(|r| filter.matches_proposal(r.cycle_id, &r.fields))
            .cloned()
            .collect())
    }

    async fn reset(&self) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.responses.clear();
        state.feedback.clear();
        state.cycles.clear();
        Ok(())
    }
}
