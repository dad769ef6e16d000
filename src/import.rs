//! Import orchestration: header resolution, per-row transform, cycle lookup and upsert.
//!
//! Only a missing required column (or an unreadable file) aborts an import, and it does so
//! before anything is written. Every per-row problem is logged and counted as a skip.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cycles::CycleResolver;
use crate::error::{ImportError, SheetError};
use crate::headers::{resolve_columns, HeaderIndex, EVALUATION_FIELDS, PROPOSAL_FIELDS};
use crate::models::SurveyKind;
use crate::repository::Repository;
use crate::sheet::{read_sheet, Sheet};
use crate::transform::{row_is_blank, transform_evaluation_row, transform_proposal_row};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    Blank,
    MissingTimestamp,
    NoCycle,
    MissingSourceId,
    PersistFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub inserted: usize,
    pub skipped: usize,
    #[serde(skip)]
    pub skips: Vec<SkippedRow>,
}

impl ImportOutcome {
    fn skip(&mut self, row: usize, reason: SkipReason) {
        self.skipped += 1;
        self.skips.push(SkippedRow { row, reason });
    }

    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skips.iter().filter(|s| s.reason == reason).count()
    }
}

pub async fn import_bytes(
    repo: &dyn Repository,
    kind: SurveyKind,
    bytes: &[u8],
) -> Result<ImportOutcome, ImportError> {
    if bytes.is_empty() {
        return Err(ImportError::NoFile);
    }
    let sheet = read_sheet(bytes)?;
    import_sheet(repo, kind, &sheet).await
}

pub async fn import_sheet(
    repo: &dyn Repository,
    kind: SurveyKind,
    sheet: &Sheet,
) -> Result<ImportOutcome, ImportError> {
    let header = sheet.header().ok_or(SheetError::Empty)?;
    let index = HeaderIndex::from_row(header);
    debug!("{}: available headers {:?}", kind.label(), index.headers());
    let specs = match kind {
        SurveyKind::Evaluation => EVALUATION_FIELDS,
        SurveyKind::Proposals => PROPOSAL_FIELDS,
    };
    let columns = resolve_columns(&index, specs)?;
    debug!("{}: {} data rows", kind.label(), sheet.data_row_count());

    let resolver = CycleResolver::new(repo.find_cycles_ordered().await?);
    if resolver.is_empty() {
        warn!("no event cycles defined, every row of this import will be skipped");
    }

    let mut outcome = ImportOutcome::default();
    for (position, row) in sheet.data_rows() {
        if row_is_blank(row) {
            debug!("row {}: blank, skipping", position);
            outcome.skip(position, SkipReason::Blank);
            continue;
        }

        let transformed = match kind {
            SurveyKind::Evaluation => transform_evaluation_row(&columns, position, row),
            SurveyKind::Proposals => transform_proposal_row(&columns, row),
        };

        let Some(timestamp) = transformed.timestamp else {
            warn!("row {}: no valid start time, skipping", position);
            outcome.skip(position, SkipReason::MissingTimestamp);
            continue;
        };
        let Some(cycle) = resolver.resolve(timestamp) else {
            warn!("row {}: no cycle covers {}, skipping", position, timestamp.date_naive());
            outcome.skip(position, SkipReason::NoCycle);
            continue;
        };
        let Some(source_id) = transformed.source_id.as_deref() else {
            warn!("row {}: no id, skipping", position);
            outcome.skip(position, SkipReason::MissingSourceId);
            continue;
        };

        match repo
            .upsert_record(cycle.id, source_id, &transformed.record)
            .await
        {
            Ok(id) => {
                debug!("row {}: stored {} in '{}' as {}", position, source_id, cycle.name, id);
                outcome.inserted += 1;
            }
            Err(err) => {
                warn!("row {}: failed to store: {}", position, err);
                outcome.skip(position, SkipReason::PersistFailed);
            }
        }
    }

    info!(
        "{} import finished: {} stored, {} skipped",
        kind.label(),
        outcome.inserted,
        outcome.skipped
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use uuid::Uuid;

    use crate::cycles::NewCycle;
    use crate::error::StoreError;
    use crate::models::{
        CanonicalRecord, EventCycle, ProposalFeedback, RecordFilter, SurveyResponse,
    };
    use crate::repository::MemoryRepository;

    struct RefusingRepository {
        inner: MemoryRepository,
        refused: &'static str,
    }

    #[async_trait]
    impl Repository for RefusingRepository {
        async fn find_cycles_ordered(&self) -> Result<Vec<EventCycle>, StoreError> {
            self.inner.find_cycles_ordered().await
        }

        async fn create_cycle(&self, cycle: &NewCycle) -> Result<EventCycle, StoreError> {
            self.inner.create_cycle(cycle).await
        }

        async fn upsert_record(
            &self,
            cycle_id: Uuid,
            source_id: &str,
            record: &CanonicalRecord,
        ) -> Result<Uuid, StoreError> {
            if source_id == self.refused {
                return Err(StoreError::Unavailable("write refused".to_string()));
            }
            self.inner.upsert_record(cycle_id, source_id, record).await
        }

        async fn find_survey_responses(
            &self,
            filter: &RecordFilter,
        ) -> Result<Vec<SurveyResponse>, StoreError> {
            self.inner.find_survey_responses(filter).await
        }

        async fn find_proposal_feedback(
            &self,
            filter: &RecordFilter,
        ) -> Result<Vec<ProposalFeedback>, StoreError> {
            self.inner.find_proposal_feedback(filter).await
        }

        async fn reset(&self) -> Result<(), StoreError> {
            self.inner.reset().await
        }
    }

    const EVALUATION_HEADER: &str =
        "Start time,You are a,Your university,2,3,4,5,6,7,8,9,Comments";

    fn csv(lines: &[&str]) -> Vec<u8> {
        lines.join("\n").into_bytes()
    }

    #[tokio::test]
    async fn rows_are_skipped_for_each_reason() {
        let repo = MemoryRepository::with_default_cycles().await.unwrap();
        let bytes = csv(&[
            EVALUATION_HEADER,
            "2024-01-10 09:00,Student,UFPR,5,5,5,5,5,5,5,5,great",
            ",,,,,,,,,,,",
            "yesterday,Student,UFPR,5,5,5,5,5,5,5,5,",
            "2023-06-01 09:00,Student,UFPR,5,5,5,5,5,5,5,5,",
        ]);
        let outcome = import_bytes(&repo, SurveyKind::Evaluation, &bytes)
            .await
            .unwrap();
        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.skipped, 3);
        assert_eq!(outcome.skipped_for(SkipReason::Blank), 1);
        assert_eq!(outcome.skipped_for(SkipReason::MissingTimestamp), 1);
        assert_eq!(outcome.skipped_for(SkipReason::NoCycle), 1);
        let stored = repo
            .find_survey_responses(&RecordFilter::default())
            .await
            .unwrap();
        assert_eq!(stored[0].source_id, "1");
    }

    #[tokio::test]
    async fn missing_required_column_writes_nothing() {
        let repo = MemoryRepository::with_default_cycles().await.unwrap();
        let bytes = csv(&["Start time,You are a", "2024-01-10,Student"]);
        let err = import_bytes(&repo, SurveyKind::Evaluation, &bytes).await.unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn { field: "university", .. }));
        assert!(repo
            .find_survey_responses(&RecordFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn empty_upload_is_no_file() {
        let repo = MemoryRepository::new();
        let err = import_bytes(&repo, SurveyKind::Proposals, b"").await.unwrap_err();
        assert!(matches!(err, ImportError::NoFile));
    }

    #[tokio::test]
    async fn proposals_without_id_are_skipped() {
        let repo = MemoryRepository::with_default_cycles().await.unwrap();
        let bytes = csv(&[
            "ID,Start time,Program,Impact,Digital,Clarity,Comments",
            "A1,2025-08-12 14:00,Aquaculture,4,5,3,solid plan",
            ",2025-08-12 14:05,Aquaculture,4,5,3,",
            "A1,2025-08-12 14:10,Aquaculture,2,2,2,revised",
        ]);
        let outcome = import_bytes(&repo, SurveyKind::Proposals, &bytes)
            .await
            .unwrap();
        assert_eq!(outcome.inserted, 2);
        assert_eq!(outcome.skipped_for(SkipReason::MissingSourceId), 1);

        let stored = repo
            .find_proposal_feedback(&RecordFilter::default())
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].fields.impact.value(), 2);
        assert_eq!(stored[0].fields.comments.as_deref(), Some("revised"));
    }

    #[tokio::test]
    async fn no_cycles_means_every_row_is_skipped() {
        let repo = MemoryRepository::new();
        let bytes = csv(&[EVALUATION_HEADER, "2024-01-10 09:00,Student,UFPR,5,5,5,5,5,5,5,5,"]);
        let outcome = import_bytes(&repo, SurveyKind::Evaluation, &bytes)
            .await
            .unwrap();
        assert_eq!(outcome.inserted, 0);
        assert_eq!(outcome.skipped_for(SkipReason::NoCycle), 1);
    }

    #[tokio::test]
    async fn failed_write_skips_only_that_row() {
        let repo = RefusingRepository {
            inner: MemoryRepository::with_default_cycles().await.unwrap(),
            refused: "P-2",
        };
        let bytes = csv(&[
            "ID,Start time,Program,Impact,Digital,Clarity,Comments",
            "P-1,2025-08-12 14:00,Aquaculture,4,5,3,",
            "P-2,2025-08-12 14:05,Aquaculture,4,5,3,",
            "P-3,2025-08-12 14:10,Solar schools,2,2,2,",
        ]);
        let outcome = import_bytes(&repo, SurveyKind::Proposals, &bytes)
            .await
            .unwrap();
        assert_eq!(outcome.inserted, 2);
        assert_eq!(outcome.skipped_for(SkipReason::PersistFailed), 1);
        assert_eq!(outcome.skips[0].row, 2);

        let stored = repo
            .find_proposal_feedback(&RecordFilter::default())
            .await
            .unwrap();
        let ids: Vec<_> = stored.iter().map(|f| f.source_id.as_str()).collect();
        assert_eq!(ids, vec!["P-1", "P-3"]);
    }

    #[tokio::test]
    async fn latin1_comment_does_not_stop_the_import() {
        let repo = MemoryRepository::with_default_cycles().await.unwrap();
        let mut bytes = csv(&[
            EVALUATION_HEADER,
            "2024-01-10 09:00,Student,UFPR,5,5,5,5,5,5,5,5,great",
        ]);
        let latin1_row: &[u8] =
            b"\n2024-01-11 09:00,Student,UFPR,4,4,4,4,4,4,4,4,organiza\xe7\xe3o";
        bytes.extend_from_slice(latin1_row);
        let outcome = import_bytes(&repo, SurveyKind::Evaluation, &bytes)
            .await
            .unwrap();
        assert_eq!(outcome.inserted, 2);
        assert_eq!(outcome.skipped, 0);

        let stored = repo
            .find_survey_responses(&RecordFilter::default())
            .await
            .unwrap();
        assert_eq!(stored[1].fields.comments.as_deref(), Some("organização"));
    }
}
