use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};
use tracing::info;
use uuid::Uuid;

use crate::cycles::NewCycle;
use crate::error::StoreError;
use crate::models::{
    CanonicalRecord, EventCycle, ProposalFeedback, ProposalFields, Rating, RecordFilter,
    SurveyFields, SurveyResponse,
};
use crate::repository::Repository;

const SURVEY_COLUMNS: &str = "id, cycle_id, source_id, role, university, planning, local_staff, \
     sending_institution, accommodation_travel, programme, cultural_tour, overall_satisfaction, \
     preparedness, comments";

const PROPOSAL_COLUMNS: &str =
    "id, cycle_id, source_id, program, impact, digital_transformation, clarity, comments";

#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init_db(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("schema survey_insights is up to date");
        Ok(())
    }
}

fn stored(rating: Rating) -> i16 {
    i16::from(rating.value())
}

fn rating_at(row: &PgRow, column: &str) -> Result<Rating, sqlx::Error> {
    Ok(Rating::from_stored(row.try_get::<i16, _>(column)?))
}

fn cycle_from_row(row: &PgRow) -> Result<EventCycle, sqlx::Error> {
    Ok(EventCycle {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        created_at: row.try_get("created_at")?,
    })
}

fn survey_from_row(row: &PgRow) -> Result<SurveyResponse, sqlx::Error> {
    Ok(SurveyResponse {
        id: row.try_get("id")?,
        cycle_id: row.try_get("cycle_id")?,
        source_id: row.try_get("source_id")?,
        fields: SurveyFields {
            role: row.try_get("role")?,
            university: row.try_get("university")?,
            planning: rating_at(row, "planning")?,
            local_staff: rating_at(row, "local_staff")?,
            sending_institution: rating_at(row, "sending_institution")?,
            accommodation_travel: rating_at(row, "accommodation_travel")?,
            programme: rating_at(row, "programme")?,
            cultural_tour: rating_at(row, "cultural_tour")?,
            overall_satisfaction: rating_at(row, "overall_satisfaction")?,
            preparedness: rating_at(row, "preparedness")?,
            comments: row.try_get("comments")?,
        },
    })
}

fn proposal_from_row(row: &PgRow) -> Result<ProposalFeedback, sqlx::Error> {
    Ok(ProposalFeedback {
        id: row.try_get("id")?,
        cycle_id: row.try_get("cycle_id")?,
        source_id: row.try_get("source_id")?,
        fields: ProposalFields {
            program: row.try_get("program")?,
            impact: rating_at(row, "impact")?,
            digital_transformation: rating_at(row, "digital_transformation")?,
            clarity: rating_at(row, "clarity")?,
            comments: row.try_get("comments")?,
        },
    })
}

fn survey_query(filter: &RecordFilter) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(format!(
        "SELECT {SURVEY_COLUMNS} FROM survey_insights.evaluation_survey_responses WHERE TRUE"
    ));
    if let Some(cycle_id) = filter.cycle_id {
        query.push(" AND cycle_id = ").push_bind(cycle_id);
    }
    if let Some(role) = &filter.role {
        query.push(" AND role = ").push_bind(role.clone());
    }
    if let Some(university) = &filter.university {
        query.push(" AND university = ").push_bind(university.clone());
    }
    query.push(" ORDER BY created_at, id");
    query
}

fn proposal_query(filter: &RecordFilter) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(format!(
        "SELECT {PROPOSAL_COLUMNS} FROM survey_insights.proposal_feedback WHERE TRUE"
    ));
    if let Some(cycle_id) = filter.cycle_id {
        query.push(" AND cycle_id = ").push_bind(cycle_id);
    }
    if let Some(program) = &filter.program {
        query.push(" AND program = ").push_bind(program.clone());
    }
    query.push(" ORDER BY created_at, id");
    query
}

#[async_trait]
impl Repository for PgRepository {
    async fn find_cycles_ordered(&self) -> Result<Vec<EventCycle>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, start_date, end_date, created_at \
             FROM survey_insights.event_cycles ORDER BY start_date, created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        let cycles = rows
            .iter()
            .map(cycle_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cycles)
    }

    async fn create_cycle(&self, cycle: &NewCycle) -> Result<EventCycle, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO survey_insights.event_cycles (id, name, start_date, end_date)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, start_date, end_date, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&cycle.name)
        .bind(cycle.start_date)
        .bind(cycle.end_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(cycle_from_row(&row)?)
    }

    async fn upsert_record(
        &self,
        cycle_id: Uuid,
        source_id: &str,
        record: &CanonicalRecord,
    ) -> Result<Uuid, StoreError> {
        let row = match record {
            CanonicalRecord::Evaluation(fields) => {
                sqlx::query(
                    r#"
                    INSERT INTO survey_insights.evaluation_survey_responses
                    (id, cycle_id, source_id, role, university, planning, local_staff,
                     sending_institution, accommodation_travel, programme, cultural_tour,
                     overall_satisfaction, preparedness, comments)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                    ON CONFLICT (cycle_id, source_id) DO UPDATE
                    SET role = EXCLUDED.role,
                        university = EXCLUDED.university,
                        planning = EXCLUDED.planning,
                        local_staff = EXCLUDED.local_staff,
                        sending_institution = EXCLUDED.sending_institution,
                        accommodation_travel = EXCLUDED.accommodation_travel,
                        programme = EXCLUDED.programme,
                        cultural_tour = EXCLUDED.cultural_tour,
                        overall_satisfaction = EXCLUDED.overall_satisfaction,
                        preparedness = EXCLUDED.preparedness,
                        comments = EXCLUDED.comments
                    RETURNING id
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(cycle_id)
                .bind(source_id)
                .bind(&fields.role)
                .bind(&fields.university)
                .bind(stored(fields.planning))
                .bind(stored(fields.local_staff))
                .bind(stored(fields.sending_institution))
                .bind(stored(fields.accommodation_travel))
                .bind(stored(fields.programme))
                .bind(stored(fields.cultural_tour))
                .bind(stored(fields.overall_satisfaction))
                .bind(stored(fields.preparedness))
                .bind(&fields.comments)
                .fetch_one(&self.pool)
                .await?
            }
            CanonicalRecord::Proposal(fields) => {
                sqlx::query(
                    r#"
                    INSERT INTO survey_insights.proposal_feedback
                    (id, cycle_id, source_id, program, impact, digital_transformation, clarity,
                     comments)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    ON CONFLICT (cycle_id, source_id) DO UPDATE
                    SET program = EXCLUDED.program,
                        impact = EXCLUDED.impact,
                        digital_transformation = EXCLUDED.digital_transformation,
                        clarity = EXCLUDED.clarity,
                        comments = EXCLUDED.comments
                    RETURNING id
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(cycle_id)
                .bind(source_id)
                .bind(&fields.program)
                .bind(stored(fields.impact))
                .bind(stored(fields.digital_transformation))
                .bind(stored(fields.clarity))
                .bind(&fields.comments)
                .fetch_one(&self.pool)
                .await?
            }
        };
        Ok(row.try_get("id")?)
    }

    async fn find_survey_responses(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<SurveyResponse>, StoreError> {
        let rows = survey_query(filter).build().fetch_all(&self.pool).await?;
        let responses = rows
            .iter()
            .map(survey_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(responses)
    }

    async fn find_proposal_feedback(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<ProposalFeedback>, StoreError> {
        let rows = proposal_query(filter).build().fetch_all(&self.pool).await?;
        let feedback = rows
            .iter()
            .map(proposal_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(feedback)
    }

    async fn reset(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM survey_insights.evaluation_survey_responses")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM survey_insights.proposal_feedback")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM survey_insights.event_cycles")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        info!("all survey data deleted");
        Ok(())
    }
}
