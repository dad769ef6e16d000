use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCycle {
    pub id: Uuid,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}

impl EventCycle {
    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.start_date.date_naive() <= day && day <= self.end_date.date_naive()
    }
}

/// A Likert answer on the canonical 1-5 scale. Zero means the question was not answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub const ABSENT: Rating = Rating(0);
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Option<Rating> {
        (value <= Self::MAX).then_some(Rating(value))
    }

    pub fn from_stored(value: i16) -> Rating {
        u8::try_from(value)
            .ok()
            .and_then(Rating::new)
            .unwrap_or(Rating::ABSENT)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_answered(self) -> bool {
        self.0 > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum SurveyKind {
    Evaluation,
    Proposals,
}

impl SurveyKind {
    pub fn label(self) -> &'static str {
        match self {
            SurveyKind::Evaluation => "evaluation survey",
            SurveyKind::Proposals => "proposal feedback",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EvaluationQuestion {
    Planning,
    LocalStaff,
    SendingInstitution,
    AccommodationTravel,
    Programme,
    CulturalTour,
    OverallSatisfaction,
    Preparedness,
}

impl EvaluationQuestion {
    pub const SATISFACTION: [EvaluationQuestion; 7] = [
        EvaluationQuestion::Planning,
        EvaluationQuestion::LocalStaff,
        EvaluationQuestion::SendingInstitution,
        EvaluationQuestion::AccommodationTravel,
        EvaluationQuestion::Programme,
        EvaluationQuestion::CulturalTour,
        EvaluationQuestion::OverallSatisfaction,
    ];

    pub fn key(self) -> &'static str {
        match self {
            EvaluationQuestion::Planning => "planning",
            EvaluationQuestion::LocalStaff => "localStaff",
            EvaluationQuestion::SendingInstitution => "sendingInstitution",
            EvaluationQuestion::AccommodationTravel => "accommodationTravel",
            EvaluationQuestion::Programme => "programme",
            EvaluationQuestion::CulturalTour => "culturalTour",
            EvaluationQuestion::OverallSatisfaction => "overallSatisfaction",
            EvaluationQuestion::Preparedness => "preparedness",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EvaluationQuestion::Planning => "Planning of the event",
            EvaluationQuestion::LocalStaff => "Help from the local staff",
            EvaluationQuestion::SendingInstitution => "Help from the sending institution",
            EvaluationQuestion::AccommodationTravel => "Accommodation and travelling",
            EvaluationQuestion::Programme => "The programme",
            EvaluationQuestion::CulturalTour => "The cultural tour",
            EvaluationQuestion::OverallSatisfaction => "Overall satisfaction",
            EvaluationQuestion::Preparedness => "Preparedness",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProposalQuestion {
    Impact,
    DigitalTransformation,
    Clarity,
}

impl ProposalQuestion {
    pub const ALL: [ProposalQuestion; 3] = [
        ProposalQuestion::Impact,
        ProposalQuestion::DigitalTransformation,
        ProposalQuestion::Clarity,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ProposalQuestion::Impact => "impact",
            ProposalQuestion::DigitalTransformation => "digitalTransformation",
            ProposalQuestion::Clarity => "clarity",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProposalQuestion::Impact => "Expected impact",
            ProposalQuestion::DigitalTransformation => "Digital transformation",
            ProposalQuestion::Clarity => "Clarity and detail",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyFields {
    pub role: String,
    pub university: String,
    pub planning: Rating,
    pub local_staff: Rating,
    pub sending_institution: Rating,
    pub accommodation_travel: Rating,
    pub programme: Rating,
    pub cultural_tour: Rating,
    pub overall_satisfaction: Rating,
    pub preparedness: Rating,
    pub comments: Option<String>,
}

impl SurveyFields {
    pub fn rating(&self, question: EvaluationQuestion) -> Rating {
        match question {
            EvaluationQuestion::Planning => self.planning,
            EvaluationQuestion::LocalStaff => self.local_staff,
            EvaluationQuestion::SendingInstitution => self.sending_institution,
            EvaluationQuestion::AccommodationTravel => self.accommodation_travel,
            EvaluationQuestion::Programme => self.programme,
            EvaluationQuestion::CulturalTour => self.cultural_tour,
            EvaluationQuestion::OverallSatisfaction => self.overall_satisfaction,
            EvaluationQuestion::Preparedness => self.preparedness,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResponse {
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub source_id: String,
    #[serde(flatten)]
    pub fields: SurveyFields,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalFields {
    pub program: String,
    pub impact: Rating,
    pub digital_transformation: Rating,
    pub clarity: Rating,
    pub comments: Option<String>,
}

impl ProposalFields {
    pub fn rating(&self, question: ProposalQuestion) -> Rating {
        match question {
            ProposalQuestion::Impact => self.impact,
            ProposalQuestion::DigitalTransformation => self.digital_transformation,
            ProposalQuestion::Clarity => self.clarity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalFeedback {
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub source_id: String,
    #[serde(flatten)]
    pub fields: ProposalFields,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalRecord {
    Evaluation(SurveyFields),
    Proposal(ProposalFields),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub cycle_id: Option<Uuid>,
    pub role: Option<String>,
    pub university: Option<String>,
    pub program: Option<String>,
}

impl RecordFilter {
    pub fn without_cycle(&self) -> RecordFilter {
        RecordFilter {
            cycle_id: None,
            ..self.clone()
        }
    }

    pub fn matches_survey(&self, cycle_id: Uuid, fields: &SurveyFields) -> bool {
        self.cycle_id.map_or(true, |id| id == cycle_id)
            && self.role.as_deref().map_or(true, |r| r == fields.role)
            && self
                .university
                .as_deref()
                .map_or(true, |u| u == fields.university)
    }

    pub fn matches_proposal(&self, cycle_id: Uuid, fields: &ProposalFields) -> bool {
        self.cycle_id.map_or(true, |id| id == cycle_id)
            && self.program.as_deref().map_or(true, |p| p == fields.program)
    }
}
