use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    EvaluationQuestion, EventCycle, ProposalFeedback, ProposalQuestion, Rating, RecordFilter,
    SurveyResponse,
};
use crate::repository::Repository;
use crate::text::{word_frequencies, WordData};

pub const TARGET_SCORE: f64 = 4.0;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    sum: u64,
    count: usize,
    histogram: [usize; Rating::MAX as usize],
}

impl Tally {
    pub fn add(&mut self, rating: Rating) {
        if !rating.is_answered() {
            return;
        }
        self.sum += u64::from(rating.value());
        self.count += 1;
        self.histogram[usize::from(rating.value()) - 1] += 1;
    }

    pub fn merge(&mut self, other: &Tally) {
        self.sum += other.sum;
        self.count += other.count;
        for (bucket, n) in self.histogram.iter_mut().zip(other.histogram) {
            *bucket += n;
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum as f64 / self.count as f64)
    }

    pub fn stats(&self) -> QuestionStats {
        QuestionStats {
            distribution: (1..=Rating::MAX)
                .map(|score| (score, self.histogram[usize::from(score) - 1]))
                .collect(),
            average: round2(self.mean().unwrap_or(0.0)),
            count: self.count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionStats {
    pub distribution: BTreeMap<u8, usize>,
    pub average: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub value: f64,
    pub target: f64,
    pub count: usize,
}

impl Metric {
    fn empty() -> Metric {
        Metric {
            value: 0.0,
            target: TARGET_SCORE,
            count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub cycle_id: Uuid,
    pub cycle: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationMetrics {
    pub overall_satisfaction: Metric,
    pub preparedness: Metric,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Demographics {
    pub by_role: BTreeMap<String, usize>,
    pub by_university: BTreeMap<String, usize>,
    pub by_cycle: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationAnalytics {
    pub cycles: Vec<EventCycle>,
    pub roles: Vec<String>,
    pub universities: Vec<String>,
    pub metrics: EvaluationMetrics,
    pub question_averages: BTreeMap<&'static str, f64>,
    pub question_stats: BTreeMap<&'static str, QuestionStats>,
    pub word_cloud_data: Vec<WordData>,
    pub demographics: Demographics,
    pub total_responses: usize,
    pub overall_trend: Vec<TrendPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalQuestions {
    pub impact: QuestionStats,
    pub digital_transformation: QuestionStats,
    pub clarity: QuestionStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalAnalytics {
    pub cycles: Vec<EventCycle>,
    pub programs: Vec<String>,
    pub total_responses: usize,
    pub questions: ProposalQuestions,
    pub word_cloud_data: Vec<WordData>,
    pub overall_trend: Vec<TrendPoint>,
}

fn satisfaction_tally(response: &SurveyResponse) -> Tally {
    let mut tally = Tally::default();
    for question in EvaluationQuestion::SATISFACTION {
        tally.add(response.fields.rating(question));
    }
    tally
}

fn distinct_sorted<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn trend_series(cycles: &[EventCycle], value_of: impl Fn(Uuid) -> Option<f64>) -> Vec<TrendPoint> {
    cycles
        .iter()
        .map(|cycle| TrendPoint {
            cycle_id: cycle.id,
            cycle: cycle.name.clone(),
            value: round2(value_of(cycle.id).unwrap_or(0.0)),
        })
        .collect()
}

/// Builds the evaluation payload from records matching the caller's filter (`matching`) and the
/// records matching the same filter without its cycle constraint (`trend`).
pub fn aggregate_evaluation(
    cycles: &[EventCycle],
    matching: &[SurveyResponse],
    trend: &[SurveyResponse],
) -> EvaluationAnalytics {
    let mut composite = Tally::default();
    let mut composite_respondents = 0usize;
    let mut preparedness = Tally::default();
    let mut per_question: HashMap<EvaluationQuestion, Tally> = HashMap::new();
    let mut demographics = Demographics::default();
    let cycle_names: HashMap<Uuid, &str> =
        cycles.iter().map(|c| (c.id, c.name.as_str())).collect();

    for response in matching {
        let satisfaction = satisfaction_tally(response);
        if satisfaction.count() > 0 {
            composite_respondents += 1;
        }
        composite.merge(&satisfaction);
        preparedness.add(response.fields.preparedness);
        for question in EvaluationQuestion::SATISFACTION
            .into_iter()
            .chain([EvaluationQuestion::Preparedness])
        {
            per_question
                .entry(question)
                .or_default()
                .add(response.fields.rating(question));
        }

        *demographics
            .by_role
            .entry(response.fields.role.clone())
            .or_default() += 1;
        *demographics
            .by_university
            .entry(response.fields.university.clone())
            .or_default() += 1;
        let cycle_name = cycle_names
            .get(&response.cycle_id)
            .copied()
            .unwrap_or("Unknown");
        *demographics
            .by_cycle
            .entry(cycle_name.to_string())
            .or_default() += 1;
    }

    let mut question_averages = BTreeMap::new();
    let mut question_stats = BTreeMap::new();
    if !matching.is_empty() {
        for (question, tally) in &per_question {
            if EvaluationQuestion::SATISFACTION.contains(question) {
                question_averages.insert(question.key(), round2(tally.mean().unwrap_or(0.0)));
            }
            question_stats.insert(question.key(), tally.stats());
        }
    }

    let mut per_cycle: HashMap<Uuid, Tally> = HashMap::new();
    for response in trend {
        per_cycle
            .entry(response.cycle_id)
            .or_default()
            .merge(&satisfaction_tally(response));
    }

    let comments = matching.iter().filter_map(|r| r.fields.comments.as_deref());

    EvaluationAnalytics {
        cycles: cycles.to_vec(),
        roles: Vec::new(),
        universities: Vec::new(),
        metrics: EvaluationMetrics {
            overall_satisfaction: Metric {
                value: round2(composite.mean().unwrap_or(0.0)),
                target: TARGET_SCORE,
                count: composite_respondents,
            },
            preparedness: Metric {
                value: round2(preparedness.mean().unwrap_or(0.0)),
                target: TARGET_SCORE,
                count: preparedness.count(),
            },
        },
        question_averages,
        question_stats,
        word_cloud_data: word_frequencies(comments),
        demographics,
        total_responses: matching.len(),
        overall_trend: trend_series(cycles, |id| per_cycle.get(&id).and_then(Tally::mean)),
    }
}

fn proposal_tallies<'a>(records: impl Iterator<Item = &'a ProposalFeedback>) -> [Tally; 3] {
    let mut tallies = [Tally::default(); 3];
    for record in records {
        for (tally, question) in tallies.iter_mut().zip(ProposalQuestion::ALL) {
            tally.add(record.fields.rating(question));
        }
    }
    tallies
}

fn mean_of_means(tallies: &[Tally]) -> Option<f64> {
    let means: Vec<f64> = tallies.iter().filter_map(Tally::mean).collect();
    (!means.is_empty()).then(|| means.iter().sum::<f64>() / means.len() as f64)
}

pub fn aggregate_proposals(
    cycles: &[EventCycle],
    matching: &[ProposalFeedback],
    trend: &[ProposalFeedback],
) -> ProposalAnalytics {
    let [impact, digital_transformation, clarity] = proposal_tallies(matching.iter());

    let per_cycle: HashMap<Uuid, Option<f64>> = cycles
        .iter()
        .map(|cycle| {
            let tallies = proposal_tallies(trend.iter().filter(|r| r.cycle_id == cycle.id));
            (cycle.id, mean_of_means(&tallies))
        })
        .collect();

    let comments = matching.iter().filter_map(|r| r.fields.comments.as_deref());

    ProposalAnalytics {
        cycles: cycles.to_vec(),
        programs: Vec::new(),
        total_responses: matching.len(),
        questions: ProposalQuestions {
            impact: impact.stats(),
            digital_transformation: digital_transformation.stats(),
            clarity: clarity.stats(),
        },
        word_cloud_data: word_frequencies(comments),
        overall_trend: trend_series(cycles, |id| per_cycle.get(&id).copied().flatten()),
    }
}

pub async fn evaluation_analytics(
    repo: &dyn Repository,
    filter: &RecordFilter,
) -> Result<EvaluationAnalytics, StoreError> {
    let cycles = repo.find_cycles_ordered().await?;
    let everything = repo.find_survey_responses(&RecordFilter::default()).await?;
    let matching = repo.find_survey_responses(filter).await?;
    let trend = repo.find_survey_responses(&filter.without_cycle()).await?;
    debug!(
        "evaluation analytics: {} matching, {} in trend window",
        matching.len(),
        trend.len()
    );

    let mut analytics = aggregate_evaluation(&cycles, &matching, &trend);
    analytics.roles = distinct_sorted(everything.iter().map(|r| r.fields.role.as_str()));
    analytics.universities =
        distinct_sorted(everything.iter().map(|r| r.fields.university.as_str()));
    Ok(analytics)
}

pub async fn proposal_analytics(
    repo: &dyn Repository,
    filter: &RecordFilter,
) -> Result<ProposalAnalytics, StoreError> {
    let cycles = repo.find_cycles_ordered().await?;
    let everything = repo.find_proposal_feedback(&RecordFilter::default()).await?;
    let matching = repo.find_proposal_feedback(filter).await?;
    let trend = repo.find_proposal_feedback(&filter.without_cycle()).await?;
    debug!(
        "proposal analytics: {} matching, {} in trend window",
        matching.len(),
        trend.len()
    );

    let mut analytics = aggregate_proposals(&cycles, &matching, &trend);
    analytics.programs = distinct_sorted(everything.iter().map(|r| r.fields.program.as_str()));
    Ok(analytics)
}

impl EvaluationAnalytics {
    pub fn metric(&self, question: EvaluationQuestion) -> Metric {
        match question {
            EvaluationQuestion::OverallSatisfaction => self.metrics.overall_satisfaction.clone(),
            EvaluationQuestion::Preparedness => self.metrics.preparedness.clone(),
            other => self
                .question_stats
                .get(other.key())
                .map(|stats| Metric {
                    value: stats.average,
                    target: TARGET_SCORE,
                    count: stats.count,
                })
                .unwrap_or_else(Metric::empty),
        }
    }
}
