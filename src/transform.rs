use chrono::{DateTime, Utc};

use crate::cycles::cell_timestamp;
use crate::headers::{field, ResolvedColumns};
use crate::models::{CanonicalRecord, ProposalFields, SurveyFields};
use crate::rating::{evaluation_rating, proposal_rating};
use crate::sheet::Cell;

#[derive(Debug, Clone, PartialEq)]
pub struct TransformedRow {
    pub timestamp: Option<DateTime<Utc>>,
    pub source_id: Option<String>,
    pub record: CanonicalRecord,
}

pub fn row_is_blank(row: &[Cell]) -> bool {
    row.iter().all(Cell::is_blank)
}

/// Joins free-text answers with a single space. Empty parts are dropped and nothing left
/// yields `None`, never an empty string.
pub fn combine_comments<I, S>(parts: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = parts
        .into_iter()
        .filter_map(|part| {
            let trimmed = part.as_ref().trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        })
        .collect::<Vec<_>>()
        .join(" ");
    (!joined.is_empty()).then_some(joined)
}

pub fn transform_evaluation_row(
    columns: &ResolvedColumns,
    position: usize,
    row: &[Cell],
) -> TransformedRow {
    let rating = |name: &str| evaluation_rating(columns.cell(name, row));
    let fields = SurveyFields {
        role: columns.text(field::ROLE, row),
        university: columns.text(field::UNIVERSITY, row),
        planning: rating(field::PLANNING),
        local_staff: rating(field::LOCAL_STAFF),
        sending_institution: rating(field::SENDING_INSTITUTION),
        accommodation_travel: rating(field::ACCOMMODATION_TRAVEL),
        programme: rating(field::PROGRAMME),
        cultural_tour: rating(field::CULTURAL_TOUR),
        overall_satisfaction: rating(field::OVERALL_SATISFACTION),
        preparedness: rating(field::PREPAREDNESS),
        comments: combine_comments([
            columns.text(field::COMMENTS, row),
            columns.text(field::MEMORABLE_MOMENT, row),
        ]),
    };
    let explicit_id = columns.text(field::ID, row);
    let source_id = if explicit_id.is_empty() {
        position.to_string()
    } else {
        explicit_id
    };
    TransformedRow {
        timestamp: cell_timestamp(columns.cell(field::START_TIME, row)),
        source_id: Some(source_id),
        record: CanonicalRecord::Evaluation(fields),
    }
}

pub fn transform_proposal_row(columns: &ResolvedColumns, row: &[Cell]) -> TransformedRow {
    let rating = |name: &str| proposal_rating(columns.cell(name, row));
    let fields = ProposalFields {
        program: columns.text(field::PROGRAM, row),
        impact: rating(field::IMPACT),
        digital_transformation: rating(field::DIGITAL_TRANSFORMATION),
        clarity: rating(field::CLARITY),
        comments: combine_comments([columns.text(field::COMMENTS, row)]),
    };
    let id = columns.text(field::ID, row);
    TransformedRow {
        timestamp: cell_timestamp(columns.cell(field::DATE, row)),
        source_id: (!id.is_empty()).then_some(id),
        record: CanonicalRecord::Proposal(fields),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::{resolve_columns, HeaderIndex, EVALUATION_FIELDS, PROPOSAL_FIELDS};
    use crate::models::Rating;
    use chrono::TimeZone;

    fn text_row(values: &[&str]) -> Vec<Cell> {
        values
            .iter()
            .map(|v| {
                if v.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(v.to_string())
                }
            })
            .collect()
    }

    fn evaluation_columns(with_memorable: bool) -> ResolvedColumns {
        let mut header = vec![
            "Start time",
            "You are a",
            "Your university",
            "2",
            "3",
            "4",
            "5",
            "6",
            "7",
            "8",
            "9",
            "Comments",
        ];
        if with_memorable {
            header.push("Most memorable moment");
        }
        resolve_columns(&HeaderIndex::from_row(&text_row(&header)), EVALUATION_FIELDS).unwrap()
    }

    #[test]
    fn comments_join_and_collapse_to_none() {
        assert_eq!(
            combine_comments(["Great week", "  the tour "]),
            Some("Great week the tour".to_string())
        );
        assert_eq!(combine_comments(["", "only this"]), Some("only this".to_string()));
        assert_eq!(combine_comments(["  ", ""]), None);
    }

    #[test]
    fn evaluation_row_is_normalized() {
        let columns = evaluation_columns(true);
        let row = text_row(&[
            "2024-08-14 10:00:00",
            " Student ",
            "Aarhus University",
            "Very satisfied",
            "Satisfied",
            "3",
            "Dissatisfied",
            "",
            "Very dissatisfied",
            "5",
            "Prepared reasonably well",
            "Loved it",
            "The boat trip",
        ]);
        let transformed = transform_evaluation_row(&columns, 4, &row);
        assert_eq!(
            transformed.timestamp,
            Some(Utc.with_ymd_and_hms(2024, 8, 14, 10, 0, 0).unwrap())
        );
        assert_eq!(transformed.source_id.as_deref(), Some("4"));
        let CanonicalRecord::Evaluation(fields) = transformed.record else {
            panic!("expected an evaluation record");
        };
        assert_eq!(fields.role, "Student");
        assert_eq!(fields.planning.value(), 5);
        assert_eq!(fields.local_staff.value(), 4);
        assert_eq!(fields.sending_institution.value(), 3);
        assert_eq!(fields.accommodation_travel.value(), 2);
        assert_eq!(fields.programme, Rating::ABSENT);
        assert_eq!(fields.cultural_tour.value(), 1);
        assert_eq!(fields.overall_satisfaction.value(), 5);
        assert_eq!(fields.preparedness.value(), 4);
        assert_eq!(fields.comments.as_deref(), Some("Loved it The boat trip"));
    }

    #[test]
    fn short_rows_and_missing_optional_columns_read_as_empty() {
        let columns = evaluation_columns(false);
        let row = text_row(&["2024-08-14", "Staff"]);
        let transformed = transform_evaluation_row(&columns, 1, &row);
        let CanonicalRecord::Evaluation(fields) = transformed.record else {
            panic!("expected an evaluation record");
        };
        assert_eq!(fields.university, "");
        assert_eq!(fields.overall_satisfaction, Rating::ABSENT);
        assert_eq!(fields.comments, None);
    }

    #[test]
    fn proposal_rows_need_an_id() {
        let header = text_row(&[
            "ID",
            "Start time",
            "Program",
            "Impact",
            "Digital",
            "Clarity",
            "Comments",
        ]);
        let columns = resolve_columns(&HeaderIndex::from_row(&header), PROPOSAL_FIELDS).unwrap();

        let row = text_row(&[
            "17",
            "2025-01-20",
            "Aquaculture",
            "4 - agree",
            "Strongly agree",
            "neutral",
            "",
        ]);
        let transformed = transform_proposal_row(&columns, &row);
        assert_eq!(transformed.source_id.as_deref(), Some("17"));
        let CanonicalRecord::Proposal(fields) = &transformed.record else {
            panic!("expected a proposal record");
        };
        assert_eq!(fields.impact.value(), 4);
        assert_eq!(fields.digital_transformation.value(), 5);
        assert_eq!(fields.clarity.value(), 3);
        assert_eq!(fields.comments, None);

        let anonymous = text_row(&["", "2025-01-20", "Aquaculture", "4", "4", "4", "ok"]);
        assert_eq!(transform_proposal_row(&columns, &anonymous).source_id, None);
    }

    #[test]
    fn blank_rows() {
        assert!(row_is_blank(&text_row(&["", "  ", ""])));
        assert!(row_is_blank(&[]));
        assert!(!row_is_blank(&text_row(&["", "x"])));
    }
}
