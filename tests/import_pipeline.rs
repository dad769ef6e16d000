use rust_xlsxwriter::{Format, Workbook};
use survey_insights::analytics::evaluation_analytics;
use survey_insights::import::{import_bytes, SkipReason};
use survey_insights::models::{RecordFilter, SurveyKind};
use survey_insights::repository::{MemoryRepository, Repository};

const EVALUATION_SHEET: &str = "\
Start time,You are a,Your university,2 (the planning of the event),3 (the help from staff),4 (the help from university),5 (accommodation and travelling),6 (the egalitarian programme),8 (overral satisfaction),9 (how preppared are you feeling),Add coments bellow
,,,,,,,,,,
2023-03-02 10:15:00,Student,UFPR,Satisfied,Satisfied,Satisfied,Satisfied,Satisfied,Satisfied,Prepared a little,too early
2024-01-31 23:59:59.999,Student,UFPR,Very satisfied,Satisfied,Neither dissatisfied nor satisfied,Dissatisfied,Very satisfied,Very satisfied,Prepared very well,Great people and great food
";

async fn stored_count(repo: &MemoryRepository) -> usize {
    repo.find_survey_responses(&RecordFilter::default())
        .await
        .expect("memory repository never fails")
        .len()
}

#[tokio::test]
async fn reimporting_the_same_sheet_updates_instead_of_duplicating() {
    let repo = MemoryRepository::with_default_cycles().await.unwrap();

    let first = import_bytes(&repo, SurveyKind::Evaluation, EVALUATION_SHEET.as_bytes())
        .await
        .unwrap();
    assert_eq!(first.inserted, 1);
    assert_eq!(first.skipped_for(SkipReason::Blank), 1);
    assert_eq!(first.skipped_for(SkipReason::NoCycle), 1);
    assert_eq!(stored_count(&repo).await, 1);
    let before = repo
        .find_survey_responses(&RecordFilter::default())
        .await
        .unwrap();

    let second = import_bytes(&repo, SurveyKind::Evaluation, EVALUATION_SHEET.as_bytes())
        .await
        .unwrap();
    assert_eq!(second.inserted, 1);
    assert_eq!(stored_count(&repo).await, 1);
    let after = repo
        .find_survey_responses(&RecordFilter::default())
        .await
        .unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn last_moment_of_a_cycle_belongs_to_it() {
    let repo = MemoryRepository::with_default_cycles().await.unwrap();
    import_bytes(&repo, SurveyKind::Evaluation, EVALUATION_SHEET.as_bytes())
        .await
        .unwrap();

    let cycles = repo.find_cycles_ordered().await.unwrap();
    let stored = repo
        .find_survey_responses(&RecordFilter::default())
        .await
        .unwrap();
    assert_eq!(stored[0].cycle_id, cycles[0].id);
    assert_eq!(cycles[0].name, "Cycle 1 - Brazil");
    assert_eq!(stored[0].source_id, "3");
    assert_eq!(stored[0].fields.overall_satisfaction.value(), 5);
    assert_eq!(stored[0].fields.preparedness.value(), 5);
}

#[tokio::test]
async fn imported_answers_feed_the_dashboard() {
    let repo = MemoryRepository::with_default_cycles().await.unwrap();
    import_bytes(&repo, SurveyKind::Evaluation, EVALUATION_SHEET.as_bytes())
        .await
        .unwrap();

    let analytics = evaluation_analytics(&repo, &RecordFilter::default())
        .await
        .unwrap();
    assert_eq!(analytics.total_responses, 1);
    // planning 5, staff 4, university 3, accommodation 2, programme 5, overall 5;
    // the sheet has no cultural tour column
    assert_eq!(analytics.metrics.overall_satisfaction.value, 4.0);
    assert_eq!(analytics.metrics.preparedness.value, 5.0);
    assert_eq!(analytics.question_averages["culturalTour"], 0.0);
    assert_eq!(analytics.overall_trend[0].value, 4.0);
    assert_eq!(analytics.word_cloud_data[0].text, "great");
    assert_eq!(analytics.word_cloud_data[0].size, 2);
    assert_eq!(analytics.universities, vec!["UFPR"]);
}

fn evaluation_workbook() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
    let worksheet = workbook.add_worksheet();
    let header = [
        "ID", "Start time", "You are a", "Your university", "2", "3", "4", "5", "6", "8", "9",
        "Comments",
    ];
    for (col, title) in header.iter().enumerate() {
        worksheet.write_string(0, col as u16, *title).unwrap();
    }
    worksheet.write_number(1, 0, 42.0).unwrap();
    // 2024-01-31 23:59:59
    let last_second_of_january = 45322.0 + 86_399.0 / 86_400.0;
    worksheet
        .write_number_with_format(1, 1, last_second_of_january, &date_format)
        .unwrap();
    worksheet.write_string(1, 2, "Student").unwrap();
    worksheet.write_string(1, 3, "UFPR").unwrap();
    for col in 4..=9 {
        worksheet.write_string(1, col, "Satisfied").unwrap();
    }
    worksheet.write_string(1, 10, "Prepared very well").unwrap();
    worksheet.write_string(1, 11, "Lovely week").unwrap();
    workbook.save_to_buffer().unwrap()
}

#[tokio::test]
async fn xlsx_with_native_dates_is_imported() {
    let repo = MemoryRepository::with_default_cycles().await.unwrap();
    let bytes = evaluation_workbook();
    let outcome = import_bytes(&repo, SurveyKind::Evaluation, &bytes)
        .await
        .unwrap();
    assert_eq!(outcome.inserted, 1);
    assert_eq!(outcome.skipped, 0);

    let cycles = repo.find_cycles_ordered().await.unwrap();
    let stored = repo
        .find_survey_responses(&RecordFilter::default())
        .await
        .unwrap();
    assert_eq!(stored[0].source_id, "42");
    assert_eq!(stored[0].cycle_id, cycles[0].id);
    assert_eq!(stored[0].fields.planning.value(), 4);
    assert_eq!(stored[0].fields.preparedness.value(), 5);
    assert_eq!(stored[0].fields.comments.as_deref(), Some("Lovely week"));
}
