use std::fmt::Write;

use crate::analytics::{EvaluationAnalytics, ProposalAnalytics, QuestionStats, TrendPoint};
use crate::models::{EvaluationQuestion, ProposalQuestion};
use crate::text::WordData;

const TOP_WORDS: usize = 15;

fn status(value: f64, target: f64) -> &'static str {
    if value >= target {
        "on target"
    } else {
        "below target"
    }
}

fn histogram(stats: &QuestionStats) -> String {
    stats
        .distribution
        .iter()
        .map(|(score, n)| format!("{score}:{n}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_trend(output: &mut String, trend: &[TrendPoint]) {
    let _ = writeln!(output, "## Trend by Cycle");
    if trend.is_empty() {
        let _ = writeln!(output, "No event cycles defined.");
        return;
    }
    for point in trend {
        let _ = writeln!(output, "- {}: {:.2}", point.cycle, point.value);
    }
}

fn write_words(output: &mut String, words: &[WordData]) {
    let _ = writeln!(output, "## Most Mentioned Words");
    if words.is_empty() {
        let _ = writeln!(output, "No comments recorded for this selection.");
        return;
    }
    let listed = words
        .iter()
        .take(TOP_WORDS)
        .map(|w| format!("{} ({})", w.text, w.size))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(output, "{listed}");
}

pub fn build_evaluation_report(scope: Option<&str>, analytics: &EvaluationAnalytics) -> String {
    let mut output = String::new();
    let scope_label = scope.unwrap_or("all cycles");

    let _ = writeln!(output, "# Participant Evaluation Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} responses)",
        scope_label, analytics.total_responses
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Headline Metrics");
    for (label, metric) in [
        ("Overall satisfaction", &analytics.metrics.overall_satisfaction),
        ("Preparedness", &analytics.metrics.preparedness),
    ] {
        let _ = writeln!(
            output,
            "- {}: {:.2} / {:.1} target, {} ({} answered)",
            label,
            metric.value,
            metric.target,
            status(metric.value, metric.target),
            metric.count
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Questions");
    if analytics.question_stats.is_empty() {
        let _ = writeln!(output, "No responses match this selection.");
    } else {
        for question in EvaluationQuestion::SATISFACTION
            .into_iter()
            .chain([EvaluationQuestion::Preparedness])
        {
            let metric = analytics.metric(question);
            let detail = analytics
                .question_stats
                .get(question.key())
                .map(histogram)
                .unwrap_or_default();
            let _ = writeln!(
                output,
                "- {}: {:.2} across {} answers [{}]",
                question.label(),
                metric.value,
                metric.count,
                detail
            );
        }
    }

    let _ = writeln!(output);
    write_trend(&mut output, &analytics.overall_trend);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Respondents");
    if analytics.total_responses == 0 {
        let _ = writeln!(output, "No respondents in this selection.");
    } else {
        for (heading, counts) in [
            ("By role", &analytics.demographics.by_role),
            ("By university", &analytics.demographics.by_university),
            ("By cycle", &analytics.demographics.by_cycle),
        ] {
            let _ = writeln!(output, "### {heading}");
            let mut sorted: Vec<_> = counts.iter().collect();
            sorted.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
            for (name, count) in sorted {
                let name = if name.is_empty() { "(not given)" } else { name.as_str() };
                let _ = writeln!(output, "- {name}: {count}");
            }
        }
    }

    let _ = writeln!(output);
    write_words(&mut output, &analytics.word_cloud_data);
    output
}

pub fn build_proposal_report(scope: Option<&str>, analytics: &ProposalAnalytics) -> String {
    let mut output = String::new();
    let scope_label = scope.unwrap_or("all programs");

    let _ = writeln!(output, "# Proposal Feedback Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} responses)",
        scope_label, analytics.total_responses
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Questions");
    for question in ProposalQuestion::ALL {
        let stats = match question {
            ProposalQuestion::Impact => &analytics.questions.impact,
            ProposalQuestion::DigitalTransformation => &analytics.questions.digital_transformation,
            ProposalQuestion::Clarity => &analytics.questions.clarity,
        };
        let _ = writeln!(
            output,
            "- {}: {:.2} across {} answers [{}]",
            question.label(),
            stats.average,
            stats.count,
            histogram(stats)
        );
    }

    let _ = writeln!(output);
    write_trend(&mut output, &analytics.overall_trend);
    let _ = writeln!(output);
    write_words(&mut output, &analytics.word_cloud_data);
    output
}
