//! The `assessor history` command.

use std::path::PathBuf;

use anyhow::Result;

use assessor_core::model::Attempt;
use assessor_core::parser::parse_assessment;
use assessor_core::statistics::{question_stats, summarize_attempts, QuestionStats};
use assessor_core::traits::AssessmentStore;
use assessor_store::{load_config_from, FileStore};

pub async fn execute(
    assessment_path: PathBuf,
    user: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let user = user.unwrap_or_else(|| config.default_user.clone());

    let assessment = parse_assessment(&assessment_path)?;
    let store = FileStore::new(&config.data_dir);
    let attempts = store.load_prior_attempts(&user, &assessment.id).await?;
    tracing::debug!(
        user = %user,
        assessment = %assessment.id,
        attempts = attempts.len(),
        "loaded attempt history"
    );

    println!("Assessment: {} ({})", assessment.title, assessment.id);
    println!("Learner:    {user}");

    if attempts.is_empty() {
        println!("No attempts recorded.");
        return Ok(());
    }

    print_attempts(&attempts);
    print_question_stats(&question_stats(&assessment, &attempts));

    let summary = summarize_attempts(&assessment, &attempts);
    println!("Attempts used:      {}", summary.attempts_used);
    match summary.attempts_remaining {
        Some(n) => println!("Attempts remaining: {n}"),
        None => println!("Attempts remaining: unlimited"),
    }
    if let Some(best) = summary.best_score_percent {
        println!("Best score:         {best}%");
    }
    if let Some(avg) = summary.average_score_percent {
        println!("Average score:      {avg:.1}%");
    }
    println!(
        "Passed:             {}",
        if summary.passed_any { "yes" } else { "no" }
    );

    Ok(())
}

fn print_attempts(attempts: &[Attempt]) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec!["Started", "Submitted", "Score", "Passed", "Late", "Timed out"]);

    for a in attempts {
        table.add_row(vec![
            Cell::new(a.started_at.format("%Y-%m-%d %H:%M")),
            Cell::new(
                a.completed_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(
                a.final_score_percent
                    .map(|s| format!("{s}%"))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(match a.passed {
                Some(true) => "yes",
                Some(false) => "no",
                None => "-",
            }),
            Cell::new(if a.is_late { "yes" } else { "no" }),
            Cell::new(if a.auto_submitted { "yes" } else { "no" }),
        ]);
    }

    println!("{table}");
}

fn print_question_stats(stats: &[QuestionStats]) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec!["Question", "Answered", "Correct", "Correct rate"]);

    for s in stats {
        table.add_row(vec![
            Cell::new(&s.question_id),
            Cell::new(s.answered),
            Cell::new(s.correct),
            Cell::new(
                s.correct_rate
                    .map(|r| format!("{:.0}%", r * 100.0))
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]);
    }

    println!("{table}");
}
