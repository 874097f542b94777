//! The `assessor grade` command.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};

use assessor_core::clock::{Clock, ManualClock};
use assessor_core::countdown::ManualScheduler;
use assessor_core::model::{AnswerValue, AssessmentResult, QuestionId};
use assessor_core::{AssessmentEngine, AttemptSession, EngineError, SessionState, TickOutcome};
use assessor_store::{load_config_from, FileStore, ProgressGate};

pub async fn execute(
    assessment_path: PathBuf,
    answers_path: PathBuf,
    user: Option<String>,
    started_at: Option<String>,
    submitted_at: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let user = user.unwrap_or_else(|| config.default_user.clone());

    let answers = load_answers(&answers_path)?;
    let started_at = parse_time(started_at.as_deref(), "--started-at")?.unwrap_or_else(Utc::now);
    let submitted_at = parse_time(submitted_at.as_deref(), "--submitted-at")?
        .unwrap_or_else(Utc::now)
        .max(started_at);

    let store = Arc::new(FileStore::new(&config.data_dir));
    let assessment = store.install_assessment(&assessment_path).await?;
    let gate = Arc::new(ProgressGate::load(
        &config.progress_path(),
        config.prerequisite_threshold_percent,
    )?);

    let clock = Arc::new(ManualClock::new(started_at));
    let engine = AssessmentEngine::new(store, clock.clone()).with_gate(gate);
    let mut session = engine
        .open_session(&user, &assessment.id, Arc::new(ManualScheduler::new()))
        .await?;

    tracing::debug!(
        user = %user,
        assessment = %assessment.id,
        %started_at,
        %submitted_at,
        answers = answers.len(),
        "replaying attempt"
    );

    session.start()?;
    for (question_id, value) in answers {
        session.answer(&question_id, value)?;
    }

    submit_at(&mut session, clock.as_ref(), submitted_at)?;

    let result = engine.finalize(&mut session).await?;
    print_result(&result, &session);
    Ok(())
}

fn load_answers(path: &Path) -> Result<BTreeMap<QuestionId, AnswerValue>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read answers: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse answers: {}", path.display()))
}

fn parse_time(value: Option<&str>, flag: &str) -> Result<Option<DateTime<Utc>>> {
    value
        .map(|s| {
            DateTime::parse_from_rfc3339(s)
                .map(|d| d.with_timezone(&Utc))
                .with_context(|| format!("invalid {flag} timestamp: {s}"))
        })
        .transpose()
}

/// Submit at `submitted_at`, or let the countdown expire first if the time
/// limit ran out before then.
fn submit_at(
    session: &mut AttemptSession,
    clock: &ManualClock,
    submitted_at: DateTime<Utc>,
) -> Result<()> {
    let limit = session.config().time_limit.as_seconds();
    let started_at = clock.now();
    let elapsed = u64::try_from((submitted_at - started_at).num_seconds()).unwrap_or(0);

    match (limit, session.timer_token()) {
        (Some(limit), Some(token)) if elapsed >= limit => {
            let seconds = i64::try_from(limit).unwrap_or(i64::MAX);
            clock.set(started_at + Duration::seconds(seconds));
            while session.state() == SessionState::InProgress {
                if session.on_tick(token) == TickOutcome::Ignored {
                    break;
                }
            }
            tracing::info!(
                limit_seconds = limit,
                elapsed_seconds = elapsed,
                "time limit reached"
            );
            println!("Time limit reached, attempt was submitted automatically.");
            Ok(())
        }
        _ => {
            clock.set(submitted_at);
            match session.submit() {
                Ok(_) => Ok(()),
                Err(EngineError::IncompleteSubmission { missing }) => {
                    anyhow::bail!("required questions unanswered: {}", missing.join(", "))
                }
                Err(e) => Err(e.into()),
            }
        }
    }
}

fn print_result(result: &AssessmentResult, session: &AttemptSession) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec!["Question", "Answer", "Result", "Points", "Correct answer"]);

    for f in &result.feedback {
        let verdict = match f.is_correct {
            Some(true) => "correct",
            Some(false) => "wrong",
            None => "needs grading",
        };
        let correct_answer = if result.can_view_answers {
            f.correct_answer
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".to_string())
        } else {
            "hidden".to_string()
        };
        table.add_row(vec![
            Cell::new(&f.question_id),
            Cell::new(
                f.user_answer
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(verdict),
            Cell::new(format!("{}/{}", f.points_earned, f.points_possible)),
            Cell::new(correct_answer),
        ]);
    }

    let attempt = &result.attempt;
    println!("{table}");
    println!("Attempt:     {}", attempt.id);
    println!(
        "Raw score:   {}%",
        attempt.raw_score_percent.unwrap_or_default()
    );
    println!(
        "Final score: {}%{}",
        attempt.final_score_percent.unwrap_or_default(),
        if attempt.is_late { " (late)" } else { "" }
    );
    println!(
        "Result:      {} (passing score {}%)",
        if attempt.passed == Some(true) {
            "PASSED"
        } else {
            "FAILED"
        },
        session.config().passing_score_percent
    );
    if let Some(remaining) =
        assessor_core::policy::attempts_remaining(session.config(), session.prior_attempts())
    {
        println!("Attempts remaining: {remaining}");
    }
}
