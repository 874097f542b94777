//! The `assessor init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    if Path::new("assessor.toml").exists() {
        println!("assessor.toml already exists, skipping.");
    } else {
        std::fs::write("assessor.toml", SAMPLE_CONFIG)?;
        println!("Created assessor.toml");
    }

    std::fs::create_dir_all("assessments")?;
    let example_path = Path::new("assessments/example.toml");
    if example_path.exists() {
        println!("assessments/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_ASSESSMENT)?;
        println!("Created assessments/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit assessments/example.toml");
    println!("  2. Run: assessor validate --assessment assessments/example.toml");
    println!("  3. Write answers.json, e.g. {{\"capital\": 1, \"largest\": \"jupiter\"}}");
    println!(
        "  4. Run: assessor grade --assessment assessments/example.toml --answers answers.json"
    );

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# assessor configuration

# Where assessments, attempts and progress.json are stored.
data_dir = "./assessor-data"

# Learner id used when --user is not given. String values may reference
# environment variables, e.g. "${USER}".
default_user = "learner"

# Share of the lecture (percent) a learner must watch before a gated
# assessment opens.
prerequisite_threshold_percent = 90
"#;

const EXAMPLE_ASSESSMENT: &str = r#"[assessment]
id = "example"
title = "Example Quiz"
kind = "quiz"
time_limit_minutes = 10
passing_score_percent = 70
max_attempts = 2
show_answers_after_deadline = true
due_date = "2030-01-01T00:00:00Z"

[[questions]]
id = "capital"
text = "What is the capital of France?"
kind = "multiple_choice"
options = ["Berlin", "Paris", "Madrid"]
correct_answer = 1
explanation = "Paris has been the capital since 987."

[[questions]]
id = "largest"
text = "Name the largest planet in the solar system."
kind = "short_answer"
correct_answer = "Jupiter"
points = 2
"#;
