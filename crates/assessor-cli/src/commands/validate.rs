//! The `assessor validate` command.

use std::path::PathBuf;

use anyhow::Result;

pub fn execute(assessment_path: PathBuf) -> Result<()> {
    let assessments = if assessment_path.is_dir() {
        assessor_core::parser::load_assessment_directory(&assessment_path)?
    } else {
        vec![assessor_core::parser::parse_assessment(&assessment_path)?]
    };

    let mut total_warnings = 0;

    for config in &assessments {
        println!(
            "Assessment: {} [{}] ({} questions, {} points)",
            config.title,
            config.kind,
            config.questions.len(),
            config.total_points()
        );

        let warnings = assessor_core::parser::validate_assessment(config);
        for w in &warnings {
            let prefix = w
                .question_id
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All assessments valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
