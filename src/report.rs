use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::grading;
use crate::models::{
    AcademicSession, PupilProfile, PupilStanding, ScoreEntry, SummaryRemarks, Term,
};
use crate::release;

fn non_blank(comment: &Option<String>) -> Option<&str> {
    comment.as_deref().filter(|text| !text.trim().is_empty())
}

pub fn build_result_sheet(
    pupil: &PupilProfile,
    session: &AcademicSession,
    term: Term,
    entries: &[ScoreEntry],
    remarks: &SummaryRemarks,
    now: DateTime<Utc>,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Pupil Result Sheet");
    let _ = writeln!(output, "Pupil: {}", pupil.full_name);
    let _ = writeln!(output, "Class: {}", pupil.class_name.as_deref().unwrap_or("N/A"));
    let _ = writeln!(output, "Session: {} ({})", session.name, term.label());
    let _ = writeln!(output);

    if !release::is_released(session, now) {
        let _ = writeln!(output, "## Results Not Yet Released");
        if let Some(release_at) = session.result_release_date {
            let _ = writeln!(
                output,
                "Results will be released on {}.",
                release_at.format("%Y-%m-%d %H:%M UTC")
            );
        }
        if let Some(left) = release::time_remaining(session, now) {
            let _ = writeln!(
                output,
                "Time remaining: {}d {}h {}m {}s",
                left.days, left.hours, left.minutes, left.seconds
            );
        }
        return output;
    }

    let summary = match grading::summarize(entries) {
        Ok(summary) => summary,
        Err(_) => {
            let _ = writeln!(output, "No results recorded for this term.");
            return output;
        }
    };

    let mut rows = entries.to_vec();
    rows.sort_by(|a, b| a.subject_name.cmp(&b.subject_name));

    let _ = writeln!(
        output,
        "| S/N | Subject | Test (30) | Exam (70) | Total (100) | Grade | Remark |"
    );
    let _ = writeln!(output, "|---|---|---|---|---|---|---|");
    for (idx, entry) in rows.iter().enumerate() {
        let grade = entry.grade();
        let _ = writeln!(
            output,
            "| {} | {} | {:.2} | {:.2} | {:.2} | {} | {} |",
            idx + 1,
            entry.subject_name.as_deref().unwrap_or("Unnamed subject"),
            entry.test_score,
            entry.exam_score,
            entry.total(),
            grade,
            grade.remark()
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "TOTAL SUBJECTS: {} | TOTAL: {:.2} | AVERAGE: {:.2} | GRADE: {} ({})",
        summary.subject_count,
        summary.total_score,
        summary.average_score,
        summary.overall_grade,
        summary.overall_grade.remark()
    );

    let subject_comments: Vec<(&str, &str)> = rows
        .iter()
        .filter_map(|entry| {
            non_blank(&entry.teacher_comment).map(|comment| {
                (entry.subject_name.as_deref().unwrap_or("Unnamed subject"), comment)
            })
        })
        .collect();
    if !subject_comments.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Subject Comments");
        for (subject, comment) in subject_comments {
            let _ = writeln!(output, "- {}: {}", subject, comment);
        }
    }

    let class_teacher = non_blank(&remarks.teacher_comment);
    let principal = non_blank(&remarks.principal_comment);
    if class_teacher.is_some() || principal.is_some() {
        let _ = writeln!(output);
        if let Some(comment) = class_teacher {
            let _ = writeln!(output, "Class Teacher's Comment: {}", comment);
        }
        if let Some(comment) = principal {
            let _ = writeln!(output, "Principal's Comment: {}", comment);
        }
    }

    output
}

pub fn build_standings_report(
    session: &AcademicSession,
    term: Term,
    standings: &[PupilStanding],
    limit: usize,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Class Standings");
    let _ = writeln!(output, "Generated for {} ({})", session.name, term.label());
    let _ = writeln!(output);

    if standings.is_empty() {
        let _ = writeln!(output, "No results recorded for this term.");
        return output;
    }

    for (position, standing) in standings.iter().take(limit).enumerate() {
        let _ = writeln!(
            output,
            "{}. {} average {:.2} ({}) across {} subjects",
            position + 1,
            standing.pupil_name,
            standing.summary.average_score,
            standing.summary.overall_grade,
            standing.summary.subject_count
        );
    }

    output
}
