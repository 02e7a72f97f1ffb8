use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::grading;

pub const MAX_TEST_SCORE: f64 = 30.0;
pub const MAX_EXAM_SCORE: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Term {
    First,
    Second,
    Third,
}

impl Term {
    pub fn as_str(&self) -> &'static str {
        match self {
            Term::First => "first",
            Term::Second => "second",
            Term::Third => "third",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Term::First => "First Term",
            Term::Second => "Second Term",
            Term::Third => "Third Term",
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown term `{0}` (expected first, second or third)")]
pub struct ParseTermError(pub String);

impl FromStr for Term {
    type Err = ParseTermError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Term::First),
            "second" => Ok(Term::Second),
            "third" => Ok(Term::Third),
            _ => Err(ParseTermError(value.to_string())),
        }
    }
}

/// Letter grade shared by per-subject and overall grading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }

    pub fn remark(&self) -> &'static str {
        match self {
            Grade::A => "Excellent",
            Grade::B => "Very Good",
            Grade::C => "Good",
            Grade::D => "Pass",
            Grade::F => "Fail",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicSession {
    pub id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    pub current_term: Term,
    pub result_release_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub results_unlocked: bool,
}

/// One pupil's test and exam marks for a subject in a session term.
///
/// `total` and `grade` are never stored; they are derived on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub pupil_id: Uuid,
    pub subject_id: Uuid,
    pub session_id: Uuid,
    pub term: Term,
    pub test_score: f64,
    pub exam_score: f64,
    #[serde(default)]
    pub subject_name: Option<String>,
    #[serde(default)]
    pub teacher_comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ScoreRangeError {
    #[error("test score {0} must be between 0 and 30")]
    TestOutOfRange(f64),
    #[error("exam score {0} must be between 0 and 70")]
    ExamOutOfRange(f64),
}

/// Rejects marks outside the 30/70 split. Used where records enter the
/// system, never by the evaluator itself.
pub fn check_score_ranges(test_score: f64, exam_score: f64) -> Result<(), ScoreRangeError> {
    if !(0.0..=MAX_TEST_SCORE).contains(&test_score) {
        return Err(ScoreRangeError::TestOutOfRange(test_score));
    }
    if !(0.0..=MAX_EXAM_SCORE).contains(&exam_score) {
        return Err(ScoreRangeError::ExamOutOfRange(exam_score));
    }
    Ok(())
}

impl ScoreEntry {
    pub fn total(&self) -> f64 {
        grading::total(self.test_score, self.exam_score)
    }

    pub fn grade(&self) -> Grade {
        grading::grade_of(self.total())
    }

    pub fn key(&self) -> PupilKey {
        PupilKey {
            pupil_id: self.pupil_id,
            session_id: self.session_id,
            term: self.term,
        }
    }

    pub fn check_ranges(&self) -> Result<(), ScoreRangeError> {
        check_score_ranges(self.test_score, self.exam_score)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PupilKey {
    pub pupil_id: Uuid,
    pub session_id: Uuid,
    pub term: Term,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub subject_count: usize,
    pub total_score: f64,
    pub average_score: f64,
    pub overall_grade: Grade,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PupilProfile {
    pub id: Uuid,
    pub full_name: String,
    #[serde(default)]
    pub class_name: Option<String>,
}

/// Term-level comments printed under a pupil's summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryRemarks {
    #[serde(default)]
    pub teacher_comment: Option<String>,
    #[serde(default)]
    pub principal_comment: Option<String>,
}

/// A score row joined with the pupil's display name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRecord {
    pub pupil_name: String,
    pub entry: ScoreEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PupilStanding {
    pub pupil_id: Uuid,
    pub pupil_name: String,
    pub summary: Summary,
}
