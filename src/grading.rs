use crate::models::{Grade, ScoreEntry, Summary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot summarize an empty set of score entries")]
pub struct EmptyInputError;

/// Maps a score out of 100 to a letter grade.
///
/// | Range       | Grade |
/// |-------------|-------|
/// | >= 70       | A     |
/// | >= 60       | B     |
/// | >= 50       | C     |
/// | >= 45       | D     |
/// | < 45        | F     |
///
/// Scores outside [0, 100] fall into the nearest band; NaN grades as F.
pub fn grade_of(total: f64) -> Grade {
    match total {
        t if t >= 70.0 => Grade::A,
        t if t >= 60.0 => Grade::B,
        t if t >= 50.0 => Grade::C,
        t if t >= 45.0 => Grade::D,
        _ => Grade::F,
    }
}

/// Sum of a test mark (0..=30) and an exam mark (0..=70). Ranges are the
/// caller's contract and are not re-checked here.
pub fn total(test_score: f64, exam_score: f64) -> f64 {
    test_score + exam_score
}

pub fn summarize(entries: &[ScoreEntry]) -> Result<Summary, EmptyInputError> {
    if entries.is_empty() {
        return Err(EmptyInputError);
    }

    // Float addition is not associative; sum in a fixed order so any
    // permutation of the same entries yields bit-identical output.
    let mut totals: Vec<f64> = entries.iter().map(ScoreEntry::total).collect();
    totals.sort_by(f64::total_cmp);

    let subject_count = totals.len();
    let total_score: f64 = totals.iter().sum();
    let average_score = total_score / subject_count as f64;

    Ok(Summary {
        subject_count,
        total_score,
        average_score,
        overall_grade: grade_of(average_score),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Term;
    use uuid::Uuid;

    fn sample_entry(pupil_id: Uuid, session_id: Uuid, test: f64, exam: f64) -> ScoreEntry {
        ScoreEntry {
            pupil_id,
            subject_id: Uuid::new_v4(),
            session_id,
            term: Term::Second,
            test_score: test,
            exam_score: exam,
            subject_name: None,
            teacher_comment: None,
        }
    }

    #[test]
    fn grades_follow_band_boundaries() {
        assert_eq!(grade_of(100.0), Grade::A);
        assert_eq!(grade_of(70.0), Grade::A);
        assert_eq!(grade_of(69.99), Grade::B);
        assert_eq!(grade_of(60.0), Grade::B);
        assert_eq!(grade_of(59.99), Grade::C);
        assert_eq!(grade_of(50.0), Grade::C);
        assert_eq!(grade_of(49.99), Grade::D);
        assert_eq!(grade_of(45.0), Grade::D);
        assert_eq!(grade_of(44.99), Grade::F);
        assert_eq!(grade_of(0.0), Grade::F);
    }

    #[test]
    fn out_of_range_scores_fall_into_nearest_band() {
        assert_eq!(grade_of(-5.0), Grade::F);
        assert_eq!(grade_of(140.0), Grade::A);
        assert_eq!(grade_of(f64::NAN), Grade::F);
    }

    #[test]
    fn total_adds_test_and_exam() {
        assert_eq!(total(25.0, 60.0), 85.0);
        assert_eq!(total(0.0, 0.0), 0.0);
        assert_eq!(total(30.0, 70.0), 100.0);
        assert_eq!(total(12.5, 40.25), 52.75);
    }

    #[test]
    fn summary_matches_worked_example() {
        let pupil = Uuid::new_v4();
        let session = Uuid::new_v4();
        let entries = vec![
            sample_entry(pupil, session, 25.0, 60.0),
            sample_entry(pupil, session, 22.0, 50.0),
            sample_entry(pupil, session, 18.0, 40.0),
        ];

        let summary = summarize(&entries).unwrap();
        assert_eq!(summary.subject_count, 3);
        assert_eq!(summary.total_score, 215.0);
        assert!((summary.average_score - 71.666_666).abs() < 0.001);
        assert_eq!(summary.overall_grade, Grade::A);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(summarize(&[]), Err(EmptyInputError));
    }

    #[test]
    fn summary_ignores_entry_order() {
        let pupil = Uuid::new_v4();
        let session = Uuid::new_v4();
        let entries = vec![
            sample_entry(pupil, session, 0.1, 0.2),
            sample_entry(pupil, session, 29.7, 61.3),
            sample_entry(pupil, session, 3.3, 44.4),
            sample_entry(pupil, session, 17.05, 33.33),
        ];
        let mut reversed = entries.clone();
        reversed.reverse();
        let mut rotated = entries.clone();
        rotated.rotate_left(2);

        let forward = summarize(&entries).unwrap();
        assert_eq!(forward, summarize(&reversed).unwrap());
        assert_eq!(forward, summarize(&rotated).unwrap());
    }

    #[test]
    fn overall_grade_uses_same_table_as_subjects() {
        let pupil = Uuid::new_v4();
        let session = Uuid::new_v4();
        let entries = vec![
            sample_entry(pupil, session, 20.0, 30.0),
            sample_entry(pupil, session, 20.0, 20.0),
        ];

        let summary = summarize(&entries).unwrap();
        assert_eq!(summary.average_score, 45.0);
        assert_eq!(summary.overall_grade, Grade::D);
        assert_eq!(summary.overall_grade, grade_of(summary.average_score));
    }
}
