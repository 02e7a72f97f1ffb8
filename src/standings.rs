use std::collections::HashMap;

use crate::grading;
use crate::models::{PupilKey, PupilStanding, ScoreEntry, ScoreRecord};

/// Summarizes each pupil's entries and orders pupils by average, best first.
///
/// Records are grouped by (pupil, session, term) so that every group meets
/// the single-pupil precondition of [`grading::summarize`].
pub fn rank_pupils(records: &[ScoreRecord]) -> Vec<PupilStanding> {
    let mut groups: HashMap<PupilKey, (String, Vec<ScoreEntry>)> = HashMap::new();

    for record in records.iter() {
        let group = groups
            .entry(record.entry.key())
            .or_insert_with(|| (record.pupil_name.clone(), Vec::new()));
        group.1.push(record.entry.clone());
    }

    let mut standings: Vec<PupilStanding> = groups
        .into_iter()
        .filter_map(|(key, (pupil_name, entries))| {
            grading::summarize(&entries)
                .ok()
                .map(|summary| PupilStanding {
                    pupil_id: key.pupil_id,
                    pupil_name,
                    summary,
                })
        })
        .collect();

    standings.sort_by(|a, b| {
        b.summary
            .average_score
            .total_cmp(&a.summary.average_score)
            .then_with(|| a.pupil_name.cmp(&b.pupil_name))
            .then_with(|| a.pupil_id.cmp(&b.pupil_id))
    });
    standings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Grade, Term};
    use uuid::Uuid;

    fn sample_record(
        pupil_id: Uuid,
        name: &str,
        session_id: Uuid,
        test: f64,
        exam: f64,
    ) -> ScoreRecord {
        ScoreRecord {
            pupil_name: name.to_string(),
            entry: ScoreEntry {
                pupil_id,
                subject_id: Uuid::new_v4(),
                session_id,
                term: Term::First,
                test_score: test,
                exam_score: exam,
                subject_name: None,
                teacher_comment: None,
            },
        }
    }

    #[test]
    fn standings_accumulate_by_pupil() {
        let session = Uuid::new_v4();
        let avery = Uuid::new_v4();
        let jules = Uuid::new_v4();
        let records = vec![
            sample_record(avery, "Avery Lee", session, 20.0, 40.0),
            sample_record(jules, "Jules Moreno", session, 28.0, 62.0),
            sample_record(avery, "Avery Lee", session, 10.0, 30.0),
        ];

        let standings = rank_pupils(&records);
        assert_eq!(standings.len(), 2);

        assert_eq!(standings[0].pupil_name, "Jules Moreno");
        assert_eq!(standings[0].summary.subject_count, 1);
        assert_eq!(standings[0].summary.overall_grade, Grade::A);

        assert_eq!(standings[1].pupil_id, avery);
        assert_eq!(standings[1].summary.subject_count, 2);
        assert_eq!(standings[1].summary.total_score, 100.0);
        assert_eq!(standings[1].summary.average_score, 50.0);
        assert_eq!(standings[1].summary.overall_grade, Grade::C);
    }

    #[test]
    fn ties_break_on_name() {
        let session = Uuid::new_v4();
        let records = vec![
            sample_record(Uuid::new_v4(), "Zara Obi", session, 15.0, 45.0),
            sample_record(Uuid::new_v4(), "Ade Bello", session, 20.0, 40.0),
        ];

        let standings = rank_pupils(&records);
        assert_eq!(standings[0].pupil_name, "Ade Bello");
        assert_eq!(standings[1].pupil_name, "Zara Obi");
    }

    #[test]
    fn namesakes_with_equal_averages_rank_by_id() {
        let session = Uuid::new_v4();
        let first = Uuid::from_u128(1);
        let second = Uuid::from_u128(2);
        let records = vec![
            sample_record(second, "Ade Bello", session, 20.0, 40.0),
            sample_record(first, "Ade Bello", session, 20.0, 40.0),
        ];

        for _ in 0..200 {
            let standings = rank_pupils(&records);
            assert_eq!(standings[0].pupil_id, first);
            assert_eq!(standings[1].pupil_id, second);
        }
    }

    #[test]
    fn no_records_yield_no_standings() {
        assert!(rank_pupils(&[]).is_empty());
    }
}
