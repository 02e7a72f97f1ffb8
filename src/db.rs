use anyhow::Context;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{
    check_score_ranges, AcademicSession, PupilProfile, ScoreEntry, ScoreRecord, SummaryRemarks,
    Term,
};

const SESSION_COLUMNS: &str = "id, name, start_date, end_date, current_term, is_active, \
                               result_release_date, results_unlocked";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let session_id = Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?;
    let release_at = Utc
        .with_ymd_and_hms(2026, 4, 10, 9, 0, 0)
        .single()
        .context("invalid release date")?;

    // Only one session may be active; retire any other before activating ours.
    sqlx::query(
        "UPDATE school_results.sessions SET is_active = FALSE WHERE is_active AND name <> $1",
    )
    .bind("2025/2026")
    .execute(pool)
    .await
    .context("failed to deactivate existing sessions")?;

    sqlx::query(
        r#"
        INSERT INTO school_results.sessions
        (id, name, start_date, end_date, current_term, is_active, result_release_date)
        VALUES ($1, $2, $3, $4, $5, TRUE, $6)
        ON CONFLICT (name) DO UPDATE
        SET current_term = EXCLUDED.current_term,
            is_active = TRUE,
            result_release_date = EXCLUDED.result_release_date
        "#,
    )
    .bind(session_id)
    .bind("2025/2026")
    .bind(NaiveDate::from_ymd_opt(2025, 9, 8).context("invalid date")?)
    .bind(NaiveDate::from_ymd_opt(2026, 7, 17).context("invalid date")?)
    .bind(Term::Second.as_str())
    .bind(release_at)
    .execute(pool)
    .await
    .context("failed to upsert the seed session")?;

    let subjects = vec![
        ("MTH", "Mathematics"),
        ("ENG", "English Language"),
        ("BSC", "Basic Science"),
    ];

    for (code, name) in subjects {
        sqlx::query(
            r#"
            INSERT INTO school_results.subjects (id, name, code)
            VALUES ($1, $2, $3)
            ON CONFLICT (code) DO UPDATE SET name = EXCLUDED.name
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(code)
        .execute(pool)
        .await?;
    }

    let pupils = vec![
        ("alee", "Avery Lee", "JSS 2A"),
        ("jmoreno", "Jules Moreno", "JSS 2A"),
        ("kpatel", "Kiara Patel", "JSS 2B"),
    ];

    for (username, full_name, class_name) in pupils {
        sqlx::query(
            r#"
            INSERT INTO school_results.pupils (id, username, full_name, class_name)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (username) DO UPDATE
            SET full_name = EXCLUDED.full_name, class_name = EXCLUDED.class_name
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(full_name)
        .bind(class_name)
        .execute(pool)
        .await?;
    }

    let scores = vec![
        ("alee", "MTH", 25.0, 60.0, Some("Excellent problem solving")),
        ("alee", "ENG", 22.0, 50.0, None),
        ("alee", "BSC", 18.0, 40.0, None),
        ("jmoreno", "MTH", 15.5, 31.0, Some("Needs more practice")),
        ("jmoreno", "ENG", 20.0, 44.0, None),
        ("kpatel", "MTH", 28.0, 66.5, None),
        ("kpatel", "BSC", 24.0, 52.0, None),
    ];

    for (username, code, test_score, exam_score, comment) in scores {
        let ids = resolve_ids(pool, username, code, "2025/2026").await?;
        let (pupil_id, subject_id, session_id) =
            ids.context("seed rows reference unknown records")?;
        upsert_score(
            pool,
            &ScoreEntry {
                pupil_id,
                subject_id,
                session_id,
                term: Term::Second,
                test_score,
                exam_score,
                subject_name: None,
                teacher_comment: comment.map(str::to_string),
            },
        )
        .await?;
    }

    let remarks = vec![
        (
            "alee",
            "A diligent pupil who leads by example.",
            "An excellent term. Keep it up.",
        ),
        (
            "jmoreno",
            "Capable, but must revise more consistently.",
            "There is room for improvement.",
        ),
    ];

    for (username, teacher_comment, principal_comment) in remarks {
        let pupil_id: Uuid =
            sqlx::query("SELECT id FROM school_results.pupils WHERE username = $1")
                .bind(username)
                .fetch_one(pool)
                .await?
                .try_get("id")?;

        set_summary_remarks(
            pool,
            pupil_id,
            session_id,
            Term::Second,
            &SummaryRemarks {
                teacher_comment: Some(teacher_comment.to_string()),
                principal_comment: Some(principal_comment.to_string()),
            },
        )
        .await?;
    }

    Ok(())
}

fn session_from_row(row: &PgRow) -> anyhow::Result<AcademicSession> {
    let term: String = row.try_get("current_term")?;
    Ok(AcademicSession {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        is_active: row.try_get("is_active")?,
        current_term: term.parse()?,
        result_release_date: row.try_get("result_release_date")?,
        results_unlocked: row.try_get("results_unlocked")?,
    })
}

fn entry_from_row(row: &PgRow) -> anyhow::Result<ScoreEntry> {
    let term: String = row.try_get("term")?;
    Ok(ScoreEntry {
        pupil_id: row.try_get("pupil_id")?,
        subject_id: row.try_get("subject_id")?,
        session_id: row.try_get("session_id")?,
        term: term.parse()?,
        test_score: row.try_get("test_score")?,
        exam_score: row.try_get("exam_score")?,
        subject_name: row.try_get("subject_name")?,
        teacher_comment: row.try_get("teacher_comment")?,
    })
}

pub async fn fetch_active_session(
    pool: &PgPool,
) -> anyhow::Result<Option<AcademicSession>> {
    let query = format!(
        "SELECT {SESSION_COLUMNS} FROM school_results.sessions \
         WHERE is_active ORDER BY start_date DESC LIMIT 1"
    );
    let row = sqlx::query(&query).fetch_optional(pool).await?;
    row.as_ref().map(session_from_row).transpose()
}

pub async fn fetch_session(
    pool: &PgPool,
    id: Uuid,
) -> anyhow::Result<Option<AcademicSession>> {
    let query =
        format!("SELECT {SESSION_COLUMNS} FROM school_results.sessions WHERE id = $1");
    let row = sqlx::query(&query).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(session_from_row).transpose()
}

/// Flips the admin override. Returns false when no session has `id`.
pub async fn set_results_unlocked(
    pool: &PgPool,
    id: Uuid,
    unlocked: bool,
) -> anyhow::Result<bool> {
    let result =
        sqlx::query("UPDATE school_results.sessions SET results_unlocked = $2 WHERE id = $1")
            .bind(id)
            .bind(unlocked)
            .execute(pool)
            .await?;

    tracing::info!(session = %id, unlocked, "updated result lock");
    Ok(result.rows_affected() > 0)
}

pub async fn set_release_date(
    pool: &PgPool,
    id: Uuid,
    release_at: Option<DateTime<Utc>>,
) -> anyhow::Result<bool> {
    let result =
        sqlx::query("UPDATE school_results.sessions SET result_release_date = $2 WHERE id = $1")
            .bind(id)
            .bind(release_at)
            .execute(pool)
            .await?;

    tracing::info!(session = %id, release_at = ?release_at, "updated result release date");
    Ok(result.rows_affected() > 0)
}

pub async fn fetch_pupil(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<PupilProfile>> {
    let row =
        sqlx::query("SELECT id, full_name, class_name FROM school_results.pupils WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    match row {
        Some(row) => Ok(Some(PupilProfile {
            id: row.try_get("id")?,
            full_name: row.try_get("full_name")?,
            class_name: row.try_get("class_name")?,
        })),
        None => Ok(None),
    }
}

/// Missing rows read as empty remarks.
pub async fn fetch_summary_remarks(
    pool: &PgPool,
    pupil_id: Uuid,
    session_id: Uuid,
    term: Term,
) -> anyhow::Result<SummaryRemarks> {
    let row = sqlx::query(
        r#"
        SELECT teacher_comment, principal_comment
        FROM school_results.result_summaries
        WHERE pupil_id = $1 AND session_id = $2 AND term = $3
        "#,
    )
    .bind(pupil_id)
    .bind(session_id)
    .bind(term.as_str())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(SummaryRemarks {
            teacher_comment: row.try_get("teacher_comment")?,
            principal_comment: row.try_get("principal_comment")?,
        }),
        None => Ok(SummaryRemarks::default()),
    }
}

pub async fn set_summary_remarks(
    pool: &PgPool,
    pupil_id: Uuid,
    session_id: Uuid,
    term: Term,
    remarks: &SummaryRemarks,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO school_results.result_summaries
        (pupil_id, session_id, term, teacher_comment, principal_comment)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (pupil_id, session_id, term) DO UPDATE
        SET teacher_comment = EXCLUDED.teacher_comment,
            principal_comment = EXCLUDED.principal_comment,
            updated_at = NOW()
        "#,
    )
    .bind(pupil_id)
    .bind(session_id)
    .bind(term.as_str())
    .bind(remarks.teacher_comment.as_deref())
    .bind(remarks.principal_comment.as_deref())
    .execute(pool)
    .await
    .context("failed to save summary comments")?;

    tracing::info!(
        pupil = %pupil_id,
        session = %session_id,
        term = %term,
        "updated summary comments"
    );
    Ok(())
}

pub async fn fetch_scores(
    pool: &PgPool,
    pupil_id: Uuid,
    session_id: Uuid,
    term: Term,
) -> anyhow::Result<Vec<ScoreEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT r.pupil_id, r.subject_id, r.session_id, r.term, r.test_score, r.exam_score,
               r.teacher_comment, sub.name AS subject_name
        FROM school_results.results r
        JOIN school_results.subjects sub ON sub.id = r.subject_id
        WHERE r.pupil_id = $1 AND r.session_id = $2 AND r.term = $3
        ORDER BY sub.name
        "#,
    )
    .bind(pupil_id)
    .bind(session_id)
    .bind(term.as_str())
    .fetch_all(pool)
    .await?;

    rows.iter().map(entry_from_row).collect()
}

pub async fn fetch_session_scores(
    pool: &PgPool,
    session_id: Uuid,
    term: Term,
) -> anyhow::Result<Vec<ScoreRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT r.pupil_id, r.subject_id, r.session_id, r.term, r.test_score, r.exam_score,
               r.teacher_comment, sub.name AS subject_name, p.full_name
        FROM school_results.results r
        JOIN school_results.subjects sub ON sub.id = r.subject_id
        JOIN school_results.pupils p ON p.id = r.pupil_id
        WHERE r.session_id = $1 AND r.term = $2
        "#,
    )
    .bind(session_id)
    .bind(term.as_str())
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows.iter() {
        records.push(ScoreRecord {
            pupil_name: row.try_get("full_name")?,
            entry: entry_from_row(row)?,
        });
    }
    Ok(records)
}

async fn resolve_ids(
    pool: &PgPool,
    username: &str,
    subject_code: &str,
    session_name: &str,
) -> anyhow::Result<Option<(Uuid, Uuid, Uuid)>> {
    let row = sqlx::query(
        r#"
        SELECT p.id AS pupil_id, sub.id AS subject_id, s.id AS session_id
        FROM school_results.pupils p, school_results.subjects sub, school_results.sessions s
        WHERE p.username = $1 AND sub.code = $2 AND s.name = $3
        "#,
    )
    .bind(username)
    .bind(subject_code)
    .bind(session_name)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some((
            row.try_get("pupil_id")?,
            row.try_get("subject_id")?,
            row.try_get("session_id")?,
        ))),
        None => Ok(None),
    }
}

async fn upsert_score(pool: &PgPool, entry: &ScoreEntry) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO school_results.results
        (id, pupil_id, subject_id, session_id, term, test_score, exam_score, teacher_comment)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (pupil_id, subject_id, session_id, term) DO UPDATE
        SET test_score = EXCLUDED.test_score,
            exam_score = EXCLUDED.exam_score,
            teacher_comment = EXCLUDED.teacher_comment,
            updated_at = NOW()
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(entry.pupil_id)
    .bind(entry.subject_id)
    .bind(entry.session_id)
    .bind(entry.term.as_str())
    .bind(entry.test_score)
    .bind(entry.exam_score)
    .bind(entry.teacher_comment.as_deref())
    .execute(pool)
    .await?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportOutcome {
    pub upserted: usize,
    pub rejected: Vec<RowError>,
}

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    username: String,
    subject_code: String,
    session: String,
    term: String,
    test_score: f64,
    exam_score: f64,
    teacher_comment: Option<String>,
}

/// Checks the fields that need no database lookup.
fn validate_row(row: &CsvRow) -> Result<Term, String> {
    let term = row.term.parse::<Term>().map_err(|err| err.to_string())?;
    check_score_ranges(row.test_score, row.exam_score).map_err(|err| err.to_string())?;
    Ok(term)
}

/// Upserts score rows keyed on (pupil, subject, session, term). Rows that
/// reference unknown records or carry out-of-range marks are skipped and
/// reported; a malformed CSV aborts the import.
pub async fn import_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<ImportOutcome> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut outcome = ImportOutcome::default();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        // Header is line 1.
        let line = index + 2;
        let row = result.with_context(|| format!("malformed CSV at line {line}"))?;

        let term = match validate_row(&row) {
            Ok(term) => term,
            Err(reason) => {
                outcome.rejected.push(RowError { line, reason });
                continue;
            }
        };

        let Some((pupil_id, subject_id, session_id)) =
            resolve_ids(pool, &row.username, &row.subject_code, &row.session).await?
        else {
            outcome.rejected.push(RowError {
                line,
                reason: format!(
                    "unknown pupil `{}`, subject `{}` or session `{}`",
                    row.username, row.subject_code, row.session
                ),
            });
            continue;
        };

        let entry = ScoreEntry {
            pupil_id,
            subject_id,
            session_id,
            term,
            test_score: row.test_score,
            exam_score: row.exam_score,
            subject_name: None,
            teacher_comment: row.teacher_comment.filter(|c| !c.trim().is_empty()),
        };

        upsert_score(pool, &entry).await?;
        outcome.upserted += 1;
    }

    for rejected in outcome.rejected.iter() {
        tracing::warn!(line = rejected.line, reason = %rejected.reason, "skipped score row");
    }
    tracing::info!(
        upserted = outcome.upserted,
        rejected = outcome.rejected.len(),
        "score import finished"
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_rows(body: &str) -> Vec<CsvRow> {
        csv::Reader::from_reader(body.as_bytes())
            .deserialize::<CsvRow>()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn rows_validate_without_lookups() {
        let rows = parse_rows(
            "username,subject_code,session,term,test_score,exam_score,teacher_comment\n\
             alee,MTH,2025/2026,Second,25,60,Good work\n\
             alee,ENG,2025/2026,second,31,60,\n\
             alee,BSC,2025/2026,second,20,70.5,\n\
             alee,BSC,2025/2026,fourth,20,50,\n",
        );

        assert_eq!(validate_row(&rows[0]), Ok(Term::Second));
        assert_eq!(
            validate_row(&rows[1]),
            Err("test score 31 must be between 0 and 30".to_string())
        );
        assert_eq!(
            validate_row(&rows[2]),
            Err("exam score 70.5 must be between 0 and 70".to_string())
        );
        assert!(validate_row(&rows[3]).unwrap_err().contains("unknown term"));
    }

    #[test]
    fn blank_comments_read_as_missing() {
        let rows = parse_rows(
            "username,subject_code,session,term,test_score,exam_score,teacher_comment\n\
             kpatel,MTH,2025/2026,first,28,66.5,\n",
        );
        assert!(rows[0].teacher_comment.is_none());
        assert_eq!(rows[0].exam_score, 66.5);
    }
}
