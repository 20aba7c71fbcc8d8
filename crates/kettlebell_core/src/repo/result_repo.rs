//! Raw discipline result repository and SQLite implementation.
//!
//! # Responsibility
//! - Upsert and read the single result row per (athlete, discipline).
//! - Map each discipline's canonical shape onto the shared column set.
//!
//! # Invariants
//! - Writes reject rows whose attempt shape does not match the discipline.
//! - Columns that do not belong to a discipline's shape are stored as NULL.
//! - Reads tolerate out-of-range attempt values; formulas clamp them to 0.

use crate::model::athlete::AthleteId;
use crate::model::discipline::{Discipline, DisciplineShape};
use crate::model::result::{DisciplineResult, RawAttempts};
use crate::repo::athlete_repo::{RepoError, RepoResult};
use crate::repo::{parse_uuid, placeholders};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const RESULT_SELECT_SQL: &str = "SELECT
    athlete_uuid,
    discipline,
    weight,
    repetitions,
    result_1,
    result_2,
    result_3,
    left_1,
    right_1,
    left_2,
    right_2,
    left_3,
    right_3
FROM discipline_results";

/// Repository interface for raw result rows.
pub trait ResultRepository {
    /// Inserts or fully replaces the row for `(athlete, discipline)`.
    fn upsert_result(&self, result: &DisciplineResult) -> RepoResult<()>;
    /// Inserts a zeroed row unless one exists. Returns `true` when inserted.
    fn insert_default_if_absent(
        &self,
        athlete_id: AthleteId,
        discipline: Discipline,
    ) -> RepoResult<bool>;
    fn get_result(
        &self,
        athlete_id: AthleteId,
        discipline: Discipline,
    ) -> RepoResult<Option<DisciplineResult>>;
    /// Rows of one discipline for the given athletes. Athletes without a row
    /// are simply absent from the output.
    fn list_results(
        &self,
        discipline: Discipline,
        athlete_ids: &[AthleteId],
    ) -> RepoResult<Vec<DisciplineResult>>;
}

/// SQLite-backed result repository.
pub struct SqliteResultRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteResultRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ResultRepository for SqliteResultRepository<'_> {
    fn upsert_result(&self, result: &DisciplineResult) -> RepoResult<()> {
        result.validate()?;

        let columns = ResultColumns::from_attempts(&result.attempts);
        let inserted = self.conn.execute(
            "INSERT INTO discipline_results (
                athlete_uuid,
                discipline,
                weight,
                repetitions,
                result_1,
                result_2,
                result_3,
                left_1,
                right_1,
                left_2,
                right_2,
                left_3,
                right_3
            )
            SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13
            WHERE EXISTS (SELECT 1 FROM athletes WHERE uuid = ?1)
            ON CONFLICT (athlete_uuid, discipline) DO UPDATE SET
                weight = excluded.weight,
                repetitions = excluded.repetitions,
                result_1 = excluded.result_1,
                result_2 = excluded.result_2,
                result_3 = excluded.result_3,
                left_1 = excluded.left_1,
                right_1 = excluded.right_1,
                left_2 = excluded.left_2,
                right_2 = excluded.right_2,
                left_3 = excluded.left_3,
                right_3 = excluded.right_3,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                result.athlete_id.to_string(),
                result.discipline.code(),
                columns.weight,
                columns.repetitions,
                columns.results[0],
                columns.results[1],
                columns.results[2],
                columns.left[0],
                columns.right[0],
                columns.left[1],
                columns.right[1],
                columns.left[2],
                columns.right[2],
            ],
        )?;

        if inserted == 0 {
            return Err(RepoError::NotFound {
                entity: "athlete",
                id: result.athlete_id,
            });
        }
        Ok(())
    }

    fn insert_default_if_absent(
        &self,
        athlete_id: AthleteId,
        discipline: Discipline,
    ) -> RepoResult<bool> {
        if self.get_result(athlete_id, discipline)?.is_some() {
            return Ok(false);
        }
        self.upsert_result(&DisciplineResult::zeroed(athlete_id, discipline))?;
        Ok(true)
    }

    fn get_result(
        &self,
        athlete_id: AthleteId,
        discipline: Discipline,
    ) -> RepoResult<Option<DisciplineResult>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RESULT_SELECT_SQL}
             WHERE athlete_uuid = ?1 AND discipline = ?2;"
        ))?;
        let mut rows = stmt.query(params![athlete_id.to_string(), discipline.code()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_result_row(row, discipline)?));
        }
        Ok(None)
    }

    fn list_results(
        &self,
        discipline: Discipline,
        athlete_ids: &[AthleteId],
    ) -> RepoResult<Vec<DisciplineResult>> {
        if athlete_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "{RESULT_SELECT_SQL}
             WHERE discipline = ? AND athlete_uuid IN ({})
             ORDER BY athlete_uuid ASC;",
            placeholders(athlete_ids.len())
        );
        let mut bind_values = Vec::with_capacity(athlete_ids.len() + 1);
        bind_values.push(Value::Text(discipline.code().to_string()));
        bind_values.extend(athlete_ids.iter().map(|id| Value::Text(id.to_string())));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            results.push(parse_result_row(row, discipline)?);
        }
        Ok(results)
    }
}

/// Flat column projection of `RawAttempts`.
#[derive(Debug, Default)]
struct ResultColumns {
    weight: Option<f64>,
    repetitions: Option<i64>,
    results: [Option<f64>; 3],
    left: [Option<f64>; 3],
    right: [Option<f64>; 3],
}

impl ResultColumns {
    fn from_attempts(attempts: &RawAttempts) -> Self {
        match attempts {
            RawAttempts::LoadReps {
                weight,
                repetitions,
            } => Self {
                weight: *weight,
                repetitions: *repetitions,
                ..Self::default()
            },
            RawAttempts::SingleLimb { results } => Self {
                results: *results,
                ..Self::default()
            },
            RawAttempts::TwoLimb { left, right } => Self {
                left: *left,
                right: *right,
                ..Self::default()
            },
        }
    }
}

fn parse_result_row(row: &Row<'_>, discipline: Discipline) -> RepoResult<DisciplineResult> {
    let athlete_text: String = row.get("athlete_uuid")?;
    let code: String = row.get("discipline")?;
    if Discipline::from_code(&code) != Some(discipline) {
        return Err(RepoError::InvalidData(format!(
            "expected discipline `{discipline}` in discipline_results.discipline, got `{code}`"
        )));
    }

    let attempts = match discipline.shape() {
        DisciplineShape::LoadReps => RawAttempts::LoadReps {
            weight: row.get("weight")?,
            repetitions: row.get("repetitions")?,
        },
        DisciplineShape::SingleLimb => RawAttempts::SingleLimb {
            results: [row.get("result_1")?, row.get("result_2")?, row.get("result_3")?],
        },
        DisciplineShape::TwoLimb => RawAttempts::TwoLimb {
            left: [row.get("left_1")?, row.get("left_2")?, row.get("left_3")?],
            right: [row.get("right_1")?, row.get("right_2")?, row.get("right_3")?],
        },
    };

    Ok(DisciplineResult {
        athlete_id: parse_uuid(&athlete_text, "discipline_results.athlete_uuid")?,
        discipline,
        attempts,
    })
}
