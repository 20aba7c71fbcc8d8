//! Read/write interface of the ranking engine and its SQLite implementation.
//!
//! # Responsibility
//! - Expose exactly the reads a category recompute needs.
//! - Persist one category's positions and overall rows as a single batch.
//!
//! # Invariants
//! - `apply_standings` is all-or-nothing: a failure leaves the previously
//!   committed standings of the category untouched.
//! - Batches never touch rows of another category.

use crate::model::athlete::{Athlete, AthleteId, Category, CategoryId};
use crate::model::discipline::Discipline;
use crate::model::result::{DisciplineResult, OverallResult};
use crate::repo::athlete_repo::{
    AthleteRepository, RepoError, RepoResult, SqliteAthleteRepository,
};
use crate::repo::parse_uuid;
use crate::repo::result_repo::{ResultRepository, SqliteResultRepository};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::collections::{BTreeMap, HashMap};

/// New discipline rank for one athlete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionUpdate {
    pub athlete_id: AthleteId,
    pub discipline: Discipline,
    pub position: u32,
}

/// Everything one category recompute writes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StandingsBatch {
    pub category_id: CategoryId,
    /// Only positions that differ from the stored value.
    pub positions: Vec<PositionUpdate>,
    /// One row per athlete of the category.
    pub overall: Vec<OverallResult>,
}

impl StandingsBatch {
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() && self.overall.is_empty()
    }
}

/// Storage collaborator seen by the ranking engine.
pub trait StandingsRepository {
    fn get_category(&self, id: CategoryId) -> RepoResult<Option<Category>>;
    /// Category members sorted by surname, then first name.
    fn athletes_in_category(&self, id: CategoryId) -> RepoResult<Vec<Athlete>>;
    fn results_for(
        &self,
        discipline: Discipline,
        athlete_ids: &[AthleteId],
    ) -> RepoResult<Vec<DisciplineResult>>;
    fn categories_for_athlete(&self, athlete_id: AthleteId) -> RepoResult<Vec<CategoryId>>;
    fn stored_positions(
        &self,
        category_id: CategoryId,
        discipline: Discipline,
    ) -> RepoResult<HashMap<AthleteId, u32>>;
    /// Writes positions and overall rows of one category atomically.
    fn apply_standings(&self, batch: &StandingsBatch) -> RepoResult<()>;
    /// Overall rows ordered by final position, then total.
    fn list_overall(&self, category_id: CategoryId) -> RepoResult<Vec<OverallResult>>;
}

/// SQLite-backed standings repository.
pub struct SqliteStandingsRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStandingsRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn roster(&self) -> SqliteAthleteRepository<'conn> {
        SqliteAthleteRepository::new(self.conn)
    }
}

impl StandingsRepository for SqliteStandingsRepository<'_> {
    fn get_category(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        self.roster().get_category(id)
    }

    fn athletes_in_category(&self, id: CategoryId) -> RepoResult<Vec<Athlete>> {
        self.roster().list_athletes_in_category(id)
    }

    fn results_for(
        &self,
        discipline: Discipline,
        athlete_ids: &[AthleteId],
    ) -> RepoResult<Vec<DisciplineResult>> {
        SqliteResultRepository::new(self.conn).list_results(discipline, athlete_ids)
    }

    fn categories_for_athlete(&self, athlete_id: AthleteId) -> RepoResult<Vec<CategoryId>> {
        self.roster().categories_for_athlete(athlete_id)
    }

    fn stored_positions(
        &self,
        category_id: CategoryId,
        discipline: Discipline,
    ) -> RepoResult<HashMap<AthleteId, u32>> {
        let mut stmt = self.conn.prepare(
            "SELECT athlete_uuid, position
             FROM discipline_positions
             WHERE category_uuid = ?1 AND discipline = ?2;",
        )?;
        let mut rows = stmt.query(params![category_id.to_string(), discipline.code()])?;
        let mut positions = HashMap::new();
        while let Some(row) = rows.next()? {
            let athlete_text: String = row.get(0)?;
            let position = to_position(row.get(1)?, "discipline_positions.position")?;
            positions.insert(
                parse_uuid(&athlete_text, "discipline_positions.athlete_uuid")?,
                position,
            );
        }
        Ok(positions)
    }

    fn apply_standings(&self, batch: &StandingsBatch) -> RepoResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        if let Some(row) = batch
            .overall
            .iter()
            .find(|row| row.category_id != batch.category_id)
        {
            return Err(RepoError::InvalidData(format!(
                "overall row for category {} in batch for category {}",
                row.category_id, batch.category_id
            )));
        }

        let category = batch.category_id.to_string();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        {
            let mut position_stmt = tx.prepare(
                "INSERT INTO discipline_positions (category_uuid, discipline, athlete_uuid, position)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (category_uuid, discipline, athlete_uuid)
                 DO UPDATE SET position = excluded.position;",
            )?;
            for update in &batch.positions {
                position_stmt.execute(params![
                    category.as_str(),
                    update.discipline.code(),
                    update.athlete_id.to_string(),
                    i64::from(update.position),
                ])?;
            }

            let mut overall_stmt = tx.prepare(&overall_upsert_sql())?;
            for row in &batch.overall {
                overall_stmt.execute(params_from_iter(overall_bind_values(row)))?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn list_overall(&self, category_id: CategoryId) -> RepoResult<Vec<OverallResult>> {
        let points_columns = Discipline::ALL
            .iter()
            .map(|discipline| discipline.points_column())
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT
                category_uuid,
                athlete_uuid,
                {points_columns},
                tiebreak_points,
                total_points,
                final_position
             FROM overall_results
             WHERE category_uuid = ?1
             ORDER BY final_position ASC, total_points ASC, athlete_uuid ASC;"
        ))?;
        let mut rows = stmt.query([category_id.to_string()])?;
        let mut overall = Vec::new();
        while let Some(row) = rows.next()? {
            overall.push(parse_overall_row(row)?);
        }
        Ok(overall)
    }
}

fn overall_upsert_sql() -> String {
    let points_columns: Vec<&str> = Discipline::ALL
        .iter()
        .map(|discipline| discipline.points_column())
        .collect();
    let column_count = points_columns.len() + 5;
    let binds = (1..=column_count)
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");
    let updates = points_columns
        .iter()
        .chain(["tiebreak_points", "total_points", "final_position"].iter())
        .map(|column| format!("{column} = excluded.{column}"))
        .collect::<Vec<_>>()
        .join(",\n                ");

    format!(
        "INSERT INTO overall_results (
            category_uuid,
            athlete_uuid,
            {},
            tiebreak_points,
            total_points,
            final_position
        ) VALUES ({binds})
        ON CONFLICT (category_uuid, athlete_uuid) DO UPDATE SET
                {updates},
                updated_at = (strftime('%s', 'now') * 1000);",
        points_columns.join(", ")
    )
}

fn overall_bind_values(row: &OverallResult) -> Vec<Value> {
    let mut values = Vec::with_capacity(Discipline::ALL.len() + 5);
    values.push(Value::Text(row.category_id.to_string()));
    values.push(Value::Text(row.athlete_id.to_string()));
    for discipline in Discipline::ALL {
        values.push(match row.points.get(&discipline) {
            Some(points) => Value::Real(*points),
            None => Value::Null,
        });
    }
    values.push(Value::Real(row.tiebreak_points));
    values.push(Value::Real(row.total_points));
    values.push(Value::Integer(i64::from(row.final_position)));
    values
}

fn parse_overall_row(row: &Row<'_>) -> RepoResult<OverallResult> {
    let category_text: String = row.get("category_uuid")?;
    let athlete_text: String = row.get("athlete_uuid")?;

    let mut points = BTreeMap::new();
    for discipline in Discipline::ALL {
        let value: Option<f64> = row.get(discipline.points_column())?;
        if let Some(value) = value {
            points.insert(discipline, value);
        }
    }

    Ok(OverallResult {
        category_id: parse_uuid(&category_text, "overall_results.category_uuid")?,
        athlete_id: parse_uuid(&athlete_text, "overall_results.athlete_uuid")?,
        points,
        tiebreak_points: row.get("tiebreak_points")?,
        total_points: row.get("total_points")?,
        final_position: to_position(row.get("final_position")?, "overall_results.final_position")?,
    })
}

fn to_position(value: i64, column: &str) -> RepoResult<u32> {
    u32::try_from(value)
        .ok()
        .filter(|position| *position >= 1)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid position `{value}` in {column}")))
}
