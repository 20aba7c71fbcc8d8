//! Athlete/category repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide roster CRUD over `athletes`, `categories` and memberships.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `validate()` before SQL mutations.
//! - Category discipline codes are replaced as a whole, keeping their order.
//! - Withdrawing an athlete drops that category's standings rows for them.

use crate::db::DbError;
use crate::model::athlete::{Athlete, AthleteId, AthleteValidationError, Category, CategoryId};
use crate::model::discipline::Discipline;
use crate::model::result::ResultValidationError;
use crate::repo::{bool_to_int, int_to_bool, parse_uuid};
use rusqlite::{params, Connection, ErrorCode, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ATHLETE_SELECT_SQL: &str = "SELECT
    a.uuid AS uuid,
    a.first_name AS first_name,
    a.surname AS surname,
    a.body_weight AS body_weight,
    a.club AS club,
    a.tiebreak AS tiebreak
FROM athletes a";

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for roster, result and standings storage.
#[derive(Debug)]
pub enum RepoError {
    Validation(AthleteValidationError),
    ResultValidation(ResultValidationError),
    Db(DbError),
    NotFound { entity: &'static str, id: Uuid },
    DuplicateCategoryName(String),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ResultValidation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::DuplicateCategoryName(name) => {
                write!(f, "category name already exists: `{name}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::ResultValidation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } | Self::DuplicateCategoryName(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<AthleteValidationError> for RepoError {
    fn from(value: AthleteValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ResultValidationError> for RepoError {
    fn from(value: ResultValidationError) -> Self {
        Self::ResultValidation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for roster operations.
pub trait AthleteRepository {
    fn create_athlete(&self, athlete: &Athlete) -> RepoResult<AthleteId>;
    fn update_athlete(&self, athlete: &Athlete) -> RepoResult<()>;
    fn get_athlete(&self, id: AthleteId) -> RepoResult<Option<Athlete>>;
    /// Members of a category sorted by surname, then first name.
    fn list_athletes_in_category(&self, category_id: CategoryId) -> RepoResult<Vec<Athlete>>;
    fn create_category(&self, category: &Category) -> RepoResult<CategoryId>;
    fn get_category(&self, id: CategoryId) -> RepoResult<Option<Category>>;
    /// Case-insensitive exact match on the category name.
    fn find_category_by_name(&self, name: &str) -> RepoResult<Option<Category>>;
    fn list_categories(&self) -> RepoResult<Vec<Category>>;
    /// Replaces the full ordered discipline list of a category.
    ///
    /// Positions of disciplines no longer listed are removed. A category left
    /// without known disciplines also loses its overall rows.
    fn set_category_disciplines(&self, id: CategoryId, codes: &[String]) -> RepoResult<()>;
    /// Returns `true` when the membership was newly created.
    fn enroll(&self, athlete_id: AthleteId, category_id: CategoryId) -> RepoResult<bool>;
    /// Returns `true` when a membership was removed.
    fn withdraw(&self, athlete_id: AthleteId, category_id: CategoryId) -> RepoResult<bool>;
    fn categories_for_athlete(&self, athlete_id: AthleteId) -> RepoResult<Vec<CategoryId>>;
}

/// SQLite-backed roster repository.
pub struct SqliteAthleteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAthleteRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AthleteRepository for SqliteAthleteRepository<'_> {
    fn create_athlete(&self, athlete: &Athlete) -> RepoResult<AthleteId> {
        athlete.validate()?;

        self.conn.execute(
            "INSERT INTO athletes (
                uuid,
                first_name,
                surname,
                body_weight,
                club,
                tiebreak
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                athlete.uuid.to_string(),
                athlete.first_name.trim(),
                athlete.surname.trim(),
                athlete.body_weight,
                athlete.club.as_deref(),
                bool_to_int(athlete.tiebreak),
            ],
        )?;

        Ok(athlete.uuid)
    }

    fn update_athlete(&self, athlete: &Athlete) -> RepoResult<()> {
        athlete.validate()?;

        let changed = self.conn.execute(
            "UPDATE athletes
             SET
                first_name = ?1,
                surname = ?2,
                body_weight = ?3,
                club = ?4,
                tiebreak = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?6;",
            params![
                athlete.first_name.trim(),
                athlete.surname.trim(),
                athlete.body_weight,
                athlete.club.as_deref(),
                bool_to_int(athlete.tiebreak),
                athlete.uuid.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "athlete",
                id: athlete.uuid,
            });
        }

        Ok(())
    }

    fn get_athlete(&self, id: AthleteId) -> RepoResult<Option<Athlete>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ATHLETE_SELECT_SQL} WHERE a.uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_athlete_row(row)?));
        }
        Ok(None)
    }

    fn list_athletes_in_category(&self, category_id: CategoryId) -> RepoResult<Vec<Athlete>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ATHLETE_SELECT_SQL}
             INNER JOIN athlete_categories ac ON ac.athlete_uuid = a.uuid
             WHERE ac.category_uuid = ?1
             ORDER BY a.surname ASC, a.first_name ASC, a.uuid ASC;"
        ))?;
        let mut rows = stmt.query([category_id.to_string()])?;
        let mut athletes = Vec::new();
        while let Some(row) = rows.next()? {
            athletes.push(parse_athlete_row(row)?);
        }
        Ok(athletes)
    }

    fn create_category(&self, category: &Category) -> RepoResult<CategoryId> {
        category.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let inserted = tx.execute(
            "INSERT INTO categories (uuid, name) VALUES (?1, ?2);",
            params![category.uuid.to_string(), category.name.trim()],
        );
        if let Err(err) = inserted {
            return Err(map_category_insert_error(err, category.name.trim()));
        }
        replace_disciplines_in_tx(&tx, category.uuid, &category.disciplines)?;
        tx.commit()?;

        Ok(category.uuid)
    }

    fn get_category(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        let name: Option<String> = {
            let mut stmt = self
                .conn
                .prepare("SELECT name FROM categories WHERE uuid = ?1;")?;
            let mut rows = stmt.query([id.to_string()])?;
            match rows.next()? {
                Some(row) => Some(row.get(0)?),
                None => None,
            }
        };

        match name {
            Some(name) => Ok(Some(Category {
                uuid: id,
                name,
                disciplines: load_discipline_codes(self.conn, id)?,
            })),
            None => Ok(None),
        }
    }

    fn find_category_by_name(&self, name: &str) -> RepoResult<Option<Category>> {
        let uuid_text: Option<String> = {
            let mut stmt = self
                .conn
                .prepare("SELECT uuid FROM categories WHERE name = ?1 COLLATE NOCASE;")?;
            let mut rows = stmt.query([name.trim()])?;
            match rows.next()? {
                Some(row) => Some(row.get(0)?),
                None => None,
            }
        };

        match uuid_text {
            Some(text) => self.get_category(parse_uuid(&text, "categories.uuid")?),
            None => Ok(None),
        }
    }

    fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let ids = {
            let mut stmt = self
                .conn
                .prepare("SELECT uuid FROM categories ORDER BY name COLLATE NOCASE ASC;")?;
            let mut rows = stmt.query([])?;
            let mut ids = Vec::new();
            while let Some(row) = rows.next()? {
                let text: String = row.get(0)?;
                ids.push(parse_uuid(&text, "categories.uuid")?);
            }
            ids
        };

        let mut categories = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(category) = self.get_category(id)? {
                categories.push(category);
            }
        }
        Ok(categories)
    }

    fn set_category_disciplines(&self, id: CategoryId, codes: &[String]) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let exists: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE uuid = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::NotFound {
                entity: "category",
                id,
            });
        }
        replace_disciplines_in_tx(&tx, id, codes)?;
        tx.execute(
            "DELETE FROM discipline_positions
             WHERE category_uuid = ?1
               AND discipline NOT IN (
                   SELECT discipline FROM category_disciplines WHERE category_uuid = ?1
               );",
            [id.to_string()],
        )?;
        if codes.iter().all(|code| Discipline::from_code(code).is_none()) {
            tx.execute(
                "DELETE FROM overall_results WHERE category_uuid = ?1;",
                [id.to_string()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn enroll(&self, athlete_id: AthleteId, category_id: CategoryId) -> RepoResult<bool> {
        ensure_exists(self.conn, "athletes", "athlete", athlete_id)?;
        ensure_exists(self.conn, "categories", "category", category_id)?;

        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO athlete_categories (athlete_uuid, category_uuid)
             VALUES (?1, ?2);",
            params![athlete_id.to_string(), category_id.to_string()],
        )?;
        Ok(inserted == 1)
    }

    fn withdraw(&self, athlete_id: AthleteId, category_id: CategoryId) -> RepoResult<bool> {
        let athlete = athlete_id.to_string();
        let category = category_id.to_string();

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let removed = tx.execute(
            "DELETE FROM athlete_categories WHERE athlete_uuid = ?1 AND category_uuid = ?2;",
            params![athlete, category],
        )?;
        tx.execute(
            "DELETE FROM discipline_positions WHERE athlete_uuid = ?1 AND category_uuid = ?2;",
            params![athlete, category],
        )?;
        tx.execute(
            "DELETE FROM overall_results WHERE athlete_uuid = ?1 AND category_uuid = ?2;",
            params![athlete, category],
        )?;
        tx.commit()?;

        Ok(removed == 1)
    }

    fn categories_for_athlete(&self, athlete_id: AthleteId) -> RepoResult<Vec<CategoryId>> {
        let mut stmt = self.conn.prepare(
            "SELECT ac.category_uuid
             FROM athlete_categories ac
             INNER JOIN categories c ON c.uuid = ac.category_uuid
             WHERE ac.athlete_uuid = ?1
             ORDER BY c.name COLLATE NOCASE ASC;",
        )?;
        let mut rows = stmt.query([athlete_id.to_string()])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let text: String = row.get(0)?;
            ids.push(parse_uuid(&text, "athlete_categories.category_uuid")?);
        }
        Ok(ids)
    }
}

pub(crate) fn parse_athlete_row(row: &Row<'_>) -> RepoResult<Athlete> {
    let uuid_text: String = row.get("uuid")?;
    let tiebreak = int_to_bool(row.get("tiebreak")?, "athletes.tiebreak")?;

    Ok(Athlete {
        uuid: parse_uuid(&uuid_text, "athletes.uuid")?,
        first_name: row.get("first_name")?,
        surname: row.get("surname")?,
        body_weight: row.get("body_weight")?,
        club: row.get("club")?,
        tiebreak,
    })
}

fn load_discipline_codes(conn: &Connection, category_id: CategoryId) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT discipline
         FROM category_disciplines
         WHERE category_uuid = ?1
         ORDER BY ordinal ASC;",
    )?;
    let mut rows = stmt.query([category_id.to_string()])?;
    let mut codes = Vec::new();
    while let Some(row) = rows.next()? {
        codes.push(row.get(0)?);
    }
    Ok(codes)
}

fn replace_disciplines_in_tx(
    tx: &Transaction<'_>,
    category_id: CategoryId,
    codes: &[String],
) -> RepoResult<()> {
    let category = category_id.to_string();
    tx.execute(
        "DELETE FROM category_disciplines WHERE category_uuid = ?1;",
        [category.as_str()],
    )?;
    for (ordinal, code) in codes.iter().enumerate() {
        tx.execute(
            "INSERT OR IGNORE INTO category_disciplines (category_uuid, discipline, ordinal)
             VALUES (?1, ?2, ?3);",
            params![category.as_str(), code.as_str(), ordinal as i64],
        )?;
    }
    Ok(())
}

fn ensure_exists(
    conn: &Connection,
    table: &'static str,
    entity: &'static str,
    id: Uuid,
) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE uuid = ?1);"),
        [id.to_string()],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(RepoError::NotFound { entity, id });
    }
    Ok(())
}

fn map_category_insert_error(err: rusqlite::Error, name: &str) -> RepoError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            RepoError::DuplicateCategoryName(name.to_string())
        }
        _ => err.into(),
    }
}
