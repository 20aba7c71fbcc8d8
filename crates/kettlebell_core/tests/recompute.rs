use kettlebell_core::db::open_db_in_memory;
use kettlebell_core::{
    Athlete, AthleteId, AthleteRepository, Category, CategoryId, Discipline, DisciplineResult,
    OverallResult, RawAttempts, RecomputeService, RepoError, RepoResult, ResultRepository,
    ResultService, SqliteAthleteRepository, SqliteResultRepository, SqliteStandingsRepository,
    StandingsBatch, StandingsRepository,
};
use rusqlite::{params, Connection};
use std::collections::HashMap;

fn snatch(athlete: &Athlete, weight: f64, repetitions: i64) -> DisciplineResult {
    DisciplineResult::new(
        athlete.uuid,
        Discipline::Snatch,
        RawAttempts::LoadReps {
            weight: Some(weight),
            repetitions: Some(repetitions),
        },
    )
    .unwrap()
}

fn single_limb(athlete: &Athlete, discipline: Discipline, best: f64) -> DisciplineResult {
    DisciplineResult::new(
        athlete.uuid,
        discipline,
        RawAttempts::SingleLimb {
            results: [Some(best / 2.0), Some(best), None],
        },
    )
    .unwrap()
}

fn seed_category(conn: &Connection, name: &str, disciplines: &[Discipline]) -> Category {
    let category = Category::new(name, disciplines);
    SqliteAthleteRepository::new(conn)
        .create_category(&category)
        .unwrap();
    category
}

fn seed_athlete(conn: &Connection, athlete: Athlete, categories: &[&Category]) -> Athlete {
    let repo = SqliteAthleteRepository::new(conn);
    repo.create_athlete(&athlete).unwrap();
    for category in categories {
        repo.enroll(athlete.uuid, category.uuid).unwrap();
    }
    athlete
}

fn result_service(
    conn: &Connection,
) -> ResultService<SqliteResultRepository<'_>, SqliteStandingsRepository<'_>> {
    ResultService::new(
        SqliteResultRepository::new(conn),
        SqliteStandingsRepository::new(conn),
    )
}

fn overall_by_athlete(conn: &Connection, category: &Category) -> HashMap<AthleteId, OverallResult> {
    SqliteStandingsRepository::new(conn)
        .list_overall(category.uuid)
        .unwrap()
        .into_iter()
        .map(|row| (row.athlete_id, row))
        .collect()
}

fn positions(
    conn: &Connection,
    category: &Category,
    discipline: Discipline,
) -> HashMap<AthleteId, u32> {
    SqliteStandingsRepository::new(conn)
        .stored_positions(category.uuid, discipline)
        .unwrap()
}

#[test]
fn snatch_only_category_end_to_end() {
    let conn = open_db_in_memory().unwrap();
    let category = seed_category(&conn, "Open", &[Discipline::Snatch]);
    let a = seed_athlete(&conn, Athlete::new("Adam", "Adamski").weighing(80.0), &[&category]);
    let b = seed_athlete(&conn, Athlete::new("Bart", "Bartos").weighing(70.0), &[&category]);
    let c = seed_athlete(&conn, Athlete::new("Cezary", "Cichy").weighing(90.0), &[&category]);

    let service = result_service(&conn);
    service.save_result(&snatch(&a, 32.0, 10)).unwrap();
    service.save_result(&snatch(&b, 24.0, 15)).unwrap();
    let report = service.save_result(&snatch(&c, 32.0, 10)).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.recomputed.len(), 1);

    let ranks = positions(&conn, &category, Discipline::Snatch);
    assert_eq!(ranks[&b.uuid], 1);
    assert_eq!(ranks[&a.uuid], 2);
    assert_eq!(ranks[&c.uuid], 2);

    let overall = overall_by_athlete(&conn, &category);
    assert_eq!(overall[&b.uuid].total_points, 1.0);
    assert_eq!(overall[&b.uuid].final_position, 1);
    assert_eq!(overall[&a.uuid].final_position, 2);
    assert_eq!(overall[&c.uuid].final_position, 2);
    assert_eq!(overall[&a.uuid].total_points, overall[&c.uuid].total_points);
}

#[test]
fn totals_sum_ranks_and_apply_tiebreak() {
    let conn = open_db_in_memory().unwrap();
    let category = seed_category(&conn, "Women", &[Discipline::Snatch, Discipline::Tgu]);
    let mut anna = Athlete::new("Anna", "Nowak").weighing(60.0);
    anna.tiebreak = true;
    let anna = seed_athlete(&conn, anna, &[&category]);
    let beata = seed_athlete(&conn, Athlete::new("Beata", "Wrona").weighing(60.0), &[&category]);

    let service = result_service(&conn);
    service.save_result(&snatch(&anna, 16.0, 50)).unwrap();
    service.save_result(&snatch(&beata, 16.0, 60)).unwrap();
    service
        .save_result(&single_limb(&anna, Discipline::Tgu, 32.0))
        .unwrap();
    service
        .save_result(&single_limb(&beata, Discipline::Tgu, 24.0))
        .unwrap();

    let overall = overall_by_athlete(&conn, &category);
    let anna_row = &overall[&anna.uuid];
    assert_eq!(anna_row.points[&Discipline::Snatch], 2.0);
    assert_eq!(anna_row.points[&Discipline::Tgu], 1.0);
    assert_eq!(anna_row.tiebreak_points, -0.5);
    assert_eq!(anna_row.total_points, 2.5);

    let beata_row = &overall[&beata.uuid];
    assert_eq!(beata_row.tiebreak_points, 0.0);
    assert_eq!(beata_row.total_points, 3.0);

    assert_eq!(anna_row.final_position, 1);
    assert_eq!(beata_row.final_position, 2);
}

#[test]
fn disabled_disciplines_never_contribute_points() {
    let conn = open_db_in_memory().unwrap();
    let category = seed_category(&conn, "Snatch only", &[Discipline::Snatch]);
    let athlete = seed_athlete(&conn, Athlete::new("Olga", "Lis").weighing(55.0), &[&category]);

    let service = result_service(&conn);
    service
        .save_result(&single_limb(&athlete, Discipline::Tgu, 20.0))
        .unwrap();
    service.save_result(&snatch(&athlete, 12.0, 100)).unwrap();

    let overall = overall_by_athlete(&conn, &category);
    let row = &overall[&athlete.uuid];
    assert_eq!(row.points.len(), 1);
    assert_eq!(row.points[&Discipline::Snatch], 1.0);
    assert!(positions(&conn, &category, Discipline::Tgu).is_empty());
}

#[test]
fn body_weight_relative_disciplines_rank_on_ratio() {
    let conn = open_db_in_memory().unwrap();
    let category = seed_category(&conn, "Pistols", &[Discipline::PistolSquat]);
    let heavy = seed_athlete(&conn, Athlete::new("Heavy", "Ham").weighing(100.0), &[&category]);
    let light = seed_athlete(&conn, Athlete::new("Light", "Lee").weighing(50.0), &[&category]);
    let unweighed = seed_athlete(&conn, Athlete::new("Nobody", "Nil"), &[&category]);

    let service = result_service(&conn);
    service
        .save_result(&single_limb(&heavy, Discipline::PistolSquat, 40.0))
        .unwrap();
    service
        .save_result(&single_limb(&light, Discipline::PistolSquat, 24.0))
        .unwrap();
    service
        .save_result(&single_limb(&unweighed, Discipline::PistolSquat, 48.0))
        .unwrap();

    let ranks = positions(&conn, &category, Discipline::PistolSquat);
    assert_eq!(ranks[&light.uuid], 1);
    assert_eq!(ranks[&heavy.uuid], 2);
    assert_eq!(ranks[&unweighed.uuid], 3);
}

#[test]
fn one_sided_two_limb_lift_scores_zero() {
    let conn = open_db_in_memory().unwrap();
    let category = seed_category(&conn, "Press", &[Discipline::SeeSawPress]);
    let lopsided = seed_athlete(&conn, Athlete::new("Left", "Only").weighing(70.0), &[&category]);
    let balanced = seed_athlete(&conn, Athlete::new("Both", "Sides").weighing(70.0), &[&category]);

    let service = result_service(&conn);
    service
        .record(
            lopsided.uuid,
            Discipline::SeeSawPress,
            RawAttempts::TwoLimb {
                left: [Some(50.0), None, None],
                right: [Some(0.0), None, None],
            },
        )
        .unwrap();
    service
        .record(
            balanced.uuid,
            Discipline::SeeSawPress,
            RawAttempts::TwoLimb {
                left: [Some(12.0), Some(14.0), None],
                right: [Some(12.0), Some(0.0), None],
            },
        )
        .unwrap();

    let ranks = positions(&conn, &category, Discipline::SeeSawPress);
    assert_eq!(ranks[&balanced.uuid], 1);
    assert_eq!(ranks[&lopsided.uuid], 2);
}

#[test]
fn athletes_without_results_are_ranked_but_not_published() {
    let conn = open_db_in_memory().unwrap();
    let category = seed_category(&conn, "Open", &[Discipline::Snatch]);
    let lifter = seed_athlete(&conn, Athlete::new("Lifter", "Zed").weighing(80.0), &[&category]);
    let absent = seed_athlete(&conn, Athlete::new("Absent", "Abe").weighing(80.0), &[&category]);

    result_service(&conn)
        .save_result(&snatch(&lifter, 24.0, 10))
        .unwrap();

    let ranks = positions(&conn, &category, Discipline::Snatch);
    assert_eq!(ranks.len(), 1);
    assert_eq!(ranks[&lifter.uuid], 1);

    let overall = overall_by_athlete(&conn, &category);
    assert!(overall[&absent.uuid].points.is_empty());
    assert_eq!(overall[&absent.uuid].total_points, 0.0);
}

#[test]
fn all_zero_scores_share_first_place() {
    let conn = open_db_in_memory().unwrap();
    let category = seed_category(&conn, "Zeros", &[Discipline::Tgu]);
    let first = seed_athlete(&conn, Athlete::new("First", "Alpha").weighing(60.0), &[&category]);
    let second = seed_athlete(&conn, Athlete::new("Second", "Beta").weighing(60.0), &[&category]);

    let service = result_service(&conn);
    for athlete in [&first, &second] {
        service
            .save_result(&DisciplineResult::zeroed(athlete.uuid, Discipline::Tgu))
            .unwrap();
    }

    let ranks = positions(&conn, &category, Discipline::Tgu);
    assert_eq!(ranks[&first.uuid], 1);
    assert_eq!(ranks[&second.uuid], 1);
}

#[test]
fn recompute_is_idempotent_and_writes_no_unchanged_positions() {
    let conn = open_db_in_memory().unwrap();
    let category = seed_category(&conn, "Open", &[Discipline::Snatch, Discipline::Tgu]);
    let a = seed_athlete(&conn, Athlete::new("Adam", "Adamski").weighing(80.0), &[&category]);
    let b = seed_athlete(&conn, Athlete::new("Bart", "Bartos").weighing(70.0), &[&category]);

    let service = result_service(&conn);
    service.save_result(&snatch(&a, 24.0, 20)).unwrap();
    service.save_result(&snatch(&b, 24.0, 30)).unwrap();
    service
        .save_result(&single_limb(&a, Discipline::Tgu, 32.0))
        .unwrap();

    let before = SqliteStandingsRepository::new(&conn)
        .list_overall(category.uuid)
        .unwrap();

    let engine = RecomputeService::new(SqliteStandingsRepository::new(&conn));
    let outcome = engine.recompute_category(category.uuid).unwrap();
    assert_eq!(outcome.positions_written, 0);
    assert_eq!(outcome.athlete_count, 2);
    assert_eq!(outcome.disciplines, vec![Discipline::Snatch, Discipline::Tgu]);

    let after = SqliteStandingsRepository::new(&conn)
        .list_overall(category.uuid)
        .unwrap();
    assert_eq!(before, after);
}

#[test]
fn only_moved_athletes_get_new_positions_written() {
    let conn = open_db_in_memory().unwrap();
    let category = seed_category(&conn, "Open", &[Discipline::Snatch]);
    let a = seed_athlete(&conn, Athlete::new("Adam", "Adamski").weighing(80.0), &[&category]);
    let b = seed_athlete(&conn, Athlete::new("Bart", "Bartos").weighing(70.0), &[&category]);
    let c = seed_athlete(&conn, Athlete::new("Cezary", "Cichy").weighing(90.0), &[&category]);

    let service = result_service(&conn);
    service.save_result(&snatch(&a, 24.0, 10)).unwrap();
    service.save_result(&snatch(&b, 24.0, 20)).unwrap();
    service.save_result(&snatch(&c, 24.0, 30)).unwrap();

    let ranks = positions(&conn, &category, Discipline::Snatch);
    assert_eq!((ranks[&c.uuid], ranks[&b.uuid], ranks[&a.uuid]), (1, 2, 3));

    let report = service.save_result(&snatch(&a, 24.0, 25)).unwrap();
    assert_eq!(report.recomputed.len(), 1);
    assert_eq!(report.recomputed[0].positions_written, 2);

    let ranks = positions(&conn, &category, Discipline::Snatch);
    assert_eq!((ranks[&c.uuid], ranks[&a.uuid], ranks[&b.uuid]), (1, 2, 3));
}

#[test]
fn recompute_in_one_category_leaves_other_categories_untouched() {
    let conn = open_db_in_memory().unwrap();
    let juniors = seed_category(&conn, "Juniors", &[Discipline::Snatch]);
    let seniors = seed_category(&conn, "Seniors", &[Discipline::Snatch]);
    let shared = seed_athlete(
        &conn,
        Athlete::new("Shared", "Star").weighing(75.0),
        &[&juniors, &seniors],
    );
    let junior = seed_athlete(&conn, Athlete::new("Young", "Yan").weighing(60.0), &[&juniors]);
    let senior = seed_athlete(&conn, Athlete::new("Old", "Oak").weighing(90.0), &[&seniors]);

    let service = result_service(&conn);
    service.save_result(&snatch(&junior, 16.0, 40)).unwrap();
    service.save_result(&snatch(&senior, 24.0, 40)).unwrap();
    let report = service.save_result(&snatch(&shared, 20.0, 40)).unwrap();
    assert_eq!(report.recomputed.len(), 2);

    let junior_ranks = positions(&conn, &juniors, Discipline::Snatch);
    let senior_ranks = positions(&conn, &seniors, Discipline::Snatch);
    assert_eq!(junior_ranks[&shared.uuid], 1);
    assert_eq!(senior_ranks[&shared.uuid], 2);
    assert!(!junior_ranks.contains_key(&senior.uuid));
    assert!(!senior_ranks.contains_key(&junior.uuid));

    let seniors_before = overall_by_athlete(&conn, &seniors);
    service.save_result(&snatch(&junior, 24.0, 100)).unwrap();
    assert_eq!(overall_by_athlete(&conn, &seniors), seniors_before);
    assert_eq!(
        positions(&conn, &juniors, Discipline::Snatch)[&junior.uuid],
        1
    );
}

#[test]
fn unknown_discipline_codes_are_skipped() {
    let conn = open_db_in_memory().unwrap();
    let category = seed_category(&conn, "Legacy", &[Discipline::Snatch]);
    conn.execute(
        "INSERT INTO category_disciplines (category_uuid, discipline, ordinal) VALUES (?1, 'bench_press', 5);",
        params![category.uuid.to_string()],
    )
    .unwrap();
    let athlete = seed_athlete(&conn, Athlete::new("Ivan", "Iwanow").weighing(85.0), &[&category]);

    result_service(&conn)
        .save_result(&snatch(&athlete, 24.0, 50))
        .unwrap();

    let outcome = RecomputeService::new(SqliteStandingsRepository::new(&conn))
        .recompute_category(category.uuid)
        .unwrap();
    assert_eq!(outcome.disciplines, vec![Discipline::Snatch]);
    assert_eq!(overall_by_athlete(&conn, &category)[&athlete.uuid].final_position, 1);
}

#[test]
fn category_without_disciplines_or_athletes_is_a_no_op() {
    let conn = open_db_in_memory().unwrap();
    let empty = seed_category(&conn, "Empty", &[Discipline::Snatch]);
    let bare = seed_category(&conn, "Bare", &[]);
    let athlete = seed_athlete(&conn, Athlete::new("Solo", "Sam").weighing(70.0), &[&bare]);

    let engine = RecomputeService::new(SqliteStandingsRepository::new(&conn));
    let outcome = engine.recompute_category(empty.uuid).unwrap();
    assert_eq!(outcome.athlete_count, 0);
    assert!(outcome.disciplines.is_empty());

    let report = result_service(&conn)
        .save_result(&snatch(&athlete, 16.0, 10))
        .unwrap();
    assert!(report.is_clean());
    assert!(overall_by_athlete(&conn, &bare).is_empty());
}

#[test]
fn saving_for_athlete_without_categories_skips_recompute() {
    let conn = open_db_in_memory().unwrap();
    let loner = seed_athlete(&conn, Athlete::new("Lone", "Wolf").weighing(70.0), &[]);

    let report = result_service(&conn)
        .save_result(&snatch(&loner, 16.0, 10))
        .unwrap();
    assert!(report.recomputed.is_empty());
    assert!(report.failed.is_empty());
}

#[test]
fn saving_result_for_unknown_athlete_fails() {
    let conn = open_db_in_memory().unwrap();
    let ghost = Athlete::new("Ghost", "Rider");

    let err = result_service(&conn)
        .save_result(&snatch(&ghost, 16.0, 10))
        .unwrap_err();
    assert!(matches!(
        err,
        kettlebell_core::ResultServiceError::AthleteNotFound(id) if id == ghost.uuid
    ));
}

#[test]
fn mismatched_attempt_shape_is_rejected_before_storage() {
    let conn = open_db_in_memory().unwrap();
    let athlete = seed_athlete(&conn, Athlete::new("Shape", "Shifter").weighing(70.0), &[]);

    let err = result_service(&conn)
        .save_result(&DisciplineResult {
            athlete_id: athlete.uuid,
            discipline: Discipline::KbSquat,
            attempts: RawAttempts::TwoLimb {
                left: [Some(40.0), None, None],
                right: [Some(40.0), None, None],
            },
        })
        .unwrap_err();
    assert!(matches!(
        err,
        kettlebell_core::ResultServiceError::InvalidResult(_)
    ));
    assert!(SqliteResultRepository::new(&conn)
        .list_results(Discipline::KbSquat, &[athlete.uuid])
        .unwrap()
        .is_empty());
}

/// Delegates to SQLite but refuses to write one category.
struct FailingStandings<'conn> {
    inner: SqliteStandingsRepository<'conn>,
    broken: CategoryId,
}

impl StandingsRepository for FailingStandings<'_> {
    fn get_category(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        self.inner.get_category(id)
    }

    fn athletes_in_category(&self, id: CategoryId) -> RepoResult<Vec<Athlete>> {
        self.inner.athletes_in_category(id)
    }

    fn results_for(
        &self,
        discipline: Discipline,
        athlete_ids: &[AthleteId],
    ) -> RepoResult<Vec<DisciplineResult>> {
        self.inner.results_for(discipline, athlete_ids)
    }

    fn categories_for_athlete(&self, athlete_id: AthleteId) -> RepoResult<Vec<CategoryId>> {
        self.inner.categories_for_athlete(athlete_id)
    }

    fn stored_positions(
        &self,
        category_id: CategoryId,
        discipline: Discipline,
    ) -> RepoResult<HashMap<AthleteId, u32>> {
        self.inner.stored_positions(category_id, discipline)
    }

    fn apply_standings(&self, batch: &StandingsBatch) -> RepoResult<()> {
        if batch.category_id == self.broken {
            return Err(RepoError::InvalidData("simulated write failure".to_string()));
        }
        self.inner.apply_standings(batch)
    }

    fn list_overall(&self, category_id: CategoryId) -> RepoResult<Vec<OverallResult>> {
        self.inner.list_overall(category_id)
    }
}

#[test]
fn failing_category_is_reported_and_others_still_recompute() {
    let conn = open_db_in_memory().unwrap();
    let broken = seed_category(&conn, "Broken", &[Discipline::Snatch]);
    let healthy = seed_category(&conn, "Healthy", &[Discipline::Snatch]);
    let athlete = seed_athlete(
        &conn,
        Athlete::new("Both", "Places").weighing(70.0),
        &[&broken, &healthy],
    );

    let service = ResultService::new(
        SqliteResultRepository::new(&conn),
        FailingStandings {
            inner: SqliteStandingsRepository::new(&conn),
            broken: broken.uuid,
        },
    );
    let report = service.save_result(&snatch(&athlete, 20.0, 10)).unwrap();

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].category_id, broken.uuid);
    assert_eq!(report.recomputed.len(), 1);
    assert_eq!(report.recomputed[0].category_id, healthy.uuid);

    assert!(overall_by_athlete(&conn, &broken).is_empty());
    assert_eq!(overall_by_athlete(&conn, &healthy)[&athlete.uuid].final_position, 1);
    assert!(service
        .get_result(athlete.uuid, Discipline::Snatch)
        .unwrap()
        .is_some());
}

#[test]
fn failed_batch_rolls_back_every_row_of_the_category() {
    let conn = open_db_in_memory().unwrap();
    let category = seed_category(&conn, "Atomic", &[Discipline::Snatch]);
    let a = seed_athlete(&conn, Athlete::new("Adam", "Adamski").weighing(80.0), &[&category]);
    let b = seed_athlete(&conn, Athlete::new("Bart", "Bartos").weighing(70.0), &[&category]);
    let service = result_service(&conn);
    service.save_result(&snatch(&a, 24.0, 10)).unwrap();
    service.save_result(&snatch(&b, 24.0, 20)).unwrap();
    let committed = overall_by_athlete(&conn, &category);

    let repo = SqliteStandingsRepository::new(&conn);
    let mut bad_row = committed[&a.uuid].clone();
    bad_row.final_position = 7;
    let mut foreign_row = committed[&b.uuid].clone();
    foreign_row.category_id = uuid::Uuid::new_v4();
    let batch = StandingsBatch {
        category_id: category.uuid,
        positions: Vec::new(),
        overall: vec![bad_row, foreign_row],
    };
    assert!(repo.apply_standings(&batch).is_err());
    assert_eq!(overall_by_athlete(&conn, &category), committed);

    let mut zero_position = committed[&a.uuid].clone();
    zero_position.final_position = 0;
    let mut moved = committed[&b.uuid].clone();
    moved.final_position = 9;
    let batch = StandingsBatch {
        category_id: category.uuid,
        positions: Vec::new(),
        overall: vec![moved, zero_position],
    };
    assert!(repo.apply_standings(&batch).is_err());
    assert_eq!(overall_by_athlete(&conn, &category), committed);
}
