//! Selection against a real SQLite obslog.

use gmosrs::query::select;
use gmosrs::{
    compile, Category, Field, FieldType, FrameRecord, InMemoryStore, MetadataStore, PipelineConfig,
    SqliteConfig, SqliteStore, Value,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;

// File, use_me, ObsType, ObsClass, RoI, Object, DateObs
type Row = (&'static str, i64, &'static str, &'static str, &'static str, &'static str, &'static str);

const ROWS: &[Row] = &[
    ("S20070623S0001", 1, "BIAS", "dayCal", "Full", "Bias", "2007-06-23"),
    ("S20070623S0002", 1, "BIAS", "dayCal", "Full", "Bias", "2007-08-01"),
    ("S20070623S0072", 1, "OBJECT", "science", "Full", "AM2306-721_a", "2007-06-23"),
    ("S20070623S0082", 1, "OBJECT", "science", "Full", "AM2306-72_b", "2007-06-23"),
    ("S20070623S0083", 0, "OBJECT", "science", "Full", "AM2306-72_b", "2007-06-23"),
    ("S20070623S0110", 1, "OBJECT", "science", "Full", "LTT9239", "2007-06-23"),
];

fn create_obslog(path: &Path, rows: &[Row]) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();

        sqlx::query(
            "CREATE TABLE obslog (
                File TEXT PRIMARY KEY, use_me INTEGER, Instrument TEXT, ObsType TEXT,
                ObsClass TEXT, CcdBin TEXT, RoI TEXT, Disperser TEXT, CentWave REAL,
                AperMask TEXT, Object TEXT, DateObs TEXT, Texp REAL
            )",
        )
        .execute(&pool)
        .await
        .unwrap();

        for (file, use_me, obs_type, obs_class, roi, object, date) in rows {
            sqlx::query(
                "INSERT INTO obslog VALUES (?, ?, 'GMOS-S', ?, ?, '2 4', ?, 'B600+_G5323', 485.0, '1.0arcsec', ?, ?, 900.0)",
            )
            .bind(*file)
            .bind(*use_me)
            .bind(*obs_type)
            .bind(*obs_class)
            .bind(*roi)
            .bind(*object)
            .bind(*date)
            .execute(&pool)
            .await
            .unwrap();
        }
        pool.close().await;
    });
}

fn open_store(dir: &tempfile::TempDir) -> SqliteStore {
    open_store_with(dir, ROWS)
}

fn open_store_with(dir: &tempfile::TempDir, rows: &[Row]) -> SqliteStore {
    let path = dir.path().join("obsLog.sqlite3");
    create_obslog(&path, rows);
    SqliteStore::open(SqliteConfig {
        worker_count: 1,
        ..SqliteConfig::with_path(path)
    })
    .unwrap()
}

#[test]
fn test_science_pattern_selection() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let regions = PipelineConfig::default().regions().unwrap();

    let query = compile(Category::SciSpec, regions.get("Full").unwrap()).unwrap();
    let frames = select(&store, &query).unwrap();

    let ids: Vec<&str> = frames.iter().map(|f| f.as_str()).collect();
    assert_eq!(ids, vec!["S20070623S0072", "S20070623S0082"]);
}

#[test]
fn test_bias_date_window_and_decoding() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let regions = PipelineConfig::default().regions().unwrap();

    let query = compile(Category::Bias, regions.get("Full").unwrap()).unwrap();
    let records = store.query(&query).unwrap();

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.id.as_str(), "S20070623S0001");
    assert_eq!(record.get(Field::UseMe), Some(&Value::Flag(true)));
    assert_eq!(record.get(Field::CentWave), Some(&Value::Real(485.0)));
    assert_eq!(
        record.get(Field::DateObs),
        Value::parse_as(FieldType::Date, "2007-06-23").as_ref()
    );
}

#[test]
fn test_relaxed_date_selects_all_biases() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let regions = PipelineConfig::default()
        .regions()
        .unwrap()
        .relaxed(Field::DateObs);

    let query = compile(Category::Bias, regions.get("Full").unwrap()).unwrap();
    assert_eq!(select(&store, &query).unwrap().len(), 2);
}

#[test]
fn test_timestamp_on_closing_day_is_inside_window() {
    let rows: &[Row] = &[
        ("S20070707S0001", 1, "BIAS", "dayCal", "Full", "Bias", "2007-07-07T05:00:00"),
        ("S20070708S0001", 1, "BIAS", "dayCal", "Full", "Bias", "2007-07-08T01:00:00"),
    ];
    let dir = tempfile::tempdir().unwrap();
    let sqlite = open_store_with(&dir, rows);
    let regions = PipelineConfig::default().regions().unwrap();
    let query = compile(Category::Bias, regions.get("Full").unwrap()).unwrap();

    let from_sqlite = select(&sqlite, &query).unwrap();
    let ids: Vec<&str> = from_sqlite.iter().map(|f| f.as_str()).collect();
    assert_eq!(ids, vec!["S20070707S0001"]);

    // The in-memory store agrees when given the same decoded rows.
    let relaxed = regions.relaxed(Field::DateObs);
    let everything = compile(Category::Bias, relaxed.get("Full").unwrap()).unwrap();
    let records: Vec<FrameRecord> = sqlite.query(&everything).unwrap();
    assert_eq!(records.len(), 2);
    let memory = InMemoryStore::from_records(records);
    assert_eq!(select(&memory, &query).unwrap(), from_sqlite);
}
