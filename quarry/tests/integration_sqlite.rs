#![cfg(feature = "sqlite")]

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use quarry::prelude::*;
use quarry::test_utils::{MockDatabase, seed_users};
use quarry::{ConnectionConfig, Driver};
use quarry::sqlx::Sqlite;

#[derive(Model, Debug, Clone, PartialEq)]
struct User {
    id: u64,
    name: String,
}

#[derive(Model, Debug, Clone, PartialEq)]
#[quarry(table = "users")]
struct UserSummary {
    id: u64,
    #[quarry(default)]
    name: String,
    #[quarry(default)]
    nickname: Option<String>,
    #[quarry(ignore)]
    visits: u32,
}

#[derive(Model, Debug)]
#[quarry(table = "users")]
struct Member {
    id: u64,
    #[quarry(sensitive)]
    name: String,
}

fn collect_cursor(mut cursor: Cursor) -> QuarryResult<BTreeSet<(u64, String)>> {
    let mut rows = BTreeSet::new();
    while cursor.advance() {
        rows.insert((cursor.get::<u64, _>("id")?, cursor.get::<String, _>("name")?));
    }
    Ok(rows)
}

fn expected() -> BTreeSet<(u64, String)> {
    [(1, "andrej".to_owned()), (2, "silver".to_owned())]
        .into_iter()
        .collect()
}

#[tokio::test]
async fn three_variants_return_the_same_rows() {
    let db = MockDatabase::with_users().await.unwrap();
    let manager = db.manager();

    let unprepared = manager
        .unprepared("select id, name from users where id < 3")
        .await
        .unwrap();
    assert_eq!(collect_cursor(unprepared).unwrap(), expected());

    let prepared = manager
        .select("select id, name from users where id < ?", vec![3.into()])
        .await
        .unwrap();
    assert_eq!(collect_cursor(prepared).unwrap(), expected());

    let users = User::query(manager)
        .filter_lt("id", 3)
        .get(&["id", "name"])
        .await
        .unwrap();
    let orm: BTreeSet<_> = users.into_iter().map(|u| (u.id, u.name)).collect();
    assert_eq!(orm, expected());
}

#[tokio::test]
async fn queries_are_repeatable() {
    let db = MockDatabase::with_users().await.unwrap();
    let manager = db.manager();

    let first = collect_cursor(
        manager
            .select("select id, name from users where id < ?", vec![3.into()])
            .await
            .unwrap(),
    )
    .unwrap();
    let second = collect_cursor(
        manager
            .select("select id, name from users where id < ?", vec![3.into()])
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn builder_renders_quoted_select() {
    let db = MockDatabase::new_sqlite().await.unwrap();
    let qb = User::query(db.manager())
        .filter_lt("id", 3)
        .select(&["id", "name"]);
    assert_eq!(qb.to_sql(), "SELECT `id`, `name` FROM `users` WHERE `id` < ?");
    assert_eq!(qb.bindings(), vec![Value::I64(3)]);
    assert_eq!(User::list_columns(), &["id", "name"]);
}

#[tokio::test]
async fn builder_filters_against_real_rows() {
    let db = MockDatabase::with_users().await.unwrap();
    let manager = db.manager();

    let found = User::query(manager)
        .filter_in("name", ["silver", "third"])
        .order_by("id", Direction::Desc)
        .all()
        .await
        .unwrap();
    assert_eq!(
        found.iter().map(|u| u.id).collect::<Vec<_>>(),
        vec![3, 2]
    );

    let none = User::query(manager)
        .filter_in("id", Vec::<i64>::new())
        .all()
        .await
        .unwrap();
    assert!(none.is_empty());

    let first = User::query(manager)
        .filter_like("name", "s%")
        .first()
        .await
        .unwrap();
    assert_eq!(first.map(|u| u.name), Some("silver".to_owned()));

    let page = User::query(manager)
        .order_by("id", Direction::Asc)
        .offset(1)
        .limit(1)
        .all()
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, 2);

    let missing = User::query(manager).filter_eq("id", 42).first().await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn partial_projection_uses_defaults() {
    let db = MockDatabase::with_users().await.unwrap();
    let rows = UserSummary::query(db.manager())
        .filter_eq("id", 1)
        .get(&["id"])
        .await
        .unwrap();
    assert_eq!(
        rows,
        vec![UserSummary {
            id: 1,
            name: String::new(),
            nickname: None,
            visits: 0,
        }]
    );
}

#[tokio::test]
async fn partial_projection_without_default_is_an_error() {
    let db = MockDatabase::with_users().await.unwrap();
    let err = User::query(db.manager())
        .get(&["id"])
        .await
        .unwrap_err();
    assert!(matches!(err, QuarryError::MissingColumn(ref c) if c == "name"));
}

#[tokio::test]
async fn wrong_type_read_is_a_type_mismatch() {
    let db = MockDatabase::with_users().await.unwrap();
    let mut cursor = db
        .manager()
        .unprepared("select id, name from users where id = 1")
        .await
        .unwrap();
    assert!(cursor.advance());
    let err = cursor.get::<u64, _>("name").unwrap_err();
    assert!(err.is_type_mismatch());
    assert!(!cursor.advance());
    assert!(!cursor.advance());
}

#[tokio::test]
async fn empty_result_has_no_rows() {
    let db = MockDatabase::with_users().await.unwrap();
    let mut cursor = db
        .manager()
        .select("select id, name from users where id < ?", vec![0.into()])
        .await
        .unwrap();
    assert_eq!(cursor.size(), 0);
    assert!(!cursor.advance());
}

#[tokio::test]
async fn malformed_sql_surfaces_as_driver_error() {
    let db = MockDatabase::new_sqlite().await.unwrap();
    let err = db.manager().unprepared("selec nothing").await.unwrap_err();
    assert!(matches!(err, QuarryError::Sqlx(_)));
}

#[tokio::test]
async fn table_prefix_applies_to_model_queries() {
    let config = ConnectionConfig::new(Driver::Sqlite).prefix("app_");
    let db = MockDatabase::<Sqlite>::with_config(config).await.unwrap();
    seed_users(db.manager()).await.unwrap();

    let qb = User::query(db.manager()).filter_lt("id", 3);
    assert!(qb.to_sql().contains("FROM `app_users`"));
    assert_eq!(qb.all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn manager_rejects_mismatched_driver() {
    let err = DatabaseManager::<Sqlite>::create(ConnectionConfig::new(Driver::MySql))
        .await
        .unwrap_err();
    assert!(matches!(err, QuarryError::Config(_)));
}

#[tokio::test]
async fn manager_reports_connection_details() {
    let db = MockDatabase::new_sqlite().await.unwrap();
    let manager = db.manager();
    assert_eq!(manager.connection_name(), quarry::DEFAULT_CONNECTION_NAME);
    assert!(manager.server_version().is_some_and(|v| v.starts_with('3')));
    assert_eq!(manager.config().driver, Driver::Sqlite);
}

#[tokio::test]
async fn query_log_names_connection_and_hides_sensitive_values() {
    struct TestWriter(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for TestWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let db = MockDatabase::with_users().await.unwrap();

    let buffer = Arc::new(Mutex::new(Vec::new()));
    let make_writer = {
        let buffer = buffer.clone();
        move || TestWriter(buffer.clone())
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(make_writer)
        .with_ansi(false)
        .without_time()
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    db.manager()
        .unprepared("select id, name from users where id < 3")
        .await
        .unwrap();
    let members = Member::query(db.manager())
        .filter_eq("name", "silver")
        .all()
        .await
        .unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].id, 2);
    assert_eq!(members[0].name, "silver");

    let logs = String::from_utf8(buffer.lock().expect("lock").clone()).expect("utf8");
    assert!(logs.contains("Executed unprepared query ("));
    assert!(logs.contains(
        "2 results, quarry_default) : select id, name from users where id < 3"
    ));
    assert!(logs.contains(
        "1 results, quarry_default) : SELECT * FROM `users` WHERE `name` = ?"
    ));
    assert!(logs.contains("name = ***"));
    assert!(!logs.contains("silver"));
}
