#![cfg(feature = "sqlite")]

use std::collections::BTreeSet;

use quarry::test_utils::MockDatabase;
use quarry_demo::{UserQuery, print_banners, run_queries};

const EXPECTED_ROWS: [&str; 2] = ["1 \"andrej\"", "2 \"silver\""];

#[tokio::test]
async fn every_variant_prints_the_same_rows() {
    let db = MockDatabase::with_users().await.unwrap();
    let mut out = Vec::new();
    run_queries(db.manager(), &UserQuery::default(), &mut out)
        .await
        .unwrap();

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 6);

    let expected: BTreeSet<&str> = EXPECTED_ROWS.into_iter().collect();
    for variant in lines.chunks(2) {
        let rows: BTreeSet<&str> = variant.iter().copied().collect();
        assert_eq!(rows, expected);
    }
}

#[tokio::test]
async fn running_twice_prints_identical_rows() {
    let db = MockDatabase::with_users().await.unwrap();
    let query = UserQuery::default();

    let mut first = Vec::new();
    run_queries(db.manager(), &query, &mut first).await.unwrap();
    let mut second = Vec::new();
    run_queries(db.manager(), &query, &mut second).await.unwrap();

    let first = String::from_utf8(first).unwrap();
    let second = String::from_utf8(second).unwrap();
    let first: Vec<&str> = first.lines().collect();
    let second: Vec<&str> = second.lines().collect();
    assert_eq!(first.len(), 6);
    assert_eq!(second.len(), first.len());

    let expected: BTreeSet<&str> = EXPECTED_ROWS.into_iter().collect();
    for (a, b) in first.chunks(2).zip(second.chunks(2)) {
        let a: BTreeSet<&str> = a.iter().copied().collect();
        let b: BTreeSet<&str> = b.iter().copied().collect();
        assert_eq!(a, b);
        assert_eq!(a, expected);
    }
}

#[tokio::test]
async fn missing_table_is_an_error() {
    let db = MockDatabase::new_sqlite().await.unwrap();
    let mut out = Vec::new();
    let result = run_queries(db.manager(), &UserQuery::default(), &mut out).await;
    assert!(result.is_err());
    assert!(out.is_empty());
}

#[test]
fn banners_are_two_lines_and_a_blank() {
    let mut out = Vec::new();
    print_banners(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.split('\n').collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("sqlx "));
    assert!(lines[1].starts_with("quarry "));
    assert!(lines[2].is_empty());
    assert!(lines[3].is_empty());
}
