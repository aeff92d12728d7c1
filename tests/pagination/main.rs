//! Partitioning, paginated reads and config loading

#[macro_use]
#[path = "../common/mod.rs"]
mod common;

use common::*;
use myelin::{normalize, partition, Condition, MAX_PAGE_SIZE};

fn ranks(records: &[Record]) -> Vec<i64> {
    records
        .iter()
        .filter_map(|r| r.get("rank").and_then(Value::as_i64))
        .collect()
}

// ============================================================================
// Partitioning
// ============================================================================

#[test]
fn zero_records_cannot_be_partitioned() {
    let c = TestCollection::new();
    let err = c.partition_records(&Query::new()).unwrap_err();
    assert!(matches!(err.root(), Error::ZeroCount));
    assert_eq!(err.notes(), vec!["cannot partition document"]);
}

#[test]
fn few_records_fit_one_page() {
    let c = TestCollection::new();
    c.people(4);

    let layout = c.partition_records(&Query::new()).unwrap();
    assert_eq!((layout.count, layout.page_size, layout.page_count), (4, 4, 1));
}

#[test]
fn many_records_use_square_root_pages() {
    let layout = partition(400, 5).unwrap();
    assert_eq!(layout.page_size, 20);
    assert_eq!(layout.page_count, 20);

    let huge = partition(1_000_000, 5).unwrap();
    assert_eq!(huge.page_size, MAX_PAGE_SIZE);

    let pages: Vec<_> = partition(30, 5).unwrap().pages().collect();
    assert_eq!(pages.len(), 6);
    assert!(pages.iter().all(|p| p.count == Some(30)));
}

#[test]
fn normalize_collapses_small_counts() {
    let page = normalize(Pagination::new(3, 10), 4);
    assert_eq!((page.index, page.size, page.count), (0, 4, Some(4)));

    let page = normalize(Pagination::new(3, 10), 40);
    assert_eq!((page.index, page.size), (3, 10));
}

// ============================================================================
// Reads
// ============================================================================

#[test]
fn list_pages_through_records_in_insert_order() {
    let c = TestCollection::new();
    c.people(12);

    let first = c.list(&Query::new(), Pagination::new(0, 5)).unwrap();
    let third = c.list(&Query::new(), Pagination::new(2, 5)).unwrap();
    assert_eq!(ranks(&first), vec![0, 1, 2, 3, 4]);
    assert_eq!(ranks(&third), vec![10, 11]);
}

#[test]
fn zero_size_uses_configured_page_size() {
    let c = TestCollection::with_config(
        EntityConfig::named("user").with_salt("s").with_page_size(3),
    );
    c.people(7);

    let page = c.list(&Query::new(), Pagination::new(0, 0)).unwrap();
    assert_eq!(page.len(), 3);
}

#[test]
fn page_past_the_end_falls_back_to_first() {
    let c = TestCollection::new();
    c.people(8);

    let page = c.list(&Query::new(), Pagination::new(9, 5)).unwrap();
    assert_eq!(ranks(&page), vec![0, 1, 2, 3, 4]);
}

#[test]
fn empty_reads_are_not_found() {
    let c = TestCollection::new();
    let err = c.list(&Query::new(), Pagination::default()).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.notes(), vec!["failed listing document"]);
    assert!(c.all().unwrap_err().is_not_found());
}

#[test]
fn search_requires_conditions() {
    let c = TestCollection::new();
    c.people(3);

    assert_root!(
        c.search(&Query::new(), Pagination::default()),
        Error::EmptyQuery
    );
    let found = c
        .search(&Query::new().eq("name", "p1"), Pagination::default())
        .unwrap();
    assert_eq!(ranks(&found), vec![1]);
}

#[test]
fn sort_requires_keys_and_orders_records() {
    let c = TestCollection::new();
    c.people(6);

    assert_root!(
        c.sort(&Query::new(), Pagination::default()),
        Error::EmptySort
    );

    let page = c
        .sort(
            &Query::new(),
            Pagination::new(0, 4).sorted(Sort::descending("rank")),
        )
        .unwrap();
    assert_eq!(ranks(&page), vec![5, 4, 3, 2]);
}

#[test]
fn query_records_returns_every_match_in_scope() {
    let c = TestCollection::new();
    let people = c.people(9);
    c.disable(&Query::by_reference(people[0].reference().unwrap()))
        .unwrap();

    assert_eq!(c.query_records(&Query::new()).unwrap().len(), 8);
    assert_eq!(
        c.query_records(&Query::new().with_status(Status::Disabled))
            .unwrap()
            .len(),
        1
    );
    assert_eq!(c.all().unwrap().len(), 9);
}

#[test]
fn count_conditions() {
    let c = TestCollection::new();
    c.people(3);
    let everyone = Query::new();

    assert!(c.test(&everyone).unwrap());
    assert!(c.check(&everyone, Condition::Exactly(3)).unwrap());
    assert!(c.check(&everyone, Condition::AtMost(5)).unwrap());
    assert!(!c.check(&everyone, Condition::AtLeast(4)).unwrap());
    assert!(!c.test(&Query::new().eq("name", "nobody")).unwrap());
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn default_config_file_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("entity.toml");

    EntityConfig::write_default_if_missing(&path).unwrap();
    let config = EntityConfig::from_file(&path).unwrap();
    assert_eq!(config, EntityConfig::default());
    assert!(config.salt.is_none());
}

#[test]
fn written_config_binds_a_collection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("user.toml");
    EntityConfig::named("user")
        .with_salt("file-salt")
        .with_page_size(2)
        .write_to_file(&path)
        .unwrap();

    let config = EntityConfig::from_file(&path).unwrap();
    let c = TestCollection::with_config(config);
    assert_eq!(c.salt(), "file-salt");
    c.people(5);
    assert_eq!(c.list(&Query::new(), Pagination::new(0, 0)).unwrap().len(), 2);
}

#[test]
fn invalid_config_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "name = \"a/b\"\n").unwrap();

    assert_root!(EntityConfig::from_file(&path), Error::Config(_));
    assert_root!(
        EntityConfig::from_file(&dir.path().join("missing.toml")),
        Error::Config(_)
    );
}
