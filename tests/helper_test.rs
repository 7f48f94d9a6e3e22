//! Helper operations against a scripted session: generated statements, paging,
//! slow-query reporting, post-commit callbacks and join folding

mod common;

use common::*;
use dbhelper::prelude::*;
use dbhelper::store_object::{PostCommitHook, SessionError, TransactionScope};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ========================================
// CRUD
// ========================================

#[tokio::test]
async fn test_insert_writes_back_generated_key() {
    let helper = DbHelper::new(RecordingSession::new().rows(vec![Row::new().with("id", 42i64)]));

    let mut student = Student::named("wu");
    student.age = Some(18);
    let key = helper.insert(&mut student).await.unwrap();

    assert_eq!(key, SqlValue::Int(42));
    assert_eq!(student.id, Some(42));

    let calls = helper.session().calls();
    assert_eq!(
        calls[0].sql,
        "INSERT INTO t_student (name, age, deleted) VALUES ($1, $2, $3) RETURNING id"
    );
    assert_eq!(calls[0].params, params!["wu", 18, false]);
}

#[tokio::test]
async fn test_get_all_maps_rows() {
    let with_address = Row::new()
        .with("id", 2i64)
        .with("name", "li")
        .with("age", 12)
        .with("school_id", SqlValue::Null)
        .with("address", r#"{"city":"Hangzhou","zip":"310000"}"#)
        .with("created_at", "2024-03-01 08:30:00")
        .with("deleted", false);
    let session = RecordingSession::new().rows(vec![student_row(1, "wu"), with_address]);
    let helper = DbHelper::new(session);

    let students = helper
        .get_all::<Student>(QueryBuilder::raw("where name = ? or age > ?", params!["wu", 18]))
        .await
        .unwrap();

    assert_eq!(students.len(), 2);
    assert_eq!(students[0].address, None);
    assert_eq!(
        students[1].address,
        Some(Address {
            city: "Hangzhou".into(),
            zip: "310000".into()
        })
    );
    assert_eq!(students[1].age, Some(12));
    assert_eq!(
        students[1].created_at.map(|at| at.to_rfc3339()),
        Some("2024-03-01T08:30:00+00:00".to_string())
    );
    assert_eq!(students[1].rank, None);

    let calls = helper.session().calls();
    assert_eq!(
        calls[0].sql,
        format!(
            "SELECT {} FROM t_student WHERE (name = $1 or age > $2) AND deleted = false",
            STUDENT_COLUMNS
        )
    );
}

#[tokio::test]
async fn test_get_by_key_and_count() {
    let session = RecordingSession::new()
        .rows(vec![student_row(7, "wu")])
        .rows(vec![count_row(3)]);
    let helper = DbHelper::new(session);

    let student = helper.get_by_key::<Student>(7).await.unwrap().unwrap();
    assert_eq!(student.id, Some(7));

    let count = helper
        .get_count::<Student>(QueryBuilder::raw("where age > ?", params![18]))
        .await
        .unwrap();
    assert_eq!(count, 3);

    let calls = helper.session().calls();
    assert_eq!(
        calls[0].sql,
        format!("SELECT {} FROM t_student WHERE id = $1 AND deleted = false", STUDENT_COLUMNS)
    );
    assert_eq!(
        calls[1].sql,
        "SELECT COUNT(*) AS total FROM t_student WHERE age > $1 AND deleted = false"
    );
}

#[tokio::test]
async fn test_update_skips_null_and_readonly_columns() {
    let helper = DbHelper::new(RecordingSession::new().affected(1));

    let mut student = Student::named("wu");
    student.id = Some(5);
    student.created_at = Some(Utc::now());
    assert_eq!(helper.update(&student).await.unwrap(), 1);

    let calls = helper.session().calls();
    assert_eq!(
        calls[0].sql,
        "UPDATE t_student SET name = $1 WHERE id = $2 AND deleted = false"
    );
    assert_eq!(calls[0].params, params!["wu", 5i64]);
}

#[tokio::test]
async fn test_update_where_applies_operations() {
    let helper = DbHelper::new(RecordingSession::new().affected(4));

    let updated = helper
        .update_where::<Student>(
            UpdateSet::new().increment("age", 1).set("school_id", 3i64),
            QueryBuilder::raw("where name like ?", params!["w%"]),
        )
        .await
        .unwrap();
    assert_eq!(updated, 4);

    let calls = helper.session().calls();
    assert_eq!(
        calls[0].sql,
        "UPDATE t_student SET age = age + $1, school_id = $2 WHERE name like $3 AND deleted = false"
    );
    assert_eq!(calls[0].params, params![1, 3i64, "w%"]);
}

#[tokio::test]
async fn test_soft_delete_wraps_or_condition() {
    let helper = DbHelper::new(RecordingSession::new().affected(2));

    let deleted = helper
        .delete::<Student>(QueryBuilder::raw("where name = ? or age < ?", params!["wu", 10]))
        .await
        .unwrap();
    assert_eq!(deleted, 2);

    let calls = helper.session().calls();
    assert_eq!(
        calls[0].sql,
        "UPDATE t_student SET deleted = true WHERE (name = $1 or age < $2) AND deleted = false"
    );
}

#[tokio::test]
async fn test_unconditional_delete_is_rejected() {
    let helper = DbHelper::new(RecordingSession::new());

    let result = helper.delete::<Student>(QueryBuilder::new()).await;
    assert!(matches!(
        result,
        Err(StoreError::UnsafeOperation {
            operation: "delete",
            ..
        })
    ));

    let result = helper
        .update_where::<Student>(UpdateSet::new().set("name", "x"), QueryBuilder::raw("", vec![]))
        .await;
    assert!(matches!(result, Err(StoreError::UnsafeOperation { .. })));

    assert!(helper.session().calls().is_empty());
}

#[tokio::test]
async fn test_delete_entity_uses_primary_key() {
    let helper = DbHelper::new(RecordingSession::new().affected(1));

    let mut course = Course {
        id: 9,
        student_id: 1,
        title: "algebra".into(),
        removed: 0,
    };
    assert_eq!(helper.delete_entity(&course).await.unwrap(), 1);

    let calls = helper.session().calls();
    assert_eq!(
        calls[0].sql,
        "UPDATE t_course SET removed = 1 WHERE id = $1 AND removed = 0"
    );
    assert_eq!(calls[0].params, params![9i64]);

    course.id = 10;
    helper.delete_by_key::<Course>(course.id).await.unwrap();
    assert_eq!(helper.session().calls()[1].params, params![10i64]);
}

#[tokio::test]
async fn test_session_errors_are_propagated() {
    let helper = DbHelper::new(RecordingSession::new().fail("connection reset"));

    let result = helper.get_all::<Student>(QueryBuilder::new()).await;
    match result {
        Err(StoreError::Database(source)) => assert_eq!(source.to_string(), "connection reset"),
        other => panic!("expected database error, got {:?}", other),
    }
}

// ========================================
// Paging
// ========================================

#[tokio::test]
async fn test_page_size_is_clamped_and_counted_first() {
    let session = RecordingSession::new()
        .rows(vec![count_row(12)])
        .rows((6..=10).map(|id| student_row(id, "s")).collect());
    let helper = DbHelper::new(session);
    helper.set_max_page_size(5);

    let page = helper
        .get_page::<Student>(2, 10, QueryBuilder::raw("where age > ?", params![18]))
        .await
        .unwrap();

    assert_eq!(page.page_size, 5);
    assert_eq!(page.total, 12);
    assert!(page.total_counted);
    assert_eq!(page.total_page(), 3);
    assert_eq!(page.data.len(), 5);
    assert_eq!(page.data[0].id, Some(6));

    let calls = helper.session().calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[0].sql,
        "SELECT COUNT(*) AS total FROM t_student WHERE age > $1 AND deleted = false"
    );
    assert_eq!(
        calls[1].sql,
        format!(
            "SELECT {} FROM t_student WHERE age > $1 AND deleted = false LIMIT 5 OFFSET 5",
            STUDENT_COLUMNS
        )
    );
    assert_eq!(calls[1].params, params![18]);
}

#[tokio::test]
async fn test_empty_count_skips_select() {
    let helper = DbHelper::new(RecordingSession::new().rows(vec![count_row(0)]));

    let page = helper.get_page::<Student>(1, 20, QueryBuilder::new()).await.unwrap();

    assert_eq!(page.total, 0);
    assert_eq!(page.total_page(), 0);
    assert!(page.data.is_empty());
    assert_eq!(helper.session().calls().len(), 1);
}

#[tokio::test]
async fn test_page_without_count() {
    let session = RecordingSession::new().rows(vec![student_row(1, "a"), student_row(2, "b")]);
    let helper = DbHelper::new(session);

    let page = helper
        .get_page_without_count::<Student>(0, 10, QueryBuilder::raw("order by id", vec![]))
        .await
        .unwrap();

    assert_eq!(page.total, 2);
    assert!(!page.total_counted);

    let calls = helper.session().calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].sql,
        format!(
            "SELECT {} FROM t_student WHERE deleted = false order by id LIMIT 10",
            STUDENT_COLUMNS
        )
    );
}

#[tokio::test]
async fn test_paged_query_rejects_caller_limit() {
    let helper = DbHelper::new(RecordingSession::new());

    let result = helper
        .get_page::<Student>(1, 10, QueryBuilder::raw("order by id limit 3", vec![]))
        .await;
    assert!(matches!(result, Err(StoreError::InvalidQuery(_))));
}

// ========================================
// Slow queries
// ========================================

#[tokio::test]
async fn test_slow_query_callback_receives_statement() {
    let helper = DbHelper::new(RecordingSession::new().rows(vec![student_row(1, "wu")]));
    let reports: Arc<Mutex<Vec<(String, Vec<SqlValue>)>>> = Arc::default();

    let sink = Arc::clone(&reports);
    helper.set_timeout_warning_valve(0);
    helper.set_timeout_warning_callback(move |slow| {
        sink.lock()
            .unwrap()
            .push((slow.sql.to_string(), slow.params.to_vec()));
    });

    helper
        .get_all::<Student>(QueryBuilder::raw("where name = ?", params!["wu"]))
        .await
        .unwrap();

    let reports = reports.lock().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0, helper.session().calls()[0].sql);
    assert_eq!(reports[0].1, params!["wu"]);
}

#[tokio::test]
async fn test_slow_query_reported_on_failure() {
    let helper = DbHelper::new(RecordingSession::new().fail("timeout"));
    let fired = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&fired);
    helper.set_timeout_warning_valve(0);
    helper.set_timeout_warning_callback(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let result = helper.delete_by_key::<Student>(1i64).await;
    assert!(matches!(result, Err(StoreError::Database(_))));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_disabled_slow_query_reporting() {
    let helper = DbHelper::new(RecordingSession::new());
    let fired = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&fired);
    helper.set_timeout_warning_callback(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    helper.disable_timeout_warning();

    helper.get_all::<Student>(QueryBuilder::new()).await.unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_panicking_slow_query_callback_is_contained() {
    let helper = DbHelper::new(RecordingSession::new().rows(vec![count_row(1)]));
    helper.set_timeout_warning_valve(0);
    helper.set_timeout_warning_callback(|_| panic!("callback failure"));

    let count = helper.get_count::<Student>(QueryBuilder::new()).await.unwrap();
    assert_eq!(count, 1);
}

// ========================================
// Post-commit callbacks
// ========================================

fn flag() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
    let counter = Arc::new(AtomicUsize::new(0));
    let handle = Arc::clone(&counter);
    (counter, move || {
        handle.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn test_callback_deferred_until_commit() {
    let helper = DbHelper::new(RecordingSession::transactional());
    let (ran, callback) = flag();

    let outcome = helper.execute_after_commit(callback).unwrap();
    assert_eq!(outcome, AfterCommitOutcome::Deferred);
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert_eq!(helper.session().scope().pending_hooks(), 1);

    assert_eq!(helper.session().scope().commit_hooks(), 1);
    assert_eq!(ran.load(Ordering::SeqCst), 1);

    // a second commit signal runs nothing
    assert_eq!(helper.session().scope().commit_hooks(), 0);
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn test_callback_discarded_on_rollback() {
    let helper = DbHelper::new(RecordingSession::transactional());
    let (ran, callback) = flag();

    helper.execute_after_commit(callback).unwrap();
    assert_eq!(helper.session().scope().rollback_hooks(), 1);
    assert_eq!(helper.session().scope().commit_hooks(), 0);
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[test]
fn test_callback_without_transaction_runs_immediately() {
    let helper = DbHelper::new(RecordingSession::new());
    let (ran, callback) = flag();

    let outcome = helper.execute_after_commit(callback).unwrap();
    assert_eq!(outcome, AfterCommitOutcome::RanImmediately);
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn test_callback_after_finished_transaction_follows_policy() {
    let helper = DbHelper::new(RecordingSession::transactional());
    helper.session().scope().commit_hooks();
    let (ran, callback) = flag();

    let outcome = helper.execute_after_commit(callback).unwrap();
    assert_eq!(outcome, AfterCommitOutcome::RanImmediately);
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

/// Transaction whose commit lands between the caller's `is_active` check and its
/// registration: it still reports active while its queue is already closed.
struct CommittedUnderneath {
    scope: TransactionScope,
}

impl TransactionContext for CommittedUnderneath {
    fn is_active(&self) -> bool {
        true
    }

    fn register_post_commit(&self, hook: PostCommitHook) -> Result<(), PostCommitHook> {
        self.scope.register_post_commit(hook)
    }
}

struct LateCommitSession {
    transaction: CommittedUnderneath,
}

impl LateCommitSession {
    fn new() -> Self {
        let scope = TransactionScope::new();
        scope.commit_hooks();
        Self {
            transaction: CommittedUnderneath { scope },
        }
    }
}

#[async_trait]
impl DatabaseSession for LateCommitSession {
    async fn fetch(&self, _sql: &str, _params: &[SqlValue]) -> Result<Vec<Row>, SessionError> {
        Ok(Vec::new())
    }

    async fn execute(&self, _sql: &str, _params: &[SqlValue]) -> Result<u64, SessionError> {
        Ok(0)
    }

    fn transaction(&self) -> Option<&dyn TransactionContext> {
        Some(&self.transaction)
    }
}

#[test]
fn test_callback_racing_commit_is_not_lost() {
    let helper = DbHelper::new(LateCommitSession::new());
    let (ran, callback) = flag();

    let outcome = helper.execute_after_commit(callback).unwrap();
    assert_eq!(outcome, AfterCommitOutcome::RanImmediately);
    assert_eq!(ran.load(Ordering::SeqCst), 1);
    assert_eq!(helper.session().transaction.scope.pending_hooks(), 0);
}

#[test]
fn test_callback_racing_commit_fails_under_fail_policy() {
    let helper = DbHelper::new(LateCommitSession::new());
    helper.set_after_commit_policy(AfterCommitPolicy::Fail);
    let (ran, callback) = flag();

    let result = helper.execute_after_commit(callback);
    assert!(matches!(result, Err(StoreError::NoActiveTransaction)));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert_eq!(helper.session().transaction.scope.pending_hooks(), 0);
}

#[test]
fn test_fail_policy_rejects_callback_outside_transaction() {
    let helper = DbHelper::new(RecordingSession::new());
    helper.set_after_commit_policy(AfterCommitPolicy::Fail);
    let (ran, callback) = flag();

    let result = helper.execute_after_commit(callback);
    assert!(matches!(result, Err(StoreError::NoActiveTransaction)));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[test]
fn test_panicking_immediate_callback_is_contained() {
    let helper = DbHelper::new(RecordingSession::new());
    let outcome = helper
        .execute_after_commit(|| panic!("post-commit failure"))
        .unwrap();
    assert_eq!(outcome, AfterCommitOutcome::RanImmediately);
}

// ========================================
// Joined queries
// ========================================

#[tokio::test]
async fn test_joined_rows_fold_into_details() {
    let rows = vec![
        detail_row((1, "wu", Some(10)), Some((10, "north")), Some((100, "algebra"))),
        detail_row((1, "wu", Some(10)), Some((10, "north")), Some((101, "physics"))),
        detail_row((1, "wu", Some(10)), Some((10, "north")), Some((100, "algebra"))),
        detail_row((2, "li", None), None, None),
    ];
    let helper = DbHelper::new(RecordingSession::new().rows(rows));

    let details = helper
        .get_all_joined::<StudentDetail>(QueryBuilder::raw(
            "where t1.age > ? order by t1.id",
            params![6],
        ))
        .await
        .unwrap();

    assert_eq!(details.len(), 2);

    let first = &details[0];
    assert_eq!(first.student.name, "wu");
    assert_eq!(first.school.as_ref().map(|s| s.name.as_str()), Some("north"));
    let titles: Vec<&str> = first.courses.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["algebra", "physics"]);

    let second = &details[1];
    assert_eq!(second.student.id, Some(2));
    assert!(second.school.is_none());
    assert!(second.courses.is_empty());

    let sql = &helper.session().calls()[0].sql;
    assert!(sql.starts_with("SELECT t1.id AS \"t1__id\", t1.name AS \"t1__name\""));
    assert!(sql.contains(
        " FROM t_student t1 LEFT JOIN t_school t2 ON t1.school_id = t2.id \
         LEFT JOIN t_course t3 ON t1.id = t3.student_id AND t3.removed = 0 \
         WHERE t1.age > $1 AND t1.deleted = false order by t1.id"
    ));
}

#[tokio::test]
async fn test_get_one_joined_takes_first_root() {
    let rows = vec![
        detail_row((3, "zhao", None), None, Some((300, "music"))),
        detail_row((4, "qian", None), None, None),
    ];
    let helper = DbHelper::new(RecordingSession::new().rows(rows));

    let detail = helper
        .get_one_joined::<StudentDetail>(QueryBuilder::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.student.id, Some(3));
    assert_eq!(detail.courses.len(), 1);
}

#[tokio::test]
async fn test_self_join_children_share_identity() {
    let rows = vec![tag_twins_row(5, "rust"), tag_twins_row(6, "sql")];
    let helper = DbHelper::new(RecordingSession::new().rows(rows));

    let twins = helper
        .get_all_joined::<TagTwins>(QueryBuilder::raw("order by t1.id", params![]))
        .await
        .unwrap();

    assert_eq!(twins.len(), 2);
    for twin in &twins {
        let right = twin.right.as_ref().unwrap();
        assert_eq!(twin.left.id, right.id);
        assert_eq!(twin.left.id, twin.tag.id);
        assert_eq!(twin.left.label, right.label);
    }
    assert_eq!(twins[1].left.id, 6);

    let sql = &helper.session().calls()[0].sql;
    assert!(sql.contains(
        " FROM t_tag t1 INNER JOIN t_tag t2 ON t1.id = t2.id \
         LEFT JOIN t_tag t3 ON t1.id = t3.id"
    ));
}

// ========================================
// Settings
// ========================================

#[test]
fn test_helpers_share_settings_across_sessions() {
    let helper = DbHelper::new(RecordingSession::new());
    helper.set_max_page_size(0);
    assert_eq!(helper.max_page_size(), 1);

    let transactional = helper.with_session(RecordingSession::transactional());
    helper.set_max_page_size(50);
    assert_eq!(transactional.max_page_size(), 50);
}

#[test]
fn test_helper_from_config() {
    let config = HelperConfig {
        max_page_size: 25,
        slow_query_threshold_ms: Some(250),
        after_commit_policy: AfterCommitPolicy::Fail,
    };
    let helper = DbHelper::from_config(RecordingSession::new(), &config);

    assert_eq!(helper.max_page_size(), 25);
    assert_eq!(
        helper.settings().slow_query_threshold(),
        Some(std::time::Duration::from_millis(250))
    );
    assert!(helper.execute_after_commit(|| {}).is_err());
}
