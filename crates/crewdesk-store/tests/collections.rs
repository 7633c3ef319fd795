//! Typed collection behaviour against the in-memory backend.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use crewdesk_core::{
    Assignment, Coordinates, Employee, Financials, Order, OrderStatus, Participants, Role,
    ScheduledTimes, Timeline,
};
use crewdesk_store::{
    filter, order_by, ChangeKind, Collection, Cursor, Direction, DocumentDb, DocumentId, Entity,
    FilterOp, MemoryStore, OrderService, StoreError, WriteBatch,
};
use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Task {
    title: String,
    rank: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

fn task(title: &str, rank: i64) -> Task {
    Task {
        title: title.into(),
        rank,
        note: None,
    }
}

fn tasks(db: &DocumentDb) -> Collection<Task> {
    db.collection("tasks")
}

fn id(s: &str) -> DocumentId {
    DocumentId::new(s).unwrap()
}

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, d, 18, 0, 0).unwrap()
}

fn order(title: &str, date: DateTime<Utc>) -> Order {
    Order {
        title: title.into(),
        date,
        service_id: "fire-show".into(),
        client: "Acme".into(),
        place_name: "Park".into(),
        place_address: "1 Main St".into(),
        place_coordinates: Coordinates { lat: 55.7, lng: 37.6 },
        timeline: Timeline {
            scheduled: ScheduledTimes {
                meet: date - Duration::hours(3),
                departure: date - Duration::hours(2),
                show_start: date,
                show_end: date + Duration::hours(1),
                returning_home: date + Duration::hours(3),
            },
            actual: None,
        },
        participants: Participants::default(),
        financials: Financials {
            total_price: 1000.0,
            total_salaries: 0.0,
            expenses: Some(100.0),
            profit: None,
        },
        status: OrderStatus::Planned,
        created_by: "U1".into(),
        notes: None,
        updated_at: date,
        created_at: date,
    }
}

#[tokio::test]
async fn created_document_reads_back_with_its_id() {
    let db = DocumentDb::in_memory();
    let tasks = tasks(&db);
    let created = tasks.create(&task("rig lights", 1)).await.unwrap();

    let stored = tasks.get_one(&created).await.unwrap().unwrap();
    assert_eq!(stored.id, created);
    assert_eq!(stored.data, task("rig lights", 1));
    assert!(tasks.exists(&created).await.unwrap());
    assert!(tasks.get_one(&id("missing")).await.unwrap().is_none());
}

#[tokio::test]
async fn stored_fields_do_not_include_the_id() {
    let store = Arc::new(MemoryStore::new());
    let db = DocumentDb::new(store.clone());
    tasks(&db).set_with_id(&id("t1"), &task("a", 1)).await.unwrap();
    let raw = db.store().get("tasks", &id("t1")).await.unwrap().unwrap();
    assert_eq!(serde_json::Value::Object(raw.fields), json!({ "title": "a", "rank": 1 }));
}

#[tokio::test]
async fn update_touches_only_the_patched_field() {
    let db = DocumentDb::in_memory();
    let tasks = tasks(&db);
    tasks.set_with_id(&id("t1"), &task("a", 1)).await.unwrap();
    tasks.update(&id("t1"), &json!({ "note": "bring ladder" })).await.unwrap();

    let stored = tasks.get_one(&id("t1")).await.unwrap().unwrap();
    assert_eq!(stored.title, "a");
    assert_eq!(stored.rank, 1);
    assert_eq!(stored.note.as_deref(), Some("bring ladder"));

    let err = tasks.update(&id("nope"), &json!({ "rank": 2 })).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[tokio::test]
async fn delete_is_idempotent() {
    let db = DocumentDb::in_memory();
    let tasks = tasks(&db);
    tasks.set_with_id(&id("t1"), &task("a", 1)).await.unwrap();
    tasks.delete(&id("t1")).await.unwrap();
    tasks.delete(&id("t1")).await.unwrap();
    assert!(tasks.get_one(&id("t1")).await.unwrap().is_none());
}

#[tokio::test]
async fn non_object_entities_are_rejected() {
    let db = DocumentDb::in_memory();
    let numbers: Collection<i64> = db.collection("numbers");
    assert!(matches!(
        numbers.create(&5).await,
        Err(StoreError::NotAnObject { .. })
    ));
}

#[tokio::test]
async fn field_lookups_use_natural_order() {
    let db = DocumentDb::in_memory();
    let tasks = tasks(&db);
    tasks.set_with_id(&id("b"), &task("same", 1)).await.unwrap();
    tasks.set_with_id(&id("a"), &task("same", 2)).await.unwrap();
    tasks.set_with_id(&id("c"), &task("other", 3)).await.unwrap();

    let all = tasks.get_all_by_field("title", "same").await.unwrap();
    assert_eq!(all.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    let first = tasks.get_one_by_field("title", "same").await.unwrap().unwrap();
    assert_eq!(first.id, id("a"));
    assert!(tasks.get_one_by_field("title", "none").await.unwrap().is_none());
}

#[tokio::test]
async fn failed_batch_leaves_every_document_untouched() {
    let db = DocumentDb::in_memory();
    let tasks = tasks(&db);
    tasks.set_with_id(&id("keep"), &task("keep", 1)).await.unwrap();

    let mut batch = WriteBatch::new();
    batch.set(&tasks, &id("new"), &task("new", 2)).unwrap();
    batch.delete(&tasks, &id("keep"));
    batch.update(&tasks, &id("ghost"), &json!({ "rank": 9 })).unwrap();
    assert_eq!(batch.len(), 3);

    assert!(db.commit(batch).await.is_err());
    assert!(tasks.exists(&id("keep")).await.unwrap());
    assert!(!tasks.exists(&id("new")).await.unwrap());
}

#[tokio::test]
async fn batch_spans_collections() {
    let db = DocumentDb::in_memory();
    let tasks = tasks(&db);
    let employees: Collection<Employee> = db.collection_for();
    assert_eq!(employees.name(), Employee::COLLECTION);

    let mut batch = WriteBatch::new();
    batch.set(&tasks, &id("t1"), &task("a", 1)).unwrap();
    batch.set(&employees, &id("e1"), &Employee::new("U1")).unwrap();
    db.commit(batch).await.unwrap();

    assert!(tasks.exists(&id("t1")).await.unwrap());
    assert!(employees.exists(&id("e1")).await.unwrap());
}

async fn collect_pages(tasks: &Collection<Task>, size: usize) -> Vec<(i64, String)> {
    let ordering = [order_by("rank", Direction::Desc)];
    let mut seen = Vec::new();
    let mut cursor = None;
    loop {
        let page = tasks
            .query_with_pagination(&ordering, size, cursor.as_ref())
            .await
            .unwrap();
        assert!(page.items.len() <= size);
        seen.extend(page.items.iter().map(|t| (t.rank, t.id.to_string())));
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    seen
}

#[tokio::test]
async fn pagination_ends_with_a_short_page() {
    let db = DocumentDb::in_memory();
    let tasks = tasks(&db);
    for i in 0..5 {
        tasks.set_with_id(&id(&format!("t{i}")), &task("x", i)).await.unwrap();
    }
    let first = tasks
        .query_with_pagination(&[order_by("rank", Direction::Asc)], 2, None)
        .await
        .unwrap();
    assert_eq!(first.items.len(), 2);
    let token = first.next_cursor.unwrap().to_string();

    let second = tasks
        .query_with_pagination(&[order_by("rank", Direction::Asc)], 2, Some(&token.parse::<Cursor>().unwrap()))
        .await
        .unwrap();
    assert_eq!(second.items.iter().map(|t| t.rank).collect::<Vec<_>>(), vec![2, 3]);

    assert!(matches!(
        tasks.query_with_pagination(&[], 0, None).await,
        Err(StoreError::InvalidQuery { .. })
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn paging_visits_every_document_once_in_order(
        ranks in proptest::collection::vec(-5i64..5, 0..40),
        size in 1usize..7,
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let seen = runtime.block_on(async {
            let db = DocumentDb::in_memory();
            let tasks = tasks(&db);
            for (i, rank) in ranks.iter().enumerate() {
                tasks.set_with_id(&id(&format!("t{i:02}")), &task("x", *rank)).await.unwrap();
            }
            collect_pages(&tasks, size).await
        });

        let unique: HashSet<&String> = seen.iter().map(|(_, id)| id).collect();
        prop_assert_eq!(unique.len(), ranks.len());
        prop_assert_eq!(seen.len(), ranks.len());
        let mut expected = seen.clone();
        expected.sort_by(|a, b| b.cmp(a));
        prop_assert_eq!(seen, expected);
    }
}

#[tokio::test]
async fn subscription_tracks_the_query_until_cancelled() {
    let store = Arc::new(MemoryStore::new());
    let db = DocumentDb::new(store.clone());
    let tasks = tasks(&db);
    tasks.set_with_id(&id("t1"), &task("a", 1)).await.unwrap();

    let mut sub = tasks
        .subscribe_all(&[filter("rank", FilterOp::Gt, 0)])
        .unwrap();
    assert_eq!(sub.next().await.unwrap().unwrap().len(), 1);

    tasks.set_with_id(&id("t2"), &task("b", 2)).await.unwrap();
    tasks.set_with_id(&id("t3"), &task("c", -1)).await.unwrap();
    let current = sub.next().await.unwrap().unwrap();
    assert_eq!(current.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(), vec!["t1", "t2"]);
    assert!(sub.try_next().is_none());

    sub.cancel();
    assert_eq!(store.listener_count(), 0);
    tasks.set_with_id(&id("t4"), &task("d", 4)).await.unwrap();
    assert!(sub.next().await.is_none());
    sub.cancel();
}

#[tokio::test]
async fn single_document_subscription_reports_absence() {
    let db = DocumentDb::in_memory();
    let tasks = tasks(&db);
    let mut sub = tasks.subscribe_one(&id("t1")).unwrap();
    assert_eq!(sub.next().await.unwrap().unwrap(), None);

    tasks.set_with_id(&id("t1"), &task("a", 1)).await.unwrap();
    assert_eq!(sub.next().await.unwrap().unwrap().unwrap().rank, 1);

    tasks.set_with_id(&id("other"), &task("b", 1)).await.unwrap();
    tasks.delete(&id("t1")).await.unwrap();
    assert_eq!(sub.next().await.unwrap().unwrap(), None);
}

#[tokio::test]
async fn change_stream_reports_kinds() {
    let db = DocumentDb::in_memory();
    let tasks = tasks(&db);
    tasks.set_with_id(&id("t1"), &task("a", 1)).await.unwrap();
    let mut sub = tasks.subscribe_changes(&[]).unwrap();

    let initial = sub.next().await.unwrap().unwrap();
    assert_eq!(initial.len(), 1);
    assert_eq!(initial[0].kind, ChangeKind::Added);

    tasks.update(&id("t1"), &json!({ "rank": 5 })).await.unwrap();
    let modified = sub.next().await.unwrap().unwrap();
    assert_eq!(modified[0].kind, ChangeKind::Modified);
    assert_eq!(modified[0].doc.rank, 5);

    tasks.delete(&id("t1")).await.unwrap();
    let removed = sub.next().await.unwrap().unwrap();
    assert_eq!(removed[0].kind, ChangeKind::Removed);
    assert_eq!(removed[0].doc.id, id("t1"));
}

#[tokio::test]
async fn dropping_a_subscription_releases_the_listener() {
    let store = Arc::new(MemoryStore::new());
    let db = DocumentDb::new(store.clone());
    {
        let _sub = tasks(&db).subscribe_all(&[]).unwrap();
        assert_eq!(store.listener_count(), 1);
    }
    assert_eq!(store.listener_count(), 0);
}

#[tokio::test]
async fn orders_keep_financials_consistent() {
    let db = DocumentDb::in_memory();
    let orders = OrderService::new(&db);
    let id = orders.create(&order("Gala", day(10))).await.unwrap();
    let stored = orders.get_one(&id).await.unwrap().unwrap();
    assert_eq!(stored.financials.profit, Some(900.0));

    let booked = Participants {
        employees: vec![Assignment {
            employee_id: "e1".into(),
            name: Some("Ann".into()),
            role: Role::Artist,
            rate_id: "r1".into(),
            rate_value: Some(50.0),
            hours_worked: 4.0,
            total_salary: 200.0,
            confirmed: Some(true),
            attended: None,
        }],
    };
    orders.set_participants(&id, booked, day(11)).await.unwrap();
    orders.set_status(&id, OrderStatus::Confirmed, day(11)).await.unwrap();

    let stored = orders.get_one(&id).await.unwrap().unwrap();
    assert_eq!(stored.financials.total_salaries, 200.0);
    assert_eq!(stored.financials.profit, Some(700.0));
    assert_eq!(stored.status, OrderStatus::Confirmed);
    assert_eq!(stored.updated_at, day(11));
    assert_eq!(orders.find_by_status(OrderStatus::Confirmed).await.unwrap().len(), 1);
}

#[tokio::test]
async fn upcoming_orders_are_soonest_first_and_history_newest_first() {
    let db = DocumentDb::in_memory();
    let orders = OrderService::new(&db);
    for (title, d) in [("late", 20), ("past", 1), ("soon", 12)] {
        orders.create(&order(title, day(d))).await.unwrap();
    }

    let upcoming = orders.upcoming(day(10)).await.unwrap();
    assert_eq!(upcoming.iter().map(|o| o.title.as_str()).collect::<Vec<_>>(), vec!["soon", "late"]);

    let first = orders.history_page(2, None).await.unwrap();
    assert_eq!(first.items.iter().map(|o| o.title.as_str()).collect::<Vec<_>>(), vec!["late", "soon"]);
    let rest = orders.history_page(2, first.next_cursor.as_ref()).await.unwrap();
    assert_eq!(rest.items.len(), 1);
    assert_eq!(rest.items[0].title, "past");
    assert!(rest.next_cursor.is_none());
}

#[tokio::test]
async fn sub_second_dates_keep_time_order() {
    let db = DocumentDb::in_memory();
    let orders = OrderService::new(&db);
    let whole = day(5);
    let half = whole + Duration::milliseconds(500);
    orders.create(&order("whole", whole)).await.unwrap();
    orders.create(&order("half", half)).await.unwrap();

    let upcoming = orders
        .upcoming(whole + Duration::milliseconds(250))
        .await
        .unwrap();
    assert_eq!(upcoming.iter().map(|o| o.title.as_str()).collect::<Vec<_>>(), vec!["half"]);

    let history = orders.history_page(10, None).await.unwrap();
    assert_eq!(
        history.items.iter().map(|o| o.title.as_str()).collect::<Vec<_>>(),
        vec!["half", "whole"]
    );
    assert_eq!(history.items[0].date, half);
}
