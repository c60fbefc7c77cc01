//! Reference field behavior against an in-memory resource

use ems_reference::{
    FieldStatus, LabelSource, RacePolicy, ReferenceCache, ReferenceConfig, ReferenceOption,
    SearchOutcome, Seed, SharedOptionStore,
};
use ems_resolver::{InMemoryResolver, Record, RecordId};
use std::sync::Arc;
use std::time::Duration;

fn agencies() -> Arc<InMemoryResolver> {
    Arc::new(InMemoryResolver::new("agencies").with_records([
        Record::new("A").with_field("name", "Alpha remote"),
        Record::new("B").with_field("name", "Beta remote").with_field("tag", "x"),
        Record::new("C").with_field("name", "Gamma").with_field("tag", "x"),
        Record::new("D").with_field("name", "Delta"),
    ]))
}

fn labels(field: &ReferenceCache) -> Vec<(String, String)> {
    field
        .render()
        .into_iter()
        .map(|(id, label)| (id.to_string(), label))
        .collect()
}

fn pair(id: &str, label: &str) -> (String, String) {
    (id.to_string(), label.to_string())
}

#[tokio::test]
async fn search_accumulates_and_seed_labels_win() {
    let field = ReferenceCache::builder(agencies()).build();
    field.initialize(vec![
        ReferenceOption::new("A", "Alpha seed"),
        ReferenceOption::new("B", "Beta seed"),
    ]);

    let outcome = field.on_query_change("x").await;

    assert_eq!(outcome, SearchOutcome::Merged { received: 2, added: 1 });
    assert_eq!(
        labels(&field),
        vec![pair("A", "Alpha seed"), pair("B", "Beta seed"), pair("C", "Gamma")]
    );
}

#[tokio::test]
async fn chosen_value_stays_labeled_after_query_moves_on() {
    let field = ReferenceCache::builder(agencies()).build();
    field.initialize(Seed::None);

    field.on_query_change("gamma").await;
    field.on_selection_change(vec!["C".into()]).await;
    field.on_query_change("delta").await;

    let matches: Vec<_> = field.matches().into_iter().map(|(id, _)| id).collect();
    assert_eq!(matches, vec![RecordId::from("D")]);
    assert_eq!(field.selected_options()[0].label, "Gamma");
}

#[tokio::test]
async fn failed_search_leaves_cache_untouched() {
    let remote = agencies();
    let field = ReferenceCache::builder(remote.clone()).build();
    field.initialize(Seed::One(ReferenceOption::new("A", "Alpha seed")));
    field.on_query_change("x").await;
    let before = field.snapshot();

    remote.fail_next_searches(1);
    let outcome = field.on_query_change("delta").await;

    assert!(matches!(outcome, SearchOutcome::Failed(_)));
    assert_eq!(field.snapshot(), before);
    assert_eq!(field.status(), FieldStatus::NotFound);
}

#[tokio::test]
async fn open_and_query_completions_both_merge() {
    let remote = agencies();
    remote.set_latency(None, Duration::from_millis(30));
    let field = ReferenceCache::builder(remote).build();
    field.initialize(Seed::None);

    let open = field.spawn_open();
    let query = field.spawn_query_change("gamma");
    let (open, query) = (open.await.unwrap(), query.await.unwrap());

    assert!(matches!(open, SearchOutcome::Merged { .. }));
    assert!(matches!(query, SearchOutcome::Merged { .. }));
    assert_eq!(field.len(), 4);
}

#[tokio::test]
async fn arrival_order_lets_slow_response_win() {
    let remote = agencies();
    remote.set_latency(Some("a"), Duration::from_millis(60));
    let field = ReferenceCache::builder(remote).build();
    field.initialize(Seed::None);

    let slow = field.spawn_query_change("a");
    let fast = field.spawn_query_change("gamma");
    fast.await.unwrap();
    let late = slow.await.unwrap();

    assert!(matches!(late, SearchOutcome::Merged { .. }));
    assert!(field.matches().len() > 1, "slow response replaced the newer matches");
}

#[tokio::test]
async fn reject_stale_keeps_newest_matches() {
    let remote = agencies();
    remote.set_latency(Some("a"), Duration::from_millis(60));
    let field = ReferenceCache::builder(remote)
        .config(ReferenceConfig::new().with_race_policy(RacePolicy::RejectStale))
        .build();
    field.initialize(Seed::None);

    let slow = field.spawn_query_change("a");
    let fast = field.spawn_query_change("gamma");
    fast.await.unwrap();
    let late = slow.await.unwrap();

    assert!(matches!(late, SearchOutcome::Stale { .. }));
    assert_eq!(field.matches(), vec![(RecordId::from("C"), "Gamma".to_string())]);
    assert_eq!(field.len(), 4, "stale response still grew the cache");
}

#[tokio::test]
async fn dropped_field_discards_late_result() {
    let remote = agencies();
    remote.set_latency(Some("gamma"), Duration::from_millis(30));
    let field = ReferenceCache::builder(remote.clone()).build();
    field.initialize(Seed::None);

    let pending = field.spawn_query_change("gamma");
    tokio::task::yield_now().await;
    field.detach();

    assert_eq!(pending.await.unwrap(), SearchOutcome::Detached);
    assert_eq!(remote.search_calls(), 1);
}

#[tokio::test]
async fn remounted_field_recovers_label_from_parent_store() {
    let remote = agencies();
    let store = SharedOptionStore::default();

    let first = ReferenceCache::builder(remote.clone())
        .shared_store(store.clone())
        .build();
    first.initialize(Seed::None);
    first.on_query_change("gamma").await;
    let value = first.on_selection_change(vec!["C".into()]).await;
    first.detach();

    let reopened = ReferenceCache::builder(remote.clone())
        .shared_store(store)
        .build();
    reopened.initialize(Seed::None);

    assert_eq!(value, vec![RecordId::from("C")]);
    assert_eq!(labels(&reopened), vec![pair("C", "Gamma")]);
    assert_eq!(remote.search_calls(), 1);
}

#[tokio::test]
async fn bounded_cache_keeps_seed_and_value() {
    let remote = Arc::new(
        InMemoryResolver::new("areas")
            .with_page_size(50)
            .with_records((0..40u64).map(|i| Record::new(i).with_field("name", format!("Area {i}")))),
    );
    let field = ReferenceCache::builder(remote)
        .config(ReferenceConfig::new().with_max_options(Some(5)))
        .build();
    field.initialize(Seed::One(ReferenceOption::new("home", "Home area")));

    field.on_query_change("Area 1").await;
    field.on_selection_change(vec!["12".into()]).await;
    field.on_query_change("Area 3").await;

    let ids: Vec<String> = field.render().into_iter().map(|(id, _)| id.to_string()).collect();
    assert!(ids.contains(&"home".to_string()));
    assert!(ids.contains(&"12".to_string()));
    assert!(field.selected_options().iter().any(|o| o.label == "Area 12"));
}

#[tokio::test]
async fn unbounded_cache_grows_freely() {
    let remote = Arc::new(
        InMemoryResolver::new("areas")
            .with_page_size(50)
            .with_records((0..40u64).map(|i| Record::new(i).with_field("name", format!("Area {i}")))),
    );
    let field = ReferenceCache::builder(remote)
        .config(ReferenceConfig::new().with_max_options(None))
        .build();
    field.initialize(Seed::None);

    field.on_query_change("Area 1").await;
    field.on_query_change("Area 2").await;

    assert_eq!(field.len(), 22);
}

#[tokio::test]
async fn composite_labels_render() {
    let remote = Arc::new(InMemoryResolver::new("people").with_records([Record::new("p1")
        .with_field("name", "Ada")
        .with_field("type", "focal")]));
    let field = ReferenceCache::builder(remote)
        .label(LabelSource::with_detail("name", "type"))
        .build();
    field.initialize(Seed::None);

    field.on_open().await;

    assert_eq!(labels(&field), vec![pair("p1", "Ada (focal)")]);
}

#[tokio::test]
async fn capped_cache_keeps_newest_matches_when_stale_response_lands() {
    let remote = Arc::new(InMemoryResolver::new("teams").with_records([
        Record::new("a1").with_field("name", "alpha one"),
        Record::new("a2").with_field("name", "alpha two"),
        Record::new("b1").with_field("name", "beta one"),
        Record::new("b2").with_field("name", "beta two"),
    ]));
    remote.set_latency(Some("beta"), Duration::from_millis(60));
    let field = ReferenceCache::builder(remote)
        .config(
            ReferenceConfig::new()
                .with_max_options(Some(2))
                .with_race_policy(RacePolicy::RejectStale),
        )
        .build();
    field.initialize(Seed::None);

    let slow = field.spawn_query_change("beta");
    let fast = field.spawn_query_change("alpha");
    fast.await.unwrap();
    let before = field.matches();
    let late = slow.await.unwrap();

    assert!(matches!(late, SearchOutcome::Stale { .. }));
    assert_eq!(
        before,
        vec![
            (RecordId::from("a1"), "alpha one".to_string()),
            (RecordId::from("a2"), "alpha two".to_string()),
        ]
    );
    assert_eq!(field.matches(), before);
    assert_eq!(labels(&field), vec![pair("a1", "alpha one"), pair("a2", "alpha two")]);
}
