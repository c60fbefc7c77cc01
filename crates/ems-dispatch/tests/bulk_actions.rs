//! Dispatcher behavior against an in-memory resource

use ems_dispatch::{
    ActionOutcome, AutoConfirm, BulkActionDispatcher, DispatchConfig, DispatchError,
    FieldTemplate, ShareTarget, ToastLevel, ToastQueue,
};
use ems_resolver::{
    Channel, InMemoryResolver, Record, RecipientCriteria, RecordId, ResolverError,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn incidents() -> Arc<InMemoryResolver> {
    Arc::new(InMemoryResolver::new("incidents").with_records([
        Record::new("1").with_field("title", "Flood").with_field("area", "North"),
        Record::new("2").with_field("title", "Fire").with_field("area", "Hill"),
        Record::new("3").with_field("title", "Storm").with_field("area", "Coast"),
    ]))
}

fn setup() -> (Arc<InMemoryResolver>, Arc<ToastQueue>, BulkActionDispatcher) {
    let remote = incidents();
    let toasts = Arc::new(ToastQueue::new());
    let dispatcher = BulkActionDispatcher::new(remote.clone(), toasts.clone());
    (remote, toasts, dispatcher)
}

fn ids(values: &[&str]) -> Vec<RecordId> {
    values.iter().copied().map(RecordId::from).collect()
}

#[tokio::test]
async fn export_sends_in_filter_and_reports() {
    let (remote, toasts, dispatcher) = setup();

    let outcome = dispatcher.export(ids(&["1", "3"])).await;

    let artifact = outcome.succeeded().unwrap();
    let rows: serde_json::Value = serde_json::from_slice(&artifact.bytes).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 2);
    assert_eq!(
        serde_json::to_value(&remote.exports()[0]).unwrap(),
        json!({"id": {"in": ["1", "3"]}})
    );
    assert_eq!(toasts.drain()[0].level, ToastLevel::Success);
}

#[tokio::test]
async fn export_uses_configured_identifier_field() {
    let remote = incidents();
    let dispatcher = BulkActionDispatcher::new(remote.clone(), Arc::new(ToastQueue::new()))
        .with_config(DispatchConfig::new().with_identifier_field("_id"));

    let _ = dispatcher.export(ids(&["2"])).await;

    assert_eq!(
        serde_json::to_value(&remote.exports()[0]).unwrap(),
        json!({"_id": {"in": ["2"]}})
    );
}

#[tokio::test]
async fn empty_export_never_reaches_remote() {
    let (remote, toasts, dispatcher) = setup();

    let outcome = dispatcher.export(Vec::new()).await;

    assert_eq!(outcome, ActionOutcome::Failed(DispatchError::EmptySelection));
    assert!(remote.exports().is_empty());
    assert_eq!(toasts.drain()[0].level, ToastLevel::Error);
}

#[tokio::test]
async fn single_and_one_element_share_bodies_match() {
    let (remote, _toasts, dispatcher) = setup();
    let template = FieldTemplate::parse("{title} in {area}");
    let record = remote.get(&"2".into()).unwrap();

    let single = dispatcher
        .notify(ShareTarget::One(record.clone()), &template, dispatcher.draft("Update"))
        .await
        .succeeded()
        .unwrap();
    let many = dispatcher
        .notify(ShareTarget::Many(vec![record]), &template, dispatcher.draft("Update"))
        .await
        .succeeded()
        .unwrap();

    assert_eq!(single.message.as_bytes(), many.message.as_bytes());
    assert_eq!(single.message, "Fire in Hill");
}

#[tokio::test]
async fn notify_builds_full_request() {
    let (remote, _toasts, dispatcher) = setup();
    let template = FieldTemplate::parse("{title}");
    let records = vec![
        remote.get(&"1".into()).unwrap(),
        remote.get(&"3".into()).unwrap(),
    ];
    let draft = dispatcher
        .draft("Heads up")
        .with_criteria(
            RecipientCriteria::new()
                .with_groups(vec!["responders".into()])
                .with_areas(vec!["North".into()]),
        )
        .with_channels([Channel::Sms, Channel::Push]);

    let outcome = dispatcher.notify(ShareTarget::Many(records), &template, draft).await;

    assert!(outcome.is_success());
    let sent = serde_json::to_value(&remote.notifications()[0]).unwrap();
    assert_eq!(
        sent,
        json!({
            "criteria": {"group": {"in": ["responders"]}, "area": {"in": ["North"]}},
            "subject": "Heads up",
            "message": "Flood\n\nStorm",
            "channels": ["SMS", "PUSH"],
        })
    );
}

#[tokio::test]
async fn notify_without_channels_is_rejected() {
    let (remote, toasts, dispatcher) = setup();
    let draft = dispatcher.draft("Nothing").with_channels([]);

    let outcome = dispatcher
        .notify(ShareTarget::One(Record::new("1")), &FieldTemplate::parse("{id}"), draft)
        .await;

    assert_eq!(outcome, ActionOutcome::Failed(DispatchError::NoChannels));
    assert!(remote.notifications().is_empty());
    assert_eq!(toasts.len(), 1);
}

#[tokio::test]
async fn declined_archive_touches_nothing() {
    let (remote, toasts, dispatcher) = setup();

    let outcome = dispatcher
        .archive(ShareTarget::One(RecordId::from("1")), &AutoConfirm(false))
        .await;

    assert_eq!(outcome, ActionOutcome::Cancelled);
    assert_eq!(remote.len(), 3);
    assert!(toasts.is_empty());
}

#[tokio::test]
async fn confirmed_archive_deletes_and_reports() {
    let (remote, toasts, dispatcher) = setup();

    let outcome = dispatcher
        .archive(ShareTarget::Many(ids(&["1", "2"])), &AutoConfirm(true))
        .await;

    assert_eq!(outcome, ActionOutcome::Succeeded(ids(&["1", "2"])));
    assert_eq!(remote.len(), 1);
    let shown = toasts.drain();
    assert_eq!(shown[0].message, "Archived 2 records");
}

#[tokio::test]
async fn archive_failure_is_toasted_not_propagated() {
    let (remote, toasts, dispatcher) = setup();
    remote.fail_mutations(true);

    let outcome = dispatcher
        .archive(ShareTarget::One(RecordId::from("1")), &AutoConfirm(true))
        .await;

    assert!(matches!(
        outcome,
        ActionOutcome::Failed(DispatchError::Remote(ResolverError::Rejected(_)))
    ));
    assert_eq!(remote.len(), 3);
    assert_eq!(toasts.drain()[0].level, ToastLevel::Error);
}

#[tokio::test]
async fn partial_archive_lists_both_sides() {
    let (remote, _toasts, dispatcher) = setup();

    let outcome = dispatcher
        .archive(ShareTarget::Many(ids(&["1", "missing"])), &AutoConfirm(true))
        .await;

    match outcome {
        ActionOutcome::Failed(DispatchError::Archive { archived, failed, source }) => {
            assert_eq!(archived, ids(&["1"]));
            assert_eq!(failed, ids(&["missing"]));
            assert_eq!(source, ResolverError::NotFound("missing".into()));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(remote.len(), 2);
}

#[tokio::test]
async fn export_failure_is_toasted_not_propagated() {
    let (remote, toasts, dispatcher) = setup();
    remote.fail_mutations(true);

    let outcome = dispatcher.export(ids(&["1"])).await;

    assert!(matches!(
        outcome,
        ActionOutcome::Failed(DispatchError::Remote(ResolverError::Rejected(_)))
    ));
    assert!(remote.exports().is_empty());
    let shown = toasts.drain();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].level, ToastLevel::Error);
}

#[tokio::test]
async fn notify_failure_is_toasted_not_propagated() {
    let (remote, toasts, dispatcher) = setup();
    remote.fail_mutations(true);
    let record = remote.get(&"1".into()).unwrap();

    let outcome = dispatcher
        .notify(
            ShareTarget::One(record),
            &FieldTemplate::parse("{title}"),
            dispatcher.draft("Alert"),
        )
        .await;

    assert!(matches!(
        outcome,
        ActionOutcome::Failed(DispatchError::Remote(ResolverError::Rejected(_)))
    ));
    assert!(remote.notifications().is_empty());
    let shown = toasts.drain();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].level, ToastLevel::Error);
}
