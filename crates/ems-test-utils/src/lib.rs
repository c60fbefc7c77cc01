//! Testing utilities for EMS workspace
//!
//! Shared fixtures, scripted user feedback and tracing setup.

#![allow(missing_docs)]

use async_trait::async_trait;
use ems_dispatch::{BulkActionDispatcher, Confirm, ToastQueue};
use ems_reference::{LabelSource, ReferenceCache, ReferenceOption};
use ems_resolver::{InMemoryResolver, Record};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::{Arc, Once};

pub const AREAS: [(&str, &str); 5] = [
    ("a1", "Harbor District"),
    ("a2", "Hill Ward"),
    ("a3", "Old Town"),
    ("a4", "Riverside"),
    ("a5", "North Quarter"),
];

pub fn incident(n: u64) -> Record {
    let (area, _) = AREAS[(n as usize) % AREAS.len()];
    Record::new(n)
        .with_field("title", format!("Incident {n}"))
        .with_field("area", area)
        .with_field("severity", n % 5 + 1)
}

pub fn incidents(count: u64) -> Vec<Record> {
    (1..=count).map(incident).collect()
}

/// `count` incidents served `page_size` at a time
pub fn incident_resolver(count: u64, page_size: usize) -> Arc<InMemoryResolver> {
    Arc::new(
        InMemoryResolver::new("incidents")
            .with_page_size(page_size)
            .with_records(incidents(count)),
    )
}

pub fn area_resolver() -> Arc<InMemoryResolver> {
    Arc::new(
        InMemoryResolver::new("areas").with_records(
            AREAS
                .iter()
                .map(|(id, name)| Record::new(*id).with_field("name", *name)),
        ),
    )
}

pub fn area_option(id: &str) -> Option<ReferenceOption> {
    AREAS
        .iter()
        .find(|(area, _)| *area == id)
        .map(|(area, name)| ReferenceOption::new(*area, *name))
}

pub fn area_field() -> ReferenceCache {
    ReferenceCache::builder(area_resolver())
        .label(LabelSource::field("name"))
        .build()
}

pub fn queued_dispatcher(resolver: Arc<InMemoryResolver>) -> (BulkActionDispatcher, Arc<ToastQueue>) {
    let toasts = Arc::new(ToastQueue::new());
    (BulkActionDispatcher::new(resolver, toasts.clone()), toasts)
}

/// Confirm that replays scripted answers and records every prompt
///
/// Answers `false` once the script runs out.
#[derive(Debug, Default)]
pub struct ScriptedConfirm {
    answers: Mutex<VecDeque<bool>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedConfirm {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            prompts: Mutex::default(),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl Confirm for ScriptedConfirm {
    async fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().push(prompt.to_string());
        self.answers.lock().pop_front().unwrap_or(false)
    }
}

static TRACING: Once = Once::new();

/// Route test logs to the libtest capture
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
