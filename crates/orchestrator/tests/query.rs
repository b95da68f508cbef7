#![forbid(unsafe_code)]

use chrono::{TimeZone, Utc};
use orchestrator::domain::DiffStatus;
use orchestrator::{MemoryRepository, QueryService, StateRepository, diff};
use probes::{Category, CheckResult, CheckStatus};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

async fn seeded() -> Arc<MemoryRepository> {
    let repo = Arc::new(MemoryRepository::default());
    let ports = CheckResult::new(
        CheckStatus::Ok,
        "entries=2",
        json!({ "entries": [
            { "proto": "tcp", "ip": "0.0.0.0", "port": 22, "process": "sshd" },
            { "proto": "udp", "ip": "::", "port": 53, "process": null },
        ]}),
    );
    let logs = CheckResult::new(CheckStatus::Crit, "failed=9 invalid=0", json!({}));

    let first = repo
        .save(
            Utc.timestamp_opt(0, 0).unwrap(),
            BTreeMap::from([(Category::Ports, ports.clone())]),
        )
        .await
        .unwrap();
    let second = repo
        .save(
            Utc.timestamp_opt(60, 0).unwrap(),
            BTreeMap::from([(Category::Ports, ports), (Category::Logs, logs)]),
        )
        .await
        .unwrap();
    repo.save_diff(&diff(Some(&first), &second), second.meta.ts)
        .await
        .unwrap();
    repo
}

#[tokio::test]
async fn summaries_hide_categories_not_on_display() {
    let service = QueryService::new(seeded().await, [Category::Ports]);

    let summary = service.latest_snapshot_summary().await.unwrap().unwrap();
    assert_eq!(summary.categories.len(), 1);
    assert_eq!(summary.categories[0].details, "entries=2");
    assert_eq!(summary.overall(), CheckStatus::Ok);

    let diff = service.latest_diff_summary().await.unwrap().unwrap();
    assert_eq!(diff.status, DiffStatus::Warn);
    assert_eq!(diff.details, "changed=1");
    assert!(diff.changes.is_empty());
}

#[tokio::test]
async fn report_combines_snapshot_and_diff() {
    let service = QueryService::new(seeded().await, Category::ALL);
    let report = service.combined_report().await.unwrap();

    let snapshot = report.snapshot.unwrap();
    assert_eq!(snapshot.overall(), CheckStatus::Crit);
    let diff = report.diff.unwrap();
    assert_eq!(diff.changes[0].category, Category::Logs);
    assert_eq!(diff.changes[0].before, None);
    assert_eq!(diff.changes[0].after, Some(CheckStatus::Crit));
}

#[tokio::test]
async fn endpoints_come_from_port_data() {
    let service = QueryService::new(seeded().await, Category::ALL);
    let endpoints = service.endpoints().await.unwrap().unwrap();
    let rendered: Vec<String> = endpoints.sockets.iter().map(ToString::to_string).collect();
    assert_eq!(rendered, vec!["0.0.0.0:22 tcp", "[::]:53 udp"]);
}

#[tokio::test]
async fn empty_store_answers_none() {
    let service = QueryService::new(Arc::new(MemoryRepository::default()), Category::ALL);
    let report = service.combined_report().await.unwrap();
    assert!(report.snapshot.is_none());
    assert!(report.diff.is_none());
    assert!(service.endpoints().await.unwrap().is_none());
}
