//! Failure injection tests for the monitor actor
//!
//! These tests verify that the system degrades gracefully:
//! - Unreachable metric sources
//! - Slow providers hitting the fetch budget
//! - Malformed readings
//! - Failing or slow notification targets

use std::sync::Arc;
use std::time::Duration;

use vigia::actors::monitor::MonitorHandle;
use vigia::config::{DockerConfig, WebhookConfig};
use vigia::error::MonitorError;
use vigia::notify::WebhookNotifier;
use vigia::providers::CompositeProvider;
use vigia::providers::docker::DockerProvider;
use vigia::providers::system::SystemProvider;
use vigia::{ChatId, MetricReading};

use chrono::Utc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

#[tokio::test]
async fn container_source_down_keeps_host_alerts_flowing() {
    let provider = ScriptedProvider::new();
    let notifier = RecordingNotifier::new();

    provider.push_host(Ok(vec![reading("cpu", 92.0)]));
    provider.push_containers(Err(MonitorError::SourceUnavailable {
        source: "docker".into(),
        reason: "connection refused".into(),
    }));

    let handle = MonitorHandle::spawn(
        &create_test_monitor_config(600),
        vec![create_test_threshold("cpu", 80.0)],
        vec![ChatId(1)],
        provider.clone(),
        notifier.clone(),
    );

    let report = handle.tick_now().await.unwrap();
    assert_eq!(report.failed_sources, 1);
    assert_eq!(report.evaluated, 1);
    assert_eq!(report.events, 1);
    assert_eq!(notifier.count(), 1);

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn provider_timeout_counts_as_failed_source() {
    // Provider takes 2s, fetch budget is 1s.
    let provider = SlowProvider::new(Duration::from_secs(2), 92.0);
    let notifier = RecordingNotifier::new();

    let handle = MonitorHandle::spawn(
        &create_test_monitor_config(600),
        vec![create_test_threshold("cpu", 80.0)],
        vec![ChatId(1)],
        provider,
        notifier.clone(),
    );

    let report = handle.tick_now().await.unwrap();
    assert_eq!(report.failed_sources, 1);
    assert_eq!(report.evaluated, 0);
    assert_eq!(notifier.count(), 0);

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn non_finite_reading_is_skipped_but_others_evaluated() {
    let provider = ScriptedProvider::new();
    let notifier = RecordingNotifier::new();

    provider.push_host(Ok(vec![
        MetricReading::percent("cpu", f64::NAN, Utc::now()),
        reading("memory", 85.0),
    ]));

    let handle = MonitorHandle::spawn(
        &create_test_monitor_config(600),
        vec![
            create_test_threshold("cpu", 80.0),
            create_test_threshold("memory", 80.0),
        ],
        vec![ChatId(1)],
        provider.clone(),
        notifier.clone(),
    );

    let report = handle.tick_now().await.unwrap();
    assert_eq!(report.evaluated, 2);
    assert_eq!(report.events, 1);

    let states = handle.alert_states().await.unwrap();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].metric_key, "memory");

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn failed_recipient_does_not_block_others() {
    let provider = ScriptedProvider::new();
    let notifier = RecordingNotifier::new();
    notifier.fail_chat(ChatId(1));

    provider.push_host(Ok(vec![reading("cpu", 92.0)]));

    let handle = MonitorHandle::spawn(
        &create_test_monitor_config(600),
        vec![create_test_threshold("cpu", 80.0)],
        vec![ChatId(1), ChatId(2)],
        provider.clone(),
        notifier.clone(),
    );

    let report = handle.tick_now().await.unwrap();
    assert_eq!(report.failed_dispatches, 1);
    assert_eq!(notifier.chats(), vec![ChatId(2)]);

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn dispatch_timeout_is_counted() {
    let provider = ScriptedProvider::new();
    let notifier = RecordingNotifier::new();
    // Notifier takes 2s, dispatch budget is 1s.
    notifier.set_delay(Duration::from_secs(2));

    provider.push_host(Ok(vec![reading("cpu", 92.0)]));

    let handle = MonitorHandle::spawn(
        &create_test_monitor_config(600),
        vec![create_test_threshold("cpu", 80.0)],
        vec![ChatId(1)],
        provider.clone(),
        notifier.clone(),
    );

    let report = handle.tick_now().await.unwrap();
    assert_eq!(report.failed_dispatches, 1);

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn webhook_failures_never_crash_the_monitor() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let provider = ScriptedProvider::new();
    provider.push_host(Ok(vec![reading("cpu", 92.0)]));
    provider.push_host(Ok(vec![reading("cpu", 12.0)]));

    let notifier = Arc::new(WebhookNotifier::new(&WebhookConfig {
        url: format!("{}/hook", mock_server.uri()),
    }));

    let handle = MonitorHandle::spawn(
        &create_test_monitor_config(600),
        vec![create_test_threshold("cpu", 80.0)],
        vec![ChatId(1)],
        provider.clone(),
        notifier,
    );

    let raise = handle.tick_now().await.unwrap();
    assert_eq!(raise.failed_dispatches, 1);
    let clear = handle.tick_now().await.unwrap();
    assert_eq!(clear.failed_dispatches, 1);

    // The actor keeps answering queries after every dispatch failed.
    let recipients = handle.list_recipients().await.unwrap();
    assert_eq!(recipients, vec![ChatId(1)]);

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn docker_provider_failure_is_isolated_end_to_end() {
    // Nothing listens on port 1, so container sampling always fails.
    let docker = DockerProvider::new(&DockerConfig {
        endpoint: "http://127.0.0.1:1".into(),
        containers: vec!["web".into()],
        timeout_seconds: 1,
    });
    let provider = Arc::new(CompositeProvider::new(
        SystemProvider::new(vec!["/".into()]),
        Some(docker),
    ));
    let notifier = RecordingNotifier::new();

    // Host sampling is real and may be slow, so give it a generous budget.
    let mut config = create_test_monitor_config(600);
    config.fetch_timeout_seconds = 30;

    // No thresholds configured, so host readings pass through unevaluated.
    let handle = MonitorHandle::spawn(&config, vec![], vec![ChatId(1)], provider, notifier.clone());

    let report = handle.tick_now().await.unwrap();
    assert_eq!(report.failed_sources, 1);
    assert_eq!(report.evaluated, 0);
    assert_eq!(report.events, 0);

    handle.stop().await.unwrap();
}
