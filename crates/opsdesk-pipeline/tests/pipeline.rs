//! End-to-end tests wiring the full pipeline: dispatcher, queue, listener,
//! processor, delivery surfaces and the failed-job monitor.

use std::sync::Arc;
use std::time::Duration;

use opsdesk_alerts::{AlertEvent, Role, User};
use opsdesk_notify::{
    AlertBroadcast, AlertMailer, Broadcaster, Mailer, MemoryBroadcaster, MemoryMailer,
    MemoryNotificationStore, MemoryTemplateStore, MemoryUserDirectory, NotificationStore,
    TemplateStore, UserDirectory,
};
use opsdesk_pipeline::{
    AdminNotifyProcessor, AlertDispatcher, AlertListener, FailedJobMonitor, MemoryRateLimitStore,
    ProcessorRegistry, RateLimiter,
};
use opsdesk_queue::{FnJob, JobError, JobQueue, Lane};

struct World {
    notifications: Arc<MemoryNotificationStore>,
    broadcaster: Arc<MemoryBroadcaster>,
    transport: Arc<MemoryMailer>,
    queue: Arc<JobQueue>,
    dispatcher: Arc<AlertDispatcher>,
}

fn world() -> World {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let directory = Arc::new(MemoryUserDirectory::new());
    directory.add(User::new("Ada", "ada@example.com", Role::Admin));
    directory.add(User::new("Sam", "sam@example.com", Role::SuperAdmin));

    let notifications = Arc::new(MemoryNotificationStore::new());
    let broadcaster = Arc::new(MemoryBroadcaster::new());
    let transport = Arc::new(MemoryMailer::new());
    let queue = Arc::new(JobQueue::start());

    let mailer = Arc::new(AlertMailer::new(
        Arc::new(MemoryTemplateStore::with_defaults()) as Arc<dyn TemplateStore>,
        Arc::clone(&transport) as Arc<dyn Mailer>,
        Arc::clone(&notifications) as Arc<dyn NotificationStore>,
    ));
    let processor = Arc::new(AdminNotifyProcessor::new(
        Arc::clone(&directory) as Arc<dyn UserDirectory>,
        Arc::clone(&notifications) as Arc<dyn NotificationStore>,
        AlertBroadcast::new(Arc::clone(&broadcaster) as Arc<dyn Broadcaster>),
        mailer,
        Arc::clone(&queue),
    ));
    let listener = Arc::new(AlertListener::new(
        "admin",
        RateLimiter::new(Arc::new(MemoryRateLimitStore::new())),
        ProcessorRegistry::new(processor),
        Arc::clone(&directory) as Arc<dyn UserDirectory>,
        Arc::clone(&notifications) as Arc<dyn NotificationStore>,
    ));
    let dispatcher = Arc::new(AlertDispatcher::new(listener, Arc::clone(&queue)));

    World {
        notifications,
        broadcaster,
        transport,
        queue,
        dispatcher,
    }
}

/// Lets the lane workers drain everything currently in flight.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(250)).await;
}

#[tokio::test]
async fn failed_login_reaches_every_surface() {
    let world = world();

    world.dispatcher.raise(
        AlertEvent::failed_login(
            "victim@example.com",
            "203.0.113.9",
            Some("curl/8.0".to_string()),
            6,
            true,
            Some("Berlin, DE".to_string()),
        )
        .with_context("session_token", serde_json::json!("s3cr3t")),
    );
    settle().await;

    let records = world.notifications.records_of_kind("alert");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].data["event_type"], "failed_login");
    assert_eq!(records[0].data["severity"], "high");

    // Investigation fields survive sanitization; secrets do not.
    let context = &records[0].data["context"];
    assert_eq!(context["ip"], "203.0.113.9");
    assert_eq!(context["email"], "victim@example.com");
    assert_eq!(context["session_token"], "[REDACTED]");

    let messages = world.broadcaster.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].channel, "admin.alerts.security");
    assert_eq!(messages[0].payload["title"], "Failed login attempts");

    let sent = world.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].0.subject,
        "[HIGH] Security Alert: Failed login attempts"
    );
    assert_eq!(sent[0].1.email, "ada@example.com");
}

#[tokio::test]
async fn duplicate_event_is_suppressed_within_window() {
    let world = world();
    let event = AlertEvent::storage_warning("/var", 92, 90);

    world.dispatcher.raise(event.clone());
    world.dispatcher.raise(event);
    settle().await;

    assert_eq!(world.notifications.records_of_kind("alert").len(), 1);
    assert_eq!(world.broadcaster.messages().len(), 1);
}

#[tokio::test]
async fn medium_severity_skips_mail() {
    let world = world();

    world
        .dispatcher
        .raise(AlertEvent::storage_warning("/var", 92, 90));
    settle().await;

    assert_eq!(world.notifications.records_of_kind("alert").len(), 1);
    assert!(world.transport.sent().is_empty());
}

#[tokio::test]
async fn failed_business_job_raises_a_critical_alert() {
    let world = world();
    let monitor = Arc::new(FailedJobMonitor::new(Arc::clone(&world.dispatcher)));
    monitor.register(&world.queue);

    world
        .queue
        .enqueue(
            Box::new(FnJob::new("invoice-sync", || {
                Box::pin(async { Err(JobError::new("connection refused")) })
            })),
            Lane::Default,
        )
        .unwrap();
    settle().await;

    let records = world.notifications.records_of_kind("alert");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].data["event_type"], "job_failure");
    assert_eq!(records[0].data["severity"], "critical");

    // Critical alerts also go out by mail.
    assert_eq!(world.transport.sent().len(), 1);
}

#[tokio::test]
async fn uninteresting_job_failure_raises_nothing() {
    let world = world();
    let monitor = Arc::new(FailedJobMonitor::new(Arc::clone(&world.dispatcher)));
    monitor.register(&world.queue);

    world
        .queue
        .enqueue(
            Box::new(FnJob::new("warm-cache", || {
                Box::pin(async { Err(JobError::new("bad template")) })
            })),
            Lane::Default,
        )
        .unwrap();
    settle().await;

    assert!(world.notifications.records().is_empty());
}
