//! Dispatcher wired into a lifecycle engine
//!
//! Operations return before delivery; after shutdown every queued
//! notification and creation record has been handed on exactly once.

use campusfix::clock::FixedClock;
use campusfix::issue_log::MemoryIssueLog;
use campusfix::{
    CampusConfig, InMemoryStorage, IssueDraft, LifecycleEngine, Priority, Role, Status, User,
};
use campusfix_dispatch::{DispatchReport, Dispatcher, MemoryTransport};
use chrono::{TimeZone, Utc};
use std::sync::Arc;

struct Wired {
    engine: LifecycleEngine<InMemoryStorage>,
    dispatcher: Dispatcher,
    transport: Arc<MemoryTransport>,
    issue_log: Arc<MemoryIssueLog>,
}

fn wired(transport: MemoryTransport) -> Wired {
    let transport = Arc::new(transport);
    let issue_log = Arc::new(MemoryIssueLog::new());
    let dispatcher = Dispatcher::spawn(transport.clone(), issue_log.clone());
    let handle = dispatcher.handle();

    let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 6, 8, 18, 30, 0).unwrap());
    let engine = LifecycleEngine::new(InMemoryStorage::new(), CampusConfig::default())
        .with_clock(Arc::new(clock))
        .with_notifier(Arc::new(handle.clone()))
        .with_issue_log(Arc::new(handle));

    Wired {
        engine,
        dispatcher,
        transport,
        issue_log,
    }
}

fn report_fan(engine: &LifecycleEngine<InMemoryStorage>, owner: &User) -> String {
    engine
        .create_issue(
            IssueDraft {
                title: "Fan not working".to_string(),
                description: "Ceiling fan is dead".to_string(),
                category: "Electrical".to_string(),
                sub_location: "Gargi".to_string(),
                specific_location: "Room 12".to_string(),
                priority: Priority::Medium,
                image_data: None,
            },
            owner,
        )
        .unwrap()
        .id
}

#[tokio::test]
async fn test_engine_events_reach_transport_and_log() {
    let w = wired(MemoryTransport::new());
    let asha = w
        .engine
        .register_user(User::new("Asha", Role::Student).with_hostel("Gargi").with_email("asha@campus.test"))
        .unwrap();
    let warden = w.engine.register_user(User::new("Warden", Role::Staff)).unwrap();

    let id = report_fan(&w.engine, &asha);
    w.engine.change_status(&id, Status::Resolved, &warden).unwrap();
    w.engine.add_comment(&id, "Replaced the capacitor", &warden).unwrap();

    let report = w.dispatcher.shutdown().await;
    assert_eq!(report, DispatchReport { delivered: 3, failed: 0 });

    let delivered = w.transport.delivered();
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[0].subject, "CampusFix: Issue Updated to Resolved");
    assert_eq!(delivered[1].subject, "New Comment on 'Fan not working'");

    let records = w.issue_log.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].ticket_id, id);
    assert_eq!(records[0].student_name, "Asha");
}

#[tokio::test]
async fn test_transport_failure_does_not_affect_operation() {
    let w = wired(MemoryTransport::failing());
    let asha = w
        .engine
        .register_user(User::new("Asha", Role::Student).with_email("asha@campus.test"))
        .unwrap();
    let warden = w.engine.register_user(User::new("Warden", Role::Staff)).unwrap();
    let id = report_fan(&w.engine, &asha);

    let outcome = w.engine.change_status(&id, Status::Defected, &warden).unwrap();
    assert_eq!(outcome.trust_delta, Some(-0.5));

    let report = w.dispatcher.shutdown().await;
    assert_eq!(report.failed, 1);
    assert!(w.transport.delivered().is_empty());
}
