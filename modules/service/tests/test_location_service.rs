// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::{
    fix::Fix,
    notifier::LOCATION_NOTIFICATION_ID,
    permission::{PermissionScope, StaticPermissions},
    provider::ProviderError,
    state::{ServiceState, StartMode},
    subscription::SubscriptionConfig,
    test_helper::{
        location_provider::FakeLocationProvider,
        notifier::{NotifierCall, RecordingNotifier},
    },
};
use module_core::{
    EventBus, EventKind, EventKindType, Module, Request, payload_ref,
    test_helper::{stop_module, wait_for_event},
};
use reporter::LocationReporter;
use service::LocationService;
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;

const TIMEOUT: Duration = Duration::from_millis(100);

struct Fixture {
    provider: Arc<FakeLocationProvider>,
    notifier: Arc<RecordingNotifier>,
}

fn create_service(eb: &EventBus, provider: FakeLocationProvider, permissions: StaticPermissions) -> (LocationService, Fixture) {
    let provider = Arc::new(provider);
    let notifier = Arc::new(RecordingNotifier::default());
    let reporter = LocationReporter::new(provider.clone(), notifier.clone(), Arc::new(permissions), eb.sender());
    let service = LocationService::new(eb.context(), reporter, notifier.clone());
    (service, Fixture { provider, notifier })
}

fn spawn_service(service: LocationService) -> JoinHandle<Result<(), ()>> {
    tokio::spawn(async move {
        let mut service = service;
        service.run().await
    })
}

async fn request_start(eb: &EventBus, id: u64) -> StartMode {
    let mut ctx = eb.context();
    ctx.publish_event(EventKind::StartServiceRequestEvent(Arc::new(Request {
        id,
        sender_addr: 0xAB,
        data: SubscriptionConfig::default(),
    })))
    .expect("Failed to publish start request");
    let event = tokio::time::timeout(
        TIMEOUT,
        ctx.wait_for_event(id, 0xAB, &EventKindType::StartServiceResponseEvent),
    )
    .await
    .expect("No start response in time")
    .unwrap();
    payload_ref!(event.kind, EventKind::StartServiceResponseEvent)
        .unwrap()
        .data
}

#[test]
fn create_shows_persistent_notification() {
    let eb = EventBus::default();
    let (service, fixture) = create_service(
        &eb,
        FakeLocationProvider::with_fine_and_coarse(),
        StaticPermissions::all_granted(),
    );
    service.on_create();
    assert_eq!(
        fixture.notifier.calls(),
        vec![NotifierCall::Show {
            id: LOCATION_NOTIFICATION_ID,
            title: "Location Service".to_string(),
            body: "Running service to find your location".to_string(),
            persistent: true,
        }]
    );
}

#[test]
fn start_command_translates_result() {
    let eb = EventBus::default();
    let (service, _) = create_service(
        &eb,
        FakeLocationProvider::with_fine_and_coarse(),
        StaticPermissions::all_granted(),
    );
    assert_eq!(service.on_start_command(SubscriptionConfig::default()), StartMode::Sticky);
    assert_eq!(service.on_start_command(SubscriptionConfig::default()), StartMode::Sticky);
    service.on_destroy();
    assert_eq!(service.reporter().state(), ServiceState::Stopped);

    let (denied, fixture) = create_service(
        &eb,
        FakeLocationProvider::with_fine_and_coarse(),
        StaticPermissions::all_granted().revoke(PermissionScope::CoarseLocation),
    );
    assert_eq!(denied.on_start_command(SubscriptionConfig::default()), StartMode::NotSticky);
    assert_eq!(fixture.provider.subscribe_calls(), 0);

    let (no_provider, _) = create_service(&eb, FakeLocationProvider::default(), StaticPermissions::all_granted());
    assert_eq!(no_provider.on_start_command(SubscriptionConfig::default()), StartMode::NotSticky);
}

#[tokio::test]
#[test_log::test]
async fn answer_start_request_and_report_fixes() {
    let eb = EventBus::default();
    let (service, fixture) = create_service(
        &eb,
        FakeLocationProvider::with_fine_and_coarse(),
        StaticPermissions::all_granted(),
    );
    let mut handle = spawn_service(service);

    assert_eq!(request_start(&eb, 1).await, StartMode::Sticky);
    let mut rx = eb.subscribe();
    fixture.provider.deliver_fix(Fix::now(37.7749, -122.4194));
    let event = wait_for_event(&mut rx, TIMEOUT, EventKindType::FixEvent).await;
    assert_eq!(
        payload_ref!(event.kind, EventKind::FixEvent).unwrap().longitude(),
        -122.4194
    );
    assert_eq!(
        fixture.notifier.updates(),
        vec![(LOCATION_NOTIFICATION_ID, "37.7749, -122.4194".to_string())]
    );

    stop_module(&eb, &mut handle).await;
    assert!(fixture.provider.active_subscriptions().is_empty());
    assert_eq!(
        fixture.notifier.calls().last(),
        Some(&NotifierCall::Cancel {
            id: LOCATION_NOTIFICATION_ID
        })
    );
}

#[tokio::test]
#[test_log::test]
async fn answer_not_sticky_without_permission() {
    let eb = EventBus::default();
    let (service, fixture) = create_service(
        &eb,
        FakeLocationProvider::with_fine_and_coarse(),
        StaticPermissions::none_granted(),
    );
    let mut handle = spawn_service(service);
    assert_eq!(request_start(&eb, 2).await, StartMode::NotSticky);
    assert_eq!(fixture.provider.subscribe_calls(), 0);
    stop_module(&eb, &mut handle).await;
}

#[tokio::test]
async fn stop_request_stops_reporter() {
    let eb = EventBus::default();
    let (service, fixture) = create_service(
        &eb,
        FakeLocationProvider::with_coarse_only(),
        StaticPermissions::all_granted(),
    );
    let mut handle = spawn_service(service);
    assert_eq!(request_start(&eb, 3).await, StartMode::Sticky);

    let mut rx = eb.subscribe();
    eb.publish(&module_core::Event {
        kind: EventKind::StopServiceRequestEvent(Request::<()>::empty_request(4, 0xAB)),
    });
    loop {
        let event = wait_for_event(&mut rx, TIMEOUT, EventKindType::ServiceStateEvent).await;
        if payload_ref!(event.kind, EventKind::ServiceStateEvent) == Some(&ServiceState::Stopped) {
            break;
        }
    }
    assert_eq!(fixture.provider.unsubscribe_calls(), 1);
    stop_module(&eb, &mut handle).await;
}

#[tokio::test]
async fn provider_failure_is_shown_in_notification() {
    let eb = EventBus::default();
    let (service, fixture) = create_service(
        &eb,
        FakeLocationProvider::with_fine_and_coarse(),
        StaticPermissions::all_granted(),
    );
    let mut handle = spawn_service(service);
    assert_eq!(request_start(&eb, 5).await, StartMode::Sticky);

    fixture
        .provider
        .deliver_failure(ProviderError::Connection("gpsd went away".to_string()));
    tokio::time::timeout(TIMEOUT, async {
        while fixture.notifier.updates().is_empty() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("Failure not shown in time");
    let (_, body) = fixture.notifier.updates().remove(0);
    assert!(body.contains("gpsd went away"), "body was {body}");

    // A fresh start command works again after the failure.
    assert_eq!(request_start(&eb, 6).await, StartMode::Sticky);
    stop_module(&eb, &mut handle).await;
}
