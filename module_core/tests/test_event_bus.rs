use common::{
    state::{ServiceState, StartMode},
    subscription::SubscriptionConfig,
};
use module_core::{
    test_helper::{assert_no_event, register_response_event, unregister_response_event, wait_for_event},
    *,
};
use std::{sync::Arc, time::Duration};

#[tokio::test]
#[test_log::test]
pub async fn events_delivered() {
    let event_bus = EventBus::new();
    let mut receiver = event_bus.subscribe();
    let event = Event {
        kind: EventKind::QuitEvent,
    };
    event_bus.publish(&event);
    let received_event = tokio::time::timeout(Duration::from_millis(100), receiver.recv())
        .await
        .expect("Failed to receive event in required time")
        .unwrap();
    assert_eq!(received_event.event_type(), event.event_type());
}

#[tokio::test]
#[test_log::test]
pub async fn test_wait_for_response() {
    let event_bus = EventBus::new();
    let mut ctx = event_bus.context();
    if register_response_event(
        EventKindType::StartServiceRequestEvent,
        Event {
            kind: EventKind::StartServiceResponseEvent(Arc::new(Response::new(7, 0xFA, StartMode::Sticky))),
        },
        event_bus.context(),
    )
    .is_err()
    {
        panic!("Failed to register response event");
    }
    if ctx
        .publish_event(EventKind::StartServiceRequestEvent(Arc::new(Request {
            id: 7,
            sender_addr: 0xFA,
            data: SubscriptionConfig::default(),
        })))
        .is_err()
    {
        panic!("Failed to publish request event");
    }
    let event = ctx
        .wait_for_event(7, 0xFA, &EventKindType::StartServiceResponseEvent)
        .await
        .unwrap();
    let response = payload_ref!(event.kind, EventKind::StartServiceResponseEvent).unwrap();
    assert_eq!(response.id, 7);
    assert_eq!(response.receiver_addr, 0xFA);
    assert_eq!(response.data, StartMode::Sticky);
    unregister_response_event(ctx.bus_id(), &EventKindType::StartServiceRequestEvent);
}

#[tokio::test]
pub async fn register_response_handler_twice_fails() {
    let event_bus = EventBus::new();
    let response = Event {
        kind: EventKind::StartServiceResponseEvent(Arc::new(Response::new(1, 1, StartMode::NotSticky))),
    };
    register_response_event(EventKindType::StartServiceRequestEvent, response.clone(), event_bus.context())
        .unwrap();
    let second = register_response_event(EventKindType::StartServiceRequestEvent, response, event_bus.context());
    assert_eq!(second.unwrap_err().kind(), std::io::ErrorKind::AlreadyExists);
    unregister_response_event(event_bus.context().bus_id(), &EventKindType::StartServiceRequestEvent);
}

#[tokio::test]
pub async fn wait_for_event_skips_other_types() {
    let event_bus = EventBus::new();
    let mut receiver = event_bus.subscribe();
    event_bus.publish(&Event {
        kind: EventKind::ServiceStateEvent(ServiceState::Starting),
    });
    event_bus.publish(&Event {
        kind: EventKind::QuitEvent,
    });
    let event = wait_for_event(&mut receiver, Duration::from_millis(100), EventKindType::QuitEvent).await;
    assert_eq!(event.kind, EventKind::QuitEvent);
}

#[tokio::test]
pub async fn no_event_on_silent_bus() {
    let event_bus = EventBus::new();
    let mut receiver = event_bus.subscribe();
    event_bus.publish(&Event {
        kind: EventKind::ServiceStateEvent(ServiceState::Running),
    });
    assert_no_event(&mut receiver, Duration::from_millis(20), EventKindType::FixEvent).await;
}

#[test]
pub fn buses_have_distinct_ids() {
    let first = EventBus::new();
    let second = EventBus::new();
    assert_ne!(first.context().bus_id(), second.context().bus_id());
}
