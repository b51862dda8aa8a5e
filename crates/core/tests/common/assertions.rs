//! Custom assertion helpers for integration tests.

#![allow(dead_code)]

use sc_protocol::{ActionLogEntry, Event, SessionStatus};
use tokio::sync::mpsc;

/// Action types in log order.
pub fn action_types(entries: &[ActionLogEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.action_type.as_str()).collect()
}

pub fn count_logs(entries: &[ActionLogEntry], action_type: &str) -> usize {
    entries.iter().filter(|e| e.action_type == action_type).count()
}

pub fn count_failed(entries: &[ActionLogEntry]) -> usize {
    entries.iter().filter(|e| !e.succeeded()).count()
}

/// Everything currently buffered in the channel.
pub fn drain(rx: &mut mpsc::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn has_status_update(events: &[Event], status: SessionStatus) -> bool {
    events.iter().any(|e| {
        matches!(
            e,
            Event::SessionStatusUpdate {
                status: s,
                ..
            } if *s == status
        )
    })
}

/// Session events must open with `SessionStarted` and close with
/// `SessionCompleted`, `SessionError` or `SessionCancelled`.
pub fn assert_session_event_sequence(events: &[Event]) {
    assert!(!events.is_empty(), "Event sequence is empty");
    assert!(
        matches!(events[0], Event::SessionStarted { .. }),
        "First event should be SessionStarted, got: {:?}",
        events[0]
    );
    let last = &events[events.len() - 1];
    assert!(
        matches!(
            last,
            Event::SessionCompleted { .. } | Event::SessionError { .. } | Event::SessionCancelled { .. }
        ),
        "Last event should end the session, got: {:?}",
        last
    );
}
