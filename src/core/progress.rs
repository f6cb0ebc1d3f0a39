//! Progress reporting
//!
//! Lifecycle and attach operations report what they are doing through a
//! [`ProgressSink`]. Events are advisory: sinks observe, they never influence
//! control flow. Sinks run synchronously on the caller's task and must not
//! block. On success the last event of an operation has `completed = true`.

use serde::Serialize;

/// A single progress event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    /// Name of the step being started
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Informational message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Whether the step finished
    pub completed: bool,
}

impl ProgressEvent {
    /// A step is starting
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// A step finished with a message
    pub fn completed(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            completed: true,
            ..Self::default()
        }
    }

    /// A named step finished
    pub fn completed_named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            completed: true,
            ..Self::default()
        }
    }
}

/// Observer of progress events
pub trait ProgressSink {
    fn on_progress(&mut self, event: ProgressEvent);
}

impl<F: FnMut(ProgressEvent)> ProgressSink for F {
    fn on_progress(&mut self, event: ProgressEvent) {
        self(event);
    }
}

/// Sink that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&mut self, _event: ProgressEvent) {}
}

/// Sink that keeps every event in order
#[derive(Debug, Default, Clone)]
pub struct ProgressLog {
    events: Vec<ProgressEvent>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far
    pub fn events(&self) -> &[ProgressEvent] {
        &self.events
    }

    /// Most recent event
    pub fn last(&self) -> Option<&ProgressEvent> {
        self.events.last()
    }
}

impl ProgressSink for ProgressLog {
    fn on_progress(&mut self, event: ProgressEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |event: ProgressEvent| seen.push(event);
            sink.on_progress(ProgressEvent::named("Uninstalling arduino:avr@1.8.6"));
            sink.on_progress(ProgressEvent::completed("done"));
        }
        assert_eq!(seen.len(), 2);
        assert!(seen[1].completed);
    }

    #[test]
    fn test_progress_log_keeps_order() {
        let mut log = ProgressLog::new();
        log.on_progress(ProgressEvent::named("first"));
        log.on_progress(ProgressEvent::completed_named("second"));
        assert_eq!(log.events()[0].name.as_deref(), Some("first"));
        assert!(log.last().unwrap().completed);
    }

    #[test]
    fn test_event_serializes_without_empty_fields() {
        let json = serde_json::to_string(&ProgressEvent::completed("ok")).unwrap();
        assert_eq!(json, r#"{"message":"ok","completed":true}"#);
    }
}
