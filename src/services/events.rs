//! Sync event channel
//!
//! The coordinator reports progress as structured [`SyncEvent`] values on a
//! `std::sync::mpsc` channel; whoever presents progress (the CLI today)
//! owns the receiver. std channels are used so the receiver can live on a
//! plain thread outside the tokio runtime.

use crate::models::Instrument;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::mpsc::{Receiver, Sender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventLevel::Info => "INFO",
            EventLevel::Warn => "WARN",
            EventLevel::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// One progress message from the engine
#[derive(Debug, Clone)]
pub struct SyncEvent {
    pub level: EventLevel,
    /// `None` for run-level messages
    pub instrument: Option<Instrument>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl SyncEvent {
    pub fn new(level: EventLevel, instrument: Option<Instrument>, message: impl Into<String>) -> Self {
        Self {
            level,
            instrument,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.instrument {
            Some(instrument) => write!(f, "[{}] {}: {}", self.level, instrument, self.message),
            None => write!(f, "[{}] {}", self.level, self.message),
        }
    }
}

/// Sending half handed to the engine; a sink without a channel drops events
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    sender: Option<Sender<SyncEvent>>,
}

impl EventSink {
    /// Create a connected sink and its receiver
    pub fn channel() -> (Self, Receiver<SyncEvent>) {
        let (tx, rx) = std::sync::mpsc::channel();
        (Self { sender: Some(tx) }, rx)
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: SyncEvent) {
        if let Some(sender) = &self.sender {
            // Receiver gone means nobody is listening any more
            let _ = sender.send(event);
        }
    }

    pub fn info(&self, instrument: Option<&Instrument>, message: impl Into<String>) {
        self.emit(SyncEvent::new(EventLevel::Info, instrument.cloned(), message));
    }

    pub fn warn(&self, instrument: Option<&Instrument>, message: impl Into<String>) {
        self.emit(SyncEvent::new(EventLevel::Warn, instrument.cloned(), message));
    }

    pub fn error(&self, instrument: Option<&Instrument>, message: impl Into<String>) {
        self.emit(SyncEvent::new(EventLevel::Error, instrument.cloned(), message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_are_delivered_in_order() {
        let (sink, rx) = EventSink::channel();
        let abc = Instrument::parse("ABC").unwrap();

        sink.info(None, "run started");
        sink.warn(Some(&abc), "2023: HTTP 503");
        drop(sink);

        let events: Vec<SyncEvent> = rx.iter().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].to_string(), "[INFO] run started");
        assert_eq!(events[1].level, EventLevel::Warn);
        assert_eq!(events[1].to_string(), "[WARN] ABC: 2023: HTTP 503");
    }

    #[test]
    fn test_disabled_sink_and_dropped_receiver() {
        EventSink::disabled().error(None, "ignored");

        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.info(None, "no listener");
    }
}
