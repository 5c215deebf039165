//! Leveled log types shared by all backends.
//!
//! Backends report driver and validation diagnostics with a [`LogType`];
//! the message is forwarded to `tracing`, so the embedding application
//! decides where it ends up by installing a subscriber.

use serde::{Deserialize, Serialize};

/// Severity of a backend diagnostic, ordered from most to least severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogType {
    /// Unrecoverable for the operation that produced it
    Critical,
    /// Something is likely wrong but execution continues
    Warning,
    /// Valid usage with a known performance cost
    PerformanceWarning,
    /// Informational message
    Information,
    /// Debug output
    Debug,
    /// Trace output
    Trace,
}

impl LogType {
    /// Forward a message to `tracing` at the level matching this log type.
    pub fn emit(self, message: &str) {
        match self {
            Self::Critical => tracing::error!("{message}"),
            Self::Warning => tracing::warn!("{message}"),
            Self::PerformanceWarning => tracing::warn!(performance = true, "{message}"),
            Self::Information => tracing::info!("{message}"),
            Self::Debug => tracing::debug!("{message}"),
            Self::Trace => tracing::trace!("{message}"),
        }
    }

    /// Human-readable name of the log type.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::Warning => "Warning",
            Self::PerformanceWarning => "Performance warning",
            Self::Information => "Information",
            Self::Debug => "Debug",
            Self::Trace => "Trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer};
    use tracing_subscriber::prelude::*;

    use super::*;

    /// Level and `performance` flag of every recorded event.
    #[derive(Clone, Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<(Level, bool)>>>,
    }

    #[derive(Default)]
    struct PerformanceField(bool);

    impl Visit for PerformanceField {
        fn record_bool(&mut self, field: &Field, value: bool) {
            if field.name() == "performance" {
                self.0 = value;
            }
        }

        fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
    }

    impl<S: Subscriber> Layer<S> for Recorder {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut performance = PerformanceField::default();
            event.record(&mut performance);
            self.events
                .lock()
                .unwrap()
                .push((*event.metadata().level(), performance.0));
        }
    }

    #[test]
    fn severity_ordering() {
        assert!(LogType::Critical < LogType::Warning);
        assert!(LogType::Warning < LogType::PerformanceWarning);
        assert!(LogType::PerformanceWarning < LogType::Information);
        assert!(LogType::Debug < LogType::Trace);
    }

    #[test]
    fn emit_maps_levels() {
        let recorder = Recorder::default();
        let subscriber = tracing_subscriber::registry().with(recorder.clone());
        tracing::subscriber::with_default(subscriber, || {
            for log_type in [
                LogType::Critical,
                LogType::Warning,
                LogType::PerformanceWarning,
                LogType::Information,
                LogType::Debug,
                LogType::Trace,
            ] {
                log_type.emit("message");
            }
        });

        let events = recorder.events.lock().unwrap();
        assert_eq!(
            *events,
            [
                (Level::ERROR, false),
                (Level::WARN, false),
                (Level::WARN, true),
                (Level::INFO, false),
                (Level::DEBUG, false),
                (Level::TRACE, false),
            ]
        );
    }

    #[test]
    fn emit_without_subscriber_is_harmless() {
        LogType::Critical.emit("nobody is listening");
        assert_eq!(LogType::PerformanceWarning.name(), "Performance warning");
    }
}
