//! Fixtures used in multiple tests.

use parking_lot::Mutex;
use std::{collections::HashMap, fmt, sync::Arc};
use tn_network_types::StatusMessage;
use tracing::{
    field::{Field, Visit},
    subscriber::DefaultGuard,
    Event, Level, Subscriber,
};
use tracing_subscriber::{
    layer::{Context, SubscriberExt as _},
    Layer,
};

/// A log event recorded by [CapturedLogs].
#[derive(Debug, Clone)]
pub(crate) struct CapturedEvent {
    /// The event's level.
    pub(crate) level: Level,
    /// The event's fields rendered as strings.
    pub(crate) fields: HashMap<&'static str, String>,
}

/// Layer that records every event on the current thread.
#[derive(Debug, Clone, Default)]
pub(crate) struct CapturedLogs(Arc<Mutex<Vec<CapturedEvent>>>);

impl CapturedLogs {
    /// Install the layer as the thread's default subscriber until the guard drops.
    ///
    /// `#[tokio::test]` runs on a current-thread runtime, so events from the codec are captured.
    pub(crate) fn install() -> (Self, DefaultGuard) {
        let logs = Self::default();
        let subscriber = tracing_subscriber::registry().with(logs.clone());
        let guard = tracing::subscriber::set_default(subscriber);
        (logs, guard)
    }

    /// The events recorded at `level`.
    pub(crate) fn events(&self, level: Level) -> Vec<CapturedEvent> {
        self.0.lock().iter().filter(|e| e.level == level).cloned().collect()
    }

    /// The `code` field of every error event.
    pub(crate) fn error_codes(&self) -> Vec<String> {
        self.events(Level::ERROR).into_iter().filter_map(|e| e.fields.get("code").cloned()).collect()
    }
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.0.lock().push(CapturedEvent { level: *event.metadata().level(), fields: visitor.0 });
    }
}

#[derive(Default)]
struct FieldVisitor(HashMap<&'static str, String>);

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name(), format!("{value:?}"));
    }
}

/// A status message with every field set.
pub(crate) fn test_status() -> StatusMessage {
    StatusMessage {
        fork_digest: [1, 2, 3, 4],
        finalized_root: [5; 32],
        finalized_epoch: 10,
        head_root: [6; 32],
        head_slot: 330,
    }
}
