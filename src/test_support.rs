//! Captures `tracing` events on the current thread for assertions.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

pub(crate) type Fields = HashMap<&'static str, String>;

#[derive(Default)]
struct Visitor(Fields);

impl Visit for Visitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name(), value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name(), format!("{value:?}"));
    }
}

#[derive(Clone, Default)]
pub(crate) struct Captured(Arc<Mutex<Vec<(Level, Fields)>>>);

impl<S: Subscriber> Layer<S> for Captured {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = Visitor::default();
        event.record(&mut visitor);
        self.0.lock().unwrap().push((*event.metadata().level(), visitor.0));
    }
}

impl Captured {
    /// Fields of every event at `level`, in emission order.
    pub(crate) fn at(&self, level: Level) -> Vec<Fields> {
        self.0.lock().unwrap().iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, fields)| fields.clone())
            .collect()
    }

    /// Access-log events: `INFO` events tagged with `logger = name`.
    pub(crate) fn served_by(&self, name: &str) -> Vec<Fields> {
        self.at(Level::INFO).into_iter()
            .filter(|fields| fields.get("logger").is_some_and(|l| l == name))
            .collect()
    }
}

/// Installs a capturing subscriber as this thread's default until the guard
/// drops. Tasks spawned on a current-thread runtime share it.
pub(crate) fn capture() -> (Captured, DefaultGuard) {
    let captured = Captured::default();
    let subscriber = tracing_subscriber::registry().with(captured.clone());
    let guard = tracing::subscriber::set_default(subscriber);
    (captured, guard)
}
