//! Common test utilities for storage integration tests.

#![allow(dead_code)]

use jarstore_storage::{JarOp, MemoryJar, StorageConfig, StorageMode, ValueEncoding};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// Raw-encoded config for readable assertions
pub fn raw_config(mode: StorageMode) -> StorageConfig {
    StorageConfig {
        mode,
        encoding: ValueEncoding::Raw,
        ..Default::default()
    }
}

/// Jar seeded with `pairs`
pub async fn seeded_jar(pairs: &[(&str, &str)]) -> Arc<MemoryJar> {
    let jar = Arc::new(MemoryJar::new());
    jar.seed(pairs).await;
    jar
}

/// `name=value` pairs of the jar, joined like a cookie header
pub async fn jar_header(jar: &MemoryJar) -> String {
    jar.snapshot()
        .await
        .iter()
        .map(|r| format!("{}={}", r.name, r.value))
        .collect::<Vec<_>>()
        .join(";")
}

/// Names of every instruction in each bulk write, in order
pub async fn written_batches(jar: &MemoryJar) -> Vec<Vec<String>> {
    jar.ops()
        .await
        .into_iter()
        .filter_map(|op| match op {
            JarOp::WriteAll { batch } => Some(batch.into_iter().map(|i| i.name).collect()),
            _ => None,
        })
        .collect()
}

/// Records WARN-level event messages
#[derive(Clone, Default)]
pub struct WarningCapture {
    messages: Arc<Mutex<Vec<String>>>,
}

impl WarningCapture {
    /// Install as the thread's default subscriber for the guard's lifetime
    pub fn install() -> (Self, DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    /// Captured warning messages
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl<S: Subscriber> Layer<S> for WarningCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::WARN {
            return;
        }
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.messages.lock().unwrap().push(visitor.0);
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}
