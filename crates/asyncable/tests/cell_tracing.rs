//! Log events emitted by the cell engine, captured with a `tracing` layer.

use std::sync::{Arc, Mutex};

use asyncable::prelude::*;
use futures::executor::LocalPool;
use tracing::Subscriber;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};

#[derive(Debug, Clone, PartialEq)]
struct Captured {
    message: String,
    cell: Option<String>,
}

struct CellTraceCapture {
    events: Arc<Mutex<Vec<Captured>>>,
}

impl<S> Layer<S> for CellTraceCapture
where
    S: Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        #[derive(Default)]
        struct Fields {
            message: Option<String>,
            cell: Option<String>,
        }
        impl tracing::field::Visit for Fields {
            fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                match field.name() {
                    "message" => self.message = Some(value.to_string()),
                    "cell" => self.cell = Some(value.to_string()),
                    _ => {}
                }
            }

            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                let text = format!("{value:?}").trim_matches('"').to_string();
                match field.name() {
                    "message" => self.message = Some(text),
                    "cell" => self.cell = Some(text),
                    _ => {}
                }
            }
        }
        let mut fields = Fields::default();
        event.record(&mut fields);
        if let Some(message) = fields.message {
            self.events.lock().expect("trace lock").push(Captured {
                message,
                cell: fields.cell,
            });
        }
    }
}

fn capture() -> (Arc<Mutex<Vec<Captured>>>, tracing::subscriber::DefaultGuard) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(CellTraceCapture {
        events: Arc::clone(&events),
    });
    (events, tracing::subscriber::set_default(subscriber))
}

fn count(events: &Mutex<Vec<Captured>>, message: &str, cell: &str) -> usize {
    events
        .lock()
        .expect("trace lock")
        .iter()
        .filter(|e| e.message == message && e.cell.as_deref() == Some(cell))
        .count()
}

#[test]
fn supersession_is_logged_per_cell() {
    let (events, _guard) = capture();
    let mut pool = LocalPool::new();
    let config = CellConfig::new(pool.spawner()).with_label("profile");
    let cell = AsyncReadable::independent(&config, |_| async { Ok::<_, String>(1) });

    let first = cell.update();
    let second = cell.update();
    assert_eq!(pool.run_until(first).ok(), Some(1));
    assert_eq!(pool.run_until(second).ok(), Some(1));

    assert_eq!(count(&events, "cell.refresh.supersedes_read", "profile"), 2);
    assert_eq!(count(&events, "cell.refresh.superseded", "profile"), 1);
    assert_eq!(count(&events, "cell.getter.invoke", "profile"), 1);
    assert!(
        events
            .lock()
            .expect("trace lock")
            .iter()
            .any(|e| e.message == "cancel.token.cancelled"),
        "expected token cancellation event"
    );
}

#[test]
fn unchanged_refresh_skips_getter() {
    let (events, _guard) = capture();
    let mut pool = LocalPool::new();
    let config = CellConfig::new(pool.spawner()).with_label("stable");
    let cell = AsyncReadable::independent(&config, |_| async { Ok::<_, String>(3) });

    pool.run_until(cell.get().settle()).expect("load");
    let _sub = cell.subscribe(|_| {});
    pool.run_until_stalled();

    assert_eq!(count(&events, "cell.getter.invoke", "stable"), 1);
    assert_eq!(count(&events, "cell.refresh.unchanged", "stable"), 1);
}

#[test]
fn rollback_and_reflection_are_logged() {
    let (events, _guard) = capture();
    let mut pool = LocalPool::new();
    let base_config = CellConfig::new(pool.spawner()).with_label("base");
    let base = AsyncReadable::independent(&base_config, |_| async { Ok::<_, String>(1) });
    let config = CellConfig::new(pool.spawner()).with_label("editor");
    let editor = asyncable_writable(
        &config,
        (&base, true),
        |_, parents: Vec<i32>| async move { Ok::<_, String>(parents[0]) },
        |_, (new, _): (i32, Option<i32>), _: Vec<i32>| async move {
            if new < 0 {
                Err("negative".to_string())
            } else {
                Ok(None)
            }
        },
    );
    pool.run_until(editor.update()).expect("load");

    pool.run_until(editor.set(5)).expect("write");
    pool.run_until(editor.set(-1)).expect_err("rejected");
    pool.run_until_stalled();

    assert_eq!(count(&events, "cell.write.reflect", "editor"), 1);
    assert_eq!(count(&events, "cell.write.rollback", "editor"), 1);
    assert_eq!(count(&events, "cell.setter.invoke", "editor"), 2);
    assert_eq!(count(&events, "cell.getter.invoke", "base"), 2);
}
