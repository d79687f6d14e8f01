//! Command bus (§4.7): `(name, payload)` requests are dispatched
//! sequentially to handlers registered by name, on a single worker task, so
//! a slow handler never blocks the caller — only the next command behind it
//! in the queue.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use super::error::{BusError, Result};

pub type CommandHandler = Arc<dyn Fn(Value) -> Pin<Box<dyn Future<Output = Result<Value>> + Send>> + Send + Sync>;

struct Request {
    name: String,
    payload: Value,
    reply: oneshot::Sender<Result<Value>>,
}

/// Client-facing handle. Cloning shares the same worker task and handler
/// table.
#[derive(Clone)]
pub struct CommandBus {
    tx: mpsc::UnboundedSender<Request>,
}

impl CommandBus {
    /// Spawns the sequential dispatch worker and returns a handle plus its
    /// handler-registration side. Handlers are registered before the bus is
    /// handed to any caller, so there is no race between registration and
    /// dispatch in practice — the table is still behind a `Mutex` since
    /// nothing prevents registering one after startup.
    pub fn new() -> (Self, CommandRegistry) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Request>();
        let handlers: Arc<parking_lot::Mutex<HashMap<String, CommandHandler>>> =
            Arc::new(parking_lot::Mutex::new(HashMap::new()));
        let worker_handlers = handlers.clone();

        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                let handler = worker_handlers.lock().get(&request.name).cloned();
                let result = match handler {
                    Some(handler) => handler(request.payload).await,
                    None => Err(BusError::UnknownCommand(request.name.clone())),
                };
                if request.reply.send(result).is_err() {
                    warn!(name = %request.name, "command caller dropped before reply was sent");
                }
            }
        });

        (Self { tx }, CommandRegistry { handlers })
    }

    /// Submits a command and awaits its result. Never blocks on the
    /// handler itself — only on the worker's existing queue, if any.
    pub async fn submit(&self, name: impl Into<String>, payload: Value) -> Result<Value> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request { name: name.into(), payload, reply })
            .map_err(|_| BusError::Closed)?;
        rx.await.map_err(|_| BusError::Closed)?
    }
}

/// Handler-registration side, kept separate from `CommandBus` so HTTP
/// handlers only ever see the submit-only half.
#[derive(Clone)]
pub struct CommandRegistry {
    handlers: Arc<parking_lot::Mutex<HashMap<String, CommandHandler>>>,
}

impl CommandRegistry {
    pub fn register(&self, name: impl Into<String>, handler: CommandHandler) {
        self.handlers.lock().insert(name.into(), handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dispatches_to_registered_handler() {
        let (bus, registry) = CommandBus::new();
        registry.register(
            "echo",
            Arc::new(|payload| Box::pin(async move { Ok(payload) })),
        );

        let result = bus.submit("echo", serde_json::json!({"a": 1})).await.unwrap();
        assert_eq!(result, serde_json::json!({"a": 1}));
    }

    #[tokio::test]
    async fn unknown_command_returns_not_found() {
        let (bus, _registry) = CommandBus::new();
        let err = bus.submit("nope", Value::Null).await.unwrap_err();
        assert!(matches!(err, BusError::UnknownCommand(name) if name == "nope"));
    }

    #[tokio::test]
    async fn commands_dispatch_sequentially() {
        let (bus, registry) = CommandBus::new();
        let order = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let o1 = order.clone();
        registry.register(
            "slow",
            Arc::new(move |_payload| {
                let o1 = o1.clone();
                Box::pin(async move {
                    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                    o1.lock().await.push("slow");
                    Ok(Value::Null)
                })
            }),
        );
        let o2 = order.clone();
        registry.register(
            "fast",
            Arc::new(move |_payload| {
                let o2 = o2.clone();
                Box::pin(async move {
                    o2.lock().await.push("fast");
                    Ok(Value::Null)
                })
            }),
        );

        let a = bus.submit("slow", Value::Null);
        let b = bus.submit("fast", Value::Null);
        let _ = tokio::join!(a, b);
        assert_eq!(*order.lock().await, vec!["slow", "fast"]);
    }
}
