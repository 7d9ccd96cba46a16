//! Host side of the preview message channel.
//!
//! At most one execution context is attached at a time. The host sends it
//! `eval` messages; the context reports back through the [`ContextPort`]
//! handed out by [`PreviewChannel::attach`]. Each attach starts a new
//! generation: ports from earlier generations are closed and a fresh
//! readiness latch must be resolved by a new `ready` message.

use crate::message::{ConsoleMessage, EvalPayload, PreviewError, PreviewMessage};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};

/// How long callers usually wait for a context to bootstrap.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_millis(5000);

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("preview context did not become ready within {0:?}")]
    Timeout(Duration),
    #[error("no preview context is attached")]
    NotAttached,
    #[error("preview context is closed")]
    Closed,
    #[error("malformed preview message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("preview context could not accept the message: {0}")]
    Delivery(String),
}

/// Where the preview runs: a browser frame, a headless page, a file sink.
pub trait ExecutionContext: Send + Sync {
    /// Deliver a host message. Delivery is fire-and-forget.
    fn post(&self, message: PreviewMessage) -> Result<(), ChannelError>;
}

/// Context feedback, fanned out to every subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewEvent {
    Ready,
    Error(PreviewError),
    Console(ConsoleMessage),
}

struct Attachment {
    context: Arc<dyn ExecutionContext>,
    ready: watch::Sender<bool>,
}

#[derive(Default)]
struct Slot {
    generation: u64,
    attached: Option<Attachment>,
}

struct Shared {
    slot: Mutex<Slot>,
    events: broadcast::Sender<PreviewEvent>,
}

impl Shared {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone)]
pub struct PreviewChannel {
    shared: Arc<Shared>,
}

impl PreviewChannel {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot::default()),
                events,
            }),
        }
    }

    /// Attach a context, replacing the current one. The returned port is
    /// how the context reports `ready`, `error` and `console` messages.
    pub fn attach(&self, context: Arc<dyn ExecutionContext>) -> ContextPort {
        let mut slot = self.shared.slot();
        if slot.attached.is_some() {
            tracing::debug!(generation = slot.generation, "replacing preview context");
        }
        slot.generation += 1;
        let (ready, _) = watch::channel(false);
        slot.attached = Some(Attachment { context, ready });
        ContextPort {
            shared: self.shared.clone(),
            generation: slot.generation,
        }
    }

    /// Drop the current context. Its port is closed.
    pub fn detach(&self) {
        let mut slot = self.shared.slot();
        if slot.attached.take().is_some() {
            slot.generation += 1;
        }
    }

    pub fn is_attached(&self) -> bool {
        self.shared.slot().attached.is_some()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PreviewEvent> {
        self.shared.events.subscribe()
    }

    /// Wait until the attached context reports `ready`. Returns `false` on
    /// timeout, when nothing is attached, or when the context is replaced
    /// while waiting.
    pub async fn await_ready(&self, timeout: Duration) -> bool {
        let ready = self
            .shared
            .slot()
            .attached
            .as_ref()
            .map(|attachment| attachment.ready.subscribe());
        let Some(mut ready) = ready else {
            return false;
        };
        let resolved = matches!(
            tokio::time::timeout(timeout, ready.wait_for(|ready| *ready)).await,
            Ok(Ok(_))
        );
        resolved
    }

    /// [`await_ready`](Self::await_ready) as an error.
    pub async fn ensure_ready(&self, timeout: Duration) -> Result<(), ChannelError> {
        if self.await_ready(timeout).await {
            Ok(())
        } else {
            Err(ChannelError::Timeout(timeout))
        }
    }

    /// Send a bundle to the attached context. No acknowledgement follows
    /// other than later `console`/`error` events.
    pub fn eval(&self, payload: impl Into<EvalPayload>) -> Result<(), ChannelError> {
        let context = self
            .shared
            .slot()
            .attached
            .as_ref()
            .map(|attachment| attachment.context.clone());
        let Some(context) = context else {
            tracing::warn!("preview context is not attached, dropping eval");
            return Err(ChannelError::NotAttached);
        };
        context.post(PreviewMessage::Eval(payload.into()))
    }
}

impl Default for PreviewChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PreviewChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.shared.slot();
        f.debug_struct("PreviewChannel")
            .field("generation", &slot.generation)
            .field("attached", &slot.attached.is_some())
            .finish()
    }
}

/// The context's handle for reporting back to the host.
#[derive(Clone)]
pub struct ContextPort {
    shared: Arc<Shared>,
    generation: u64,
}

impl ContextPort {
    /// Report a message. Fails with [`ChannelError::Closed`] once the
    /// context has been detached or replaced.
    pub fn post(&self, message: PreviewMessage) -> Result<(), ChannelError> {
        let event = {
            let slot = self.shared.slot();
            let attachment = match &slot.attached {
                Some(attachment) if slot.generation == self.generation => attachment,
                _ => return Err(ChannelError::Closed),
            };
            match message {
                PreviewMessage::Ready => {
                    attachment.ready.send_replace(true);
                    PreviewEvent::Ready
                }
                PreviewMessage::Error { value } => PreviewEvent::Error(value),
                PreviewMessage::Console(console) => PreviewEvent::Console(console),
                PreviewMessage::Eval(_) => {
                    tracing::debug!("ignoring eval message sent by the preview context");
                    return Ok(());
                }
            }
        };
        // No subscribers is fine.
        let _ = self.shared.events.send(event);
        Ok(())
    }

    /// Report a raw JSON message.
    pub fn post_json(&self, raw: &str) -> Result<(), ChannelError> {
        self.post(serde_json::from_str(raw)?)
    }

    pub fn is_closed(&self) -> bool {
        let slot = self.shared.slot();
        slot.attached.is_none() || slot.generation != self.generation
    }
}

impl std::fmt::Debug for ContextPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextPort")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ConsoleLevel;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Recorder {
        received: Mutex<Vec<PreviewMessage>>,
    }

    impl ExecutionContext for Recorder {
        fn post(&self, message: PreviewMessage) -> Result<(), ChannelError> {
            self.received.lock().unwrap().push(message);
            Ok(())
        }
    }

    fn payload() -> EvalPayload {
        EvalPayload {
            modules: Default::default(),
            main_module: "App".to_string(),
            css: String::new(),
            import_map_code: None,
        }
    }

    const SHORT: Duration = Duration::from_millis(20);

    #[tokio::test]
    async fn test_readiness_timeout_returns_false() {
        let channel = PreviewChannel::new();
        assert!(!channel.await_ready(SHORT).await);

        let _port = channel.attach(Arc::new(Recorder::default()));
        assert!(!channel.await_ready(SHORT).await);
        assert!(matches!(
            channel.ensure_ready(SHORT).await,
            Err(ChannelError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn test_ready_resolves_waiters() {
        let channel = PreviewChannel::new();
        let port = channel.attach(Arc::new(Recorder::default()));

        let waiter = tokio::spawn({
            let channel = channel.clone();
            async move { channel.await_ready(DEFAULT_READY_TIMEOUT).await }
        });
        tokio::task::yield_now().await;
        port.post_json(r#"{"type":"ready"}"#).unwrap();
        assert!(waiter.await.unwrap());

        // The latch stays resolved for later callers.
        assert!(channel.await_ready(SHORT).await);
    }

    #[tokio::test]
    async fn test_reattach_drops_old_port_and_latch() {
        let channel = PreviewChannel::new();
        let mut events = channel.subscribe();
        let old = channel.attach(Arc::new(Recorder::default()));
        old.post(PreviewMessage::Ready).unwrap();
        assert_eq!(events.recv().await.unwrap(), PreviewEvent::Ready);

        let new = channel.attach(Arc::new(Recorder::default()));
        assert!(old.is_closed());
        assert!(matches!(old.post(PreviewMessage::Ready), Err(ChannelError::Closed)));
        assert!(!channel.await_ready(SHORT).await);
        assert!(events.try_recv().is_err());

        new.post(PreviewMessage::Ready).unwrap();
        assert!(channel.await_ready(SHORT).await);
    }

    #[tokio::test]
    async fn test_events_are_broadcast() {
        let channel = PreviewChannel::new();
        let mut events = channel.subscribe();
        let port = channel.attach(Arc::new(Recorder::default()));

        port.post_json(r#"{"type":"console","level":"log","args":["hi"]}"#)
            .unwrap();
        port.post_json(r#"{"type":"error","value":{"message":"boom"}}"#)
            .unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            PreviewEvent::Console(ConsoleMessage {
                level: ConsoleLevel::Log,
                args: vec!["hi".to_string()],
            })
        );
        assert_eq!(
            events.recv().await.unwrap(),
            PreviewEvent::Error(PreviewError {
                message: "boom".to_string(),
                ..PreviewError::default()
            })
        );
        assert!(matches!(
            port.post_json("{\"type\":"),
            Err(ChannelError::Malformed(_))
        ));
    }

    #[test]
    fn test_eval_is_delivered_to_the_attached_context() {
        let channel = PreviewChannel::new();
        assert!(matches!(channel.eval(payload()), Err(ChannelError::NotAttached)));

        let recorder = Arc::new(Recorder::default());
        let _port = channel.attach(recorder.clone());
        channel.eval(payload()).unwrap();
        assert_eq!(
            *recorder.received.lock().unwrap(),
            [PreviewMessage::Eval(payload())]
        );

        channel.detach();
        assert!(!channel.is_attached());
        assert!(matches!(channel.eval(payload()), Err(ChannelError::NotAttached)));
    }
}
