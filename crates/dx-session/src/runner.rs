//! Async driver for one [`Session`].

use std::sync::Arc;
use std::time::Duration;

use dx_protocol::EcuDiagnosticRecord;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::{SessionError, SessionResult};
use crate::session::{Session, SessionAction, SessionEvent};
use crate::transport::{RecordPublisher, RequestSink};

/// How long a phase may wait for outstanding responses.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(2);

/// Capacity of a session's inbound event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Drives a session from its event channel, arming the keep-alive window
/// every time requests go out.
pub struct SessionRunner {
    session: Session,
    sink: Arc<dyn RequestSink>,
    publisher: Arc<dyn RecordPublisher>,
    events: mpsc::Receiver<SessionEvent>,
    keep_alive: Duration,
}

impl SessionRunner {
    pub fn new(
        session: Session,
        sink: Arc<dyn RequestSink>,
        publisher: Arc<dyn RecordPublisher>,
        events: mpsc::Receiver<SessionEvent>,
    ) -> Self {
        Self {
            session,
            sink,
            publisher,
            events,
            keep_alive: DEFAULT_KEEP_ALIVE,
        }
    }

    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run one cycle until it is published or cancelled.
    ///
    /// Returns the published record, or `None` when the cycle was cancelled
    /// before any data arrived. A closed event channel counts as a cancel.
    /// Events queued before the cycle starts belong to no cycle and are
    /// discarded, including a `Cancel` sent while idle.
    pub async fn run_cycle(&mut self) -> SessionResult<Option<EcuDiagnosticRecord>> {
        if self.session.is_active() {
            return Err(SessionError::AlreadyActive);
        }
        self.discard_stale_events();
        let actions = self.session.start()?;
        let mut deadline = Instant::now() + self.keep_alive;
        let mut published = self.dispatch(actions, &mut deadline).await;

        while self.session.is_active() {
            let event = tokio::select! {
                event = self.events.recv() => event.unwrap_or_else(|| {
                    tracing::warn!(
                        ecu_type = ?self.session.ecu_type(),
                        "event channel closed, cancelling cycle"
                    );
                    SessionEvent::Cancel
                }),
                () = tokio::time::sleep_until(deadline) => {
                    tracing::debug!(
                        waited_ms = self.keep_alive.as_millis() as u64,
                        outstanding = self.session.outstanding(),
                        "keep-alive window elapsed"
                    );
                    SessionEvent::KeepAliveExpired
                }
            };
            let actions = self.session.handle(event);
            if let Some(record) = self.dispatch(actions, &mut deadline).await {
                published = Some(record);
            }
        }

        Ok(published)
    }

    fn discard_stale_events(&mut self) {
        let mut discarded = 0usize;
        while let Ok(event) = self.events.try_recv() {
            tracing::debug!(event = ?event, "discarding event from outside any cycle");
            discarded += 1;
        }
        if discarded > 0 {
            tracing::info!(
                ecu_type = ?self.session.ecu_type(),
                discarded,
                "dropped stale events before cycle start"
            );
        }
    }

    async fn dispatch(
        &self,
        actions: Vec<SessionAction>,
        deadline: &mut Instant,
    ) -> Option<EcuDiagnosticRecord> {
        let mut published = None;
        for action in actions {
            match action {
                SessionAction::Send(request) => {
                    self.sink.send_request(request).await;
                    *deadline = Instant::now() + self.keep_alive;
                }
                SessionAction::Publish(record) => {
                    self.publisher.publish((*record).clone()).await;
                    published = Some(*record);
                }
            }
        }
        published
    }
}
