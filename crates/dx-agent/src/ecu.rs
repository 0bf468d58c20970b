//! One polling task per configured ECU.

use std::sync::Arc;
use std::time::Duration;

use dx_decoder::Catalog;
use dx_session::runner::EVENT_CHANNEL_CAPACITY;
use dx_session::{RecordPublisher, RequestSink, Session, SessionEvent, SessionRunner};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::config::{AgentConfig, EcuConfig};
use crate::simulation;

/// A running ECU poller.
pub struct EcuTask {
    /// Injects events (e.g. `Cancel`) into the ECU's session.
    pub events: mpsc::Sender<SessionEvent>,
    pub handle: JoinHandle<()>,
}

impl EcuTask {
    /// Cancel the in-progress cycle, if any.
    pub fn cancel(&self) {
        if let Err(e) = self.events.try_send(SessionEvent::Cancel) {
            tracing::warn!(error = %e, "failed to deliver cancel");
        }
    }
}

/// Spawn a poller for `ecu` against the simulated vehicle.
pub fn spawn_simulated(
    config: &AgentConfig,
    ecu: &EcuConfig,
    catalog: Arc<Catalog>,
    publisher: Arc<dyn RecordPublisher>,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<EcuTask> {
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let sink: Arc<dyn RequestSink> = Arc::new(simulation::demo_ecu(
        ecu.resolved_type(),
        &ecu.vin,
        tx.clone(),
    ));
    spawn(config, ecu, catalog, sink, publisher, (tx, rx), shutdown)
}

/// Spawn a poller for `ecu` over an arbitrary transport.
///
/// `channel` is the session's event channel; the transport must deliver
/// its responses to the sender half.
pub fn spawn(
    config: &AgentConfig,
    ecu: &EcuConfig,
    catalog: Arc<Catalog>,
    sink: Arc<dyn RequestSink>,
    publisher: Arc<dyn RecordPublisher>,
    channel: (mpsc::Sender<SessionEvent>, mpsc::Receiver<SessionEvent>),
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<EcuTask> {
    let (events, rx) = channel;
    let modes = config.service_modes()?;
    let session = Session::new(catalog, ecu.resolved_type(), ecu.vin.clone(), modes)?;
    let runner =
        SessionRunner::new(session, sink, publisher, rx).with_keep_alive(config.keep_alive());
    let handle = tokio::spawn(run(runner, config.cycle_interval(), shutdown));
    Ok(EcuTask { events, handle })
}

/// Run cycles every `interval` until `shutdown` flips.
///
/// A cycle that overruns the interval delays the next one rather than
/// bursting to catch up.
pub async fn run(
    mut runner: SessionRunner,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let ecu_type = runner.session().ecu_type();

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }
        if *shutdown.borrow() {
            break;
        }

        match runner.run_cycle().await {
            Ok(Some(record)) => tracing::debug!(
                ecu_type = ?ecu_type,
                cycle_id = %record.cycle_id,
                signals = record.signal_count(),
                "cycle complete"
            ),
            Ok(None) => {
                tracing::info!(ecu_type = ?ecu_type, "cycle cancelled before any data arrived")
            }
            Err(e) => tracing::warn!(ecu_type = ?ecu_type, error = %e, "cycle did not start"),
        }
    }

    tracing::info!(ecu_type = ?ecu_type, "poller stopped");
}
