//! Diagnostic session state machine.
//!
//! One [`Session`] per ECU. A cycle walks the planned service modes in
//! order:
//!
//! ```text
//! Idle ─start─▶ Discovering(mode) ─anchors done─▶ Polling(mode) ─all answered─▶ next mode …
//!                                                                 └─ last mode ─▶ Publishing ─▶ Idle
//! ```
//!
//! Modes without bitmask discovery go straight to `Polling`. Keep-alive
//! expiry ends the current wait and moves on; `Cancel` publishes whatever
//! was collected, or returns to `Idle` if nothing was.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dx_decoder::{
    Catalog, SupportedParameterSet, decode_dtc_block, decode_parameter, decode_vin,
    resolve_supported, safety,
};
use dx_protocol::{
    CycleStats, DtcSnapshot, EcuDiagnosticRecord, EcuType, Pid, Request, ServiceMode, SignalGroup,
};
use uuid::Uuid;

use crate::error::{SessionError, SessionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// Waiting for "PIDs supported" bitmasks.
    Discovering { mode: ServiceMode },
    /// Waiting for data or DTC responses.
    Polling { mode: ServiceMode },
    Publishing,
}

/// Inbound events from the transport and the keep-alive timer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Response {
        mode: ServiceMode,
        pid: Pid,
        /// Payload after the mode/PID echo.
        bytes: Vec<u8>,
        received_at: DateTime<Utc>,
    },
    /// The transport gave up on one request.
    Timeout { mode: ServiceMode, pid: Pid },
    /// Outstanding requests of the current phase will not be answered.
    KeepAliveExpired,
    /// ECU disconnect or shutdown.
    Cancel,
}

impl SessionEvent {
    /// Response to `request` received now.
    pub fn response(request: Request, bytes: impl Into<Vec<u8>>) -> Self {
        SessionEvent::Response {
            mode: request.mode,
            pid: request.pid,
            bytes: bytes.into(),
            received_at: Utc::now(),
        }
    }

    pub fn timeout(request: Request) -> Self {
        SessionEvent::Timeout {
            mode: request.mode,
            pid: request.pid,
        }
    }
}

/// What the host must do after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    Send(Request),
    Publish(Box<EcuDiagnosticRecord>),
}

/// State owned by one in-progress cycle.
#[derive(Debug)]
struct Cycle {
    id: Uuid,
    remaining: VecDeque<ServiceMode>,
    pending: BTreeSet<Request>,
    anchors: BTreeMap<Pid, Vec<u8>>,
    supported: BTreeMap<ServiceMode, SupportedParameterSet>,
    groups: Vec<SignalGroup>,
    snapshots: Vec<DtcSnapshot>,
    stats: CycleStats,
}

impl Cycle {
    fn new(plan: &[ServiceMode]) -> Self {
        Self {
            id: Uuid::now_v7(),
            remaining: plan.iter().copied().collect(),
            pending: BTreeSet::new(),
            anchors: BTreeMap::new(),
            supported: BTreeMap::new(),
            groups: Vec::new(),
            snapshots: Vec::new(),
            stats: CycleStats::default(),
        }
    }

    /// Any response decoded this cycle, including a VIN alone.
    fn has_data(&self) -> bool {
        self.stats.decoded > 0
    }

    fn group_mut(&mut self, mode: ServiceMode) -> &mut SignalGroup {
        let index = match self.groups.iter().position(|g| g.mode == mode) {
            Some(index) => index,
            None => {
                self.groups.push(SignalGroup::new(mode));
                self.groups.len() - 1
            }
        };
        &mut self.groups[index]
    }

    /// Queue data requests; each counts toward `stats.requested`.
    fn issue(&mut self, requests: Vec<Request>, actions: &mut Vec<SessionAction>) {
        for request in requests {
            if self.pending.insert(request) {
                self.stats.requested += 1;
                actions.push(SessionAction::Send(request));
            }
        }
    }
}

/// Polling session for one ECU.
#[derive(Debug)]
pub struct Session {
    catalog: Arc<Catalog>,
    ecu_type: EcuType,
    vin: String,
    plan: Vec<ServiceMode>,
    state: SessionState,
    cycle: Option<Cycle>,
}

impl Session {
    /// Create an idle session that polls `plan` in order each cycle.
    ///
    /// Fails if any planned mode is not read-only.
    pub fn new(
        catalog: Arc<Catalog>,
        ecu_type: EcuType,
        vin: impl Into<String>,
        plan: Vec<ServiceMode>,
    ) -> SessionResult<Self> {
        if let Some(&mode) = plan.iter().find(|m| !safety::is_mode_pollable(**m)) {
            return Err(SessionError::ModeNotPollable { mode });
        }
        Ok(Self {
            catalog,
            ecu_type,
            vin: vin.into(),
            plan,
            state: SessionState::Idle,
            cycle: None,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != SessionState::Idle
    }

    pub fn ecu_type(&self) -> EcuType {
        self.ecu_type
    }

    /// Configured VIN, or the one last reported by the ECU.
    pub fn vin(&self) -> &str {
        &self.vin
    }

    /// Supported set resolved this cycle for `mode`, intersected with the
    /// catalog.
    pub fn supported(&self, mode: ServiceMode) -> Option<&SupportedParameterSet> {
        self.cycle.as_ref().and_then(|c| c.supported.get(&mode))
    }

    /// Requests awaiting a response or timeout.
    pub fn outstanding(&self) -> usize {
        self.cycle.as_ref().map_or(0, |c| c.pending.len())
    }

    /// Begin a cycle. Discovery state from any previous cycle is discarded.
    pub fn start(&mut self) -> SessionResult<Vec<SessionAction>> {
        if self.is_active() {
            return Err(SessionError::AlreadyActive);
        }
        let cycle = Cycle::new(&self.plan);
        tracing::debug!(
            cycle_id = %cycle.id,
            ecu_type = ?self.ecu_type,
            modes = self.plan.len(),
            "cycle started"
        );
        self.cycle = Some(cycle);

        let mut actions = Vec::new();
        self.advance(&mut actions);
        Ok(actions)
    }

    /// Apply one event and return the resulting actions.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        if !self.is_active() {
            tracing::debug!(event = ?event, "event ignored while idle");
            return actions;
        }
        match event {
            SessionEvent::Response {
                mode,
                pid,
                bytes,
                received_at,
            } => self.on_response(Request::new(mode, pid), &bytes, received_at, &mut actions),
            SessionEvent::Timeout { mode, pid } => {
                self.on_timeout(Request::new(mode, pid), &mut actions)
            }
            SessionEvent::KeepAliveExpired => self.on_keep_alive_expired(&mut actions),
            SessionEvent::Cancel => self.on_cancel(&mut actions),
        }
        actions
    }

    /// Request one extra parameter during polling.
    ///
    /// Only parameters the ECU reported (discovery modes) or that the fixed
    /// table lists (other modes) are accepted; anything else is rejected
    /// before a request exists.
    pub fn request_parameter(&mut self, mode: ServiceMode, pid: Pid) -> SessionResult<Request> {
        if !safety::is_mode_pollable(mode) {
            return Err(SessionError::ModeNotPollable { mode });
        }
        if !matches!(self.state, SessionState::Polling { .. }) {
            return Err(SessionError::NotPolling);
        }
        let Some(cycle) = self.cycle.as_mut() else {
            return Err(SessionError::NotPolling);
        };

        let request = Request::new(mode, pid);
        let supported = if mode.uses_bitmask_discovery() {
            cycle.supported.get(&mode).is_some_and(|s| s.contains(pid))
        } else {
            self.catalog.fixed_requests(mode).contains(&request)
        };
        if !supported {
            return Err(SessionError::UnsupportedParameter { mode, pid });
        }

        if cycle.pending.insert(request) {
            cycle.stats.requested += 1;
        }
        Ok(request)
    }

    fn on_response(
        &mut self,
        request: Request,
        bytes: &[u8],
        received_at: DateTime<Utc>,
        actions: &mut Vec<SessionAction>,
    ) {
        let Some(cycle) = self.cycle.as_mut() else {
            return;
        };
        if !cycle.pending.remove(&request) {
            tracing::debug!(request = %request, "unsolicited response ignored");
            return;
        }
        match self.state {
            SessionState::Discovering { .. } => {
                cycle.anchors.insert(request.pid, bytes.to_vec());
            }
            _ => record_response(
                &self.catalog,
                cycle,
                &mut self.vin,
                request,
                bytes,
                received_at,
            ),
        }
        self.finish_phase_if_done(actions);
    }

    fn on_timeout(&mut self, request: Request, actions: &mut Vec<SessionAction>) {
        let Some(cycle) = self.cycle.as_mut() else {
            return;
        };
        if !cycle.pending.remove(&request) {
            return;
        }
        tracing::debug!(request = %request, "request timed out");
        if matches!(self.state, SessionState::Polling { .. }) {
            cycle.stats.timed_out += 1;
        }
        self.finish_phase_if_done(actions);
    }

    fn on_keep_alive_expired(&mut self, actions: &mut Vec<SessionAction>) {
        let Some(cycle) = self.cycle.as_mut() else {
            return;
        };
        let expired = std::mem::take(&mut cycle.pending);
        if !expired.is_empty() {
            tracing::warn!(
                cycle_id = %cycle.id,
                state = ?self.state,
                outstanding = expired.len(),
                "keep-alive expired, treating outstanding requests as timed out"
            );
        }
        if matches!(self.state, SessionState::Polling { .. }) {
            cycle.stats.timed_out += expired.len();
        }
        self.finish_phase_if_done(actions);
    }

    fn on_cancel(&mut self, actions: &mut Vec<SessionAction>) {
        let Some(mut cycle) = self.cycle.take() else {
            self.state = SessionState::Idle;
            return;
        };
        if matches!(self.state, SessionState::Polling { .. }) {
            cycle.stats.timed_out += cycle.pending.len();
        }
        cycle.pending.clear();

        if cycle.has_data() {
            tracing::info!(cycle_id = %cycle.id, "cycle cancelled, publishing partial data");
            self.publish(cycle, actions);
        } else {
            tracing::info!(cycle_id = %cycle.id, "cycle cancelled with no data");
            self.state = SessionState::Idle;
        }
    }

    /// Leave the current phase once nothing is outstanding.
    fn finish_phase_if_done(&mut self, actions: &mut Vec<SessionAction>) {
        let Some(cycle) = self.cycle.as_mut() else {
            return;
        };
        if !cycle.pending.is_empty() {
            return;
        }

        if let SessionState::Discovering { mode } = self.state {
            let anchors = std::mem::take(&mut cycle.anchors);
            let supported =
                resolve_supported(&self.catalog, mode, &anchors).intersect_known(&self.catalog);
            let requests: Vec<Request> =
                supported.iter().map(|pid| Request::new(mode, pid)).collect();
            tracing::debug!(
                mode = %mode,
                anchors_answered = anchors.len(),
                pollable = requests.len(),
                "discovery finished"
            );
            cycle.supported.insert(mode, supported);

            if !requests.is_empty() {
                self.state = SessionState::Polling { mode };
                cycle.issue(requests, actions);
                return;
            }
        }

        self.advance(actions);
    }

    /// Start the next planned mode that has something to request, or
    /// publish when none remain.
    fn advance(&mut self, actions: &mut Vec<SessionAction>) {
        loop {
            let next = self.cycle.as_mut().and_then(|c| c.remaining.pop_front());
            let Some(mode) = next else {
                match self.cycle.take() {
                    Some(cycle) => self.publish(cycle, actions),
                    None => self.state = SessionState::Idle,
                }
                return;
            };
            let Some(cycle) = self.cycle.as_mut() else {
                return;
            };

            if mode.uses_bitmask_discovery() {
                let anchors = self.catalog.range_anchors(mode);
                if anchors.is_empty() {
                    continue;
                }
                self.state = SessionState::Discovering { mode };
                for &anchor in anchors {
                    let request = Request::new(mode, anchor);
                    cycle.pending.insert(request);
                    actions.push(SessionAction::Send(request));
                }
                return;
            }

            let requests = self.catalog.fixed_requests(mode);
            if requests.is_empty() {
                continue;
            }
            self.state = SessionState::Polling { mode };
            cycle.issue(requests, actions);
            return;
        }
    }

    fn publish(&mut self, cycle: Cycle, actions: &mut Vec<SessionAction>) {
        self.state = SessionState::Publishing;
        let record = EcuDiagnosticRecord {
            cycle_id: cycle.id,
            ecu_type: self.ecu_type,
            vin: self.vin.clone(),
            signal_groups: cycle.groups,
            dtc_snapshots: cycle.snapshots,
            received_at: Utc::now(),
            stats: cycle.stats,
        };
        tracing::info!(
            cycle_id = %record.cycle_id,
            ecu_type = ?record.ecu_type,
            vin = %record.vin,
            signals = record.signal_count(),
            dtc_snapshots = record.dtc_snapshots.len(),
            requested = record.stats.requested,
            decoded = record.stats.decoded,
            malformed = record.stats.malformed,
            timed_out = record.stats.timed_out,
            "cycle published"
        );
        actions.push(SessionAction::Publish(Box::new(record)));
        self.state = SessionState::Idle;
    }
}

/// Decode one polled response into the cycle.
fn record_response(
    catalog: &Catalog,
    cycle: &mut Cycle,
    vin: &mut String,
    request: Request,
    bytes: &[u8],
    received_at: DateTime<Utc>,
) {
    if request.yields_dtcs() {
        // The decoder yields no codes for an odd-length block. That is a
        // truncated response, not an ECU reporting zero codes, so it feeds
        // the malformed count and leaves no snapshot behind.
        if bytes.len() % 2 != 0 {
            tracing::warn!(request = %request, len = bytes.len(), "malformed DTC block");
            cycle.stats.malformed += 1;
            return;
        }
        let codes = decode_dtc_block(bytes);
        tracing::debug!(request = %request, codes = codes.len(), "DTC block decoded");
        cycle
            .snapshots
            .push(DtcSnapshot::new(request.mode, received_at, codes));
        cycle.stats.decoded += 1;
        return;
    }

    if request == Request::VIN {
        match decode_vin(bytes) {
            Some(decoded) => {
                *vin = decoded;
                cycle.stats.decoded += 1;
            }
            None => {
                tracing::warn!(len = bytes.len(), "malformed VIN response");
                cycle.stats.malformed += 1;
            }
        }
        return;
    }

    let Some(info) = catalog.parameter(request.mode, request.pid) else {
        tracing::warn!(request = %request, "response for a parameter missing from the catalog");
        cycle.stats.malformed += 1;
        return;
    };
    if bytes.len() != info.response_len {
        tracing::debug!(
            request = %request,
            expected = info.response_len,
            actual = bytes.len(),
            "response length differs from catalog"
        );
    }

    let decoded = decode_parameter(info, bytes);
    if decoded.is_usable() {
        cycle.stats.decoded += 1;
        cycle.stats.omitted_signals += decoded.failures.len();
        cycle.group_mut(request.mode).values.extend(decoded.values);
    } else {
        tracing::warn!(
            request = %request,
            len = bytes.len(),
            failures = decoded.failures.len(),
            "malformed response, no signal decoded"
        );
        cycle.stats.malformed += 1;
    }
}
