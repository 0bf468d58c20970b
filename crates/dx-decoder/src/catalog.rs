//! Parameter catalog: immutable (mode, PID) lookup shared by all sessions.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use dx_protocol::{INVALID_PID, Pid, Request, ServiceMode};

use crate::builtin;
use crate::error::{DecodeError, DecodeResult};
use crate::formula::ParameterInfo;
use crate::manifest::DecoderManifest;

static NO_PIDS: BTreeSet<Pid> = BTreeSet::new();

/// Read-only parameter tables.
///
/// Built once at startup and validated eagerly, so every formula reachable
/// through [`Catalog::parameter`] is known to be well formed. Share across
/// sessions with `Arc<Catalog>`.
#[derive(Debug, Clone)]
pub struct Catalog {
    tables: BTreeMap<ServiceMode, Vec<Pid>>,
    parameters: HashMap<(ServiceMode, Pid), ParameterInfo>,
    decodable: BTreeMap<ServiceMode, BTreeSet<Pid>>,
}

impl Catalog {
    /// The compiled-in SAE J1979 catalog.
    pub fn builtin() -> DecodeResult<Self> {
        Self::from_parameters(builtin::parameters())
    }

    /// Build from a decoder manifest in place of the compiled-in tables.
    pub fn from_manifest(manifest: DecoderManifest) -> DecodeResult<Self> {
        Self::from_parameters(manifest.into_parameters())
    }

    /// Build and validate a catalog.
    ///
    /// Mode 01 keeps the order parameters are given in. Freeze-frame and
    /// vehicle-info use their fixed request tables regardless of input order.
    pub fn from_parameters(
        parameters: impl IntoIterator<Item = (ServiceMode, ParameterInfo)>,
    ) -> DecodeResult<Self> {
        let mut tables: BTreeMap<ServiceMode, Vec<Pid>> = BTreeMap::new();
        let mut by_key = HashMap::new();
        let mut signal_ids = HashSet::new();

        for (mode, info) in parameters {
            if mode == ServiceMode::Invalid {
                return Err(DecodeError::InvalidCatalog(format!(
                    "PID 0x{:02X} listed under the invalid mode",
                    info.pid
                )));
            }
            info.validate()?;
            for formula in &info.formulas {
                if !signal_ids.insert(formula.signal_id) {
                    return Err(DecodeError::InvalidCatalog(format!(
                        "signal id {:#X} used more than once (mode {mode} PID 0x{:02X})",
                        formula.signal_id, info.pid
                    )));
                }
            }
            if by_key.contains_key(&(mode, info.pid)) {
                return Err(DecodeError::InvalidCatalog(format!(
                    "mode {mode} PID 0x{:02X} defined twice",
                    info.pid
                )));
            }
            tables.entry(mode).or_default().push(info.pid);
            by_key.insert((mode, info.pid), info);
        }

        tables.insert(ServiceMode::FreezeFrame, builtin::FREEZE_FRAME_PIDS.to_vec());
        tables.insert(ServiceMode::VehicleInfo, builtin::VEHICLE_INFO_PIDS.to_vec());

        let decodable = build_decodable_sets(&by_key);
        tracing::debug!(
            parameters = by_key.len(),
            decodable = decodable.values().map(BTreeSet::len).sum::<usize>(),
            "catalog loaded"
        );

        Ok(Self {
            tables,
            parameters: by_key,
            decodable,
        })
    }

    /// PID at `index` in the mode's ordered table, or [`INVALID_PID`] once
    /// the table is exhausted. Mode 05 is not supported over CAN and always
    /// yields the sentinel.
    pub fn pid_at(&self, mode: ServiceMode, index: usize) -> Pid {
        match mode {
            ServiceMode::CurrentStats | ServiceMode::FreezeFrame | ServiceMode::VehicleInfo => self
                .tables
                .get(&mode)
                .and_then(|table| table.get(index))
                .copied()
                .unwrap_or(INVALID_PID),
            _ => INVALID_PID,
        }
    }

    pub fn parameter(&self, mode: ServiceMode, pid: Pid) -> Option<&ParameterInfo> {
        self.parameters.get(&(mode, pid))
    }

    /// Anchors whose responses are "PIDs supported" bitmasks.
    pub fn range_anchors(&self, mode: ServiceMode) -> &'static [Pid] {
        if mode.uses_bitmask_discovery() {
            &builtin::CURRENT_STATS_ANCHORS
        } else {
            &[]
        }
    }

    /// PIDs of `mode` this catalog has at least one formula for.
    pub fn decodable_pids(&self, mode: ServiceMode) -> &BTreeSet<Pid> {
        self.decodable.get(&mode).unwrap_or(&NO_PIDS)
    }

    pub fn is_decodable(&self, mode: ServiceMode, pid: Pid) -> bool {
        self.decodable_pids(mode).contains(&pid)
    }

    /// Requests for a mode without bitmask discovery, in table order.
    ///
    /// DTC modes yield a single block request. Freeze-frame and vehicle-info
    /// yield every table entry that decodes to signals, trouble codes or the
    /// VIN. Discovery modes yield nothing here.
    pub fn fixed_requests(&self, mode: ServiceMode) -> Vec<Request> {
        if mode.reports_dtcs() {
            return vec![Request::dtc_block(mode)];
        }
        if mode.uses_bitmask_discovery() {
            return Vec::new();
        }
        (0..)
            .map(|index| self.pid_at(mode, index))
            .take_while(|&pid| pid != INVALID_PID)
            .map(|pid| Request::new(mode, pid))
            .filter(|request| {
                request.yields_dtcs()
                    || *request == Request::VIN
                    || self.is_decodable(request.mode, request.pid)
            })
            .collect()
    }

    /// Number of (mode, PID) entries.
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

/// Per-mode sets of PIDs that carry formulas, built once from the tables.
fn build_decodable_sets(
    parameters: &HashMap<(ServiceMode, Pid), ParameterInfo>,
) -> BTreeMap<ServiceMode, BTreeSet<Pid>> {
    let mut sets: BTreeMap<ServiceMode, BTreeSet<Pid>> = BTreeMap::new();
    for ((mode, pid), info) in parameters {
        if info.is_decodable() {
            sets.entry(*mode).or_default().insert(*pid);
        }
    }
    sets
}
