//! Supported-parameter discovery from "PIDs supported" bitmasks.

use std::collections::{BTreeMap, BTreeSet};

use dx_protocol::{INVALID_PID, PID_RANGE_SIZE, Pid, ServiceMode};

use crate::catalog::Catalog;
use crate::extract::extract;
use crate::formula::SignalFormula;

/// PIDs an ECU reported as supported for one mode.
///
/// Rebuilt every session. Anchors are never members: they are bitmask
/// requests, not data parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedParameterSet {
    pub mode: ServiceMode,
    pids: BTreeSet<Pid>,
}

impl SupportedParameterSet {
    pub fn empty(mode: ServiceMode) -> Self {
        Self {
            mode,
            pids: BTreeSet::new(),
        }
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.pids.contains(&pid)
    }

    /// Ascending PID order.
    pub fn iter(&self) -> impl Iterator<Item = Pid> + '_ {
        self.pids.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.pids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }

    /// Keep only PIDs the catalog can decode.
    pub fn intersect_known(&self, catalog: &Catalog) -> Self {
        let known = catalog.decodable_pids(self.mode);
        Self {
            mode: self.mode,
            pids: self.pids.intersection(known).copied().collect(),
        }
    }
}

/// The 32-bit bitmask layout shared by every range anchor.
fn bitmask_formula() -> SignalFormula {
    SignalFormula::new(0, 0).bytes(4).bits(0, 32)
}

/// Resolve the PIDs an ECU supports for `mode` from its anchor responses.
///
/// Bit `31 - i` of an anchor's 4-byte response marks `anchor + i + 1` as
/// supported. A missing or short anchor response leaves its range
/// unsupported without affecting the others. Modes without discovery have no
/// anchors and resolve to an empty set.
pub fn resolve_supported(
    catalog: &Catalog,
    mode: ServiceMode,
    responses: &BTreeMap<Pid, Vec<u8>>,
) -> SupportedParameterSet {
    let formula = bitmask_formula();
    let mut supported = SupportedParameterSet::empty(mode);

    for &anchor in catalog.range_anchors(mode) {
        let Some(payload) = responses.get(&anchor) else {
            tracing::debug!(mode = %mode, anchor, "no bitmask response, range unsupported");
            continue;
        };
        let bits = match extract(&formula, payload) {
            Ok(value) => value as u32,
            Err(e) => {
                tracing::warn!(
                    mode = %mode,
                    anchor,
                    error = %e,
                    "malformed bitmask, range unsupported"
                );
                continue;
            }
        };
        for i in 0..u32::from(PID_RANGE_SIZE) {
            if bits & (1 << (31 - i)) == 0 {
                continue;
            }
            match anchor.checked_add(i as u8 + 1) {
                Some(pid) if pid != INVALID_PID => {
                    supported.pids.insert(pid);
                }
                _ => {}
            }
        }
    }

    tracing::debug!(mode = %mode, supported = supported.len(), "supported PIDs resolved");
    supported
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::builtin().unwrap()
    }

    /// Bitmask with the given positions set, counted from the MSB.
    fn mask(bits: &[u32]) -> Vec<u8> {
        bits.iter()
            .fold(0u32, |acc, bit| acc | (1 << (31 - bit)))
            .to_be_bytes()
            .to_vec()
    }

    #[test]
    fn bit_positions_map_to_pids() {
        let responses = BTreeMap::from([(0x20, mask(&[0, 5, 31]))]);
        let set = resolve_supported(&catalog(), ServiceMode::CurrentStats, &responses);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0x21, 0x26, 0x40]);
        assert_eq!(mask(&[0, 5, 31]), vec![0x84, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn raw_bytes_example() {
        let responses = BTreeMap::from([(0x20, vec![0x84, 0x00, 0x00, 0x01])]);
        let set = resolve_supported(&catalog(), ServiceMode::CurrentStats, &responses);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0x21, 0x26, 0x40]);
    }

    #[test]
    fn union_across_anchors() {
        let responses = BTreeMap::from([
            (0x00, vec![0x00, 0x18, 0x00, 0x00]), // 0x0C, 0x0D
            (0xA0, vec![0x00, 0x00, 0x00, 0x01]), // 0xC0
        ]);
        let set = resolve_supported(&catalog(), ServiceMode::CurrentStats, &responses);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0x0C, 0x0D, 0xC0]);
    }

    #[test]
    fn missing_or_short_anchor_degrades_to_unsupported() {
        let responses = BTreeMap::from([
            (0x00, vec![0x00, 0x18]),
            (0x20, vec![0x80, 0x00, 0x00, 0x00]),
        ]);
        let set = resolve_supported(&catalog(), ServiceMode::CurrentStats, &responses);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0x21]);
    }

    #[test]
    fn non_anchor_responses_ignored() {
        let responses = BTreeMap::from([(0x10, vec![0xFF; 4])]);
        let set = resolve_supported(&catalog(), ServiceMode::CurrentStats, &responses);
        assert!(set.is_empty());
    }

    #[test]
    fn modes_without_discovery_resolve_empty() {
        let responses = BTreeMap::from([(0x00, vec![0xFF; 4])]);
        let set = resolve_supported(&catalog(), ServiceMode::VehicleInfo, &responses);
        assert!(set.is_empty());
        assert_eq!(set.mode, ServiceMode::VehicleInfo);
    }

    #[test]
    fn intersect_drops_unknown_and_anchor_pids() {
        let catalog = catalog();
        // 0x01 (monitor status, layout only), 0x0C (rpm), 0x20 (anchor bit)
        let responses = BTreeMap::from([(0x00, mask(&[31, 20, 0]))]);
        let set = resolve_supported(&catalog, ServiceMode::CurrentStats, &responses);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0x01, 0x0C, 0x20]);
        let known = set.intersect_known(&catalog);
        assert_eq!(known.iter().collect::<Vec<_>>(), vec![0x0C]);
    }
}
