use std::collections::{BTreeMap, BTreeSet};

use rtlopt_netlist::{CellId, Module, NetlistError, SigBit, SigMap, SigSpec};

use crate::reachability::NonFeedbackNets;

/// Data bits of the asynchronous read ports of one memory that are used for nothing but
/// feedback, indexed by canonical read address and then by bit position.
#[derive(Debug, Default)]
pub(crate) struct AsyncReadBits {
    by_address: BTreeMap<SigSpec, Vec<BTreeSet<SigBit>>>,
}

static NO_TARGETS: BTreeSet<SigBit> = BTreeSet::new();

impl AsyncReadBits {
    pub fn collect(
        module: &Module,
        sigmap: &SigMap,
        read_ports: &[CellId],
        non_feedback: &NonFeedbackNets,
    ) -> Result<AsyncReadBits, NetlistError> {
        let mut result = AsyncReadBits::default();
        for &cell_id in read_ports {
            let cell = module.cell(cell_id);
            if cell.get_param_bool("CLK_ENABLE")? {
                log::debug!("Skipping synchronous read port {}.", cell.name);
                continue;
            }

            let addr = sigmap.apply(cell.get_port("ADDR")?);
            let data = sigmap.apply(cell.get_port("DATA")?);
            if data.iter().any(|bit| non_feedback.contains(bit)) {
                log::debug!("Skipping read port {}: its data is used outside of write feedback.", cell.name);
                continue;
            }

            let slots = result.by_address.entry(addr).or_default();
            if slots.len() < data.len() {
                slots.resize(data.len(), BTreeSet::new());
            }
            for (slot, bit) in slots.iter_mut().zip(data.iter()) {
                slot.insert(bit);
            }
        }
        Ok(result)
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }

    pub fn contains_address(&self, addr: &SigSpec) -> bool {
        self.by_address.contains_key(addr)
    }

    /// Accepted feedback bits for bit position `lane` at `addr`.  Positions past the widest read
    /// port at that address have no accepted bits.
    pub fn targets(&self, addr: &SigSpec, lane: usize) -> &BTreeSet<SigBit> {
        self.by_address.get(addr).and_then(|slots| slots.get(lane)).unwrap_or(&NO_TARGETS)
    }
}
