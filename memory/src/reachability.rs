use std::collections::{BTreeMap, BTreeSet};

use rtlopt_netlist::{cell_type, Module, NetlistError, SigBit, SigMap};

use crate::mux::{is_mux, MuxPorts};

/// Canonical bits that are observed somewhere other than the data inputs of one memory's write
/// ports, and therefore can not be pure read-to-write feedback of that memory.
///
/// The set is seeded with module outputs, every multiplexer select line, and every bit connected
/// to a non-multiplexer cell (except the `DATA` ports of the memory's own read and write ports),
/// and is then closed backwards through multiplexer operands.
#[derive(Debug)]
pub(crate) struct NonFeedbackNets {
    nets: BTreeSet<SigBit>,
}

impl NonFeedbackNets {
    pub fn compute(module: &Module, sigmap: &SigMap, memid: &str) -> Result<NonFeedbackNets, NetlistError> {
        let mut nets = BTreeSet::new();
        let mut upstream: BTreeMap<SigBit, BTreeSet<SigBit>> = BTreeMap::new();

        for (wire_id, wire) in module.wires() {
            if wire.port_output() {
                nets.extend(sigmap.apply(&module.wire_sig(wire_id)).iter());
            }
        }

        for (_, cell) in module.cells() {
            if is_mux(cell) {
                let ports = MuxPorts::read(cell, sigmap)?;
                nets.extend(ports.s.iter());
                for lane in 0..ports.width() {
                    upstream.entry(ports.y[lane]).or_default().extend(ports.upstream(lane));
                }
                continue;
            }

            let ignore_data_port = cell.is_type(&[cell_type::MEMRD, cell_type::MEMWR])
                && cell.get_param_string("MEMID")? == memid;
            for (port, sig) in &cell.connections {
                if ignore_data_port && port == "DATA" {
                    continue;
                }
                nets.extend(sigmap.apply(sig).iter());
            }
        }

        let mut frontier = Vec::from_iter(nets.iter().copied());
        while let Some(bit) = frontier.pop() {
            let Some(operands) = upstream.get(&bit) else { continue };
            for &operand in operands {
                if nets.insert(operand) {
                    frontier.push(operand);
                }
            }
        }

        Ok(NonFeedbackNets { nets })
    }

    pub fn contains(&self, bit: SigBit) -> bool {
        self.nets.contains(&bit)
    }
}
