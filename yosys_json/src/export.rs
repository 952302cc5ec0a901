use jzon::JsonValue;
use std::{collections::BTreeMap, io::BufWriter};

use crate::yosys::{self, Shape};
use rtlopt_netlist::{Design, Module, SigBit, SigMap, SigSpec, Trit};

struct Counter(usize);

impl Counter {
    fn advance(&mut self) -> usize {
        let index = self.0;
        self.0 += 1;
        index
    }
}

/// Numbers nets by canonical bit, so that connected wires share a number.
struct NetlistIndexer {
    sigmap: SigMap,
    map: BTreeMap<SigBit, usize>,
    next: Counter,
}

impl NetlistIndexer {
    fn new(module: &Module) -> NetlistIndexer {
        NetlistIndexer {
            sigmap: SigMap::from_module(module),
            map: BTreeMap::new(),
            next: Counter(2), // "to avoid confusion", as write_json claims
        }
    }

    fn bit(&mut self, bit: SigBit) -> yosys::Bit {
        match self.sigmap.apply_bit(bit) {
            SigBit::Const(Trit::Undef) => yosys::Bit::Undef,
            SigBit::Const(Trit::Zero) => yosys::Bit::Zero,
            SigBit::Const(Trit::One) => yosys::Bit::One,
            bit => yosys::Bit::Net(*self.map.entry(bit).or_insert_with(|| self.next.advance())),
        }
    }

    fn value(&mut self, sig: &SigSpec) -> yosys::Bits {
        sig.iter().map(|bit| self.bit(bit)).collect()
    }
}

fn export_module(module: &Module) -> yosys::Module {
    let mut indexer = NetlistIndexer::new(module);
    let mut ys_module = yosys::Module { attributes: module.attributes.clone(), ..yosys::Module::default() };

    for (wire_id, wire) in module.wires() {
        let shape = Shape {
            bits: indexer.value(&module.wire_sig(wire_id)),
            offset: wire.offset,
            upto: wire.upto,
            signed: wire.signed,
        };
        if let Some(direction) = wire.port {
            ys_module.ports.insert(wire.name.clone(), yosys::Port { direction, shape: shape.clone() });
        }
        let net = yosys::NetName { hide_name: wire.name.starts_with('$'), attributes: wire.attributes.clone(), shape };
        ys_module.netnames.insert(wire.name.clone(), net);
    }

    for memory in module.memories() {
        let details = yosys::Memory {
            hide_name: memory.name.starts_with('$'),
            attributes: memory.attributes.clone(),
            width: memory.width,
            start_offset: memory.offset,
            size: memory.size,
        };
        ys_module.memories.insert(memory.name.clone(), details);
    }

    for (_, cell) in module.cells() {
        let mut details = yosys::Cell {
            hide_name: cell.name.starts_with('$'),
            kind: cell.kind.clone(),
            parameters: cell.parameters.clone(),
            attributes: cell.attributes.clone(),
            port_directions: BTreeMap::new(),
            connections: BTreeMap::new(),
        };
        for (port, sig) in &cell.connections {
            details.port_directions.insert(port.clone(), cell.port_direction(port));
            details.connections.insert(port.clone(), indexer.value(sig));
        }
        ys_module.cells.insert(cell.name.clone(), details);
    }

    ys_module
}

/// Writes a design in the format of Yosys `write_json`.  Module level connections are not written
/// out; connected wires share net numbers instead.
pub fn export(writer: &mut impl std::io::Write, design: &Design) -> std::io::Result<()> {
    let mut ys_modules = BTreeMap::new();
    for module in design.modules() {
        ys_modules.insert(module.name.clone(), export_module(module));
    }
    let ys_design = yosys::Design { creator: "rtlopt".into(), modules: ys_modules };

    let json: JsonValue = ys_design.write();
    json.write_pretty(&mut BufWriter::new(writer), /*spaces=*/ 4)
}
