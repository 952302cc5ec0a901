use std::collections::BTreeMap;

use rtlopt_netlist::{cell_type, Cell, CellId, Module, NetlistError, SigBit, SigMap, SigSpec};

/// The canonicalized ports of a `$mux` or `$pmux` cell.
///
/// `b` holds one `y`-sized operand per select line; operand `index` for output lane `lane` is
/// at `b[lane + index * y.len()]`.
#[derive(Debug, Clone)]
pub(crate) struct MuxPorts {
    pub a: SigSpec,
    pub b: SigSpec,
    pub s: SigSpec,
    pub y: SigSpec,
}

impl MuxPorts {
    pub fn read(cell: &Cell, sigmap: &SigMap) -> Result<MuxPorts, NetlistError> {
        let ports = MuxPorts {
            a: sigmap.apply(cell.get_port("A")?),
            b: sigmap.apply(cell.get_port("B")?),
            s: sigmap.apply(cell.get_port("S")?),
            y: sigmap.apply(cell.get_port("Y")?),
        };
        if ports.a.len() != ports.y.len() {
            return Err(NetlistError::WidthMismatch {
                context: format!("{}.A", cell.name),
                expected: ports.y.len(),
                actual: ports.a.len(),
            });
        }
        if ports.b.len() != ports.y.len() * ports.s.len() {
            return Err(NetlistError::WidthMismatch {
                context: format!("{}.B", cell.name),
                expected: ports.y.len() * ports.s.len(),
                actual: ports.b.len(),
            });
        }
        Ok(ports)
    }

    pub fn width(&self) -> usize {
        self.y.len()
    }

    pub fn b_index(&self, lane: usize, select: usize) -> usize {
        lane + select * self.width()
    }

    /// All operand bits that can drive output lane `lane`.
    pub fn upstream(&self, lane: usize) -> impl Iterator<Item = SigBit> + '_ {
        std::iter::once(self.a[lane]).chain((0..self.s.len()).map(move |select| self.b[self.b_index(lane, select)]))
    }
}

pub(crate) fn is_mux(cell: &Cell) -> bool {
    cell.is_type(&[cell_type::MUX, cell_type::PMUX])
}

/// Maps every canonical multiplexer output bit to the cell and lane driving it.
#[derive(Debug, Default)]
pub(crate) struct MuxIndex {
    drivers: BTreeMap<SigBit, (CellId, usize)>,
}

impl MuxIndex {
    pub fn new(module: &Module, sigmap: &SigMap) -> Result<MuxIndex, NetlistError> {
        let mut index = MuxIndex::default();
        for (cell_id, cell) in module.cells() {
            if !is_mux(cell) {
                continue;
            }
            for (lane, bit) in sigmap.apply(cell.get_port("Y")?).iter().enumerate() {
                index.drivers.insert(bit, (cell_id, lane));
            }
        }
        Ok(index)
    }

    pub fn driver(&self, bit: SigBit) -> Option<(CellId, usize)> {
        self.drivers.get(&bit).copied()
    }
}

/// Builds a canonicalizer that additionally treats a `$mux` with one fully undefined operand as
/// a plain connection from the other operand to its output.
pub(crate) fn sigmap_through_undef_muxes(module: &Module, sigmap: &SigMap) -> Result<SigMap, NetlistError> {
    let mut sigmap_xmux = sigmap.clone();
    for (_, cell) in module.cells() {
        if !cell.is_type(&[cell_type::MUX]) {
            continue;
        }
        let a = sigmap_xmux.apply(cell.get_port("A")?);
        let b = sigmap_xmux.apply(cell.get_port("B")?);
        let y = cell.get_port("Y")?;
        if a.is_fully_undef() {
            add_checked(&mut sigmap_xmux, cell, y, &b)?;
        } else if b.is_fully_undef() {
            add_checked(&mut sigmap_xmux, cell, y, &a)?;
        }
    }
    Ok(sigmap_xmux)
}

fn add_checked(sigmap: &mut SigMap, cell: &Cell, from: &SigSpec, to: &SigSpec) -> Result<(), NetlistError> {
    if from.len() != to.len() {
        return Err(NetlistError::WidthMismatch { context: cell.name.clone(), expected: from.len(), actual: to.len() });
    }
    sigmap.add(from, to);
    Ok(())
}
