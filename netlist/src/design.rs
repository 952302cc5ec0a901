use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;

use crate::{cell_type, Cell, NetlistError, ParamValue, PortDirection, SigBit, SigSpec, WireId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wire {
    pub name: String,
    pub width: usize,
    pub offset: usize,
    pub upto: bool,
    pub signed: bool,
    pub port: Option<PortDirection>,
    /// One-based position in the module port list; zero for wires that are not ports.
    pub port_id: usize,
    pub attributes: BTreeMap<String, ParamValue>,
}

impl Wire {
    pub fn new(name: impl Into<String>, width: usize) -> Wire {
        Wire {
            name: name.into(),
            width,
            offset: 0,
            upto: false,
            signed: false,
            port: None,
            port_id: 0,
            attributes: BTreeMap::new(),
        }
    }

    pub fn port_input(&self) -> bool {
        matches!(self.port, Some(PortDirection::Input | PortDirection::Inout))
    }

    pub fn port_output(&self) -> bool {
        matches!(self.port, Some(PortDirection::Output | PortDirection::Inout))
    }
}

/// A memory declaration.  Memory contents are only reachable through `$memrd` / `$memwr` cells
/// whose `MEMID` parameter names the memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryDecl {
    pub name: String,
    pub width: usize,
    pub size: usize,
    pub offset: i64,
    pub attributes: BTreeMap<String, ParamValue>,
}

/// Index of a cell within its module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId(u32);

impl CellId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A module: named wires and cells stored in insertion order, plus wire-to-wire connections.
///
/// Wires and cells are never removed, so [`WireId`] and [`CellId`] stay valid for the lifetime
/// of the module.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub name: String,
    pub attributes: BTreeMap<String, ParamValue>,
    wires: IndexMap<String, Wire>,
    cells: IndexMap<String, Cell>,
    memories: IndexMap<String, MemoryDecl>,
    connections: Vec<(SigSpec, SigSpec)>,
    next_auto_id: usize,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Module {
        Module { name: name.into(), ..Module::default() }
    }

    pub fn is_blackbox(&self) -> bool {
        self.attributes.get("blackbox").and_then(ParamValue::as_bool).unwrap_or(false)
    }

    pub fn insert_wire(&mut self, wire: Wire) -> Result<WireId, NetlistError> {
        if self.wires.contains_key(&wire.name) {
            return Err(NetlistError::DuplicateName(wire.name));
        }
        let index = self.wires.len();
        self.wires.insert(wire.name.clone(), wire);
        Ok(WireId(index.try_into().expect("wire index too large")))
    }

    pub fn add_wire(&mut self, name: impl Into<String>, width: usize) -> SigSpec {
        match self.insert_wire(Wire::new(name, width)) {
            Ok(wire_id) => self.wire_sig(wire_id),
            Err(error) => panic!("{error}"),
        }
    }

    pub fn add_port(&mut self, name: impl Into<String>, width: usize, direction: PortDirection) -> SigSpec {
        let port_id = self.wires.values().filter(|wire| wire.port.is_some()).count() + 1;
        let wire = Wire { port: Some(direction), port_id, ..Wire::new(name, width) };
        match self.insert_wire(wire) {
            Ok(wire_id) => self.wire_sig(wire_id),
            Err(error) => panic!("{error}"),
        }
    }

    pub fn add_input(&mut self, name: impl Into<String>, width: usize) -> SigSpec {
        self.add_port(name, width, PortDirection::Input)
    }

    pub fn add_output(&mut self, name: impl Into<String>, width: usize) -> SigSpec {
        self.add_port(name, width, PortDirection::Output)
    }

    pub fn wire(&self, wire_id: WireId) -> &Wire {
        &self.wires[wire_id.index()]
    }

    pub fn find_wire(&self, name: &str) -> Option<WireId> {
        self.wires.get_index_of(name).map(|index| WireId(index as u32))
    }

    pub fn wires(&self) -> impl Iterator<Item = (WireId, &Wire)> + '_ {
        self.wires.values().enumerate().map(|(index, wire)| (WireId(index as u32), wire))
    }

    pub fn wire_sig(&self, wire_id: WireId) -> SigSpec {
        let width = self.wire(wire_id).width as u32;
        SigSpec::from_iter((0..width).map(|offset| SigBit::Wire(wire_id, offset)))
    }

    pub fn wire_name(&self, bit: SigBit) -> Option<&str> {
        bit.wire().map(|wire_id| self.wire(wire_id).name.as_str())
    }

    pub fn add_cell(&mut self, cell: Cell) -> Result<CellId, NetlistError> {
        if self.cells.contains_key(&cell.name) {
            return Err(NetlistError::DuplicateName(cell.name));
        }
        let index = self.cells.len();
        self.cells.insert(cell.name.clone(), cell);
        Ok(CellId(index.try_into().expect("cell index too large")))
    }

    pub fn cell(&self, cell_id: CellId) -> &Cell {
        &self.cells[cell_id.index()]
    }

    pub fn cell_mut(&mut self, cell_id: CellId) -> &mut Cell {
        &mut self.cells[cell_id.index()]
    }

    pub fn find_cell(&self, name: &str) -> Option<CellId> {
        self.cells.get_index_of(name).map(|index| CellId(index as u32))
    }

    pub fn cells(&self) -> impl Iterator<Item = (CellId, &Cell)> + '_ {
        self.cells.values().enumerate().map(|(index, cell)| (CellId(index as u32), cell))
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn add_memory(&mut self, memory: MemoryDecl) -> Result<(), NetlistError> {
        if self.memories.contains_key(&memory.name) {
            return Err(NetlistError::DuplicateName(memory.name));
        }
        self.memories.insert(memory.name.clone(), memory);
        Ok(())
    }

    pub fn memories(&self) -> impl Iterator<Item = &MemoryDecl> + '_ {
        self.memories.values()
    }

    pub fn connect(&mut self, lhs: impl Into<SigSpec>, rhs: impl Into<SigSpec>) {
        let (lhs, rhs) = (lhs.into(), rhs.into());
        assert_eq!(lhs.len(), rhs.len(), "connection width mismatch");
        self.connections.push((lhs, rhs));
    }

    pub fn connections(&self) -> &[(SigSpec, SigSpec)] {
        &self.connections
    }

    /// Allocates a name that is not used by any wire or cell of this module.
    pub fn new_id(&mut self, prefix: &str) -> String {
        loop {
            self.next_auto_id += 1;
            let name = format!("$auto${}${}", prefix.trim_start_matches('$'), self.next_auto_id);
            if !self.wires.contains_key(&name) && !self.cells.contains_key(&name) {
                return name;
            }
        }
    }

    /// Replaces a single bit of a cell port connection.
    pub fn replace_port_bit(
        &mut self,
        cell_id: CellId,
        port: &str,
        lane: usize,
        bit: impl Into<SigBit>,
    ) -> Result<(), NetlistError> {
        let cell = self.cell_mut(cell_id);
        let Some(sig) = cell.connections.get_mut(port) else {
            return Err(NetlistError::MissingPort { cell: cell.name.clone(), port: port.to_owned() });
        };
        if lane >= sig.len() {
            return Err(NetlistError::WidthMismatch {
                context: format!("{}.{}", cell.name, port),
                expected: lane + 1,
                actual: sig.len(),
            });
        }
        sig.replace(lane, bit);
        Ok(())
    }

    fn add_gate(&mut self, kind: &str, build: impl FnOnce(Cell) -> Cell, width: usize) -> SigSpec {
        let name = self.new_id(kind);
        let output = self.add_wire(format!("{name}$Y"), width);
        let cell = build(Cell::new(name, kind)).output("Y", output.clone());
        if let Err(error) = self.add_cell(cell) {
            unreachable!("fresh name collided: {error}");
        }
        output
    }

    /// Adds a `$ne` cell comparing `a` against `b`, and returns its output.
    pub fn add_ne(&mut self, a: impl Into<SigSpec>, b: impl Into<SigSpec>) -> SigBit {
        let (a, b) = (a.into(), b.into());
        let output = self.add_gate(
            cell_type::NE,
            |cell| {
                cell.param("A_SIGNED", false)
                    .param("B_SIGNED", false)
                    .param("A_WIDTH", a.len())
                    .param("B_WIDTH", b.len())
                    .param("Y_WIDTH", 1usize)
                    .input("A", a)
                    .input("B", b)
            },
            1,
        );
        output[0]
    }

    /// Adds a `$reduce_and` cell over `a`, and returns its output.
    pub fn add_reduce_and(&mut self, a: impl Into<SigSpec>) -> SigBit {
        let a = a.into();
        let output = self.add_gate(
            cell_type::REDUCE_AND,
            |cell| cell.param("A_SIGNED", false).param("A_WIDTH", a.len()).param("Y_WIDTH", 1usize).input("A", a),
            1,
        );
        output[0]
    }

    /// Adds a `$mux` cell, which outputs `b` when `s` is high and `a` otherwise.
    pub fn add_mux(&mut self, a: impl Into<SigSpec>, b: impl Into<SigSpec>, s: impl Into<SigBit>) -> SigSpec {
        let (a, b, s) = (a.into(), b.into(), s.into());
        assert_eq!(a.len(), b.len(), "mux operand width mismatch");
        let width = a.len();
        self.add_gate(
            cell_type::MUX,
            |cell| cell.param("WIDTH", width).input("A", a).input("B", b).input("S", s),
            width,
        )
    }

    /// Adds a `$pmux` cell.  `b` is the concatenation of one `a`-sized operand per select line.
    pub fn add_pmux(&mut self, a: impl Into<SigSpec>, b: impl Into<SigSpec>, s: impl Into<SigSpec>) -> SigSpec {
        let (a, b, s) = (a.into(), b.into(), s.into());
        assert_eq!(a.len() * s.len(), b.len(), "pmux operand width mismatch");
        let width = a.len();
        self.add_gate(
            cell_type::PMUX,
            |cell| cell.param("WIDTH", width).param("S_WIDTH", s.len()).input("A", a).input("B", b).input("S", s),
            width,
        )
    }

    /// Adds a `$memrd` cell reading `width` bits of `memid` at `addr`, and returns the read data.
    /// A read port with a `clock` is synchronous.
    pub fn add_memrd(
        &mut self,
        memid: &str,
        addr: impl Into<SigSpec>,
        width: usize,
        clock: Option<SigBit>,
    ) -> SigSpec {
        let addr = addr.into();
        let name = self.new_id(cell_type::MEMRD);
        let data = self.add_wire(format!("{name}$DATA"), width);
        let cell = Cell::new(name, cell_type::MEMRD)
            .param("MEMID", memid)
            .param("ABITS", addr.len())
            .param("WIDTH", width)
            .param("CLK_ENABLE", clock.is_some())
            .param("CLK_POLARITY", true)
            .param("TRANSPARENT", false)
            .input("CLK", clock.unwrap_or(SigBit::UNDEF))
            .input("EN", SigBit::ONE)
            .input("ADDR", addr)
            .output("DATA", data.clone());
        if let Err(error) = self.add_cell(cell) {
            unreachable!("fresh name collided: {error}");
        }
        data
    }

    /// Adds a `$memwr` cell writing `data` to `memid` at `addr`, with a per-bit write enable.
    pub fn add_memwr(
        &mut self,
        memid: &str,
        addr: impl Into<SigSpec>,
        data: impl Into<SigSpec>,
        en: impl Into<SigSpec>,
        priority: i64,
    ) -> CellId {
        let (addr, data, en) = (addr.into(), data.into(), en.into());
        assert_eq!(data.len(), en.len(), "write enable width mismatch");
        let name = self.new_id(cell_type::MEMWR);
        let cell = Cell::new(name, cell_type::MEMWR)
            .param("MEMID", memid)
            .param("ABITS", addr.len())
            .param("WIDTH", data.len())
            .param("CLK_ENABLE", false)
            .param("CLK_POLARITY", true)
            .param("PRIORITY", priority)
            .input("CLK", SigBit::UNDEF)
            .input("EN", en)
            .input("ADDR", addr)
            .input("DATA", data);
        match self.add_cell(cell) {
            Ok(cell_id) => cell_id,
            Err(error) => unreachable!("fresh name collided: {error}"),
        }
    }
}

/// Restricts a pass to a subset of the modules in a design.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    Modules(BTreeSet<String>),
}

impl Selection {
    /// Builds a selection from free-form arguments, each naming a module.  No arguments selects
    /// every module.
    pub fn from_args<S: Into<String>>(args: impl IntoIterator<Item = S>) -> Selection {
        let names = BTreeSet::from_iter(args.into_iter().map(Into::into));
        if names.is_empty() {
            Selection::All
        } else {
            Selection::Modules(names)
        }
    }

    pub fn selects(&self, module_name: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Modules(names) => names.contains(module_name),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Design {
    modules: BTreeMap<String, Module>,
}

impl Design {
    pub fn new() -> Design {
        Design { modules: BTreeMap::new() }
    }

    pub fn add_module(&mut self, module: Module) -> Result<(), NetlistError> {
        if self.modules.contains_key(&module.name) {
            return Err(NetlistError::DuplicateName(module.name));
        }
        self.modules.insert(module.name.clone(), module);
        Ok(())
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    pub fn module_mut(&mut self, name: &str) -> Option<&mut Module> {
        self.modules.get_mut(name)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> + '_ {
        self.modules.values()
    }

    /// Names of the modules picked by `selection`, in name order.  Blackbox modules are never
    /// selected.
    pub fn selected_modules(&self, selection: &Selection) -> Vec<String> {
        if let Selection::Modules(names) = selection {
            for name in names.iter().filter(|name| !self.modules.contains_key(*name)) {
                log::warn!("Selection names module {name}, which does not exist.");
            }
        }
        self.modules
            .values()
            .filter(|module| selection.selects(&module.name) && !module.is_blackbox())
            .map(|module| module.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod test {
    use crate::{cell_type, Design, Module, NetlistError, ParamValue, Selection, SigBit};

    #[test]
    fn test_new_id_avoids_existing_names() {
        let mut module = Module::new("top");
        module.add_wire("$auto$ne$1", 1);
        assert_eq!(module.new_id("$ne"), "$auto$ne$2");
        assert_eq!(module.new_id("$ne"), "$auto$ne$3");
    }

    #[test]
    fn test_add_ne() {
        let mut module = Module::new("top");
        let s = module.add_input("s", 2);
        let y = module.add_ne(s.clone(), [SigBit::ONE, SigBit::ZERO].as_slice());
        assert_eq!(module.cell_count(), 1);
        let (_, cell) = module.cells().next().unwrap();
        assert_eq!(cell.kind, cell_type::NE);
        assert_eq!(cell.get_port("A").unwrap(), &s);
        assert_eq!(cell.get_port("Y").unwrap()[0], y);
        assert_eq!(cell.get_param_int("A_WIDTH"), Ok(2));
    }

    #[test]
    fn test_replace_port_bit() {
        let mut module = Module::new("top");
        let a = module.add_input("a", 1);
        let b = module.add_input("b", 1);
        let s = module.add_input("s", 1);
        module.add_mux(a, b.clone(), s[0]);
        let (cell_id, _) = module.cells().next().unwrap();
        module.replace_port_bit(cell_id, "B", 0, SigBit::UNDEF).unwrap();
        assert!(module.cell(cell_id).get_port("B").unwrap().is_fully_undef());
        assert!(matches!(
            module.replace_port_bit(cell_id, "B", 1, SigBit::UNDEF),
            Err(NetlistError::WidthMismatch { .. })
        ));
    }

    #[test]
    fn test_selection() {
        let mut design = Design::new();
        design.add_module(Module::new("a")).unwrap();
        design.add_module(Module::new("b")).unwrap();
        let mut blackbox = Module::new("c");
        blackbox.attributes.insert("blackbox".into(), ParamValue::from(true));
        design.add_module(blackbox).unwrap();
        assert_eq!(design.selected_modules(&Selection::All), vec!["a", "b"]);
        assert_eq!(design.selected_modules(&Selection::from_args(["b", "c"])), vec!["b"]);
        assert_eq!(Selection::from_args(Vec::<String>::new()), Selection::All);
        assert!(design.add_module(Module::new("a")).is_err());
    }

    #[test]
    fn test_selection_unknown_module() {
        let mut design = Design::new();
        design.add_module(Module::new("a")).unwrap();
        assert_eq!(design.selected_modules(&Selection::from_args(["a", "missing"])), vec!["a"]);
        assert!(design.selected_modules(&Selection::from_args(["missing"])).is_empty());
    }
}
