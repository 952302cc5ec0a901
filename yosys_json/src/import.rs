use std::collections::{btree_map, BTreeMap};

use rtlopt_netlist::{Cell, Design, MemoryDecl, Module, NetlistError, SigBit, SigSpec, Wire};

use crate::yosys;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Json(jzon::Error),
    Syntax(yosys::SyntaxError),
    Semantic(String),
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

impl From<jzon::Error> for Error {
    fn from(error: jzon::Error) -> Self {
        Self::Json(error)
    }
}

impl From<yosys::SyntaxError> for Error {
    fn from(error: yosys::SyntaxError) -> Self {
        Self::Syntax(error)
    }
}

impl From<NetlistError> for Error {
    fn from(error: NetlistError) -> Self {
        Self::Semantic(error.to_string())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Io(error) => write!(f, "I/O error: {}", error),
            Error::Json(error) => write!(f, "JSON parse error: {}", error),
            Error::Syntax(error) => write!(f, "{}", error),
            Error::Semantic(message) => write!(f, "semantic error: {}", message),
        }
    }
}

impl std::error::Error for Error {}

fn unescape(name: &str) -> String {
    name.strip_prefix('\\').unwrap_or(name).to_owned()
}

fn wire_with_shape(name: &str, shape: &yosys::Shape) -> Wire {
    let mut wire = Wire::new(unescape(name), shape.bits.len());
    wire.offset = shape.offset;
    wire.upto = shape.upto;
    wire.signed = shape.signed;
    wire
}

struct ModuleImporter<'a> {
    module: &'a yosys::Module,
    /// The wire bit that owns each Yosys net number.
    nets: BTreeMap<usize, SigBit>,
    result: Module,
}

impl ModuleImporter<'_> {
    /// Maps a Yosys bit to a netlist bit, allocating a hidden wire for nets that no name owns.
    fn bit(&mut self, bit: yosys::Bit) -> SigBit {
        match bit {
            yosys::Bit::Zero => SigBit::ZERO,
            yosys::Bit::One => SigBit::ONE,
            yosys::Bit::Undef | yosys::Bit::HiZ => SigBit::UNDEF,
            yosys::Bit::Net(ynet) => match self.nets.get(&ynet) {
                Some(&bit) => bit,
                None => {
                    let name = self.result.new_id("json");
                    let bit = self.result.add_wire(name, 1)[0];
                    self.nets.insert(ynet, bit);
                    bit
                }
            },
        }
    }

    fn value(&mut self, bits: &yosys::Bits) -> SigSpec {
        SigSpec::from_iter(bits.iter().map(|&bit| self.bit(bit)))
    }

    /// Creates a wire for a name, claiming the nets it is the first to mention and connecting
    /// it to the owners of the rest.
    fn add_net(&mut self, wire: Wire, bits: &yosys::Bits) -> Result<(), Error> {
        if wire.width != bits.len() {
            return Err(Error::Semantic(format!("width of {} does not match its bits", wire.name)));
        }
        let wire_id = self.result.insert_wire(wire)?;
        let sig = self.result.wire_sig(wire_id);
        let (mut lhs, mut rhs) = (SigSpec::new(), SigSpec::new());
        for (own, &bit) in sig.iter().zip(bits.iter()) {
            let other = match bit {
                yosys::Bit::Net(ynet) => match self.nets.entry(ynet) {
                    btree_map::Entry::Vacant(entry) => {
                        entry.insert(own);
                        continue;
                    }
                    btree_map::Entry::Occupied(entry) => *entry.get(),
                },
                bit => self.bit(bit),
            };
            lhs.push(own);
            rhs.push(other);
        }
        if !lhs.is_empty() {
            self.result.connect(lhs, rhs);
        }
        Ok(())
    }

    fn handle_nets(&mut self) -> Result<(), Error> {
        let ports = BTreeMap::from_iter(
            self.module.ports.iter().enumerate().map(|(index, (name, port))| (name, (index + 1, port.direction))),
        );
        for (name, net) in &self.module.netnames {
            let mut wire = wire_with_shape(name, &net.shape);
            wire.attributes = net.attributes.clone();
            if let Some(&(port_id, direction)) = ports.get(name) {
                wire.port = Some(direction);
                wire.port_id = port_id;
            }
            self.add_net(wire, &net.shape.bits)?;
        }
        for (name, port) in &self.module.ports {
            if self.module.netnames.contains_key(name) {
                continue;
            }
            let mut wire = wire_with_shape(name, &port.shape);
            (wire.port_id, _) = ports[name];
            wire.port = Some(port.direction);
            self.add_net(wire, &port.shape.bits)?;
        }
        Ok(())
    }

    fn handle_memories(&mut self) -> Result<(), Error> {
        for (name, memory) in &self.module.memories {
            self.result.add_memory(MemoryDecl {
                name: unescape(name),
                width: memory.width,
                size: memory.size,
                offset: memory.start_offset,
                attributes: memory.attributes.clone(),
            })?;
        }
        Ok(())
    }

    fn handle_cell(&mut self, name: &str, details: &yosys::Cell) -> Result<(), Error> {
        let mut cell = Cell::new(unescape(name), unescape(&details.kind));
        cell.parameters = details.parameters.clone();
        cell.attributes = details.attributes.clone();
        cell.port_directions = details.port_directions.clone();
        for (port, bits) in &details.connections {
            let sig = self.value(bits);
            cell.set_port(port, sig);
        }
        self.result.add_cell(cell)?;
        Ok(())
    }
}

fn import_module(name: &str, module: &yosys::Module) -> Result<Module, Error> {
    let mut result = Module::new(unescape(name));
    result.attributes = module.attributes.clone();
    let mut importer = ModuleImporter { module, nets: BTreeMap::new(), result };

    importer.handle_nets()?;
    importer.handle_memories()?;
    for (name, cell) in &module.cells {
        importer.handle_cell(name, cell)?;
    }
    Ok(importer.result)
}

/// Reads a design in the format of Yosys `write_json`.
///
/// Nets are identified by number in the JSON format, while the netlist model identifies them by
/// wire.  The first name that mentions a net number owns it; every later mention becomes a module
/// level connection to the owner.
pub fn import(reader: &mut impl std::io::Read) -> Result<Design, Error> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    let json = jzon::parse(text.as_str())?;
    let yosys_design = yosys::Design::read(json)?;

    let mut design = Design::new();
    for (name, module) in &yosys_design.modules {
        design.add_module(import_module(name, module)?)?;
    }
    Ok(design)
}
