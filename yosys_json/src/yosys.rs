//! The object model of Yosys `write_json` output, one struct per JSON object kind.

use jzon::{object, JsonValue};
use std::collections::BTreeMap;

use rtlopt_netlist::{Const, ParamValue, PortDirection, Trit};

#[derive(Debug)]
pub struct SyntaxError(JsonValue);

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "syntax error near: {}", self.0)
    }
}

impl std::error::Error for SyntaxError {}

fn flag(value: &JsonValue, key: &str) -> bool {
    value[key].as_usize().unwrap_or(0) != 0
}

fn set_flag(json: &mut JsonValue, key: &str, value: bool) {
    if value {
        json[key] = 1.into();
    }
}

fn required_usize(value: &mut JsonValue, key: &str) -> Result<usize, SyntaxError> {
    value[key].as_usize().ok_or_else(|| SyntaxError(value[key].take()))
}

/// Reads an object whose values all have the same shape.  A missing object is empty.
pub fn read_map<V>(
    mut value: JsonValue,
    read: impl Fn(JsonValue) -> Result<V, SyntaxError>,
) -> Result<BTreeMap<String, V>, SyntaxError> {
    if value.is_null() {
        return Ok(BTreeMap::new());
    }
    if !value.is_object() {
        return Err(SyntaxError(value));
    }
    let mut entries = BTreeMap::new();
    for (name, item) in value.entries_mut() {
        entries.insert(name.to_owned(), read(item.take())?);
    }
    Ok(entries)
}

pub fn write_map<V>(entries: BTreeMap<String, V>, write: impl Fn(V) -> JsonValue) -> JsonValue {
    let mut json = JsonValue::new_object();
    for (name, item) in entries {
        json[name.as_str()] = write(item);
    }
    json
}

/// One bit of a connection: a constant, or a net number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bit {
    Zero,
    One,
    Undef,
    HiZ,
    Net(usize),
}

impl Bit {
    fn read(value: JsonValue) -> Result<Bit, SyntaxError> {
        match (value.as_str(), value.as_usize()) {
            (Some("0"), _) => Ok(Bit::Zero),
            (Some("1"), _) => Ok(Bit::One),
            (Some("x"), _) => Ok(Bit::Undef),
            (Some("z"), _) => Ok(Bit::HiZ),
            (None, Some(index)) => Ok(Bit::Net(index)),
            _ => Err(SyntaxError(value)),
        }
    }

    fn write(self) -> JsonValue {
        match self {
            Bit::Zero => "0".into(),
            Bit::One => "1".into(),
            Bit::Undef => "x".into(),
            Bit::HiZ => "z".into(),
            Bit::Net(index) => index.into(),
        }
    }
}

pub type Bits = Vec<Bit>;

pub fn read_bits(mut value: JsonValue) -> Result<Bits, SyntaxError> {
    if !value.is_array() {
        return Err(SyntaxError(value));
    }
    value.members_mut().map(|bit| Bit::read(bit.take())).collect()
}

pub fn write_bits(bits: Bits) -> JsonValue {
    JsonValue::Array(bits.into_iter().map(Bit::write).collect())
}

/// Whether a string parameter could be mistaken for a bit vector when read back.
fn looks_like_bits(text: &str) -> bool {
    text.trim_end_matches(' ').chars().all(|char| matches!(char, '0' | '1' | 'x' | 'z'))
}

/// Reads a parameter or attribute value.  `write_json` emits bit vectors as strings of `01xz`,
/// and appends a space to strings that would otherwise read back as bit vectors.
pub fn read_param(value: JsonValue) -> Result<ParamValue, SyntaxError> {
    if let Some(text) = value.as_str() {
        if !looks_like_bits(text) {
            Ok(ParamValue::String(text.to_owned()))
        } else if let Some(text) = text.strip_suffix(' ') {
            Ok(ParamValue::String(text.to_owned()))
        } else {
            Ok(ParamValue::Const(text.chars().rev().map(|char| Trit::from_char(char).unwrap_or(Trit::Undef)).collect()))
        }
    } else if let Some(number) = value.as_i64() {
        Ok(ParamValue::Const(Const::from_int(number, 32)))
    } else {
        Err(SyntaxError(value))
    }
}

pub fn write_param(value: ParamValue) -> JsonValue {
    match value {
        ParamValue::String(text) if looks_like_bits(&text) => format!("{text} ").into(),
        ParamValue::String(text) => text.into(),
        ParamValue::Const(value) => value.iter().rev().map(|trit| trit.to_string()).collect::<String>().into(),
    }
}

pub type Params = BTreeMap<String, ParamValue>;

fn read_params(value: JsonValue) -> Result<Params, SyntaxError> {
    read_map(value, read_param)
}

fn write_params(params: Params) -> JsonValue {
    write_map(params, write_param)
}

pub fn read_direction(value: JsonValue) -> Result<PortDirection, SyntaxError> {
    match value.as_str() {
        Some("input") => Ok(PortDirection::Input),
        Some("output") => Ok(PortDirection::Output),
        Some("inout") => Ok(PortDirection::Inout),
        _ => Err(SyntaxError(value)),
    }
}

pub fn write_direction(direction: PortDirection) -> JsonValue {
    match direction {
        PortDirection::Input => "input".into(),
        PortDirection::Output => "output".into(),
        PortDirection::Inout => "inout".into(),
    }
}

/// The bits and index range of a port or a named net.
#[derive(Debug, Clone, Default)]
pub struct Shape {
    pub bits: Bits,
    pub offset: usize,
    pub upto: bool,
    pub signed: bool,
}

impl Shape {
    fn read(value: &mut JsonValue) -> Result<Shape, SyntaxError> {
        Ok(Shape {
            bits: read_bits(value["bits"].take())?,
            offset: value["offset"].as_usize().unwrap_or(0),
            upto: flag(value, "upto"),
            signed: flag(value, "signed"),
        })
    }

    fn write(self, json: &mut JsonValue) {
        json["bits"] = write_bits(self.bits);
        if self.offset != 0 {
            json["offset"] = self.offset.into();
        }
        set_flag(json, "upto", self.upto);
        set_flag(json, "signed", self.signed);
    }
}

#[derive(Debug)]
pub struct Port {
    pub direction: PortDirection,
    pub shape: Shape,
}

impl Port {
    fn read(mut value: JsonValue) -> Result<Port, SyntaxError> {
        Ok(Port { direction: read_direction(value["direction"].take())?, shape: Shape::read(&mut value)? })
    }

    fn write(self) -> JsonValue {
        let mut json = object! { direction: write_direction(self.direction) };
        self.shape.write(&mut json);
        json
    }
}

#[derive(Debug)]
pub struct NetName {
    pub hide_name: bool,
    pub attributes: Params,
    pub shape: Shape,
}

impl NetName {
    fn read(mut value: JsonValue) -> Result<NetName, SyntaxError> {
        Ok(NetName {
            hide_name: flag(&value, "hide_name"),
            attributes: read_params(value["attributes"].take())?,
            shape: Shape::read(&mut value)?,
        })
    }

    fn write(self) -> JsonValue {
        let mut json = object! {
            hide_name: self.hide_name as usize,
            attributes: write_params(self.attributes),
        };
        self.shape.write(&mut json);
        json
    }
}

#[derive(Debug)]
pub struct Memory {
    pub hide_name: bool,
    pub attributes: Params,
    pub width: usize,
    pub start_offset: i64,
    pub size: usize,
}

impl Memory {
    fn read(mut value: JsonValue) -> Result<Memory, SyntaxError> {
        Ok(Memory {
            hide_name: flag(&value, "hide_name"),
            attributes: read_params(value["attributes"].take())?,
            width: required_usize(&mut value, "width")?,
            start_offset: value["start_offset"].as_i64().unwrap_or(0),
            size: required_usize(&mut value, "size")?,
        })
    }

    fn write(self) -> JsonValue {
        object! {
            hide_name: self.hide_name as usize,
            attributes: write_params(self.attributes),
            width: self.width,
            start_offset: self.start_offset,
            size: self.size,
        }
    }
}

#[derive(Debug)]
pub struct Cell {
    pub hide_name: bool,
    pub kind: String,
    pub parameters: Params,
    pub attributes: Params,
    pub port_directions: BTreeMap<String, PortDirection>,
    pub connections: BTreeMap<String, Bits>,
}

impl Cell {
    fn read(mut value: JsonValue) -> Result<Cell, SyntaxError> {
        let Some(kind) = value["type"].as_str().map(str::to_owned) else {
            return Err(SyntaxError(value["type"].take()));
        };
        Ok(Cell {
            hide_name: flag(&value, "hide_name"),
            kind,
            parameters: read_params(value["parameters"].take())?,
            attributes: read_params(value["attributes"].take())?,
            port_directions: read_map(value["port_directions"].take(), read_direction)?,
            connections: read_map(value["connections"].take(), read_bits)?,
        })
    }

    fn write(self) -> JsonValue {
        object! {
            hide_name: self.hide_name as usize,
            type: self.kind,
            parameters: write_params(self.parameters),
            attributes: write_params(self.attributes),
            port_directions: write_map(self.port_directions, write_direction),
            connections: write_map(self.connections, write_bits),
        }
    }
}

#[derive(Debug, Default)]
pub struct Module {
    pub attributes: Params,
    pub ports: BTreeMap<String, Port>,
    pub cells: BTreeMap<String, Cell>,
    pub memories: BTreeMap<String, Memory>,
    pub netnames: BTreeMap<String, NetName>,
}

impl Module {
    fn read(mut value: JsonValue) -> Result<Module, SyntaxError> {
        Ok(Module {
            attributes: read_params(value["attributes"].take())?,
            ports: read_map(value["ports"].take(), Port::read)?,
            cells: read_map(value["cells"].take(), Cell::read)?,
            memories: read_map(value["memories"].take(), Memory::read)?,
            netnames: read_map(value["netnames"].take(), NetName::read)?,
        })
    }

    fn write(self) -> JsonValue {
        let mut json = object! {
            attributes: write_params(self.attributes),
            ports: write_map(self.ports, Port::write),
            cells: write_map(self.cells, Cell::write),
            netnames: write_map(self.netnames, NetName::write),
        };
        if !self.memories.is_empty() {
            json["memories"] = write_map(self.memories, Memory::write);
        }
        json
    }
}

/// A whole `write_json` document.  AIG models are not read.
#[derive(Debug)]
pub struct Design {
    pub creator: String,
    pub modules: BTreeMap<String, Module>,
}

impl Design {
    pub fn read(mut value: JsonValue) -> Result<Design, SyntaxError> {
        Ok(Design {
            creator: value["creator"].as_str().unwrap_or("").to_owned(),
            modules: read_map(value["modules"].take(), Module::read)?,
        })
    }

    pub fn write(self) -> JsonValue {
        object! {
            creator: self.creator,
            modules: write_map(self.modules, Module::write),
        }
    }
}
