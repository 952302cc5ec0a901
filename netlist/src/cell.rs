use std::collections::BTreeMap;

use crate::{NetlistError, ParamValue, SigSpec};

/// Type names of the built-in cells that passes in this workspace recognize.
pub mod cell_type {
    pub const MUX: &str = "$mux";
    pub const PMUX: &str = "$pmux";
    pub const NE: &str = "$ne";
    pub const REDUCE_AND: &str = "$reduce_and";
    pub const MEMRD: &str = "$memrd";
    pub const MEMWR: &str = "$memwr";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PortDirection {
    Input,
    Output,
    Inout,
}

/// A cell instance: a type name, parameters, and named port connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub name: String,
    pub kind: String,
    pub parameters: BTreeMap<String, ParamValue>,
    pub attributes: BTreeMap<String, ParamValue>,
    pub connections: BTreeMap<String, SigSpec>,
    /// Port directions, when known from the source.  Built-in cells fall back to
    /// [`Cell::port_direction`]'s table.
    pub port_directions: BTreeMap<String, PortDirection>,
}

impl Cell {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Cell {
        Cell {
            name: name.into(),
            kind: kind.into(),
            parameters: BTreeMap::new(),
            attributes: BTreeMap::new(),
            connections: BTreeMap::new(),
            port_directions: BTreeMap::new(),
        }
    }

    pub fn param(mut self, name: &str, value: impl Into<ParamValue>) -> Cell {
        self.parameters.insert(name.to_owned(), value.into());
        self
    }

    pub fn input(mut self, name: &str, sig: impl Into<SigSpec>) -> Cell {
        self.port_directions.insert(name.to_owned(), PortDirection::Input);
        self.connections.insert(name.to_owned(), sig.into());
        self
    }

    pub fn output(mut self, name: &str, sig: impl Into<SigSpec>) -> Cell {
        self.port_directions.insert(name.to_owned(), PortDirection::Output);
        self.connections.insert(name.to_owned(), sig.into());
        self
    }

    pub fn is_type(&self, kinds: &[&str]) -> bool {
        kinds.contains(&self.kind.as_str())
    }

    pub fn has_port(&self, name: &str) -> bool {
        self.connections.contains_key(name)
    }

    pub fn get_port(&self, name: &str) -> Result<&SigSpec, NetlistError> {
        self.connections
            .get(name)
            .ok_or_else(|| NetlistError::MissingPort { cell: self.name.clone(), port: name.to_owned() })
    }

    pub fn set_port(&mut self, name: &str, sig: impl Into<SigSpec>) {
        self.connections.insert(name.to_owned(), sig.into());
    }

    pub fn get_param(&self, name: &str) -> Result<&ParamValue, NetlistError> {
        self.parameters
            .get(name)
            .ok_or_else(|| NetlistError::MissingParam { cell: self.name.clone(), param: name.to_owned() })
    }

    pub fn get_param_int(&self, name: &str) -> Result<i64, NetlistError> {
        self.get_param(name)?
            .as_int()
            .ok_or_else(|| NetlistError::ParamType { cell: self.name.clone(), param: name.to_owned() })
    }

    pub fn get_param_bool(&self, name: &str) -> Result<bool, NetlistError> {
        self.get_param(name)?
            .as_bool()
            .ok_or_else(|| NetlistError::ParamType { cell: self.name.clone(), param: name.to_owned() })
    }

    pub fn get_param_string(&self, name: &str) -> Result<String, NetlistError> {
        Ok(self.get_param(name)?.decode_string())
    }

    pub fn port_direction(&self, name: &str) -> PortDirection {
        if let Some(&direction) = self.port_directions.get(name) {
            return direction;
        }
        match (self.kind.as_str(), name) {
            (cell_type::MEMRD, "DATA") => PortDirection::Output,
            (cell_type::MEMRD | cell_type::MEMWR, _) => PortDirection::Input,
            (kind, "Y" | "Q") if kind.starts_with('$') => PortDirection::Output,
            _ => PortDirection::Input,
        }
    }
}
