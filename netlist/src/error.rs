use std::fmt::Display;

/// A structural problem with a netlist: something a pass expected to find is missing or has
/// the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetlistError {
    MissingPort { cell: String, port: String },
    MissingParam { cell: String, param: String },
    ParamType { cell: String, param: String },
    UnknownWire(String),
    UnknownCell(String),
    DuplicateName(String),
    WidthMismatch { context: String, expected: usize, actual: usize },
}

impl Display for NetlistError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            NetlistError::MissingPort { cell, port } => write!(f, "cell {cell} has no port {port}"),
            NetlistError::MissingParam { cell, param } => write!(f, "cell {cell} has no parameter {param}"),
            NetlistError::ParamType { cell, param } => {
                write!(f, "parameter {param} of cell {cell} has an unexpected type")
            }
            NetlistError::UnknownWire(name) => write!(f, "no wire named {name}"),
            NetlistError::UnknownCell(name) => write!(f, "no cell named {name}"),
            NetlistError::DuplicateName(name) => write!(f, "name {name} is already in use"),
            NetlistError::WidthMismatch { context, expected, actual } => {
                write!(f, "width mismatch in {context}: expected {expected}, got {actual}")
            }
        }
    }
}

impl std::error::Error for NetlistError {}
