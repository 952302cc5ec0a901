//! A bit-level netlist in the shape of the Yosys RTLIL data model: modules made of wires,
//! cells with named ports and parameters, and wire-to-wire connections.
//!
//! Designs are read and written as RTLIL text with [`parse`] and [`Design`]'s `Display`
//! implementation.

mod net;
mod value;
mod error;
mod param;
mod cell;
mod design;
mod sigmap;
mod parse;
mod print;

pub use net::{SigBit, Trit, WireId};
pub use value::{Const, SigSpec};
pub use error::NetlistError;
pub use param::ParamValue;
pub use cell::{cell_type, Cell, PortDirection};
pub use design::{CellId, Design, MemoryDecl, Module, Selection, Wire};
pub use sigmap::SigMap;
pub use parse::{parse, ParseError};
