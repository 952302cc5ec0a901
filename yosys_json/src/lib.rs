//! Reading and writing designs in the JSON format of Yosys `read_json` / `write_json`.

mod yosys;
mod import;
mod export;

pub use import::{import, Error as ImportError};
pub use export::export;
