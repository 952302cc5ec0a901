use std::fmt::Display;

use std::collections::BTreeMap;

use crate::{Const, Design, Module, ParamValue, PortDirection, SigBit, SigSpec, Trit, WireId};

struct DisplayFn<'a, F: for<'b> Fn(&Module, &mut std::fmt::Formatter<'b>) -> std::fmt::Result>(&'a Module, F);

impl<F: Fn(&Module, &mut std::fmt::Formatter) -> std::fmt::Result> Display for DisplayFn<'_, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.1(self.0, f)
    }
}

// A maximal run of bits that can be written as a single RTLIL sigspec chunk.
enum Chunk {
    Const(Vec<Trit>),
    Wire { wire_id: WireId, start: usize, len: usize },
}

fn write_ident(f: &mut std::fmt::Formatter, name: &str) -> std::fmt::Result {
    if name.starts_with('$') {
        write!(f, "{name}")
    } else {
        write!(f, "\\{name}")
    }
}

fn write_string(f: &mut std::fmt::Formatter, text: &str) -> std::fmt::Result {
    write!(f, "\"")?;
    for char in text.chars() {
        match char {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            char if (char as u32) < 0x20 => write!(f, "\\{:03o}", char as u32)?,
            char => write!(f, "{char}")?,
        }
    }
    write!(f, "\"")
}

fn write_const(f: &mut std::fmt::Formatter, value: &Const) -> std::fmt::Result {
    write!(f, "{}'{}", value.len(), value)
}

fn write_attributes(
    f: &mut std::fmt::Formatter,
    indent: &str,
    attributes: &BTreeMap<String, ParamValue>,
) -> std::fmt::Result {
    for (name, value) in attributes {
        write!(f, "{indent}attribute ")?;
        write_ident(f, name)?;
        write!(f, " ")?;
        write_param_value(f, value)?;
        writeln!(f)?;
    }
    Ok(())
}

fn write_param_value(f: &mut std::fmt::Formatter, value: &ParamValue) -> std::fmt::Result {
    match value {
        ParamValue::Const(value) => write_const(f, value),
        ParamValue::String(value) => write_string(f, value),
    }
}

impl Module {
    fn chunks(&self, sig: &SigSpec) -> Vec<Chunk> {
        let mut chunks: Vec<Chunk> = vec![];
        for bit in sig.iter() {
            match (bit, chunks.last_mut()) {
                (SigBit::Const(trit), Some(Chunk::Const(trits))) => trits.push(trit),
                (SigBit::Const(trit), _) => chunks.push(Chunk::Const(vec![trit])),
                (SigBit::Wire(wire_id, offset), Some(Chunk::Wire { wire_id: last_id, start, len }))
                    if *last_id == wire_id
                        && *start + *len == offset as usize
                        && !self.wire(wire_id).upto =>
                {
                    *len += 1
                }
                (SigBit::Wire(wire_id, offset), _) => {
                    chunks.push(Chunk::Wire { wire_id, start: offset as usize, len: 1 })
                }
            }
        }
        chunks
    }

    fn write_chunk(&self, f: &mut std::fmt::Formatter, chunk: &Chunk) -> std::fmt::Result {
        match chunk {
            Chunk::Const(trits) => write_const(f, &Const::from(trits.clone())),
            &Chunk::Wire { wire_id, start, len } => {
                let wire = self.wire(wire_id);
                write_ident(f, &wire.name)?;
                if start == 0 && len == wire.width {
                    return Ok(());
                }
                let index = |bit: usize| if wire.upto { wire.offset + wire.width - 1 - bit } else { wire.offset + bit };
                if len == 1 {
                    write!(f, " [{}]", index(start))
                } else {
                    write!(f, " [{}:{}]", index(start + len - 1), index(start))
                }
            }
        }
    }

    pub(crate) fn write_sig(&self, f: &mut std::fmt::Formatter, sig: &SigSpec) -> std::fmt::Result {
        let chunks = self.chunks(sig);
        if chunks.len() == 1 {
            return self.write_chunk(f, &chunks[0]);
        }
        write!(f, "{{")?;
        for chunk in chunks.iter().rev() {
            write!(f, " ")?;
            self.write_chunk(f, chunk)?;
        }
        write!(f, " }}")
    }

    pub fn display_sig<'a>(&'a self, sig: &'a SigSpec) -> impl Display + 'a {
        DisplayFn(self, move |module: &Module, f| module.write_sig(f, sig))
    }

    pub fn display_bit(&self, bit: SigBit) -> impl Display + '_ {
        DisplayFn(self, move |module: &Module, f| module.write_sig(f, &SigSpec::from(bit)))
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write_attributes(f, "", &self.attributes)?;
        write!(f, "module ")?;
        write_ident(f, &self.name)?;
        writeln!(f)?;

        for (_, wire) in self.wires() {
            write_attributes(f, "  ", &wire.attributes)?;
            write!(f, "  wire")?;
            if wire.width != 1 {
                write!(f, " width {}", wire.width)?;
            }
            if wire.offset != 0 {
                write!(f, " offset {}", wire.offset)?;
            }
            if wire.upto {
                write!(f, " upto")?;
            }
            if wire.signed {
                write!(f, " signed")?;
            }
            match wire.port {
                Some(PortDirection::Input) => write!(f, " input {}", wire.port_id)?,
                Some(PortDirection::Output) => write!(f, " output {}", wire.port_id)?,
                Some(PortDirection::Inout) => write!(f, " inout {}", wire.port_id)?,
                None => (),
            }
            write!(f, " ")?;
            write_ident(f, &wire.name)?;
            writeln!(f)?;
        }

        for memory in self.memories() {
            write_attributes(f, "  ", &memory.attributes)?;
            write!(f, "  memory width {} size {}", memory.width, memory.size)?;
            if memory.offset != 0 {
                write!(f, " offset {}", memory.offset)?;
            }
            write!(f, " ")?;
            write_ident(f, &memory.name)?;
            writeln!(f)?;
        }

        for (_, cell) in self.cells() {
            write_attributes(f, "  ", &cell.attributes)?;
            write!(f, "  cell ")?;
            write_ident(f, &cell.kind)?;
            write!(f, " ")?;
            write_ident(f, &cell.name)?;
            writeln!(f)?;
            for (name, value) in &cell.parameters {
                write!(f, "    parameter ")?;
                write_ident(f, name)?;
                write!(f, " ")?;
                write_param_value(f, value)?;
                writeln!(f)?;
            }
            for (name, sig) in &cell.connections {
                write!(f, "    connect ")?;
                write_ident(f, name)?;
                write!(f, " ")?;
                self.write_sig(f, sig)?;
                writeln!(f)?;
            }
            writeln!(f, "  end")?;
        }

        for (lhs, rhs) in self.connections() {
            write!(f, "  connect ")?;
            self.write_sig(f, lhs)?;
            write!(f, " ")?;
            self.write_sig(f, rhs)?;
            writeln!(f)?;
        }

        writeln!(f, "end")
    }
}

impl Display for Design {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (index, module) in self.modules().enumerate() {
            if index != 0 {
                writeln!(f)?;
            }
            write!(f, "{module}")?;
        }
        Ok(())
    }
}
