use std::collections::BTreeMap;

use rtlopt_memory::{opt_mem_feedback, opt_mem_feedback_module, FeedbackStats};
use rtlopt_netlist::{
    cell_type, parse, Cell, CellId, Design, Module, NetlistError, PortDirection, Selection, SigBit, SigMap, SigSpec,
    Trit,
};

const SCENARIO_A: &str = concat!(
    "module \\top\n",
    "  wire input 1 \\addr\n",
    "  wire input 2 \\s\n",
    "  wire input 3 \\d\n",
    "  wire input 4 \\e\n",
    "  wire \\r\n",
    "  wire \\wd\n",
    "  cell $memrd $rd\n",
    "    parameter \\MEMID \"\\\\m\"\n",
    "    parameter \\ABITS 1\n",
    "    parameter \\WIDTH 1\n",
    "    parameter \\CLK_ENABLE 0\n",
    "    connect \\CLK 1'x\n",
    "    connect \\EN 1'1\n",
    "    connect \\ADDR \\addr\n",
    "    connect \\DATA \\r\n",
    "  end\n",
    "  cell $mux $mx\n",
    "    parameter \\WIDTH 1\n",
    "    connect \\A \\d\n",
    "    connect \\B \\r\n",
    "    connect \\S \\s\n",
    "    connect \\Y \\wd\n",
    "  end\n",
    "  cell $memwr $wr\n",
    "    parameter \\MEMID \"\\\\m\"\n",
    "    parameter \\ABITS 1\n",
    "    parameter \\WIDTH 1\n",
    "    parameter \\PRIORITY 0\n",
    "    connect \\CLK 1'x\n",
    "    connect \\ADDR \\addr\n",
    "    connect \\DATA \\wd\n",
    "    connect \\EN \\e\n",
    "  end\n",
    "end\n",
);

const SCENARIO_C: &str = concat!(
    "module \\top\n",
    "  wire input 1 \\addr\n",
    "  wire width 3 input 2 \\s\n",
    "  wire width 3 input 3 \\d\n",
    "  wire input 4 \\a\n",
    "  wire input 5 \\e\n",
    "  wire \\r\n",
    "  wire \\wd\n",
    "  cell $memrd $rd\n",
    "    parameter \\MEMID \"\\\\m\"\n",
    "    parameter \\CLK_ENABLE 0\n",
    "    connect \\ADDR \\addr\n",
    "    connect \\DATA \\r\n",
    "  end\n",
    "  cell $pmux $pm\n",
    "    parameter \\WIDTH 1\n",
    "    parameter \\S_WIDTH 3\n",
    "    connect \\A \\a\n",
    "    connect \\B { \\d [2] \\r \\d [0] }\n",
    "    connect \\S \\s\n",
    "    connect \\Y \\wd\n",
    "  end\n",
    "  cell $memwr $wr\n",
    "    parameter \\MEMID \"\\\\m\"\n",
    "    parameter \\PRIORITY 0\n",
    "    connect \\ADDR \\addr\n",
    "    connect \\DATA \\wd\n",
    "    connect \\EN \\e\n",
    "  end\n",
    "end\n",
);

const SCENARIO_D: &str = concat!(
    "module \\top\n",
    "  wire input 1 \\addr\n",
    "  wire width 2 input 2 \\s\n",
    "  wire input 3 \\d\n",
    "  wire input 4 \\e\n",
    "  wire \\ra\n",
    "  wire \\rb\n",
    "  wire \\t\n",
    "  wire \\wd\n",
    "  cell $memrd $rd_a\n",
    "    parameter \\MEMID \"\\\\m\"\n",
    "    parameter \\CLK_ENABLE 0\n",
    "    connect \\ADDR \\addr\n",
    "    connect \\DATA \\ra\n",
    "  end\n",
    "  cell $memrd $rd_b\n",
    "    parameter \\MEMID \"\\\\m\"\n",
    "    parameter \\CLK_ENABLE 0\n",
    "    connect \\ADDR \\addr\n",
    "    connect \\DATA \\rb\n",
    "  end\n",
    "  cell $mux $inner\n",
    "    parameter \\WIDTH 1\n",
    "    connect \\A \\rb\n",
    "    connect \\B \\d\n",
    "    connect \\S \\s [1]\n",
    "    connect \\Y \\t\n",
    "  end\n",
    "  cell $mux $outer\n",
    "    parameter \\WIDTH 1\n",
    "    connect \\A \\t\n",
    "    connect \\B \\ra\n",
    "    connect \\S \\s [0]\n",
    "    connect \\Y \\wd\n",
    "  end\n",
    "  cell $memwr $wr\n",
    "    parameter \\MEMID \"\\\\m\"\n",
    "    parameter \\PRIORITY 0\n",
    "    connect \\ADDR \\addr\n",
    "    connect \\DATA \\wd\n",
    "    connect \\EN \\e\n",
    "  end\n",
    "end\n",
);

fn run(text: &str) -> (Design, FeedbackStats) {
    let _ = env_logger::try_init();
    let mut design = match parse(text) {
        Ok(design) => design,
        Err(error) => panic!("{}", error),
    };
    let stats = opt_mem_feedback(&mut design, &Selection::All).unwrap();
    (design, stats)
}

fn top(design: &Design) -> &Module {
    design.module("top").unwrap()
}

fn cell<'a>(module: &'a Module, name: &str) -> &'a Cell {
    module.cell(module.find_cell(name).unwrap())
}

fn wire(module: &Module, name: &str) -> SigSpec {
    module.wire_sig(module.find_wire(name).unwrap())
}

fn driver<'a>(module: &'a Module, bit: SigBit) -> &'a Cell {
    module
        .cells()
        .map(|(_, cell)| cell)
        .find(|cell| cell.has_port("Y") && cell.get_port("Y").unwrap()[0] == bit)
        .unwrap()
}

/// Checks that two modules have the same wires, cells, memories, and connections, in the same
/// order.
#[track_caller]
fn assert_same_module(expected: &Module, actual: &Module) {
    assert_eq!(expected.name, actual.name);
    assert_eq!(expected.attributes, actual.attributes);
    assert_eq!(Vec::from_iter(expected.wires().map(|(_, wire)| wire)), Vec::from_iter(actual.wires().map(|(_, wire)| wire)));
    assert_eq!(Vec::from_iter(expected.cells().map(|(_, cell)| cell)), Vec::from_iter(actual.cells().map(|(_, cell)| cell)));
    assert_eq!(Vec::from_iter(expected.memories()), Vec::from_iter(actual.memories()));
    assert_eq!(expected.connections(), actual.connections());
}

/// Evaluates a module made of multiplexers, comparators, reductions, and memory ports over one
/// combinational step: the values of the output ports and the memory contents after the write
/// ports have been applied.
struct Simulator<'a> {
    module: &'a Module,
    sigmap: SigMap,
    drivers: BTreeMap<SigBit, (CellId, usize)>,
}

type Observation = (Vec<Option<bool>>, Vec<Vec<Option<bool>>>);

impl<'a> Simulator<'a> {
    fn new(module: &'a Module) -> Simulator<'a> {
        let sigmap = SigMap::from_module(module);
        let mut drivers = BTreeMap::new();
        for (cell_id, cell) in module.cells() {
            for (port, sig) in &cell.connections {
                if cell.port_direction(port) == PortDirection::Output {
                    for (lane, bit) in sigmap.apply(sig).iter().enumerate() {
                        drivers.insert(bit, (cell_id, lane));
                    }
                }
            }
        }
        Simulator { module, sigmap, drivers }
    }

    fn inputs(&self) -> Vec<SigBit> {
        let mut inputs = vec![];
        for (wire_id, wire) in self.module.wires() {
            if wire.port_input() {
                inputs.extend(self.sigmap.apply(&self.module.wire_sig(wire_id)).iter());
            }
        }
        inputs
    }

    fn eval_bit(&self, bit: SigBit, inputs: &BTreeMap<SigBit, bool>, memory: &[Vec<bool>]) -> Option<bool> {
        let bit = self.sigmap.apply_bit(bit);
        match bit {
            SigBit::Const(Trit::Zero) => Some(false),
            SigBit::Const(Trit::One) => Some(true),
            SigBit::Const(Trit::Undef) => None,
            SigBit::Wire(..) => {
                if let Some(&value) = inputs.get(&bit) {
                    return Some(value);
                }
                let (cell_id, lane) = self.drivers.get(&bit).expect("bit should be driven");
                self.eval_cell(self.module.cell(*cell_id), *lane, inputs, memory)
            }
        }
    }

    fn eval(&self, sig: &SigSpec, inputs: &BTreeMap<SigBit, bool>, memory: &[Vec<bool>]) -> Vec<Option<bool>> {
        sig.iter().map(|bit| self.eval_bit(bit, inputs, memory)).collect()
    }

    fn address(&self, sig: &SigSpec, inputs: &BTreeMap<SigBit, bool>, memory: &[Vec<bool>]) -> Option<usize> {
        let mut address = 0;
        for (index, value) in self.eval(sig, inputs, memory).into_iter().enumerate() {
            if value? {
                address |= 1 << index;
            }
        }
        Some(address)
    }

    fn eval_cell(&self, cell: &Cell, lane: usize, inputs: &BTreeMap<SigBit, bool>, memory: &[Vec<bool>]) -> Option<bool> {
        let port = |name: &str| cell.get_port(name).unwrap();
        match cell.kind.as_str() {
            cell_type::MUX | cell_type::PMUX => {
                let width = port("Y").len();
                for (index, select) in port("S").iter().enumerate() {
                    match self.eval_bit(select, inputs, memory)? {
                        true => return self.eval_bit(port("B")[lane + index * width], inputs, memory),
                        false => continue,
                    }
                }
                self.eval_bit(port("A")[lane], inputs, memory)
            }
            cell_type::NE => {
                let a = self.eval(port("A"), inputs, memory);
                let b = self.eval(port("B"), inputs, memory);
                let mut differs = false;
                for (a, b) in a.into_iter().zip(b) {
                    differs |= a? != b?;
                }
                Some(differs)
            }
            cell_type::REDUCE_AND => {
                let values = self.eval(port("A"), inputs, memory);
                if values.contains(&Some(false)) {
                    Some(false)
                } else if values.contains(&None) {
                    None
                } else {
                    Some(true)
                }
            }
            cell_type::MEMRD => {
                let address = self.address(port("ADDR"), inputs, memory)?;
                Some(memory[address][lane])
            }
            kind => panic!("unexpected cell type {kind}"),
        }
    }

    fn observe(&self, inputs: &BTreeMap<SigBit, bool>, memory: &[Vec<bool>]) -> Observation {
        let mut outputs = vec![];
        for (wire_id, wire) in self.module.wires() {
            if wire.port_output() {
                outputs.extend(self.eval(&self.module.wire_sig(wire_id), inputs, memory));
            }
        }
        let mut next = Vec::from_iter(memory.iter().map(|word| Vec::from_iter(word.iter().map(|&bit| Some(bit)))));
        for (_, cell) in self.module.cells() {
            if cell.kind != cell_type::MEMWR {
                continue;
            }
            let address = self.address(cell.get_port("ADDR").unwrap(), inputs, memory).unwrap();
            let data = self.eval(cell.get_port("DATA").unwrap(), inputs, memory);
            let enable = self.eval(cell.get_port("EN").unwrap(), inputs, memory);
            for (lane, (data, enable)) in data.into_iter().zip(enable).enumerate() {
                match enable {
                    Some(false) => (),
                    Some(true) => next[address][lane] = data,
                    None => next[address][lane] = None,
                }
            }
        }
        (outputs, next)
    }
}

/// Checks that `after` behaves exactly like `before` for every input and 1-bit, 2-word memory
/// content.
#[track_caller]
fn assert_equivalent(before: &Module, after: &Module) {
    let before = Simulator::new(before);
    let after = Simulator::new(after);
    let inputs = before.inputs();
    assert_eq!(inputs, after.inputs());
    let bit_count = inputs.len() + 2;
    for pattern in 0..(1u32 << bit_count) {
        let values =
            BTreeMap::from_iter(inputs.iter().enumerate().map(|(index, &bit)| (bit, pattern & (1 << index) != 0)));
        let memory = vec![
            vec![pattern & (1 << inputs.len()) != 0],
            vec![pattern & (1 << (inputs.len() + 1)) != 0],
        ];
        assert_eq!(before.observe(&values, &memory), after.observe(&values, &memory), "pattern {pattern:#b}");
    }
}

#[test]
fn test_scenario_a_mux_feedback() {
    let (design, stats) = run(SCENARIO_A);
    assert_eq!(stats, FeedbackStats { memories: 1, write_ports: 1, conditions: 1, dont_care_bits: 1 });

    let module = top(&design);
    let s = wire(module, "s");
    let e = wire(module, "e");
    assert_eq!(cell(module, "$mx").get_port("B").unwrap(), &SigSpec::undef(1));
    assert_eq!(cell(module, "$mx").get_port("A").unwrap(), &wire(module, "d"));

    let enable = cell(module, "$wr").get_port("EN").unwrap()[0];
    let and = driver(module, enable);
    assert_eq!(and.kind, cell_type::REDUCE_AND);
    let terms = and.get_port("A").unwrap();
    assert_eq!(terms.len(), 2);
    assert_eq!(terms[1], e[0]);
    let ne = driver(module, terms[0]);
    assert_eq!(ne.kind, cell_type::NE);
    assert_eq!(ne.get_port("A").unwrap(), &s);
    assert_eq!(ne.get_port("B").unwrap(), &SigSpec::ones(1));
}

#[test]
fn test_scenario_b_observed_read_data() {
    let text = SCENARIO_A.replace("  wire \\r\n", "  wire output 5 \\r\n");
    let (design, stats) = run(&text);
    assert_eq!(stats, FeedbackStats::default());
    assert_same_module(top(&parse(&text).unwrap()), top(&design));
}

#[test]
fn test_scenario_c_pmux_priority() {
    let (design, stats) = run(SCENARIO_C);
    assert_eq!(stats, FeedbackStats { memories: 1, write_ports: 1, conditions: 1, dont_care_bits: 1 });

    let module = top(&design);
    let s = wire(module, "s");
    let d = wire(module, "d");
    assert_eq!(cell(module, "$pm").get_port("B").unwrap(), &SigSpec::from_iter([d[0], SigBit::UNDEF, d[2]]));
    assert_eq!(cell(module, "$pm").get_port("A").unwrap(), &wire(module, "a"));

    let enable = cell(module, "$wr").get_port("EN").unwrap()[0];
    let terms = driver(module, enable).get_port("A").unwrap().clone();
    let ne = driver(module, terms[0]);
    assert_eq!(ne.get_port("A").unwrap(), &s.slice(..2));
    assert_eq!(ne.get_port("B").unwrap(), &SigSpec::from_iter([SigBit::ZERO, SigBit::ONE]));
}

#[test]
fn test_scenario_d_shared_address() {
    let (design, stats) = run(SCENARIO_D);
    assert_eq!(stats, FeedbackStats { memories: 1, write_ports: 1, conditions: 2, dont_care_bits: 2 });

    let module = top(&design);
    assert_eq!(cell(module, "$outer").get_port("B").unwrap(), &SigSpec::undef(1));
    assert_eq!(cell(module, "$outer").get_port("A").unwrap(), &wire(module, "t"));
    assert_eq!(cell(module, "$inner").get_port("A").unwrap(), &SigSpec::undef(1));
    assert_eq!(cell(module, "$inner").get_port("B").unwrap(), &wire(module, "d"));

    let enable = cell(module, "$wr").get_port("EN").unwrap()[0];
    let and = driver(module, enable);
    assert_eq!(and.get_port("A").unwrap().len(), 3);
}

#[test]
fn test_alias_through_undef_mux() {
    let text = SCENARIO_A
        .replace(
            "  wire \\wd\n",
            concat!(
                "  wire \\wd\n",
                "  wire input 5 \\q\n",
                "  wire \\waddr\n",
                "  cell $mux $amx\n",
                "    parameter \\WIDTH 1\n",
                "    connect \\A 1'x\n",
                "    connect \\B \\addr\n",
                "    connect \\S \\q\n",
                "    connect \\Y \\waddr\n",
                "  end\n",
            ),
        )
        .replace("    connect \\ADDR \\addr\n    connect \\DATA \\wd\n", "    connect \\ADDR \\waddr\n    connect \\DATA \\wd\n");
    let (_, stats) = run(&text);
    assert_eq!(stats.write_ports, 1);
    assert_eq!(stats.conditions, 1);

    let text = text.replace("    connect \\A 1'x\n", "    connect \\A \\d\n");
    let (_, stats) = run(&text);
    assert_eq!(stats.memories, 1);
    assert_eq!(stats.write_ports, 0);
    assert_eq!(stats.conditions, 0);
}

#[test]
fn test_synchronous_read_excluded() {
    let text = SCENARIO_A.replace("parameter \\CLK_ENABLE 0", "parameter \\CLK_ENABLE 1");
    let (design, stats) = run(&text);
    assert_eq!(stats, FeedbackStats::default());
    assert_same_module(top(&parse(&text).unwrap()), top(&design));
}

#[test]
fn test_other_address_ignored() {
    let text = SCENARIO_A
        .replace("  wire input 4 \\e\n", "  wire input 4 \\e\n  wire input 5 \\waddr\n")
        .replace("    connect \\ADDR \\addr\n    connect \\DATA \\wd\n", "    connect \\ADDR \\waddr\n    connect \\DATA \\wd\n");
    let (_, stats) = run(&text);
    assert_eq!(stats, FeedbackStats { memories: 1, write_ports: 0, conditions: 0, dont_care_bits: 0 });
}

#[test]
fn test_disabled_lane_skipped() {
    let mut module = Module::new("top");
    let addr = module.add_input("addr", 1);
    let s = module.add_input("s", 1);
    let d = module.add_input("d", 2);
    let e = module.add_input("e", 1);
    let rdata = module.add_memrd("\\m", addr.clone(), 2, None);
    let wdata = module.add_mux(d, rdata, s[0]);
    let wr = module.add_memwr("\\m", addr, wdata, SigSpec::from_iter([e[0], SigBit::ZERO]), 0);

    let stats = opt_mem_feedback_module(&mut module).unwrap();
    assert_eq!(stats.conditions, 1);
    assert_eq!(stats.dont_care_bits, 1);
    let enable = module.cell(wr).get_port("EN").unwrap();
    assert_ne!(enable[0], e[0]);
    assert_eq!(enable[1], SigBit::ZERO);
    let (mux, _) = module.cells().find(|(_, cell)| cell.kind == cell_type::MUX).unwrap();
    let b = module.cell(mux).get_port("B").unwrap();
    assert_eq!(b[0], SigBit::UNDEF);
    assert_ne!(b[1], SigBit::UNDEF);
}

#[test]
fn test_wide_write_port() {
    // The write port is wider than the read port, so only its low bit has a feedback source.
    let mut module = Module::new("top");
    let addr = module.add_input("addr", 1);
    let s = module.add_input("s", 1);
    let d = module.add_input("d", 2);
    let rdata = module.add_memrd("\\m", addr.clone(), 1, None);
    let wdata = module.add_mux(d, rdata.concat(rdata.clone()), s[0]);
    module.add_memwr("\\m", addr, wdata, SigSpec::ones(2), 0);

    let stats = opt_mem_feedback_module(&mut module).unwrap();
    assert_eq!(stats.conditions, 1);
    assert_eq!(stats.dont_care_bits, 1);
}

#[test]
fn test_shared_enable_logic() {
    // Both data bits are fed back under the same condition and share one enable.
    let mut module = Module::new("top");
    let addr = module.add_input("addr", 1);
    let s = module.add_input("s", 1);
    let d = module.add_input("d", 2);
    let e = module.add_input("e", 1);
    let rdata = module.add_memrd("\\m", addr.clone(), 2, None);
    let wdata = module.add_mux(d, rdata, s[0]);
    let wr = module.add_memwr("\\m", addr, wdata, e.repeat(2), 0);

    let stats = opt_mem_feedback_module(&mut module).unwrap();
    assert_eq!(stats.conditions, 1);
    assert_eq!(stats.dont_care_bits, 2);
    let enable = module.cell(wr).get_port("EN").unwrap();
    assert_eq!(enable[0], enable[1]);
    assert_eq!(module.cells().filter(|(_, cell)| cell.kind == cell_type::NE).count(), 1);
}

#[test]
fn test_idempotent() {
    for text in [SCENARIO_A, SCENARIO_C, SCENARIO_D] {
        let (mut design, _) = run(text);
        let before = top(&design).clone();
        let stats = opt_mem_feedback(&mut design, &Selection::All).unwrap();
        assert_eq!(stats.conditions, 0);
        assert_eq!(stats.dont_care_bits, 0);
        assert_same_module(&before, top(&design));
    }
}

#[test]
fn test_deterministic() {
    for text in [SCENARIO_A, SCENARIO_C, SCENARIO_D] {
        let (first, _) = run(text);
        let (second, _) = run(text);
        assert_same_module(top(&first), top(&second));
    }
}

#[test]
fn test_sound() {
    for text in [SCENARIO_A, SCENARIO_C, SCENARIO_D] {
        let before = parse(text).unwrap();
        let (after, _) = run(text);
        assert_equivalent(top(&before), top(&after));
    }
}

#[test]
fn test_sound_with_unreachable_branch() {
    let mut module = Module::new("top");
    let addr = module.add_input("addr", 1);
    let s = module.add_input("s", 1);
    let d = module.add_input("d", 1);
    let e = module.add_input("e", 1);
    let rdata = module.add_memrd("\\m", addr.clone(), 1, None);
    let inner = module.add_mux(rdata.clone(), d, s[0]);
    let wdata = module.add_mux(rdata, inner, s[0]);
    module.add_memwr("\\m", addr, wdata, e, 0);
    let before = module.clone();

    let stats = opt_mem_feedback_module(&mut module).unwrap();
    assert_eq!(stats.conditions, 1);
    assert_eq!(stats.dont_care_bits, 1);
    assert_equivalent(&before, &module);
}

#[test]
fn test_condition_shared_between_ports() {
    // Two write ports with their own multiplexers, but the same select line and enable.
    let mut module = Module::new("top");
    let addr = module.add_input("addr", 1);
    let s = module.add_input("s", 1);
    let d1 = module.add_input("d1", 1);
    let d2 = module.add_input("d2", 1);
    let e = module.add_input("e", 1);
    let rdata = module.add_memrd("\\m", addr.clone(), 1, None);
    let wdata1 = module.add_mux(d1, rdata.clone(), s[0]);
    let wdata2 = module.add_mux(d2, rdata, s[0]);
    let wr1 = module.add_memwr("\\m", addr.clone(), wdata1, e.clone(), 0);
    let wr2 = module.add_memwr("\\m", addr, wdata2, e.clone(), 1);
    let before = module.clone();

    let stats = opt_mem_feedback_module(&mut module).unwrap();
    assert_eq!(stats, FeedbackStats { memories: 1, write_ports: 2, conditions: 1, dont_care_bits: 2 });
    let enable1 = module.cell(wr1).get_port("EN").unwrap();
    let enable2 = module.cell(wr2).get_port("EN").unwrap();
    assert_ne!(enable1, &e);
    assert_eq!(enable1, enable2);
    assert_equivalent(&before, &module);
}

#[test]
fn test_mux_tree_shared_between_ports() {
    let mut module = Module::new("top");
    let addr = module.add_input("addr", 1);
    let s = module.add_input("s", 1);
    let d = module.add_input("d", 1);
    let e1 = module.add_input("e1", 1);
    let e2 = module.add_input("e2", 1);
    let rdata = module.add_memrd("\\m", addr.clone(), 1, None);
    let wdata = module.add_mux(d, rdata, s[0]);
    let wr1 = module.add_memwr("\\m", addr.clone(), wdata.clone(), e1.clone(), 0);
    let wr2 = module.add_memwr("\\m", addr, wdata, e2.clone(), 1);
    let before = module.clone();

    let stats = opt_mem_feedback_module(&mut module).unwrap();
    assert_eq!(stats, FeedbackStats { memories: 1, write_ports: 2, conditions: 2, dont_care_bits: 1 });
    assert_ne!(module.cell(wr1).get_port("EN").unwrap(), &e1);
    assert_ne!(module.cell(wr2).get_port("EN").unwrap(), &e2);
    let (mux, _) = module.cells().find(|(_, cell)| cell.kind == cell_type::MUX).unwrap();
    assert_eq!(module.cell(mux).get_port("B").unwrap(), &SigSpec::undef(1));
    assert_equivalent(&before, &module);
}

#[test]
fn test_write_port_priority_order() {
    // The ports are declared in descending priority, and a third port at another address writes
    // the same multiplexer output, so its operand has to stay intact.
    let mut module = Module::new("top");
    let addr = module.add_input("addr", 1);
    let waddr = module.add_input("waddr", 1);
    let s = module.add_input("s", 1);
    let d = module.add_input("d", 1);
    let e0 = module.add_input("e0", 1);
    let e1 = module.add_input("e1", 1);
    let rdata = module.add_memrd("\\m", addr.clone(), 1, None);
    let wdata = module.add_mux(d, rdata.clone(), s[0]);
    let wr_high = module.add_memwr("\\m", addr.clone(), wdata.clone(), e1, 5);
    let wr_low = module.add_memwr("\\m", addr, wdata.clone(), e0, 1);
    let wr_far = module.add_memwr("\\m", waddr, wdata, SigSpec::ones(1), 3);
    let before = module.clone();

    let stats = opt_mem_feedback_module(&mut module).unwrap();
    assert_eq!(stats, FeedbackStats { memories: 1, write_ports: 2, conditions: 2, dont_care_bits: 0 });
    let (mux, _) = module.cells().find(|(_, cell)| cell.kind == cell_type::MUX).unwrap();
    assert_eq!(module.cell(mux).get_port("B").unwrap(), &rdata);
    assert_eq!(module.cell(wr_far).get_port("EN").unwrap(), &SigSpec::ones(1));
    assert_equivalent(&before, &module);

    // The lower priority port is analyzed first, so its comparator is built first.
    let first_ne = module.cells().map(|(_, cell)| cell).find(|cell| cell.kind == cell_type::NE).unwrap();
    let low_and = driver(&module, module.cell(wr_low).get_port("EN").unwrap()[0]);
    assert_eq!(driver(&module, low_and.get_port("A").unwrap()[0]).name, first_ne.name);
    let high_and = driver(&module, module.cell(wr_high).get_port("EN").unwrap()[0]);
    assert_ne!(driver(&module, high_and.get_port("A").unwrap()[0]).name, first_ne.name);

    let mut again = before.clone();
    opt_mem_feedback_module(&mut again).unwrap();
    assert_same_module(&module, &again);
}

#[test]
fn test_selection() {
    let text = format!("{}\n{}", SCENARIO_A, SCENARIO_A.replace("module \\top", "module \\other"));
    let mut design = parse(&text).unwrap();
    let stats = opt_mem_feedback(&mut design, &Selection::from_args(["other"])).unwrap();
    assert_eq!(stats.conditions, 1);
    assert_same_module(top(&parse(SCENARIO_A).unwrap()), top(&design));
    assert_eq!(cell(design.module("other").unwrap(), "$mx").get_port("B").unwrap(), &SigSpec::undef(1));
}

#[test]
fn test_missing_parameter() {
    let text = SCENARIO_A.replace("    parameter \\PRIORITY 0\n", "");
    let mut design = parse(&text).unwrap();
    assert_eq!(
        opt_mem_feedback(&mut design, &Selection::All),
        Err(NetlistError::MissingParam { cell: "$wr".to_owned(), param: "PRIORITY".to_owned() })
    );
}
