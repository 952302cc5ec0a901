use std::collections::{BTreeMap, BTreeSet};

use rtlopt_netlist::{cell_type, CellId, Design, Module, NetlistError, Selection, SigBit, SigMap};

use crate::classify::AsyncReadBits;
use crate::mux::{sigmap_through_undef_muxes, MuxIndex};
use crate::reachability::NonFeedbackNets;
use crate::synth::ConditionSynthesizer;
use crate::trace::{FeedbackTracer, State};

/// What a run of [`opt_mem_feedback`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeedbackStats {
    /// Memories that had at least one pure feedback read port.
    pub memories: usize,
    /// Write ports whose address matched such a read port.
    pub write_ports: usize,
    /// Distinct feedback conditions turned into enable logic.
    pub conditions: usize,
    /// Multiplexer operand bits replaced with `x`.
    pub dont_care_bits: usize,
}

impl std::ops::AddAssign for FeedbackStats {
    fn add_assign(&mut self, other: FeedbackStats) {
        self.memories += other.memories;
        self.write_ports += other.write_ports;
        self.conditions += other.conditions;
        self.dont_care_bits += other.dont_care_bits;
    }
}

#[derive(Debug, Default)]
struct MemoryPorts {
    read_ports: Vec<CellId>,
    write_ports: Vec<CellId>,
}

fn display_id(name: &str) -> &str {
    name.strip_prefix('\\').unwrap_or(name)
}

struct FeedbackWorker<'a> {
    module: &'a mut Module,
    sigmap: SigMap,
    sigmap_xmux: SigMap,
    muxes: MuxIndex,
    synthesizer: ConditionSynthesizer,
    stats: FeedbackStats,
}

impl<'a> FeedbackWorker<'a> {
    fn new(module: &'a mut Module) -> Result<FeedbackWorker<'a>, NetlistError> {
        let sigmap = SigMap::from_module(module);
        let sigmap_xmux = sigmap_through_undef_muxes(module, &sigmap)?;
        let muxes = MuxIndex::new(module, &sigmap)?;
        Ok(FeedbackWorker {
            module,
            sigmap,
            sigmap_xmux,
            muxes,
            synthesizer: ConditionSynthesizer::new(),
            stats: FeedbackStats::default(),
        })
    }

    fn index_memories(&self) -> Result<BTreeMap<String, MemoryPorts>, NetlistError> {
        let mut memories: BTreeMap<String, MemoryPorts> = BTreeMap::new();
        for (cell_id, cell) in self.module.cells() {
            if cell.is_type(&[cell_type::MEMRD]) {
                memories.entry(cell.get_param_string("MEMID")?).or_default().read_ports.push(cell_id);
            } else if cell.is_type(&[cell_type::MEMWR]) {
                memories.entry(cell.get_param_string("MEMID")?).or_default().write_ports.push(cell_id);
            }
        }
        for ports in memories.values_mut() {
            ports.read_ports.sort_by(|&a, &b| self.module.cell(a).name.cmp(&self.module.cell(b).name));
            let mut keyed = Vec::new();
            for &cell_id in &ports.write_ports {
                keyed.push((self.module.cell(cell_id).get_param_int("PRIORITY")?, cell_id));
            }
            keyed.sort_by_key(|&(priority, _)| priority);
            ports.write_ports = Vec::from_iter(keyed.into_iter().map(|(_, cell_id)| cell_id));
        }
        Ok(memories)
    }

    fn run(mut self) -> Result<FeedbackStats, NetlistError> {
        for (memid, ports) in self.index_memories()? {
            self.translate_feedback_to_enable(&memid, &ports)?;
        }
        Ok(self.stats)
    }

    fn translate_feedback_to_enable(&mut self, memid: &str, ports: &MemoryPorts) -> Result<(), NetlistError> {
        let non_feedback = NonFeedbackNets::compute(self.module, &self.sigmap, memid)?;
        let async_read_bits = AsyncReadBits::collect(self.module, &self.sigmap, &ports.read_ports, &non_feedback)?;
        if async_read_bits.is_empty() {
            return Ok(());
        }

        log::info!(
            "Populating enable bits on write ports of memory {}.{} with async read feedback:",
            display_id(&self.module.name),
            display_id(memid)
        );
        self.stats.memories += 1;

        // Operand bits that carried feedback to some write port, and those that some write data
        // bit of this memory reaches without matching.
        let mut feedback = BTreeSet::new();
        let mut shared = BTreeSet::new();

        for &cell_id in &ports.write_ports {
            let cell = self.module.cell(cell_id);
            let addr = self.sigmap_xmux.apply(cell.get_port("ADDR")?);
            let data = cell.get_port("DATA")?.clone();
            let mut enable = cell.get_port("EN")?.clone();
            if enable.len() != data.len() {
                return Err(NetlistError::WidthMismatch {
                    context: format!("{}.EN", cell.name),
                    expected: data.len(),
                    actual: enable.len(),
                });
            }

            let matched = async_read_bits.contains_address(&addr);
            if matched {
                log::info!("  Analyzing write port {}.", display_id(&cell.name));
                self.stats.write_ports += 1;
            }

            let mut fired = false;
            let mut created_conditions = 0;
            for lane in 0..data.len() {
                if self.sigmap.apply_bit(enable[lane]) == SigBit::ZERO {
                    continue;
                }

                let targets = async_read_bits.targets(&addr, lane);
                let mut tracer = FeedbackTracer::new(self.module, &self.sigmap, &self.muxes, targets);
                tracer.trace(self.sigmap.apply_bit(data[lane]), &State::new())?;
                let traced = tracer.finish();
                shared.extend(traced.visited.difference(&traced.feedback).copied());
                feedback.extend(traced.feedback);
                if traced.conditions.is_empty() {
                    continue;
                }

                let synthesized = self.synthesizer.synthesize(self.module, &traced.conditions, enable[lane]);
                enable.replace(lane, synthesized.enable);
                created_conditions += synthesized.created_conditions;
                fired = true;
            }

            if fired {
                log::info!("    Added enable logic for {created_conditions} different cases.");
                self.module.cell_mut(cell_id).set_port("EN", enable);
                self.stats.conditions += created_conditions;
            }
        }

        for operand in feedback {
            let name = &self.module.cell(operand.cell).name;
            if shared.contains(&operand) {
                log::debug!("Keeping {}.{}[{}], it also reaches non-feedback write data.", name, operand.port, operand.lane);
                continue;
            }
            log::debug!("Replacing {}.{}[{}] with x.", name, operand.port, operand.lane);
            self.module.replace_port_bit(operand.cell, operand.port, operand.lane, SigBit::UNDEF)?;
            self.stats.dont_care_bits += 1;
        }
        Ok(())
    }
}

/// Runs the feedback-to-enable transformation on a single module.
pub fn opt_mem_feedback_module(module: &mut Module) -> Result<FeedbackStats, NetlistError> {
    FeedbackWorker::new(module)?.run()
}

/// Detects asynchronous memory read ports whose data is routed through multiplexers back into a
/// write port at the same address, and turns each such path into a condition on the write enable.
///
/// The multiplexer operands that carried the feedback are replaced with `x`, so that later
/// passes can simplify them away, possibly removing the read port altogether.
pub fn opt_mem_feedback(design: &mut Design, selection: &Selection) -> Result<FeedbackStats, NetlistError> {
    let mut stats = FeedbackStats::default();
    for name in design.selected_modules(selection) {
        if let Some(module) = design.module_mut(&name) {
            stats += opt_mem_feedback_module(module)?;
        }
    }
    Ok(stats)
}
