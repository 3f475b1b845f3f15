//! The top-level driver, in the shape of the teacher's own `Context`: a small struct holding the
//! run's configuration, with one entry point per method and one that iterates a whole program.

use crate::flowgraph::FlowGraph;
use crate::llir::{LlirGraph, VirtualRegister};
use crate::phi_prepass::TemporariedSet;
use crate::result::{LoweringError, LoweringResult};
use crate::settings::Options;
use crate::source::{Program, SourceGraph};
use crate::{lowering, verifier};

/// One method's finished lowering: its LLIR and its parameter registers, in declaration order.
pub struct LoweredMethod {
    pub graph: LlirGraph,
    pub param_registers: Vec<VirtualRegister>,
}

/// Drives lowering for a whole program or a single method, under one `Options`.
pub struct FirmToLlir {
    options: Options,
}

impl FirmToLlir {
    /// Create a driver with the given options.
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    /// The options this driver was constructed with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Lower every method in `program` independently. One method's failure is recorded in its own
    /// slot and does not prevent the rest of the program from lowering; callers that want
    /// fail-fast semantics can `.find(|(_, r)| r.is_err())` on the result themselves.
    ///
    /// Returned in `program`'s own insertion order.
    pub fn lower_program(&self, program: &mut Program) -> Vec<(String, LoweringResult<LoweredMethod>)> {
        program
            .methods_mut()
            .map(|method| {
                let result = self.lower_method(&method.name, &mut method.graph);
                (method.name.clone(), result)
            })
            .collect()
    }

    /// Lower a single method's `SourceGraph` into LLIR.
    pub fn lower_method(&self, name: &str, source: &mut SourceGraph) -> LoweringResult<LoweredMethod> {
        log::debug!("lowering method {}", name);

        source.enable_back_edges();
        let result = self.lower_method_inner(name, source);
        source.disable_back_edges();
        result
    }

    fn lower_method_inner(&self, name: &str, source: &SourceGraph) -> LoweringResult<LoweredMethod> {
        let flow = FlowGraph::compute(source);
        let temporaried = TemporariedSet::compute(source);

        let (graph, param_registers, phi_accumulators) = lowering::run(source, &flow, &temporaried)?;

        self.verify_if(name, &graph, &phi_accumulators)?;

        Ok(LoweredMethod { graph, param_registers })
    }

    /// Run the verifier only if `enable_verifier` is set.
    fn verify_if(
        &self,
        name: &str,
        graph: &LlirGraph,
        phi_accumulators: &[verifier::PhiAccumulator],
    ) -> LoweringResult<()> {
        if !self.options.enable_verifier {
            return Ok(());
        }
        log::trace!("verifying lowered method {}", name);
        verifier::verify(graph, phi_accumulators).map_err(|errors| {
            log::debug!("method {} failed verification: {}", name, errors);
            LoweringError::from(errors)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::builder::GraphBuilder;

    #[test]
    fn lowers_a_trivial_method() {
        let _ = env_logger::try_init();
        let mut builder = GraphBuilder::new();
        let start = builder.start_block();
        let mem = builder.mem_from_start();
        builder.ret(start, mem, None);

        let mut program = Program::new();
        program.add_method("empty", builder.finish());

        let driver = FirmToLlir::new(Options::default());
        let results = driver.lower_program(&mut program);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "empty");
        assert!(results[0].1.is_ok());
    }
}
