use log::{debug, info};
use ndarray::{Array2, Axis};
use nnet::{
    CachingCompiler, Compiler, ComputationRequest, Nnet, NnetComputer, NnetExample,
    ObjectiveType,
    matrix::{SpMatrix, packed_dim},
};

use crate::{
    NnetComputeProbOptions, ObjectiveOutput, Result, XvecErr, XvectorObjective, XvectorOutputs,
    stats::{ObjectiveStats, SimpleObjectiveInfo, report_line},
};

/// Computes the xvector objective of a network over a stream of minibatches,
/// accumulating per-output totals and, optionally, the parameter gradient.
pub struct NnetXvectorComputeProb<'a, C = CachingCompiler<'a>>
where
    C: Compiler,
{
    config: NnetComputeProbOptions,
    nnet: &'a Nnet,
    outputs: XvectorOutputs,
    deriv_nnet: Option<Nnet>,
    compiler: C,

    num_minibatches_processed: usize,
    objf_info: ObjectiveStats,
}

impl<'a> NnetXvectorComputeProb<'a> {
    /// Creates a new `NnetXvectorComputeProb` that compiles through a `CachingCompiler`.
    ///
    /// # Arguments
    /// * `config` - The options.
    /// * `nnet` - The network to evaluate. It is never modified.
    ///
    /// # Returns
    /// The driver, or a fatal error if the network's outputs do not fit the objective.
    pub fn new(config: NnetComputeProbOptions, nnet: &'a Nnet) -> Result<Self> {
        Self::with_compiler(config, nnet, CachingCompiler::new(nnet))
    }
}

impl<'a, C: Compiler> NnetXvectorComputeProb<'a, C> {
    /// Creates a new `NnetXvectorComputeProb` with a custom compiler.
    pub fn with_compiler(
        config: NnetComputeProbOptions,
        nnet: &'a Nnet,
        compiler: C,
    ) -> Result<Self> {
        let outputs = XvectorOutputs::classify(nnet)?;

        let deriv_nnet = config.compute_deriv.then(|| {
            let mut deriv = nnet.clone();
            deriv.set_zero();
            deriv
        });

        Ok(Self {
            config,
            nnet,
            outputs,
            deriv_nnet,
            compiler,
            num_minibatches_processed: 0,
            objf_info: ObjectiveStats::new(),
        })
    }

    /// Forgets every accumulated statistic and zeroes the gradient network.
    pub fn reset(&mut self) {
        self.num_minibatches_processed = 0;
        self.objf_info.clear();
        if let Some(deriv) = &mut self.deriv_nnet {
            deriv.set_zero();
        }
    }

    /// Runs one minibatch through the network and accumulates its objective. With
    /// `compute_deriv`, the gradient is added to the gradient network.
    pub fn compute(&mut self, eg: &NnetExample) -> Result<()> {
        let need_model_derivative = self.config.compute_deriv;
        let store_component_stats = false;
        let request = ComputationRequest::for_example(
            self.nnet,
            eg,
            need_model_derivative,
            store_component_stats,
        )?;
        let computation = self.compiler.compile(&request)?;

        let mut computer = NnetComputer::new(
            self.config.compute_config,
            &computation,
            self.nnet,
            self.deriv_nnet.as_mut(),
        );
        computer.accept_inputs(eg.io())?;
        computer.forward()?;

        let out = process_outputs(
            &self.outputs,
            &mut computer,
            XvectorObjective::new(eg.weight()),
            need_model_derivative,
        )?;

        let name = self.outputs.pair_embedding();
        self.objf_info.add(name, out.tot_objf, out.tot_weight);
        self.num_minibatches_processed += 1;
        debug!(
            output = name,
            objf = out.tot_objf,
            weight = out.tot_weight;
            "processed minibatch {}",
            self.num_minibatches_processed
        );

        if need_model_derivative {
            computer.backward()?;
        }

        Ok(())
    }

    /// Logs one line per accumulated output.
    ///
    /// # Returns
    /// Whether any output accumulated a positive weight.
    pub fn print_total_stats(&self) -> bool {
        let mut ans = false;
        for (name, info) in self.objf_info.iter() {
            let objective = self
                .nnet
                .objective_type(name)
                .unwrap_or(ObjectiveType::Quadratic);

            info!("{}", report_line(name, objective, info));
            if info.tot_weight > 0.0 {
                ans = true;
            }
        }

        ans
    }

    /// Returns the totals of the output called `name`, if it was ever processed.
    pub fn objective(&self, name: &str) -> Option<&SimpleObjectiveInfo> {
        self.objf_info.get(name)
    }

    /// Returns the gradient network.
    ///
    /// # Errors
    /// `XvecErr::DerivNotRequested` if the driver was built without `compute_deriv`.
    pub fn deriv(&self) -> Result<&Nnet> {
        self.deriv_nnet.as_ref().ok_or(XvecErr::DerivNotRequested)
    }

    pub fn num_minibatches_processed(&self) -> usize {
        self.num_minibatches_processed
    }

    pub fn outputs(&self) -> &XvectorOutputs {
        &self.outputs
    }
}

/// Evaluates the objective on the forward outputs and, when `supply_deriv`, hands
/// the derivatives back to the computer for the backward pass.
fn process_outputs(
    outputs: &XvectorOutputs,
    computer: &mut NnetComputer<'_>,
    objective: XvectorObjective,
    supply_deriv: bool,
) -> Result<ObjectiveOutput> {
    let xvector_pairs = computer.get_output(outputs.pair_embedding())?;
    let xvec_s = computer.get_output(outputs.s())?;
    let xvec_b = computer.get_output(outputs.b())?;

    let dim = xvector_pairs.ncols();
    if xvec_s.nrows() != 1 {
        return Err(XvecErr::SizeMismatch {
            what: "rows of s",
            got: xvec_s.nrows(),
            expected: 1,
        });
    }
    if xvec_b.dim() != (1, 1) {
        return Err(XvecErr::SizeMismatch {
            what: "elements of b",
            got: xvec_b.len(),
            expected: 1,
        });
    }

    let s = SpMatrix::from_packed(dim, xvec_s.row(0)).map_err(|_| XvecErr::SizeMismatch {
        what: "columns of s",
        got: xvec_s.ncols(),
        expected: packed_dim(dim),
    })?;
    let b = xvec_b[[0, 0]];

    let mut out = objective.evaluate(xvector_pairs, &s, b, supply_deriv)?;

    if let Some(derivs) = out.derivs.take() {
        let deriv_s = derivs.s.insert_axis(Axis(0));
        let deriv_b = Array2::from_elem((1, 1), derivs.b);

        computer.accept_output_deriv(outputs.pair_embedding(), derivs.xvector)?;
        computer.accept_output_deriv(outputs.s(), deriv_s)?;
        computer.accept_output_deriv(outputs.b(), deriv_b)?;
    }

    Ok(out)
}
