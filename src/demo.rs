//! A small xvector network and random minibatches to drive it with.

use ndarray::Array2;
use ndarray_rand::{RandomExt, rand_distr::StandardNormal};
use nnet::{
    Float, Nnet, NnetBuilder, NnetExample, NnetIo, ObjectiveType, component::Component,
    matrix::packed_dim,
};
use rand::Rng;

pub const INPUT_DIM: usize = 8;
pub const HIDDEN_DIM: usize = 16;
pub const XVECTOR_DIM: usize = 4;
pub const PAIRS_PER_MINIBATCH: usize = 8;

/// input -> affine -> sigmoid -> affine -> "output", plus learnable "s" and "b".
pub fn xvector_nnet<R: Rng + ?Sized>(rng: &mut R) -> nnet::Result<Nnet> {
    let mut nnet = NnetBuilder::new()
        .input("input", INPUT_DIM)?
        .component("affine1", "input", Component::affine((INPUT_DIM, HIDDEN_DIM)))?
        .component("sigmoid1", "affine1", Component::sigmoid(HIDDEN_DIM))?
        .component("affine2", "sigmoid1", Component::affine((HIDDEN_DIM, XVECTOR_DIM)))?
        .output("output", "affine2", ObjectiveType::Linear)?
        .component("s-const", "input", Component::constant(packed_dim(XVECTOR_DIM)))?
        .output("s", "s-const", ObjectiveType::Linear)?
        .component("b-const", "input", Component::constant(1))?
        .output("b", "b-const", ObjectiveType::Linear)?
        .build();

    nnet.randomize(rng);
    Ok(nnet)
}

/// Random features for `PAIRS_PER_MINIBATCH` pairs. Rows of a pair share a
/// speaker offset so that same-speaker pairs are closer than the rest.
pub fn random_example<R: Rng + ?Sized>(rng: &mut R) -> NnetExample {
    let rows = 2 * PAIRS_PER_MINIBATCH;
    let speakers =
        Array2::<Float>::random_using((PAIRS_PER_MINIBATCH, INPUT_DIM), StandardNormal, rng);
    let noise = Array2::<Float>::random_using((rows, INPUT_DIM), StandardNormal, rng) * 0.3;
    let features = Array2::from_shape_fn((rows, INPUT_DIM), |(r, c)| {
        speakers[[r / 2, c]] + noise[[r, c]]
    });

    NnetExample::new([NnetIo::new("input", features)])
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};
    use xvector::{NnetComputeProbOptions, NnetXvectorComputeProb};

    use super::*;

    #[test]
    fn demo_network_runs_through_the_diagnostics() {
        let mut rng = StdRng::seed_from_u64(0);
        let nnet = xvector_nnet(&mut rng).unwrap();
        let mut prob =
            NnetXvectorComputeProb::new(NnetComputeProbOptions::new(true), &nnet).unwrap();

        for _ in 0..3 {
            prob.compute(&random_example(&mut rng)).unwrap();
        }

        let info = prob.objective("output").unwrap();
        assert_eq!(info.tot_weight, 3.0 * (2 * PAIRS_PER_MINIBATCH) as Float);
        assert!(info.tot_objective < 0.0);
        assert!(prob.print_total_stats());

        let deriv = prob.deriv().unwrap();
        assert!(deriv.dot_product(deriv).unwrap() > 0.0);
    }
}
