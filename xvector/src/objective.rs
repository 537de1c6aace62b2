//! The pairwise xvector objective.
//!
//! Rows `2k` and `2k + 1` of the embedding matrix come from the same speaker;
//! every other pair of rows comes from different speakers. With `S` the
//! symmetric scoring matrix and `b` the bias, the score of rows `i < j` is
//!
//! ```text
//! L(i, j) = x_i . x_j - x_i' S x_i - x_j' S x_j + b
//! ```
//!
//! Same-speaker pairs contribute `log sigmoid(L)`; different-speaker pairs
//! contribute `K log(1 - sigmoid(L))` with `K = 1 / (n - 2)`, so both classes
//! weigh about the same no matter the minibatch size.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use nnet::{Float, matrix::SpMatrix};

use crate::{Result, XvecErr};

/// Derivatives of the objective w.r.t. the three network outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct XvectorDerivs {
    /// Same shape as the embedding matrix.
    pub xvector: Array2<Float>,
    /// One entry per packed entry of `S`.
    pub s: Array1<Float>,
    pub b: Float,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveOutput {
    pub tot_objf: Float,
    pub tot_weight: Float,
    pub derivs: Option<XvectorDerivs>,
}

/// Evaluates the objective over one minibatch of embeddings.
#[derive(Debug, Clone, Copy)]
pub struct XvectorObjective {
    weight: Float,
}

impl Default for XvectorObjective {
    fn default() -> Self {
        Self { weight: 1.0 }
    }
}

impl XvectorObjective {
    /// Creates a new `XvectorObjective`.
    ///
    /// # Arguments
    /// * `weight` - The weight of every embedding row.
    pub fn new(weight: Float) -> Self {
        Self { weight }
    }

    /// Computes the weighted objective and, if `supply_deriv`, its derivatives.
    ///
    /// # Arguments
    /// * `xvector_pairs` - The embeddings, one per row, same-speaker rows adjacent.
    /// * `s` - The scoring matrix.
    /// * `b` - The bias.
    /// * `supply_deriv` - Whether to compute the derivatives.
    ///
    /// # Returns
    /// The total objective, the total weight (`weight * rows`) and the derivatives,
    /// or an error if `s` does not match the embedding dimension or the weight is
    /// negative or not finite.
    pub fn evaluate(
        &self,
        xvector_pairs: ArrayView2<Float>,
        s: &SpMatrix,
        b: Float,
        supply_deriv: bool,
    ) -> Result<ObjectiveOutput> {
        let (n, dim) = xvector_pairs.dim();
        if s.dim() != dim {
            return Err(XvecErr::SizeMismatch {
                what: "scoring matrix",
                got: s.dim(),
                expected: dim,
            });
        }

        let w = self.weight;
        if !w.is_finite() || w < 0.0 {
            return Err(XvecErr::InvalidWeight { weight: w });
        }

        let s_full = s.unpack();

        // p_i = S x_i, r_i = x_i' S x_i
        let p = xvector_pairs.dot(&s_full);
        let r = (&xvector_pairs * &p).sum_axis(Axis(1));
        let q = xvector_pairs.dot(&xvector_pairs.t());
        let k = if n > 2 { 1.0 / (n - 2) as Float } else { 0.0 };

        let mut tot_objf = 0.0;
        // d(i, j) = w * dterm / dL(i, j), only kept when derivatives are wanted
        let mut d = supply_deriv.then(|| Array2::<Float>::zeros((n, n)));
        for i in 0..n {
            for j in i + 1..n {
                let l = q[[i, j]] - r[i] - r[j] + b;
                let same = is_same_speaker(i, j);
                tot_objf += if same { log_sigmoid(l) } else { k * log_sigmoid(-l) };

                if let Some(d) = d.as_mut() {
                    let deriv = if same { sigmoid(-l) } else { -k * sigmoid(l) };
                    d[[i, j]] = w * deriv;
                    d[[j, i]] = w * deriv;
                }
            }
        }

        let derivs = d.map(|d| {
            // c_k = sum_j d(k, j); dL/dx_k = sum_j d(k, j) x_j - 2 c_k S x_k
            let c = d.sum_axis(Axis(1));
            let c_col = c.view().insert_axis(Axis(1));

            let mut xvector = d.dot(&xvector_pairs);
            xvector.scaled_add(-2.0, &(&p * &c_col));

            let weighted = &xvector_pairs * &c_col;
            let s_grad = -xvector_pairs.t().dot(&weighted);

            XvectorDerivs {
                xvector,
                s: SpMatrix::pack_gradient(s_grad.view()),
                b: c.sum() / 2.0,
            }
        });

        Ok(ObjectiveOutput {
            tot_objf: w * tot_objf,
            tot_weight: w * n as Float,
            derivs,
        })
    }
}

#[inline]
fn is_same_speaker(i: usize, j: usize) -> bool {
    i % 2 == 0 && j == i + 1
}

fn sigmoid(x: Float) -> Float {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

fn log_sigmoid(x: Float) -> Float {
    if x >= 0.0 {
        -(-x).exp().ln_1p()
    } else {
        x - x.exp().ln_1p()
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use ndarray_rand::{RandomExt, rand_distr::StandardNormal};
    use nnet::matrix::packed_dim;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    const EPS: Float = 1e-5;

    fn assert_close(analytic: Float, numeric: Float, what: &str) {
        let scale = analytic.abs().max(numeric.abs()).max(1.0);
        assert!(
            (analytic - numeric).abs() / scale < 1e-4,
            "{what}: analytic {analytic} vs numeric {numeric}"
        );
    }

    fn random_inputs(rng: &mut StdRng, n: usize, dim: usize) -> (Array2<Float>, SpMatrix, Float) {
        let x = Array2::<Float>::random_using((n, dim), StandardNormal, rng);
        let a = Array2::<Float>::random_using((dim, dim), StandardNormal, rng) * 0.3;
        let s_full = (&a + &a.t()) / 2.0;
        let b = Array1::<Float>::random_using(1, StandardNormal, rng)[0];
        (x, SpMatrix::from_full(s_full.view()), b)
    }

    fn objf(objective: &XvectorObjective, x: &Array2<Float>, s: &SpMatrix, b: Float) -> Float {
        objective.evaluate(x.view(), s, b, false).unwrap().tot_objf
    }

    #[test]
    fn derivatives_match_finite_differences() {
        let mut rng = StdRng::seed_from_u64(1234);
        let objective = XvectorObjective::new(0.7);

        for (n, dim) in [(2, 3), (6, 3), (8, 4), (5, 2)] {
            let (x, s, b) = random_inputs(&mut rng, n, dim);
            let out = objective.evaluate(x.view(), &s, b, true).unwrap();
            let derivs = out.derivs.unwrap();

            for ((i, j), &analytic) in derivs.xvector.indexed_iter() {
                let mut plus = x.clone();
                plus[[i, j]] += EPS;
                let mut minus = x.clone();
                minus[[i, j]] -= EPS;
                let numeric =
                    (objf(&objective, &plus, &s, b) - objf(&objective, &minus, &s, b)) / (2. * EPS);
                assert_close(analytic, numeric, &format!("x[{i}][{j}] (n={n})"));
            }

            for p in 0..packed_dim(dim) {
                let mut plus = s.packed().to_owned();
                plus[p] += EPS;
                let mut minus = s.packed().to_owned();
                minus[p] -= EPS;
                let plus = SpMatrix::from_packed(dim, plus.view()).unwrap();
                let minus = SpMatrix::from_packed(dim, minus.view()).unwrap();
                let numeric =
                    (objf(&objective, &x, &plus, b) - objf(&objective, &x, &minus, b)) / (2. * EPS);
                assert_close(derivs.s[p], numeric, &format!("s[{p}] (n={n})"));
            }

            let plus = objf(&objective, &x, &s, b + EPS);
            let minus = objf(&objective, &x, &s, b - EPS);
            let numeric = (plus - minus) / (2. * EPS);
            assert_close(derivs.b, numeric, &format!("b (n={n})"));
        }
    }

    #[test]
    fn identity_scoring_matches_hand_computed_value() {
        // Same-speaker scores are 1 - 1 - 1 = -1, different-speaker scores are
        // 0 - 1 - 1 = -2, and K = 1/2 for four rows.
        let x = array![[1., 0.], [1., 0.], [0., 1.], [0., 1.]];
        let s = SpMatrix::from_packed(2, array![1., 0., 1.].view()).unwrap();
        let out = XvectorObjective::default()
            .evaluate(x.view(), &s, 0.0, false)
            .unwrap();

        let expected = -2.0 * ((1.0 + std::f64::consts::E).ln() + (1.0 + (-2.0f64).exp()).ln());
        assert_eq!(out.tot_weight, 4.0);
        assert!((out.tot_objf - expected).abs() < 1e-12);
        assert!((out.tot_objf - -2.880_379_397_1).abs() < 1e-9);
        assert!(out.derivs.is_none());
    }

    #[test]
    fn weight_scales_objective_and_total_weight() {
        let mut rng = StdRng::seed_from_u64(9);
        let (x, s, b) = random_inputs(&mut rng, 6, 3);
        let unit = XvectorObjective::default().evaluate(x.view(), &s, b, true).unwrap();
        let half = XvectorObjective::new(0.5).evaluate(x.view(), &s, b, true).unwrap();

        assert_eq!(half.tot_weight, 3.0);
        assert!((half.tot_objf - 0.5 * unit.tot_objf).abs() < 1e-12);
        assert!((half.derivs.unwrap().b - 0.5 * unit.derivs.unwrap().b).abs() < 1e-12);
    }

    #[test]
    fn empty_minibatch_yields_zeros() {
        let s = SpMatrix::from_packed(3, Array1::zeros(6).view()).unwrap();
        let out = XvectorObjective::default()
            .evaluate(Array2::zeros((0, 3)).view(), &s, 0.5, true)
            .unwrap();

        assert_eq!(out.tot_objf, 0.0);
        assert_eq!(out.tot_weight, 0.0);
        let derivs = out.derivs.unwrap();
        assert_eq!(derivs.xvector.dim(), (0, 3));
        assert_eq!(derivs.s, Array1::<Float>::zeros(6));
        assert_eq!(derivs.b, 0.0);
    }

    #[test]
    fn extreme_scores_stay_finite() {
        let x = array![[30., 0.], [30., 0.], [0., -30.], [0., 30.]];
        let s = SpMatrix::from_packed(2, array![0., 0., 0.].view()).unwrap();
        let out = XvectorObjective::default()
            .evaluate(x.view(), &s, 0.0, true)
            .unwrap();

        assert!(out.tot_objf.is_finite());
        let derivs = out.derivs.unwrap();
        assert!(derivs.xvector.iter().all(|v| v.is_finite()));
        assert!(derivs.s.iter().all(|v| v.is_finite()));
        assert!(derivs.b.is_finite());
    }

    #[test]
    fn negative_or_non_finite_weight_is_rejected() {
        let x = array![[1., 0.], [1., 0.], [0., 1.], [0., 1.]];
        let s = SpMatrix::from_packed(2, array![1., 0., 1.].view()).unwrap();

        for weight in [-1.0, Float::NAN, Float::INFINITY] {
            let err = XvectorObjective::new(weight)
                .evaluate(x.view(), &s, 0.0, true)
                .unwrap_err();
            assert!(matches!(err, XvecErr::InvalidWeight { .. }), "weight {weight}");
            assert!(err.is_fatal());
        }

        let zero = XvectorObjective::new(0.0)
            .evaluate(x.view(), &s, 0.0, false)
            .unwrap();
        assert_eq!(zero.tot_weight, 0.0);
    }

    #[test]
    fn mismatched_scoring_matrix_is_rejected() {
        let s = SpMatrix::from_packed(3, Array1::zeros(6).view()).unwrap();
        let err = XvectorObjective::default()
            .evaluate(Array2::zeros((4, 2)).view(), &s, 0.0, false)
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
