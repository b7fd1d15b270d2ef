//! LSTM layer with backpropagation through time
//!
//! Gates are packed along the last axis in the order input, forget,
//! cell candidate, output, so a single matrix product per time step
//! produces all four pre-activations.

use ndarray::{s, Array1, Array2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Logistic sigmoid
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Glorot uniform initialization for a `fan_in x fan_out` kernel
pub fn glorot_uniform<R: Rng>(rng: &mut R, fan_in: usize, fan_out: usize) -> Array2<f64> {
    let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
    Array2::from_shape_fn((fan_in, fan_out), |_| rng.gen_range(-limit..limit))
}

/// One recurrent layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmLayer {
    pub input_size: usize,
    pub units: usize,
    /// Input kernel, `input_size x 4*units`
    pub(crate) w: Array2<f64>,
    /// Recurrent kernel, `units x 4*units`
    pub(crate) u: Array2<f64>,
    pub(crate) b: Array1<f64>,
}

/// Activations of one time step kept for the backward pass
#[derive(Debug, Clone)]
struct Step {
    x: Array2<f64>,
    h_prev: Array2<f64>,
    c_prev: Array2<f64>,
    i: Array2<f64>,
    f: Array2<f64>,
    g: Array2<f64>,
    o: Array2<f64>,
    tanh_c: Array2<f64>,
}

/// Forward-pass record of a whole sequence
#[derive(Debug, Clone, Default)]
pub struct LstmCache {
    steps: Vec<Step>,
}

/// Gradients with the same shapes as the layer parameters
#[derive(Debug, Clone, PartialEq)]
pub struct LstmGrads {
    pub w: Array2<f64>,
    pub u: Array2<f64>,
    pub b: Array1<f64>,
}

impl LstmLayer {
    /// Glorot uniform kernels, forget gate bias 1, other biases 0
    pub fn new<R: Rng>(input_size: usize, units: usize, rng: &mut R) -> Self {
        let mut b = Array1::<f64>::zeros(4 * units);
        b.slice_mut(s![units..2 * units]).fill(1.0);
        Self {
            input_size,
            units,
            w: glorot_uniform(rng, input_size, 4 * units),
            u: glorot_uniform(rng, units, 4 * units),
            b,
        }
    }

    /// Run the layer over `xs` (one `batch x input_size` matrix per time
    /// step) from a zero state, returning the hidden state of every step
    pub fn forward(&self, xs: &[Array2<f64>]) -> (Vec<Array2<f64>>, LstmCache) {
        let batch = xs.first().map_or(0, |x| x.nrows());
        let n = self.units;
        let mut h = Array2::<f64>::zeros((batch, n));
        let mut c = Array2::<f64>::zeros((batch, n));
        let mut outputs = Vec::with_capacity(xs.len());
        let mut cache = LstmCache {
            steps: Vec::with_capacity(xs.len()),
        };

        for x in xs {
            let z = x.dot(&self.w) + h.dot(&self.u) + &self.b;
            let i = z.slice(s![.., 0..n]).mapv(sigmoid);
            let f = z.slice(s![.., n..2 * n]).mapv(sigmoid);
            let g = z.slice(s![.., 2 * n..3 * n]).mapv(f64::tanh);
            let o = z.slice(s![.., 3 * n..4 * n]).mapv(sigmoid);

            let c_next = &f * &c + &i * &g;
            let tanh_c = c_next.mapv(f64::tanh);
            let h_next = &o * &tanh_c;

            cache.steps.push(Step {
                x: x.clone(),
                h_prev: h,
                c_prev: c,
                i,
                f,
                g,
                o,
                tanh_c,
            });
            outputs.push(h_next.clone());
            h = h_next;
            c = c_next;
        }
        (outputs, cache)
    }

    /// Backpropagate `dh` (loss gradient w.r.t. each step's hidden
    /// output; zeros where a step feeds nothing) through the sequence.
    /// Returns the gradient w.r.t. each step's input and the parameter
    /// gradients summed over time.
    pub fn backward(&self, cache: &LstmCache, dh: &[Array2<f64>]) -> (Vec<Array2<f64>>, LstmGrads) {
        let n = self.units;
        let mut grads = LstmGrads {
            w: Array2::zeros(self.w.raw_dim()),
            u: Array2::zeros(self.u.raw_dim()),
            b: Array1::zeros(self.b.raw_dim()),
        };
        let mut dxs = vec![Array2::<f64>::zeros((0, self.input_size)); cache.steps.len()];
        let Some(first) = cache.steps.first() else {
            return (dxs, grads);
        };
        let batch = first.x.nrows();
        let mut dh_next = Array2::<f64>::zeros((batch, n));
        let mut dc_next = Array2::<f64>::zeros((batch, n));

        for (t, step) in cache.steps.iter().enumerate().rev() {
            let dh_t = &dh[t] + &dh_next;
            let d_o = &dh_t * &step.tanh_c;
            let dc = &dc_next + &(&dh_t * &step.o * &step.tanh_c.mapv(|v| 1.0 - v * v));
            let d_i = &dc * &step.g;
            let d_g = &dc * &step.i;
            let d_f = &dc * &step.c_prev;
            dc_next = &dc * &step.f;

            let dz_i = d_i * &step.i.mapv(|v| v * (1.0 - v));
            let dz_f = d_f * &step.f.mapv(|v| v * (1.0 - v));
            let dz_g = d_g * &step.g.mapv(|v| 1.0 - v * v);
            let dz_o = d_o * &step.o.mapv(|v| v * (1.0 - v));
            let mut dz = Array2::<f64>::zeros((batch, 4 * n));
            for (k, part) in [dz_i, dz_f, dz_g, dz_o].iter().enumerate() {
                dz.slice_mut(s![.., k * n..(k + 1) * n]).assign(part);
            }

            grads.w += &step.x.t().dot(&dz);
            grads.u += &step.h_prev.t().dot(&dz);
            grads.b += &dz.sum_axis(Axis(0));

            dxs[t] = dz.dot(&self.w.t());
            dh_next = dz.dot(&self.u.t());
        }
        (dxs, grads)
    }

    pub fn parameter_count(&self) -> usize {
        self.w.len() + self.u.len() + self.b.len()
    }

    /// Whether the kernels and bias agree with `input_size` and `units`
    pub fn is_consistent(&self) -> bool {
        let gates = 4 * self.units;
        self.units > 0
            && self.w.dim() == (self.input_size, gates)
            && self.u.dim() == (self.units, gates)
            && self.b.len() == gates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sequence(batch: usize, steps: usize, features: usize) -> Vec<Array2<f64>> {
        (0..steps)
            .map(|t| {
                Array2::from_shape_fn((batch, features), |(b, f)| {
                    ((t * 7 + b * 3 + f) as f64 * 0.37).sin() * 0.5
                })
            })
            .collect()
    }

    /// Sum of the last hidden state, the scalar used for gradient checks
    fn loss(layer: &LstmLayer, xs: &[Array2<f64>]) -> f64 {
        let (hs, _) = layer.forward(xs);
        hs.last().map_or(0.0, |h| h.sum())
    }

    #[test]
    fn test_init_and_shapes() {
        let mut rng = StdRng::seed_from_u64(1);
        let layer = LstmLayer::new(3, 4, &mut rng);
        assert_eq!(layer.w.dim(), (3, 16));
        assert_eq!(layer.u.dim(), (4, 16));
        assert_eq!(layer.b.slice(s![4..8]).to_vec(), vec![1.0; 4]);
        assert_eq!(layer.b.slice(s![0..4]).to_vec(), vec![0.0; 4]);
        assert_eq!(layer.parameter_count(), 3 * 16 + 4 * 16 + 16);

        let (hs, _) = layer.forward(&sequence(2, 5, 3));
        assert_eq!(hs.len(), 5);
        assert_eq!(hs[4].dim(), (2, 4));
        assert!(hs.iter().flatten().all(|v| v.abs() < 1.0));
    }

    #[test]
    fn test_gradients_match_finite_differences() {
        let mut rng = StdRng::seed_from_u64(9);
        let layer = LstmLayer::new(2, 3, &mut rng);
        let xs = sequence(2, 4, 2);

        let (hs, cache) = layer.forward(&xs);
        let mut dh: Vec<Array2<f64>> = hs.iter().map(|h| Array2::zeros(h.raw_dim())).collect();
        dh[3].fill(1.0);
        let (dxs, grads) = layer.backward(&cache, &dh);

        let eps = 1e-6;
        for &(r, c) in &[(0, 0), (1, 5), (0, 11)] {
            let mut plus = layer.clone();
            plus.w[[r, c]] += eps;
            let mut minus = layer.clone();
            minus.w[[r, c]] -= eps;
            let numeric = (loss(&plus, &xs) - loss(&minus, &xs)) / (2.0 * eps);
            assert_relative_eq!(grads.w[[r, c]], numeric, epsilon = 1e-6);
        }
        for &(r, c) in &[(0, 2), (2, 9)] {
            let mut plus = layer.clone();
            plus.u[[r, c]] += eps;
            let mut minus = layer.clone();
            minus.u[[r, c]] -= eps;
            let numeric = (loss(&plus, &xs) - loss(&minus, &xs)) / (2.0 * eps);
            assert_relative_eq!(grads.u[[r, c]], numeric, epsilon = 1e-6);
        }
        for &k in &[1, 4, 10] {
            let mut plus = layer.clone();
            plus.b[k] += eps;
            let mut minus = layer.clone();
            minus.b[k] -= eps;
            let numeric = (loss(&plus, &xs) - loss(&minus, &xs)) / (2.0 * eps);
            assert_relative_eq!(grads.b[k], numeric, epsilon = 1e-6);
        }

        let mut plus = xs.clone();
        plus[1][[1, 0]] += eps;
        let mut minus = xs.clone();
        minus[1][[1, 0]] -= eps;
        let numeric = (loss(&layer, &plus) - loss(&layer, &minus)) / (2.0 * eps);
        assert_relative_eq!(dxs[1][[1, 0]], numeric, epsilon = 1e-6);
    }
}
