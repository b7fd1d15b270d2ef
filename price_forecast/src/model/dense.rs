//! Fully connected layer and inverted dropout

use super::lstm::glorot_uniform;
use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Activation applied after a dense layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Linear,
    Relu,
}

/// `y = act(x W + b)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    pub(crate) w: Array2<f64>,
    pub(crate) b: Array1<f64>,
    pub activation: Activation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DenseGrads {
    pub w: Array2<f64>,
    pub b: Array1<f64>,
}

/// Forward-pass record for [`Dense::backward`]
#[derive(Debug, Clone)]
pub struct DenseCache {
    x: Array2<f64>,
    y: Array2<f64>,
}

impl Dense {
    pub fn new<R: Rng>(inputs: usize, outputs: usize, activation: Activation, rng: &mut R) -> Self {
        Self {
            w: glorot_uniform(rng, inputs, outputs),
            b: Array1::zeros(outputs),
            activation,
        }
    }

    pub fn forward(&self, x: &Array2<f64>) -> (Array2<f64>, DenseCache) {
        let mut y = x.dot(&self.w) + &self.b;
        if self.activation == Activation::Relu {
            y.mapv_inplace(|v| v.max(0.0));
        }
        let cache = DenseCache {
            x: x.clone(),
            y: y.clone(),
        };
        (y, cache)
    }

    /// Gradient w.r.t. the input and the parameters
    pub fn backward(&self, cache: &DenseCache, dy: &Array2<f64>) -> (Array2<f64>, DenseGrads) {
        let mut dz = dy.clone();
        if self.activation == Activation::Relu {
            dz.zip_mut_with(&cache.y, |d, &y| {
                if y <= 0.0 {
                    *d = 0.0;
                }
            });
        }
        let grads = DenseGrads {
            w: cache.x.t().dot(&dz),
            b: dz.sum_axis(Axis(0)),
        };
        (dz.dot(&self.w.t()), grads)
    }

    pub fn parameter_count(&self) -> usize {
        self.w.len() + self.b.len()
    }

    /// `(inputs, outputs)` of the kernel, `None` when the bias disagrees
    pub fn dims(&self) -> Option<(usize, usize)> {
        (self.b.len() == self.w.ncols()).then(|| self.w.dim())
    }
}

/// Inverted dropout mask: kept units are scaled by `1 / (1 - rate)` so
/// inference needs no rescaling
pub fn dropout_mask<R: Rng>(rng: &mut R, rows: usize, cols: usize, rate: f64) -> Array2<f64> {
    if rate <= 0.0 {
        return Array2::ones((rows, cols));
    }
    let keep = 1.0 - rate;
    Array2::from_shape_fn((rows, cols), |_| {
        if rng.gen::<f64>() < keep {
            1.0 / keep
        } else {
            0.0
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_relu_blocks_negative_gradient() {
        let layer = Dense {
            w: array![[1.0, -1.0], [1.0, -1.0]],
            b: array![0.0, 0.0],
            activation: Activation::Relu,
        };
        let x = array![[1.0, 2.0]];
        let (y, cache) = layer.forward(&x);
        assert_eq!(y, array![[3.0, 0.0]]);

        let (dx, grads) = layer.backward(&cache, &array![[1.0, 1.0]]);
        assert_eq!(grads.w, array![[1.0, 0.0], [2.0, 0.0]]);
        assert_eq!(grads.b, array![1.0, 0.0]);
        assert_eq!(dx, array![[1.0, 1.0]]);
    }

    #[test]
    fn test_dropout_mask_scaling() {
        let mut rng = StdRng::seed_from_u64(5);
        let mask = dropout_mask(&mut rng, 200, 50, 0.2);
        assert!(mask.iter().all(|&m| m == 0.0 || (m - 1.25).abs() < 1e-12));
        let kept = mask.iter().filter(|&&m| m > 0.0).count() as f64 / mask.len() as f64;
        assert!((kept - 0.8).abs() < 0.03);

        assert!(dropout_mask(&mut rng, 3, 3, 0.0).iter().all(|&m| m == 1.0));
    }
}
