//! Adam optimizer over a list of parameter tensors
//!
//! ```text
//! m = beta1 * m + (1 - beta1) * g
//! v = beta2 * v + (1 - beta2) * g^2
//! p = p - lr * (m / (1 - beta1^t)) / (sqrt(v / (1 - beta2^t)) + epsilon)
//! ```

use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, Zip};
use serde::{Deserialize, Serialize};

/// Adam hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdamConfig {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
        }
    }
}

/// Adam state: one pair of moment estimates per parameter tensor
#[derive(Debug, Clone)]
pub struct Adam {
    config: AdamConfig,
    m: Vec<ArrayD<f64>>,
    v: Vec<ArrayD<f64>>,
    t: u64,
}

impl Adam {
    pub fn new(config: AdamConfig) -> Self {
        Self {
            config,
            m: Vec::new(),
            v: Vec::new(),
            t: 0,
        }
    }

    pub fn timestep(&self) -> u64 {
        self.t
    }

    /// Apply one update. `params` and `grads` must list the same tensors
    /// in the same order on every call.
    pub fn step(&mut self, params: Vec<ArrayViewMutD<f64>>, grads: Vec<ArrayViewD<f64>>) {
        if self.m.len() != params.len() {
            self.m = grads.iter().map(|g| ArrayD::zeros(g.raw_dim())).collect();
            self.v = self.m.clone();
        }
        self.t += 1;

        let AdamConfig {
            learning_rate,
            beta1,
            beta2,
            epsilon,
        } = self.config;
        let bias_correction1 = 1.0 - beta1.powi(self.t as i32);
        let bias_correction2 = 1.0 - beta2.powi(self.t as i32);

        for (((param, grad), m), v) in params
            .into_iter()
            .zip(grads)
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
        {
            Zip::from(param)
                .and(&grad)
                .and(m)
                .and(v)
                .for_each(|p, &g, m, v| {
                    *m = beta1 * *m + (1.0 - beta1) * g;
                    *v = beta2 * *v + (1.0 - beta2) * g * g;
                    let m_hat = *m / bias_correction1;
                    let v_hat = *v / bias_correction2;
                    *p -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
                });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array1};

    #[test]
    fn test_first_step_moves_by_learning_rate() {
        let mut adam = Adam::new(AdamConfig {
            learning_rate: 0.1,
            ..Default::default()
        });
        let mut p = array![1.0, 2.0, 3.0];
        let g = array![0.5, -2.0, 0.0];
        adam.step(vec![p.view_mut().into_dyn()], vec![g.view().into_dyn()]);

        // bias-corrected first step is lr * sign(g)
        assert_relative_eq!(p[0], 0.9, epsilon = 1e-6);
        assert_relative_eq!(p[1], 2.1, epsilon = 1e-6);
        assert_relative_eq!(p[2], 3.0);
        assert_eq!(adam.timestep(), 1);
    }

    #[test]
    fn test_minimizes_quadratic() {
        let mut adam = Adam::new(AdamConfig {
            learning_rate: 0.05,
            ..Default::default()
        });
        let target = array![3.0, -1.0];
        let mut p = Array1::<f64>::zeros(2);
        for _ in 0..2000 {
            let g = 2.0 * (&p - &target);
            adam.step(vec![p.view_mut().into_dyn()], vec![g.view().into_dyn()]);
        }
        assert_relative_eq!(p[0], 3.0, epsilon = 5e-2);
        assert_relative_eq!(p[1], -1.0, epsilon = 5e-2);
    }
}
