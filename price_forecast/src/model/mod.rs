//! Stacked LSTM regressor
//!
//! `LSTM(units[0], full sequence) -> Dropout -> ... -> LSTM(units[n-1],
//! last state) -> Dropout -> Dense(dense_units, ReLU) -> Dense(1)`.
//! Inputs are one scaled window per row; the network reads the window
//! one value per time step.

pub mod adam;
pub mod dense;
pub mod lstm;

use crate::error::{ForecastError, Result};
use crate::scaler::MinMaxScaler;
use adam::Adam;
use dense::{dropout_mask, Activation, Dense, DenseCache, DenseGrads};
use lstm::{LstmCache, LstmGrads, LstmLayer};
use market_data::{storage, LoadOutcome};
use ndarray::{Array1, Array2, ArrayViewD, ArrayViewMutD, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Anything that maps a batch of windows to one prediction per window
pub trait SequenceModel {
    /// Display name used in logs
    fn name(&self) -> &str;

    /// Number of values each input row must have
    fn window_len(&self) -> usize;

    /// Predict one value per row of `inputs`
    fn predict(&self, inputs: &Array2<f64>) -> Result<Array1<f64>>;
}

/// Network shape and initialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Width of each stacked LSTM layer, bottom first
    pub lstm_units: Vec<usize>,
    /// Dropout rate after every LSTM layer
    pub dropout: f64,
    pub dense_units: usize,
    /// Seeds weight init, dropout masks and batch shuffling
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            lstm_units: vec![50, 50],
            dropout: 0.2,
            dense_units: 25,
            seed: 42,
        }
    }
}

impl ModelConfig {
    pub fn with_lstm_units(mut self, units: Vec<usize>) -> Self {
        self.lstm_units = units;
        self
    }

    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    pub fn with_dense_units(mut self, units: usize) -> Self {
        self.dense_units = units;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.lstm_units.is_empty() || self.lstm_units.contains(&0) {
            return Err(ForecastError::InvalidParameter(
                "At least one LSTM layer with positive width is required".to_string(),
            ));
        }
        if self.dense_units == 0 {
            return Err(ForecastError::InvalidParameter(
                "Dense layer width must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ForecastError::InvalidParameter(format!(
                "Dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        Ok(())
    }
}

/// Gradients for every parameter of an [`LstmModel`]
#[derive(Debug, Clone, PartialEq)]
pub struct ModelGrads {
    pub lstm: Vec<LstmGrads>,
    pub hidden: DenseGrads,
    pub output: DenseGrads,
}

impl ModelGrads {
    /// Views in the same order as [`LstmModel::parameters_mut`]
    pub fn views(&self) -> Vec<ArrayViewD<'_, f64>> {
        let mut views = Vec::with_capacity(3 * self.lstm.len() + 4);
        for g in &self.lstm {
            views.push(g.w.view().into_dyn());
            views.push(g.u.view().into_dyn());
            views.push(g.b.view().into_dyn());
        }
        views.push(self.hidden.w.view().into_dyn());
        views.push(self.hidden.b.view().into_dyn());
        views.push(self.output.w.view().into_dyn());
        views.push(self.output.b.view().into_dyn());
        views
    }

    /// Global L2 norm
    pub fn norm(&self) -> f64 {
        self.views()
            .iter()
            .map(|v| v.iter().map(|g| g * g).sum::<f64>())
            .sum::<f64>()
            .sqrt()
    }

    /// Rescale so the global norm is at most `max_norm`
    pub fn clip(&mut self, max_norm: f64) {
        let norm = self.norm();
        if norm > max_norm && norm > 0.0 {
            let factor = max_norm / norm;
            for g in &mut self.lstm {
                g.w *= factor;
                g.u *= factor;
                g.b *= factor;
            }
            for g in [&mut self.hidden, &mut self.output] {
                g.w *= factor;
                g.b *= factor;
            }
        }
    }
}

/// Loss and gradients of one mini-batch
#[derive(Debug, Clone)]
pub struct BatchGradients {
    pub loss: f64,
    pub mae: f64,
    pub grads: ModelGrads,
}

struct ForwardCache {
    steps: usize,
    lstm: Vec<LstmCache>,
    /// Dropout masks per LSTM layer: one per time step for sequence
    /// layers, a single one for the last layer
    masks: Vec<Vec<Option<Array2<f64>>>>,
    hidden: DenseCache,
    output: DenseCache,
}

/// Stacked LSTM regressor, optionally carrying the scaler it was trained with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmModel {
    pub config: ModelConfig,
    window_len: usize,
    lstm: Vec<LstmLayer>,
    hidden: Dense,
    output: Dense,
    scaler: Option<MinMaxScaler>,
}

impl LstmModel {
    /// Freshly initialized network for windows of `window_len` values
    pub fn new(config: ModelConfig, window_len: usize) -> Result<Self> {
        config.validate()?;
        if window_len == 0 {
            return Err(ForecastError::InvalidParameter(
                "Window length must be positive".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut lstm = Vec::with_capacity(config.lstm_units.len());
        let mut input_size = 1;
        for &units in &config.lstm_units {
            lstm.push(LstmLayer::new(input_size, units, &mut rng));
            input_size = units;
        }
        let hidden = Dense::new(input_size, config.dense_units, Activation::Relu, &mut rng);
        let output = Dense::new(config.dense_units, 1, Activation::Linear, &mut rng);

        Ok(Self {
            config,
            window_len,
            lstm,
            hidden,
            output,
            scaler: None,
        })
    }

    /// Attach the scaler that maps prices to model inputs
    pub fn with_scaler(mut self, scaler: MinMaxScaler) -> Self {
        self.scaler = Some(scaler);
        self
    }

    pub fn scaler(&self) -> Option<&MinMaxScaler> {
        self.scaler.as_ref()
    }

    pub fn parameter_count(&self) -> usize {
        self.lstm.iter().map(LstmLayer::parameter_count).sum::<usize>()
            + self.hidden.parameter_count()
            + self.output.parameter_count()
    }

    /// Views in the same order as [`ModelGrads::views`]
    pub fn parameters_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>> {
        let mut params = Vec::with_capacity(3 * self.lstm.len() + 4);
        for layer in &mut self.lstm {
            params.push(layer.w.view_mut().into_dyn());
            params.push(layer.u.view_mut().into_dyn());
            params.push(layer.b.view_mut().into_dyn());
        }
        params.push(self.hidden.w.view_mut().into_dyn());
        params.push(self.hidden.b.view_mut().into_dyn());
        params.push(self.output.w.view_mut().into_dyn());
        params.push(self.output.b.view_mut().into_dyn());
        params
    }

    fn check_inputs(&self, inputs: &Array2<f64>) -> Result<()> {
        if inputs.ncols() != self.window_len {
            return Err(ForecastError::ShapeError(format!(
                "expected windows of {} values, got {}",
                self.window_len,
                inputs.ncols()
            )));
        }
        Ok(())
    }

    /// Forward pass; dropout is active only when `rng` is given
    fn forward(&self, inputs: &Array2<f64>, mut rng: Option<&mut StdRng>) -> (Array1<f64>, ForwardCache) {
        let batch = inputs.nrows();
        let mut xs: Vec<Array2<f64>> = inputs
            .axis_iter(Axis(1))
            .map(|col| col.to_owned().insert_axis(Axis(1)))
            .collect();

        let last = self.lstm.len() - 1;
        let mut caches = Vec::with_capacity(self.lstm.len());
        let mut masks = Vec::with_capacity(self.lstm.len());
        for (k, layer) in self.lstm.iter().enumerate() {
            let (mut hs, cache) = layer.forward(&xs);
            caches.push(cache);
            if k < last {
                let layer_masks = hs
                    .iter_mut()
                    .map(|h| self.apply_dropout(h, rng.as_deref_mut()))
                    .collect();
                masks.push(layer_masks);
                xs = hs;
            } else {
                let mut h = hs
                    .pop()
                    .unwrap_or_else(|| Array2::zeros((batch, layer.units)));
                masks.push(vec![self.apply_dropout(&mut h, rng.as_deref_mut())]);
                xs = vec![h];
            }
        }

        let (hidden_out, hidden_cache) = self.hidden.forward(&xs[0]);
        let (out, output_cache) = self.output.forward(&hidden_out);
        let predictions = out.column(0).to_owned();
        let cache = ForwardCache {
            steps: self.window_len,
            lstm: caches,
            masks,
            hidden: hidden_cache,
            output: output_cache,
        };
        (predictions, cache)
    }

    fn apply_dropout(&self, h: &mut Array2<f64>, rng: Option<&mut StdRng>) -> Option<Array2<f64>> {
        let rng = rng?;
        if self.config.dropout <= 0.0 {
            return None;
        }
        let mask = dropout_mask(rng, h.nrows(), h.ncols(), self.config.dropout);
        *h *= &mask;
        Some(mask)
    }

    fn backward(&self, cache: &ForwardCache, d_pred: &Array1<f64>) -> ModelGrads {
        let d_out = d_pred.clone().insert_axis(Axis(1));
        let (d_hidden_out, output) = self.output.backward(&cache.output, &d_out);
        let (d_last, hidden) = self.hidden.backward(&cache.hidden, &d_hidden_out);

        let last = self.lstm.len() - 1;
        let mut lstm_grads = Vec::with_capacity(self.lstm.len());
        let mut d_seq: Vec<Array2<f64>> = Vec::new();
        for k in (0..self.lstm.len()).rev() {
            let layer = &self.lstm[k];
            let dh: Vec<Array2<f64>> = if k == last {
                let mut d = d_last.clone();
                if let Some(Some(mask)) = cache.masks[k].first() {
                    d *= mask;
                }
                let mut dh = vec![Array2::zeros(d.raw_dim()); cache.steps];
                dh[cache.steps - 1] = d;
                dh
            } else {
                d_seq
                    .iter()
                    .zip(&cache.masks[k])
                    .map(|(d, mask)| match mask {
                        Some(m) => d * m,
                        None => d.clone(),
                    })
                    .collect()
            };
            let (dxs, grads) = layer.backward(&cache.lstm[k], &dh);
            lstm_grads.push(grads);
            d_seq = dxs;
        }
        lstm_grads.reverse();

        ModelGrads {
            lstm: lstm_grads,
            hidden,
            output,
        }
    }

    /// MSE loss, MAE and gradients of one batch, with dropout drawn from `rng`
    pub fn batch_gradients(
        &self,
        inputs: &Array2<f64>,
        targets: &Array1<f64>,
        rng: &mut StdRng,
    ) -> Result<BatchGradients> {
        self.check_inputs(inputs)?;
        if inputs.nrows() != targets.len() || targets.is_empty() {
            return Err(ForecastError::ShapeError(format!(
                "{} windows but {} targets",
                inputs.nrows(),
                targets.len()
            )));
        }
        let (predictions, cache) = self.forward(inputs, Some(rng));
        let errors = &predictions - targets;
        let n = targets.len() as f64;
        let loss = errors.mapv(|e| e * e).sum() / n;
        let mae = errors.mapv(f64::abs).sum() / n;
        let d_pred = errors.mapv(|e| 2.0 * e / n);
        Ok(BatchGradients {
            loss,
            mae,
            grads: self.backward(&cache, &d_pred),
        })
    }

    /// Apply one optimizer step
    pub fn apply_gradients(&mut self, grads: &ModelGrads, optimizer: &mut Adam) {
        optimizer.step(self.parameters_mut(), grads.views());
    }

    /// Predict the next price after the last `window_len` values of
    /// `prices`, in original units. Needs the attached scaler.
    pub fn forecast_next(&self, prices: &[f64]) -> Result<f64> {
        let scaler = self.scaler.as_ref().ok_or_else(|| {
            ForecastError::InvalidParameter("Model has no scaler attached".to_string())
        })?;
        if prices.len() < self.window_len {
            return Err(ForecastError::InsufficientData(format!(
                "need {} prices for a forecast, got {}",
                self.window_len,
                prices.len()
            )));
        }
        let recent = scaler.transform(&prices[prices.len() - self.window_len..])?;
        let inputs = Array2::from_shape_vec((1, self.window_len), recent)?;
        let scaled = self.predict(&inputs)?;
        let restored = scaler.inverse_transform(&scaled.to_vec())?;
        restored.first().copied().ok_or_else(|| {
            ForecastError::TrainingError("Model returned no prediction".to_string())
        })
    }

    /// Write the model as JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        storage::write_json(path, self)?;
        Ok(())
    }

    /// Read a model written by [`LstmModel::save`]
    pub fn load(path: &Path) -> Result<LoadOutcome<Self>> {
        let outcome: LoadOutcome<Self> = storage::read_json(path)?;
        if let LoadOutcome::Loaded(model) = &outcome {
            model.config.validate()?;
            model.check_structure().map_err(|reason| {
                ForecastError::SerializationError(format!("{}: {}", path.display(), reason))
            })?;
        }
        Ok(outcome)
    }

    /// Every weight shape must chain from one input feature to one output
    fn check_structure(&self) -> std::result::Result<(), String> {
        if self.window_len == 0 {
            return Err("window length is zero".to_string());
        }
        if self.lstm.len() != self.config.lstm_units.len() {
            return Err(format!(
                "{} LSTM layers, configuration lists {}",
                self.lstm.len(),
                self.config.lstm_units.len()
            ));
        }

        let mut input_size = 1;
        for (i, (layer, &units)) in self.lstm.iter().zip(&self.config.lstm_units).enumerate() {
            if layer.input_size != input_size || layer.units != units || !layer.is_consistent() {
                return Err(format!(
                    "LSTM layer {} does not map {} inputs to {} units",
                    i, input_size, units
                ));
            }
            input_size = units;
        }

        let dense_units = self.config.dense_units;
        if self.hidden.dims() != Some((input_size, dense_units)) {
            return Err(format!(
                "hidden layer does not map {} inputs to {} units",
                input_size, dense_units
            ));
        }
        if self.output.dims() != Some((dense_units, 1)) {
            return Err(format!("output layer does not map {} inputs to 1", dense_units));
        }
        Ok(())
    }
}

impl SequenceModel for LstmModel {
    fn name(&self) -> &str {
        "LSTM"
    }

    fn window_len(&self) -> usize {
        self.window_len
    }

    fn predict(&self, inputs: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_inputs(inputs)?;
        if inputs.nrows() == 0 {
            return Ok(Array1::zeros(0));
        }
        let (predictions, _) = self.forward(inputs, None);
        Ok(predictions)
    }
}

/// Persistence baseline: the next value equals the last one in the window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastValue {
    pub window_len: usize,
}

impl SequenceModel for LastValue {
    fn name(&self) -> &str {
        "Last value"
    }

    fn window_len(&self) -> usize {
        self.window_len
    }

    fn predict(&self, inputs: &Array2<f64>) -> Result<Array1<f64>> {
        if inputs.ncols() != self.window_len || self.window_len == 0 {
            return Err(ForecastError::ShapeError(format!(
                "expected windows of {} values, got {}",
                self.window_len,
                inputs.ncols()
            )));
        }
        Ok(inputs.column(self.window_len - 1).to_owned())
    }
}
