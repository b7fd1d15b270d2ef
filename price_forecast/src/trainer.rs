//! Mini-batch training with a trailing validation split and early stopping

use crate::error::{ForecastError, Result};
use crate::metrics::{mean_absolute_error, mean_squared_error};
use crate::model::adam::{Adam, AdamConfig};
use crate::model::{LstmModel, SequenceModel};
use crate::window::{train_size, Windows};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Settings for [`fit`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub max_epochs: usize,
    pub batch_size: usize,
    /// Trailing share of the training windows held out for validation
    pub validation_fraction: f64,
    /// Epochs without improvement before stopping
    pub patience: usize,
    /// Smallest decrease of the monitored loss that counts as improvement
    pub min_delta: f64,
    /// Put back the weights of the best epoch when training ends
    pub restore_best: bool,
    /// Shuffle batch order within the fit portion every epoch
    pub shuffle: bool,
    /// Clip the global gradient norm of each batch
    pub clip_norm: Option<f64>,
    pub optimizer: AdamConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            max_epochs: 100,
            batch_size: 32,
            validation_fraction: 0.2,
            patience: 10,
            min_delta: 0.0,
            restore_best: true,
            shuffle: true,
            clip_norm: None,
            optimizer: AdamConfig::default(),
        }
    }
}

impl TrainingConfig {
    pub fn with_max_epochs(mut self, epochs: usize) -> Self {
        self.max_epochs = epochs;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_patience(mut self, patience: usize) -> Self {
        self.patience = patience;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.optimizer.learning_rate = learning_rate;
        self
    }

    pub fn with_validation_fraction(mut self, fraction: f64) -> Self {
        self.validation_fraction = fraction;
        self
    }

    pub fn with_clip_norm(mut self, clip_norm: Option<f64>) -> Self {
        self.clip_norm = clip_norm;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_epochs == 0 || self.batch_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "Epochs and batch size must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.validation_fraction) {
            return Err(ForecastError::InvalidParameter(format!(
                "Validation fraction must be in [0, 1), got {}",
                self.validation_fraction
            )));
        }
        if self.optimizer.learning_rate <= 0.0 {
            return Err(ForecastError::InvalidParameter(
                "Learning rate must be positive".to_string(),
            ));
        }
        if matches!(self.clip_norm, Some(c) if c <= 0.0) {
            return Err(ForecastError::InvalidParameter(
                "Clip norm must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-epoch record of a training run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub loss: Vec<f64>,
    pub mae: Vec<f64>,
    /// Empty when no validation windows were held out
    pub val_loss: Vec<f64>,
    pub val_mae: Vec<f64>,
    /// Zero-based epoch whose weights the model ended with
    pub best_epoch: usize,
    pub stopped_early: bool,
}

impl TrainingHistory {
    pub fn epochs(&self) -> usize {
        self.loss.len()
    }

    /// Validation loss when available, else training loss
    pub fn monitored(&self) -> &[f64] {
        if self.val_loss.is_empty() {
            &self.loss
        } else {
            &self.val_loss
        }
    }
}

/// What the stopper decided after an epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopDecision {
    Improved,
    Continue,
    Stop,
}

/// Stop once the monitored loss has not improved for `patience` epochs
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    min_delta: f64,
    best_value: Option<f64>,
    best_epoch: usize,
    epochs_without_improvement: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize, min_delta: f64) -> Self {
        Self {
            patience,
            min_delta,
            best_value: None,
            best_epoch: 0,
            epochs_without_improvement: 0,
        }
    }

    pub fn best_epoch(&self) -> usize {
        self.best_epoch
    }

    pub fn update(&mut self, epoch: usize, value: f64) -> StopDecision {
        let improved = match self.best_value {
            None => true,
            Some(best) => value < best - self.min_delta,
        };
        if improved {
            self.best_value = Some(value);
            self.best_epoch = epoch;
            self.epochs_without_improvement = 0;
            return StopDecision::Improved;
        }

        self.epochs_without_improvement += 1;
        if self.patience > 0 && self.epochs_without_improvement >= self.patience {
            StopDecision::Stop
        } else {
            StopDecision::Continue
        }
    }
}

/// Train `model` on `windows` (already scaled), holding out the last
/// `validation_fraction` of them for early stopping
pub fn fit(model: &mut LstmModel, windows: &Windows, config: &TrainingConfig) -> Result<TrainingHistory> {
    config.validate()?;
    if windows.is_empty() {
        return Err(ForecastError::InsufficientData(
            "no training windows".to_string(),
        ));
    }

    let fit_len = train_size(windows.len(), config.validation_fraction).max(1);
    let fit_set = windows.slice(0, fit_len);
    let val_set = windows.slice(fit_len, windows.len());
    info!(
        "Training {} on {} windows ({} validation), up to {} epochs",
        model.name(),
        fit_set.len(),
        val_set.len(),
        config.max_epochs
    );

    let mut rng = StdRng::seed_from_u64(model.config.seed.wrapping_add(1));
    let mut optimizer = Adam::new(config.optimizer);
    let mut stopper = EarlyStopping::new(config.patience, config.min_delta);
    let mut history = TrainingHistory::default();
    let mut best: Option<LstmModel> = None;
    let mut order: Vec<usize> = (0..fit_set.len()).collect();

    for epoch in 0..config.max_epochs {
        if config.shuffle {
            order.shuffle(&mut rng);
        }

        let mut loss_sum = 0.0;
        let mut mae_sum = 0.0;
        for chunk in order.chunks(config.batch_size) {
            let batch = fit_set.select(chunk);
            let mut step = model.batch_gradients(&batch.inputs, &batch.targets, &mut rng)?;
            if let Some(max_norm) = config.clip_norm {
                step.grads.clip(max_norm);
            }
            model.apply_gradients(&step.grads, &mut optimizer);
            loss_sum += step.loss * chunk.len() as f64;
            mae_sum += step.mae * chunk.len() as f64;
        }
        let loss = loss_sum / fit_set.len() as f64;
        let mae = mae_sum / fit_set.len() as f64;
        if !loss.is_finite() {
            return Err(ForecastError::TrainingError(format!(
                "loss became non-finite at epoch {}",
                epoch + 1
            )));
        }
        history.loss.push(loss);
        history.mae.push(mae);

        let monitored = if val_set.is_empty() {
            debug!("epoch {:>3}: loss={:.6} mae={:.6}", epoch + 1, loss, mae);
            loss
        } else {
            let predicted = model.predict(&val_set.inputs)?.to_vec();
            let actual = val_set.targets.to_vec();
            let val_loss = mean_squared_error(&actual, &predicted)?;
            let val_mae = mean_absolute_error(&actual, &predicted)?;
            history.val_loss.push(val_loss);
            history.val_mae.push(val_mae);
            debug!(
                "epoch {:>3}: loss={:.6} mae={:.6} val_loss={:.6} val_mae={:.6}",
                epoch + 1,
                loss,
                mae,
                val_loss,
                val_mae
            );
            val_loss
        };

        match stopper.update(epoch, monitored) {
            StopDecision::Improved => {
                if config.restore_best {
                    best = Some(model.clone());
                }
            }
            StopDecision::Continue => {}
            StopDecision::Stop => {
                info!(
                    "Stopping early at epoch {} (no improvement since epoch {})",
                    epoch + 1,
                    stopper.best_epoch() + 1
                );
                history.stopped_early = true;
                break;
            }
        }
    }

    history.best_epoch = history.epochs().saturating_sub(1);
    if let Some(best) = best {
        *model = best;
        history.best_epoch = stopper.best_epoch();
    }
    info!(
        "Finished after {} epochs, best epoch {}",
        history.epochs(),
        history.best_epoch + 1
    );
    Ok(history)
}
