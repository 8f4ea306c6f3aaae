//! Conversion classifier: random forest, training pipeline, evaluation metrics, bundle persistence.

mod bundle;
mod forest;
pub mod metrics;
pub mod train;

pub use bundle::TrainedModel;
pub use forest::{ForestParams, RandomForest};
pub use train::{Trainer, TrainingOutcome};

/// Binary classifier over a feature row in model order.
pub trait Classifier: Send + Sync {
    /// Probability of the positive (converting) class, in [0, 1].
    fn predict_proba(&self, row: &[f64]) -> f64;

    /// The classifier's own class decision. Not required to agree with a 0.5 cut on
    /// [`Classifier::predict_proba`].
    fn predict(&self, row: &[f64]) -> u8;
}
