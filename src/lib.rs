//! Classification pipeline for the beer/wine demo application.
//!
//! The pipeline is a thin orchestration flow around an opaque pretrained
//! artifact: load the model once per process, normalize an input image to the
//! shape the model expects, run a single forward pass, and pair the resulting
//! probabilities with the fixed category labels. The UI lives in the `app`
//! workspace member.

pub mod classify;
pub mod model;
pub mod preprocess;

pub use classify::{classify, ClassificationError, ImageClassifier, Prediction, CATEGORIES};
pub use model::{load_model, Model, ModelError, MODEL_PATH};
pub use preprocess::{decode, preprocess, DecodeError, NormalizedImage, INPUT_SIZE};

// The UI decodes with the same image crate version the pipeline uses.
pub use image;
