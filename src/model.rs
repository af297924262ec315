use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use tract_onnx::prelude::*;

/// Fixed relative path of the pretrained artifact.
pub const MODEL_PATH: &str = "model_beerwine.onnx";

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Errors that can occur while loading the pretrained artifact.
#[derive(Debug)]
pub enum ModelError {
    /// The artifact file does not exist at the attempted path.
    NotFound { path: PathBuf },
    /// The artifact exists but could not be deserialized or optimized.
    Load { path: PathBuf, reason: String },
}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::NotFound { path } => {
                write!(f, "the model file {} does not exist", path.display())
            }
            ModelError::Load { path, reason } => {
                write!(f, "failed to load the model file {}: {}", path.display(), reason)
            }
        }
    }
}

impl Error for ModelError {}

/// A loaded, immutable pretrained classifier.
///
/// The wrapped `tract` plan runs inference through `&self`, so a `Model`
/// behind an `Arc` is safe to share across threads for concurrent read-only
/// forward passes.
pub struct Model {
    plan: OnnxPlan,
    path: PathBuf,
}

impl Model {
    /// Reads, optimizes and compiles the ONNX artifact at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(ModelError::NotFound { path });
        }
        let plan = onnx()
            .model_for_path(&path)
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| ModelError::Load {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        Ok(Model { plan, path })
    }

    /// Runs a single forward pass over one preassembled input tensor and
    /// returns the raw output values.
    pub(crate) fn run(&self, input: Tensor) -> TractResult<Vec<f32>> {
        let outputs = self.plan.run(tvec!(input.into()))?;
        let view = outputs[0].to_array_view::<f32>()?;
        Ok(view.iter().copied().collect())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

static MODEL: OnceLock<Arc<Model>> = OnceLock::new();

/// Returns the process-wide classifier handle, loading the artifact from
/// [`MODEL_PATH`] on first use.
///
/// The handle is memoized for the lifetime of the process; later calls hit
/// the cache and perform no disk I/O. A failed load is not cached, so a call
/// made after the artifact appears on disk will succeed.
pub fn load_model() -> Result<Arc<Model>, ModelError> {
    if let Some(model) = MODEL.get() {
        return Ok(model.clone());
    }
    let loaded = Arc::new(Model::load(MODEL_PATH)?);
    Ok(MODEL.get_or_init(|| loaded).clone())
}
