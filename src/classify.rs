use std::error::Error;
use std::fmt::{Display, Formatter};

use ndarray::Array4;
use tract_onnx::prelude::*;

use crate::model::Model;
use crate::preprocess::{NormalizedImage, INPUT_SIZE};

/// The fixed, ordered output classes of the pretrained artifact.
pub const CATEGORIES: (&str, &str) = ("beer", "wine");

/// Per-channel normalization constants the artifact was trained with
/// (ImageNet statistics, applied after scaling pixels to [0,1]).
const CHANNEL_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const CHANNEL_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Errors that can occur during a single inference call.
#[derive(Debug)]
pub enum ClassificationError {
    /// The forward pass itself failed (corrupt tensor, shape mismatch, ...).
    Inference(String),
    /// The model produced a number of outputs other than one per category.
    WrongOutputArity { got: usize },
    /// The model produced a NaN or infinite probability.
    NonFiniteProbability,
}

impl Display for ClassificationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassificationError::Inference(reason) => {
                write!(f, "model inference failed: {}", reason)
            }
            ClassificationError::WrongOutputArity { got } => {
                write!(f, "expected one output per category (2), the model produced {}", got)
            }
            ClassificationError::NonFiniteProbability => {
                write!(f, "the model produced a non-finite probability")
            }
        }
    }
}

impl Error for ClassificationError {}

/// The seam between the pipeline and whatever runs the forward pass.
///
/// The pretrained [`Model`] is the production implementation; tests supply
/// fixtures with canned outputs.
pub trait ImageClassifier: Send + Sync {
    /// Returns the raw per-category probabilities for one normalized image.
    fn predict(&self, image: &NormalizedImage) -> Result<Vec<f32>, ClassificationError>;
}

impl ImageClassifier for Model {
    fn predict(&self, image: &NormalizedImage) -> Result<Vec<f32>, ClassificationError> {
        let tensor = to_tensor(image)
            .map_err(|e| ClassificationError::Inference(e.to_string()))?;
        self.run(tensor)
            .map_err(|e| ClassificationError::Inference(e.to_string()))
    }
}

/// One classification outcome: each category label paired with its
/// probability, in category order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde_crate::Serialize, serde_crate::Deserialize))]
#[cfg_attr(feature = "serde", serde(crate = "serde_crate"))]
pub struct Prediction {
    scores: Vec<(String, f32)>,
}

impl Prediction {
    /// The `(label, probability)` pairs, in the same order as the categories
    /// given to [`classify`].
    pub fn scores(&self) -> &[(String, f32)] {
        &self.scores
    }

    /// The probability assigned to `label`, if it is one of the categories.
    pub fn probability(&self, label: &str) -> Option<f32> {
        self.scores
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, p)| *p)
    }

    /// The most probable category.
    pub fn top(&self) -> (&str, f32) {
        let (label, p) = self
            .scores
            .iter()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .expect("a prediction always holds one score per category");
        (label.as_str(), *p)
    }
}

/// Runs single-image forward inference and pairs the raw probabilities with
/// `categories`, in order.
///
/// Single-shot and stateless: no retry, no partial-failure semantics, each
/// call independent. The model is expected to apply its own normalizing
/// activation (softmax), so the output is taken as-is and never
/// re-normalized here.
pub fn classify(
    image: &NormalizedImage,
    classifier: &dyn ImageClassifier,
    categories: (&str, &str),
) -> Result<Prediction, ClassificationError> {
    let probs = classifier.predict(image)?;
    if probs.len() != 2 {
        return Err(ClassificationError::WrongOutputArity { got: probs.len() });
    }
    if probs.iter().any(|p| !p.is_finite()) {
        return Err(ClassificationError::NonFiniteProbability);
    }
    Ok(Prediction {
        scores: vec![
            (categories.0.to_string(), probs[0]),
            (categories.1.to_string(), probs[1]),
        ],
    })
}

/// Converts a normalized bitmap into the `1×3×192×192` CHW f32 tensor the
/// artifact expects.
fn to_tensor(image: &NormalizedImage) -> TractResult<Tensor> {
    let side = INPUT_SIZE as usize;
    let rgb = image.as_rgb();
    let mut input = Array4::<f32>::zeros((1, 3, side, side));
    for y in 0..INPUT_SIZE {
        for x in 0..INPUT_SIZE {
            let pixel = rgb.get_pixel(x, y);
            for c in 0..3 {
                let value = (pixel[c] as f32 / 255.0 - CHANNEL_MEAN[c]) / CHANNEL_STD[c];
                input[[0, c, y as usize, x as usize]] = value;
            }
        }
    }
    let flat = input
        .as_slice()
        .expect("a freshly built Array4 is contiguous");
    let tensor = tract_ndarray::Array4::from_shape_vec((1, 3, side, side), flat.to_vec())?
        .into_tensor();
    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::preprocess;
    use approx::assert_abs_diff_eq;
    use image::{DynamicImage, RgbImage};

    /// Fixture classifier returning canned output, standing in for the
    /// external pretrained artifact.
    struct FixedClassifier(Vec<f32>);

    impl ImageClassifier for FixedClassifier {
        fn predict(&self, _image: &NormalizedImage) -> Result<Vec<f32>, ClassificationError> {
            Ok(self.0.clone())
        }
    }

    struct FailingClassifier;

    impl ImageClassifier for FailingClassifier {
        fn predict(&self, _image: &NormalizedImage) -> Result<Vec<f32>, ClassificationError> {
            Err(ClassificationError::Inference("shape mismatch".to_string()))
        }
    }

    fn any_image() -> NormalizedImage {
        let rgb = RgbImage::from_pixel(30, 50, image::Rgb([120, 40, 200]));
        preprocess(&DynamicImage::ImageRgb8(rgb))
    }

    #[test]
    fn test_classify_pairs_probabilities_with_categories_in_order() {
        let classifier = FixedClassifier(vec![0.9, 0.1]);
        let prediction = classify(&any_image(), &classifier, CATEGORIES).unwrap();
        assert_eq!(prediction.scores()[0].0, "beer");
        assert_eq!(prediction.scores()[1].0, "wine");
        assert_abs_diff_eq!(prediction.probability("beer").unwrap(), 0.9);
        assert_abs_diff_eq!(prediction.probability("wine").unwrap(), 0.1);
        assert_eq!(prediction.top(), ("beer", 0.9));
    }

    #[test]
    fn test_classify_output_sums_to_one() {
        let classifier = FixedClassifier(vec![0.37, 0.63]);
        let prediction = classify(&any_image(), &classifier, CATEGORIES).unwrap();
        let sum: f32 = prediction.scores().iter().map(|(_, p)| p).sum();
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-4);
        for (_, p) in prediction.scores() {
            assert!((0.0..=1.0).contains(p));
        }
    }

    #[test]
    fn test_classify_rejects_wrong_output_arity() {
        let classifier = FixedClassifier(vec![0.2, 0.3, 0.5]);
        let result = classify(&any_image(), &classifier, CATEGORIES);
        assert!(matches!(
            result,
            Err(ClassificationError::WrongOutputArity { got: 3 })
        ));
    }

    #[test]
    fn test_classify_rejects_non_finite_output() {
        let classifier = FixedClassifier(vec![f32::NAN, 1.0]);
        let result = classify(&any_image(), &classifier, CATEGORIES);
        assert!(matches!(result, Err(ClassificationError::NonFiniteProbability)));
    }

    #[test]
    fn test_classify_propagates_inference_failure() {
        let result = classify(&any_image(), &FailingClassifier, CATEGORIES);
        match result {
            Err(ClassificationError::Inference(reason)) => {
                assert!(reason.contains("shape mismatch"));
            }
            other => panic!("expected an inference error, got {:?}", other),
        }
    }
}
