use shared::{BoneClass, Report};
use std::collections::BTreeMap;

use super::InferenceError;

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub predicted_class: BoneClass,
    /// Probability of the predicted class, in percent.
    pub confidence: f64,
    pub class_probabilities: BTreeMap<BoneClass, f64>,
}

pub fn softmax(scores: &[f32]) -> Vec<f64> {
    let max = scores
        .iter()
        .map(|&s| s as f64)
        .fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|&s| (s as f64 - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Raw logits are normalised when there is one per class; any other output is
/// taken to be a distribution already.
pub fn normalize(scores: &[f32]) -> Vec<f64> {
    if scores.len() == BoneClass::ALL.len() {
        softmax(scores)
    } else {
        scores.iter().map(|&s| s as f64).collect()
    }
}

impl Prediction {
    pub fn from_scores(scores: &[f32]) -> Result<Self, InferenceError> {
        if scores.is_empty() {
            return Err(InferenceError::Output("model returned no scores".into()));
        }
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(InferenceError::Output("model returned non-finite scores".into()));
        }

        let probabilities = normalize(scores);

        let (best_index, best_probability) = probabilities
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, p)| {
                if p > best.1 { (i, p) } else { best }
            });

        let predicted_class = BoneClass::from_index(best_index)
            .ok_or(InferenceError::UnknownClass(best_index))?;

        let class_probabilities = BoneClass::ALL
            .iter()
            .enumerate()
            .map(|(i, class)| {
                probabilities
                    .get(i)
                    .map(|p| (*class, p * 100.0))
                    .ok_or_else(|| {
                        InferenceError::Output(format!(
                            "expected {} scores, got {}",
                            BoneClass::ALL.len(),
                            probabilities.len()
                        ))
                    })
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(Self {
            predicted_class,
            confidence: best_probability * 100.0,
            class_probabilities,
        })
    }

    pub fn into_report(self, image_id: String, timestamp: String) -> Report {
        Report {
            image_id,
            predicted_class: self.predicted_class,
            confidence: self.confidence,
            class_probabilities: self.class_probabilities,
            timestamp,
            user_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn softmax_is_a_distribution() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn softmax_survives_large_logits() {
        let probs = softmax(&[1000.0, 1001.0, 999.0]);
        assert!(probs.iter().all(|p| p.is_finite()));
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn logits_are_normalised_and_argmax_selected() {
        let prediction = Prediction::from_scores(&[0.1, 2.5, -1.0]).unwrap();
        let total: f64 = prediction.class_probabilities.values().sum();

        assert_eq!(prediction.predicted_class, BoneClass::Osteopenia);
        assert!((total - 100.0).abs() < 1e-6);
        assert_eq!(
            prediction.confidence,
            prediction.class_probabilities[&BoneClass::Osteopenia]
        );
        let argmax = prediction
            .class_probabilities
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(class, _)| *class);
        assert_eq!(argmax, Some(prediction.predicted_class));
    }

    #[test]
    fn longer_output_is_taken_as_a_distribution() {
        let prediction = Prediction::from_scores(&[0.2, 0.1, 0.6, 0.1]).unwrap();
        assert_eq!(prediction.predicted_class, BoneClass::Osteoporosis);
        assert!((prediction.confidence - 60.0).abs() < 1e-4);
    }

    #[test]
    fn argmax_outside_the_label_set_is_an_error() {
        let result = Prediction::from_scores(&[0.1, 0.1, 0.1, 0.7]);
        assert!(matches!(result, Err(InferenceError::UnknownClass(3))));
    }

    #[test]
    fn short_output_is_an_error() {
        let result = Prediction::from_scores(&[0.9, 0.1]);
        assert!(matches!(result, Err(InferenceError::Output(_))));
    }

    #[test]
    fn empty_output_is_an_error() {
        assert!(matches!(
            Prediction::from_scores(&[]),
            Err(InferenceError::Output(_))
        ));
    }
}
