//! F-beta scoring and threshold calibration

use ndarray::Array2;

const STABILIZER: f32 = 1e-12;

/// Per-sample F-beta score averaged over the batch.
///
/// Both predictions and labels are binarized at `threshold`; precision
/// and recall are computed per sample across classes and combined as
/// `(1 + β²) * P * R / (β² * P + R)`.
pub fn f_score(predict: &Array2<f32>, label: &Array2<f32>, threshold: f32, beta: f32) -> f32 {
    assert_eq!(
        predict.dim(),
        label.dim(),
        "predictions and labels must have same shape"
    );

    let beta2 = beta * beta;
    let mut total = 0.0;

    for (pred_row, label_row) in predict.rows().into_iter().zip(label.rows()) {
        let mut tp = 0.0f32;
        let mut fp = 0.0f32;
        let mut fn_ = 0.0f32;

        for (&p, &l) in pred_row.iter().zip(label_row.iter()) {
            let p = p > threshold;
            let l = l > threshold;
            match (p, l) {
                (true, true) => tp += 1.0,
                (true, false) => fp += 1.0,
                (false, true) => fn_ += 1.0,
                (false, false) => {}
            }
        }

        let precision = tp / (tp + fp + STABILIZER);
        let recall = tp / (tp + fn_ + STABILIZER);
        total += (1.0 + beta2) * precision * recall / (beta2 * precision + recall + STABILIZER);
    }

    total / predict.nrows() as f32
}

/// Search the threshold maximizing the F-beta score over 100 evenly
/// spaced candidates in `[0.05, 0.25]`. Returns `(best_score,
/// best_threshold)`.
pub fn search_threshold(predicts: &Array2<f32>, targets: &Array2<f32>, beta: f32) -> (f32, f32) {
    let mut best_score = 0.0;
    let mut best_thresh = 0.0;

    for i in 0..100 {
        let threshold = 0.05 + 0.20 * i as f32 / 99.0;
        let score = f_score(predicts, targets, threshold, beta);
        if score > best_score {
            best_score = score;
            best_thresh = threshold;
        }
    }

    (best_score, best_thresh)
}
