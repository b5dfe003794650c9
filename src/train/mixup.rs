//! Mixup augmentation
//!
//! Convex combination of each sample with a rolled partner, applied to
//! inputs and targets alike (<https://arxiv.org/pdf/1710.09412.pdf>).

use ndarray::Array2;
use rand::Rng;
use rand_distr::{Beta, Distribution};

/// Mix a batch with a rolled copy of itself.
///
/// The coefficient is drawn from `Beta(beta_a, beta_a)` and the
/// partner index is a cyclic roll by a random nonzero offset, so every
/// sample is paired with a different one. Batches with fewer than two
/// samples pass through unchanged.
pub fn mixup<R: Rng>(
    inputs: &Array2<f32>,
    targets: &Array2<f32>,
    beta_a: f32,
    rng: &mut R,
) -> (Array2<f32>, Array2<f32>) {
    let n = inputs.nrows();
    if n < 2 {
        return (inputs.clone(), targets.clone());
    }

    let beta = Beta::new(beta_a, beta_a).expect("beta_a validated positive at config load");
    let coeff: f32 = beta.sample(rng);
    let shift = rng.gen_range(1..n);

    let mix = |a: &Array2<f32>| {
        let mut out = a * coeff;
        for s in 0..n {
            let partner = (s + shift) % n;
            for c in 0..a.ncols() {
                out[[s, c]] += a[[partner, c]] * (1.0 - coeff);
            }
        }
        out
    };

    (mix(inputs), mix(targets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_mixup_preserves_shape() {
        let inputs = arr2(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        let targets = arr2(&[[1.0], [0.0], [1.0]]);
        let mut rng = StdRng::seed_from_u64(1);

        let (x, y) = mixup(&inputs, &targets, 0.2, &mut rng);
        assert_eq!(x.dim(), inputs.dim());
        assert_eq!(y.dim(), targets.dim());
    }

    #[test]
    fn test_mixup_is_convex_combination() {
        let inputs = arr2(&[[0.0, 0.0], [1.0, 1.0]]);
        let targets = arr2(&[[0.0], [1.0]]);
        let mut rng = StdRng::seed_from_u64(2);

        let (x, y) = mixup(&inputs, &targets, 0.2, &mut rng);
        for v in x.iter().chain(y.iter()) {
            assert!((0.0..=1.0).contains(v), "value {v} outside hull");
        }
        // Row sums of a two-sample mix always add to the originals' sum
        assert_abs_diff_eq!(x.sum(), inputs.sum(), epsilon = 1e-5);
    }

    #[test]
    fn test_mixup_applies_same_pairing_to_targets() {
        let inputs = arr2(&[[0.0], [1.0], [2.0]]);
        let targets = inputs.clone();
        let mut rng = StdRng::seed_from_u64(3);

        let (x, y) = mixup(&inputs, &targets, 0.2, &mut rng);
        for (a, b) in x.iter().zip(y.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_mixup_tiny_batch_passthrough() {
        let inputs = arr2(&[[1.0, 2.0]]);
        let targets = arr2(&[[1.0]]);
        let mut rng = StdRng::seed_from_u64(4);

        let (x, y) = mixup(&inputs, &targets, 0.2, &mut rng);
        assert_eq!(x, inputs);
        assert_eq!(y, targets);
    }

    #[test]
    fn test_mixup_seeded_reproducibility() {
        let inputs = arr2(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0], [7.0, 8.0]]);
        let targets = arr2(&[[1.0], [0.0], [1.0], [0.0]]);

        let run = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            mixup(&inputs, &targets, 0.4, &mut rng)
        };

        let (x1, _) = run(9);
        let (x2, _) = run(9);
        assert_eq!(x1, x2);
    }
}
