// ============================================================
// Layer 4 — Train/Test Splitter
// ============================================================
// Shuffles samples and holds out a fraction for evaluation.
//
// The shuffle is seeded, so the same dataset and seed always give
// the same split. Models compared within one experiment are then
// scored on exactly the same held-out rows.
//
// The held-out size is ceil(total * test_fraction), clamped to
// the number of samples.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, test).
///
/// # Example
/// ```ignore
/// let (train, test) = split_train_test(rows, 0.2, 42);
/// // test holds 20% of rows, rounded up
/// ```
pub fn split_train_test<T>(mut samples: Vec<T>, test_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let fraction = test_fraction.clamp(0.0, 1.0);
    let n_test   = ((total as f64) * fraction).ceil() as usize;
    let n_test   = n_test.min(total);

    // split_off(n) keeps [0..n) and returns [n..total)
    let test = samples.split_off(total - n_test);

    tracing::debug!(
        "Dataset split: {} training, {} test (seed {})",
        samples.len(),
        test.len(),
        seed,
    );

    (samples, test)
}
