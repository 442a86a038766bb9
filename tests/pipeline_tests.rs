use std::error::Error;

use ndarray::{array, Array2};
use ndarray_rand::RandomExt;
use rand::distributions::Uniform;
use rand::prelude::SeedableRng;
use rand_chacha::ChaCha8Rng;

use pca_reduce::{from_rows, Pca, PcaError};

#[test]
fn constant_feature_contributes_nothing() -> Result<(), Box<dyn Error>> {
    // The third column is constant, so all variance lives in the first
    // two (perfectly correlated) features and one or two components
    // suffice at the default threshold.
    let data = array![[1.0, 2.0, 3.0], [3.0, 4.0, 3.0], [5.0, 6.0, 3.0]];

    let pca = Pca::new();
    let reduced = pca.reduce_normalized(&data)?;

    let k = pca.principal_component_count();
    assert!((1..=2).contains(&k), "expected 1 or 2 components, got {k}");
    assert_eq!(reduced.nrows(), 3);
    assert_eq!(reduced.ncols(), k);
    Ok(())
}

#[test]
fn duplicate_rows_have_zero_total_variance() {
    // Centering a dataset of identical rows yields the zero matrix, and
    // the zero covariance must surface as an explicit error, not NaN.
    let data = array![[1.0, 2.0], [1.0, 2.0]];

    let result = Pca::new().reduce(&data);
    assert!(matches!(result, Err(PcaError::NumericError(_))));
}

fn reduce_random(size: usize, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let data = Array2::<f64>::random_using((size, size), Uniform::new(-1.0, 1.0), &mut rng);

    let pca = Pca::new();
    let reduced = pca.reduce(&data).unwrap();

    let k = pca.principal_component_count();
    assert!((1..=size).contains(&k));
    assert_eq!(reduced.dim(), (size, k));
    assert!(reduced.iter().all(|x| x.is_finite()));
}

#[test]
fn reduce_random_4() {
    reduce_random(4, 1337);
}

#[test]
fn reduce_random_16() {
    reduce_random(16, 1337);
}

#[test]
fn reduce_random_64() {
    reduce_random(64, 1337);
}

#[test]
fn normalized_pipeline_stays_finite() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let data = Array2::<f64>::random_using((25, 6), Uniform::new(0.0, 10.0), &mut rng);

    let pca = Pca::new();
    let reduced = pca.reduce_normalized(&data).unwrap();

    assert_eq!(reduced.nrows(), 25);
    assert_eq!(reduced.ncols(), pca.principal_component_count());
    assert!(reduced.iter().all(|x| x.is_finite()));
}

#[test]
fn threshold_of_one_keeps_every_component() {
    // 20 samples over 4 features: the covariance is full rank, so the
    // cumulative ratio never exceeds 1 and all components are selected.
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let data = Array2::<f64>::random_using((20, 4), Uniform::new(-1.0, 1.0), &mut rng);

    let pca = Pca::with_threshold(1.0);
    let reduced = pca.reduce(&data).unwrap();

    assert_eq!(pca.principal_component_count(), 4);
    assert_eq!(reduced.dim(), (20, 4));
}

#[test]
fn from_rows_feeds_the_pipeline() -> Result<(), Box<dyn Error>> {
    let data = from_rows(&[
        vec![2.5, 2.4],
        vec![0.5, 0.7],
        vec![2.2, 2.9],
        vec![1.9, 2.2],
        vec![3.1, 3.0],
        vec![2.3, 2.7],
        vec![2.0, 1.6],
        vec![1.0, 1.1],
        vec![1.5, 1.6],
        vec![1.1, 0.9],
    ])?;

    let pca = Pca::new();
    let reduced = pca.reduce(&data)?;

    // The two features are strongly correlated, so one component carries
    // almost all the variance; the greedy walk may still admit a second.
    let k = pca.principal_component_count();
    assert!((1..=2).contains(&k));
    assert_eq!(reduced.nrows(), 10);
    Ok(())
}
