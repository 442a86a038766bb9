// Threshold-driven PCA pipeline: centering, covariance, eigendecomposition,
// variance-ordered component selection, projection.

use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, warn};
use ndarray::{Array2, Axis};
use ndarray_linalg::{Eigh, UPLO};
use once_cell::sync::OnceCell;

use crate::error::PcaError;

/// Default cumulative variance ratio used by [`Pca::new`].
pub const DEFAULT_THRESHOLD: f64 = 0.95;

/// Eigendecomposition of a covariance matrix: a diagonal eigenvalue matrix
/// and an eigenvector matrix whose columns align with the diagonal. The
/// solver guarantees no particular ordering; selection re-sorts explicitly.
#[derive(Debug, Clone)]
struct Eigen {
    values: Array2<f64>,
    vectors: Array2<f64>,
}

/// Principal component reduction with a cumulative-variance threshold.
///
/// The pipeline centers each feature, estimates the unbiased sample
/// covariance, eigendecomposes it, selects a descending-eigenvalue prefix
/// of components covering the configured fraction of total variance, and
/// projects the original data onto that basis.
///
/// An instance memoizes the eigendecomposition of the first covariance
/// matrix it sees. Reusing one instance across different input matrices
/// returns the stale first decomposition; construct one instance per
/// input matrix.
///
/// # Examples
///
/// ```
/// use ndarray::array;
/// use pca_reduce::Pca;
///
/// let data = array![[1.0, 2.0], [3.0, 4.0], [5.0, 7.0]];
/// let reduced = Pca::new().reduce(&data).unwrap();
/// assert_eq!(reduced.nrows(), 3);
/// ```
#[derive(Debug)]
pub struct Pca {
    threshold: f64,
    eigen: OnceCell<Eigen>,
    component_count: AtomicUsize,
}

impl Default for Pca {
    fn default() -> Self {
        Self::new()
    }
}

impl Pca {
    /// Creates a pipeline with the default threshold of 0.95.
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_THRESHOLD)
    }

    /// Creates a pipeline with a custom cumulative variance threshold.
    ///
    /// The threshold is expected in `(0, 1]`. Values at or below zero are
    /// accepted but degenerate: no component passes the selection test.
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            eigen: OnceCell::new(),
            component_count: AtomicUsize::new(0),
        }
    }

    /// Number of principal components selected by the most recent
    /// reduction (or selection) on this instance.
    pub fn principal_component_count(&self) -> usize {
        self.component_count.load(Ordering::Relaxed)
    }

    /// Runs the full pipeline without eigen matrix normalization.
    pub fn reduce(&self, data: &Array2<f64>) -> Result<Array2<f64>, PcaError> {
        self.run(data, false)
    }

    /// Runs the full pipeline with the eigenvalue and eigenvector matrices
    /// min-max normalized before component selection.
    pub fn reduce_normalized(&self, data: &Array2<f64>) -> Result<Array2<f64>, PcaError> {
        self.run(data, true)
    }

    fn run(&self, data: &Array2<f64>, normalize: bool) -> Result<Array2<f64>, PcaError> {
        let centered = zero_centered(data)?;
        let cov = covariance(&centered)?;
        let eigen = self.eigen(&cov)?;

        let basis = if normalize {
            let values = normalized(&eigen.values)?;
            let vectors = normalized(&eigen.vectors)?;
            self.principal_components(&values, &vectors)?
        } else {
            self.principal_components(&eigen.values, &eigen.vectors)?
        };

        project(data, &basis)
    }

    /// Diagonal eigenvalue matrix of the memoized decomposition of
    /// `covariance`. Only the first matrix passed to this instance is ever
    /// decomposed (see the type-level note on staleness).
    pub fn eigenvalue_matrix(&self, covariance: &Array2<f64>) -> Result<Array2<f64>, PcaError> {
        Ok(self.eigen(covariance)?.values.clone())
    }

    /// Eigenvector matrix (columns aligned with [`Pca::eigenvalue_matrix`]'s
    /// diagonal) of the memoized decomposition of `covariance`.
    pub fn eigenvector_matrix(&self, covariance: &Array2<f64>) -> Result<Array2<f64>, PcaError> {
        Ok(self.eigen(covariance)?.vectors.clone())
    }

    // At-most-once per instance: the first caller decomposes, everyone
    // else (including concurrent callers) sees that result.
    fn eigen(&self, covariance: &Array2<f64>) -> Result<&Eigen, PcaError> {
        self.eigen.get_or_try_init(|| {
            let (values, vectors) = covariance
                .eigh(UPLO::Upper)
                .map_err(|e| PcaError::NumericError(format!("eigendecomposition failed: {e}")))?;
            Ok(Eigen {
                values: Array2::from_diag(&values),
                vectors,
            })
        })
    }

    /// Selects the principal components from an eigenvalue matrix (only the
    /// diagonal is read) and an eigenvector matrix (columns are
    /// eigenvectors aligned with the diagonal).
    ///
    /// Eigenpairs are stably sorted by eigenvalue descending, ties keeping
    /// the solver's original order, and walked in that order: the cumulative
    /// variance ratio is tested against the threshold *before* the current
    /// eigenvalue is added, so the component crossing the threshold is
    /// itself still selected and the dominant component is always kept.
    ///
    /// Returns the basis as a `k x m` matrix with one eigenvector per row,
    /// and records `k` for [`Pca::principal_component_count`].
    pub fn principal_components(
        &self,
        values: &Array2<f64>,
        vectors: &Array2<f64>,
    ) -> Result<Array2<f64>, PcaError> {
        let diag_len = values.nrows().min(values.ncols());
        let eigenvalues: Vec<f64> = (0..diag_len).map(|i| values[[i, i]]).collect();

        // Eigenvectors become rows, paired positionally with the diagonal.
        let transposed = vectors.t();
        let paired = diag_len.min(transposed.nrows());
        let mut pairs: Vec<_> = (0..paired)
            .map(|i| (eigenvalues[i], transposed.row(i)))
            .collect();
        pairs.sort_by(|(a, _), (b, _)| b.total_cmp(a));

        // Signed sum: negative near-zero eigenvalues from numerical noise
        // shrink the denominator rather than being folded in as magnitude.
        let total: f64 = eigenvalues.iter().sum();
        if total.abs() < f64::EPSILON {
            return Err(PcaError::NumericError(
                "total variance is zero; the input has no spread".to_string(),
            ));
        }

        let mut cumulative = 0.0;
        let mut selected = Vec::new();
        for (value, vector) in &pairs {
            if cumulative / total <= self.threshold {
                cumulative += value;
                selected.push(vector);
            }
        }

        let k = selected.len();
        self.component_count.store(k, Ordering::Relaxed);
        debug!(
            "selected {k} of {paired} principal components at threshold {}",
            self.threshold
        );
        if k == 0 {
            warn!(
                "threshold {} selected no components; the projection will be empty",
                self.threshold
            );
        }

        let mut basis = Array2::<f64>::zeros((k, transposed.ncols()));
        for (row, vector) in selected.into_iter().enumerate() {
            basis.row_mut(row).assign(vector);
        }
        Ok(basis)
    }
}

/// Subtracts each feature's mean from every sample, so every column of the
/// result has mean zero.
pub fn zero_centered(data: &Array2<f64>) -> Result<Array2<f64>, PcaError> {
    if data.nrows() == 0 || data.ncols() == 0 {
        return Err(PcaError::InvalidInput(format!(
            "cannot center a {}x{} matrix",
            data.nrows(),
            data.ncols()
        )));
    }
    let mean = data.mean_axis(Axis(0)).ok_or_else(|| {
        PcaError::NumericError("failed to compute per-feature means".to_string())
    })?;
    let mut centered = data.to_owned();
    centered -= &mean;
    Ok(centered)
}

/// Unbiased sample covariance matrix (`(n - 1)` divisor) of a centered
/// `n x m` matrix; the result is `m x m` and symmetric.
pub fn covariance(centered: &Array2<f64>) -> Result<Array2<f64>, PcaError> {
    let n = centered.nrows();
    if n < 2 {
        return Err(PcaError::NumericError(format!(
            "covariance requires at least 2 samples, got {n}"
        )));
    }
    let mut cov = centered.t().dot(centered);
    cov /= n as f64 - 1.0;
    Ok(cov)
}

/// Element-wise min-max normalization using the global minimum and maximum
/// across all elements, mapping the matrix into `[0, 1]`.
///
/// Applying it twice is a no-op: after the first pass the global range is
/// already `[0, 1]`.
pub fn normalized(matrix: &Array2<f64>) -> Result<Array2<f64>, PcaError> {
    if matrix.is_empty() {
        return Err(PcaError::InvalidInput(
            "cannot normalize an empty matrix".to_string(),
        ));
    }

    let mut min = matrix[[0, 0]];
    let mut max = matrix[[0, 0]];
    for &value in matrix.iter() {
        if value > max {
            max = value;
        } else if value < min {
            min = value;
        }
    }

    let range = max - min;
    if range.abs() < f64::EPSILON {
        return Err(PcaError::NumericError(format!(
            "constant matrix (every element is {max}); min-max range is zero"
        )));
    }

    Ok(matrix.mapv(|value| (value - min) / range))
}

/// Projects `data` (`n x m`) onto a basis of `k` row eigenvectors
/// (`k x m`), producing the `n x k` reduced dataset.
pub fn project(data: &Array2<f64>, basis: &Array2<f64>) -> Result<Array2<f64>, PcaError> {
    if data.ncols() != basis.ncols() {
        return Err(PcaError::DimensionMismatch(format!(
            "cannot project {} feature columns onto basis vectors of length {}",
            data.ncols(),
            basis.ncols()
        )));
    }
    Ok(data.dot(&basis.t()))
}

/// Builds a dense matrix from row slices, rejecting empty input and ragged
/// rows.
///
/// # Examples
///
/// ```
/// let data = pca_reduce::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
/// assert_eq!(data.dim(), (2, 2));
/// ```
pub fn from_rows(rows: &[Vec<f64>]) -> Result<Array2<f64>, PcaError> {
    let first = rows.first().ok_or_else(|| {
        PcaError::InvalidInput("matrix must have at least one row".to_string())
    })?;
    let width = first.len();
    if width == 0 {
        return Err(PcaError::InvalidInput(
            "rows must have at least one column".to_string(),
        ));
    }

    let mut flat = Vec::with_capacity(rows.len() * width);
    for (index, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(PcaError::InvalidInput(format!(
                "row {index} has {} columns, expected {width}",
                row.len()
            )));
        }
        flat.extend_from_slice(row);
    }

    Array2::from_shape_vec((rows.len(), width), flat)
        .map_err(|e| PcaError::InvalidInput(e.to_string()))
}
