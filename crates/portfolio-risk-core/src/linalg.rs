//! Dense matrix helpers over row-major `Vec<Vec<f64>>`.

/// Dot product.
pub(crate) fn vec_dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Matrix-vector multiplication.
pub(crate) fn mat_vec_multiply(mat: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    mat.iter().map(|row| vec_dot(row, v)).collect()
}

/// Quadratic form w' * M * w.
pub(crate) fn quadratic_form(mat: &[Vec<f64>], w: &[f64]) -> f64 {
    vec_dot(w, &mat_vec_multiply(mat, w))
}

/// L' * v for lower-triangular L.
pub(crate) fn lower_transpose_vec(l: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    let n = l.len();
    (0..n)
        .map(|j| (j..n).map(|i| l[i][j] * v[i]).sum())
        .collect()
}

/// Largest absolute row sum; bounds the spectral radius of a symmetric matrix.
pub(crate) fn max_abs_row_sum(mat: &[Vec<f64>]) -> f64 {
    mat.iter()
        .map(|row| row.iter().map(|x| x.abs()).sum::<f64>())
        .fold(0.0, f64::max)
}

/// Outcome of attempting `A = L * L'`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Cholesky {
    Factor(Vec<Vec<f64>>),
    /// Pivot at `index` was not positive.
    NotPositiveDefinite { index: usize, pivot: f64 },
}

/// Cholesky-Banachiewicz factorization. Pivots at or below `eps * max(diag)`
/// count as not positive-definite.
#[allow(clippy::needless_range_loop)]
pub(crate) fn cholesky(a: &[Vec<f64>], eps: f64) -> Cholesky {
    let n = a.len();
    let scale = (0..n).map(|i| a[i][i].abs()).fold(0.0, f64::max);
    let threshold = eps * scale.max(f64::MIN_POSITIVE);
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[i][k] * l[j][k]).sum();
            if i == j {
                let pivot = a[i][i] - sum;
                if !pivot.is_finite() || pivot <= threshold {
                    return Cholesky::NotPositiveDefinite { index: i, pivot };
                }
                l[i][j] = pivot.sqrt();
            } else {
                l[i][j] = (a[i][j] - sum) / l[j][j];
            }
        }
    }

    Cholesky::Factor(l)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cholesky_reconstructs() {
        let a = vec![
            vec![4.0, 2.0, 0.4],
            vec![2.0, 2.0, 0.5],
            vec![0.4, 0.5, 3.0],
        ];
        let l = match cholesky(&a, 1e-12) {
            Cholesky::Factor(l) => l,
            other => panic!("expected factor, got {other:?}"),
        };
        for i in 0..3 {
            for j in 0..3 {
                let v: f64 = (0..3).map(|k| l[i][k] * l[j][k]).sum();
                assert!((v - a[i][j]).abs() < 1e-12, "({i},{j}) {v} vs {}", a[i][j]);
            }
            for j in (i + 1)..3 {
                assert_eq!(l[i][j], 0.0);
            }
        }
    }

    #[test]
    fn test_cholesky_rejects_singular() {
        // Perfectly collinear assets
        let a = vec![vec![1.0, 1.0], vec![1.0, 1.0]];
        assert!(matches!(
            cholesky(&a, 1e-12),
            Cholesky::NotPositiveDefinite { index: 1, .. }
        ));
    }

    #[test]
    fn test_lower_transpose_vec() {
        let l = vec![vec![2.0, 0.0], vec![1.0, 3.0]];
        // L' = [[2,1],[0,3]]; L' * [1,1] = [3,3]
        assert_eq!(lower_transpose_vec(&l, &[1.0, 1.0]), vec![3.0, 3.0]);
    }

    #[test]
    fn test_quadratic_form() {
        let m = vec![vec![0.04, -0.04], vec![-0.04, 0.04]];
        assert!(quadratic_form(&m, &[0.5, 0.5]).abs() < 1e-18);
        assert!((quadratic_form(&m, &[1.0, 0.0]) - 0.04).abs() < 1e-18);
    }
}
