//! Linear algebra on top of nalgebra: the vector/matrix aliases the pipeline works with, plus the
//! pieces nalgebra doesn't phrase the way we need them - homogeneous embed/proj, rotation about an
//! arbitrary axis and matrix inversion through cofactor expansion.

use nalgebra as na;
use na::{DMatrix, Matrix4, SMatrix, SVector, Vector2, Vector3, Vector4};

pub type Vec2f = Vector2<f32>;
pub type Vec3f = Vector3<f32>;
pub type Vec4f = Vector4<f32>;
/// Working transform type.
pub type Matrix = Matrix4<f32>;

/// Pads `v` with `fill` up to `N` components.
/// Use 1.0 as fill for points and 0.0 for directions.
pub fn embed<const N: usize, const M: usize>(v: &SVector<f32, M>, fill: f32) -> SVector<f32, N> {
    assert!(N >= M, "can't embed a {}-vector into {} dimensions", M, N);
    return SVector::<f32, N>::from_fn(|i, _| if i < M { v[i] } else { fill });
}

/// Keeps first `N` components of `v`, divided by its last component (perspective divide).
pub fn proj<const N: usize, const M: usize>(v: &SVector<f32, M>) -> SVector<f32, N> {
    assert!(N <= M, "can't project a {}-vector onto {} dimensions", M, N);
    let w = v[M - 1];
    return SVector::<f32, N>::from_fn(|i, _| v[i] / w);
}

/// Rotation of `v` around `axis` by `angle` radians via Rodrigues' formula.
/// Axis doesn't need to be normalized, but must be nonzero.
pub fn rotate(v: Vec3f, axis: Vec3f, angle: f32) -> Vec3f {
    let k = axis.normalize();
    let (sin, cos) = angle.sin_cos();
    return v * cos + k.cross(&v) * sin + k * (k.dot(&v) * (1.0 - cos));
}

/// Square matrix with `row` and `col` removed.
pub fn minor(m: &DMatrix<f32>, row: usize, col: usize) -> DMatrix<f32> {
    let n = m.nrows();
    return DMatrix::from_fn(n - 1, n - 1, |i, j| {
        m[(i + (i >= row) as usize, j + (j >= col) as usize)]
    });
}

/// Signed determinant of the minor.
pub fn cofactor(m: &DMatrix<f32>, row: usize, col: usize) -> f32 {
    let sign = if (row + col) % 2 == 0 { 1.0 } else { -1.0 };
    return sign * determinant(&minor(m, row, col));
}

/// Determinant by recursive expansion along the first row. O(N!), fine for 4x4 and below.
pub fn determinant(m: &DMatrix<f32>) -> f32 {
    assert!(m.is_square(), "determinant of a {}x{} matrix", m.nrows(), m.ncols());
    return match m.nrows() {
        0 => 1.0,
        1 => m[(0, 0)],
        n => (0..n).map(|j| m[(0, j)] * cofactor(m, 0, j)).sum(),
    };
}

/// Matrix of cofactors - the transposed adjugate.
pub fn cofactor_matrix<const N: usize>(m: &SMatrix<f32, N, N>) -> SMatrix<f32, N, N> {
    let dynamic = DMatrix::from_fn(N, N, |i, j| m[(i, j)]);
    return SMatrix::<f32, N, N>::from_fn(|i, j| cofactor(&dynamic, i, j));
}

/// (M^-1)^T, the matrix used to carry normals through M.
/// Singular matrices give infinities, it's up to the caller not to pass them.
pub fn invert_transpose<const N: usize>(m: &SMatrix<f32, N, N>) -> SMatrix<f32, N, N> {
    let cofactors = cofactor_matrix(m);
    // First row of cofactors against the first row of m is the expansion of det(m).
    let det: f32 = (0..N).map(|j| cofactors[(0, j)] * m[(0, j)]).sum();
    return cofactors / det;
}

pub fn invert<const N: usize>(m: &SMatrix<f32, N, N>) -> SMatrix<f32, N, N> {
    return invert_transpose(m).transpose();
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use na::{matrix, vector};

    #[test]
    fn embed_then_proj_is_identity() {
        let samples = [
            vector![0.0, 0.0, 0.0],
            vector![1.5, -2.0, 0.25],
            vector![-100.0, 3.0, 7.5],
        ];
        for v in samples {
            let back: Vec3f = proj::<3, 4>(&embed::<4, 3>(&v, 1.0));
            assert_eq!(back, v);
        }
    }

    #[test]
    fn embed_pads_with_fill() {
        let v: Vec4f = embed::<4, 2>(&vector![1.0, 2.0], 0.0);
        assert_eq!(v, vector![1.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn proj_divides_by_last_component() {
        let v: Vec2f = proj::<2, 3>(&vector![4.0, 6.0, 2.0]);
        assert_eq!(v, vector![2.0, 3.0]);
    }

    #[test]
    fn rotation_keeps_length() {
        let axes = [
            vector![0.0, 1.0, 0.0],
            vector![1.0, 1.0, 0.0],
            vector![-0.3, 0.2, 5.0],
        ];
        let v = vector![0.6, 0.0, 0.8];
        for axis in axes {
            for step in 0..12 {
                let angle = step as f32 * 0.5;
                assert_relative_eq!(rotate(v, axis, angle).norm(), v.norm(), epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn quarter_turn_around_y() {
        let r = rotate(vector![1.0, 0.0, 0.0], vector![0.0, 1.0, 0.0], std::f32::consts::FRAC_PI_2);
        assert_relative_eq!(r, vector![0.0, 0.0, -1.0], epsilon = 1e-6);
    }

    #[test]
    fn determinant_small_sizes() {
        assert_eq!(determinant(&DMatrix::from_row_slice(1, 1, &[3.0])), 3.0);
        assert_eq!(determinant(&DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0])), -2.0);
        let m = DMatrix::from_row_slice(3, 3, &[2.0, 0.0, 1.0, 1.0, 3.0, 2.0, 1.0, 1.0, 2.0]);
        assert_relative_eq!(determinant(&m), 6.0, epsilon = 1e-6);
    }

    #[test]
    fn invert_matches_nalgebra() {
        let m: Matrix = matrix![2.0, 0.0, 1.0, 3.0;
                                1.0, 3.0, 2.0, 0.0;
                                1.0, 1.0, 1.0, 2.0;
                                0.0, 4.0, 0.0, 1.0];
        let expected = m.try_inverse().expect("test matrix is invertible");
        assert_relative_eq!(invert(&m), expected, epsilon = 1e-4);
        assert_relative_eq!(m * invert(&m), Matrix::identity(), epsilon = 1e-4);
        assert_relative_eq!(invert_transpose(&m), expected.transpose(), epsilon = 1e-4);
    }

    #[test]
    fn invert_2x2_and_3x3() {
        let m2 = matrix![4.0, 7.0; 2.0, 6.0];
        assert_relative_eq!(m2 * invert(&m2), SMatrix::<f32, 2, 2>::identity(), epsilon = 1e-5);
        let m3 = matrix![2.0, 0.0, 1.0; 1.0, 3.0, 2.0; 1.0, 1.0, 2.0];
        assert_relative_eq!(invert(&m3) * m3, SMatrix::<f32, 3, 3>::identity(), epsilon = 1e-5);
    }
}
