//! Transform chain of the pipeline: camera (model-view), projection and viewport matrices, bundled
//! into a `Transform` that is built once per render pass and handed to every shader invocation.

use nalgebra::{matrix, vector};

use crate::geometry::{embed, Matrix, Vec2f, Vec3f, Vec4f};

/// Depth range the viewport maps NDC z onto.
pub const DEPTH: f32 = 255.0;

/// Below this |cross.z| a triangle is treated as degenerate.
const DEGENERATE_EPSILON: f32 = 1e-2;

/// Immutable per-pass transform state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub model_view: Matrix,
    pub projection: Matrix,
    pub viewport: Matrix,
}

impl Transform {
    pub fn new(model_view: Matrix, projection: Matrix, viewport: Matrix) -> Self {
        return Self { model_view, projection, viewport };
    }

    /// Camera at `eye` looking at `center`, perspective set up from their distance.
    pub fn perspective(eye: Vec3f, center: Vec3f, up: Vec3f, viewport: Matrix) -> Self {
        return Self::new(
            look_at(eye, center, up),
            projection(-1.0 / (eye - center).norm()),
            viewport,
        );
    }

    /// Camera looking from `eye` at `center` without perspective divide.
    pub fn orthographic(eye: Vec3f, center: Vec3f, up: Vec3f, viewport: Matrix) -> Self {
        return Self::new(look_at(eye, center, up), projection(0.0), viewport);
    }

    /// Object space point to clip space.
    pub fn clip(&self, v: Vec3f) -> Vec4f {
        return self.projection * self.model_view * embed::<4, 3>(&v, 1.0);
    }

    /// Everything up to, and including, the viewport.
    pub fn composed(&self) -> Matrix {
        return self.viewport * self.projection * self.model_view;
    }
}

/// Orthonormal camera frame: (right, up, backward). Backward points from `center` to `eye`.
/// When `up` is parallel to the view direction another axis is used to build the frame.
pub fn camera_basis(eye: Vec3f, center: Vec3f, up: Vec3f) -> (Vec3f, Vec3f, Vec3f) {
    let z = (eye - center).normalize();
    let x = match up.cross(&z).try_normalize(1e-6) {
        Some(x) => x,
        None => {
            log::debug!("Up vector is parallel to the view direction, picking another one");
            let fallback = if z.x.abs() < 0.9 { Vec3f::x() } else { Vec3f::y() };
            fallback.cross(&z).normalize()
        }
    };
    let y = z.cross(&x);
    return (x, y, z);
}

/// Model-view matrix: rotation into the camera frame after moving `center` to the origin.
pub fn look_at(eye: Vec3f, center: Vec3f, up: Vec3f) -> Matrix {
    let (x, y, z) = camera_basis(eye, center, up);
    let rotation = matrix![x.x, x.y, x.z, 0.0;
                           y.x, y.y, y.z, 0.0;
                           z.x, z.y, z.z, 0.0;
                           0.0, 0.0, 0.0, 1.0];
    let translation = matrix![1.0, 0.0, 0.0, -center.x;
                              0.0, 1.0, 0.0, -center.y;
                              0.0, 0.0, 1.0, -center.z;
                              0.0, 0.0, 0.0, 1.0];
    return rotation * translation;
}

/// Identity with `coeff` at row 3, column 2: w becomes 1 + coeff * z. For a camera at distance d
/// from the origin coeff is -1/d, 0 means no perspective.
pub fn projection(coeff: f32) -> Matrix {
    let mut m = Matrix::identity();
    m[(3, 2)] = coeff;
    return m;
}

/// Maps the [-1, 1] cube onto [x, x + w] * [y, y + h] * [0, DEPTH].
pub fn viewport(x: i32, y: i32, w: i32, h: i32) -> Matrix {
    let (x, y, w, h) = (x as f32, y as f32, w as f32, h as f32);
    return matrix![w / 2.0, 0.0,     0.0,           x + w / 2.0;
                   0.0,     h / 2.0, 0.0,           y + h / 2.0;
                   0.0,     0.0,     DEPTH / 2.0,   DEPTH / 2.0;
                   0.0,     0.0,     0.0,           1.0];
}

/// Barycentric coordinates of `p` relative to triangle `abc`.
/// Returns (-1, -1, -1) for degenerate triangles, so callers reject the point like any outside one.
pub fn barycentric(a: Vec2f, b: Vec2f, c: Vec2f, p: Vec2f) -> Vec3f {
    let u = vector![b.x - a.x, c.x - a.x, a.x - p.x].cross(&vector![b.y - a.y, c.y - a.y, a.y - p.y]);
    if u.z.abs() < DEGENERATE_EPSILON {
        return vector![-1.0, -1.0, -1.0];
    }
    return vector![1.0 - (u.x + u.y) / u.z, u.x / u.z, u.y / u.z];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{invert, proj};
    use approx::assert_relative_eq;

    #[test]
    fn barycentric_weights_sum_to_one() {
        let triangles = [
            (vector![0.0, 0.0], vector![10.0, 0.0], vector![0.0, 10.0]),
            (vector![3.5, 7.0], vector![-20.0, 1.0], vector![15.0, -4.0]),
            (vector![100.0, 100.0], vector![101.0, 300.0], vector![-50.0, 120.0]),
        ];
        for (a, b, c) in triangles {
            let centroid: Vec2f = (a + b + c) / 3.0;
            for p in [a, b, c, centroid, (a + b) / 2.0, (a * 0.7 + c * 0.3)] {
                let bar = barycentric(a, b, c, p);
                assert!(bar.iter().all(|&w| w >= -1e-5), "{:?} not covered", p);
                assert_relative_eq!(bar.sum(), 1.0, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn barycentric_reconstructs_point() {
        let (a, b, c) = (vector![1.0, 1.0], vector![9.0, 2.0], vector![4.0, 8.0]);
        let p = vector![4.0, 3.0];
        let bar = barycentric(a, b, c, p);
        assert_relative_eq!(a * bar.x + b * bar.y + c * bar.z, p, epsilon = 1e-5);
    }

    #[test]
    fn outside_point_has_negative_weight() {
        let bar = barycentric(vector![0.0, 0.0], vector![10.0, 0.0], vector![0.0, 10.0], vector![8.0, 8.0]);
        assert!(bar.min() < 0.0);
    }

    #[test]
    fn degenerate_triangle_gives_sentinel() {
        let bar = barycentric(vector![0.0, 0.0], vector![5.0, 5.0], vector![10.0, 10.0], vector![5.0, 5.0]);
        assert_eq!(bar, vector![-1.0, -1.0, -1.0]);
    }

    #[test]
    fn look_at_moves_eye_onto_positive_z() {
        let eye = vector![1.0, 2.0, 5.0];
        let center = vector![0.5, -1.0, 0.0];
        let m = look_at(eye, center, Vec3f::y());
        let eye_view: Vec3f = proj::<3, 4>(&(m * embed::<4, 3>(&eye, 1.0)));
        let center_view: Vec3f = proj::<3, 4>(&(m * embed::<4, 3>(&center, 1.0)));
        assert_relative_eq!(center_view, Vec3f::zeros(), epsilon = 1e-5);
        assert_relative_eq!(eye_view, vector![0.0, 0.0, (eye - center).norm()], epsilon = 1e-4);
    }

    #[test]
    fn look_at_along_up_still_builds_a_frame() {
        let (x, y, z) = camera_basis(vector![0.0, 3.0, 0.0], Vec3f::zeros(), Vec3f::y());
        assert_relative_eq!(x.norm(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(y.norm(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(z, Vec3f::y(), epsilon = 1e-6);
        assert_relative_eq!(x.dot(&z), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn composed_transforms_are_invertible() {
        let transforms = [
            Transform::perspective(vector![0.0, 0.0, 3.0], Vec3f::zeros(), Vec3f::y(), viewport(100, 100, 600, 600)),
            Transform::perspective(vector![1.0, 1.0, 5.0], vector![0.2, 0.0, -0.3], Vec3f::y(), viewport(0, 0, 800, 800)),
            Transform::orthographic(vector![1.0, 1.0, 1.0], Vec3f::zeros(), Vec3f::y(), viewport(0, 0, 64, 32)),
        ];
        for transform in transforms {
            for m in [transform.composed(), transform.projection * transform.model_view, transform.model_view] {
                assert_relative_eq!(invert(&m) * m, Matrix::identity(), epsilon = 1e-3);
                assert_relative_eq!(m * invert(&m), Matrix::identity(), epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn viewport_maps_ndc_cube() {
        let m = viewport(10, 20, 100, 50);
        let low: Vec3f = proj::<3, 4>(&(m * vector![-1.0, -1.0, -1.0, 1.0]));
        let high: Vec3f = proj::<3, 4>(&(m * vector![1.0, 1.0, 1.0, 1.0]));
        assert_relative_eq!(low, vector![10.0, 20.0, 0.0]);
        assert_relative_eq!(high, vector![110.0, 70.0, DEPTH]);
    }

    #[test]
    fn projection_sets_w_from_z() {
        let clip = projection(-0.25) * vector![1.0, 2.0, 2.0, 1.0];
        assert_relative_eq!(clip, vector![1.0, 2.0, 2.0, 0.5]);
    }
}
