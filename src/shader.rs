//! Programmable part of the pipeline. For every face the rasterizer calls `vertex` three times, then
//! `fragment` for each covered pixel that passes the depth test. Varyings written by `vertex` live
//! in the shader and are only valid for the triangle being drawn.

use nalgebra::{Matrix2x3, Matrix3, Matrix4x3};

use crate::buffer::DepthBuffer;
use crate::framebuffer::Color;
use crate::geometry::{embed, invert, invert_transpose, proj, Matrix, Vec3f, Vec4f};
use crate::gl::{Transform, DEPTH};
use crate::model::Model;

/// Shadow factor of a fragment the light can't see.
pub const SHADOW_FLOOR: f32 = 0.3;
/// Weight of the specular term against the diffuse one.
pub const SPECULAR_WEIGHT: f32 = 0.6;
/// Steepest surface, as tan of the light's incidence angle, the shadow bias keeps up with.
const MAX_BIAS_SLOPE: f32 = 10.0;

pub trait Shader {
    /// Clip coordinates of corner `nthvert` of `face`, records varyings for that corner.
    fn vertex(&mut self, transform: &Transform, face: usize, nthvert: usize) -> Vec4f;
    /// Color of the fragment at perspective corrected barycentric coords `bar`, None discards it.
    fn fragment(&self, bar: Vec3f) -> Option<Color>;
}

/// First pass: renders the scene as seen from the light, colors encode depth.
pub struct DepthShader<'a, M: Model + ?Sized> {
    model: &'a M,
    varying_ndc: Matrix3<f32>, // Vertex positions after perspective divide, as columns.
}

impl<'a, M: Model + ?Sized> DepthShader<'a, M> {
    pub fn new(model: &'a M) -> Self {
        return Self {
            model,
            varying_ndc: Matrix3::zeros(),
        };
    }
}

impl<'a, M: Model + ?Sized> Shader for DepthShader<'a, M> {
    fn vertex(&mut self, transform: &Transform, face: usize, nthvert: usize) -> Vec4f {
        let clip = transform.clip(self.model.vertex(face, nthvert));
        self.varying_ndc.set_column(nthvert, &proj::<3, 4>(&clip));
        return clip;
    }

    fn fragment(&self, bar: Vec3f) -> Option<Color> {
        let ndc = self.varying_ndc * bar;
        return Some(Color::grey((ndc.z + 1.0) / 2.0));
    }
}

/// Shadow factor for a fragment at shadow buffer depth `depth`, given what the light saw there.
/// Anything the light saw nearer by more than `bias` casts a shadow.
pub fn shadow_factor(stored: Option<f32>, depth: f32, bias: f32) -> f32 {
    return match stored {
        Some(nearest) if nearest > depth + bias => SHADOW_FLOOR,
        _ => 1.0,
    };
}

/// Depth margin for a surface lit at incidence cosine `cos_theta`. On top of `base` it grows by the
/// depth a surface with that tilt spans across one shadow texel of `texel_depth`, which covers the
/// nearest texel lookup landing up to half a texel away.
pub fn slope_scaled_bias(base: f32, texel_depth: f32, cos_theta: f32) -> f32 {
    let cos = cos_theta.clamp(0.0, 1.0);
    let sin = (1.0 - cos * cos).sqrt();
    let slope = if sin < cos * MAX_BIAS_SLOPE { sin / cos } else { MAX_BIAS_SLOPE };
    return base + texel_depth * slope;
}

/// Second pass: textured Phong lighting with normal and specular maps, dimmed where the shadow
/// buffer says the light is blocked.
pub struct PhongShader<'a, M: Model + ?Sized> {
    model: &'a M,
    shadow_buffer: &'a DepthBuffer,
    shadow_bias: f32,
    texel_depth: f32,       // Depth change across one shadow texel for a 45 degree surface.
    uniform_mit: Matrix,    // Inverse transpose of model-view, for normals.
    uniform_shadow: Matrix, // Clip coordinates of this pass to shadow buffer coordinates.
    light: Vec3f,           // Direction to the light in view space.
    varying_uv: Matrix2x3<f32>,
    varying_normal: Matrix3<f32>,  // View space normals.
    varying_clip: Matrix4x3<f32>,
}

impl<'a, M: Model + ?Sized> PhongShader<'a, M> {
    /// `shadow_matrix` is the full transform (viewport included) of the pass that filled
    /// `shadow_buffer`, `light_direction` is in world space. `shadow_bias` is the base margin of the
    /// shadow test, the slope dependent part is added per fragment.
    pub fn new(
        model: &'a M,
        transform: &Transform,
        light_direction: Vec3f,
        shadow_matrix: Matrix,
        shadow_buffer: &'a DepthBuffer,
        shadow_bias: f32,
    ) -> Self {
        let texel_depth = DEPTH / shadow_buffer.width.min(shadow_buffer.height).max(1) as f32;
        let light = (transform.model_view * embed::<4, 3>(&light_direction, 0.0)).xyz().normalize();
        return Self {
            model,
            shadow_buffer,
            shadow_bias,
            texel_depth,
            uniform_mit: invert_transpose(&transform.model_view),
            uniform_shadow: shadow_matrix * invert(&(transform.projection * transform.model_view)),
            light,
            varying_uv: Matrix2x3::zeros(),
            varying_normal: Matrix3::zeros(),
            varying_clip: Matrix4x3::zeros(),
        };
    }

    fn to_view(&self, normal: Vec3f) -> Vec3f {
        return (self.uniform_mit * embed::<4, 3>(&normal, 0.0)).xyz();
    }

    /// `cos_theta` is the cosine between the surface normal and the light.
    fn shadow(&self, clip: Vec4f, cos_theta: f32) -> f32 {
        let p: Vec3f = proj::<3, 4>(&(self.uniform_shadow * clip));
        let stored = self.shadow_buffer.get(p.x.round() as i32, p.y.round() as i32);
        let bias = slope_scaled_bias(self.shadow_bias, self.texel_depth, cos_theta);
        return shadow_factor(stored, p.z, bias);
    }
}

impl<'a, M: Model + ?Sized> Shader for PhongShader<'a, M> {
    fn vertex(&mut self, transform: &Transform, face: usize, nthvert: usize) -> Vec4f {
        let clip = transform.clip(self.model.vertex(face, nthvert));
        self.varying_clip.set_column(nthvert, &clip);
        self.varying_uv.set_column(nthvert, &self.model.uv(face, nthvert));
        let normal = self.to_view(self.model.normal(face, nthvert));
        self.varying_normal.set_column(nthvert, &normal);
        return clip;
    }

    fn fragment(&self, bar: Vec3f) -> Option<Color> {
        let approx_normal = (self.varying_normal * bar).normalize();
        // Facing away from the camera.
        if approx_normal.z < 0.0 {
            return None;
        }

        let uv = self.varying_uv * bar;
        let n = match self.model.normal_map(uv) {
            Some(mapped) => self.to_view(mapped).normalize(),
            None => approx_normal,
        };
        let l = self.light;
        let diffuse = n.dot(&l).max(0.0);
        // View vector is +z in view space, so r.z is the cosine between reflection and view.
        let specular = match self.model.specular(uv) {
            Some(shininess) => {
                let r = (n * (2.0 * n.dot(&l)) - l).normalize();
                r.z.max(0.0).powf(shininess)
            }
            None => 0.0,
        };
        let shadow = self.shadow(self.varying_clip * bar, approx_normal.dot(&l));

        let intensity = shadow * (diffuse + SPECULAR_WEIGHT * specular);
        return Some(self.model.diffuse(uv).scaled(intensity));
    }
}
