use nalgebra::vector;

use crate::geometry::{rotate, Vec3f};
use crate::gl::camera_basis;

/// Angle the light turns by per unit of input.
pub const LIGHT_STEP: f32 = std::f32::consts::PI / 18.0; // 10 degrees
/// Angle the eye orbits by per unit of input.
pub const ORBIT_STEP: f32 = std::f32::consts::PI / 36.0; // 5 degrees
/// Distance the camera pans by per unit of input.
pub const PAN_STEP: f32 = 0.1;

/// Closest the view direction may get to `up` when orbiting, as a cosine.
const MAX_ELEVATION_COS: f32 = 0.99;

/// Viewer and light placement. All operations keep `light_direction` unit length and `eye`
/// distinct from `center`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Vec3f,
    pub center: Vec3f,
    pub up: Vec3f,
    pub light_direction: Vec3f, // Direction towards the light.
}

impl Default for Camera {
    fn default() -> Self {
        return Self {
            eye: vector![1.0, 1.0, 3.0],
            center: Vec3f::zeros(),
            up: Vec3f::y(),
            light_direction: vector![1.0, 1.0, 1.0].normalize(),
        };
    }
}

impl Camera {
    /// Rotates the light around camera's up axis by `dx` steps and around its right axis by `dy`.
    pub fn move_light(&mut self, dx: f32, dy: f32) {
        let (right, true_up, _) = camera_basis(self.eye, self.center, self.up);
        let mut light = self.light_direction;
        if dx != 0.0 {
            light = rotate(light, true_up, dx * LIGHT_STEP);
        }
        if dy != 0.0 {
            light = rotate(light, right, dy * LIGHT_STEP);
        }
        self.light_direction = light.normalize();
    }

    /// Orbits the eye around the center: `dx` steps around `up`, `dy` steps up or down.
    /// Vertical steps that would put the eye on the `up` axis are ignored.
    pub fn move_eye(&mut self, dx: f32, dy: f32) {
        let mut offset = self.eye - self.center;
        if dx != 0.0 {
            offset = rotate(offset, self.up, dx * ORBIT_STEP);
        }
        if dy != 0.0 {
            let axis = offset.cross(&self.up);
            if axis.norm() > f32::EPSILON {
                let candidate = rotate(offset, axis, dy * ORBIT_STEP);
                if candidate.normalize().dot(&self.up.normalize()).abs() < MAX_ELEVATION_COS {
                    offset = candidate;
                } else {
                    log::debug!("Refusing to orbit the eye onto the up axis");
                }
            }
        }
        self.eye = self.center + offset;
    }

    /// Pans eye and center together: `dx` steps to the right, `dy` steps forward.
    pub fn move_center(&mut self, dx: f32, dy: f32) {
        let (right, _, backward) = camera_basis(self.eye, self.center, self.up);
        let shift = right * (dx * PAN_STEP) - backward * (dy * PAN_STEP);
        self.eye += shift;
        self.center += shift;
    }
}
