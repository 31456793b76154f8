use nalgebra::{Matrix4x3, Vector3};

use crate::buffer::DepthBuffer;
use crate::framebuffer::Image;
use crate::geometry::{proj, Vec2f, Vec3f};
use crate::gl::{barycentric, Transform};
use crate::model::Model;
use crate::shader::Shader;

/// Runs `shader` over every face of `model`: three vertex calls, then the triangle fill.
pub fn draw_model<M, S>(
    model: &M,
    transform: &Transform,
    shader: &mut S,
    image: &mut Image,
    zbuffer: &mut DepthBuffer,
) where
    M: Model + ?Sized,
    S: Shader,
{
    let mut clip_coords = Matrix4x3::<f32>::zeros();
    for face in 0..model.face_count() {
        for nthvert in 0..3 {
            clip_coords.set_column(nthvert, &shader.vertex(transform, face, nthvert));
        }
        triangle(&clip_coords, transform, shader, image, zbuffer);
    }
}

/// Fills a triangle given by clip coordinates of its vertices as columns.
/// Fragments are depth tested before shading, a discarded fragment writes neither depth nor color.
pub fn triangle<S: Shader>(
    clip_coords: &Matrix4x3<f32>,
    transform: &Transform,
    shader: &S,
    image: &mut Image,
    zbuffer: &mut DepthBuffer,
) {
    let screen_coords = transform.viewport * clip_coords;
    let mut points = [Vec3f::zeros(); 3];
    for i in 0..3 {
        points[i] = proj::<3, 4>(&screen_coords.column(i).into_owned());
    }
    let corners: [Vec2f; 3] = [points[0].xy(), points[1].xy(), points[2].xy()];
    let depths = Vector3::new(points[0].z, points[1].z, points[2].z);
    let clip_w = Vector3::new(clip_coords[(3, 0)], clip_coords[(3, 1)], clip_coords[(3, 2)]);

    // Bounding box of the triangle, clamped to the image.
    let max_x = (image.width as f32 - 1.0).max(0.0);
    let max_y = (image.height as f32 - 1.0).max(0.0);
    let min_corner_x = corners.iter().map(|c| c.x).fold(f32::INFINITY, f32::min);
    let min_corner_y = corners.iter().map(|c| c.y).fold(f32::INFINITY, f32::min);
    let max_corner_x = corners.iter().map(|c| c.x).fold(f32::NEG_INFINITY, f32::max);
    let max_corner_y = corners.iter().map(|c| c.y).fold(f32::NEG_INFINITY, f32::max);
    let bbox_min_x = min_corner_x.floor().clamp(0.0, max_x) as i32;
    let bbox_min_y = min_corner_y.floor().clamp(0.0, max_y) as i32;
    let bbox_max_x = max_corner_x.ceil().clamp(0.0, max_x) as i32;
    let bbox_max_y = max_corner_y.ceil().clamp(0.0, max_y) as i32;
    if !(min_corner_x <= max_x && min_corner_y <= max_y && max_corner_x >= 0.0 && max_corner_y >= 0.0) {
        // Completely off screen (or NaN coordinates).
        return;
    }

    for x in bbox_min_x..=bbox_max_x {
        for y in bbox_min_y..=bbox_max_y {
            let point = Vec2f::new(x as f32, y as f32);
            let bc_screen = barycentric(corners[0], corners[1], corners[2], point);
            if bc_screen.x < 0.0 || bc_screen.y < 0.0 || bc_screen.z < 0.0 {
                continue;
            }
            // Perspective correction: weights divided by clip w and renormalized.
            let mut bc_clip = bc_screen.component_div(&clip_w);
            bc_clip /= bc_clip.sum();
            let depth = bc_clip.dot(&depths);
            if !zbuffer.is_nearer(x, y, depth) {
                continue;
            }
            if let Some(color) = shader.fragment(bc_clip) {
                zbuffer.set(x, y, depth);
                image.set_pixel(x, y, color);
            }
        }
    }
}
