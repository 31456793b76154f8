use std::time;

use crate::buffer::DepthBuffer;
use crate::camera::Camera;
use crate::framebuffer::{Color, Image, BLACK};
use crate::geometry::Vec3f;
use crate::gl::{viewport, Transform};
use crate::model::Model;
use crate::raster::draw_model;
use crate::shader::{DepthShader, PhongShader};

/// Default base margin of the shadow test, in viewport depth units. The shader adds a part that
/// grows with the surface tilt towards the light.
pub const SHADOW_BIAS: f32 = 1.0;

/// Owns everything a frame needs: models, camera, framebuffers and depth buffers.
/// Each `render` call does two passes - depth from the light into the shadow buffer, then the
/// shaded image from the eye.
pub struct Renderer {
    width: u32,
    height: u32,
    models: Vec<Box<dyn Model>>,
    camera: Camera,
    background: Color,
    shadow_bias: f32,
    frame: Image,
    shadow_frame: Image, // Light's view, depth as grey levels.
    zbuffer: DepthBuffer,
    shadow_buffer: DepthBuffer,
}

impl Renderer {
    pub fn new(width: u32, height: u32) -> Self {
        return Self {
            width,
            height,
            models: Vec::new(),
            camera: Camera::default(),
            background: BLACK,
            shadow_bias: SHADOW_BIAS,
            frame: Image::new(width, height, BLACK),
            shadow_frame: Image::new(width, height, BLACK),
            zbuffer: DepthBuffer::new(width, height),
            shadow_buffer: DepthBuffer::new(width, height),
        };
    }

    pub fn add_model(&mut self, model: Box<dyn Model>) {
        self.models.push(model);
    }

    pub fn camera(&self) -> &Camera {
        return &self.camera;
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    pub fn set_background(&mut self, background: Color) {
        self.background = background;
    }

    pub fn set_shadow_bias(&mut self, shadow_bias: f32) {
        self.shadow_bias = shadow_bias;
    }

    /// Pass 1 transform: the light as an orthographic camera over the whole buffer.
    pub fn light_transform(&self) -> Transform {
        return Transform::orthographic(
            self.camera.light_direction,
            Vec3f::zeros(),
            self.camera.up,
            viewport(0, 0, self.width as i32, self.height as i32),
        );
    }

    /// Pass 2 transform: perspective from the eye, drawn into the middle 3/4 of the frame.
    pub fn eye_transform(&self) -> Transform {
        let (w, h) = (self.width as i32, self.height as i32);
        return Transform::perspective(
            self.camera.eye,
            self.camera.center,
            self.camera.up,
            viewport(w / 8, h / 8, w * 3 / 4, h * 3 / 4),
        );
    }

    /// Renders a frame and returns it.
    pub fn render(&mut self) -> &Image {
        let time_begin = time::Instant::now();
        self.frame.fill(self.background);
        self.shadow_frame.fill(BLACK);
        self.zbuffer.clear();
        self.shadow_buffer.clear();

        let light = self.light_transform();
        for model in &self.models {
            let mut shader = DepthShader::new(model.as_ref());
            draw_model(model.as_ref(), &light, &mut shader, &mut self.shadow_frame, &mut self.shadow_buffer);
        }
        let shadow_matrix = light.composed();

        let eye = self.eye_transform();
        for model in &self.models {
            let mut shader = PhongShader::new(
                model.as_ref(),
                &eye,
                self.camera.light_direction,
                shadow_matrix,
                &self.shadow_buffer,
                self.shadow_bias,
            );
            draw_model(model.as_ref(), &eye, &mut shader, &mut self.frame, &mut self.zbuffer);
        }

        log::debug!("Frame rendered in {:?}", time_begin.elapsed());
        return &self.frame;
    }

    /// Last rendered frame.
    pub fn frame(&self) -> &Image {
        return &self.frame;
    }

    /// Light's view from the last render.
    pub fn shadow_frame(&self) -> &Image {
        return &self.shadow_frame;
    }

    pub fn move_light(&mut self, dx: f32, dy: f32) {
        self.camera.move_light(dx, dy);
    }

    pub fn move_eye(&mut self, dx: f32, dy: f32) {
        self.camera.move_eye(dx, dy);
    }

    pub fn move_center(&mut self, dx: f32, dy: f32) {
        self.camera.move_center(dx, dy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::WHITE;
    use crate::model::ObjModel;
    use nalgebra::vector;

    const CUBE: &str = include_str!("../assets/cube/cube.obj");

    // Back face of the cube on its own.
    const BACK_FACE: &str = "
v -0.5 -0.5 -0.5
v 0.5 -0.5 -0.5
v 0.5 0.5 -0.5
v -0.5 0.5 -0.5
vt 0 0
vn 0 0 -1
f 2/1/1 1/1/1 4/1/1
f 2/1/1 4/1/1 3/1/1
";

    const SIZE: u32 = 200;

    fn cube_renderer(obj: &str) -> Renderer {
        let mut renderer = Renderer::new(SIZE, SIZE);
        renderer.set_background(Color::new(10, 20, 30));
        renderer.add_model(Box::new(ObjModel::from_reader(obj.as_bytes()).unwrap()));
        renderer.set_camera(Camera {
            eye: vector![0.0, 0.0, 3.0],
            center: Vec3f::zeros(),
            up: Vec3f::y(),
            light_direction: vector![0.0, 0.0, 1.0],
        });
        return renderer;
    }

    #[test]
    fn cube_front_face_is_uniformly_lit() {
        let mut renderer = cube_renderer(CUBE);
        let frame = renderer.render();
        let center = (SIZE / 2) as i32;
        assert_eq!(frame.get_pixel(center, center), Some(WHITE));
        // Front face covers roughly the middle 90 pixels, its inner part must be flat.
        for x in 70..130 {
            for y in 70..130 {
                assert_eq!(frame.get_pixel(x, y), Some(WHITE), "pixel ({}, {})", x, y);
            }
        }
        assert_eq!(frame.get_pixel(5, 5), Some(Color::new(10, 20, 30)));
        assert_eq!(frame.get_pixel(195, 100), Some(Color::new(10, 20, 30)));
    }

    #[test]
    fn obliquely_lit_face_does_not_shadow_itself() {
        for light in [vector![1.0, 1.0, 1.0], vector![1.0, 0.0, 0.25], vector![1.0, 0.5, 0.2]] {
            let mut renderer = cube_renderer(CUBE);
            let mut camera = *renderer.camera();
            camera.light_direction = light.normalize();
            renderer.set_camera(camera);
            let frame = renderer.render();
            let expected = frame.get_pixel(100, 100);
            for x in 70..130 {
                for y in 70..130 {
                    assert_eq!(frame.get_pixel(x, y), expected, "light {:?}, pixel ({}, {})", light, x, y);
                }
            }
            // Lit, not dimmed: n.l with the front face normal.
            let lit = WHITE.scaled(light.normalize().z);
            let got = expected.unwrap();
            assert!((got.r as i32 - lit.r as i32).abs() <= 1, "light {:?}: {:?} vs {:?}", light, got, lit);
        }
    }

    #[test]
    fn back_face_is_culled() {
        let mut renderer = cube_renderer(BACK_FACE);
        let background = Image::new(SIZE, SIZE, Color::new(10, 20, 30));
        assert_eq!(renderer.render(), &background);
        // The light still sees it.
        assert_ne!(renderer.shadow_frame().get_pixel(80, 90), Some(BLACK));
    }

    #[test]
    fn rendering_is_deterministic() {
        let mut renderer = cube_renderer(CUBE);
        renderer.move_eye(1.0, 1.0);
        renderer.move_light(-2.0, 1.0);
        let first = renderer.render().clone();
        let second = renderer.render().clone();
        assert!(first.diff(&second).as_raw().iter().all(|&c| c == 0));
    }

    #[test]
    fn cube_shadows_the_floor() {
        // Floor half a unit below the cube, light from the upper left.
        let floor = "
v -3 -1 -3
v 3 -1 -3
v 3 -1 3
v -3 -1 3
vt 0 0
vn 0 1 0
f 1/1/1 4/1/1 3/1/1
f 1/1/1 3/1/1 2/1/1
";
        let mut renderer = cube_renderer(CUBE);
        renderer.add_model(Box::new(ObjModel::from_reader(floor.as_bytes()).unwrap()));
        renderer.set_camera(Camera {
            eye: vector![0.0, 3.0, 5.0],
            center: vector![0.0, -1.0, 0.0],
            up: Vec3f::y(),
            light_direction: vector![-1.0, 1.0, 0.0].normalize(),
        });
        renderer.render();

        let eye = renderer.eye_transform();
        let to_pixel = |p: Vec3f| {
            let screen = eye.composed() * vector![p.x, p.y, p.z, 1.0];
            ((screen.x / screen.w).round() as i32, (screen.y / screen.w).round() as i32)
        };
        // Floor in front of the cube is lit at 45 degrees.
        let (lit_x, lit_y) = to_pixel(vector![-0.45, -1.0, 0.9]);
        let lit = renderer.frame().get_pixel(lit_x, lit_y).unwrap();
        assert!(lit.r > 150, "lit floor is {:?}", lit);

        // The cube's top face is between this point and the light.
        let (shadow_x, shadow_y) = to_pixel(vector![1.2, -1.0, 0.1]);
        let shadowed = renderer.frame().get_pixel(shadow_x, shadow_y).unwrap();
        assert!(shadowed.r < 100, "shadowed floor is {:?}", shadowed);
    }
}
