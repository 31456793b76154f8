use std::path::Path;

/// Struct, representing raw rgb8 pixel data.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

pub const BLACK: Color = Color { r: 0,   g: 0,   b: 0,   };
pub const WHITE: Color = Color { r: 255, g: 255, b: 255, };

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Color {
        return Color { r, g, b };
    }

    /// Grey level for intensity in [0.0, 1.0], values outside are clamped.
    pub fn grey(intensity: f32) -> Color {
        let value = (intensity.clamp(0.0, 1.0) * 255.0) as u8;
        return Color::new(value, value, value);
    }

    /// Get convex combination of two colors: t * c_1 + (1 - t) * c_2.
    /// t is unrestricted, channels saturate at 0 and 255.
    pub fn blend(color_1: Color, color_2: Color, t: f32) -> Color {
        fn mix(a: u8, b: u8, t: f32) -> u8 {
            return (t * a as f32 + (1.0 - t) * b as f32).clamp(0.0, 255.0) as u8;
        }
        return Color {
            r: mix(color_1.r, color_2.r, t),
            g: mix(color_1.g, color_2.g, t),
            b: mix(color_1.b, color_2.b, t),
        }
    }

    /// Every channel multiplied by `intensity`, clamped to the representable range.
    pub fn scaled(self, intensity: f32) -> Color {
        return Color::blend(self, BLACK, intensity);
    }
}

/// Image, holding its width, height and private flat array(vec) of rgb8 pixel data.
/// (0, 0) is the bottom left coord, rows are stored top to bottom so the raw data can be shown
/// or saved as is.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pixel_data: Vec<u8>,
}

impl Image {
    /// Generates new image with specified width and height, filled with `background`.
    pub fn new(width: u32, height: u32, background: Color) -> Image {
        let mut image = Image {
            width,
            height,
            pixel_data: vec![0; (3 * width * height) as usize],
        };
        image.fill(background);
        return image;
    }

    pub fn as_raw(&self) -> &[u8] {
        return &self.pixel_data[..];
    }

    pub fn fill(&mut self, color: Color) {
        for pixel in self.pixel_data.chunks_exact_mut(3) {
            pixel[0] = color.r;
            pixel[1] = color.g;
            pixel[2] = color.b;
        }
    }

    /// Start of the rgb triple for (x, y), None when the coord is outside of the image.
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        // Forcing (0, 0) to be in the bottom left here by inverting y.
        let row = (self.height as i32 - 1 - y) as usize;
        return Some(3 * (x as usize + row * self.width as usize));
    }

    /// Sets image pixel to a color at specified coordinate. Out of bounds writes are skipped.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        if let Some(index) = self.index(x, y) {
            self.pixel_data[index + 0] = color.r;
            self.pixel_data[index + 1] = color.g;
            self.pixel_data[index + 2] = color.b;
        }
    }

    pub fn get_pixel(&self, x: i32, y: i32) -> Option<Color> {
        let index = self.index(x, y)?;
        return Some(Color {
            r: self.pixel_data[index + 0],
            g: self.pixel_data[index + 1],
            b: self.pixel_data[index + 2],
        });
    }

    /// Per channel absolute difference of two images of the same size.
    pub fn diff(&self, other: &Image) -> Image {
        assert_eq!(self.width, other.width, "diff of images with different widths");
        assert_eq!(self.height, other.height, "diff of images with different heights");
        let pixel_data = self.pixel_data.iter()
            .zip(other.pixel_data.iter())
            .map(|(a, b)| a.abs_diff(*b))
            .collect();
        return Image {
            width: self.width,
            height: self.height,
            pixel_data,
        };
    }

    /// Writes the image to disk, format is picked by the `image` crate from the extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ::image::ImageError> {
        return ::image::save_buffer(
            path,
            &self.pixel_data,
            self.width,
            self.height,
            ::image::ColorType::Rgb8,
        );
    }
}
