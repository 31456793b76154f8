use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ::image::RgbImage;
use nalgebra::vector;
use obj::raw::object::Polygon;
use obj::raw::parse_obj;
use thiserror::Error;

use crate::framebuffer::{Color, WHITE};
use crate::geometry::{Vec2f, Vec3f};

/// Geometry and surface data the pipeline reads. Everything is addressed per face corner:
/// `nthvert` is always in 0..3.
pub trait Model {
    fn face_count(&self) -> usize;
    fn vertex(&self, face: usize, nthvert: usize) -> Vec3f;
    fn normal(&self, face: usize, nthvert: usize) -> Vec3f;
    fn uv(&self, face: usize, nthvert: usize) -> Vec2f;
    /// Surface color at `uv`.
    fn diffuse(&self, uv: Vec2f) -> Color;
    /// Unit object space normal at `uv`, None when the model has no normal map.
    fn normal_map(&self, uv: Vec2f) -> Option<Vec3f>;
    /// Specular exponent at `uv`, None when the model has no specular map.
    fn specular(&self, uv: Vec2f) -> Option<f32>;
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("OBJ parse error: {0}")]
    Obj(#[from] obj::ObjError),
    #[error("Texture error: {0}")]
    Texture(#[from] ::image::ImageError),
    #[error("Invalid face {face}: {reason}")]
    InvalidFace { face: usize, reason: String },
}

/// Texture image with lookups by uv. v goes up, so it's flipped against image rows.
pub struct Texture {
    image: RgbImage,
}

impl Texture {
    pub fn new(image: RgbImage) -> Self {
        return Self { image };
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        return Ok(Self::new(::image::open(path)?.to_rgb8()));
    }

    fn texel(&self, uv: Vec2f) -> [u8; 3] {
        let max_x = self.image.width().saturating_sub(1) as f32;
        let max_y = self.image.height().saturating_sub(1) as f32;
        let x = (uv.x * self.image.width() as f32).clamp(0.0, max_x) as u32;
        let y = ((1.0 - uv.y) * self.image.height() as f32).clamp(0.0, max_y) as u32;
        return self.image.get_pixel(x, y).0;
    }

    pub fn color(&self, uv: Vec2f) -> Color {
        let [r, g, b] = self.texel(uv);
        return Color::new(r, g, b);
    }

    /// Normal map decoding: every channel is a coordinate biased by 128.
    pub fn normal(&self, uv: Vec2f) -> Vec3f {
        let [r, g, b] = self.texel(uv);
        return vector![r as f32 - 128.0, g as f32 - 128.0, b as f32 - 128.0].normalize();
    }

    /// Red channel as a plain number.
    pub fn value(&self, uv: Vec2f) -> f32 {
        return self.texel(uv)[0] as f32;
    }
}

/// Indices of one face corner into position, uv and normal lists.
#[derive(Debug, Clone, Copy)]
struct Corner {
    position: usize,
    uv: Option<usize>,
    normal: Option<usize>,
}

/// Model read from a Wavefront OBJ file, with optional textures lying next to it.
pub struct ObjModel {
    positions: Vec<Vec3f>,
    uvs: Vec<Vec2f>,
    normals: Vec<Vec3f>,
    faces: Vec<[Corner; 3]>,
    face_normals: Vec<Vec3f>, // Used for corners without a normal.
    diffuse: Option<Texture>,
    normal_map: Option<Texture>,
    specular: Option<Texture>,
}

impl ObjModel {
    /// Loads `path` and the textures `<stem>_diffuse.tga`, `<stem>_nm.tga` and
    /// `<stem>_spec.tga` from the same directory, missing textures are skipped.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let mut model = Self::from_reader(BufReader::new(File::open(path)?))?;
        log::info!(
            "Loaded {} - {} vertices, {} faces",
            path.display(),
            model.vertex_count(),
            model.face_count()
        );

        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let texture_path = |suffix: &str| path.with_file_name(format!("{}_{}.tga", stem, suffix));
        model.diffuse = load_optional_texture(&texture_path("diffuse"))?;
        model.normal_map = load_optional_texture(&texture_path("nm"))?;
        model.specular = load_optional_texture(&texture_path("spec"))?;

        return Ok(model);
    }

    /// Parses OBJ text, no textures attached.
    pub fn from_reader(reader: impl BufRead) -> Result<Self, ModelError> {
        let raw = parse_obj(reader)?;
        let positions: Vec<Vec3f> = raw.positions.iter().map(|p| vector![p.0, p.1, p.2]).collect();
        let uvs: Vec<Vec2f> = raw.tex_coords.iter().map(|t| vector![t.0, t.1]).collect();
        let normals: Vec<Vec3f> = raw.normals.iter()
            .map(|n| vector![n.0, n.1, n.2].try_normalize(f32::EPSILON).unwrap_or_else(Vec3f::z))
            .collect();

        let mut faces = Vec::with_capacity(raw.polygons.len());
        for (index, polygon) in raw.polygons.iter().enumerate() {
            let corners: Vec<Corner> = match polygon {
                Polygon::P(v) => v.iter()
                    .map(|&p| Corner { position: p, uv: None, normal: None })
                    .collect(),
                Polygon::PT(v) => v.iter()
                    .map(|&(p, t)| Corner { position: p, uv: Some(t), normal: None })
                    .collect(),
                Polygon::PN(v) => v.iter()
                    .map(|&(p, n)| Corner { position: p, uv: None, normal: Some(n) })
                    .collect(),
                Polygon::PTN(v) => v.iter()
                    .map(|&(p, t, n)| Corner { position: p, uv: Some(t), normal: Some(n) })
                    .collect(),
            };
            if corners.len() < 3 {
                return Err(ModelError::InvalidFace {
                    face: index,
                    reason: format!("{} vertices", corners.len()),
                });
            }
            for corner in &corners {
                check_index(index, "position", corner.position, positions.len())?;
                if let Some(uv) = corner.uv {
                    check_index(index, "uv", uv, uvs.len())?;
                }
                if let Some(normal) = corner.normal {
                    check_index(index, "normal", normal, normals.len())?;
                }
            }
            // Polygons are split into a fan around the first corner.
            for i in 1..corners.len() - 1 {
                faces.push([corners[0], corners[i], corners[i + 1]]);
            }
        }

        let face_normals = faces.iter()
            .map(|face| {
                let a = positions[face[0].position];
                let b = positions[face[1].position];
                let c = positions[face[2].position];
                return (b - a).cross(&(c - a)).try_normalize(f32::EPSILON).unwrap_or_else(Vec3f::z);
            })
            .collect();

        return Ok(Self {
            positions,
            uvs,
            normals,
            faces,
            face_normals,
            diffuse: None,
            normal_map: None,
            specular: None,
        });
    }

    pub fn with_diffuse(mut self, texture: Texture) -> Self {
        self.diffuse = Some(texture);
        return self;
    }

    pub fn with_normal_map(mut self, texture: Texture) -> Self {
        self.normal_map = Some(texture);
        return self;
    }

    pub fn with_specular(mut self, texture: Texture) -> Self {
        self.specular = Some(texture);
        return self;
    }

    pub fn vertex_count(&self) -> usize {
        return self.positions.len();
    }
}

fn check_index(face: usize, kind: &str, index: usize, len: usize) -> Result<(), ModelError> {
    if index >= len {
        return Err(ModelError::InvalidFace {
            face,
            reason: format!("{} index {} out of {}", kind, index, len),
        });
    }
    return Ok(());
}

fn load_optional_texture(path: &Path) -> Result<Option<Texture>, ModelError> {
    if !path.exists() {
        log::warn!("No texture at {}", path.display());
        return Ok(None);
    }
    log::debug!("Loading texture {}", path.display());
    return Texture::load(path).map(Some);
}

impl Model for ObjModel {
    fn face_count(&self) -> usize {
        return self.faces.len();
    }

    fn vertex(&self, face: usize, nthvert: usize) -> Vec3f {
        return self.positions[self.faces[face][nthvert].position];
    }

    fn normal(&self, face: usize, nthvert: usize) -> Vec3f {
        return match self.faces[face][nthvert].normal {
            Some(index) => self.normals[index],
            None => self.face_normals[face],
        };
    }

    fn uv(&self, face: usize, nthvert: usize) -> Vec2f {
        return match self.faces[face][nthvert].uv {
            Some(index) => self.uvs[index],
            None => Vec2f::zeros(),
        };
    }

    fn diffuse(&self, uv: Vec2f) -> Color {
        return self.diffuse.as_ref().map_or(WHITE, |texture| texture.color(uv));
    }

    fn normal_map(&self, uv: Vec2f) -> Option<Vec3f> {
        return self.normal_map.as_ref().map(|texture| texture.normal(uv));
    }

    fn specular(&self, uv: Vec2f) -> Option<f32> {
        return self.specular.as_ref().map(|texture| texture.value(uv));
    }
}
