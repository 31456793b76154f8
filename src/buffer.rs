/// Value of a cell no surface has been written to. Larger depth is nearer to the viewer.
pub const NO_SURFACE: f32 = f32::NEG_INFINITY;

/// Per-pixel depth record, used both as the z-buffer and as the shadow buffer.
/// Same addressing as the framebuffer: (0, 0) is the bottom left cell.
#[derive(Debug, Clone)]
pub struct DepthBuffer {
    pub width: u32,
    pub height: u32,
    data: Vec<f32>,
}

impl DepthBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        return Self {
            width,
            height,
            data: vec![NO_SURFACE; (width * height) as usize],
        };
    }

    /// Resets every cell to "no surface seen".
    pub fn clear(&mut self) {
        self.fill(NO_SURFACE);
    }

    pub fn fill(&mut self, depth: f32) {
        self.data.iter_mut().for_each(|cell| *cell = depth);
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        return Some(x as usize + y as usize * self.width as usize);
    }

    /// Stored depth, None outside of the buffer.
    pub fn get(&self, x: i32, y: i32) -> Option<f32> {
        return self.index(x, y).map(|index| self.data[index]);
    }

    /// Out of bounds writes are skipped.
    pub fn set(&mut self, x: i32, y: i32, depth: f32) {
        if let Some(index) = self.index(x, y) {
            self.data[index] = depth;
        }
    }

    /// Depth test: true if `depth` is nearer than what's stored at (x, y).
    pub fn is_nearer(&self, x: i32, y: i32, depth: f32) -> bool {
        return match self.get(x, y) {
            Some(stored) => depth > stored,
            None => false,
        };
    }
}
