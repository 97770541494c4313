/// Per-pixel depth buffer
///
/// Depth follows the projection convention: larger values are nearer the
/// camera. A cell holding `f64::NEG_INFINITY` has not been written this
/// frame and accepts any finite depth.

/// Minimum depth advantage a fragment needs to replace the stored one.
pub const DEPTH_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct ZBuffer {
    width: usize,
    height: usize,
    depth: Vec<f64>,
}

impl ZBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            depth: vec![f64::NEG_INFINITY; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Reallocate for a new target size. Contents are cleared.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.depth.clear();
        self.depth.resize(width * height, f64::NEG_INFINITY);
    }

    /// Mark every cell as unwritten.
    pub fn clear(&mut self) {
        self.depth.fill(f64::NEG_INFINITY);
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y * self.width + x)
    }

    /// Stored depth, `None` for unwritten or out-of-bounds cells.
    pub fn get(&self, x: i32, y: i32) -> Option<f64> {
        self.index(x, y)
            .map(|i| self.depth[i])
            .filter(|z| z.is_finite())
    }

    /// Depth test: store `z` and return true when the fragment is visible.
    pub fn test_and_set(&mut self, x: i32, y: i32, z: f64) -> bool {
        if !z.is_finite() {
            return false;
        }
        let Some(i) = self.index(x, y) else {
            return false;
        };

        let stored = self.depth[i];
        if stored == f64::NEG_INFINITY || z > stored + DEPTH_EPSILON {
            self.depth[i] = z;
            true
        } else {
            false
        }
    }
}
