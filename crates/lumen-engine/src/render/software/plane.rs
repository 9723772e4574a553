use glam::Vec4;

use crate::coords::ViewportSize;
use crate::render::RenderError;

/// Row-major 2D array of pixels, origin top-left.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane<T> {
    size: ViewportSize,
    data: Vec<T>,
}

/// Display target of the software backend (linear rgba, unclamped).
pub type Framebuffer = Plane<Vec4>;

impl<T> Plane<T> {
    /// Zero-sized plane, holding no pixels.
    pub const fn empty() -> Self {
        Self {
            size: ViewportSize::new(0, 0),
            data: Vec::new(),
        }
    }
}

impl<T: Copy> Plane<T> {
    /// Allocates a plane filled with `value`.
    ///
    /// Allocation failure is reported as [`RenderError::ResourceExhaustion`]
    /// instead of aborting.
    pub fn try_filled(size: ViewportSize, value: T) -> Result<Self, RenderError> {
        let len = size.area();
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|e| RenderError::ResourceExhaustion {
                size,
                reason: e.to_string(),
            })?;
        data.resize(len, value);
        Ok(Self { size, data })
    }

    #[inline]
    pub fn size(&self) -> ViewportSize {
        self.size
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.size.width && y < self.size.height)
            .then(|| y as usize * self.size.width as usize + x as usize)
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Option<T> {
        self.index(x, y).map(|i| self.data[i])
    }

    /// Writes one pixel. Out-of-bounds writes are ignored.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: T) {
        if let Some(i) = self.index(x, y) {
            self.data[i] = value;
        }
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filled_plane_has_requested_size() {
        let p = Plane::try_filled(ViewportSize::new(4, 3), 7u8).unwrap();
        assert_eq!(p.size(), ViewportSize::new(4, 3));
        assert_eq!(p.as_slice().len(), 12);
        assert!(p.as_slice().iter().all(|&v| v == 7));
    }

    #[test]
    fn set_and_get_are_row_major() {
        let mut p = Plane::try_filled(ViewportSize::new(3, 2), 0u32).unwrap();
        p.set(2, 1, 5);
        assert_eq!(p.as_slice()[5], 5);
        assert_eq!(p.get(2, 1), Some(5));
    }

    #[test]
    fn out_of_bounds_is_ignored() {
        let mut p = Plane::try_filled(ViewportSize::new(2, 2), 0u32).unwrap();
        p.set(2, 0, 9);
        p.set(0, 2, 9);
        assert_eq!(p.get(2, 0), None);
        assert!(p.as_slice().iter().all(|&v| v == 0));
    }
}
