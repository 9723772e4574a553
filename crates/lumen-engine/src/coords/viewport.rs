/// Size of the display surface in physical pixels.
///
/// The deferred renderer sizes every G-buffer attachment from this value, so it
/// is always a whole number of pixels. Fractional sizes coming from the platform
/// are rounded up.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl ViewportSize {
    /// Placeholder size used before the first real viewport is observed.
    pub const PLACEHOLDER: ViewportSize = ViewportSize::new(1, 1);

    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Builds a size from fractional pixel dimensions, rounding up.
    ///
    /// Negative and non-finite inputs collapse to zero, which callers treat as a
    /// degenerate viewport.
    #[inline]
    pub fn from_f64(width: f64, height: f64) -> Self {
        fn ceil_px(v: f64) -> u32 {
            if v.is_finite() && v > 0.0 {
                v.ceil().min(u32::MAX as f64) as u32
            } else {
                0
            }
        }
        Self::new(ceil_px(width), ceil_px(height))
    }

    /// `true` when either dimension is zero. Nothing can be rendered at this size.
    #[inline]
    pub fn is_degenerate(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width / height. Only meaningful for non-degenerate sizes.
    #[inline]
    pub fn aspect(self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Total pixel count.
    #[inline]
    pub fn area(self) -> usize {
        self.width as usize * self.height as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── from_f64 ──────────────────────────────────────────────────────────

    #[test]
    fn from_f64_rounds_up() {
        assert_eq!(ViewportSize::from_f64(99.2, 100.0), ViewportSize::new(100, 100));
        assert_eq!(ViewportSize::from_f64(0.1, 0.9), ViewportSize::new(1, 1));
    }

    #[test]
    fn from_f64_rejects_negative_and_nan() {
        assert_eq!(ViewportSize::from_f64(-5.0, 10.0), ViewportSize::new(0, 10));
        assert_eq!(ViewportSize::from_f64(f64::NAN, 10.0).width, 0);
    }

    // ── degenerate ────────────────────────────────────────────────────────

    #[test]
    fn zero_dimension_is_degenerate() {
        assert!(ViewportSize::new(0, 10).is_degenerate());
        assert!(ViewportSize::new(10, 0).is_degenerate());
        assert!(!ViewportSize::PLACEHOLDER.is_degenerate());
    }

    #[test]
    fn aspect_is_width_over_height() {
        assert_eq!(ViewportSize::new(200, 100).aspect(), 2.0);
    }
}
