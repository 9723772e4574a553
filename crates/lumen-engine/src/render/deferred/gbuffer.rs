//! G-buffer attachment set.
//!
//! Layout (all attachments share one size):
//!
//! | slot | name              | contents                               |
//! |------|-------------------|----------------------------------------|
//! | 0    | `albedo`          | base color rgb, alpha 1 where covered  |
//! | 1    | `normal_emissive` | view-space normal xyz, emissive in w   |
//! | 2    | `frag_pos`        | view-space position xyz, w = 0         |
//! | -    | depth             | hardware depth                         |
//!
//! The emissive intensity lives only in the alpha of slot 1. Nothing else
//! writes that channel.

use crate::coords::ViewportSize;
use crate::render::RenderError;

/// Number of color attachments written by the geometry pass.
pub const COLOR_ATTACHMENT_COUNT: usize = 3;

/// Color attachment slots, in MRT location order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ColorAttachment {
    Albedo = 0,
    NormalEmissive = 1,
    FragPos = 2,
}

impl ColorAttachment {
    pub const ALL: [ColorAttachment; COLOR_ATTACHMENT_COUNT] = [
        ColorAttachment::Albedo,
        ColorAttachment::NormalEmissive,
        ColorAttachment::FragPos,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub const fn label(self) -> &'static str {
        match self {
            ColorAttachment::Albedo => "lumen gbuffer albedo",
            ColorAttachment::NormalEmissive => "lumen gbuffer normal+emissive",
            ColorAttachment::FragPos => "lumen gbuffer frag pos",
        }
    }
}

/// Backend storage behind a G-buffer: three color attachments plus depth, all
/// of identical size.
pub trait GBufferStorage {
    type Texture;
    type DepthTexture;

    fn size(&self) -> ViewportSize;
    fn color(&self, attachment: ColorAttachment) -> &Self::Texture;
    fn depth(&self) -> &Self::DepthTexture;
}

/// Owns the current G-buffer storage and replaces it on resize.
///
/// Access goes through short-lived handles:
/// - [`begin_write`](Self::begin_write) → [`GBufferWriter`] for the geometry pass
/// - [`GBufferWriter::finish`] or [`read`](Self::read) → [`GBufferReader`] for the composite
///
/// Handles borrow the set, so none can survive a resize.
#[derive(Debug)]
pub struct GBufferAttachmentSet<S> {
    storage: S,
    generation: u64,
}

impl<S: GBufferStorage> GBufferAttachmentSet<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            generation: 0,
        }
    }

    #[inline]
    pub fn size(&self) -> ViewportSize {
        self.storage.size()
    }

    /// Incremented on every reallocation. Backends use it to rebuild bindings
    /// that reference attachment views.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Reallocates all attachments at `size` using `allocate`.
    ///
    /// Returns `Ok(false)` when the size is unchanged. On error the previous
    /// storage is kept untouched.
    pub fn resize_with<F>(&mut self, size: ViewportSize, allocate: F) -> Result<bool, RenderError>
    where
        F: FnOnce(ViewportSize) -> Result<S, RenderError>,
    {
        if size.is_degenerate() {
            return Err(RenderError::DegenerateResize(size));
        }
        if size == self.size() {
            return Ok(false);
        }

        let storage = allocate(size)?;
        debug_assert_eq!(storage.size(), size, "allocator returned wrong size");

        self.storage = storage;
        self.generation = self.generation.wrapping_add(1);
        Ok(true)
    }

    /// Opens the attachments for the geometry pass.
    #[inline]
    pub fn begin_write(&mut self) -> GBufferWriter<'_, S> {
        GBufferWriter {
            storage: &mut self.storage,
            generation: self.generation,
        }
    }

    /// Read-only view of the attachments as left by the last geometry pass.
    #[inline]
    pub fn read(&self) -> GBufferReader<'_, S> {
        GBufferReader {
            storage: &self.storage,
            generation: self.generation,
        }
    }
}

/// Write handle held by the geometry pass.
pub struct GBufferWriter<'a, S> {
    storage: &'a mut S,
    generation: u64,
}

impl<'a, S: GBufferStorage> GBufferWriter<'a, S> {
    #[inline]
    pub fn size(&self) -> ViewportSize {
        self.storage.size()
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Render-target access for the geometry pass.
    #[inline]
    pub fn storage_mut(&mut self) -> &mut S {
        self.storage
    }

    /// Ends the write phase; the attachments become readable.
    #[inline]
    pub fn finish(self) -> GBufferReader<'a, S> {
        GBufferReader {
            storage: self.storage,
            generation: self.generation,
        }
    }
}

/// Read handle held by the composite pass.
pub struct GBufferReader<'a, S> {
    storage: &'a S,
    generation: u64,
}

impl<'a, S: GBufferStorage> GBufferReader<'a, S> {
    #[inline]
    pub fn size(&self) -> ViewportSize {
        self.storage.size()
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn attachment_texture(&self, attachment: ColorAttachment) -> &'a S::Texture {
        self.storage.color(attachment)
    }

    /// Index-based access in MRT location order.
    #[inline]
    pub fn attachment_texture_at(&self, index: usize) -> Option<&'a S::Texture> {
        ColorAttachment::from_index(index).map(|a| self.storage.color(a))
    }

    #[inline]
    pub fn depth_texture(&self) -> &'a S::DepthTexture {
        self.storage.depth()
    }

    #[inline]
    pub fn storage(&self) -> &'a S {
        self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FakeStorage(ViewportSize);

    impl GBufferStorage for FakeStorage {
        type Texture = ViewportSize;
        type DepthTexture = ViewportSize;

        fn size(&self) -> ViewportSize {
            self.0
        }
        fn color(&self, _: ColorAttachment) -> &ViewportSize {
            &self.0
        }
        fn depth(&self) -> &ViewportSize {
            &self.0
        }
    }

    fn set() -> GBufferAttachmentSet<FakeStorage> {
        GBufferAttachmentSet::new(FakeStorage(ViewportSize::PLACEHOLDER))
    }

    // ── resize ────────────────────────────────────────────────────────────

    #[test]
    fn resize_reallocates_and_bumps_generation() {
        let mut gb = set();
        let size = ViewportSize::new(200, 150);
        assert_eq!(gb.resize_with(size, |s| Ok(FakeStorage(s))), Ok(true));
        assert_eq!(gb.size(), size);
        assert_eq!(gb.generation(), 1);
    }

    #[test]
    fn resize_to_same_size_is_noop() {
        let mut gb = set();
        let called = std::cell::Cell::new(false);
        let r = gb.resize_with(ViewportSize::PLACEHOLDER, |s| {
            called.set(true);
            Ok(FakeStorage(s))
        });
        assert_eq!(r, Ok(false));
        assert!(!called.get());
        assert_eq!(gb.generation(), 0);
    }

    #[test]
    fn degenerate_resize_is_rejected() {
        let mut gb = set();
        let r = gb.resize_with(ViewportSize::new(0, 10), |s| Ok(FakeStorage(s)));
        assert!(matches!(r, Err(RenderError::DegenerateResize(_))));
        assert_eq!(gb.size(), ViewportSize::PLACEHOLDER);
    }

    #[test]
    fn failed_allocation_keeps_previous_storage() {
        let mut gb = set();
        let size = ViewportSize::new(64, 64);
        let r = gb.resize_with(size, |size| {
            Err(RenderError::ResourceExhaustion {
                size,
                reason: "test".into(),
            })
        });
        assert!(r.is_err());
        assert_eq!(gb.size(), ViewportSize::PLACEHOLDER);
        assert_eq!(gb.generation(), 0);
    }

    // ── handles ───────────────────────────────────────────────────────────

    #[test]
    fn writer_finishes_into_reader_of_same_generation() {
        let mut gb = set();
        let writer = gb.begin_write();
        let reader = writer.finish();
        assert_eq!(reader.generation(), 0);
        assert_eq!(*reader.depth_texture(), ViewportSize::PLACEHOLDER);
    }

    #[test]
    fn attachment_index_lookup() {
        let gb = set();
        let reader = gb.read();
        assert!(reader.attachment_texture_at(2).is_some());
        assert!(reader.attachment_texture_at(3).is_none());
        assert_eq!(ColorAttachment::from_index(1), Some(ColorAttachment::NormalEmissive));
    }
}
