//! GPU texture handles for pixel surfaces.
//!
//! The pool owns the free list of texture ids for one rendering session;
//! the actual GPU calls go through a [`TextureDevice`]. Dropping a
//! [`TextureLink`] hands its id back to the pool it came from.

use std::cell::RefCell;
use std::rc::Rc;

use crate::api::{PixelFormat, PixelSurface};
use crate::error::Result;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
    LinearMipmapLinear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureParams {
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub generate_mipmaps: bool,
}

/// Backend that owns the actual texture objects.
pub trait TextureDevice {
    /// Allocates a fresh texture id.
    fn generate(&mut self) -> u32;
    /// Uploads tightly packed BGRA bytes into texture `id`.
    fn upload(&mut self, id: u32, width: u32, height: u32, params: TextureParams, bgra: &[u8])
        -> Result<()>;
    fn delete(&mut self, id: u32);
}

type FreeList = Rc<RefCell<Vec<u32>>>;

/// A texture id paired with the size and filters it was uploaded with.
#[derive(Debug)]
pub struct TextureLink {
    id: u32,
    width: u32,
    height: u32,
    params: TextureParams,
    freed: FreeList,
}

impl TextureLink {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn params(&self) -> TextureParams {
        self.params
    }
}

impl Drop for TextureLink {
    fn drop(&mut self) {
        self.freed.borrow_mut().push(self.id);
    }
}

#[derive(Debug, Default)]
pub struct TexturePool {
    freed: FreeList,
    total: usize,
}

impl TexturePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids generated on the device and not yet deleted.
    pub fn total_textures(&self) -> usize {
        self.total
    }

    /// Ids of dropped links, waiting for reuse or deletion.
    pub fn freed_textures(&self) -> Vec<u32> {
        self.freed.borrow().clone()
    }

    /// Uploads a surface's pixels, reusing the id of a dropped link when one is pooled.
    pub fn create_texture<D, S>(
        &mut self,
        device: &mut D,
        surface: &mut S,
        min_filter: FilterMode,
        mag_filter: FilterMode,
    ) -> Result<TextureLink>
    where
        D: TextureDevice,
        S: PixelSurface,
    {
        let pooled = self.freed.borrow_mut().pop();
        let id = match pooled {
            Some(id) => id,
            None => {
                self.total += 1;
                device.generate()
            }
        };
        let link = TextureLink {
            id,
            width: surface.actual_width(),
            height: surface.actual_height(),
            params: TextureParams {
                min_filter,
                mag_filter,
                generate_mipmaps: min_filter == FilterMode::LinearMipmapLinear,
            },
            freed: Rc::clone(&self.freed),
        };
        Self::upload(device, &link, surface)?;
        log::debug!(
            target: "penumbra",
            "texture {} created ({}x{}, {} pooled)",
            id,
            link.width,
            link.height,
            self.freed.borrow().len()
        );
        Ok(link)
    }

    /// Re-uploads `surface` into an existing texture.
    pub fn update<D, S>(&self, device: &mut D, link: &TextureLink, surface: &mut S) -> Result<()>
    where
        D: TextureDevice,
        S: PixelSurface,
    {
        Self::upload(device, link, surface)
    }

    fn upload<D, S>(device: &mut D, link: &TextureLink, surface: &mut S) -> Result<()>
    where
        D: TextureDevice,
        S: PixelSurface,
    {
        let format = surface.format();
        let lock = surface.lock_memory()?;
        let bgra = to_bgra(&lock, format);
        device.upload(link.id, link.width, link.height, link.params, &bgra)
    }

    /// Deletes every pooled id on the device. Links still alive keep their
    /// textures.
    pub fn release_textures<D: TextureDevice>(&mut self, device: &mut D) {
        let freed = std::mem::take(&mut *self.freed.borrow_mut());
        log::debug!(
            target: "penumbra",
            "deleting {}/{} textures",
            freed.len(),
            self.total
        );
        for id in freed {
            device.delete(id);
            self.total -= 1;
        }
    }
}

fn to_bgra(data: &[u8], format: PixelFormat) -> Vec<u8> {
    let bpp = format.bytes_per_pixel();
    let mut out = Vec::with_capacity(data.len() / bpp * 4);
    for px in data.chunks_exact(bpp) {
        match format {
            PixelFormat::Alpha8 => out.extend_from_slice(&[0, 0, 0, px[0]]),
            PixelFormat::Rgb8 => out.extend_from_slice(&[px[2], px[1], px[0], 255]),
            PixelFormat::Rgba8 => out.extend_from_slice(&[px[2], px[1], px[0], px[3]]),
        }
    }
    out
}
