//! Pixel-format configurations exposed to the guest by index.

use crate::host::{HostConfig, RenderableType, SurfaceType};

/// One host framebuffer configuration.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PixelFormatConfig {
    pub host: HostConfig,
    pub renderable_type: RenderableType,
    pub surface_type: SurfaceType,
    /// Red, green, blue, alpha bits.
    pub color_bits: [u8; 4],
    pub depth_bits: u8,
    pub stencil_bits: u8,
}

impl PixelFormatConfig {
    #[inline]
    pub fn supports(&self, api: RenderableType) -> bool {
        self.renderable_type.contains(api)
    }
}

/// Configs in host enumeration order; the guest refers to them by position.
#[derive(Debug, Clone, Default)]
pub struct ConfigList {
    configs: Vec<PixelFormatConfig>,
}

impl ConfigList {
    pub fn new(configs: Vec<PixelFormatConfig>) -> Self {
        Self { configs }
    }

    #[inline]
    pub fn get(&self, id: u32) -> Option<&PixelFormatConfig> {
        self.configs.get(id as usize)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PixelFormatConfig> {
        self.configs.iter()
    }

    /// Number of configs renderable with `api`.
    pub fn count_renderable(&self, api: RenderableType) -> usize {
        self.configs.iter().filter(|c| c.supports(api)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU64;

    fn config(id: u64, renderable_type: RenderableType) -> PixelFormatConfig {
        PixelFormatConfig {
            host: HostConfig(NonZeroU64::new(id).unwrap()),
            renderable_type,
            surface_type: SurfaceType::WINDOW | SurfaceType::PBUFFER,
            color_bits: [8, 8, 8, 8],
            depth_bits: 24,
            stencil_bits: 8,
        }
    }

    #[test]
    fn lookup_is_by_position() {
        let list = ConfigList::new(vec![
            config(10, RenderableType::LEGACY),
            config(20, RenderableType::MODERN),
        ]);
        assert_eq!(list.get(1).unwrap().host.0.get(), 20);
        assert!(list.get(2).is_none());
    }

    #[test]
    fn counts_per_api() {
        let list = ConfigList::new(vec![
            config(1, RenderableType::LEGACY | RenderableType::MODERN),
            config(2, RenderableType::MODERN),
            config(3, RenderableType::MODERN),
        ]);
        assert_eq!(list.count_renderable(RenderableType::LEGACY), 1);
        assert_eq!(list.count_renderable(RenderableType::MODERN), 3);
    }
}
