//! Offscreen render targets.

use highres_core::{DepthAttachment, TargetOptions, TextureFilter};

/// Color format of every offscreen target.
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Depth format for `attachment`, or `None` when the target has no depth.
pub fn depth_format(attachment: DepthAttachment, stencil: bool) -> Option<wgpu::TextureFormat> {
    match attachment {
        DepthAttachment::None => None,
        DepthAttachment::Buffer if stencil => Some(wgpu::TextureFormat::Depth24PlusStencil8),
        DepthAttachment::Buffer => Some(wgpu::TextureFormat::Depth32Float),
        DepthAttachment::Texture16 => Some(wgpu::TextureFormat::Depth16Unorm),
    }
}

/// Depth attachment of an offscreen target.
pub struct DepthTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    /// Whether the texture can be bound for sampling.
    pub sampleable: bool,
}

impl DepthTexture {
    /// Whether the stencil aspect must be cleared along with depth.
    pub fn has_stencil(&self) -> bool {
        self.format.has_stencil_aspect()
    }
}

/// GPU-side color and depth textures a capture renders into.
pub struct OffscreenTarget {
    id: u64,
    width: u32,
    height: u32,
    filter: TextureFilter,
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth: Option<DepthTexture>,
}

impl OffscreenTarget {
    /// Allocates a `width` x `height` target on `device`.
    pub fn new(
        device: &wgpu::Device,
        id: u64,
        width: u32,
        height: u32,
        options: &TargetOptions,
    ) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("capture color texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());

        let depth = depth_format(options.depth, options.stencil).map(|format| {
            let sampleable = options.depth == DepthAttachment::Texture16;
            let mut usage = wgpu::TextureUsages::RENDER_ATTACHMENT;
            if sampleable {
                usage |= wgpu::TextureUsages::TEXTURE_BINDING;
            }
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("capture depth texture"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            DepthTexture {
                texture,
                view,
                format,
                sampleable,
            }
        });

        Self {
            id,
            width,
            height,
            filter: options.filter,
            color,
            color_view,
            depth,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Filter used when this target is sampled by a later pass.
    pub fn filter(&self) -> TextureFilter {
        self.filter
    }

    pub fn color_texture(&self) -> &wgpu::Texture {
        &self.color
    }

    pub fn color_view(&self) -> &wgpu::TextureView {
        &self.color_view
    }

    pub fn depth(&self) -> Option<&DepthTexture> {
        self.depth.as_ref()
    }

    pub fn depth_format(&self) -> Option<wgpu::TextureFormat> {
        self.depth.as_ref().map(|depth| depth.format)
    }

    /// Releases the GPU memory held by this target.
    pub fn destroy(self) {
        self.color.destroy();
        if let Some(depth) = self.depth {
            depth.texture.destroy();
        }
    }
}

impl std::fmt::Debug for OffscreenTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffscreenTarget")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("depth", &self.depth_format())
            .finish_non_exhaustive()
    }
}
