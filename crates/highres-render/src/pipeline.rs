//! Render pipelines for scene geometry.

use crate::scene::Vertex;
use crate::target::COLOR_FORMAT;

/// Depth formats an offscreen target can carry.
pub const DEPTH_FORMATS: [Option<wgpu::TextureFormat>; 4] = [
    None,
    Some(wgpu::TextureFormat::Depth32Float),
    Some(wgpu::TextureFormat::Depth24PlusStencil8),
    Some(wgpu::TextureFormat::Depth16Unorm),
];

/// Flat-color pipelines, one per supported depth format.
pub struct FlatColorPipelines {
    camera_layout: wgpu::BindGroupLayout,
    pipelines: Vec<(Option<wgpu::TextureFormat>, wgpu::RenderPipeline)>,
}

impl FlatColorPipelines {
    /// Creates the pipelines.
    pub fn new(device: &wgpu::Device) -> Self {
        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Flat Color Camera Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Flat Color Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/flat_color.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Flat Color Pipeline Layout"),
            bind_group_layouts: &[&camera_layout],
            push_constant_ranges: &[],
        });

        let pipelines = DEPTH_FORMATS
            .iter()
            .map(|&depth_format| {
                let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some("Flat Color Pipeline"),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &shader,
                        entry_point: Some("vs_main"),
                        buffers: &[Vertex::layout()],
                        compilation_options: Default::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &shader,
                        entry_point: Some("fs_main"),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: COLOR_FORMAT,
                            blend: None,
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: Default::default(),
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        cull_mode: None,
                        ..Default::default()
                    },
                    depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
                        format,
                        depth_write_enabled: true,
                        depth_compare: wgpu::CompareFunction::Less,
                        stencil: wgpu::StencilState::default(),
                        bias: wgpu::DepthBiasState::default(),
                    }),
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                });
                (depth_format, pipeline)
            })
            .collect();

        Self {
            camera_layout,
            pipelines,
        }
    }

    /// Pipeline for targets with `depth_format`.
    pub fn get(&self, depth_format: Option<wgpu::TextureFormat>) -> Option<&wgpu::RenderPipeline> {
        self.pipelines
            .iter()
            .find(|(format, _)| *format == depth_format)
            .map(|(_, pipeline)| pipeline)
    }

    /// Creates the camera bind group for one pass.
    pub fn create_camera_bind_group(
        &self,
        device: &wgpu::Device,
        camera_buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Flat Color Camera Bind Group"),
            layout: &self.camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        })
    }
}
