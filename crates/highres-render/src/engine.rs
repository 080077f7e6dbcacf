//! Headless wgpu render engine.

use highres_core::{CaptureRenderer, DepthLinearization, PixelBuffer, TargetOptions, Viewport};
use pollster::FutureExt;
use wgpu::util::DeviceExt;

use crate::camera::Camera;
use crate::depth_pass::DepthLinearizePass;
use crate::error::{RenderError, RenderResult};
use crate::pipeline::FlatColorPipelines;
use crate::readback::read_texture_region;
use crate::scene::Scene;
use crate::target::OffscreenTarget;

/// A wgpu device without a surface that renders scenes into offscreen targets.
pub struct HeadlessEngine {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_info: wgpu::AdapterInfo,
    viewport: Viewport,
    flat_pipelines: FlatColorPipelines,
    depth_pass: DepthLinearizePass,
    next_target_id: u64,
}

impl HeadlessEngine {
    /// Creates a new headless render engine with a `width` x `height` viewport.
    pub async fn new(width: u32, height: u32) -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;

        // Large captures need the adapter's full texture and buffer limits.
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("highres device (headless)"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        let adapter_info = adapter.get_info();
        log::info!(
            "Headless engine on {} ({:?}), max texture {}",
            adapter_info.name,
            adapter_info.backend,
            device.limits().max_texture_dimension_2d
        );

        let (flat_pipelines, depth_pass) = with_error_scopes(&device, || {
            (
                FlatColorPipelines::new(&device),
                DepthLinearizePass::new(&device),
            )
        })?;

        Ok(Self {
            device,
            queue,
            adapter_info,
            viewport: Viewport::new(width, height, 1.0),
            flat_pipelines,
            depth_pass,
            next_target_id: 0,
        })
    }

    /// Returns the wgpu device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns the wgpu queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    /// Renders `scene` at the viewport's drawing buffer size and reads it back.
    ///
    /// The temporary target is released before returning.
    pub fn render_view(&mut self, scene: &Scene, camera: &Camera) -> RenderResult<PixelBuffer> {
        let (width, height) = self.viewport.drawing_buffer_size();
        let target = self.create_render_target(width, height, &TargetOptions::color())?;
        let result = self
            .render_into(scene, camera, &target)
            .and_then(|()| self.read_pixels(&target, 0, 0, width, height));
        self.dispose_target(target);
        result
    }

    fn scoped<T>(&self, f: impl FnOnce() -> T) -> RenderResult<T> {
        with_error_scopes(&self.device, f)
    }

    fn draw_scene(&self, scene: &Scene, camera: &Camera, target: &OffscreenTarget) {
        let vertices = scene.vertices();
        let vertex_buffer = (!vertices.is_empty()).then(|| {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("capture vertex buffer"),
                    contents: bytemuck::cast_slice(&vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                })
        });
        let camera_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("capture camera uniforms"),
                contents: bytemuck::cast_slice(&[camera.uniforms()]),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let camera_bind_group = self
            .flat_pipelines
            .create_camera_bind_group(&self.device, &camera_buffer);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("capture render encoder"),
            });
        {
            let depth_stencil_attachment =
                target
                    .depth()
                    .map(|depth| wgpu::RenderPassDepthStencilAttachment {
                        view: &depth.view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: depth.has_stencil().then_some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(0),
                            store: wgpu::StoreOp::Store,
                        }),
                    });
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Capture Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.color_view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(scene.clear_color()),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment,
                ..Default::default()
            });

            if let (Some(buffer), Some(pipeline)) = (
                &vertex_buffer,
                self.flat_pipelines.get(target.depth_format()),
            ) {
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &camera_bind_group, &[]);
                render_pass.set_vertex_buffer(0, buffer.slice(..));
                render_pass.draw(0..vertices.len() as u32, 0..1);
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

/// Runs `f` with validation and out-of-memory errors captured instead of
/// reaching the uncaptured error handler.
fn with_error_scopes<T>(device: &wgpu::Device, f: impl FnOnce() -> T) -> RenderResult<T> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = f();
    let validation = device.pop_error_scope().block_on();
    let out_of_memory = device.pop_error_scope().block_on();
    match validation.or(out_of_memory) {
        Some(err) => Err(RenderError::Gpu(err.to_string())),
        None => Ok(value),
    }
}

impl CaptureRenderer for HeadlessEngine {
    type Scene = Scene;
    type Camera = Camera;
    type Target = OffscreenTarget;
    type Error = RenderError;

    fn max_texture_size(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport.width = width;
        self.viewport.height = height;
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        self.viewport.pixel_ratio = ratio;
    }

    fn create_render_target(
        &mut self,
        width: u32,
        height: u32,
        options: &TargetOptions,
    ) -> RenderResult<OffscreenTarget> {
        let max = self.max_texture_size();
        if width == 0 || height == 0 || width > max || height > max {
            return Err(RenderError::TargetTooLarge { width, height, max });
        }
        let id = self.next_target_id;
        self.next_target_id += 1;
        let target =
            self.scoped(|| OffscreenTarget::new(&self.device, id, width, height, options))?;
        log::debug!("Created offscreen target {id} ({width}x{height})");
        Ok(target)
    }

    fn dispose_target(&mut self, target: OffscreenTarget) {
        log::debug!("Destroying offscreen target {}", target.id());
        target.destroy();
    }

    fn render_into(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        target: &OffscreenTarget,
    ) -> RenderResult<()> {
        self.scoped(|| self.draw_scene(scene, camera, target))
    }

    fn post_process_depth(
        &mut self,
        source: &OffscreenTarget,
        params: DepthLinearization,
        dest: &OffscreenTarget,
    ) -> RenderResult<()> {
        let depth = source
            .depth()
            .filter(|depth| depth.sampleable)
            .ok_or_else(|| {
                RenderError::UnsupportedTarget(format!(
                    "target {} has no sampleable depth texture",
                    source.id()
                ))
            })?;
        if source.size() != dest.size() {
            return Err(RenderError::UnsupportedTarget(format!(
                "depth source {:?} and destination {:?} differ in size",
                source.size(),
                dest.size()
            )));
        }

        self.depth_pass.update_uniforms(&self.queue, params);
        self.scoped(|| {
            let bind_group = self.depth_pass.create_bind_group(&self.device, &depth.view);
            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("depth linearize encoder"),
                });
            self.depth_pass
                .render(&mut encoder, dest.color_view(), &bind_group);
            self.queue.submit(std::iter::once(encoder.finish()));
        })
    }

    fn read_pixels(
        &mut self,
        target: &OffscreenTarget,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> RenderResult<PixelBuffer> {
        let (target_width, target_height) = target.size();
        if x + width > target_width || y + height > target_height {
            return Err(RenderError::RegionOutOfBounds {
                x,
                y,
                width,
                height,
                target_width,
                target_height,
            });
        }
        // `y` counts from the bottom edge; texture rows count from the top.
        let top = target_height - y - height;
        read_texture_region(
            &self.device,
            &self.queue,
            target.color_texture(),
            x,
            top,
            width,
            height,
        )
    }
}
