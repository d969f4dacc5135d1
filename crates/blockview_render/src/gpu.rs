//! wgpu implementation of [`RenderBackend`] drawing into a winit window.

use std::sync::Arc;

use blockview_core::ModelMesh;
use blockview_math::{CameraUniform, OrbitCamera};
use wgpu::util::DeviceExt;
use wgpu::{Device, Instance, Queue, Surface, SurfaceConfiguration};
use winit::window::Window;

use crate::atlas::TextureAtlas;
use crate::session::{RenderBackend, RenderError, RenderResult};
use crate::shader::{ShaderProgram, DEPTH_FORMAT, MODEL_FRAGMENT_SHADER, MODEL_VERTEX_SHADER};

/// Buffers for the model currently on screen.
struct MeshBuffers {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    _atlas: wgpu::Texture,
    atlas_bind_group: wgpu::BindGroup,
}

struct GpuState {
    surface: Surface<'static>,
    device: Device,
    queue: Queue,
    config: SurfaceConfiguration,
    program: ShaderProgram,
    _depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,
    mesh: Option<MeshBuffers>,
}

pub struct WgpuBackend {
    window: Arc<Window>,
    clear_color: wgpu::Color,
    gpu: Option<GpuState>,
}

impl WgpuBackend {
    pub fn new(window: Arc<Window>, clear_color: wgpu::Color) -> Self {
        Self {
            window,
            clear_color,
            gpu: None,
        }
    }

    fn create_depth_texture(
        device: &Device,
        size: (u32, u32),
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());

        (depth_texture, depth_view)
    }

    async fn init(&self, width: u32, height: u32) -> RenderResult<GpuState> {
        let instance = Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(self.window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;
        log::info!("Using adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Model Preview Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(RenderError::NoAdapter)?;

        let config = SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let program = ShaderProgram::compile(
            &device,
            MODEL_VERTEX_SHADER,
            MODEL_FRAGMENT_SHADER,
            config.format,
        )?;

        let (depth_texture, depth_view) =
            Self::create_depth_texture(&device, (config.width, config.height));

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[CameraUniform::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &program.camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        // Block textures are pixel art: no filtering between texels.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Atlas Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        log::info!(
            "Surface configured: {}x{} {:?}",
            config.width,
            config.height,
            config.format
        );

        Ok(GpuState {
            surface,
            device,
            queue,
            config,
            program,
            _depth_texture: depth_texture,
            depth_view,
            camera_buffer,
            camera_bind_group,
            sampler,
            mesh: None,
        })
    }
}

impl GpuState {
    fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
        let size = (self.config.width, self.config.height);
        let (depth_texture, depth_view) = WgpuBackend::create_depth_texture(&self.device, size);
        self._depth_texture = depth_texture;
        self.depth_view = depth_view;
    }

    fn acquire_frame(&mut self) -> RenderResult<wgpu::SurfaceTexture> {
        match self.surface.get_current_texture() {
            Ok(frame) => Ok(frame),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated, reconfiguring");
                self.reconfigure();
                Ok(self.surface.get_current_texture()?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl RenderBackend for WgpuBackend {
    fn setup(&mut self, width: u32, height: u32) -> RenderResult<()> {
        if self.gpu.is_some() {
            return Ok(());
        }
        let state = pollster::block_on(self.init(width, height))?;
        self.gpu = Some(state);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        if width > 0 && height > 0 {
            gpu.config.width = width;
            gpu.config.height = height;
            gpu.reconfigure();
        }
    }

    fn upload(&mut self, mesh: &ModelMesh, atlas: &TextureAtlas) -> RenderResult<()> {
        let gpu = self.gpu.as_mut().ok_or(RenderError::NotReady)?;

        if mesh.is_empty() {
            gpu.mesh = None;
            return Ok(());
        }

        let vertex_buffer = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Model Vertex Buffer"),
            contents: mesh.vertex_bytes(),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Model Index Buffer"),
            contents: mesh.index_bytes(),
            usage: wgpu::BufferUsages::INDEX,
        });

        let size = wgpu::Extent3d {
            width: atlas.width,
            height: atlas.height,
            depth_or_array_layers: 1,
        };
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Model Atlas"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        gpu.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &atlas.rgba,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * atlas.width),
                rows_per_image: Some(atlas.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let atlas_bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Atlas Bind Group"),
            layout: &gpu.program.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&gpu.sampler),
                },
            ],
        });

        // Dropping the previous buffers releases them.
        gpu.mesh = Some(MeshBuffers {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            _atlas: texture,
            atlas_bind_group,
        });
        Ok(())
    }

    fn draw(&mut self, camera: &OrbitCamera) -> RenderResult<u32> {
        let clear_color = self.clear_color;
        let gpu = self.gpu.as_mut().ok_or(RenderError::NotReady)?;

        gpu.queue.write_buffer(
            &gpu.camera_buffer,
            0,
            bytemuck::cast_slice(&[CameraUniform::from_camera(camera)]),
        );

        let output = gpu.acquire_frame()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        let mut draw_calls = 0;
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Model Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &gpu.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_viewport(
                0.0,
                0.0,
                gpu.config.width as f32,
                gpu.config.height as f32,
                0.0,
                1.0,
            );

            if let Some(mesh) = &gpu.mesh {
                render_pass.set_pipeline(&gpu.program.pipeline);
                render_pass.set_bind_group(0, &gpu.camera_bind_group, &[]);
                render_pass.set_bind_group(1, &mesh.atlas_bind_group, &[]);
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass
                    .set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
                draw_calls = 1;
            }
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(draw_calls)
    }

    fn release(&mut self) {
        if self.gpu.take().is_some() {
            log::debug!("GPU resources released");
        }
    }
}
