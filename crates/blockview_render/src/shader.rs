//! Shader compilation and pipeline setup.
//!
//! Each stage is compiled on its own inside a validation error scope so a
//! failure reports which stage broke and the compiler's diagnostics. The
//! pipeline ("link" step) is checked the same way after both stages exist.

use std::fmt;

use blockview_core::Vertex;
use thiserror::Error;

/// Built-in model shaders.
pub const MODEL_VERTEX_SHADER: &str = include_str!("shaders/model_vert.wgsl");
pub const MODEL_FRAGMENT_SHADER: &str = include_str!("shaders/model_frag.wgsl");

/// Depth format shared by the pipeline and the session's depth buffer.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Shader compile or link failure, carrying the diagnostic log.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("{stage} shader failed to compile:\n{log}")]
    Stage { stage: ShaderStage, log: String },

    #[error("render pipeline failed to link:\n{log}")]
    Link { log: String },
}

pub type CompileResult<T> = Result<T, CompileError>;

/// GPU vertex buffer layout for a vertex type.
pub trait VertexLayout {
    fn desc<'a>() -> wgpu::VertexBufferLayout<'a>;
}

const VERTEX_ATTRIBS: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2, 2 => Float32x3];

impl VertexLayout for Vertex {
    fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &VERTEX_ATTRIBS,
        }
    }
}

/// A linked program: the render pipeline plus the layouts of its bind groups.
pub struct ShaderProgram {
    pub pipeline: wgpu::RenderPipeline,
    /// Group 0: camera uniform.
    pub camera_layout: wgpu::BindGroupLayout,
    /// Group 1: atlas texture and sampler.
    pub texture_layout: wgpu::BindGroupLayout,
}

impl ShaderProgram {
    /// Compile both stages and link them into a pipeline targeting `format`.
    pub fn compile(
        device: &wgpu::Device,
        vertex_src: &str,
        fragment_src: &str,
        format: wgpu::TextureFormat,
    ) -> CompileResult<Self> {
        let vertex = compile_stage(device, ShaderStage::Vertex, vertex_src)?;
        let fragment = compile_stage(device, ShaderStage::Fragment, fragment_src)?;

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Camera Bind Group Layout"),
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

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Atlas Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Model Pipeline Layout"),
            bind_group_layouts: &[&camera_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Model Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex,
                entry_point: "vs_main",
                buffers: &[Vertex::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            let log = error.to_string();
            log::error!("Pipeline link failed: {}", log);
            return Err(CompileError::Link { log });
        }

        log::info!("Model pipeline linked");

        Ok(Self {
            pipeline,
            camera_layout,
            texture_layout,
        })
    }
}

fn compile_stage(
    device: &wgpu::Device,
    stage: ShaderStage,
    source: &str,
) -> CompileResult<wgpu::ShaderModule> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(match stage {
            ShaderStage::Vertex => "Model Vertex Shader",
            ShaderStage::Fragment => "Model Fragment Shader",
        }),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(error) => {
            let log = error.to_string();
            log::error!("{} shader failed to compile: {}", stage, log);
            Err(CompileError::Stage { stage, log })
        }
        None => Ok(module),
    }
}
