//! wgpu renderer for the character rig

use anyhow::{Context, Result};
use glam::{Mat3, Mat4, Vec3};
use std::iter;
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

use super::mesh::{DrawRange, MeshVertex, RigMeshes};
use crate::rig::{Color, Material, RigTree};
use crate::scene::{Camera, LightingConfig, Scene};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Camera uniform data
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct CameraUniform {
    view_proj: [[f32; 4]; 4],
    /// World-space eye position (w unused)
    position: [f32; 4],
}

impl CameraUniform {
    fn new(camera: &Camera, aspect: f32) -> Self {
        Self {
            view_proj: camera.view_projection(aspect).to_cols_array_2d(),
            position: camera.position.extend(1.0).to_array(),
        }
    }
}

/// Light uniform data. Colors are linear and premultiplied by intensity
/// except where noted.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct LightsUniform {
    ambient: [f32; 4],
    spot_position: [f32; 4],
    /// Normalized aim direction
    spot_direction: [f32; 4],
    spot_color: [f32; 4],
    /// x = cos(inner edge), y = cos(outer edge)
    spot_cone: [f32; 4],
    point_position: [f32; 4],
    point_color: [f32; 4],
}

fn linear(color: Color, intensity: f32) -> [f32; 4] {
    let [r, g, b] = color.to_linear();
    [r * intensity, g * intensity, b * intensity, 1.0]
}

impl LightsUniform {
    fn new(lights: &LightingConfig) -> Self {
        let spot = &lights.spot;
        let direction = (spot.target - spot.position)
            .try_normalize()
            .unwrap_or(Vec3::NEG_Y);
        let (inner, outer) = spot.cone_cosines();
        // Keep the smoothstep edges apart for a hard-edged cone
        let inner = inner.max(outer + 1e-4);

        Self {
            ambient: linear(lights.ambient.color, lights.ambient.intensity),
            spot_position: spot.position.extend(1.0).to_array(),
            spot_direction: direction.extend(0.0).to_array(),
            spot_color: linear(spot.color, spot.intensity),
            spot_cone: [inner, outer, 0.0, 0.0],
            point_position: lights.point.position.extend(1.0).to_array(),
            point_color: linear(lights.point.color, lights.point.intensity),
        }
    }
}

/// Per-node instance data
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct InstanceRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
    /// Linear rgb, a = opacity
    color: [f32; 4],
    /// Linear rgb scaled by intensity (w unused)
    emissive: [f32; 4],
}

impl InstanceRaw {
    const ATTRIBS: [wgpu::VertexAttribute; 9] = wgpu::vertex_attr_array![
        2 => Float32x4,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x3,
        7 => Float32x3,
        8 => Float32x3,
        9 => Float32x4,
        10 => Float32x4,
    ];

    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBS,
        }
    }

    fn new(model: Mat4, material: &Material) -> Self {
        let normal = {
            let m = Mat3::from_mat4(model);
            if m.determinant().abs() > f32::EPSILON {
                m.inverse().transpose()
            } else {
                Mat3::IDENTITY
            }
        };
        let [r, g, b] = material.color.to_linear();
        let emissive = material
            .emissive
            .map(|e| linear(e.color, e.intensity))
            .unwrap_or([0.0; 4]);

        Self {
            model: model.to_cols_array_2d(),
            normal: normal.to_cols_array_2d(),
            color: [r, g, b, material.alpha()],
            emissive,
        }
    }
}

/// Whether a frame made it to the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Presented,
    /// Surface was lost, outdated or busy; it has been reconfigured if needed
    Skipped,
}

pub struct Renderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,

    opaque_pipeline: wgpu::RenderPipeline,
    translucent_pipeline: wgpu::RenderPipeline,

    // Rig geometry, uploaded once
    meshes: RigMeshes,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    instances: Vec<InstanceRaw>,
    world_matrices: Vec<Mat4>,

    depth_view: wgpu::TextureView,

    camera_buffer: wgpu::Buffer,
    lights_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,

    clear_color: wgpu::Color,
}

impl Renderer {
    pub async fn new(window: Arc<Window>, scene: &Scene) -> Result<Self> {
        let size = window.inner_size();
        let transparent = scene.config().background_transparent;

        // Create instance
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // The surface holds its own handle to the window
        let surface = instance
            .create_surface(window)
            .context("failed to create surface")?;

        // Request adapter
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible GPU adapter")?;

        // Create device and queue
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                label: Some("device"),
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create device")?;

        // Configure surface
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let alpha_mode = if transparent {
            pick_transparent_alpha_mode(&surface_caps.alpha_modes)
        } else {
            surface_caps.alpha_modes[0]
        };
        log::info!(
            "surface: {:?} {}x{} alpha={:?}",
            surface_format,
            size.width,
            size.height,
            alpha_mode
        );

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_view = create_depth_view(&device, config.width, config.height);

        // Uniforms
        let aspect = config.width as f32 / config.height as f32;
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("camera_buffer"),
            contents: bytemuck::cast_slice(&[CameraUniform::new(scene.camera(), aspect)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let lights_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lights_buffer"),
            contents: bytemuck::cast_slice(&[LightsUniform::new(scene.lighting())]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let scene_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("scene_bind_group_layout"),
                entries: &[uniform_entry(0), uniform_entry(1)],
            });
        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene_bind_group"),
            layout: &scene_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lights_buffer.as_entire_binding(),
                },
            ],
        });

        // Shader
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        // Pipeline layout
        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("render_pipeline_layout"),
                bind_group_layouts: &[&scene_bind_group_layout],
                push_constant_ranges: &[],
            });

        let opaque_pipeline = create_pipeline(
            &device,
            &render_pipeline_layout,
            &shader,
            config.format,
            PassKind::Opaque,
        );
        let translucent_pipeline = create_pipeline(
            &device,
            &render_pipeline_layout,
            &shader,
            config.format,
            PassKind::Translucent,
        );

        // Geometry
        let meshes = RigMeshes::build(scene.rig());
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("vertex_buffer"),
            contents: bytemuck::cast_slice(&meshes.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("index_buffer"),
            contents: bytemuck::cast_slice(&meshes.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("instance_buffer"),
            size: (meshes.draws.len().max(1) * std::mem::size_of::<InstanceRaw>())
                as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let clear_color = if transparent {
            wgpu::Color::TRANSPARENT
        } else {
            let [r, g, b] = scene.config().clear_color.to_linear();
            wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: 1.0,
            }
        };

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            opaque_pipeline,
            translucent_pipeline,
            instances: Vec::with_capacity(meshes.draws.len()),
            world_matrices: Vec::with_capacity(scene.rig().len()),
            meshes,
            vertex_buffer,
            index_buffer,
            instance_buffer,
            depth_view,
            camera_buffer,
            lights_buffer,
            scene_bind_group,
            clear_color,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.size = winit::dpi::PhysicalSize::new(width, height);
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, width, height);
        }
    }

    pub fn size(&self) -> winit::dpi::PhysicalSize<u32> {
        self.size
    }

    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height as f32
    }

    /// Draw the scene's current pose.
    ///
    /// Lost or outdated surfaces are reconfigured and the frame is skipped;
    /// running out of GPU memory is an error.
    pub fn render(&mut self, scene: &Scene) -> Result<FrameStatus> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(e @ wgpu::SurfaceError::OutOfMemory) => {
                return Err(e).context("surface out of memory");
            }
            Err(e) => {
                log::warn!("skipping frame: {}", e);
                if matches!(e, wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) {
                    self.surface.configure(&self.device, &self.config);
                }
                return Ok(FrameStatus::Skipped);
            }
        };

        self.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[CameraUniform::new(scene.camera(), self.aspect())]),
        );
        self.queue.write_buffer(
            &self.lights_buffer,
            0,
            bytemuck::cast_slice(&[LightsUniform::new(scene.lighting())]),
        );

        let translucent = self.update_instances(scene.rig(), scene.camera().position);
        self.queue.write_buffer(
            &self.instance_buffer,
            0,
            bytemuck::cast_slice(&self.instances),
        );

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("render_encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("rig_render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            render_pass.set_bind_group(0, &self.scene_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

            // Instances are laid out opaque first, then translucent back to front
            let opaque = self.instances.len() - translucent.len();
            render_pass.set_pipeline(&self.opaque_pipeline);
            for (i, draw) in self.meshes.opaque().enumerate() {
                render_pass.draw_indexed(draw.indices.clone(), draw.base_vertex, i as u32..i as u32 + 1);
            }

            render_pass.set_pipeline(&self.translucent_pipeline);
            for (i, draw) in translucent.iter().enumerate() {
                let instance = (opaque + i) as u32;
                render_pass.draw_indexed(draw.indices.clone(), draw.base_vertex, instance..instance + 1);
            }
        }

        self.queue.submit(iter::once(encoder.finish()));
        output.present();

        Ok(FrameStatus::Presented)
    }

    /// Refresh instance data from the rig pose. Returns the translucent draws
    /// in the order their instances were written.
    fn update_instances(&mut self, rig: &RigTree, eye: Vec3) -> Vec<DrawRange> {
        rig.write_world_matrices(&mut self.world_matrices);
        self.instances.clear();

        for draw in self.meshes.opaque() {
            self.instances
                .push(InstanceRaw::new(self.world_matrices[draw.node.index()], &draw.material));
        }

        let mut translucent: Vec<DrawRange> = self.meshes.translucent().cloned().collect();
        let world = &self.world_matrices;
        translucent.sort_by(|a, b| {
            let da = world[a.node.index()].w_axis.truncate().distance_squared(eye);
            let db = world[b.node.index()].w_axis.truncate().distance_squared(eye);
            db.total_cmp(&da)
        });
        for draw in &translucent {
            self.instances
                .push(InstanceRaw::new(self.world_matrices[draw.node.index()], &draw.material));
        }
        translucent
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassKind {
    Opaque,
    Translucent,
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    kind: PassKind,
) -> wgpu::RenderPipeline {
    let (label, blend, depth_write_enabled) = match kind {
        PassKind::Opaque => ("opaque_pipeline", wgpu::BlendState::REPLACE, true),
        PassKind::Translucent => (
            "translucent_pipeline",
            wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
            false,
        ),
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[MeshVertex::desc(), InstanceRaw::desc()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // Open shells (hair, face, ring) are seen from both sides
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        cache: None,
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled,
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
    })
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn pick_transparent_alpha_mode(modes: &[wgpu::CompositeAlphaMode]) -> wgpu::CompositeAlphaMode {
    [
        wgpu::CompositeAlphaMode::PreMultiplied,
        wgpu::CompositeAlphaMode::PostMultiplied,
        wgpu::CompositeAlphaMode::Inherit,
    ]
    .into_iter()
    .find(|mode| modes.contains(mode))
    .unwrap_or_else(|| {
        log::warn!("surface cannot composite with alpha, background will be opaque");
        modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto)
    })
}
