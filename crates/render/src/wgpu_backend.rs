//! GPU implementation of [`ShapeBufferBackend`] and [`ShapeBinding`] built on [`wgpu`].
//!
//! Shape buffers are storage buffers written through the queue. The binding
//! owns the frame and count uniforms and rebuilds its bind group whenever the
//! packer hands it a new shape buffer. When there are no shapes a one-record
//! placeholder is bound so the bind group stays valid while the count is 0.

use std::sync::Arc;

use anyhow::{Context, Result};
use wgpu::util::DeviceExt;

use crate::backend::ShapeBufferBackend;
use crate::binding::ShapeBinding;
use crate::error::RenderError;
use crate::gpu_types::{FrameUniforms, ShapeCount, ShapeGpu};
use crate::layout::{COUNT_BINDING, FRAME_BINDING, SHAPES_BINDING};

/// Requests a device on the system's default high-performance adapter
/// without a surface.
///
/// # Errors
///
/// Fails when no adapter is available or the device request is refused.
pub fn request_headless_device() -> Result<(Arc<wgpu::Device>, Arc<wgpu::Queue>)> {
    let instance = wgpu::Instance::default();
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        force_fallback_adapter: false,
        compatible_surface: None,
    }))
    .ok_or(anyhow::anyhow!("Failed to find an appropriate adapter"))?;

    let (device, queue) = pollster::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: Some("Raymarch Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults(),
        },
        None,
    ))
    .context("failed to request device")?;

    tracing::info!("Using adapter {:?}", adapter.get_info().name);
    Ok((Arc::new(device), Arc::new(queue)))
}

/// Allocates `_Shapes` storage buffers on a wgpu device.
pub struct WgpuShapeBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl WgpuShapeBackend {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        Self { device, queue }
    }

    /// Creates a backend on a freshly requested headless device.
    ///
    /// # Errors
    ///
    /// See [`request_headless_device`].
    pub fn new_headless() -> Result<Self> {
        let (device, queue) = request_headless_device()?;
        Ok(Self::new(device, queue))
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }
}

impl ShapeBufferBackend for WgpuShapeBackend {
    type Buffer = wgpu::Buffer;

    fn create_buffer(&mut self, label: &str, contents: &[u8]) -> Result<wgpu::Buffer, RenderError> {
        if contents.is_empty() {
            return Err(RenderError::EmptyAllocation);
        }
        let bytes = contents.len() as u64;
        let limit = u64::from(self.device.limits().max_storage_buffer_binding_size);
        if bytes > limit {
            return Err(RenderError::BufferTooLarge { bytes, limit });
        }

        Ok(self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        }))
    }

    fn write_buffer(&mut self, buffer: &mut wgpu::Buffer, offset: u64, bytes: &[u8]) {
        self.queue.write_buffer(buffer, offset, bytes);
    }

    fn release_buffer(&mut self, buffer: wgpu::Buffer) {
        buffer.destroy();
    }

    fn flush(&mut self) {
        self.queue.submit(std::iter::empty());
        let _ = self.device.poll(wgpu::Maintain::Poll);
    }
}

/// Bind group layout of group 0: frame uniforms, shape count, shape records.
pub fn shape_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let uniform = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT | wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    };

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("raymarch shapes layout"),
        entries: &[
            uniform(FRAME_BINDING),
            uniform(COUNT_BINDING),
            wgpu::BindGroupLayoutEntry {
                binding: SHAPES_BINDING,
                visibility: wgpu::ShaderStages::FRAGMENT | wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    })
}

/// Owns the uniform buffers and the bind group the raymarch pipeline uses.
pub struct WgpuShapeBinding {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    layout: wgpu::BindGroupLayout,
    frame_buffer: wgpu::Buffer,
    count_buffer: wgpu::Buffer,
    placeholder: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl WgpuShapeBinding {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        let layout = shape_bind_group_layout(&device);

        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame Uniforms"),
            contents: bytemuck::bytes_of(&<FrameUniforms as bytemuck::Zeroable>::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let count_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Shape Count"),
            contents: bytemuck::bytes_of(&ShapeCount::new(0)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let placeholder = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Empty Shapes"),
            contents: bytemuck::bytes_of(&<ShapeGpu as bytemuck::Zeroable>::zeroed()),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let bind_group =
            create_bind_group(&device, &layout, &frame_buffer, &count_buffer, &placeholder);

        Self {
            device,
            queue,
            layout,
            frame_buffer,
            count_buffer,
            placeholder,
            bind_group,
        }
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    frame: &wgpu::Buffer,
    count: &wgpu::Buffer,
    shapes: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("raymarch shapes"),
        layout,
        entries: &[
            wgpu::BindGroupEntry { binding: FRAME_BINDING, resource: frame.as_entire_binding() },
            wgpu::BindGroupEntry { binding: COUNT_BINDING, resource: count.as_entire_binding() },
            wgpu::BindGroupEntry { binding: SHAPES_BINDING, resource: shapes.as_entire_binding() },
        ],
    })
}

impl ShapeBinding<wgpu::Buffer> for WgpuShapeBinding {
    fn is_ready(&self) -> bool {
        true
    }

    fn bind_shapes(&mut self, buffer: Option<&wgpu::Buffer>, count: u32) {
        let (storage, count) = match buffer {
            Some(buffer) if count > 0 => (buffer, count),
            _ => (&self.placeholder, 0),
        };
        self.queue
            .write_buffer(&self.count_buffer, 0, bytemuck::bytes_of(&ShapeCount::new(count)));
        self.bind_group = create_bind_group(
            &self.device,
            &self.layout,
            &self.frame_buffer,
            &self.count_buffer,
            storage,
        );
    }

    fn bind_frame(&mut self, uniforms: &FrameUniforms) {
        self.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(uniforms));
    }
}
