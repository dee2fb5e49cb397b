//! 带状态追踪的渲染通道
//!
//! 避免冗余的状态切换调用

use crate::assets::MeshHandle;

pub struct TrackedRenderPass<'a> {
    pass: wgpu::RenderPass<'a>,
    current_pipeline: Option<usize>,
    current_stencil_reference: Option<u32>,
    current_mesh: Option<MeshHandle>,
}

impl<'a> TrackedRenderPass<'a> {
    #[must_use]
    pub fn new(pass: wgpu::RenderPass<'a>) -> Self {
        Self {
            pass,
            current_pipeline: None,
            current_stencil_reference: None,
            current_mesh: None,
        }
    }

    pub fn set_pipeline(&mut self, index: usize, pipeline: &wgpu::RenderPipeline) {
        if self.current_pipeline != Some(index) {
            self.pass.set_pipeline(pipeline);
            self.current_pipeline = Some(index);
        }
    }

    pub fn set_stencil_reference(&mut self, reference: u32) {
        if self.current_stencil_reference != Some(reference) {
            self.pass.set_stencil_reference(reference);
            self.current_stencil_reference = Some(reference);
        }
    }

    /// Uniforms change with every draw, so group 0 is always rebound.
    pub fn set_uniforms(&mut self, bind_group: &wgpu::BindGroup, offset: u32) {
        self.pass.set_bind_group(0, bind_group, &[offset]);
    }

    pub fn set_textures(&mut self, bind_group: &wgpu::BindGroup) {
        self.pass.set_bind_group(1, bind_group, &[]);
    }

    pub fn set_mesh(
        &mut self,
        handle: MeshHandle,
        vertices: wgpu::BufferSlice<'_>,
        indices: wgpu::BufferSlice<'_>,
    ) {
        if self.current_mesh != Some(handle) {
            self.pass.set_vertex_buffer(0, vertices);
            self.pass.set_index_buffer(indices, wgpu::IndexFormat::Uint32);
            self.current_mesh = Some(handle);
        }
    }

    pub fn draw_indexed(&mut self, index_count: u32) {
        self.pass.draw_indexed(0..index_count, 0, 0..1);
    }
}
