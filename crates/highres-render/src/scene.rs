//! Flat-colored triangle scenes.

use glam::{Vec3, Vec4};

/// A vertex as uploaded to the GPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4];

    /// Vertex buffer layout matching `flat_color.wgsl`.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// A single-color triangle mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    pub color: Vec4,
}

impl Mesh {
    #[must_use]
    pub fn new(positions: Vec<Vec3>, triangles: Vec<[u32; 3]>, color: Vec4) -> Self {
        Self {
            positions,
            triangles,
            color,
        }
    }

    /// Number of triangles whose indices all reference existing vertices.
    pub fn valid_triangle_count(&self) -> usize {
        self.valid_triangles().count()
    }

    fn valid_triangles(&self) -> impl Iterator<Item = &[u32; 3]> {
        let count = self.positions.len();
        self.triangles
            .iter()
            .filter(move |tri| tri.iter().all(|&i| (i as usize) < count))
    }
}

/// Everything drawn into a capture target.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// Clear color, linear RGBA.
    pub background: Vec4,
    meshes: Vec<Mesh>,
}

impl Scene {
    #[must_use]
    pub fn new(background: Vec4) -> Self {
        Self {
            background,
            meshes: Vec::new(),
        }
    }

    /// Adds a mesh. Triangles with out-of-range indices are skipped when drawing.
    pub fn add_mesh(&mut self, mesh: Mesh) {
        if mesh.valid_triangle_count() != mesh.triangles.len() {
            log::warn!(
                "Mesh has {} triangle(s) with out-of-range indices; they will not be drawn",
                mesh.triangles.len() - mesh.valid_triangle_count()
            );
        }
        self.meshes.push(mesh);
    }

    /// Adds a quad with corners in counter-clockwise order.
    pub fn add_quad(&mut self, corners: [Vec3; 4], color: Vec4) {
        self.add_mesh(Mesh::new(
            corners.to_vec(),
            vec![[0, 1, 2], [0, 2, 3]],
            color,
        ));
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    /// Flattens every mesh into a non-indexed vertex list.
    pub fn vertices(&self) -> Vec<Vertex> {
        self.meshes
            .iter()
            .flat_map(|mesh| {
                let color = mesh.color.to_array();
                mesh.valid_triangles()
                    .flat_map(|tri| tri.iter())
                    .map(move |&i| Vertex {
                        position: mesh.positions[i as usize].to_array(),
                        color,
                    })
            })
            .collect()
    }

    pub(crate) fn clear_color(&self) -> wgpu::Color {
        wgpu::Color {
            r: f64::from(self.background.x),
            g: f64::from(self.background.y),
            b: f64::from(self.background.z),
            a: f64::from(self.background.w),
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(Vec4::new(0.0, 0.0, 0.0, 1.0))
    }
}
