//! Geometry building: model elements to indexed triangle buffers.
//!
//! Each element computes its 8 (rotated) corners once. Every present face
//! then emits its own 4 vertices, because faces carry independent textures
//! and UV rectangles, plus 6 `u16` indices. Output is deterministic for a
//! given model; faces are emitted in `FaceDir::ALL` order.

use blockview_math::{Aabb, Quat, Vec3};
use thiserror::Error;

use crate::model::{Axis, Element, Face, FaceDir, Model, Rotation};

/// Vertices addressable by a `u16` index buffer.
pub const MAX_VERTICES: usize = u16::MAX as usize + 1;

/// Errors that can occur while building geometry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("model needs {required} vertices, at most {MAX_VERTICES} fit a 16-bit index buffer")]
    TooManyVertices { required: usize },
}

pub type GeometryResult<T> = Result<T, GeometryError>;

/// Vertex layout shared with the GPU.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

/// A rectangle in texture space, `(u0, v0)` top-left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UvRect {
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

impl UvRect {
    pub const FULL: UvRect = UvRect {
        u0: 0.0,
        v0: 0.0,
        u1: 1.0,
        v1: 1.0,
    };

    /// Map a coordinate from `[0,1]` space into this rectangle.
    pub fn map(&self, uv: [f32; 2]) -> [f32; 2] {
        [
            self.u0 + uv[0] * (self.u1 - self.u0),
            self.v0 + uv[1] * (self.v1 - self.v0),
        ]
    }
}

/// Which texture a run of four vertices samples.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceAssignment {
    pub element: usize,
    pub dir: FaceDir,
    pub texture: String,
    pub first_vertex: u32,
    pub first_index: u32,
}

/// Built buffers for one model.
#[derive(Clone, Debug)]
pub struct ModelMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
    pub faces: Vec<FaceAssignment>,
    pub bounds: Aabb,
}

impl ModelMesh {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Distinct face textures in first-appearance order.
    pub fn textures(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for face in &self.faces {
            if !seen.contains(&face.texture.as_str()) {
                seen.push(&face.texture);
            }
        }
        seen
    }

    /// Remap each face's UVs into the rectangle `lookup` returns for its
    /// texture. Faces with no rectangle keep their UVs.
    pub fn remap_face_uvs(&mut self, lookup: impl Fn(&str) -> Option<UvRect>) {
        for face in &self.faces {
            let Some(rect) = lookup(&face.texture) else {
                continue;
            };
            let start = face.first_vertex as usize;
            for vertex in &mut self.vertices[start..start + 4] {
                vertex.tex_coords = rect.map(vertex.tex_coords);
            }
        }
    }
}

/// Build vertex and index buffers for `model`.
pub fn build(model: &Model) -> GeometryResult<ModelMesh> {
    let required = model.face_count() * 4;
    if required > MAX_VERTICES {
        return Err(GeometryError::TooManyVertices { required });
    }

    let mut mesh = ModelMesh {
        vertices: Vec::with_capacity(required),
        indices: Vec::with_capacity(model.face_count() * 6),
        faces: Vec::with_capacity(model.face_count()),
        bounds: Aabb::EMPTY,
    };

    for (index, element) in model.elements.iter().enumerate() {
        if element.faces.is_empty() {
            continue;
        }
        let transform = ElementTransform::new(element.rotation.as_ref());
        let corners = element_corners(element, &transform);

        for (dir, face) in element.faces.iter() {
            emit_face(&mut mesh, index, dir, face, &corners, &transform);
        }
    }

    mesh.bounds = Aabb::enclosing(mesh.vertices.iter().map(|v| Vec3::from_array(v.position)));

    log::debug!(
        "Built {} vertices, {} indices for {} faces",
        mesh.vertices.len(),
        mesh.indices.len(),
        mesh.faces.len()
    );

    Ok(mesh)
}

/// Rotation (and optional rescale) of one element about its origin.
struct ElementTransform {
    origin: Vec3,
    rotation: Quat,
    scale: Vec3,
}

impl ElementTransform {
    fn new(rotation: Option<&Rotation>) -> Self {
        let Some(rotation) = rotation else {
            return Self {
                origin: Vec3::ZERO,
                rotation: Quat::IDENTITY,
                scale: Vec3::ONE,
            };
        };

        let axis = match rotation.axis {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        };
        let radians = rotation.angle.to_radians();

        let mut scale = Vec3::ONE;
        if rotation.rescale {
            let cos = radians.cos();
            if cos.abs() > f32::EPSILON {
                // Stretch the plane of rotation back to the unrotated extent.
                scale = (Vec3::ONE - axis) / cos.abs() + axis;
            }
        }

        Self {
            origin: Vec3::from_array(rotation.origin),
            rotation: Quat::from_axis_angle(axis, radians),
            scale,
        }
    }

    fn point(&self, p: Vec3) -> Vec3 {
        self.origin + self.rotation * ((p - self.origin) * self.scale)
    }

    fn normal(&self, n: Vec3) -> Vec3 {
        (self.rotation * n).normalize_or_zero()
    }
}

/// Corner `i` has x from bit 0, y from bit 1, z from bit 2 (0 = min, 1 = max).
fn element_corners(element: &Element, transform: &ElementTransform) -> [Vec3; 8] {
    let a = Vec3::from_array(element.from);
    let b = Vec3::from_array(element.to);
    let lo = a.min(b);
    let hi = a.max(b);

    std::array::from_fn(|i| {
        let corner = Vec3::new(
            if i & 1 == 0 { lo.x } else { hi.x },
            if i & 2 == 0 { lo.y } else { hi.y },
            if i & 4 == 0 { lo.z } else { hi.z },
        );
        transform.point(corner)
    })
}

/// Corners of a face as seen from outside: top-left, bottom-left,
/// bottom-right, top-right. Indices into `element_corners`.
fn face_corners(dir: FaceDir) -> [usize; 4] {
    match dir {
        FaceDir::Up => [0b010, 0b110, 0b111, 0b011],
        FaceDir::Down => [0b100, 0b000, 0b001, 0b101],
        FaceDir::North => [0b011, 0b001, 0b000, 0b010],
        FaceDir::South => [0b110, 0b100, 0b101, 0b111],
        FaceDir::East => [0b111, 0b101, 0b001, 0b011],
        FaceDir::West => [0b010, 0b000, 0b100, 0b110],
    }
}

fn emit_face(
    mesh: &mut ModelMesh,
    element: usize,
    dir: FaceDir,
    face: &Face,
    corners: &[Vec3; 8],
    transform: &ElementTransform,
) {
    let [u0, v0, u1, v1] = face.uv_or_default();
    let uvs = [[u0, v0], [u0, v1], [u1, v1], [u1, v0]];
    let normal = transform
        .normal(Vec3::from_array(dir.normal()))
        .to_array();

    let first_vertex = mesh.vertices.len() as u32;
    let first_index = mesh.indices.len() as u32;

    for (corner, tex_coords) in face_corners(dir).into_iter().zip(uvs) {
        mesh.vertices.push(Vertex {
            position: corners[corner].to_array(),
            tex_coords,
            normal,
        });
    }

    // Two counter-clockwise triangles: TL-BL-BR, TL-BR-TR
    let base = first_vertex as u16;
    mesh.indices
        .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);

    mesh.faces.push(FaceAssignment {
        element,
        dir,
        texture: face.texture.clone(),
        first_vertex,
        first_index,
    });
}
