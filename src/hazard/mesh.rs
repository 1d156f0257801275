//! Procedural spike mesh.
//!
//! A spike is an n-sided pyramid standing on the XZ plane: a flat base fan
//! around vertex 0 and one side triangle per edge meeting at the apex.

use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use bevy::render::render_asset::RenderAssetUsages;
use bevy_rapier3d::prelude::*;
use std::f32::consts::TAU;

pub const MIN_SIDES: u32 = 3;

/// Shape parameters for one spike
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpikeGenerator {
    pub sides: u32,
    pub base_radius: f32,
    pub height: f32,
}

/// Raw vertex and index buffers of a generated spike
#[derive(Debug, Clone, PartialEq)]
pub struct SpikeGeometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl SpikeGenerator {
    pub fn new(sides: u32, base_radius: f32, height: f32) -> Self {
        if sides < MIN_SIDES {
            tracing::warn!("spike needs at least {MIN_SIDES} sides, got {sides}; clamping");
        }
        Self {
            sides: sides.max(MIN_SIDES),
            base_radius,
            height,
        }
    }

    pub fn apex_index(&self) -> u32 {
        self.sides + 1
    }

    pub fn generate(&self) -> SpikeGeometry {
        let sides = self.sides.max(MIN_SIDES);

        let mut positions = Vec::with_capacity(sides as usize + 2);
        positions.push([0.0, 0.0, 0.0]);
        for i in 0..sides {
            let angle = TAU * i as f32 / sides as f32;
            positions.push([
                angle.cos() * self.base_radius,
                0.0,
                angle.sin() * self.base_radius,
            ]);
        }
        positions.push([0.0, self.height, 0.0]);

        let apex = sides + 1;
        let mut indices = Vec::with_capacity(sides as usize * 6);
        for i in 0..sides {
            indices.extend_from_slice(&[0, i + 1, (i + 1) % sides + 1]);
        }
        for i in 0..sides {
            indices.extend_from_slice(&[i + 1, apex, (i + 1) % sides + 1]);
        }

        let normals = vertex_normals(&positions, &indices);
        SpikeGeometry {
            positions,
            normals,
            indices,
        }
    }

    /// Collider matching the spike's silhouette, origin at the base center
    pub fn collider(&self) -> Collider {
        let half_height = self.height * 0.5;
        Collider::compound(vec![(
            Vec3::Y * half_height,
            Quat::IDENTITY,
            Collider::cone(half_height, self.base_radius),
        )])
    }
}

impl SpikeGeometry {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn to_mesh(&self) -> Mesh {
        let mut mesh = Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::default(),
        );
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, self.positions.clone());
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, self.normals.clone());
        mesh.insert_indices(Indices::U32(self.indices.clone()));
        mesh
    }
}

/// Area-weighted per-vertex normals recomputed from the triangle list
fn vertex_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut accum = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let (pa, pb, pc) = (
            Vec3::from(positions[a]),
            Vec3::from(positions[b]),
            Vec3::from(positions[c]),
        );
        // cross product length is twice the area, which is the weight we want
        let face = (pb - pa).cross(pc - pa);
        accum[a] += face;
        accum[b] += face;
        accum[c] += face;
    }
    accum
        .into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y).to_array())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_sides() {
        let geo = SpikeGenerator::new(3, 0.3, 1.0).generate();
        assert_eq!(geo.vertex_count(), 5);
        assert_eq!(geo.indices.len(), 18);
        assert!(geo.indices.iter().all(|&i| i < 5));
    }

    #[test]
    fn test_ten_sides() {
        let geo = SpikeGenerator::new(10, 0.3, 1.0).generate();
        assert_eq!(geo.vertex_count(), 12);
        assert_eq!(geo.indices.len(), 60);
    }

    #[test]
    fn test_layout() {
        let gen = SpikeGenerator::new(4, 2.0, 3.0);
        let geo = gen.generate();
        assert_eq!(geo.positions[0], [0.0, 0.0, 0.0]);
        assert_eq!(geo.positions[gen.apex_index() as usize], [0.0, 3.0, 0.0]);
        // ring point 1 sits on +X
        assert!((geo.positions[1][0] - 2.0).abs() < 1e-6);
        for p in &geo.positions[1..=4] {
            let r = (p[0] * p[0] + p[2] * p[2]).sqrt();
            assert!((r - 2.0).abs() < 1e-5);
            assert_eq!(p[1], 0.0);
        }
    }

    #[test]
    fn test_triangle_order() {
        let geo = SpikeGenerator::new(3, 1.0, 1.0).generate();
        // base fan first
        assert_eq!(&geo.indices[0..9], &[0, 1, 2, 0, 2, 3, 0, 3, 1]);
        // then sides, all touching the apex
        assert_eq!(&geo.indices[9..18], &[1, 4, 2, 2, 4, 3, 3, 4, 1]);
    }

    #[test]
    fn test_normals_unit_length() {
        let geo = SpikeGenerator::new(7, 0.5, 2.0).generate();
        assert_eq!(geo.normals.len(), geo.positions.len());
        for n in &geo.normals {
            assert!((Vec3::from(*n).length() - 1.0).abs() < 1e-4);
        }
        // apex normal is dominated by the side faces, so it points up
        assert!(geo.normals[8][1] > 0.9);
    }

    #[test]
    fn test_sides_clamped() {
        let gen = SpikeGenerator::new(1, 1.0, 1.0);
        assert_eq!(gen.sides, 3);
        assert_eq!(gen.generate().vertex_count(), 5);
    }

    #[test]
    fn test_to_mesh_counts() {
        let mesh = SpikeGenerator::new(5, 0.3, 1.0).generate().to_mesh();
        assert_eq!(mesh.count_vertices(), 7);
        assert_eq!(mesh.indices().map(|i| i.len()), Some(30));
    }
}
