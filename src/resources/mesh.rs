use std::f32::consts::{PI, TAU};

use wgpu::util::DeviceExt;

use crate::data_structures::model;

/// CPU-side triangle geometry, counter-clockwise front faces.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    pub vertices: Vec<model::ModelVertex>,
    pub indices: Vec<u32>,
}

fn vertex(position: [f32; 3], tex_coords: [f32; 2], normal: [f32; 3]) -> model::ModelVertex {
    model::ModelVertex {
        position,
        tex_coords,
        normal,
        // filled in by `compute_tangents`
        tangent: [0.0; 3],
        bitangent: [0.0; 3],
    }
}

impl Geometry {
    /// A `width` x `height` plane in the XY plane facing +Z, split into a grid
    /// of `segments` x `segments` quads so it can be displaced.
    pub fn plane(width: f32, height: f32, segments: u32) -> Self {
        let segments = segments.max(1);
        let row = segments + 1;
        let mut vertices = Vec::with_capacity((row * row) as usize);
        for iy in 0..row {
            for ix in 0..row {
                let u = ix as f32 / segments as f32;
                let v = iy as f32 / segments as f32;
                vertices.push(vertex(
                    [(u - 0.5) * width, (0.5 - v) * height, 0.0],
                    [u, v],
                    [0.0, 0.0, 1.0],
                ));
            }
        }
        let mut indices = Vec::with_capacity((segments * segments * 6) as usize);
        for iy in 0..segments {
            for ix in 0..segments {
                let a = iy * row + ix;
                let b = (iy + 1) * row + ix;
                let c = (iy + 1) * row + ix + 1;
                let d = iy * row + ix + 1;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
        Self { vertices, indices }.with_tangents()
    }

    /// A capped cylinder centred on the origin, axis along +Y.
    pub fn cylinder(radius_top: f32, radius_bottom: f32, height: f32, radial_segments: u32) -> Self {
        let segments = radial_segments.max(3);
        let half = height / 2.0;
        let slope = (radius_bottom - radius_top) / height;
        let mut geometry = Self::default();

        for iy in 0..=1u32 {
            let v = iy as f32;
            let radius = if iy == 0 { radius_top } else { radius_bottom };
            let y = if iy == 0 { half } else { -half };
            for ix in 0..=segments {
                let u = ix as f32 / segments as f32;
                let theta = u * TAU;
                let (sin, cos) = theta.sin_cos();
                let normal = cgmath::Vector3::new(sin, slope, cos);
                let normal = cgmath::InnerSpace::normalize(normal);
                geometry.vertices.push(vertex(
                    [radius * sin, y, radius * cos],
                    [u, v],
                    normal.into(),
                ));
            }
        }
        let row = segments + 1;
        for ix in 0..segments {
            let a = ix;
            let b = row + ix;
            let c = row + ix + 1;
            let d = ix + 1;
            geometry.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }

        geometry.add_cap(radius_top, half, segments, true);
        geometry.add_cap(radius_bottom, -half, segments, false);
        geometry.with_tangents()
    }

    fn add_cap(&mut self, radius: f32, y: f32, segments: u32, top: bool) {
        let sign = if top { 1.0 } else { -1.0 };
        let centre = self.vertices.len() as u32;
        self.vertices
            .push(vertex([0.0, y, 0.0], [0.5, 0.5], [0.0, sign, 0.0]));
        for ix in 0..=segments {
            let theta = ix as f32 / segments as f32 * TAU;
            let (sin, cos) = theta.sin_cos();
            self.vertices.push(vertex(
                [radius * sin, y, radius * cos],
                [cos * 0.5 * sign + 0.5, sin * 0.5 + 0.5],
                [0.0, sign, 0.0],
            ));
        }
        for ix in 0..segments {
            let a = centre + 1 + ix;
            let b = a + 1;
            if top {
                self.indices.extend_from_slice(&[a, b, centre]);
            } else {
                self.indices.extend_from_slice(&[b, a, centre]);
            }
        }
    }

    /// An axis-aligned box centred on the origin, one quad per face.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let (x, y, z) = (width / 2.0, height / 2.0, depth / 2.0);
        // normal, then the four corners counter-clockwise seen from outside
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            ([1.0, 0.0, 0.0], [[x, -y, z], [x, -y, -z], [x, y, -z], [x, y, z]]),
            ([-1.0, 0.0, 0.0], [[-x, -y, -z], [-x, -y, z], [-x, y, z], [-x, y, -z]]),
            ([0.0, 1.0, 0.0], [[-x, y, z], [x, y, z], [x, y, -z], [-x, y, -z]]),
            ([0.0, -1.0, 0.0], [[-x, -y, -z], [x, -y, -z], [x, -y, z], [-x, -y, z]]),
            ([0.0, 0.0, 1.0], [[-x, -y, z], [x, -y, z], [x, y, z], [-x, y, z]]),
            ([0.0, 0.0, -1.0], [[x, -y, -z], [-x, -y, -z], [-x, y, -z], [x, y, -z]]),
        ];
        let uvs = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

        let mut geometry = Self::default();
        for (normal, corners) in faces {
            let base = geometry.vertices.len() as u32;
            for (corner, uv) in corners.iter().zip(uvs) {
                geometry.vertices.push(vertex(*corner, uv, normal));
            }
            geometry
                .indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        geometry.with_tangents()
    }

    /// A UV sphere.
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);
        let mut geometry = Self::default();

        for iy in 0..=height_segments {
            let v = iy as f32 / height_segments as f32;
            let (sin_phi, cos_phi) = (v * PI).sin_cos();
            for ix in 0..=width_segments {
                let u = ix as f32 / width_segments as f32;
                let (sin_theta, cos_theta) = (u * TAU).sin_cos();
                let normal = [-cos_theta * sin_phi, cos_phi, sin_theta * sin_phi];
                geometry.vertices.push(vertex(
                    [radius * normal[0], radius * normal[1], radius * normal[2]],
                    [u, v],
                    normal,
                ));
            }
        }
        let row = width_segments + 1;
        for iy in 0..height_segments {
            for ix in 0..width_segments {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;
                // the poles collapse one triangle of each quad
                if iy != 0 {
                    geometry.indices.extend_from_slice(&[a, b, d]);
                }
                if iy != height_segments - 1 {
                    geometry.indices.extend_from_slice(&[b, c, d]);
                }
            }
        }
        geometry.with_tangents()
    }

    /**
     * The generated shapes don't come with tangents and bitangents so they have to be
     * calculated for normal maps to work correctly.
     */
    pub fn with_tangents(mut self) -> Self {
        let vertices = &mut self.vertices;
        let mut triangles_included = vec![0; vertices.len()];

        for c in self.indices.chunks(3) {
            let v0 = vertices[c[0] as usize];
            let v1 = vertices[c[1] as usize];
            let v2 = vertices[c[2] as usize];

            let pos0: cgmath::Vector3<_> = v0.position.into();
            let pos1: cgmath::Vector3<_> = v1.position.into();
            let pos2: cgmath::Vector3<_> = v2.position.into();

            let uv0: cgmath::Vector2<_> = v0.tex_coords.into();
            let uv1: cgmath::Vector2<_> = v1.tex_coords.into();
            let uv2: cgmath::Vector2<_> = v2.tex_coords.into();

            let delta_pos1 = pos1 - pos0;
            let delta_pos2 = pos2 - pos0;
            let delta_uv1 = uv1 - uv0;
            let delta_uv2 = uv2 - uv0;

            //     delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
            //     delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
            let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
            if det == 0.0 {
                // degenerate uv triangle (sphere poles, cap centres)
                continue;
            }
            let r = 1.0 / det;
            let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
            // flipped for right-handed normal maps in wgpu's texture coordinate system
            let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

            for &i in c {
                let v = &mut vertices[i as usize];
                v.tangent = (tangent + cgmath::Vector3::from(v.tangent)).into();
                v.bitangent = (bitangent + cgmath::Vector3::from(v.bitangent)).into();
                triangles_included[i as usize] += 1;
            }
        }

        // Average the tangents/bitangents
        for (i, n) in triangles_included.into_iter().enumerate() {
            if n == 0 {
                continue;
            }
            let denom = 1.0 / n as f32;
            let v = &mut vertices[i];
            v.tangent = (cgmath::Vector3::from(v.tangent) * denom).into();
            v.bitangent = (cgmath::Vector3::from(v.bitangent) * denom).into();
        }
        self
    }

    pub fn upload(&self, device: &wgpu::Device, name: &str) -> model::Mesh {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", name)),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", name)),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        model::Mesh {
            name: name.to_string(),
            vertex_buffer,
            index_buffer,
            num_elements: self.indices.len() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::InnerSpace;

    use super::*;

    fn assert_valid(geometry: &Geometry) {
        assert_eq!(geometry.indices.len() % 3, 0);
        let n = geometry.vertices.len() as u32;
        assert!(geometry.indices.iter().all(|&i| i < n));
    }

    /// Every triangle's winding agrees with the vertex normals.
    fn assert_faces_outward(geometry: &Geometry) {
        for c in geometry.indices.chunks(3) {
            let p: Vec<cgmath::Vector3<f32>> = c
                .iter()
                .map(|&i| geometry.vertices[i as usize].position.into())
                .collect();
            let face = (p[1] - p[0]).cross(p[2] - p[0]);
            if face.magnitude2() < 1e-12 {
                continue;
            }
            let normal: cgmath::Vector3<f32> = geometry.vertices[c[0] as usize].normal.into();
            assert!(face.dot(normal) > 0.0, "triangle {c:?} is wound inwards");
        }
    }

    #[test]
    fn plane_has_a_vertex_grid() {
        let plane = Geometry::plane(200.0, 180.0, 4);
        assert_eq!(plane.vertices.len(), 25);
        assert_eq!(plane.indices.len(), 4 * 4 * 6);
        assert_eq!(plane.vertices[0].position, [-100.0, 90.0, 0.0]);
        assert_valid(&plane);
        assert_faces_outward(&plane);
    }

    #[test]
    fn cuboid_matches_its_extent() {
        let cuboid = Geometry::cuboid(42.0, 10.0, 2.0);
        assert_eq!(cuboid.vertices.len(), 24);
        for v in &cuboid.vertices {
            assert_eq!(v.position[0].abs(), 21.0);
            assert_eq!(v.position[1].abs(), 5.0);
            assert_eq!(v.position[2].abs(), 1.0);
        }
        assert_valid(&cuboid);
        assert_faces_outward(&cuboid);
    }

    #[test]
    fn cylinder_is_closed_and_tapered() {
        let cylinder = Geometry::cylinder(4.0, 5.5, 16.0, 16);
        assert_valid(&cylinder);
        assert_faces_outward(&cylinder);
        let top = cylinder.vertices.iter().filter(|v| v.position[1] == 8.0);
        assert!(top.clone().count() > 0);
        for v in top {
            let r = (v.position[0].powi(2) + v.position[2].powi(2)).sqrt();
            assert!(r <= 4.0 + 1e-4);
        }
    }

    #[test]
    fn sphere_vertices_sit_on_the_radius() {
        let sphere = Geometry::sphere(0.5, 12, 12);
        assert_valid(&sphere);
        assert_faces_outward(&sphere);
        for v in &sphere.vertices {
            let p: cgmath::Vector3<f32> = v.position.into();
            assert!((p.magnitude() - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn tangents_follow_the_u_direction() {
        let plane = Geometry::plane(2.0, 2.0, 1);
        for v in &plane.vertices {
            let t: cgmath::Vector3<f32> = v.tangent.into();
            assert!((t.normalize() - cgmath::Vector3::unit_x()).magnitude() < 1e-5);
        }
    }
}
