use std::f32::consts::{PI, TAU};

use glam::Vec3;

use super::Mesh;
use crate::catalog::ShapeKind;

/// Parameters of a procedural shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeGeometry {
    Box {
        width: f32,
        height: f32,
        depth: f32,
    },
    Sphere {
        radius: f32,
        width_segments: u32,
        height_segments: u32,
    },
    /// A cone is a cylinder with a zero top radius.
    Cylinder {
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
        radial_segments: u32,
    },
    Torus {
        radius: f32,
        tube: f32,
        radial_segments: u32,
        tubular_segments: u32,
    },
}

impl ShapeGeometry {
    /// Dimensions used for every product of the given kind.
    pub fn default_for(kind: ShapeKind) -> Self {
        match kind {
            ShapeKind::Box => Self::Box {
                width: 2.0,
                height: 2.0,
                depth: 2.0,
            },
            ShapeKind::Sphere => Self::Sphere {
                radius: 1.5,
                width_segments: 32,
                height_segments: 32,
            },
            ShapeKind::Cylinder => Self::Cylinder {
                radius_top: 1.0,
                radius_bottom: 1.0,
                height: 2.0,
                radial_segments: 32,
            },
            ShapeKind::Torus => Self::Torus {
                radius: 1.0,
                tube: 0.4,
                radial_segments: 16,
                tubular_segments: 100,
            },
            ShapeKind::Cone => Self::Cylinder {
                radius_top: 0.0,
                radius_bottom: 1.0,
                height: 2.0,
                radial_segments: 32,
            },
        }
    }

    pub fn build(&self) -> Mesh {
        match *self {
            Self::Box {
                width,
                height,
                depth,
            } => box_mesh(Vec3::new(width, height, depth)),
            Self::Sphere {
                radius,
                width_segments,
                height_segments,
            } => sphere_mesh(radius, width_segments.max(3), height_segments.max(2)),
            Self::Cylinder {
                radius_top,
                radius_bottom,
                height,
                radial_segments,
            } => cylinder_mesh(radius_top, radius_bottom, height, radial_segments.max(3)),
            Self::Torus {
                radius,
                tube,
                radial_segments,
                tubular_segments,
            } => torus_mesh(radius, tube, radial_segments.max(2), tubular_segments.max(3)),
        }
    }
}

/// Builds the default mesh for a shape kind.
pub fn build_shape(kind: ShapeKind) -> Mesh {
    ShapeGeometry::default_for(kind).build()
}

fn box_mesh(size: Vec3) -> Mesh {
    let half = size * 0.5;
    let mut mesh = Mesh::default();
    // (normal, u axis, v axis) per face; u x v == normal
    let faces = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];
    for (normal, u, v) in faces {
        let base = mesh.positions.len() as u32;
        let center = normal * half;
        let du = u * half;
        let dv = v * half;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            mesh.positions.push(center + du * su + dv * sv);
            mesh.normals.push(normal);
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh
}

fn sphere_mesh(radius: f32, width_segments: u32, height_segments: u32) -> Mesh {
    let mut mesh = Mesh::default();
    let row = width_segments + 1;
    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;
            let direction = Vec3::new(
                -(u * TAU).cos() * (v * PI).sin(),
                (v * PI).cos(),
                (u * TAU).sin() * (v * PI).sin(),
            );
            mesh.positions.push(direction * radius);
            mesh.normals.push(direction.normalize_or_zero());
        }
    }
    for iy in 0..height_segments {
        for ix in 0..width_segments {
            let a = iy * row + ix + 1;
            let b = iy * row + ix;
            let c = (iy + 1) * row + ix;
            let d = (iy + 1) * row + ix + 1;
            // pole rows collapse to a single triangle
            if iy != 0 {
                mesh.indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height_segments - 1 {
                mesh.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }
    mesh
}

fn cylinder_mesh(radius_top: f32, radius_bottom: f32, height: f32, radial_segments: u32) -> Mesh {
    let mut mesh = Mesh::default();
    let half_height = height * 0.5;
    let slope = (radius_bottom - radius_top) / height.max(f32::EPSILON);

    // side wall: row 0 at the top, row 1 at the bottom
    for (radius, y) in [(radius_top, half_height), (radius_bottom, -half_height)] {
        for x in 0..=radial_segments {
            let theta = x as f32 / radial_segments as f32 * TAU;
            let (sin, cos) = theta.sin_cos();
            mesh.positions.push(Vec3::new(radius * sin, y, radius * cos));
            mesh.normals.push(Vec3::new(sin, slope, cos).normalize());
        }
    }
    let row = radial_segments + 1;
    for x in 0..radial_segments {
        let a = x;
        let b = row + x;
        let c = row + x + 1;
        let d = x + 1;
        mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
    }

    if radius_top > 0.0 {
        push_cap(&mut mesh, radius_top, half_height, radial_segments, true);
    }
    if radius_bottom > 0.0 {
        push_cap(&mut mesh, radius_bottom, -half_height, radial_segments, false);
    }
    mesh
}

fn push_cap(mesh: &mut Mesh, radius: f32, y: f32, segments: u32, top: bool) {
    let normal = if top { Vec3::Y } else { Vec3::NEG_Y };
    let center = mesh.positions.len() as u32;
    mesh.positions.push(Vec3::new(0.0, y, 0.0));
    mesh.normals.push(normal);
    for x in 0..=segments {
        let theta = x as f32 / segments as f32 * TAU;
        let (sin, cos) = theta.sin_cos();
        mesh.positions.push(Vec3::new(radius * sin, y, radius * cos));
        mesh.normals.push(normal);
    }
    for x in 0..segments {
        let current = center + 1 + x;
        let next = current + 1;
        if top {
            mesh.indices.extend_from_slice(&[current, next, center]);
        } else {
            mesh.indices.extend_from_slice(&[next, current, center]);
        }
    }
}

fn torus_mesh(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> Mesh {
    let mut mesh = Mesh::default();
    for j in 0..=radial_segments {
        let v = j as f32 / radial_segments as f32 * TAU;
        for i in 0..=tubular_segments {
            let u = i as f32 / tubular_segments as f32 * TAU;
            let position = Vec3::new(
                (radius + tube * v.cos()) * u.cos(),
                (radius + tube * v.cos()) * u.sin(),
                tube * v.sin(),
            );
            let ring_center = Vec3::new(radius * u.cos(), radius * u.sin(), 0.0);
            mesh.positions.push(position);
            mesh.normals.push((position - ring_center).normalize_or_zero());
        }
    }
    let row = tubular_segments + 1;
    for j in 1..=radial_segments {
        for i in 1..=tubular_segments {
            let a = row * j + i - 1;
            let b = row * (j - 1) + i - 1;
            let c = row * (j - 1) + i;
            let d = row * j + i;
            mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
    mesh
}
