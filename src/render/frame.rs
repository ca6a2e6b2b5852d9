//! GPU-independent part of a frame: what gets drawn, in which order, with
//! which uniforms.

use std::cmp::Ordering;

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3};

use crate::camera::PerspectiveCamera;
use crate::config::{linear_rgb, LightConfig};
use crate::scene::{NodeId, SceneGraph, Surface};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Opaque,
    /// Alpha blended, drawn after every opaque surface, farthest first.
    Translucent,
}

#[derive(Debug, Clone)]
pub struct DrawItem<'a> {
    pub node: NodeId,
    /// Position of `surface` within its renderable.
    pub slot: usize,
    pub surface: &'a Surface,
    pub model: Mat4,
    pub pass: Pass,
}

impl DrawItem<'_> {
    /// Identifies the surface across frames, independent of draw order.
    pub fn key(&self) -> (NodeId, usize) {
        (self.node, self.slot)
    }
}

/// Surfaces of every visible renderable: opaque ones first in scene order,
/// then translucent ones sorted back to front as seen from `eye`.
pub fn draw_list(scene: &SceneGraph, eye: Vec3) -> Vec<DrawItem<'_>> {
    let mut opaque = Vec::new();
    let mut translucent = Vec::new();
    for (node, renderable) in scene.visible() {
        let model = renderable.transform.matrix();
        for (slot, surface) in renderable.surfaces.iter().enumerate() {
            let (pass, list) = if surface.material.transparent {
                (Pass::Translucent, &mut translucent)
            } else {
                (Pass::Opaque, &mut opaque)
            };
            list.push(DrawItem {
                node,
                slot,
                surface,
                model,
                pass,
            });
        }
    }

    let depth = |item: &DrawItem<'_>| {
        item.surface
            .mesh
            .bounds()
            .map(|bounds| item.model.transform_point3(bounds.center()).distance_squared(eye))
            .unwrap_or(0.0)
    };
    translucent.sort_by(|a, b| depth(b).partial_cmp(&depth(a)).unwrap_or(Ordering::Equal));
    opaque.extend(translucent);
    opaque
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GlobalUniform {
    pub view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    /// Linear color in `xyz`, intensity in `w`.
    pub ambient: [f32; 4],
    /// Unit vector pointing from the scene toward the light.
    pub light_direction: [f32; 4],
    pub light_color: [f32; 4],
}

impl GlobalUniform {
    pub fn new(camera: &PerspectiveCamera, lights: &LightConfig) -> Self {
        let direction = lights.directional_position.normalize_or_zero();
        Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            camera_position: camera.eye.extend(1.0).into(),
            ambient: linear_rgb(lights.ambient_color)
                .extend(lights.ambient_intensity)
                .into(),
            light_direction: direction.extend(0.0).into(),
            light_color: linear_rgb(lights.directional_color)
                .extend(lights.directional_intensity)
                .into(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectConstants {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 3],
    pub color: [f32; 4],
}

impl ObjectConstants {
    pub fn new(item: &DrawItem<'_>) -> Self {
        let normal = Mat3::from_mat4(item.model).inverse().transpose();
        Self {
            model: item.model.to_cols_array_2d(),
            normal: mat3_to_3x4(normal),
            color: item.surface.material.color.into(),
        }
    }
}

fn mat3_to_3x4(matrix: Mat3) -> [[f32; 4]; 3] {
    let cols = matrix.to_cols_array();
    [
        [cols[0], cols[1], cols[2], 0.0],
        [cols[3], cols[4], cols[5], 0.0],
        [cols[6], cols[7], cols[8], 0.0],
    ]
}

/// Clear color for a `0xRRGGBB` background.
pub fn clear_color(hex: u32) -> wgpu::Color {
    let rgb = linear_rgb(hex);
    wgpu::Color {
        r: f64::from(rgb.x),
        g: f64::from(rgb.y),
        b: f64::from(rgb.z),
        a: 1.0,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::Vec4;

    use super::*;
    use crate::catalog::ShapeKind;
    use crate::config::ViewerConfig;
    use crate::geometry::build_shape;
    use crate::scene::{Material, Renderable};

    fn translucent() -> Arc<Material> {
        Arc::new(Material {
            name: None,
            color: Vec4::new(1.0, 1.0, 1.0, 0.5),
            transparent: true,
            depth_write: false,
        })
    }

    #[test]
    fn hidden_renderables_are_skipped() {
        let material = Arc::new(Material::from_hex(0x007bff));
        let mut scene = SceneGraph::new();
        let shown = scene.add(Renderable::single("a", build_shape(ShapeKind::Box), material.clone()));
        let hidden = scene.add(Renderable::single("b", build_shape(ShapeKind::Sphere), material));
        scene.set_visible(hidden, false);

        let items = draw_list(&scene, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].node, shown);
        assert_eq!(items[0].pass, Pass::Opaque);
    }

    #[test]
    fn surface_keys_are_stable_across_frames() {
        let material = Arc::new(Material::from_hex(0x007bff));
        let mut scene = SceneGraph::new();
        let mut pair = Renderable::single("pair", build_shape(ShapeKind::Box), material.clone());
        pair.surfaces.push(Surface {
            mesh: Arc::new(build_shape(ShapeKind::Cone)),
            material: translucent(),
        });
        let pair = scene.add(pair);
        scene.add(Renderable::single("cube", build_shape(ShapeKind::Box), material));

        let keys = |eye: Vec3| {
            let mut keys: Vec<_> = draw_list(&scene, eye).iter().map(DrawItem::key).collect();
            keys.sort();
            keys
        };
        let first = keys(Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(first.len(), 3);
        assert!(first.contains(&(pair, 0)) && first.contains(&(pair, 1)));
        assert_eq!(first, keys(Vec3::new(0.0, 0.0, -5.0)));
    }

    #[test]
    fn translucent_surfaces_come_last_back_to_front() {
        let mut scene = SceneGraph::new();
        let mut near = Renderable::single("near", build_shape(ShapeKind::Box), translucent());
        near.transform.translation = Vec3::new(0.0, 0.0, 2.0);
        let mut far = Renderable::single("far", build_shape(ShapeKind::Box), translucent());
        far.transform.translation = Vec3::new(0.0, 0.0, -4.0);
        let near = scene.add(near);
        let far = scene.add(far);
        let solid = scene.add(Renderable::single(
            "solid",
            build_shape(ShapeKind::Cone),
            Arc::new(Material::from_hex(0xff0000)),
        ));

        let order: Vec<_> = draw_list(&scene, Vec3::new(0.0, 0.0, 5.0))
            .iter()
            .map(|item| item.node)
            .collect();
        assert_eq!(order, vec![solid, far, near]);
    }

    #[test]
    fn light_direction_points_at_the_light() {
        let config = ViewerConfig::default();
        let camera = PerspectiveCamera::new(&config.camera, 1.0);
        let globals = GlobalUniform::new(&camera, &config.lights);
        let direction = Vec3::from_slice(&globals.light_direction[..3]);
        assert!(direction.abs_diff_eq(Vec3::new(5.0, 10.0, 7.5).normalize(), 1e-6));
        assert_eq!(globals.ambient[3], 0.6);
        assert_eq!(globals.light_color[3], 1.0);
    }

    #[test]
    fn background_is_linearized() {
        let color = clear_color(0x6d6d6d);
        assert!(color.r > 0.14 && color.r < 0.16);
        assert_eq!(color.r, color.b);
        assert_eq!(color.a, 1.0);
    }
}
