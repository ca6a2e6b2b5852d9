use std::sync::Arc;

use glam::{EulerRot, Mat4, Quat, Vec3, Vec4};

use crate::config::linear_rgb;
use crate::geometry::{Aabb, Mesh};

/// Surface appearance. Colors are linear RGBA.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: Option<String>,
    pub color: Vec4,
    /// Drawn with alpha blending and sorted after opaque surfaces.
    pub transparent: bool,
    pub depth_write: bool,
}

impl Material {
    pub fn opaque(color: Vec3) -> Self {
        Self {
            name: None,
            color: color.extend(1.0),
            transparent: false,
            depth_write: true,
        }
    }

    pub fn from_hex(hex: u32) -> Self {
        Self::opaque(linear_rgb(hex))
    }

    pub fn is_opaque(&self) -> bool {
        !self.transparent && self.depth_write
    }
}

/// Mesh paired with the material it is drawn with.
#[derive(Debug, Clone)]
pub struct Surface {
    pub mesh: Arc<Mesh>,
    pub material: Arc<Material>,
}

/// Placement of a renderable: `translation * rotation * scale * translate(-pivot)`.
///
/// The pivot is the point of the mesh data that ends up at `translation`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub pivot: Vec3,
    pub scale: Vec3,
    pub rotation: Quat,
    pub translation: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            pivot: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation: Quat::IDENTITY,
            translation: Vec3::ZERO,
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
            * Mat4::from_translation(-self.pivot)
    }

    /// Euler XYZ rotation given in degrees.
    pub fn set_rotation_degrees(&mut self, degrees: Vec3) {
        self.rotation = Quat::from_euler(
            EulerRot::XYZ,
            degrees.x.to_radians(),
            degrees.y.to_radians(),
            degrees.z.to_radians(),
        );
    }
}

/// Something the viewer can show: one or more surfaces under a transform.
#[derive(Debug, Clone)]
pub struct Renderable {
    pub name: String,
    pub surfaces: Vec<Surface>,
    pub transform: Transform,
    pub visible: bool,
}

impl Renderable {
    pub fn new(name: impl Into<String>, surfaces: Vec<Surface>) -> Self {
        Self {
            name: name.into(),
            surfaces,
            transform: Transform::default(),
            visible: true,
        }
    }

    pub fn single(name: impl Into<String>, mesh: Mesh, material: Arc<Material>) -> Self {
        Self::new(
            name,
            vec![Surface {
                mesh: Arc::new(mesh),
                material,
            }],
        )
    }

    /// Bounds of the untransformed mesh data.
    pub fn local_bounds(&self) -> Option<Aabb> {
        self.surfaces
            .iter()
            .filter_map(|surface| surface.mesh.bounds())
            .reduce(Aabb::union)
    }

    /// Bounds after applying the transform.
    pub fn world_bounds(&self) -> Option<Aabb> {
        self.local_bounds()
            .map(|bounds| bounds.transformed(self.transform.matrix()))
    }

    /// Makes every material opaque with depth writes enabled.
    ///
    /// Shared materials are only cloned when they actually change.
    pub fn force_opaque(&mut self) {
        for surface in &mut self.surfaces {
            if !surface.material.is_opaque() {
                let material = Arc::make_mut(&mut surface.material);
                material.transparent = false;
                material.depth_write = true;
            }
        }
    }
}

/// Handle of a renderable stored in a [`SceneGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Arena of renderables. Nodes are never removed during a session.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<Renderable>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, renderable: Renderable) -> NodeId {
        self.nodes.push(renderable);
        NodeId(self.nodes.len() - 1)
    }

    pub fn get(&self, id: NodeId) -> Option<&Renderable> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Renderable> {
        self.nodes.get_mut(id.0)
    }

    /// Returns `false` when the node does not exist.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> bool {
        match self.nodes.get_mut(id.0) {
            Some(node) => {
                node.visible = visible;
                true
            }
            None => false,
        }
    }

    pub fn is_visible(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|node| node.visible)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Renderable)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index), node))
    }

    pub fn visible(&self) -> impl Iterator<Item = (NodeId, &Renderable)> {
        self.iter().filter(|(_, node)| node.visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ShapeKind;
    use crate::geometry::build_shape;

    #[test]
    fn visibility_is_tracked_per_node() {
        let material = Arc::new(Material::from_hex(0x007bff));
        let mut scene = SceneGraph::new();
        let a = scene.add(Renderable::single("a", build_shape(ShapeKind::Box), material.clone()));
        let b = scene.add(Renderable::single("b", build_shape(ShapeKind::Cone), material));
        scene.set_visible(a, false);
        assert!(!scene.is_visible(a));
        assert!(scene.is_visible(b));
        assert_eq!(scene.visible().map(|(id, _)| id).collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn missing_node_reports_false() {
        let mut scene = SceneGraph::new();
        assert!(!scene.set_visible(NodeId(3), true));
        assert!(!scene.is_visible(NodeId(3)));
    }

    #[test]
    fn transform_rotates_about_pivot() {
        let mut transform = Transform {
            pivot: Vec3::new(1.0, 0.0, 0.0),
            ..Transform::default()
        };
        transform.set_rotation_degrees(Vec3::new(0.0, 90.0, 0.0));
        let pivot = transform.matrix().transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert!(pivot.abs_diff_eq(Vec3::ZERO, 1e-6));
    }

    #[test]
    fn force_opaque_only_touches_translucent_materials() {
        let shared = Arc::new(Material::from_hex(0x007bff));
        let translucent = Arc::new(Material {
            transparent: true,
            depth_write: false,
            ..Material::from_hex(0xffffff)
        });
        let mut renderable = Renderable::new(
            "mixed",
            vec![
                Surface {
                    mesh: Arc::new(build_shape(ShapeKind::Box)),
                    material: shared.clone(),
                },
                Surface {
                    mesh: Arc::new(build_shape(ShapeKind::Box)),
                    material: translucent,
                },
            ],
        );
        renderable.force_opaque();
        assert!(renderable.surfaces.iter().all(|s| s.material.is_opaque()));
        assert!(Arc::ptr_eq(&renderable.surfaces[0].material, &shared));
    }
}
