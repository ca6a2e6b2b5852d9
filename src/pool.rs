//! Pre-instantiates one renderable per catalog product.
//!
//! Every product is resolved up front, inserted hidden into the scene and
//! kept for the whole session; switching products only toggles visibility.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use glam::Vec3;
use log::{error, info};

use crate::assets::{load_asset, AssetFetcher};
use crate::catalog::{AssetKind, Catalog, ProductDescriptor, ShapeKind};
use crate::config::ViewerConfig;
use crate::error::AssetError;
use crate::geometry::build_shape;
use crate::scene::{Material, NodeId, Renderable, SceneGraph};
use crate::ui::ControlId;

/// How a pool entry's renderable was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOrigin {
    Primitive(ShapeKind),
    Loaded,
    /// The asset failed to load and was replaced by the fallback box.
    Fallback,
}

impl fmt::Display for EntryOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryOrigin::Primitive(kind) => write!(f, "{kind}"),
            EntryOrigin::Loaded => f.write_str("loaded"),
            EntryOrigin::Fallback => f.write_str("fallback"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoolEntry {
    pub id: String,
    pub node: NodeId,
    pub origin: EntryOrigin,
    /// Set once the button panel has been built.
    pub control: Option<ControlId>,
}

/// Pool entries keyed by product identifier, in catalog order.
#[derive(Debug, Default)]
pub struct ProductPool {
    entries: Vec<PoolEntry>,
    index: HashMap<String, usize>,
}

impl ProductPool {
    fn insert(&mut self, entry: PoolEntry) {
        self.index.insert(entry.id.clone(), self.entries.len());
        self.entries.push(entry);
    }

    pub fn get(&self, id: &str) -> Option<&PoolEntry> {
        self.index.get(id).map(|&index| &self.entries[index])
    }

    /// Records the UI control of a product. Returns `false` for unknown ids.
    pub fn attach_control(&mut self, id: &str, control: ControlId) -> bool {
        match self.index.get(id) {
            Some(&index) => {
                self.entries[index].control = Some(control);
                true
            }
            None => false,
        }
    }

    pub fn entries(&self) -> &[PoolEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves every product concurrently and registers the results hidden.
///
/// Never fails: assets that cannot be fetched or decoded are replaced by the
/// fallback box.
pub async fn build_pool<F: AssetFetcher>(
    catalog: &Catalog,
    fetcher: &F,
    config: &ViewerConfig,
) -> (SceneGraph, ProductPool) {
    let shape_material = Arc::new(Material::from_hex(config.shape_color));
    let resolved = join_all(
        catalog
            .iter()
            .map(|product| resolve_product(product, fetcher, &shape_material, config)),
    )
    .await;

    let mut scene = SceneGraph::new();
    let mut pool = ProductPool::default();
    for (product, (mut renderable, origin)) in catalog.iter().zip(resolved) {
        renderable.visible = false;
        let node = scene.add(renderable);
        pool.insert(PoolEntry {
            id: product.id.clone(),
            node,
            origin,
            control: None,
        });
    }

    let fallbacks = pool
        .entries()
        .iter()
        .filter(|entry| entry.origin == EntryOrigin::Fallback)
        .count();
    info!(
        "product pool ready: {} entries, {} fallback",
        pool.len(),
        fallbacks
    );
    (scene, pool)
}

async fn resolve_product<F: AssetFetcher>(
    product: &ProductDescriptor,
    fetcher: &F,
    shape_material: &Arc<Material>,
    config: &ViewerConfig,
) -> (Renderable, EntryOrigin) {
    match product.kind {
        AssetKind::Shape(kind) => (
            Renderable::single(&product.id, build_shape(kind), Arc::clone(shape_material)),
            EntryOrigin::Primitive(kind),
        ),
        AssetKind::External => match load_external(product, fetcher, config).await {
            Ok(renderable) => (renderable, EntryOrigin::Loaded),
            Err(err) => {
                error!(
                    "failed to load model {} for {}: {err}",
                    product.path.as_deref().unwrap_or("<none>"),
                    product.id
                );
                (fallback_renderable(product, config), EntryOrigin::Fallback)
            }
        },
    }
}

async fn load_external<F: AssetFetcher>(
    product: &ProductDescriptor,
    fetcher: &F,
    config: &ViewerConfig,
) -> Result<Renderable, AssetError> {
    let path = product.path.as_deref().ok_or_else(|| AssetError::Fetch {
        path: String::new(),
        reason: "no path configured".to_string(),
    })?;
    let surfaces = load_asset(path, fetcher).await?;
    let mut renderable = Renderable::new(&product.id, surfaces);
    normalize(&mut renderable, product, config.target_size);
    Ok(renderable)
}

/// Centers a loaded asset on the origin and scales its largest dimension to
/// `target_size`, then applies the product's rotation and offset.
///
/// All materials are forced opaque with depth writes to avoid sorting
/// artifacts between overlapping translucent parts.
pub fn normalize(renderable: &mut Renderable, product: &ProductDescriptor, target_size: f32) {
    let bounds = renderable.local_bounds();
    let transform = &mut renderable.transform;
    if let Some(bounds) = bounds {
        let largest = bounds.max_dimension();
        let scale = if largest > f32::EPSILON {
            target_size / largest
        } else {
            1.0
        };
        transform.pivot = bounds.center();
        transform.scale = Vec3::splat(scale);
    }
    if let Some(degrees) = product.initial_rotation {
        transform.set_rotation_degrees(degrees);
    }
    transform.translation = product.initial_position.unwrap_or(Vec3::ZERO);
    renderable.force_opaque();
}

fn fallback_renderable(product: &ProductDescriptor, config: &ViewerConfig) -> Renderable {
    Renderable::single(
        &product.id,
        build_shape(ShapeKind::Box),
        Arc::new(Material::from_hex(config.fallback_color)),
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;
    use crate::assets::obj_surfaces;
    use crate::config::linear_rgb;

    /// In-memory fetcher that records every requested path.
    #[derive(Default)]
    pub(crate) struct MemoryFetcher {
        files: HashMap<String, Vec<u8>>,
        pub requests: RefCell<Vec<String>>,
    }

    impl MemoryFetcher {
        pub(crate) fn with_file(mut self, path: &str, bytes: &[u8]) -> Self {
            self.files.insert(path.to_string(), bytes.to_vec());
            self
        }
    }

    impl AssetFetcher for MemoryFetcher {
        async fn fetch(&self, path: &str) -> Result<Vec<u8>, AssetError> {
            self.requests.borrow_mut().push(path.to_string());
            self.files.get(path).cloned().ok_or_else(|| AssetError::Fetch {
                path: path.to_string(),
                reason: "404 Not Found".to_string(),
            })
        }
    }

    /// Two-unit wide, one-unit tall quad whose center is (5, 0.5, 0).
    pub(crate) const QUAD_OBJ: &[u8] = b"v 4 0 0\nv 6 0 0\nv 6 1 0\nv 4 1 0\nf 1 2 3 4\n";

    pub(crate) fn sample_catalog() -> Catalog {
        Catalog::new(vec![
            ProductDescriptor::external("quad", "Quad", "Assets", "models/quad.obj")
                .with_position(Vec3::new(0.0, -0.3, 0.0)),
            ProductDescriptor::external("broken", "Broken", "Assets", "models/missing.glb"),
            ProductDescriptor::shape("dona", "Dona", "Primitives", ShapeKind::Torus),
            ProductDescriptor::shape("cubo", "Cubo", "Primitives", ShapeKind::Box),
            ProductDescriptor::shape("bola", "Bola", "Primitives", ShapeKind::Sphere),
        ])
        .unwrap()
    }

    fn build(catalog: &Catalog, fetcher: &MemoryFetcher) -> (SceneGraph, ProductPool) {
        pollster::block_on(build_pool(catalog, fetcher, &ViewerConfig::default()))
    }

    #[test]
    fn every_product_gets_one_hidden_entry() {
        let catalog = sample_catalog();
        let fetcher = MemoryFetcher::default().with_file("models/quad.obj", QUAD_OBJ);
        let (scene, pool) = build(&catalog, &fetcher);

        assert_eq!(pool.len(), catalog.len());
        assert_eq!(scene.len(), catalog.len());
        for product in catalog.iter() {
            let entry = pool.get(&product.id).unwrap();
            assert!(!scene.is_visible(entry.node));
            assert!(entry.control.is_none());
        }
        let ids: Vec<_> = pool.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["quad", "broken", "dona", "cubo", "bola"]);
    }

    #[test]
    fn failed_load_falls_back_without_stopping_others() {
        let catalog = sample_catalog();
        let fetcher = MemoryFetcher::default().with_file("models/quad.obj", QUAD_OBJ);
        let (scene, pool) = build(&catalog, &fetcher);

        let broken = pool.get("broken").unwrap();
        assert_eq!(broken.origin, EntryOrigin::Fallback);
        let fallback = scene.get(broken.node).unwrap();
        assert_eq!(fallback.surfaces.len(), 1);
        assert_eq!(fallback.surfaces[0].material.color, linear_rgb(0xff0000).extend(1.0));
        let bounds = fallback.world_bounds().unwrap();
        assert_eq!(bounds.size(), Vec3::splat(2.0));

        assert_eq!(pool.get("quad").unwrap().origin, EntryOrigin::Loaded);
        assert_eq!(
            pool.get("dona").unwrap().origin,
            EntryOrigin::Primitive(ShapeKind::Torus)
        );
    }

    #[test]
    fn primitives_never_touch_the_fetcher() {
        let catalog = Catalog::new(vec![
            ProductDescriptor::shape("cono", "Cono", "", ShapeKind::Cone),
            ProductDescriptor::shape("cilindro", "Cilindro", "", ShapeKind::Cylinder),
        ])
        .unwrap();
        let fetcher = MemoryFetcher::default();
        let (scene, pool) = build(&catalog, &fetcher);

        assert!(fetcher.requests.borrow().is_empty());
        let cone = scene.get(pool.get("cono").unwrap().node).unwrap();
        assert_eq!(cone.surfaces[0].mesh.as_ref(), &build_shape(ShapeKind::Cone));
        assert_eq!(
            pool.get("cono").unwrap().origin,
            EntryOrigin::Primitive(ShapeKind::Cone)
        );
    }

    #[test]
    fn primitives_share_one_material() {
        let catalog = sample_catalog();
        let fetcher = MemoryFetcher::default().with_file("models/quad.obj", QUAD_OBJ);
        let (scene, pool) = build(&catalog, &fetcher);

        let material = |id: &str| {
            let node = pool.get(id).unwrap().node;
            Arc::clone(&scene.get(node).unwrap().surfaces[0].material)
        };
        assert!(Arc::ptr_eq(&material("dona"), &material("cubo")));
        assert!(Arc::ptr_eq(&material("cubo"), &material("bola")));
        assert!(!Arc::ptr_eq(&material("broken"), &material("cubo")));
    }

    #[test]
    fn loaded_assets_are_centered_and_scaled() {
        let catalog = sample_catalog();
        let fetcher = MemoryFetcher::default().with_file("models/quad.obj", QUAD_OBJ);
        let (scene, pool) = build(&catalog, &fetcher);

        let quad = scene.get(pool.get("quad").unwrap().node).unwrap();
        let bounds = quad.world_bounds().unwrap();
        assert!((bounds.max_dimension() - 3.0).abs() < 1e-5);
        // centered, then shifted by the configured offset
        assert!(bounds
            .center()
            .abs_diff_eq(Vec3::new(0.0, -0.3, 0.0), 1e-5));
        assert_eq!(fetcher.requests.borrow().len(), 2);
    }

    #[test]
    fn rotation_keeps_the_centroid_at_the_origin() {
        let product = ProductDescriptor::external("quad", "Quad", "", "quad.obj")
            .with_rotation(Vec3::new(0.0, 90.0, 45.0));
        let mut renderable = Renderable::new("quad", obj_surfaces(QUAD_OBJ).unwrap());
        normalize(&mut renderable, &product, 3.0);

        let centroid = renderable
            .transform
            .matrix()
            .transform_point3(Vec3::new(5.0, 0.5, 0.0));
        assert!(centroid.abs_diff_eq(Vec3::ZERO, 1e-5));
        assert!((renderable.transform.scale.x - 1.5).abs() < 1e-6);
    }

    #[test]
    fn normalization_forces_opaque_materials() {
        let product = ProductDescriptor::external("glass", "Glass", "", "glass.obj");
        let mut renderable = Renderable::new("glass", obj_surfaces(QUAD_OBJ).unwrap());
        Arc::make_mut(&mut renderable.surfaces[0].material).transparent = true;
        Arc::make_mut(&mut renderable.surfaces[0].material).depth_write = false;

        normalize(&mut renderable, &product, 3.0);
        assert!(renderable.surfaces[0].material.is_opaque());
    }

    #[test]
    fn attach_control_rejects_unknown_ids() {
        let catalog = sample_catalog();
        let (_, mut pool) = build(&catalog, &MemoryFetcher::default());
        assert!(pool.attach_control("cubo", ControlId(3)));
        assert_eq!(pool.get("cubo").unwrap().control, Some(ControlId(3)));
        assert!(!pool.attach_control("nope", ControlId(9)));
    }
}
