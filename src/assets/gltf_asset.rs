use std::sync::Arc;

use base64::Engine;
use glam::{Mat4, Vec3, Vec4};
use gltf::buffer::Source;
use gltf::material::AlphaMode;
use gltf::mesh::Mode;
use gltf::{Document, Gltf};
use log::{debug, warn};

use super::{resolve_relative, AssetFetcher};
use crate::error::AssetError;
use crate::geometry::Mesh;
use crate::scene::{Material, Surface};

/// Decodes a `.glb` or `.gltf` asset loaded from `path`.
///
/// Buffers come from the GLB binary chunk, from `data:` URIs or from files
/// next to the asset, fetched through `fetcher`. Images are never loaded.
/// Node transforms of the default scene are baked into the vertex data, so
/// the returned surfaces share a single object space.
pub async fn load_gltf<F: AssetFetcher>(
    path: &str,
    bytes: &[u8],
    fetcher: &F,
) -> Result<Vec<Surface>, AssetError> {
    let Gltf { document, blob } = Gltf::from_slice(bytes)?;
    let mut blob = blob;
    let mut buffers = Vec::with_capacity(document.buffers().len());
    for buffer in document.buffers() {
        let data = match buffer.source() {
            Source::Bin => blob.take().ok_or(AssetError::MissingBinaryChunk)?,
            Source::Uri(uri) => match decode_data_uri(uri) {
                Some(data) => data?,
                None => fetcher.fetch(&resolve_relative(path, uri)).await?,
            },
        };
        if data.len() < buffer.length() {
            return Err(AssetError::BufferTooShort {
                index: buffer.index(),
                expected: buffer.length(),
                actual: data.len(),
            });
        }
        buffers.push(data);
    }
    decode_document(&document, &buffers)
}

/// Returns `None` when `uri` is not a `data:` URI.
fn decode_data_uri(uri: &str) -> Option<Result<Vec<u8>, AssetError>> {
    let (header, payload) = uri.strip_prefix("data:")?.split_once(',')?;
    if !header.ends_with(";base64") {
        return Some(Ok(payload.as_bytes().to_vec()));
    }
    Some(
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|err| AssetError::DataUri(err.to_string())),
    )
}

fn decode_document(document: &Document, buffers: &[Vec<u8>]) -> Result<Vec<Surface>, AssetError> {
    let mut decoder = Decoder {
        buffers,
        materials: document
            .materials()
            .map(|material| Arc::new(convert_material(&material)))
            .collect(),
        default_material: Arc::new(Material::opaque(Vec3::ONE)),
        surfaces: Vec::new(),
    };

    match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => {
            for node in scene.nodes() {
                decoder.visit(&node, Mat4::IDENTITY);
            }
        }
        None => {
            for mesh in document.meshes() {
                decoder.push_mesh(&mesh, Mat4::IDENTITY);
            }
        }
    }

    if decoder.surfaces.is_empty() {
        return Err(AssetError::NoGeometry);
    }
    Ok(decoder.surfaces)
}

struct Decoder<'a> {
    buffers: &'a [Vec<u8>],
    materials: Vec<Arc<Material>>,
    default_material: Arc<Material>,
    surfaces: Vec<Surface>,
}

impl Decoder<'_> {
    fn visit(&mut self, node: &gltf::Node<'_>, parent: Mat4) {
        let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
        if let Some(mesh) = node.mesh() {
            self.push_mesh(&mesh, world);
        }
        for child in node.children() {
            self.visit(&child, world);
        }
    }

    fn push_mesh(&mut self, mesh: &gltf::Mesh<'_>, world: Mat4) {
        for primitive in mesh.primitives() {
            if primitive.mode() != Mode::Triangles {
                debug!(
                    "skipping {:?} primitive of mesh {}",
                    primitive.mode(),
                    mesh.index()
                );
                continue;
            }
            let buffers = self.buffers;
            let reader = primitive
                .reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let positions: Vec<Vec3> = positions.map(Vec3::from).collect();
            let normals: Vec<Vec3> = reader
                .read_normals()
                .map(|normals| normals.map(Vec3::from).collect())
                .unwrap_or_default();
            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..positions.len() as u32).collect(),
            };

            let mut geometry = Mesh {
                positions,
                normals,
                indices,
            };
            if !geometry.indices_in_bounds() {
                warn!(
                    "skipping primitive of mesh {} with out-of-range indices",
                    mesh.index()
                );
                continue;
            }
            geometry.transform(world);
            geometry.ensure_normals();

            let material = primitive
                .material()
                .index()
                .and_then(|index| self.materials.get(index))
                .unwrap_or(&self.default_material)
                .clone();
            self.surfaces.push(Surface {
                mesh: Arc::new(geometry),
                material,
            });
        }
    }
}

fn convert_material(material: &gltf::Material<'_>) -> Material {
    let color = Vec4::from(material.pbr_metallic_roughness().base_color_factor());
    let blended = material.alpha_mode() == AlphaMode::Blend;
    Material {
        name: material.name().map(str::to_string),
        color,
        transparent: blended,
        depth_write: !blended,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::load_asset;
    use crate::pool::tests::MemoryFetcher;

    const TRIANGLE_JSON: &str = r#"{
        "asset": { "version": "2.0" },
        "buffers": [BUFFER],
        "bufferViews": [{ "buffer": 0, "byteLength": 36 }],
        "accessors": [{
            "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
            "min": [0, 0, 0], "max": [2, 1, 0]
        }],
        "images": [{ "uri": "textures/albedo.ktx2" }],
        "materials": [{
            "name": "glass",
            "pbrMetallicRoughness": { "baseColorFactor": [1, 0, 0, 0.5] },
            "alphaMode": "BLEND"
        }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "material": 0 }] }],
        "nodes": [{ "mesh": 0, "translation": [10, 0, 0] }],
        "scenes": [{ "nodes": [0] }],
        "scene": 0
    }"#;

    /// Positions of a triangle spanning x in [0, 2], y in [0, 1].
    fn triangle_bytes() -> Vec<u8> {
        [0.0f32, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 1.0, 0.0]
            .iter()
            .flat_map(|value| value.to_le_bytes())
            .collect()
    }

    fn triangle_gltf(buffer: &str) -> String {
        TRIANGLE_JSON.replace("BUFFER", buffer)
    }

    fn embedded_triangle() -> String {
        let data = base64::engine::general_purpose::STANDARD.encode(triangle_bytes());
        triangle_gltf(&format!(
            r#"{{ "byteLength": 36, "uri": "data:application/octet-stream;base64,{data}" }}"#
        ))
    }

    fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
        let mut json = json.as_bytes().to_vec();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let mut bin = bin.to_vec();
        while bin.len() % 4 != 0 {
            bin.push(0);
        }
        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(b"JSON");
        out.extend_from_slice(&json);
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(b"BIN\0");
        out.extend_from_slice(&bin);
        out
    }

    fn load(path: &str, bytes: &[u8], fetcher: &MemoryFetcher) -> Result<Vec<Surface>, AssetError> {
        pollster::block_on(load_gltf(path, bytes, fetcher))
    }

    #[test]
    fn decodes_embedded_gltf() {
        let fetcher = MemoryFetcher::default();
        let surfaces = load("models/tri.gltf", embedded_triangle().as_bytes(), &fetcher).unwrap();
        assert_eq!(surfaces.len(), 1);
        let surface = &surfaces[0];
        assert_eq!(surface.mesh.indices, vec![0, 1, 2]);
        assert_eq!(surface.mesh.normals, vec![Vec3::Z; 3]);
        assert_eq!(surface.material.name.as_deref(), Some("glass"));
        assert!(surface.material.transparent);
        assert!(!surface.material.depth_write);
        assert!(fetcher.requests.borrow().is_empty());
    }

    #[test]
    fn node_transforms_are_baked() {
        let fetcher = MemoryFetcher::default();
        let surfaces = load("tri.gltf", embedded_triangle().as_bytes(), &fetcher).unwrap();
        let bounds = surfaces[0].mesh.bounds().unwrap();
        assert_eq!(bounds.min, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(12.0, 1.0, 0.0));
    }

    #[test]
    fn external_buffers_are_fetched_next_to_the_asset() {
        let gltf = triangle_gltf(r#"{ "byteLength": 36, "uri": "tri.bin" }"#);
        let fetcher = MemoryFetcher::default()
            .with_file("models/tri.gltf", gltf.as_bytes())
            .with_file("models/tri.bin", &triangle_bytes());

        let surfaces = pollster::block_on(load_asset("models/tri.gltf", &fetcher)).unwrap();
        assert_eq!(surfaces[0].mesh.triangle_count(), 1);
        assert_eq!(*fetcher.requests.borrow(), ["models/tri.gltf", "models/tri.bin"]);
    }

    #[test]
    fn missing_external_buffer_is_a_fetch_error() {
        let gltf = triangle_gltf(r#"{ "byteLength": 36, "uri": "tri.bin" }"#);
        let fetcher = MemoryFetcher::default();
        assert!(matches!(
            load("models/tri.gltf", gltf.as_bytes(), &fetcher),
            Err(AssetError::Fetch { path, .. }) if path == "models/tri.bin"
        ));
    }

    #[test]
    fn glb_uses_its_binary_chunk_and_skips_images() {
        let json = triangle_gltf(r#"{ "byteLength": 36 }"#);
        let fetcher = MemoryFetcher::default();
        let surfaces = load("models/tri.glb", &glb(&json, &triangle_bytes()), &fetcher).unwrap();
        assert_eq!(surfaces[0].mesh.triangle_count(), 1);
        assert!(fetcher.requests.borrow().is_empty());
    }

    #[test]
    fn short_buffers_are_rejected() {
        let gltf = triangle_gltf(r#"{ "byteLength": 36, "uri": "tri.bin" }"#);
        let fetcher = MemoryFetcher::default().with_file("tri.bin", &[0u8; 12]);
        assert!(matches!(
            load("tri.gltf", gltf.as_bytes(), &fetcher),
            Err(AssetError::BufferTooShort { expected: 36, actual: 12, .. })
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            load("junk.glb", b"definitely not gltf", &MemoryFetcher::default()),
            Err(AssetError::Gltf(_))
        ));
    }
}
