//! Fetching and decoding of externally loaded product assets.

mod gltf_asset;
mod obj;

use std::future::Future;
use std::sync::Arc;

use glam::Vec3;

use crate::error::AssetError;
use crate::scene::{Material, Surface};

pub use gltf_asset::load_gltf;
pub use obj::decode_obj;

/// Source of raw asset bytes, addressed by the catalog path.
pub trait AssetFetcher {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<Vec<u8>, AssetError>>;
}

/// File formats the viewer can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetFormat {
    Gltf,
    Obj,
}

impl AssetFormat {
    /// Picks the format from the path extension, falling back to the GLB magic.
    pub fn detect(path: &str, bytes: &[u8]) -> Option<Self> {
        let extension = path
            .rsplit_once('.')
            .map(|(_, extension)| extension.to_ascii_lowercase());
        match extension.as_deref() {
            Some("glb" | "gltf") => Some(Self::Gltf),
            Some("obj") => Some(Self::Obj),
            _ if bytes.starts_with(b"glTF") => Some(Self::Gltf),
            _ => None,
        }
    }
}

/// Fetches an asset and decodes it into drawable surfaces.
///
/// glTF buffers stored next to the asset are fetched through the same
/// fetcher, relative to the asset's directory.
pub async fn load_asset<F: AssetFetcher>(
    path: &str,
    fetcher: &F,
) -> Result<Vec<Surface>, AssetError> {
    let bytes = fetcher.fetch(path).await?;
    let surfaces = match AssetFormat::detect(path, &bytes) {
        Some(AssetFormat::Gltf) => load_gltf(path, &bytes, fetcher).await?,
        Some(AssetFormat::Obj) => obj_surfaces(&bytes)?,
        None => return Err(AssetError::UnsupportedFormat(path.to_string())),
    };
    if surfaces.iter().all(|surface| surface.mesh.is_empty()) {
        return Err(AssetError::NoGeometry);
    }
    Ok(surfaces)
}

/// Decodes OBJ text into a single white surface.
pub fn obj_surfaces(bytes: &[u8]) -> Result<Vec<Surface>, AssetError> {
    let text = std::str::from_utf8(bytes).map_err(|err| AssetError::Obj {
        line: 0,
        reason: format!("not valid UTF-8: {err}"),
    })?;
    Ok(vec![Surface {
        mesh: Arc::new(decode_obj(text)?),
        material: Arc::new(Material::opaque(Vec3::ONE)),
    }])
}

/// Resolves `uri` against the directory holding `base`.
pub fn resolve_relative(base: &str, uri: &str) -> String {
    match base.rsplit_once('/') {
        Some((directory, _)) => format!("{directory}/{uri}"),
        None => uri.to_string(),
    }
}

pub use filesystem::FsFetcher;

mod filesystem {
    use std::path::PathBuf;
    use std::thread;

    use futures::channel::oneshot;

    use super::AssetFetcher;
    use crate::error::AssetError;

    /// Reads assets from disk, each read on its own worker thread.
    #[derive(Debug, Clone)]
    pub struct FsFetcher {
        root: PathBuf,
    }

    impl FsFetcher {
        pub fn new(root: impl Into<PathBuf>) -> Self {
            Self { root: root.into() }
        }
    }

    impl AssetFetcher for FsFetcher {
        async fn fetch(&self, path: &str) -> Result<Vec<u8>, AssetError> {
            let full_path = self.root.join(path);
            let (sender, receiver) = oneshot::channel();
            thread::spawn(move || {
                let _ = sender.send(std::fs::read(&full_path));
            });
            let fetch_error = |reason: String| AssetError::Fetch {
                path: path.to_string(),
                reason,
            };
            receiver
                .await
                .map_err(|_| fetch_error("reader thread exited".to_string()))?
                .map_err(|err| fetch_error(err.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::tests::MemoryFetcher;

    #[test]
    fn detects_format_by_extension_and_magic() {
        assert_eq!(AssetFormat::detect("models/olla.GLB", b""), Some(AssetFormat::Gltf));
        assert_eq!(AssetFormat::detect("a/b.obj", b""), Some(AssetFormat::Obj));
        assert_eq!(
            AssetFormat::detect("download", b"glTF\x02\0\0\0"),
            Some(AssetFormat::Gltf)
        );
        assert_eq!(AssetFormat::detect("notes.txt", b"hello"), None);
    }

    #[test]
    fn unsupported_format_is_an_error() {
        let fetcher = MemoryFetcher::default().with_file("notes.txt", b"hello");
        assert!(matches!(
            pollster::block_on(load_asset("notes.txt", &fetcher)),
            Err(AssetError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn loads_obj_assets() {
        let fetcher = MemoryFetcher::default()
            .with_file("models/tri.obj", b"v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
        let surfaces = pollster::block_on(load_asset("models/tri.obj", &fetcher)).unwrap();
        assert_eq!(surfaces.len(), 1);
        assert_eq!(surfaces[0].mesh.triangle_count(), 1);
        assert_eq!(*fetcher.requests.borrow(), ["models/tri.obj"]);
    }

    #[test]
    fn relative_uris_resolve_against_the_asset_directory() {
        assert_eq!(resolve_relative("models/tri.gltf", "tri.bin"), "models/tri.bin");
        assert_eq!(resolve_relative("a/b/c.gltf", "../d.bin"), "a/b/../d.bin");
        assert_eq!(resolve_relative("scene.gltf", "scene.bin"), "scene.bin");
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn fs_fetcher_reads_relative_paths() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("cube.obj")).unwrap();
        file.write_all(b"v 0 0 0").unwrap();

        let fetcher = FsFetcher::new(dir.path());
        let bytes = pollster::block_on(fetcher.fetch("cube.obj")).unwrap();
        assert_eq!(bytes, b"v 0 0 0");
        let missing = pollster::block_on(fetcher.fetch("missing.glb"));
        assert!(matches!(missing, Err(AssetError::Fetch { .. })));
    }
}
