use thiserror::Error;

/// Problems found while reading or validating a product catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog does not contain any products")]
    Empty,
    #[error("product id {0:?} appears more than once")]
    DuplicateId(String),
    #[error("product {0:?} is loaded from a file but has no path")]
    MissingPath(String),
    #[error("{product} is missing <{field}>")]
    MissingField {
        product: String,
        field: &'static str,
    },
    #[error("{product}: {field} {value:?} is not a 3-component vector")]
    InvalidVector {
        product: String,
        field: &'static str,
        value: String,
    },
    #[error("invalid catalog XML")]
    Xml(#[from] roxmltree::Error),
    #[error("invalid catalog JSON")]
    Json(#[from] serde_json::Error),
}

/// Failure to produce a renderable from an asset file.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("unable to fetch {path}: {reason}")]
    Fetch { path: String, reason: String },
    #[error("unsupported asset format for {0}")]
    UnsupportedFormat(String),
    #[error("invalid glTF asset")]
    Gltf(#[from] gltf::Error),
    #[error("GLB buffer refers to a missing binary chunk")]
    MissingBinaryChunk,
    #[error("glTF buffer {index} holds {actual} bytes, expected {expected}")]
    BufferTooShort {
        index: usize,
        expected: usize,
        actual: usize,
    },
    #[error("invalid data URI: {0}")]
    DataUri(String),
    #[error("invalid OBJ data on line {line}: {reason}")]
    Obj { line: usize, reason: String },
    #[error("asset does not contain any triangles")]
    NoGeometry,
}

/// Anything that prevents the viewer from becoming interactive.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("user interface error: {0}")]
    Ui(String),
    #[error("first product {0:?} could not be displayed")]
    InitialSelection(String),
}
