use std::collections::HashSet;
use std::fmt;

use glam::Vec3;
use log::warn;
use roxmltree::{Document, Node};
use serde::{Deserialize, Deserializer};

use crate::error::CatalogError;

/// Procedural shapes the viewer can synthesize without an asset file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Box,
    Sphere,
    Cylinder,
    Torus,
    Cone,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 5] = [
        ShapeKind::Box,
        ShapeKind::Sphere,
        ShapeKind::Cylinder,
        ShapeKind::Torus,
        ShapeKind::Cone,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Box => "Box",
            ShapeKind::Sphere => "Sphere",
            ShapeKind::Cylinder => "Cylinder",
            ShapeKind::Torus => "Torus",
            ShapeKind::Cone => "Cone",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(tag))
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a product's renderable is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// Loaded from the descriptor's `path`.
    External,
    Shape(ShapeKind),
}

impl AssetKind {
    /// Maps a catalog type tag onto an asset kind.
    ///
    /// Unknown tags fall back to a box.
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim();
        if ["glb", "gltf", "obj"]
            .iter()
            .any(|external| external.eq_ignore_ascii_case(tag))
        {
            return AssetKind::External;
        }
        match ShapeKind::from_tag(tag) {
            Some(kind) => AssetKind::Shape(kind),
            None => {
                warn!("unknown product type {tag:?}, using a box");
                AssetKind::Shape(ShapeKind::Box)
            }
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::External => f.write_str("external"),
            AssetKind::Shape(kind) => write!(f, "{kind}"),
        }
    }
}

/// Immutable description of one product in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDescriptor {
    pub id: String,
    pub name: String,
    /// Product line shown above the name in the caption.
    pub line: String,
    pub kind: AssetKind,
    pub path: Option<String>,
    pub thumbnail: Option<String>,
    /// Added to the centered position of a loaded asset.
    pub initial_position: Option<Vec3>,
    /// Euler XYZ rotation in degrees.
    pub initial_rotation: Option<Vec3>,
}

impl ProductDescriptor {
    pub fn shape(id: &str, name: &str, line: &str, kind: ShapeKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            line: line.to_string(),
            kind: AssetKind::Shape(kind),
            path: None,
            thumbnail: None,
            initial_position: None,
            initial_rotation: None,
        }
    }

    pub fn external(id: &str, name: &str, line: &str, path: &str) -> Self {
        Self {
            kind: AssetKind::External,
            path: Some(path.to_string()),
            ..Self::shape(id, name, line, ShapeKind::Box)
        }
    }

    pub fn with_thumbnail(mut self, thumbnail: &str) -> Self {
        self.thumbnail = Some(thumbnail.to_string());
        self
    }

    pub fn with_position(mut self, offset: Vec3) -> Self {
        self.initial_position = Some(offset);
        self
    }

    pub fn with_rotation(mut self, degrees: Vec3) -> Self {
        self.initial_rotation = Some(degrees);
        self
    }
}

/// Catalog entry as written in XML or JSON, before the type tag is resolved.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProduct {
    pub id: String,
    pub name: String,
    #[serde(default, alias = "linea")]
    pub line: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default, alias = "initialPosition", deserialize_with = "optional_vector")]
    pub position: Option<Vec3>,
    #[serde(default, alias = "initialRotation", deserialize_with = "optional_vector")]
    pub rotation: Option<Vec3>,
}

/// JSON vectors are written either as `[x, y, z]` or as `{ "x", "y", "z" }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum VectorInput {
    Array([f32; 3]),
    Object { x: f32, y: f32, z: f32 },
}

impl From<VectorInput> for Vec3 {
    fn from(input: VectorInput) -> Self {
        match input {
            VectorInput::Array(components) => Vec3::from_array(components),
            VectorInput::Object { x, y, z } => Vec3::new(x, y, z),
        }
    }
}

fn optional_vector<'de, D>(deserializer: D) -> Result<Option<Vec3>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<VectorInput>::deserialize(deserializer)?.map(Vec3::from))
}

impl TryFrom<RawProduct> for ProductDescriptor {
    type Error = CatalogError;

    fn try_from(raw: RawProduct) -> Result<Self, CatalogError> {
        let kind = match raw.kind.as_deref() {
            Some(tag) => AssetKind::from_tag(tag),
            None if raw.path.is_some() => AssetKind::External,
            None => AssetKind::Shape(ShapeKind::Box),
        };
        if kind == AssetKind::External && raw.path.is_none() {
            return Err(CatalogError::MissingPath(raw.id));
        }
        Ok(Self {
            id: raw.id,
            name: raw.name,
            line: raw.line,
            kind,
            path: raw.path,
            thumbnail: raw.thumbnail,
            initial_position: raw.position,
            initial_rotation: raw.rotation,
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonCatalog {
    List(Vec<RawProduct>),
    Wrapped { products: Vec<RawProduct> },
}

/// Ordered, validated list of products.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    products: Vec<ProductDescriptor>,
}

impl Catalog {
    /// Validates the descriptors: at least one entry and unique identifiers.
    pub fn new(products: Vec<ProductDescriptor>) -> Result<Self, CatalogError> {
        if products.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::new();
        for product in &products {
            if product.id.is_empty() {
                return Err(CatalogError::MissingField {
                    product: product.name.clone(),
                    field: "id",
                });
            }
            if !seen.insert(product.id.as_str()) {
                return Err(CatalogError::DuplicateId(product.id.clone()));
            }
            if product.kind == AssetKind::External && product.path.is_none() {
                return Err(CatalogError::MissingPath(product.id.clone()));
            }
        }
        Ok(Self { products })
    }

    /// Products shipped with the viewer.
    pub fn builtin() -> Self {
        const LISBOA: &str = "Línea Lisboa";
        const PRIMITIVA: &str = "Línea Primitiva";
        Self {
            products: vec![
                ProductDescriptor::external("olla", "Olla", LISBOA, "models/olla.glb")
                    .with_thumbnail("models/thumbnails/olla_thumb.png")
                    .with_position(Vec3::new(0.0, -0.3, 0.0))
                    .with_rotation(Vec3::new(0.0, 90.0, 0.0)),
                ProductDescriptor::external("knife", "Knife", LISBOA, "models/knife.glb")
                    .with_thumbnail("models/thumbnails/knife_thumb.png")
                    .with_rotation(Vec3::new(0.0, 90.0, 45.0)),
                ProductDescriptor::shape("dona", "Dona", PRIMITIVA, ShapeKind::Torus)
                    .with_thumbnail("models/thumbnails/dona_thumb.jpg"),
                ProductDescriptor::shape("cilindro", "Cilindro", PRIMITIVA, ShapeKind::Cylinder)
                    .with_thumbnail("models/thumbnails/cilindro_thumb.jpg"),
                ProductDescriptor::shape("cono", "Cono", PRIMITIVA, ShapeKind::Cone)
                    .with_thumbnail("models/thumbnails/cono_thumb.jpg"),
                ProductDescriptor::shape("cubo", "Cubo", PRIMITIVA, ShapeKind::Box)
                    .with_thumbnail("models/thumbnails/cube_thumb.jpg"),
            ],
        }
    }

    /// Parses a `<catalog>` document with one `<product>` element per entry.
    pub fn from_xml(xml: &str) -> Result<Self, CatalogError> {
        let document = Document::parse(xml)?;
        let mut products = Vec::new();
        for node in document.descendants().filter(|n| n.has_tag_name("product")) {
            let id = required_text(&node, "id")?;
            let raw = RawProduct {
                name: optional_text(&node, "name").unwrap_or_else(|| id.clone()),
                line: optional_text(&node, "line").unwrap_or_default(),
                kind: optional_text(&node, "type"),
                path: optional_text(&node, "path"),
                thumbnail: optional_text(&node, "thumbnail"),
                position: parse_vec3(&id, "position", optional_text(&node, "position"))?,
                rotation: parse_vec3(&id, "rotation", optional_text(&node, "rotation"))?,
                id,
            };
            products.push(ProductDescriptor::try_from(raw)?);
        }
        Self::new(products)
    }

    /// Parses either a bare array of products or `{ "products": [...] }`.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw = match serde_json::from_str::<JsonCatalog>(json)? {
            JsonCatalog::List(products) | JsonCatalog::Wrapped { products } => products,
        };
        let products = raw
            .into_iter()
            .map(ProductDescriptor::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(products)
    }

    pub fn products(&self) -> &[ProductDescriptor] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn first(&self) -> Option<&ProductDescriptor> {
        self.products.first()
    }

    pub fn get(&self, index: usize) -> Option<&ProductDescriptor> {
        self.products.get(index)
    }

    pub fn find(&self, id: &str) -> Option<&ProductDescriptor> {
        self.products.iter().find(|product| product.id == id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.products.iter().position(|product| product.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProductDescriptor> {
        self.products.iter()
    }
}

fn required_text(node: &Node<'_, '_>, tag: &'static str) -> Result<String, CatalogError> {
    optional_text(node, tag).ok_or(CatalogError::MissingField {
        product: "<product>".to_string(),
        field: tag,
    })
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_vec3(
    product: &str,
    field: &'static str,
    value: Option<String>,
) -> Result<Option<Vec3>, CatalogError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let components = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .map(str::parse::<f32>)
        .collect::<Result<Vec<_>, _>>();
    match components.as_deref() {
        Ok([x, y, z]) => Ok(Some(Vec3::new(*x, *y, *z))),
        _ => Err(CatalogError::InvalidVector {
            product: product.to_string(),
            field,
            value,
        }),
    }
}
