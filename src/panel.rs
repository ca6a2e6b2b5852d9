use log::debug;

use crate::catalog::{Catalog, ProductDescriptor};
use crate::error::StartupError;
use crate::pool::ProductPool;
use crate::ui::ViewerUi;

/// Background of placeholder controls.
pub const PLACEHOLDER_BACKGROUND: &str = "#ccc";
/// Inline style of the placeholder letter.
pub const PLACEHOLDER_TEXT_STYLE: &str =
    "color: black; font-size: 24px; font-weight: 700; text-align: center; line-height: 90px;";

/// What a product control displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlFace {
    Thumbnail(String),
    /// First letter of the product name on a neutral background.
    Placeholder { letter: char },
}

impl ControlFace {
    pub fn for_product(product: &ProductDescriptor) -> Self {
        match &product.thumbnail {
            Some(url) => ControlFace::Thumbnail(url.clone()),
            None => ControlFace::Placeholder {
                letter: product.name.chars().next().unwrap_or('?'),
            },
        }
    }
}

/// Creates one control per product, in catalog order, and records each on
/// its pool entry.
pub fn build_panel(
    catalog: &Catalog,
    pool: &mut ProductPool,
    ui: &mut dyn ViewerUi,
) -> Result<(), StartupError> {
    for (index, product) in catalog.iter().enumerate() {
        let control = ui.add_control(index, &ControlFace::for_product(product))?;
        if !pool.attach_control(&product.id, control) {
            debug!("no pool entry for {}; control left detached", product.id);
        }
    }
    Ok(())
}
