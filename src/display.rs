//! Which product is on screen, and the transition between products.

use log::{debug, info};

use crate::catalog::{Catalog, ProductDescriptor};
use crate::pool::ProductPool;
use crate::scene::{NodeId, SceneGraph};
use crate::ui::{Caption, ControlId, ViewerUi};
use crate::viewport::Viewport;

/// Currently shown node and highlighted control.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub visible: Option<NodeId>,
    pub active_control: Option<ControlId>,
    /// Catalog position of the shown product.
    pub index: Option<usize>,
}

/// Everything a selection change touches.
pub struct DisplayContext<'a> {
    pub catalog: &'a Catalog,
    pub pool: &'a ProductPool,
    pub scene: &'a mut SceneGraph,
    pub viewport: &'a mut Viewport,
    pub ui: &'a mut dyn ViewerUi,
}

#[derive(Debug, Default)]
pub struct DisplayController {
    selection: Selection,
}

impl DisplayController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Shows `product` alone, highlights its control, updates the caption and
    /// puts the camera back at its home pose.
    ///
    /// Products without a pool entry are ignored and the current selection
    /// stays as it was. Returns whether the selection was applied.
    pub fn select(&mut self, product: &ProductDescriptor, ctx: &mut DisplayContext<'_>) -> bool {
        let Some(entry) = ctx.pool.get(&product.id) else {
            debug!("ignoring selection of unknown product {}", product.id);
            return false;
        };

        if let Some(node) = self.selection.visible.take() {
            ctx.scene.set_visible(node, false);
        }
        if let Some(control) = self.selection.active_control.take() {
            ctx.ui.set_control_active(control, false);
        }

        ctx.scene.set_visible(entry.node, true);
        self.selection.visible = Some(entry.node);
        if let Some(control) = entry.control {
            ctx.ui.set_control_active(control, true);
            self.selection.active_control = Some(control);
        }
        self.selection.index = ctx.catalog.index_of(&product.id);

        ctx.ui.set_caption(&Caption::new(&product.line, &product.name));
        ctx.viewport.reset_view();
        info!("selected {} ({})", product.id, entry.origin);
        true
    }

    pub fn select_id(&mut self, id: &str, ctx: &mut DisplayContext<'_>) -> bool {
        match ctx.catalog.find(id) {
            Some(product) => self.select(product, ctx),
            None => {
                debug!("ignoring selection of unknown product {id}");
                false
            }
        }
    }

    pub fn select_index(&mut self, index: usize, ctx: &mut DisplayContext<'_>) -> bool {
        match ctx.catalog.get(index) {
            Some(product) => self.select(product, ctx),
            None => {
                debug!("ignoring selection of product #{index}");
                false
            }
        }
    }

    /// Selects the following product, wrapping around at the end.
    pub fn next(&mut self, ctx: &mut DisplayContext<'_>) -> bool {
        let len = ctx.catalog.len();
        if len == 0 {
            return false;
        }
        let index = self.selection.index.map_or(0, |index| (index + 1) % len);
        self.select_index(index, ctx)
    }

    pub fn previous(&mut self, ctx: &mut DisplayContext<'_>) -> bool {
        let len = ctx.catalog.len();
        if len == 0 {
            return false;
        }
        let index = self
            .selection
            .index
            .map_or(len - 1, |index| (index + len - 1) % len);
        self.select_index(index, ctx)
    }
}
