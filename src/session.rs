//! Startup sequence and the state owned by a running viewer.

use anyhow::Result;
use log::info;
use winit::event::WindowEvent;

use crate::assets::AssetFetcher;
use crate::catalog::Catalog;
use crate::config::ViewerConfig;
use crate::display::{DisplayContext, DisplayController, Selection};
use crate::error::{CatalogError, StartupError};
use crate::input::{CommandQueue, ViewerCommand, WindowInput};
use crate::panel::build_panel;
use crate::pool::{build_pool, ProductPool};
use crate::scene::SceneGraph;
use crate::ui::{report_startup, ViewerUi};
use crate::viewport::{FrameTarget, Viewport};

/// A viewer that finished starting up.
pub struct ViewerSession {
    catalog: Catalog,
    pool: ProductPool,
    scene: SceneGraph,
    display: DisplayController,
    viewport: Viewport,
    queue: CommandQueue,
    input: WindowInput,
}

/// Builds the product pool and the button panel, then shows the first
/// product and hides the loading indicator.
///
/// On failure the UI shows the startup error message and the error is
/// returned.
pub async fn start_session<F: AssetFetcher>(
    catalog: Catalog,
    fetcher: &F,
    config: &ViewerConfig,
    ui: &mut dyn ViewerUi,
    size: (u32, u32),
    queue: CommandQueue,
) -> Result<ViewerSession, StartupError> {
    let started = initialize(catalog, fetcher, config, ui, size, queue).await;
    report_startup(ui, started)
}

async fn initialize<F: AssetFetcher>(
    catalog: Catalog,
    fetcher: &F,
    config: &ViewerConfig,
    ui: &mut dyn ViewerUi,
    (width, height): (u32, u32),
    queue: CommandQueue,
) -> Result<ViewerSession, StartupError> {
    info!("loading {} products", catalog.len());
    let (scene, mut pool) = build_pool(&catalog, fetcher, config).await;
    build_panel(&catalog, &mut pool, ui)?;

    let first = catalog.first().ok_or(CatalogError::Empty)?.id.clone();
    let mut session = ViewerSession {
        catalog,
        pool,
        scene,
        display: DisplayController::new(),
        viewport: Viewport::new(config, width, height),
        queue,
        input: WindowInput::new(),
    };
    if !session.select_index(0, ui) {
        return Err(StartupError::InitialSelection(first));
    }
    ui.hide_loader();
    info!("viewer ready");
    Ok(session)
}

impl ViewerSession {
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn pool(&self) -> &ProductPool {
        &self.pool
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn selection(&self) -> Selection {
        self.display.selection()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    fn display<R>(
        &mut self,
        ui: &mut dyn ViewerUi,
        action: impl FnOnce(&mut DisplayController, &mut DisplayContext<'_>) -> R,
    ) -> R {
        let mut ctx = DisplayContext {
            catalog: &self.catalog,
            pool: &self.pool,
            scene: &mut self.scene,
            viewport: &mut self.viewport,
            ui,
        };
        action(&mut self.display, &mut ctx)
    }

    pub fn select_index(&mut self, index: usize, ui: &mut dyn ViewerUi) -> bool {
        self.display(ui, |display, ctx| display.select_index(index, ctx))
    }

    pub fn select_id(&mut self, id: &str, ui: &mut dyn ViewerUi) -> bool {
        self.display(ui, |display, ctx| display.select_id(id, ctx))
    }

    pub fn apply(&mut self, command: ViewerCommand, ui: &mut dyn ViewerUi, target: &mut dyn FrameTarget) {
        match command {
            ViewerCommand::Select(index) => {
                self.select_index(index, ui);
            }
            ViewerCommand::Next => {
                self.display(ui, |display, ctx| display.next(ctx));
            }
            ViewerCommand::Previous => {
                self.display(ui, |display, ctx| display.previous(ctx));
            }
            ViewerCommand::ResetView => self.viewport.reset_view(),
            ViewerCommand::Resize { width, height } => self.viewport.resize(width, height, target),
        }
    }

    /// Applies every queued command in arrival order.
    pub fn process_commands(&mut self, ui: &mut dyn ViewerUi, target: &mut dyn FrameTarget) {
        for command in self.queue.drain() {
            self.apply(command, ui, target);
        }
    }

    /// Feeds a window event to the trackball or, for key presses, the queue.
    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        self.input
            .handle(event, &mut self.viewport.controls, &self.queue);
    }

    /// Runs queued commands, then advances the trackball and draws.
    pub fn frame(&mut self, ui: &mut dyn ViewerUi, target: &mut dyn FrameTarget) -> Result<()> {
        self.process_commands(ui, target);
        self.viewport.frame(&self.scene, target)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::panel::ControlFace;
    use crate::pool::tests::{sample_catalog, MemoryFetcher, QUAD_OBJ};
    use crate::pool::EntryOrigin;
    use crate::ui::{Caption, ControlId, HeadlessUi, STARTUP_FAILURE_MESSAGE};
    use crate::viewport::tests::RecordingTarget;

    fn start(ui: &mut dyn ViewerUi) -> Result<ViewerSession, StartupError> {
        let fetcher = MemoryFetcher::default().with_file("models/quad.obj", QUAD_OBJ);
        pollster::block_on(start_session(
            sample_catalog(),
            &fetcher,
            &ViewerConfig::default(),
            ui,
            (800, 600),
            CommandQueue::new(),
        ))
    }

    fn visible_ids(session: &ViewerSession) -> Vec<&str> {
        session
            .pool()
            .entries()
            .iter()
            .filter(|entry| session.scene().is_visible(entry.node))
            .map(|entry| entry.id.as_str())
            .collect()
    }

    #[test]
    fn startup_shows_first_product_and_hides_loader() {
        let mut ui = HeadlessUi::new();
        let session = start(&mut ui).unwrap();

        assert_eq!(visible_ids(&session), ["quad"]);
        assert_eq!(session.selection().active_control, Some(ControlId(0)));
        assert_eq!(ui.controls.len(), 5);
        assert!(!ui.loader_visible);
        assert_eq!(ui.caption, Some(Caption::new("Assets", "Quad")));
        assert!(ui.fatal_error.is_none());
        assert_eq!(session.pool().get("broken").unwrap().origin, EntryOrigin::Fallback);
    }

    /// UI whose controls cannot be created.
    #[derive(Default)]
    struct BrokenUi {
        inner: HeadlessUi,
    }

    impl ViewerUi for BrokenUi {
        fn add_control(&mut self, _: usize, _: &ControlFace) -> Result<ControlId, StartupError> {
            Err(StartupError::Ui("button container missing".to_string()))
        }

        fn set_control_active(&mut self, control: ControlId, active: bool) {
            self.inner.set_control_active(control, active);
        }

        fn set_caption(&mut self, caption: &Caption) {
            self.inner.set_caption(caption);
        }

        fn hide_loader(&mut self) {
            self.inner.hide_loader();
        }

        fn show_fatal_error(&mut self, message: &str) {
            self.inner.show_fatal_error(message);
        }
    }

    #[test]
    fn startup_failure_reaches_the_ui() {
        let mut ui = BrokenUi {
            inner: HeadlessUi::new(),
        };
        let result = start(&mut ui);

        assert!(matches!(result, Err(StartupError::Ui(_))));
        assert_eq!(ui.inner.fatal_error.as_deref(), Some(STARTUP_FAILURE_MESSAGE));
        assert!(ui.inner.loader_visible);
    }

    #[test]
    fn queued_commands_apply_on_the_next_frame() {
        let mut ui = HeadlessUi::new();
        let mut session = start(&mut ui).unwrap();
        let mut target = RecordingTarget::default();

        let handler = session.queue().clone();
        handler.push(ViewerCommand::Select(3));
        handler.push(ViewerCommand::Select(1));
        handler.push(ViewerCommand::Select(3));
        assert_eq!(visible_ids(&session), ["quad"]);

        session.frame(&mut ui, &mut target).unwrap();
        assert_eq!(visible_ids(&session), ["cubo"]);
        assert!(session.queue().is_empty());
        assert_eq!(target.frames.len(), 1);
        assert_eq!(target.frames[0].len(), 1);
    }

    #[test]
    fn resize_keeps_the_selection() {
        let mut ui = HeadlessUi::new();
        let mut session = start(&mut ui).unwrap();
        let mut target = RecordingTarget::default();
        session.select_id("dona", &mut ui);
        let before = session.selection();

        session.apply(
            ViewerCommand::Resize {
                width: 1024,
                height: 512,
            },
            &mut ui,
            &mut target,
        );
        assert_eq!(session.selection(), before);
        assert_eq!(visible_ids(&session), ["dona"]);
        assert_eq!(session.viewport().size(), (1024, 512));
        assert!((session.viewport().camera.aspect - 2.0).abs() < 1e-6);
    }

    #[test]
    fn reset_view_command_restores_the_camera() {
        let mut ui = HeadlessUi::new();
        let mut session = start(&mut ui).unwrap();
        let mut target = RecordingTarget::default();
        session.viewport_mut().camera.eye = Vec3::new(3.0, 3.0, 3.0);

        session.apply(ViewerCommand::ResetView, &mut ui, &mut target);
        assert_eq!(session.viewport().camera.eye, Vec3::new(0.0, 0.0, 5.0));
    }
}
