//! Event loop glue shared by the desktop binary and the browser build.

use std::sync::Arc;

use anyhow::Error;
use log::error;
use winit::event::{Event, WindowEvent};
use winit::event_loop::EventLoopWindowTarget;
use winit::window::Window;

use crate::error::StartupError;
use crate::input::ViewerCommand;
use crate::panel::ControlFace;
use crate::render::Renderer;
use crate::session::ViewerSession;
use crate::ui::{Caption, ControlId, HeadlessUi, ViewerUi};

pub const WINDOW_TITLE: &str = "Product Viewer";

/// A started session bound to its window and renderer.
pub struct ViewerApp<U: ViewerUi> {
    session: ViewerSession,
    renderer: Renderer,
    ui: U,
    last_error: Option<Error>,
}

impl<U: ViewerUi> ViewerApp<U> {
    pub fn new(session: ViewerSession, renderer: Renderer, ui: U) -> Self {
        Self {
            session,
            renderer,
            ui,
            last_error: None,
        }
    }

    pub fn session(&self) -> &ViewerSession {
        &self.session
    }

    /// Handles one winit event. Fatal render errors stop the loop and are
    /// kept for [`take_error`](Self::take_error).
    pub fn handle_event(&mut self, event: Event<()>, target: &EventLoopWindowTarget<()>) {
        match event {
            Event::WindowEvent { window_id, event } if window_id == self.renderer.window_id() => {
                match event {
                    WindowEvent::CloseRequested => target.exit(),
                    WindowEvent::Resized(size) => self.session.queue().push(ViewerCommand::Resize {
                        width: size.width,
                        height: size.height,
                    }),
                    WindowEvent::RedrawRequested => {
                        if let Err(err) = self.session.frame(&mut self.ui, &mut self.renderer) {
                            error!("frame failed: {err:#}");
                            self.last_error = Some(err);
                            target.exit();
                        }
                    }
                    other => self.session.handle_window_event(&other),
                }
            }
            Event::AboutToWait => self.renderer.window().request_redraw(),
            _ => {}
        }
    }

    pub fn take_error(&mut self) -> Option<Error> {
        self.last_error.take()
    }
}

/// Desktop presentation: the caption goes to the window title, everything
/// else is recorded.
pub struct WindowTitleUi {
    window: Arc<Window>,
    state: HeadlessUi,
}

impl WindowTitleUi {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            state: HeadlessUi::new(),
        }
    }
}

impl ViewerUi for WindowTitleUi {
    fn add_control(&mut self, index: usize, face: &ControlFace) -> Result<ControlId, StartupError> {
        self.state.add_control(index, face)
    }

    fn set_control_active(&mut self, control: ControlId, active: bool) {
        self.state.set_control_active(control, active);
    }

    fn set_caption(&mut self, caption: &Caption) {
        self.window.set_title(&format!(
            "{}{} - {WINDOW_TITLE}",
            caption.line,
            caption.name_label()
        ));
        self.state.set_caption(caption);
    }

    fn hide_loader(&mut self) {
        self.state.hide_loader();
    }

    fn show_fatal_error(&mut self, message: &str) {
        self.window.set_title(message);
        self.state.show_fatal_error(message);
    }
}
