//! Boundary between the viewer and whatever presents it.
//!
//! The browser front end drives DOM elements, the desktop binary only has a
//! window title, and tests use [`HeadlessUi`] to record every call.

use std::collections::BTreeSet;
use std::fmt;

use log::{error, info};

use crate::error::StartupError;
use crate::panel::ControlFace;

/// Text shown when the viewer cannot start.
pub const STARTUP_FAILURE_MESSAGE: &str = "Error loading the models. Please refresh the page.";

/// Handle of a product control created by a [`ViewerUi`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId(pub usize);

/// Category line and product name shown above the viewport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    pub line: String,
    pub name: String,
}

impl Caption {
    pub fn new(line: &str, name: &str) -> Self {
        Self {
            line: line.to_string(),
            name: name.to_string(),
        }
    }

    /// The name as rendered next to the line, e.g. `" / Cubo"`.
    pub fn name_label(&self) -> String {
        format!(" / {}", self.name)
    }
}

pub trait ViewerUi {
    /// Creates the control that selects the product at `index`.
    fn add_control(&mut self, index: usize, face: &ControlFace) -> Result<ControlId, StartupError>;

    fn set_control_active(&mut self, control: ControlId, active: bool);

    fn set_caption(&mut self, caption: &Caption);

    /// Hides the loading indicator once the viewer is interactive.
    fn hide_loader(&mut self);

    fn show_fatal_error(&mut self, message: &str);
}

/// Passes `result` through, showing [`STARTUP_FAILURE_MESSAGE`] when it
/// holds an error.
pub fn report_startup<T, E: fmt::Display>(
    ui: &mut dyn ViewerUi,
    result: Result<T, E>,
) -> Result<T, E> {
    if let Err(err) = &result {
        error!("viewer failed to start: {err}");
        ui.show_fatal_error(STARTUP_FAILURE_MESSAGE);
    }
    result
}

/// Records UI calls in memory and mirrors them to the log.
#[derive(Debug, Default)]
pub struct HeadlessUi {
    pub controls: Vec<(usize, ControlFace)>,
    pub active: BTreeSet<ControlId>,
    pub caption: Option<Caption>,
    pub loader_visible: bool,
    pub fatal_error: Option<String>,
}

impl HeadlessUi {
    pub fn new() -> Self {
        Self {
            loader_visible: true,
            ..Self::default()
        }
    }
}

impl ViewerUi for HeadlessUi {
    fn add_control(&mut self, index: usize, face: &ControlFace) -> Result<ControlId, StartupError> {
        self.controls.push((index, face.clone()));
        Ok(ControlId(self.controls.len() - 1))
    }

    fn set_control_active(&mut self, control: ControlId, active: bool) {
        if active {
            self.active.insert(control);
        } else {
            self.active.remove(&control);
        }
    }

    fn set_caption(&mut self, caption: &Caption) {
        info!("showing {}{}", caption.line, caption.name_label());
        self.caption = Some(caption.clone());
    }

    fn hide_loader(&mut self) {
        self.loader_visible = false;
    }

    fn show_fatal_error(&mut self, message: &str) {
        error!("{message}");
        self.fatal_error = Some(message.to_string());
    }
}
