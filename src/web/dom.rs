use anyhow::{anyhow, Result};
use gloo_events::EventListener;
use log::{error, warn};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement};

use crate::error::StartupError;
use crate::input::{CommandQueue, ViewerCommand};
use crate::panel::{ControlFace, PLACEHOLDER_BACKGROUND, PLACEHOLDER_TEXT_STYLE};
use crate::ui::{Caption, ControlId, ViewerUi};

pub const CANVAS_ID: &str = "canvas-3d";
const LOADER_ID: &str = "loader";
const TITLE_ID: &str = "productTitle";
const LINE_ID: &str = "productLine";
const NAME_ID: &str = "productName";
const BUTTON_CONTAINER_ID: &str = "buttonContainer";

const BUTTON_CLASS: &str = "product-button";
const ACTIVE_CLASS: &str = "active";
const HIDDEN_CLASS: &str = "hidden";

/// Page elements driven by the viewer.
pub struct DomUi {
    document: Document,
    loader: HtmlElement,
    title: HtmlElement,
    line: HtmlElement,
    name: HtmlElement,
    container: Element,
    buttons: Vec<HtmlElement>,
    listeners: Vec<EventListener>,
    queue: CommandQueue,
}

impl DomUi {
    /// Looks up every element the viewer needs; clicks are pushed to `queue`.
    pub fn attach(document: &Document, queue: CommandQueue) -> Result<Self> {
        Ok(Self {
            document: document.clone(),
            loader: html_element(document, LOADER_ID)?,
            title: html_element(document, TITLE_ID)?,
            line: html_element(document, LINE_ID)?,
            name: html_element(document, NAME_ID)?,
            container: document
                .get_element_by_id(BUTTON_CONTAINER_ID)
                .ok_or_else(|| anyhow!("#{BUTTON_CONTAINER_ID} not found"))?,
            buttons: Vec::new(),
            listeners: Vec::new(),
            queue,
        })
    }

    fn create_button(&self, face: &ControlFace) -> Result<HtmlElement, StartupError> {
        let button = self
            .document
            .create_element("button")
            .map_err(|err| StartupError::Ui(format!("cannot create button: {err:?}")))?
            .dyn_into::<HtmlElement>()
            .map_err(|_| StartupError::Ui("button is not an HTML element".to_string()))?;
        button.set_class_name(BUTTON_CLASS);
        let style = button.style();
        let styled = match face {
            ControlFace::Thumbnail(url) => style.set_property("background-image", &format!("url({url})")),
            ControlFace::Placeholder { letter } => {
                button.set_inner_text(&letter.to_string());
                style
                    .set_css_text(&format!("background-color: {PLACEHOLDER_BACKGROUND}; {PLACEHOLDER_TEXT_STYLE}"));
                Ok(())
            }
        };
        if let Err(err) = styled {
            warn!("failed to style product button: {err:?}");
        }
        Ok(button)
    }
}

fn html_element(document: &Document, id: &str) -> Result<HtmlElement> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| anyhow!("#{id} not found"))?
        .dyn_into::<HtmlElement>()
        .map_err(|_| anyhow!("#{id} is not an HTML element"))
}

impl ViewerUi for DomUi {
    fn add_control(&mut self, index: usize, face: &ControlFace) -> Result<ControlId, StartupError> {
        let button = self.create_button(face)?;
        let queue = self.queue.clone();
        self.listeners.push(EventListener::new(&button, "click", move |_| {
            queue.push(ViewerCommand::Select(index));
        }));
        self.container
            .append_child(&button)
            .map_err(|err| StartupError::Ui(format!("cannot add product button: {err:?}")))?;
        self.buttons.push(button);
        Ok(ControlId(self.buttons.len() - 1))
    }

    fn set_control_active(&mut self, control: ControlId, active: bool) {
        let Some(button) = self.buttons.get(control.0) else {
            return;
        };
        let classes = button.class_list();
        let toggled = if active {
            classes.add_1(ACTIVE_CLASS)
        } else {
            classes.remove_1(ACTIVE_CLASS)
        };
        if let Err(err) = toggled {
            warn!("failed to toggle active button: {err:?}");
        }
    }

    fn set_caption(&mut self, caption: &Caption) {
        self.line.set_inner_text(&caption.line);
        self.name.set_inner_text(&caption.name_label());
        if let Err(err) = self.title.style().set_property("opacity", "1") {
            warn!("failed to reveal product title: {err:?}");
        }
    }

    fn hide_loader(&mut self) {
        if let Err(err) = self.loader.class_list().add_1(HIDDEN_CLASS) {
            warn!("failed to hide loader: {err:?}");
        }
    }

    fn show_fatal_error(&mut self, message: &str) {
        error!("{message}");
        self.loader.set_inner_text(message);
    }
}
