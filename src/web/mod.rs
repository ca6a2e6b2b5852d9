//! Browser entry point.

mod dom;
mod fetch;

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use gloo_events::EventListener;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlCanvasElement;
use winit::dpi::LogicalSize;
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::web::{EventLoopExtWebSys, WindowBuilderExtWebSys};
use winit::window::{Window, WindowBuilder};

pub use dom::DomUi;
pub use fetch::HttpFetcher;

use crate::app::{ViewerApp, WINDOW_TITLE};
use crate::catalog::Catalog;
use crate::config::ViewerConfig;
use crate::input::CommandQueue;
use crate::render::Renderer;
use crate::session::{start_session, ViewerSession};
use crate::ui::report_startup;

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

/// Loads the built-in catalog into the page and starts rendering.
#[wasm_bindgen]
pub async fn start() -> Result<(), JsValue> {
    run().await.map_err(|err| {
        log::error!("viewer error: {err:?}");
        JsValue::from_str(&format!("{err:#}"))
    })
}

async fn run() -> Result<()> {
    let browser = web_sys::window().ok_or_else(|| anyhow!("window not available"))?;
    let document = browser
        .document()
        .ok_or_else(|| anyhow!("document not available"))?;
    let canvas = document
        .get_element_by_id(dom::CANVAS_ID)
        .ok_or_else(|| anyhow!("#{} not found", dom::CANVAS_ID))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| anyhow!("#{} is not a canvas", dom::CANVAS_ID))?;

    let queue = CommandQueue::new();
    let mut ui = DomUi::attach(&document, queue.clone())?;
    let launched = launch(canvas, &browser, &mut ui, queue).await;
    let (event_loop, window, renderer, session) = report_startup(&mut ui, launched)?;

    let resized_window = Arc::clone(&window);
    let on_resize = EventListener::new(&browser, "resize", move |_| {
        if let Some(browser) = web_sys::window() {
            let _ = resized_window.request_inner_size(browser_size(&browser));
        }
    });

    let mut app = ViewerApp::new(session, renderer, ui);
    event_loop.spawn(move |event, target| {
        let _keep_alive = &on_resize;
        target.set_control_flow(ControlFlow::Poll);
        app.handle_event(event, target);
    });
    Ok(())
}

/// Everything between attaching to the page and the first frame.
async fn launch(
    canvas: HtmlCanvasElement,
    browser: &web_sys::Window,
    ui: &mut DomUi,
    queue: CommandQueue,
) -> Result<(EventLoop<()>, Arc<Window>, Renderer, ViewerSession)> {
    let config = ViewerConfig::default();
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(WINDOW_TITLE)
            .with_canvas(Some(canvas))
            .with_inner_size(browser_size(browser))
            .build(&event_loop)
            .context("failed to attach to canvas")?,
    );
    let renderer = Renderer::new(Arc::clone(&window), &config).await?;
    let session = start_session(
        Catalog::builtin(),
        &HttpFetcher,
        &config,
        ui,
        renderer.size(),
        queue,
    )
    .await?;
    Ok((event_loop, window, renderer, session))
}

fn browser_size(browser: &web_sys::Window) -> LogicalSize<f64> {
    let dimension = |value: Result<JsValue, JsValue>| {
        value.ok().and_then(|value| value.as_f64()).unwrap_or(1.0)
    };
    LogicalSize::new(dimension(browser.inner_width()), dimension(browser.inner_height()))
}
