use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use log::info;
use pollster::block_on;
use winit::dpi::LogicalSize;
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use product_viewer::app::{ViewerApp, WindowTitleUi, WINDOW_TITLE};
use product_viewer::assets::FsFetcher;
use product_viewer::catalog::Catalog;
use product_viewer::config::ViewerConfig;
use product_viewer::input::CommandQueue;
use product_viewer::render::Renderer;
use product_viewer::session::{start_session, ViewerSession};
use product_viewer::ui::{HeadlessUi, STARTUP_FAILURE_MESSAGE};

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

fn run() -> Result<()> {
    let options = CliOptions::parse(env::args().skip(1))?;
    let catalog = match &options.catalog {
        Some(path) => load_catalog(path)?,
        None => Catalog::builtin(),
    };
    let fetcher = FsFetcher::new(options.asset_root());
    let config = match &options.config {
        Some(path) => load_config(path)?,
        None => ViewerConfig::default(),
    };
    println!("Loaded catalog with {} products", catalog.len());

    if options.summary_only {
        return run_headless(catalog, &fetcher, &config);
    }
    match run_interactive(catalog.clone(), &fetcher, &config) {
        Err(err) if err.downcast_ref::<WindowInitError>().is_some() => {
            eprintln!("{err}. Falling back to --summary-only mode.");
            run_headless(catalog, &fetcher, &config)
        }
        other => other,
    }
}

fn load_catalog(path: &Path) -> Result<Catalog> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
    let catalog = if is_json {
        Catalog::from_json(&text)
    } else {
        Catalog::from_xml(&text)
    };
    catalog.with_context(|| format!("invalid catalog {}", path.display()))
}

/// Reads viewer tunables from JSON; omitted fields keep their defaults.
fn load_config(path: &Path) -> Result<ViewerConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

fn run_headless(catalog: Catalog, fetcher: &FsFetcher, config: &ViewerConfig) -> Result<()> {
    let mut ui = HeadlessUi::new();
    let session = block_on(start_session(
        catalog,
        fetcher,
        config,
        &mut ui,
        (1280, 720),
        CommandQueue::new(),
    ))
    .context(STARTUP_FAILURE_MESSAGE)?;
    print_summary(&session, &ui);
    Ok(())
}

fn print_summary(session: &ViewerSession, ui: &HeadlessUi) {
    for entry in session.pool().entries() {
        println!(" - {} ({})", entry.id, entry.origin);
    }
    let selected = session
        .selection()
        .index
        .and_then(|index| session.catalog().get(index));
    if let (Some(product), Some(caption)) = (selected, &ui.caption) {
        println!(
            "Selected: {} ({}{})",
            product.id,
            caption.line,
            caption.name_label()
        );
    }
}

fn run_interactive(catalog: Catalog, fetcher: &FsFetcher, config: &ViewerConfig) -> Result<()> {
    let event_loop =
        EventLoop::new().map_err(|err| WindowInitError::from_error("event loop", err))?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(1280.0, 720.0))
            .build(&event_loop)
            .map_err(|err| WindowInitError::from_error("window", err))?,
    );

    let renderer =
        block_on(Renderer::new(Arc::clone(&window), config)).context(STARTUP_FAILURE_MESSAGE)?;
    let mut ui = WindowTitleUi::new(Arc::clone(&window));
    let session = block_on(start_session(
        catalog,
        fetcher,
        config,
        &mut ui,
        renderer.size(),
        CommandQueue::new(),
    ))
    .context(STARTUP_FAILURE_MESSAGE)?;
    info!("use 1-9 or the arrow keys to switch products, R to reset the view");

    let mut app = ViewerApp::new(session, renderer, ui);
    event_loop
        .run(|event, target| {
            target.set_control_flow(ControlFlow::Poll);
            app.handle_event(event, target);
        })
        .context("event loop failed")?;

    match app.take_error() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

#[derive(Debug, Default, PartialEq)]
struct CliOptions {
    catalog: Option<PathBuf>,
    assets: Option<PathBuf>,
    config: Option<PathBuf>,
    summary_only: bool,
}

const USAGE: &str = "Usage: product-viewer [--catalog <file.xml|file.json>] [--assets <dir>] \
     [--config <file.json>] [--summary-only]";

impl CliOptions {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--catalog" => {
                    let path = args
                        .next()
                        .ok_or_else(|| anyhow!("--catalog needs a file. {USAGE}"))?;
                    options.catalog = Some(PathBuf::from(path));
                }
                "--assets" => {
                    let path = args
                        .next()
                        .ok_or_else(|| anyhow!("--assets needs a directory. {USAGE}"))?;
                    options.assets = Some(PathBuf::from(path));
                }
                "--config" => {
                    let path = args
                        .next()
                        .ok_or_else(|| anyhow!("--config needs a file. {USAGE}"))?;
                    options.config = Some(PathBuf::from(path));
                }
                "--summary-only" => options.summary_only = true,
                "--help" | "-h" => return Err(anyhow!(USAGE)),
                other => return Err(anyhow!("Unknown argument: {other}. {USAGE}")),
            }
        }
        Ok(options)
    }

    /// `--assets`, else the catalog's directory, else the working directory.
    fn asset_root(&self) -> PathBuf {
        if let Some(assets) = &self.assets {
            return assets.clone();
        }
        self.catalog
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliOptions> {
        CliOptions::parse(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn parses_all_flags() {
        let options = parse(&["--catalog", "shop/catalog.xml", "--summary-only"]).unwrap();
        assert_eq!(options.catalog, Some(PathBuf::from("shop/catalog.xml")));
        assert!(options.summary_only);
        assert_eq!(options.asset_root(), PathBuf::from("shop"));
    }

    #[test]
    fn explicit_asset_root_wins() {
        let options = parse(&["--catalog", "catalog.json", "--assets", "/srv/models"]).unwrap();
        assert_eq!(options.asset_root(), PathBuf::from("/srv/models"));
    }

    #[test]
    fn config_file_is_optional() {
        assert_eq!(parse(&[]).unwrap().config, None);
        let options = parse(&["--config", "viewer.json"]).unwrap();
        assert_eq!(options.config, Some(PathBuf::from("viewer.json")));
        assert!(parse(&["--config"]).is_err());
    }

    #[test]
    fn config_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.json");
        fs::write(&path, r#"{ "target_size": 4.5, "camera": { "fov_degrees": 60.0 } }"#).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.target_size, 4.5);
        assert_eq!(config.camera.fov_degrees, 60.0);
        assert_eq!(config.camera.far, 1000.0);
    }

    #[test]
    fn defaults_to_working_directory() {
        assert_eq!(parse(&[]).unwrap().asset_root(), PathBuf::from("."));
    }

    #[test]
    fn rejects_unknown_and_incomplete_arguments() {
        assert!(parse(&["--verbose"]).is_err());
        assert!(parse(&["--catalog"]).is_err());
    }
}
