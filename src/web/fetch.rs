use js_sys::Uint8Array;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::Response;

use crate::assets::AssetFetcher;
use crate::error::AssetError;

/// Fetches assets over HTTP, relative to the page URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpFetcher;

impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        let failed = |reason: String| AssetError::Fetch {
            path: path.to_string(),
            reason,
        };
        let js_failed = |err: JsValue| failed(format!("{err:?}"));

        let window = web_sys::window().ok_or_else(|| failed("no window".to_string()))?;
        let response: Response = JsFuture::from(window.fetch_with_str(path))
            .await
            .map_err(js_failed)?
            .dyn_into()
            .map_err(js_failed)?;
        if !response.ok() {
            return Err(failed(format!(
                "HTTP {} {}",
                response.status(),
                response.status_text()
            )));
        }
        let buffer = JsFuture::from(response.array_buffer().map_err(js_failed)?)
            .await
            .map_err(js_failed)?;
        Ok(Uint8Array::new(&buffer).to_vec())
    }
}
