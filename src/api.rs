//! Cat image collaborator: one GET, one JSON record back.

use futures::future::LocalBoxFuture;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

use crate::error::{js_message, FortuneError};
use crate::fortune::CatImage;

pub const CAT_API_URL: &str = "https://api.thecatapi.com/v1/images/search";

pub trait ImageSource {
    /// Fetch one image record. No retries; the caller decides.
    fn fetch_image(&self) -> LocalBoxFuture<'_, Result<CatImage, FortuneError>>;
}

/// `thecatapi.com` search endpoint through the browser's `fetch`.
#[derive(Clone, Debug)]
pub struct CatApi {
    endpoint: String,
}

impl Default for CatApi {
    fn default() -> Self {
        Self { endpoint: CAT_API_URL.to_string() }
    }
}

impl CatApi {
    pub fn with_endpoint(endpoint: &str) -> Self {
        Self { endpoint: endpoint.to_string() }
    }

    async fn fetch(&self) -> Result<CatImage, FortuneError> {
        let window = web_sys::window().ok_or(FortuneError::Dom("window"))?;
        let opts = RequestInit::new();
        opts.set_method("GET");
        opts.set_mode(RequestMode::Cors);
        let request = Request::new_with_str_and_init(&self.endpoint, &opts)
            .map_err(|e| FortuneError::Transport(js_message(&e)))?;

        let response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(|e| FortuneError::Transport(js_message(&e)))?;
        let response: Response = response
            .dyn_into()
            .map_err(|_| FortuneError::Decode("fetch did not resolve to a Response".into()))?;
        if !response.ok() {
            return Err(FortuneError::Fetch { status: response.status() });
        }

        let text = response.text().map_err(|e| FortuneError::Transport(js_message(&e)))?;
        let body = JsFuture::from(text)
            .await
            .map_err(|e| FortuneError::Transport(js_message(&e)))?
            .as_string()
            .ok_or_else(|| FortuneError::Decode("response body is not text".into()))?;
        parse_search_response(&body)
    }
}

impl ImageSource for CatApi {
    fn fetch_image(&self) -> LocalBoxFuture<'_, Result<CatImage, FortuneError>> {
        Box::pin(self.fetch())
    }
}

/// The search endpoint answers with an array; the first entry is the image.
pub fn parse_search_response(body: &str) -> Result<CatImage, FortuneError> {
    let images: Vec<CatImage> = serde_json::from_str(body)?;
    images
        .into_iter()
        .next()
        .ok_or_else(|| FortuneError::Decode("empty image list".into()))
}
