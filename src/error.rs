use thiserror::Error;

#[derive(Debug, Error)]
pub enum BehaviorError {
    #[error("browser window is unavailable")]
    MissingWindow,
    #[error("browser document is unavailable")]
    MissingDocument,
    #[error("DOM call failed: {0}")]
    Dom(String),
}

#[cfg(target_arch = "wasm32")]
impl From<wasm_bindgen::JsValue> for BehaviorError {
    fn from(value: wasm_bindgen::JsValue) -> Self {
        let message = value
            .as_string()
            .or_else(|| {
                js_sys::JSON::stringify(&value)
                    .ok()
                    .and_then(|text| text.as_string())
            })
            .unwrap_or_else(|| "unknown JavaScript error".to_string());
        Self::Dom(message)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request to {url} failed: {reason}")]
    Network { url: String, reason: String },
    #[error("request to {url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("could not decode response from {url}: {reason}")]
    Decode { url: String, reason: String },
    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
