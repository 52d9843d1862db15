use serde::de::DeserializeOwned;

use crate::error::FetchError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Minimal GET transport so fetchers can run against a fake in tests.
#[allow(async_fn_in_trait)]
pub trait HttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError>;
}

pub async fn get_json<C, T>(client: &C, url: &str) -> Result<T, FetchError>
where
    C: HttpClient,
    T: DeserializeOwned,
{
    let response = client.get(url).await?;
    if !response.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: response.status,
        });
    }

    serde_json::from_str(&response.body).map_err(|error| FetchError::Decode {
        url: url.to_string(),
        reason: error.to_string(),
    })
}

#[cfg(target_arch = "wasm32")]
pub struct BrowserHttp;

#[cfg(target_arch = "wasm32")]
impl HttpClient for BrowserHttp {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let network_error = |error: gloo_net::Error| FetchError::Network {
            url: url.to_string(),
            reason: error.to_string(),
        };

        let response = gloo_net::http::Request::get(url)
            .send()
            .await
            .map_err(network_error)?;
        let status = response.status();
        let body = response.text().await.map_err(network_error)?;

        Ok(HttpResponse { status, body })
    }
}
