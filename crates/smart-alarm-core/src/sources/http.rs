//! Blocking JSON GET on top of the async reqwest client.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tokio::runtime::Runtime;

use crate::error::FetchError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) struct JsonClient {
    client: Client,
    runtime: Runtime,
}

impl JsonClient {
    pub(crate) fn new() -> Result<Self, FetchError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self { client, runtime })
    }

    /// GET `url` and decode the body as JSON.
    ///
    /// Must not be called from inside an async runtime.
    pub(crate) fn get_json(
        &self,
        url: url::Url,
        bearer: Option<&str>,
    ) -> Result<serde_json::Value, FetchError> {
        self.runtime.block_on(async {
            let mut request = self.client.get(url);
            if let Some(token) = bearer {
                request = request.bearer_auth(token);
            }
            let response = request.send().await?;
            let status = response.status();
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                let body = response.text().await.unwrap_or_default();
                return Err(FetchError::Auth(format!("{status}: {body}")));
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(FetchError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }
            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| FetchError::Parse(e.to_string()))
        })
    }
}

/// Join `base` and `path` into a URL with query parameters.
pub(crate) fn build_url(
    base: &str,
    path: &str,
    params: &[(&str, String)],
) -> Result<url::Url, FetchError> {
    let joined = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    let mut url = url::Url::parse(&joined)
        .map_err(|e| FetchError::Parse(format!("invalid url '{joined}': {e}")))?;
    {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in params {
            pairs.append_pair(k, v);
        }
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_joins_and_encodes() {
        let url = build_url(
            "http://example.com/v1/",
            "/current.json",
            &[("q", "auto:ip".to_string()), ("aqi", "no".to_string())],
        )
        .unwrap();
        assert_eq!(url.as_str(), "http://example.com/v1/current.json?q=auto%3Aip&aqi=no");
    }

    #[test]
    fn build_url_rejects_garbage_base() {
        assert!(matches!(
            build_url("not a url", "x", &[]),
            Err(FetchError::Parse(_))
        ));
    }
}
