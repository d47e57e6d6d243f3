use anyhow::{bail, Context};
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;

use crate::handlers::entities::OUTCOME_HEADER;

/// Thin HTTP client for the API. Unwraps the success envelope and turns
/// error bodies into `anyhow` errors carrying the server's code.
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: url::Url,
    token: Option<String>,
}

/// Response of a profile update: the entity view and the outcome header.
pub struct UpdateResponse {
    pub entity: Value,
    pub outcome: Option<String>,
}

impl CatalogClient {
    pub fn new(base_url: &str, token: Option<String>) -> anyhow::Result<Self> {
        let base_url = url::Url::parse(base_url).with_context(|| format!("invalid server URL {}", base_url))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            token,
        })
    }

    fn url(&self, path: &str) -> anyhow::Result<url::Url> {
        self.base_url.join(path).with_context(|| format!("invalid path {}", path))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> anyhow::Result<Value> {
        let request = self.authorized(self.http.get(self.url(path)?).query(query));
        let response = request.send().await.context("request failed")?;
        let (_, data) = unwrap_envelope(response).await?;
        Ok(data)
    }

    pub async fn post(&self, path: &str, query: &[(&str, String)], body: &Value) -> anyhow::Result<UpdateResponse> {
        let request = self.authorized(self.http.post(self.url(path)?).query(query).json(body));
        let response = request.send().await.context("request failed")?;
        let (outcome, entity) = unwrap_envelope(response).await?;
        Ok(UpdateResponse { entity, outcome })
    }
}

async fn unwrap_envelope(response: reqwest::Response) -> anyhow::Result<(Option<String>, Value)> {
    let status = response.status();
    let outcome = response
        .headers()
        .get(OUTCOME_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body: Value = response.json().await.context("response was not JSON")?;

    if status != StatusCode::OK {
        let code = body.get("code").and_then(Value::as_str).unwrap_or("UNKNOWN");
        let message = body.get("message").and_then(Value::as_str).unwrap_or("no message");
        bail!("{} ({}): {}", status, code, message);
    }

    Ok((outcome, body.get("data").cloned().unwrap_or(Value::Null)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_paths_onto_base_url() {
        let client = CatalogClient::new("http://localhost:3000", None).unwrap();
        assert_eq!(
            client.url("/entities/abc/profile").unwrap().as_str(),
            "http://localhost:3000/entities/abc/profile"
        );
        assert!(CatalogClient::new("localhost without scheme", None).is_err());
    }
}
