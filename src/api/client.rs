use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::query::{QueryKey, View};
use crate::record::api_types::{
  ApiAck, ApiAnalytics, ApiBulkDeleteBody, ApiEnvelope, ApiFlagBody, ApiListResponse,
  ApiPurgeResponse,
};
use crate::record::{map_analytics, map_pagination, map_records, Analytics, Page};

use super::RecordApi;

/// HTTP client for the record store
#[derive(Clone)]
pub struct RecordClient {
  http: reqwest::Client,
  base_url: Url,
}

impl RecordClient {
  pub fn new(config: &Config) -> Result<Self> {
    Self::with_base_url(
      &config.api.url,
      Duration::from_secs(config.api.request_timeout_secs),
    )
  }

  pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
    let mut base_url =
      Url::parse(base_url).map_err(|e| eyre!("Invalid API url '{}': {}", base_url, e))?;
    // Keep any path prefix when joining relative endpoints
    if !base_url.path().ends_with('/') {
      let path = format!("{}/", base_url.path());
      base_url.set_path(&path);
    }

    let http = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base_url })
  }

  fn url(&self, path: &str) -> Result<Url> {
    self
      .base_url
      .join(path.trim_start_matches('/'))
      .map_err(|e| eyre!("Failed to build url for {}: {}", path, e))
  }

  async fn send_json<T: DeserializeOwned>(&self, what: &str, req: RequestBuilder) -> Result<T> {
    let response = req
      .send()
      .await
      .map_err(|e| eyre!("Failed to {}: {}", what, e))?;
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if !status.is_success() {
      return Err(eyre!("Failed to {} ({}): {}", what, status, body));
    }
    let body = if body.trim().is_empty() { "{}" } else { &body };
    serde_json::from_str(body).map_err(|e| eyre!("Failed to parse response to {}: {}", what, e))
  }

  async fn send_ack(&self, what: &str, req: RequestBuilder) -> Result<()> {
    let ack: ApiAck = self.send_json(what, req).await?;
    if !ack.success {
      return Err(eyre!(
        "Failed to {}: {}",
        what,
        ack.message.unwrap_or_else(|| "server reported failure".to_string())
      ));
    }
    Ok(())
  }
}

#[async_trait]
impl RecordApi for RecordClient {
  async fn fetch_page(&self, key: &QueryKey) -> Result<Page> {
    let url = self.url(&format!("api/cv/list/{}", key.view.segment()))?;
    debug!(key = %key.description(), "fetching page");

    let response: ApiListResponse = self
      .send_json("list records", self.http.get(url).query(&key.query_pairs()))
      .await?;

    if !response.success {
      return Err(eyre!(
        "Failed to list records: {}",
        response
          .message
          .unwrap_or_else(|| "server reported failure".to_string())
      ));
    }

    let pagination = response
      .pagination
      .map(map_pagination)
      .ok_or_else(|| eyre!("Failed to list records: response has no pagination"))?;

    Ok(Page {
      rows: map_records(response.data),
      pagination,
    })
  }

  async fn set_starred(&self, id: &str, value: bool) -> Result<()> {
    let url = self.url(&format!("api/cv/{}/star", id))?;
    self
      .send_ack(
        &format!("star record {}", id),
        self.http.patch(url).json(&ApiFlagBody { value }),
      )
      .await
  }

  async fn delete(&self, id: &str) -> Result<()> {
    let url = self.url(&format!("api/cv/{}", id))?;
    self
      .send_ack(&format!("delete record {}", id), self.http.delete(url))
      .await
  }

  async fn bulk_delete(&self, ids: &[String]) -> Result<()> {
    let url = self.url("api/cv/bulk")?;
    self
      .send_ack(
        &format!("delete {} records", ids.len()),
        self.http.delete(url).json(&ApiBulkDeleteBody { ids }),
      )
      .await
  }

  async fn delete_all(&self, view: View) -> Result<u64> {
    let url = self.url(&format!("api/cv/purge/{}", view.segment()))?;
    let response: ApiPurgeResponse = self
      .send_json(&format!("delete all {} records", view), self.http.delete(url))
      .await?;
    Ok(response.deleted)
  }

  async fn analytics(&self, view: View) -> Result<Analytics> {
    let url = self.url(&format!("api/cv/analytics/{}", view.segment()))?;
    let response: ApiEnvelope<ApiAnalytics> = self
      .send_json(&format!("load {} analytics", view), self.http.get(url))
      .await?;

    if !response.success {
      return Err(eyre!(
        "Failed to load {} analytics: {}",
        view,
        response
          .message
          .unwrap_or_else(|| "server reported failure".to_string())
      ));
    }
    Ok(map_analytics(response.data.unwrap_or_default()))
  }
}
