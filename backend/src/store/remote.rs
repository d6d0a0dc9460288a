//! Client for the hosted save-dataset function.

use crate::api::logs::{log_info, log_success};
use crate::config::Config;
use crate::error::{StoreError, StoreResult};

use super::{SaveDatasetRequest, SaveDatasetResponse};

#[derive(Clone)]
pub struct RemoteStore {
    url: String,
    api_key: String,
    client: reqwest::Client,
}

impl RemoteStore {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Requires both `DATAVISION_SAVE_URL` and `DATAVISION_API_KEY`.
    pub fn from_config(config: &Config) -> StoreResult<Self> {
        let url = config
            .save_url
            .clone()
            .ok_or_else(|| StoreError::MissingConfig("DATAVISION_SAVE_URL not set".to_string()))?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| StoreError::MissingConfig("DATAVISION_API_KEY not set".to_string()))?;
        Ok(Self::new(url, api_key))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn save(&self, request: &SaveDatasetRequest) -> StoreResult<SaveDatasetResponse> {
        log_info(format!("Saving dataset \"{}\" to {}", request.name, self.url));

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| StoreError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::RequestFailed(e.to_string()))?;

        let parsed = serde_json::from_str::<SaveDatasetResponse>(&body);

        if !status.is_success() {
            let reason = parsed
                .ok()
                .and_then(|r| r.error)
                .unwrap_or_else(|| format!("HTTP {}: {}", status, body));
            return Err(StoreError::Rejected(reason));
        }

        let parsed = parsed?;
        if !parsed.success {
            return Err(StoreError::Rejected(
                parsed.error.unwrap_or_else(|| "save was not acknowledged".to_string()),
            ));
        }

        log_success(format!(
            "Dataset saved (id {})",
            parsed.dataset_id.as_deref().unwrap_or("unknown")
        ));
        Ok(parsed)
    }
}
