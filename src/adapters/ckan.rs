use crate::domain::model::{NewPackage, Package, Resource, ResourceInfo};
use crate::domain::ports::Ckan;
use crate::utils::error::{PlateauError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct ActionResponse<T> {
    #[serde(default)]
    success: bool,
    result: Option<T>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// reqwest client for the CKAN action API (`/api/3/action/*`).
#[derive(Debug, Clone)]
pub struct HttpCkan {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpCkan {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn action_url(&self, action: &str) -> String {
        format!("{}/api/3/action/{}", self.base_url, action)
    }

    async fn post<T: DeserializeOwned>(&self, action: &str, body: &serde_json::Value) -> Result<T> {
        tracing::debug!("CKAN {}: {}", action, body);
        let response = self
            .client
            .post(self.action_url(action))
            .header("Authorization", &self.token)
            .json(body)
            .send()
            .await?;
        Self::unwrap_response(action, response).await
    }

    async fn unwrap_response<T: DeserializeOwned>(
        action: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let text = response.text().await?;

        let parsed: ActionResponse<T> = serde_json::from_str(&text).map_err(|_| {
            PlateauError::ckan(format!("{} returned {}: {}", action, status, text))
        })?;

        match parsed {
            ActionResponse {
                success: true,
                result: Some(result),
                ..
            } if status.is_success() => Ok(result),
            ActionResponse { error, .. } => Err(PlateauError::ckan(format!(
                "{} returned {}: {}",
                action,
                status,
                error.map(|e| e.to_string()).unwrap_or(text)
            ))),
        }
    }
}

#[async_trait]
impl Ckan for HttpCkan {
    async fn find_package(&self, name_or_id: &str) -> Result<Option<Package>> {
        let response = self
            .client
            .get(self.action_url("package_show"))
            .header("Authorization", &self.token)
            .query(&[("id", name_or_id)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::unwrap_response("package_show", response).await.map(Some)
    }

    async fn create_package(&self, package: &NewPackage) -> Result<Package> {
        self.post("package_create", &serde_json::to_value(package)?)
            .await
    }

    async fn patch_package(&self, id: &str, package: &NewPackage) -> Result<Package> {
        let mut body = serde_json::to_value(package)?;
        body["id"] = json!(id);
        self.post("package_patch", &body).await
    }

    async fn create_resource(&self, package_id: &str, info: &ResourceInfo) -> Result<Resource> {
        let body = json!({
            "package_id": package_id,
            "name": info.name,
            "url": info.url,
            "description": info.description,
        });
        self.post("resource_create", &body).await
    }

    async fn patch_resource(&self, resource_id: &str, info: &ResourceInfo) -> Result<Resource> {
        let body = json!({
            "id": resource_id,
            "name": info.name,
            "url": info.url,
            "description": info.description,
        });
        self.post("resource_patch", &body).await
    }

    async fn reorder_resources(&self, package_id: &str, resource_ids: &[String]) -> Result<()> {
        let body = json!({ "id": package_id, "order": resource_ids });
        let _: serde_json::Value = self.post("package_resource_reorder", &body).await?;
        Ok(())
    }
}
