use crate::domain::model::{Item, ItemField};
use crate::domain::ports::Cms;
use crate::utils::error::{PlateauError, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::json;

/// reqwest client for the CMS integration API.
#[derive(Debug, Clone)]
pub struct HttpCms {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpCms {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn item_url(&self, id: &str) -> String {
        format!("{}/api/items/{}", self.base_url, id)
    }

    async fn check(response: Response, action: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(PlateauError::cms(format!("{} returned {}: {}", action, status, body)))
    }
}

#[async_trait]
impl Cms for HttpCms {
    async fn get_item(&self, id: &str, with_assets: bool) -> Result<Item> {
        if id.is_empty() {
            return Err(PlateauError::cms("item id is empty"));
        }

        let mut request = self.client.get(self.item_url(id)).bearer_auth(&self.token);
        if with_assets {
            request = request.query(&[("asset", "true")]);
        }

        tracing::debug!("CMS get item: {}", id);
        let response = Self::check(request.send().await?, "get item").await?;
        Ok(response.json().await?)
    }

    async fn comment_to_item(&self, id: &str, content: &str) -> Result<()> {
        tracing::debug!("CMS comment to item {}: {}", id, content);
        let response = self
            .client
            .post(format!("{}/comments", self.item_url(id)))
            .bearer_auth(&self.token)
            .json(&json!({ "content": content }))
            .send()
            .await?;
        Self::check(response, "comment to item").await?;
        Ok(())
    }

    async fn update_item(&self, id: &str, fields: Vec<ItemField>) -> Result<Item> {
        tracing::debug!("CMS update item {}: {} field(s)", id, fields.len());
        let response = self
            .client
            .patch(self.item_url(id))
            .bearer_auth(&self.token)
            .json(&json!({ "fields": fields }))
            .send()
            .await?;
        let response = Self::check(response, "update item").await?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use httpmock::Method::PATCH;

    #[tokio::test]
    async fn test_get_item_with_assets() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/items/city1")
                .query_param("asset", "true")
                .header("Authorization", "Bearer secret");
            then.status(200).json_body(serde_json::json!({
                "id": "city1",
                "modelId": "city",
                "fields": [{"key": "city_code", "type": "text", "value": "13101"}]
            }));
        });

        let cms = HttpCms::new(&server.base_url(), "secret");
        let item = cms.get_item("city1", true).await.unwrap();

        mock.assert();
        assert_eq!(item.id, "city1");
        assert_eq!(item.string("city_code").as_deref(), Some("13101"));
    }

    #[tokio::test]
    async fn test_get_item_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/items/missing");
            then.status(404).body("not found");
        });

        let cms = HttpCms::new(&server.base_url(), "secret");
        let err = cms.get_item("missing", false).await.unwrap_err();

        assert!(matches!(err, PlateauError::CmsError { .. }));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_comment_and_update() {
        let server = MockServer::start();
        let comment = server.mock(|when, then| {
            when.method(POST)
                .path("/api/items/data1/comments")
                .json_body(serde_json::json!({"content": "hello"}));
            then.status(200).json_body(serde_json::json!({}));
        });
        let update = server.mock(|when, then| {
            when.method(PATCH)
                .path("/api/items/data1")
                .json_body(serde_json::json!({
                    "fields": [{"key": "merge_citygml_status", "type": "select", "value": "成功"}]
                }));
            then.status(200).json_body(serde_json::json!({"id": "data1", "fields": []}));
        });

        let cms = HttpCms::new(&format!("{}/", server.base_url()), "secret");
        cms.comment_to_item("data1", "hello").await.unwrap();
        let item = cms
            .update_item(
                "data1",
                vec![ItemField::new("merge_citygml_status", "select", "成功")],
            )
            .await
            .unwrap();

        comment.assert();
        update.assert();
        assert_eq!(item.id, "data1");
    }
}
