use crate::domain::model::{NotificationRow, PushSubscription, ServiceRecord};
use crate::domain::ports::{NotificationSource, ServiceSource, SubscriptionStore};
use crate::utils::error::{ProxiError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;

/// REST client for the hosted backend (PostgREST dialect under `/rest/v1`).
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl BackendClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn ensure_success(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(ProxiError::BackendError {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ServiceSource for BackendClient {
    async fn fetch_services(&self) -> Result<Vec<ServiceRecord>> {
        let url = self.table_url("services");
        tracing::debug!("Making API request to: {}", url);

        let response = self
            .authorized(self.client.get(&url))
            .query(&[("select", "*")])
            .send()
            .await?;
        tracing::debug!("API response status: {}", response.status());

        let response = Self::ensure_success(response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl SubscriptionStore for BackendClient {
    async fn active_subscriptions(&self, user_id: &str) -> Result<Vec<PushSubscription>> {
        let response = self
            .authorized(self.client.get(self.table_url("push_subscriptions")))
            .query(&[
                ("user_id", format!("eq.{}", user_id)),
                ("is_active", "eq.true".to_string()),
                ("select", "*".to_string()),
            ])
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.json().await?)
    }

    async fn deactivate(&self, subscription_id: &str) -> Result<()> {
        let response = self
            .authorized(self.client.patch(self.table_url("push_subscriptions")))
            .query(&[("id", format!("eq.{}", subscription_id))])
            .header("Prefer", "return=minimal")
            .json(&serde_json::json!({ "is_active": false }))
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationSource for BackendClient {
    async fn latest_notifications(
        &self,
        user_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<NotificationRow>> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(user_id) = user_id {
            query.push(("user_id", format!("eq.{}", user_id)));
        }

        let response = self
            .authorized(self.client.get(self.table_url("notifications")))
            .query(&query)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.json().await?)
    }

    async fn mark_read(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let response = self
            .authorized(self.client.patch(self.table_url("notifications")))
            .query(&[("id", format!("in.({})", ids.join(",")))])
            .header("Prefer", "return=minimal")
            .json(&serde_json::json!({ "is_read": true }))
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }
}
