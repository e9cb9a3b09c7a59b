use crate::core::webpush::{self, VapidSigner};
use crate::domain::model::{DeliveryStatus, WebPushSubscription};
use crate::domain::ports::PushTransport;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_TTL_SECONDS: u64 = 86_400;

/// Sends encrypted Web Push messages straight to each subscription's push service.
#[derive(Debug, Clone)]
pub struct WebPushTransport {
    client: Client,
    signer: VapidSigner,
    ttl_seconds: u64,
}

impl WebPushTransport {
    pub fn new(signer: VapidSigner, ttl_seconds: u64, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            signer,
            ttl_seconds,
        })
    }
}

#[async_trait]
impl PushTransport for WebPushTransport {
    async fn deliver(
        &self,
        subscription: &WebPushSubscription,
        payload: &[u8],
    ) -> Result<DeliveryStatus> {
        let body = webpush::encrypt(payload, &subscription.keys)?;
        let authorization = self
            .signer
            .authorization(&subscription.endpoint, chrono::Utc::now().timestamp())?;

        tracing::debug!(
            "📡 POST {} ({} encrypted bytes)",
            subscription.endpoint,
            body.len()
        );
        let response = self
            .client
            .post(&subscription.endpoint)
            .header("TTL", self.ttl_seconds.to_string())
            .header("Content-Encoding", "aes128gcm")
            .header("Content-Type", "application/octet-stream")
            .header("Authorization", authorization)
            .body(body)
            .send()
            .await?;

        Ok(DeliveryStatus {
            status: response.status().as_u16(),
        })
    }
}
