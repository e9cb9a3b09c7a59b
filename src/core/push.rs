use crate::domain::model::{DeliveryResult, DispatchSummary, PushRequest};
use crate::domain::ports::{PushTransport, SubscriptionStore};
use crate::utils::error::{ProxiError, Result};
use crate::utils::validation::Validate;
use serde_json::json;

pub const NOTIFICATION_ICON: &str = "/logo.png";

pub const CORS_HEADERS: [(&str, &str); 2] = [
    ("Access-Control-Allow-Origin", "*"),
    (
        "Access-Control-Allow-Headers",
        "authorization, x-client-info, apikey, content-type",
    ),
];

impl Validate for PushRequest {
    fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() || self.title.trim().is_empty() || self.body.trim().is_empty()
        {
            return Err(ProxiError::ValidationError {
                message: "userId, title and body are required".to_string(),
            });
        }
        Ok(())
    }
}

/// 通知內容，交給 service worker 顯示
pub fn notification_payload(request: &PushRequest) -> Result<Vec<u8>> {
    let payload = json!({
        "title": request.title,
        "body": request.body,
        "icon": NOTIFICATION_ICON,
        "badge": NOTIFICATION_ICON,
        "data": request.data.clone().unwrap_or_else(|| json!({})),
    });
    Ok(serde_json::to_vec(&payload)?)
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Sent(DispatchSummary),
    NoSubscriptions,
}

/// Fans a notification out to every active subscription of a user, one
/// attempt each. Subscriptions the push service reports as gone are
/// deactivated.
pub struct PushDispatcher<S: SubscriptionStore, T: PushTransport> {
    store: S,
    transport: T,
}

impl<S: SubscriptionStore, T: PushTransport> PushDispatcher<S, T> {
    pub fn new(store: S, transport: T) -> Self {
        Self { store, transport }
    }

    pub async fn dispatch(&self, request: &PushRequest) -> Result<DispatchOutcome> {
        request.validate()?;

        let subscriptions = self.store.active_subscriptions(&request.user_id).await?;
        if subscriptions.is_empty() {
            tracing::info!("📭 No active subscriptions for user {}", request.user_id);
            return Ok(DispatchOutcome::NoSubscriptions);
        }

        let payload = notification_payload(request)?;
        tracing::info!(
            "📤 Sending '{}' to {} subscription(s) of user {}",
            request.title,
            subscriptions.len(),
            request.user_id
        );

        let mut results = Vec::with_capacity(subscriptions.len());
        for subscription in &subscriptions {
            let result = match self
                .transport
                .deliver(&subscription.subscription, &payload)
                .await
            {
                Ok(status) if status.is_success() => DeliveryResult {
                    success: true,
                    subscription_id: subscription.id.clone(),
                    error: None,
                },
                Ok(status) => {
                    tracing::error!(
                        "❌ Push failed for subscription {}: HTTP {}",
                        subscription.id,
                        status.status
                    );
                    if status.is_gone() {
                        match self.store.deactivate(&subscription.id).await {
                            Ok(()) => tracing::info!(
                                "🗑️ Deactivated expired subscription {}",
                                subscription.id
                            ),
                            Err(e) => tracing::error!(
                                "❌ Could not deactivate subscription {}: {}",
                                subscription.id,
                                e
                            ),
                        }
                    }
                    DeliveryResult {
                        success: false,
                        subscription_id: subscription.id.clone(),
                        error: Some(format!("push service responded with HTTP {}", status.status)),
                    }
                }
                Err(e) => {
                    tracing::error!(
                        "❌ Error sending push to subscription {}: {}",
                        subscription.id,
                        e
                    );
                    DeliveryResult {
                        success: false,
                        subscription_id: subscription.id.clone(),
                        error: Some(e.to_string()),
                    }
                }
            };
            results.push(result);
        }

        let sent = results.iter().filter(|r| r.success).count();
        tracing::info!("✅ Delivered {}/{} notifications", sent, results.len());

        Ok(DispatchOutcome::Sent(DispatchSummary {
            success: true,
            sent,
            total: subscriptions.len(),
            results,
        }))
    }
}

/// HTTP status and JSON body for a dispatch result.
#[derive(Debug, Clone, PartialEq)]
pub struct PushResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl PushResponse {
    pub fn from_result(result: Result<DispatchOutcome>) -> Self {
        match result {
            Ok(DispatchOutcome::Sent(summary)) => match serde_json::to_value(&summary) {
                Ok(body) => Self { status: 200, body },
                Err(e) => Self::error(500, &e.to_string()),
            },
            Ok(DispatchOutcome::NoSubscriptions) => Self {
                status: 404,
                body: json!({ "success": false, "message": "No active subscriptions found" }),
            },
            Err(ProxiError::ValidationError { message }) => Self::error(400, &message),
            Err(e) => {
                tracing::error!("❌ Error in send-push-notification: {}", e);
                Self::error(500, &e.to_string())
            }
        }
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: json!({ "error": message }),
        }
    }
}
