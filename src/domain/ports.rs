use crate::domain::model::{
    Coordinate, DeliveryStatus, NotificationRow, PermissionState, PositionOptions,
    PushSubscription, ServiceRecord, WebPushSubscription,
};
use crate::utils::error::{GeolocationError, Result};
use async_trait::async_trait;

/// 時間來源（epoch 毫秒），測試時可注入固定時鐘
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// 類似瀏覽器 localStorage 的字串鍵值儲存
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// 平台是否支援定位
    fn is_supported(&self) -> bool {
        true
    }

    /// 查詢權限狀態；`None` 表示平台沒有權限查詢 API
    async fn permission(&self) -> Option<PermissionState>;

    async fn current_position(
        &self,
        options: PositionOptions,
    ) -> std::result::Result<Coordinate, GeolocationError>;
}

#[async_trait]
pub trait ServiceSource: Send + Sync {
    async fn fetch_services(&self) -> Result<Vec<ServiceRecord>>;
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn active_subscriptions(&self, user_id: &str) -> Result<Vec<PushSubscription>>;
    async fn deactivate(&self, subscription_id: &str) -> Result<()>;
}

#[async_trait]
pub trait NotificationSource: Send + Sync {
    /// 最新的通知在前，最多 `limit` 筆
    async fn latest_notifications(
        &self,
        user_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<NotificationRow>>;

    async fn mark_read(&self, ids: &[String]) -> Result<()>;
}

#[async_trait]
pub trait PushTransport: Send + Sync {
    /// 加密並送出一則推播；非 2xx 回應以 `DeliveryStatus` 回傳而不是錯誤
    async fn deliver(
        &self,
        subscription: &WebPushSubscription,
        payload: &[u8],
    ) -> Result<DeliveryStatus>;
}
