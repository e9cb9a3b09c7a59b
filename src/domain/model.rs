use serde::{Deserialize, Serialize};

/// 地表上的一個點（十進位度數）。新的讀數會取代舊的，不會就地修改。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
    /// 量測精度（公尺）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// 擷取時間（epoch 毫秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            accuracy: None,
            timestamp: None,
        }
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// 任何可能帶有座標的紀錄；缺少任一分量即視為無座標
pub trait Located {
    fn latitude(&self) -> Option<f64>;
    fn longitude(&self) -> Option<f64>;
}

impl Located for Coordinate {
    fn latitude(&self) -> Option<f64> {
        Some(self.lat)
    }

    fn longitude(&self) -> Option<f64> {
        Some(self.lng)
    }
}

impl Located for (Option<f64>, Option<f64>) {
    fn latitude(&self) -> Option<f64> {
        self.0
    }

    fn longitude(&self) -> Option<f64> {
        self.1
    }
}

/// 後端 `services` 資料表的一列。多餘欄位直接忽略。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub location_lat: Option<f64>,
    #[serde(default)]
    pub location_lng: Option<f64>,
}

impl Located for ServiceRecord {
    fn latitude(&self) -> Option<f64> {
        self.location_lat
    }

    fn longitude(&self) -> Option<f64> {
        self.location_lng
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: String,
    pub business_name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location_lat: Option<f64>,
    #[serde(default)]
    pub location_lng: Option<f64>,
}

impl Located for Vendor {
    fn latitude(&self) -> Option<f64> {
        self.location_lat
    }

    fn longitude(&self) -> Option<f64> {
        self.location_lng
    }
}

impl From<Vendor> for ServiceRecord {
    fn from(vendor: Vendor) -> Self {
        Self {
            id: Some(vendor.id),
            title: Some(vendor.business_name),
            description: None,
            category: vendor.category,
            price: None,
            location_lat: vendor.location_lat,
            location_lng: vendor.location_lng,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    Unknown,
}

impl PermissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionState::Granted => "granted",
            PermissionState::Denied => "denied",
            PermissionState::Unknown => "unknown",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "granted" => PermissionState::Granted,
            "denied" => PermissionState::Denied,
            _ => PermissionState::Unknown,
        }
    }
}

/// 定位請求參數，對應瀏覽器的 PositionOptions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    pub timeout_ms: u64,
    pub maximum_age_ms: u64,
}

impl PositionOptions {
    /// 一次性讀取：不接受任何快取結果
    pub const ONE_SHOT: PositionOptions = PositionOptions {
        enable_high_accuracy: true,
        timeout_ms: 10_000,
        maximum_age_ms: 0,
    };

    /// 持續追蹤：最多接受 1 秒前的讀數
    pub const WATCH: PositionOptions = PositionOptions {
        enable_high_accuracy: true,
        timeout_ms: 10_000,
        maximum_age_ms: 1_000,
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebPushSubscription {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

/// `push_subscriptions` 資料表的一列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub id: String,
    pub user_id: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub subscription: WebPushSubscription,
}

fn default_active() -> bool {
    true
}

/// `notifications` 資料表的一列（站內通知）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub related_id: Option<String>,
    pub notification_type: String,
    #[serde(default)]
    pub is_read: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl NotificationRow {
    pub fn is_read(&self) -> bool {
        self.is_read.unwrap_or(false)
    }
}

/// 推播服務對單一訂閱的回應
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryStatus {
    pub status: u16,
}

impl DeliveryStatus {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 404 / 410 代表訂閱已失效
    pub fn is_gone(&self) -> bool {
        self.status == 404 || self.status == 410
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    pub success: bool,
    pub subscription_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub success: bool,
    pub sent: usize,
    pub total: usize,
    pub results: Vec<DeliveryResult>,
}
