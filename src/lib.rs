//! Headless data layer for a weather, news and finance dashboard.
//!
//! Widgets trigger fetches through [`DashboardDataCache`]; each domain keeps
//! its latest payload together with loading and error flags in a
//! [`FetchSlice`]. Requests go through the [`Gateway`], are decoded by the
//! provider modules and retried with [`RetryPolicy`]. [`WidgetOrder`] holds
//! the drag-reorderable widget layout.
pub mod dashboard;
pub mod gateway;
pub mod logging;
pub mod notifications;
pub mod providers;
pub mod retry;
pub mod settings;
pub mod slice;

pub use dashboard::{Dashboard, DashboardDataCache, DashboardDataSnapshot, WidgetOrder};
pub use gateway::{Gateway, GatewayError, GatewayRequest, SentinelKind};
pub use notifications::{NotificationCenter, NotificationKind};
pub use retry::{with_retry, CancelHandle, CancelToken, RetryError, RetryPolicy};
pub use settings::Settings;
pub use slice::{FetchPhase, FetchSlice, FetchState};
