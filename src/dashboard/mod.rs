pub mod dashboard;
pub mod data_cache;
pub mod layout;

pub use dashboard::{normalize_widgets, Dashboard, ThemeMode, UiState};
pub use data_cache::{DashboardDataCache, DashboardDataSnapshot};
pub use layout::{Bounds, DragSession, WidgetOrder};
