use crate::dashboard::data_cache::DashboardDataCache;
use crate::dashboard::layout::{Bounds, WidgetOrder};
use crate::notifications::NotificationCenter;
use crate::settings::Settings;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
    System,
}

impl Default for ThemeMode {
    fn default() -> Self {
        ThemeMode::System
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    pub theme: ThemeMode,
    pub sidebar_open: bool,
    pub active_widget: Option<String>,
    pub dragging: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            theme: ThemeMode::default(),
            sidebar_open: true,
            active_widget: None,
            dragging: false,
        }
    }
}

/// Drop blank and repeated widget ids, keeping first occurrences in order.
pub fn normalize_widgets(widgets: &[String]) -> (Vec<String>, Vec<String>) {
    let mut seen = HashSet::new();
    let mut normalized = Vec::new();
    let mut warnings = Vec::new();
    for id in widgets {
        let id = id.trim();
        if id.is_empty() {
            warnings.push("dropping widget with empty id".to_string());
            continue;
        }
        if !seen.insert(id.to_string()) {
            warnings.push(format!("dropping duplicate widget '{id}'"));
            continue;
        }
        normalized.push(id.to_string());
    }
    (normalized, warnings)
}

/// Everything a widget handler needs, passed explicitly instead of living in
/// a process wide store.
pub struct Dashboard {
    data: Arc<DashboardDataCache>,
    notifications: NotificationCenter,
    layout: WidgetOrder<String>,
    ui: UiState,
    warnings: Vec<String>,
}

impl Dashboard {
    pub fn new(
        data: Arc<DashboardDataCache>,
        notifications: NotificationCenter,
        widgets: &[String],
    ) -> Self {
        let (widgets, warnings) = normalize_widgets(widgets);
        for warning in &warnings {
            tracing::warn!("{warning}");
        }
        Self {
            data,
            notifications,
            layout: WidgetOrder::new(widgets),
            ui: UiState::default(),
            warnings,
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let notifications = NotificationCenter::new(settings.notification_duration());
        let data = DashboardDataCache::from_settings(settings)?
            .with_notifications(notifications.clone());
        Ok(Self::new(Arc::new(data), notifications, &settings.widgets))
    }

    pub fn data(&self) -> &Arc<DashboardDataCache> {
        &self.data
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn layout(&self) -> &WidgetOrder<String> {
        &self.layout
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    /// Problems found while normalising the configured widget list.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn toggle_sidebar(&mut self) {
        self.ui.sidebar_open = !self.ui.sidebar_open;
    }

    pub fn set_theme(&mut self, theme: ThemeMode) {
        tracing::debug!(?theme, "theme changed");
        self.ui.theme = theme;
    }

    pub fn set_active_widget(&mut self, id: Option<&str>) {
        self.ui.active_widget = id.map(str::to_string);
    }

    /// # Panics
    /// If `index` is not a widget position.
    pub fn begin_drag(&mut self, index: usize) {
        self.layout.begin_drag(index);
        self.ui.dragging = true;
        self.ui.active_widget = self.layout.items().get(index).cloned();
    }

    pub fn hover(&mut self, over_index: usize, pointer_y: f32, bounds: Bounds) -> bool {
        self.layout.hover(over_index, pointer_y, bounds)
    }

    pub fn end_drag(&mut self) {
        if let Some(session) = self.layout.end_drag() {
            tracing::debug!(
                from = session.origin_index,
                to = session.dragged_index,
                "widget reordered"
            );
        }
        self.ui.dragging = false;
    }

    pub fn cancel_drag(&mut self) {
        self.layout.cancel_drag();
        self.ui.dragging = false;
    }

    /// Cancels pending retries and notification timers.
    pub fn shutdown(&self) {
        self.data.shutdown();
        self.notifications.shutdown();
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.shutdown();
    }
}
