use crate::gateway::{Gateway, GatewayError};
use crate::notifications::{NotificationCenter, NotificationKind};
use crate::providers::finance::{FinanceService, Quote, StockKey, StockSeries, SymbolMatch};
use crate::providers::news::{NewsPage, NewsQuery, NewsService};
use crate::providers::weather::{WeatherQuery, WeatherReport, WeatherService};
use crate::retry::{CancelHandle, RetryError, RetryPolicy};
use crate::settings::Settings;
use crate::slice::{FetchSlice, FetchState};
use std::fmt::Debug;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardDataSnapshot {
    pub weather: FetchState<WeatherReport>,
    pub news: FetchState<NewsPage>,
    pub stock: FetchState<StockSeries>,
    pub quote: FetchState<Quote>,
}

struct DashboardDataState {
    weather: FetchSlice<WeatherQuery, WeatherReport>,
    news: FetchSlice<NewsQuery, NewsPage>,
    stock: FetchSlice<StockKey, StockSeries>,
    quote: FetchSlice<String, Quote>,
}

impl DashboardDataState {
    fn new() -> Self {
        Self {
            weather: FetchSlice::new("weather"),
            news: FetchSlice::new("news"),
            stock: FetchSlice::new("finance"),
            quote: FetchSlice::new("quote"),
        }
    }

    fn cancel_inflight(&mut self) {
        self.weather.cancel_inflight();
        self.news.cancel_inflight();
        self.stock.cancel_inflight();
        self.quote.cancel_inflight();
    }

    fn snapshot(&self) -> DashboardDataSnapshot {
        DashboardDataSnapshot {
            weather: self.weather.state().clone(),
            news: self.news.state().clone(),
            stock: self.stock.state().clone(),
            quote: self.quote.state().clone(),
        }
    }
}

fn weather_slice(state: &mut DashboardDataState) -> &mut FetchSlice<WeatherQuery, WeatherReport> {
    &mut state.weather
}

fn news_slice(state: &mut DashboardDataState) -> &mut FetchSlice<NewsQuery, NewsPage> {
    &mut state.news
}

fn stock_slice(state: &mut DashboardDataState) -> &mut FetchSlice<StockKey, StockSeries> {
    &mut state.stock
}

fn quote_slice(state: &mut DashboardDataState) -> &mut FetchSlice<String, Quote> {
    &mut state.quote
}

/// Owns the weather, news and finance slices and the services that fill them.
///
/// Fetches run on the caller's task; the lock is never held across an await,
/// so any number of fetches can be interleaved on a single thread.
pub struct DashboardDataCache {
    state: Mutex<DashboardDataState>,
    weather: WeatherService,
    news: NewsService,
    finance: FinanceService,
    retry: RetryPolicy,
    notifications: Option<NotificationCenter>,
    cancel: CancelHandle,
}

impl DashboardDataCache {
    pub fn new(
        weather: WeatherService,
        news: NewsService,
        finance: FinanceService,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            state: Mutex::new(DashboardDataState::new()),
            weather,
            news,
            finance,
            retry,
            notifications: None,
            cancel: CancelHandle::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let gateway = Gateway::new(settings.request_timeout())?;
        Ok(Self::new(
            WeatherService::new(gateway.clone(), settings.weather.clone()),
            NewsService::new(gateway.clone(), settings.news.clone()),
            FinanceService::new(gateway, settings.finance.clone()),
            settings.retry.policy(),
        ))
    }

    /// Failed fetches are also reported as error notifications.
    pub fn with_notifications(mut self, center: NotificationCenter) -> Self {
        self.notifications = Some(center);
        self
    }

    pub fn snapshot(&self) -> DashboardDataSnapshot {
        self.lock().snapshot()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub async fn fetch_weather(&self, query: WeatherQuery) -> bool {
        let service = &self.weather;
        let q = &query;
        self.drive(weather_slice, query.clone(), move || service.report(q)).await
    }

    pub async fn fetch_news(&self, query: NewsQuery) -> bool {
        let service = &self.news;
        let q = &query;
        self.drive(news_slice, query.clone(), move || service.fetch(q)).await
    }

    pub async fn fetch_stock(&self, key: StockKey) -> bool {
        let service = &self.finance;
        let k = &key;
        self.drive(stock_slice, key.clone(), move || service.series(k)).await
    }

    pub async fn fetch_quote(&self, symbol: &str) -> bool {
        let symbol = symbol.trim().to_ascii_uppercase();
        let service = &self.finance;
        let s = symbol.as_str();
        self.drive(quote_slice, symbol.clone(), move || service.quote(s)).await
    }

    /// Symbol lookups are returned directly and not kept in any slice.
    pub async fn search_symbols(&self, keywords: &str) -> Result<Vec<SymbolMatch>, GatewayError> {
        let service = &self.finance;
        self.retry
            .run_cancellable(move || service.search(keywords), &self.cancel.token())
            .await
            .map_err(RetryError::into_inner)
    }

    /// Fetches every widget's default topic concurrently.
    pub async fn refresh_defaults(&self, settings: &Settings) {
        tokio::join!(
            self.fetch_weather(WeatherQuery::city(&settings.weather.default_city)),
            self.fetch_news(NewsQuery::headlines(
                &settings.news.default_category,
                &settings.news.country
            )),
            self.fetch_stock(StockKey::new(
                &settings.finance.default_symbol,
                settings.finance.default_range
            )),
            self.fetch_quote(&settings.finance.default_symbol),
        );
    }

    /// Cancels all pending retry delays, including those of fetches already
    /// in flight. Later fetches and searches fail after their first attempt.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.lock().cancel_inflight();
    }

    fn lock(&self) -> MutexGuard<'_, DashboardDataState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn drive<K, T, F, Fut>(
        &self,
        select: fn(&mut DashboardDataState) -> &mut FetchSlice<K, T>,
        key: K,
        op: F,
    ) -> bool
    where
        K: Clone + Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let ticket = {
            let mut state = self.lock();
            let slice = select(&mut state);
            let ticket = slice.begin(key);
            if self.cancel.is_cancelled() {
                slice.cancel_inflight();
            }
            ticket
        };
        let result = self.retry.run_cancellable(op, ticket.cancel_token()).await;

        let mut state = self.lock();
        let slice = select(&mut state);
        match result {
            Ok(data) => slice.fulfill(&ticket, data),
            Err(RetryError::Exhausted(err)) => {
                let name = slice.name();
                let message = err.user_message();
                tracing::warn!(slice = name, key = ?ticket.key(), "fetch failed: {err}");
                let applied = slice.reject(&ticket, message.clone());
                drop(state);
                if applied {
                    if let Some(center) = &self.notifications {
                        center.push(NotificationKind::Error, format!("{name}: {message}"));
                    }
                }
                applied
            }
            Err(RetryError::Cancelled(err)) => {
                tracing::debug!(slice = slice.name(), "fetch cancelled after: {err}");
                slice.abandon(&ticket)
            }
        }
    }
}
