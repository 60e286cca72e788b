//! Provider specific requests and decoders.
//!
//! Each decoder turns the provider JSON into a typed payload or a
//! [`GatewayError`](crate::gateway::GatewayError), so provider payload shapes
//! never reach the slices.
pub mod finance;
pub mod news;
pub mod weather;

pub use finance::{FinanceService, Quote, StockKey, StockSeries, SymbolMatch, TimeRange};
pub use news::{NewsPage, NewsQuery, NewsService};
pub use weather::{WeatherQuery, WeatherReport, WeatherService};
