use crate::gateway::{Gateway, GatewayError, GatewayRequest, SentinelKind};
use crate::settings::FinanceSettings;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "1D")]
    Day,
    #[serde(rename = "1W")]
    Week,
    #[serde(rename = "1M")]
    Month,
    #[serde(rename = "1Y")]
    Year,
}

impl Default for TimeRange {
    fn default() -> Self {
        TimeRange::Month
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeRange::Day => "1D",
            TimeRange::Week => "1W",
            TimeRange::Month => "1M",
            TimeRange::Year => "1Y",
        };
        f.write_str(s)
    }
}

impl FromStr for TimeRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "1D" => Ok(TimeRange::Day),
            "1W" => Ok(TimeRange::Week),
            "1M" => Ok(TimeRange::Month),
            "1Y" => Ok(TimeRange::Year),
            other => anyhow::bail!("unknown range '{other}'"),
        }
    }
}

impl TimeRange {
    /// How far back from the newest candle the series reaches.
    pub fn window(self) -> Duration {
        match self {
            TimeRange::Day => Duration::days(1),
            TimeRange::Week => Duration::days(7),
            TimeRange::Month => Duration::days(30),
            TimeRange::Year => Duration::days(365),
        }
    }

    fn function(self) -> &'static str {
        match self {
            TimeRange::Day => "TIME_SERIES_INTRADAY",
            _ => "TIME_SERIES_DAILY",
        }
    }

    fn output_size(self) -> &'static str {
        match self {
            TimeRange::Year => "full",
            _ => "compact",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockKey {
    pub symbol: String,
    pub range: TimeRange,
}

impl StockKey {
    pub fn new(symbol: impl AsRef<str>, range: TimeRange) -> Self {
        Self {
            symbol: symbol.as_ref().trim().to_ascii_uppercase(),
            range,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSeries {
    pub symbol: String,
    pub interval: String,
    /// Oldest first.
    pub candles: Vec<Candle>,
}

impl StockSeries {
    pub fn latest(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Close-to-close change over the whole series, in percent.
    pub fn change_percent(&self) -> Option<f64> {
        let first = self.candles.first()?.close;
        let last = self.candles.last()?.close;
        if first == 0.0 {
            return None;
        }
        Some((last - first) * 100.0 / first)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub high: f64,
    pub low: f64,
    pub open: f64,
    pub previous_close: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMatch {
    pub symbol: String,
    pub name: String,
    pub kind: String,
    pub region: String,
    pub currency: String,
}

/// Alpha Vantage reports failures as string fields in a 200 response.
fn check_sentinel(value: &Value) -> Result<(), GatewayError> {
    let field = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
    if let Some(note) = field("Note") {
        return Err(GatewayError::sentinel(SentinelKind::RateLimited, note));
    }
    if let Some(info) = field("Information") {
        let kind = if mentions_rate_limit(&info) {
            SentinelKind::RateLimited
        } else {
            SentinelKind::Provider("Information".into())
        };
        return Err(GatewayError::sentinel(kind, info));
    }
    if let Some(message) = field("Error Message") {
        return Err(GatewayError::sentinel(SentinelKind::InvalidSymbol, message));
    }
    Ok(())
}

/// `Information` is used for both call-frequency notices and premium-only
/// endpoints.
fn mentions_rate_limit(text: &str) -> bool {
    let text = text.to_ascii_lowercase();
    ["call frequency", "rate limit", "requests per day", "calls per minute"]
        .iter()
        .any(|needle| text.contains(needle))
}

fn object<'a>(value: &'a Value, key: &str) -> Result<&'a Map<String, Value>, GatewayError> {
    value
        .get(key)
        .and_then(Value::as_object)
        .ok_or_else(|| GatewayError::decode(format!("missing '{key}' section")))
}

fn text<'a>(obj: &'a Map<String, Value>, key: &str) -> Result<&'a str, GatewayError> {
    obj.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::decode(format!("missing field '{key}'")))
}

fn number<T: FromStr>(obj: &Map<String, Value>, key: &str) -> Result<T, GatewayError> {
    let raw = text(obj, key)?;
    raw.trim()
        .trim_end_matches('%')
        .parse()
        .map_err(|_| GatewayError::decode(format!("field '{key}' is not numeric: '{raw}'")))
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, GatewayError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| GatewayError::decode(format!("bad timestamp '{raw}'")))
}

pub fn decode_series(value: Value, range: TimeRange) -> Result<StockSeries, GatewayError> {
    check_sentinel(&value)?;
    let meta = object(&value, "Meta Data")?;
    let symbol = text(meta, "2. Symbol")?.to_string();
    let (series_key, entries) = value
        .as_object()
        .and_then(|obj| {
            obj.iter()
                .find(|(k, _)| k.starts_with("Time Series"))
                .and_then(|(k, v)| v.as_object().map(|entries| (k.as_str(), entries)))
        })
        .ok_or_else(|| GatewayError::decode("missing time series section"))?;
    let interval = series_key
        .split_once('(')
        .map(|(_, rest)| rest.trim_end_matches(')').to_string())
        .unwrap_or_default();

    let mut candles = entries
        .iter()
        .map(|(ts, entry)| {
            let fields = entry
                .as_object()
                .ok_or_else(|| GatewayError::decode(format!("entry '{ts}' is not an object")))?;
            Ok(Candle {
                timestamp: parse_timestamp(ts)?,
                open: number(fields, "1. open")?,
                high: number(fields, "2. high")?,
                low: number(fields, "3. low")?,
                close: number(fields, "4. close")?,
                volume: number(fields, "5. volume")?,
            })
        })
        .collect::<Result<Vec<_>, GatewayError>>()?;
    candles.sort_by_key(|c| c.timestamp);

    if let Some(newest) = candles.last().map(|c| c.timestamp) {
        let cutoff = newest - range.window();
        candles.retain(|c| c.timestamp >= cutoff);
    }

    Ok(StockSeries {
        symbol,
        interval,
        candles,
    })
}

pub fn decode_quote(value: Value) -> Result<Quote, GatewayError> {
    check_sentinel(&value)?;
    let quote = object(&value, "Global Quote")?;
    if quote.is_empty() {
        return Err(GatewayError::decode("No quote available for this symbol"));
    }
    Ok(Quote {
        symbol: text(quote, "01. symbol")?.to_string(),
        open: number(quote, "02. open")?,
        high: number(quote, "03. high")?,
        low: number(quote, "04. low")?,
        price: number(quote, "05. price")?,
        volume: number(quote, "06. volume")?,
        previous_close: number(quote, "08. previous close")?,
        change: number(quote, "09. change")?,
        change_percent: number(quote, "10. change percent")?,
    })
}

pub fn decode_symbol_search(value: Value) -> Result<Vec<SymbolMatch>, GatewayError> {
    check_sentinel(&value)?;
    let matches = value
        .get("bestMatches")
        .and_then(Value::as_array)
        .ok_or_else(|| GatewayError::decode("missing 'bestMatches' section"))?;
    matches
        .iter()
        .map(|m| {
            let obj = m
                .as_object()
                .ok_or_else(|| GatewayError::decode("symbol match is not an object"))?;
            Ok(SymbolMatch {
                symbol: text(obj, "1. symbol")?.to_string(),
                name: text(obj, "2. name")?.to_string(),
                kind: text(obj, "3. type").unwrap_or_default().to_string(),
                region: text(obj, "4. region").unwrap_or_default().to_string(),
                currency: text(obj, "8. currency").unwrap_or_default().to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct FinanceService {
    gateway: Gateway,
    settings: FinanceSettings,
}

impl FinanceService {
    pub fn new(gateway: Gateway, settings: FinanceSettings) -> Self {
        Self { gateway, settings }
    }

    fn query(&self, function: &str) -> Result<GatewayRequest, GatewayError> {
        Ok(GatewayRequest::get(&self.settings.base_url)?.param("function", function))
    }

    pub fn series_request(&self, key: &StockKey) -> Result<GatewayRequest, GatewayError> {
        let mut request = self
            .query(key.range.function())?
            .param("symbol", &key.symbol)
            .param("outputsize", key.range.output_size());
        if key.range == TimeRange::Day {
            request = request.param("interval", "60min");
        }
        Ok(request.param("apikey", &self.settings.api_key))
    }

    pub async fn series(&self, key: &StockKey) -> Result<StockSeries, GatewayError> {
        let request = self.series_request(key)?;
        decode_series(self.gateway.fetch(&request).await?, key.range)
    }

    pub async fn quote(&self, symbol: &str) -> Result<Quote, GatewayError> {
        let request = self
            .query("GLOBAL_QUOTE")?
            .param("symbol", symbol)
            .param("apikey", &self.settings.api_key);
        decode_quote(self.gateway.fetch(&request).await?)
    }

    pub async fn search(&self, keywords: &str) -> Result<Vec<SymbolMatch>, GatewayError> {
        let request = self
            .query("SYMBOL_SEARCH")?
            .param("keywords", keywords)
            .param("apikey", &self.settings.api_key);
        decode_symbol_search(self.gateway.fetch(&request).await?)
    }
}
