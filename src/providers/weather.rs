use crate::gateway::{Gateway, GatewayError, GatewayRequest, SentinelKind};
use crate::settings::WeatherSettings;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CURRENT_LOCATION: &str = "Current Location";

/// Which location a weather fetch targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherQuery {
    City(String),
    Coordinates {
        lat: f64,
        lon: f64,
        #[serde(default)]
        label: Option<String>,
    },
}

impl WeatherQuery {
    pub fn city(name: impl Into<String>) -> Self {
        WeatherQuery::City(name.into())
    }

    pub fn coordinates(lat: f64, lon: f64) -> Self {
        WeatherQuery::Coordinates {
            lat,
            lon,
            label: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub state: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub main: String,
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temp: f64,
    #[serde(default)]
    pub feels_like: Option<f64>,
    pub humidity: f64,
    pub wind_speed: f64,
    #[serde(default)]
    pub visibility: Option<f64>,
    #[serde(default)]
    pub weather: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTemp {
    pub day: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub dt: i64,
    pub temp: DailyTemp,
    pub humidity: f64,
    #[serde(default)]
    pub weather: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecast {
    pub dt: i64,
    pub temp: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct OneCall {
    current: CurrentConditions,
    #[serde(default)]
    daily: Vec<DailyForecast>,
    #[serde(default)]
    hourly: Vec<HourlyForecast>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub city: String,
    pub current: CurrentConditions,
    pub daily: Vec<DailyForecast>,
    pub hourly: Vec<HourlyForecast>,
}

impl WeatherReport {
    pub fn summary(&self) -> String {
        let desc = self
            .current
            .weather
            .first()
            .map(|c| c.description.as_str())
            .unwrap_or("unknown");
        format!("{}: {:.1}°, {desc}", self.city, self.current.temp)
    }
}

/// OpenWeather reports some failures as `{"cod": "...", "message": "..."}`.
fn check_sentinel(value: &Value) -> Result<(), GatewayError> {
    let Some(obj) = value.as_object() else {
        return Ok(());
    };
    let (Some(cod), Some(message)) = (obj.get("cod"), obj.get("message")) else {
        return Ok(());
    };
    let code = match cod {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if code == "200" {
        return Ok(());
    }
    let message = message.as_str().unwrap_or("weather provider error").to_string();
    let kind = if code == "429" {
        SentinelKind::RateLimited
    } else {
        SentinelKind::Provider(code)
    };
    Err(GatewayError::sentinel(kind, message))
}

/// First geocoding hit; an empty result list means the city is unknown.
pub fn decode_geocode(value: Value) -> Result<GeoLocation, GatewayError> {
    check_sentinel(&value)?;
    let hits: Vec<GeoLocation> = serde_json::from_value(value)
        .map_err(|err| GatewayError::decode(format!("unexpected geocoding payload: {err}")))?;
    hits.into_iter()
        .next()
        .ok_or_else(|| GatewayError::decode("Location not found"))
}

pub fn decode_one_call(
    value: Value,
    city: impl Into<String>,
) -> Result<WeatherReport, GatewayError> {
    check_sentinel(&value)?;
    let raw: OneCall = serde_json::from_value(value)
        .map_err(|err| GatewayError::decode(format!("unexpected weather payload: {err}")))?;
    Ok(WeatherReport {
        city: city.into(),
        current: raw.current,
        daily: raw.daily,
        hourly: raw.hourly,
    })
}

#[derive(Debug, Clone)]
pub struct WeatherService {
    gateway: Gateway,
    settings: WeatherSettings,
}

impl WeatherService {
    pub fn new(gateway: Gateway, settings: WeatherSettings) -> Self {
        Self { gateway, settings }
    }

    pub fn geocode_request(&self, city: &str) -> Result<GatewayRequest, GatewayError> {
        Ok(GatewayRequest::get(&self.settings.geocode_url)?
            .param("q", city)
            .param("limit", 1)
            .param("appid", &self.settings.api_key))
    }

    pub fn one_call_request(&self, lat: f64, lon: f64) -> Result<GatewayRequest, GatewayError> {
        Ok(GatewayRequest::get(&self.settings.data_url)?
            .param("lat", lat)
            .param("lon", lon)
            .param("exclude", "minutely,alerts")
            .param("units", &self.settings.units)
            .param("appid", &self.settings.api_key))
    }

    pub async fn geocode(&self, city: &str) -> Result<GeoLocation, GatewayError> {
        let request = self.geocode_request(city)?;
        decode_geocode(self.gateway.fetch(&request).await?)
    }

    pub async fn report(&self, query: &WeatherQuery) -> Result<WeatherReport, GatewayError> {
        let (lat, lon, city) = match query {
            WeatherQuery::City(name) => {
                let location = self.geocode(name).await?;
                (location.lat, location.lon, location.name)
            }
            WeatherQuery::Coordinates { lat, lon, label } => (
                *lat,
                *lon,
                label.clone().unwrap_or_else(|| CURRENT_LOCATION.to_string()),
            ),
        };
        let request = self.one_call_request(lat, lon)?;
        decode_one_call(self.gateway.fetch(&request).await?, city)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn one_call() -> Value {
        json!({
            "current": {
                "temp": 21.5,
                "feels_like": 20.9,
                "humidity": 40,
                "wind_speed": 3.2,
                "visibility": 10000,
                "weather": [{"main": "Clouds", "description": "broken clouds", "icon": "04d"}]
            },
            "daily": [{"dt": 1700000000, "temp": {"day": 20.0, "min": 12.0, "max": 23.0}, "humidity": 55}],
            "hourly": [{"dt": 1700003600, "temp": 19.0, "humidity": 60}]
        })
    }

    #[test]
    fn empty_geocode_is_location_not_found() {
        let err = decode_geocode(json!([])).unwrap_err();
        assert_eq!(err, GatewayError::decode("Location not found"));
    }

    #[test]
    fn geocode_takes_first_hit() {
        let loc = decode_geocode(json!([
            {"name": "Paris", "country": "FR", "lat": 48.85, "lon": 2.35},
            {"name": "Paris", "country": "US", "state": "Texas", "lat": 33.66, "lon": -95.55}
        ]))
        .unwrap();
        assert_eq!(loc.country, "FR");
        assert!(loc.state.is_none());
    }

    #[test]
    fn one_call_decodes_all_sections() {
        let report = decode_one_call(one_call(), "Oslo").unwrap();
        assert_eq!(report.city, "Oslo");
        assert_eq!(report.current.weather[0].main, "Clouds");
        assert_eq!(report.daily[0].temp.max, 23.0);
        assert_eq!(report.hourly.len(), 1);
        assert_eq!(report.summary(), "Oslo: 21.5°, broken clouds");
    }

    #[test]
    fn missing_current_block_is_decode_error() {
        let err = decode_one_call(json!({"daily": []}), "x").unwrap_err();
        assert!(matches!(err, GatewayError::Decode { .. }));
    }

    #[test]
    fn cod_message_body_is_sentinel() {
        let err = decode_geocode(json!({"cod": 401, "message": "Invalid API key"})).unwrap_err();
        assert_eq!(
            err,
            GatewayError::sentinel(SentinelKind::Provider("401".into()), "Invalid API key")
        );
        let err = decode_one_call(json!({"cod": "429", "message": "slow down"}), "x").unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[test]
    fn coordinates_query_defaults_label() {
        let q = WeatherQuery::coordinates(1.0, 2.0);
        assert_eq!(
            q,
            WeatherQuery::Coordinates {
                lat: 1.0,
                lon: 2.0,
                label: None
            }
        );
    }
}
