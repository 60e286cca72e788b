use crate::gateway::{Gateway, GatewayError, GatewayRequest, SentinelKind};
use crate::settings::NewsSettings;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const REMOVED: &str = "[Removed]";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsQuery {
    TopHeadlines { category: String, country: String },
    Search { query: String },
}

impl NewsQuery {
    pub fn headlines(category: impl Into<String>, country: impl Into<String>) -> Self {
        NewsQuery::TopHeadlines {
            category: category.into(),
            country: country.into(),
        }
    }

    pub fn search(query: impl Into<String>) -> Self {
        NewsQuery::Search {
            query: query.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSource {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: String,
    #[serde(default)]
    pub url_to_image: Option<String>,
    pub published_at: DateTime<Utc>,
    pub source: ArticleSource,
    #[serde(default)]
    pub content: Option<String>,
}

impl Article {
    fn is_displayable(&self) -> bool {
        let usable = |field: &Option<String>| {
            field
                .as_deref()
                .map(|s| !s.trim().is_empty() && s != REMOVED)
                .unwrap_or(false)
        };
        usable(&self.title) && usable(&self.description)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsPage {
    pub total_results: u64,
    pub articles: Vec<Article>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPage {
    #[serde(default)]
    total_results: u64,
    #[serde(default)]
    articles: Vec<Article>,
}

/// Validates the `status` envelope and drops removed or empty articles.
pub fn decode_page(value: Value) -> Result<NewsPage, GatewayError> {
    let status = value.get("status").and_then(Value::as_str);
    if status != Some("ok") {
        let code = value
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Failed to fetch news data")
            .to_string();
        let kind = match code.as_str() {
            "rateLimited" => SentinelKind::RateLimited,
            _ => SentinelKind::Provider(code),
        };
        return Err(GatewayError::sentinel(kind, message));
    }
    let raw: RawPage = serde_json::from_value(value)
        .map_err(|err| GatewayError::decode(format!("unexpected news payload: {err}")))?;
    let articles = raw
        .articles
        .into_iter()
        .filter(Article::is_displayable)
        .collect();
    Ok(NewsPage {
        total_results: raw.total_results,
        articles,
    })
}

#[derive(Debug, Clone)]
pub struct NewsService {
    gateway: Gateway,
    settings: NewsSettings,
}

impl NewsService {
    pub fn new(gateway: Gateway, settings: NewsSettings) -> Self {
        Self { gateway, settings }
    }

    pub fn request(&self, query: &NewsQuery) -> Result<GatewayRequest, GatewayError> {
        let base = self.settings.base_url.trim_end_matches('/');
        let request = match query {
            NewsQuery::TopHeadlines { category, country } => {
                GatewayRequest::get(&format!("{base}/top-headlines"))?
                    .param("country", country)
                    .param("category", category)
            }
            NewsQuery::Search { query } => GatewayRequest::get(&format!("{base}/everything"))?
                .param("q", query)
                .param("sortBy", "publishedAt"),
        };
        Ok(request
            .param("pageSize", self.settings.page_size)
            .param("apiKey", &self.settings.api_key))
    }

    pub async fn fetch(&self, query: &NewsQuery) -> Result<NewsPage, GatewayError> {
        let request = self.request(query)?;
        decode_page(self.gateway.fetch(&request).await?)
    }
}
