use std::fmt::{self, Display, Formatter};

use async_trait::async_trait;
use itertools::Itertools;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::models::card::{Card, Color};
use crate::opt::*;

/// Scryfall serves search results in fixed pages of this size.
pub const SCRYFALL_PAGE_SIZE: usize = 175;

const USER_AGENT: &str = concat!("edh-draft/", env!("CARGO_PKG_VERSION"));

fn log(s: String) {
    log_if(s.as_str(), DbgFlg::Api);
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    Network(String),
    Status { code: u16, details: String },
    Decode(String),
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            ApiError::Network(err) => write!(f, "network error: {}", err),
            ApiError::Status { code, details } => {
                write!(f, "card service returned {}: {}", code, details)
            }
            ApiError::Decode(err) => write!(f, "unreadable card data: {}", err),
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardPage {
    pub cards: Vec<Card>,
    pub total_count: usize,
    pub has_more: bool,
}

/// Textual search expression in the card service's query syntax.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardFilter {
    terms: Vec<String>,
}

impl CardFilter {
    pub fn new() -> Self {
        CardFilter::default()
    }

    fn term(mut self, term: String) -> Self {
        self.terms.push(term);
        self
    }

    /// Cards playable under a commander with this color identity.
    pub fn within_identity(self, identity: &[Color]) -> Self {
        if identity.is_empty() {
            return self.term("id:c".to_string());
        }
        let symbols: String = identity
            .iter()
            .sorted()
            .dedup()
            .map(|color| color.symbol().to_ascii_lowercase())
            .collect();
        self.term(format!("id<={}", symbols))
    }

    pub fn commanders(self) -> Self {
        self.term("is:commander".to_string())
    }

    pub fn exclude_commanders(self) -> Self {
        self.term("-is:commander".to_string())
    }

    pub fn with_type(self, card_type: &str) -> Self {
        self.term(format!("t:{}", card_type.to_lowercase()))
    }

    pub fn exclude_type(self, card_type: &str) -> Self {
        self.term(format!("-t:{}", card_type.to_lowercase()))
    }

    pub fn legal_in(self, format: &str) -> Self {
        self.term(format!("legal:{}", format))
    }

    /// Exact-name disjunction, e.g. basic land lookups.
    pub fn named_any(self, names: &[&str]) -> Self {
        let names = names
            .iter()
            .map(|name| format!("!\"{}\"", name))
            .join(" or ");
        self.term(format!("({})", names))
    }
}

impl Display for CardFilter {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.terms.join(" "))
    }
}

/// The remote card database: paginated search plus random lookup.
#[async_trait]
pub trait CardQuery: Send + Sync {
    async fn search(&self, filter: &str, page: usize) -> Result<CardPage, ApiError>;

    async fn random_card(&self, filter: &str) -> Result<Card, ApiError>;

    fn page_size(&self) -> usize {
        SCRYFALL_PAGE_SIZE
    }
}

#[derive(Debug, Deserialize)]
struct ScryfallList {
    #[serde(default)]
    total_cards: Option<usize>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ScryfallError {
    #[serde(default)]
    details: String,
}

pub struct ScryfallClient {
    http: reqwest::Client,
    base_url: String,
}

impl ScryfallClient {
    pub fn new(base_url: &str) -> Res<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .err_to_str()?;

        Ok(ScryfallClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        log(format!("GET {} {:?}", url, query));

        self.http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))
    }

    async fn status_error(response: reqwest::Response) -> ApiError {
        let code = response.status().as_u16();
        let details = match response.json::<ScryfallError>().await {
            Ok(body) => body.details,
            Err(_) => String::from("no details"),
        };
        ApiError::Status { code, details }
    }
}

#[async_trait]
impl CardQuery for ScryfallClient {
    async fn search(&self, filter: &str, page: usize) -> Result<CardPage, ApiError> {
        let response = self
            .get(
                "/cards/search",
                &[
                    ("q", filter.to_string()),
                    ("unique", "cards".to_string()),
                    ("page", page.to_string()),
                ],
            )
            .await?;

        // The service answers an empty result set with 404.
        if response.status() == StatusCode::NOT_FOUND {
            log(format!("No cards for [{}] page {}", filter, page));
            return Ok(CardPage::default());
        }
        if !response.status().is_success() {
            return Err(ScryfallClient::status_error(response).await);
        }

        let list: ScryfallList = response
            .json()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))?;

        let received = list.data.len();
        let cards: Vec<Card> = list
            .data
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect();
        if cards.len() < received {
            log(format!("Skipped {} malformed cards", received - cards.len()));
        }

        Ok(CardPage {
            total_count: list.total_cards.unwrap_or(cards.len()),
            has_more: list.has_more,
            cards,
        })
    }

    async fn random_card(&self, filter: &str) -> Result<Card, ApiError> {
        let response = self
            .get("/cards/random", &[("q", filter.to_string())])
            .await?;

        if !response.status().is_success() {
            return Err(ScryfallClient::status_error(response).await);
        }

        response
            .json::<Card>()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))
    }
}

#[cfg(test)]
pub mod fake {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// In-memory card service keyed by exact filter text. Every call
    /// suspends once before answering, like a real round trip.
    #[derive(Default)]
    pub struct FakeCardQuery {
        results: HashMap<String, Vec<Card>>,
        random_pool: Vec<Card>,
        page_size: usize,
        random_cursor: Mutex<usize>,
        failing_calls: Mutex<Vec<usize>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeCardQuery {
        pub fn new(page_size: usize) -> Self {
            FakeCardQuery {
                page_size,
                ..FakeCardQuery::default()
            }
        }

        pub fn with_results(mut self, filter: &str, cards: Vec<Card>) -> Self {
            self.results.insert(filter.to_string(), cards);
            self
        }

        pub fn with_random_pool(mut self, cards: Vec<Card>) -> Self {
            self.random_pool = cards;
            self
        }

        /// The next `count` calls fail with a network error.
        pub fn fail_next(&self, count: usize) {
            let start = self.call_count();
            self.failing_calls.lock().unwrap().extend(start..start + count);
        }

        /// The call with this zero-based index fails with a network error.
        pub fn fail_call(&self, index: usize) {
            self.failing_calls.lock().unwrap().push(index);
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn record(&self, call: String) -> Result<(), ApiError> {
            let mut calls = self.calls.lock().unwrap();
            let index = calls.len();
            calls.push(call);
            if self.failing_calls.lock().unwrap().contains(&index) {
                return Err(ApiError::Network("connection reset".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl CardQuery for FakeCardQuery {
        async fn search(&self, filter: &str, page: usize) -> Result<CardPage, ApiError> {
            tokio::task::yield_now().await;
            self.record(format!("search {} {}", filter, page))?;
            let all = self.results.get(filter).cloned().unwrap_or_default();
            let start = (page.max(1) - 1) * self.page_size;
            let cards: Vec<Card> = all.iter().skip(start).take(self.page_size).cloned().collect();
            Ok(CardPage {
                has_more: start + cards.len() < all.len(),
                total_count: all.len(),
                cards,
            })
        }

        async fn random_card(&self, filter: &str) -> Result<Card, ApiError> {
            tokio::task::yield_now().await;
            self.record(format!("random {}", filter))?;
            let mut cursor = self.random_cursor.lock().unwrap();
            let card = self
                .random_pool
                .get(*cursor % self.random_pool.len().max(1))
                .cloned()
                .ok_or_else(|| ApiError::Status {
                    code: 404,
                    details: "no random card".to_string(),
                })?;
            *cursor += 1;
            Ok(card)
        }

        fn page_size(&self) -> usize {
            self.page_size
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeCardQuery;
    use super::*;
    use crate::models::card::Rarity;

    #[test]
    fn test_filter_text() {
        let filter = CardFilter::new()
            .within_identity(&[Color::G, Color::B, Color::G])
            .exclude_commanders()
            .exclude_type("Land")
            .legal_in("commander");
        assert_eq!(filter.to_string(), "id<=bg -is:commander -t:land legal:commander");

        let colorless = CardFilter::new().within_identity(&[]);
        assert_eq!(colorless.to_string(), "id:c");

        let lands = CardFilter::new().named_any(&["Plains", "Island"]);
        assert_eq!(lands.to_string(), "(!\"Plains\" or !\"Island\")");
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::Status {
            code: 429,
            details: "slow down".to_string(),
        };
        assert_eq!(err.to_string(), "card service returned 429: slow down");
    }

    #[tokio::test]
    async fn test_fake_paging_and_failures() {
        let cards: Vec<Card> = (0..5)
            .map(|i| Card::new(&i.to_string(), &format!("C{}", i), Rarity::Common, "Instant"))
            .collect();
        let api = FakeCardQuery::new(2).with_results("q", cards);

        let page = api.search("q", 3).await.unwrap();
        assert_eq!(page.total_count, 5);
        assert_eq!(page.cards.len(), 1);
        assert!(!page.has_more);

        api.fail_next(1);
        assert!(matches!(api.search("q", 1).await, Err(ApiError::Network(_))));
        assert!(api.search("q", 1).await.unwrap().has_more);
        assert_eq!(api.call_count(), 3);
    }
}
