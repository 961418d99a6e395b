//! State legislators from the OpenStates v3 API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::aggregator::{Chamber, DomainSource, SourceError, StateLegislator, Subject};

pub const DEFAULT_BASE_URL: &str = "https://v3.openstates.org";

#[derive(Debug, Clone)]
pub struct OpenStatesConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl OpenStatesConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct OpenStatesSource {
    client: reqwest::Client,
    config: OpenStatesConfig,
}

impl OpenStatesSource {
    pub fn new(config: OpenStatesConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl DomainSource for OpenStatesSource {
    type Output = Option<StateLegislator>;

    fn name(&self) -> &str {
        "OpenStates.org"
    }

    /// `Ok(None)` for senators, stateless subjects and unmatched names.
    async fn fetch(&self, subject: &Subject) -> Result<Option<StateLegislator>, SourceError> {
        let Some(state) = subject.state.as_deref().filter(|s| !s.trim().is_empty()) else {
            return Ok(None);
        };
        if subject.chamber == Chamber::Senate {
            return Ok(None);
        }

        let mut query = vec![
            ("jurisdiction", state.to_lowercase()),
            ("per_page", "50".to_string()),
        ];
        if let Some(district) = &subject.district {
            query.push(("district", district.clone()));
        }

        debug!(state, "fetching state legislators");
        let url = format!("{}/people", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .header("X-API-Key", &self.config.api_key)
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        let page: PeoplePage = response
            .json()
            .await
            .map_err(|err| SourceError::Decode(err.to_string()))?;

        Ok(find_match(page, &subject.name, state))
    }
}

#[derive(Debug, Deserialize)]
struct PeoplePage {
    #[serde(default)]
    results: Vec<Person>,
}

#[derive(Debug, Deserialize)]
struct Person {
    id: String,
    name: String,
    #[serde(default)]
    party: Option<String>,
    #[serde(default)]
    current_role: Option<Role>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Role {
    #[serde(default)]
    title: Option<String>,
    /// String or number depending on the state
    #[serde(default)]
    district: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
struct Link {
    url: String,
}

/// First legislator whose name contains `name`, case-insensitively.
fn find_match(page: PeoplePage, name: &str, state: &str) -> Option<StateLegislator> {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    let person = page
        .results
        .into_iter()
        .find(|p| p.name.to_lowercase().contains(&needle))?;
    let (chamber, district) = match person.current_role {
        Some(role) => (role.title, role.district.and_then(district_text)),
        None => (None, None),
    };

    Some(StateLegislator {
        id: person.id,
        name: person.name,
        party: person.party,
        chamber,
        district,
        email: person.email,
        photo_url: person.image,
        websites: person.links.into_iter().map(|l| l.url).collect(),
        state: state.to_uppercase(),
    })
}

fn district_text(value: JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
