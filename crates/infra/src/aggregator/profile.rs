//! Aggregated representative profile and its per-domain records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use civicdesk_core::SubjectId;

/// The person a profile is built for, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    #[serde(default)]
    pub party: Option<String>,
    /// Two-letter state code
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub chamber: Chamber,
    /// Required for the campaign-finance domain
    #[serde(default)]
    pub fec_candidate_id: Option<String>,
    #[serde(default)]
    pub contact: ContactInfo,
}

impl Subject {
    pub fn new(id: SubjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            party: None,
            state: None,
            district: None,
            chamber: Chamber::default(),
            fec_candidate_id: None,
            contact: ContactInfo::default(),
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_chamber(mut self, chamber: Chamber) -> Self {
        self.chamber = chamber;
        self
    }

    pub fn with_fec_candidate_id(mut self, id: impl Into<String>) -> Self {
        self.fec_candidate_id = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chamber {
    #[default]
    House,
    Senate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub office: Option<String>,
    #[serde(default)]
    pub contact_form: Option<String>,
}

/// Independent data domains fetched for every profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    CampaignFinance,
    Ratings,
    News,
    StateInfo,
}

impl Domain {
    pub const ALL: [Domain; 4] = [
        Domain::CampaignFinance,
        Domain::Ratings,
        Domain::News,
        Domain::StateInfo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::CampaignFinance => "campaign_finance",
            Domain::Ratings => "ratings",
            Domain::News => "news",
            Domain::StateInfo => "state_info",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why one domain is missing from a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DomainFailure {
    pub domain: Domain,
    pub error: String,
}

/// One domain's data, or the marker saying why it is absent.
///
/// Serialized untagged: either the data itself or `{ "domain", "error" }`.
/// `Unavailable` is listed first so it wins when reading back; its
/// `deny_unknown_fields` keeps real data from being mistaken for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DomainSlot<T> {
    Unavailable(DomainFailure),
    Available(T),
}

impl<T> DomainSlot<T> {
    pub fn unavailable(domain: Domain, error: impl Into<String>) -> Self {
        DomainSlot::Unavailable(DomainFailure {
            domain,
            error: error.into(),
        })
    }

    pub fn is_available(&self) -> bool {
        matches!(self, DomainSlot::Available(_))
    }

    pub fn available(&self) -> Option<&T> {
        match self {
            DomainSlot::Available(value) => Some(value),
            DomainSlot::Unavailable(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&DomainFailure> {
        match self {
            DomainSlot::Unavailable(failure) => Some(failure),
            DomainSlot::Available(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignFinance {
    pub cycle: String,
    pub total_raised: f64,
    pub total_spent: f64,
    pub cash_on_hand: f64,
    pub individual_contributions: f64,
    pub pac_contributions: f64,
    #[serde(default)]
    pub top_donors: Vec<Donor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donor {
    pub name: String,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub employer: Option<String>,
    pub amount: f64,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Interest-group ratings, issue positions and key votes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingsRecord {
    #[serde(default)]
    pub ratings: Vec<Rating>,
    #[serde(default)]
    pub positions: Vec<Position>,
    #[serde(default)]
    pub votes: Vec<VoteRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub organization: String,
    /// As published: usually a number ("85", "92%"), sometimes a grade ("A")
    pub rating: String,
    #[serde(default)]
    pub year: Option<String>,
}

impl Rating {
    pub fn new(organization: impl Into<String>, rating: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            rating: rating.into(),
            year: None,
        }
    }

    /// Leading numeric part of the rating, if any.
    pub fn numeric(&self) -> Option<f64> {
        let text = self.rating.trim_start();
        let end = text
            .char_indices()
            .take_while(|&(i, c)| c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+')))
            .map(|(i, c)| i + c.len_utf8())
            .last()?;
        text[..end].parse::<f64>().ok().filter(|n| n.is_finite())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub issue: String,
    pub stance: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub bill: String,
    pub vote: String,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: Option<String>,
    /// Publisher host, e.g. `apnews.com`
    pub source: String,
    #[serde(default)]
    pub published_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateLegislator {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub party: Option<String>,
    #[serde(default)]
    pub chamber: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub websites: Vec<String>,
    pub state: String,
}

/// Per-category scores (0-100 for typical ratings). `None` means no rating
/// in that category was available, not a score of zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentScores {
    pub worker_rights: Option<i32>,
    pub healthcare: Option<i32>,
    pub environment: Option<i32>,
    pub education: Option<i32>,
    pub overall: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityLevel {
    Good,
    Partial,
    Limited,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQuality {
    /// Weighted 0-100
    pub score: u8,
    pub level: QualityLevel,
    /// Fraction of domains that returned data
    pub completeness: f64,
    pub has_campaign_finance: bool,
    pub has_ratings: bool,
    pub has_news: bool,
    pub has_state_info: bool,
}

/// Composite built once per subject and cached as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedProfile {
    pub id: SubjectId,
    pub name: String,
    pub party: Option<String>,
    pub state: Option<String>,
    pub district: Option<String>,
    pub chamber: Chamber,
    pub contact: ContactInfo,

    pub campaign_finance: DomainSlot<CampaignFinance>,
    pub ratings: DomainSlot<RatingsRecord>,
    pub news: DomainSlot<Vec<NewsArticle>>,
    /// `Available(None)` when the subject has no state-level match
    pub state_info: DomainSlot<Option<StateLegislator>>,

    pub alignment_scores: AlignmentScores,
    pub data_quality: DataQuality,
    pub last_updated: DateTime<Utc>,
    /// Names of the adapters consulted
    pub sources: Vec<String>,
}
