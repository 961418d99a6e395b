//! Campaign finance from the FEC OpenFEC API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::aggregator::{CampaignFinance, DomainSource, Donor, SourceError, Subject};

pub const DEFAULT_BASE_URL: &str = "https://api.open.fec.gov/v1";
const TOP_DONORS: u32 = 20;

#[derive(Debug, Clone)]
pub struct FecConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl FecConfig {
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

pub struct FecFinanceSource {
    client: reqwest::Client,
    config: FecConfig,
}

impl FecFinanceSource {
    pub fn new(config: FecConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let url = format!("{}{path}", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("api_key", self.config.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|err| SourceError::Decode(err.to_string()))
    }
}

#[async_trait]
impl DomainSource for FecFinanceSource {
    type Output = CampaignFinance;

    fn name(&self) -> &str {
        "FEC (Federal Election Commission)"
    }

    async fn fetch(&self, subject: &Subject) -> Result<CampaignFinance, SourceError> {
        let candidate = subject
            .fec_candidate_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or(SourceError::MissingIdentifier("FEC candidate id"))?;
        let cycle = current_cycle(Utc::now().year());

        debug!(candidate, cycle, "fetching FEC totals");
        let totals_path = format!("/candidate/{candidate}/totals/");
        let totals_query = [("cycle", cycle.to_string()), ("sort", "-cycle".to_string())];
        let donors_query = [
            ("candidate_id", candidate.to_string()),
            ("two_year_transaction_period", cycle.to_string()),
            ("sort", "-contribution_receipt_amount".to_string()),
            ("per_page", TOP_DONORS.to_string()),
        ];

        let (totals, donors) = tokio::try_join!(
            self.get::<Page<Totals>>(&totals_path, &totals_query),
            self.get::<Page<Contribution>>("/schedules/schedule_a/", &donors_query),
        )?;
        Ok(to_finance(cycle, totals, donors))
    }
}

/// Two-year election cycle containing `year` (cycles end on even years).
pub fn current_cycle(year: i32) -> i32 {
    year + year.rem_euclid(2)
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Totals {
    receipts: Option<f64>,
    disbursements: Option<f64>,
    cash_on_hand_end_period: Option<f64>,
    individual_contributions: Option<f64>,
    other_political_committee_contributions: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Contribution {
    contributor_name: Option<String>,
    contributor_occupation: Option<String>,
    contributor_employer: Option<String>,
    contribution_receipt_amount: Option<f64>,
    contribution_receipt_date: Option<String>,
    contributor_city: Option<String>,
    contributor_state: Option<String>,
}

fn to_finance(cycle: i32, totals: Page<Totals>, donors: Page<Contribution>) -> CampaignFinance {
    let totals = totals.results.into_iter().next().unwrap_or_default();
    CampaignFinance {
        cycle: cycle.to_string(),
        total_raised: totals.receipts.unwrap_or(0.0),
        total_spent: totals.disbursements.unwrap_or(0.0),
        cash_on_hand: totals.cash_on_hand_end_period.unwrap_or(0.0),
        individual_contributions: totals.individual_contributions.unwrap_or(0.0),
        pac_contributions: totals.other_political_committee_contributions.unwrap_or(0.0),
        top_donors: donors
            .results
            .into_iter()
            .filter_map(|c| {
                Some(Donor {
                    name: c.contributor_name?,
                    occupation: c.contributor_occupation,
                    employer: c.contributor_employer,
                    amount: c.contribution_receipt_amount.unwrap_or(0.0),
                    date: c.contribution_receipt_date,
                    city: c.contributor_city,
                    state: c.contributor_state,
                })
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civicdesk_core::SubjectId;
    use serde_json::json;

    #[test]
    fn cycle_rounds_up_to_even_year() {
        assert_eq!(current_cycle(2025), 2026);
        assert_eq!(current_cycle(2026), 2026);
    }

    #[test]
    fn maps_totals_and_named_donors() {
        let totals: Page<Totals> = serde_json::from_value(json!({
            "results": [{
                "receipts": 1250000.5,
                "disbursements": 900000.0,
                "cash_on_hand_end_period": 350000.5,
                "individual_contributions": 1000000.0,
                "other_political_committee_contributions": 250000.5
            }]
        }))
        .unwrap();
        let donors: Page<Contribution> = serde_json::from_value(json!({
            "results": [
                {"contributor_name": "DOE, JANE", "contribution_receipt_amount": 3300.0, "contributor_state": "WA"},
                {"contributor_name": null, "contribution_receipt_amount": 10.0}
            ]
        }))
        .unwrap();

        let finance = to_finance(2026, totals, donors);
        assert_eq!(finance.cycle, "2026");
        assert_eq!(finance.total_raised, 1250000.5);
        assert_eq!(finance.pac_contributions, 250000.5);
        assert_eq!(finance.top_donors.len(), 1);
        assert_eq!(finance.top_donors[0].name, "DOE, JANE");
    }

    #[test]
    fn empty_results_give_zero_totals() {
        let totals: Page<Totals> = serde_json::from_value(json!({"results": []})).unwrap();
        let donors: Page<Contribution> = serde_json::from_value(json!({})).unwrap();
        let finance = to_finance(2026, totals, donors);
        assert_eq!(finance.total_raised, 0.0);
        assert!(finance.top_donors.is_empty());
    }

    #[tokio::test]
    async fn missing_candidate_id_fails_without_a_request() {
        let source = FecFinanceSource::new(
            FecConfig::new("DEMO_KEY").with_base_url("http://127.0.0.1:9"),
        )
        .unwrap();
        let subject = Subject::new(SubjectId::new("A000360").unwrap(), "Ada Lovelace");

        assert!(matches!(
            source.fetch(&subject).await,
            Err(SourceError::MissingIdentifier(_))
        ));
    }
}
