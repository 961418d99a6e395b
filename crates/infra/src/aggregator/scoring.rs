//! Derived metrics: alignment scores and data quality.

use super::profile::{
    AlignmentScores, CampaignFinance, DataQuality, Domain, DomainSlot, NewsArticle,
    QualityLevel, Rating, RatingsRecord, StateLegislator,
};

pub const WORKER_RIGHTS_ORGS: &[&str] = &["AFL-CIO", "Labor", "Union", "Workers"];
pub const HEALTHCARE_ORGS: &[&str] = &["Health", "Medical", "Planned Parenthood"];
pub const ENVIRONMENT_ORGS: &[&str] = &["Sierra Club", "Environment", "Conservation", "Climate"];
pub const EDUCATION_ORGS: &[&str] = &["Education", "Teachers", "NEA", "AFT"];

/// Rounded mean of the numeric ratings from organisations matching any
/// keyword (case-sensitive substring). `None` when nothing numeric matches.
pub fn category_score(ratings: &[Rating], keywords: &[&str]) -> Option<i32> {
    let values: Vec<f64> = ratings
        .iter()
        .filter(|r| keywords.iter().any(|k| r.organization.contains(k)))
        .filter_map(Rating::numeric)
        .collect();
    rounded_mean(&values)
}

/// Scores from whichever ratings succeeded; all `None` if the domain failed.
pub fn alignment_scores(ratings: &DomainSlot<RatingsRecord>) -> AlignmentScores {
    let Some(record) = ratings.available() else {
        return AlignmentScores::default();
    };

    let mut scores = AlignmentScores {
        worker_rights: category_score(&record.ratings, WORKER_RIGHTS_ORGS),
        healthcare: category_score(&record.ratings, HEALTHCARE_ORGS),
        environment: category_score(&record.ratings, ENVIRONMENT_ORGS),
        education: category_score(&record.ratings, EDUCATION_ORGS),
        overall: None,
    };

    let available: Vec<f64> = [
        scores.worker_rights,
        scores.healthcare,
        scores.environment,
        scores.education,
    ]
    .into_iter()
    .flatten()
    .map(f64::from)
    .collect();
    scores.overall = rounded_mean(&available);
    scores
}

/// Weighted completeness over the domains that succeeded.
///
/// Finance up to 30 (20 for money raised, 10 for donors), ratings up to 40
/// (20/10/10 for ratings, positions, votes), news up to 30 (3 per article).
pub fn data_quality(
    finance: &DomainSlot<CampaignFinance>,
    ratings: &DomainSlot<RatingsRecord>,
    news: &DomainSlot<Vec<NewsArticle>>,
    state_info: &DomainSlot<Option<StateLegislator>>,
) -> DataQuality {
    let mut score: u32 = 0;

    if let Some(f) = finance.available().filter(|f| f.total_raised > 0.0) {
        score += 20;
        if !f.top_donors.is_empty() {
            score += 10;
        }
    }

    if let Some(r) = ratings.available() {
        if !r.ratings.is_empty() {
            score += 20;
        }
        if !r.positions.is_empty() {
            score += 10;
        }
        if !r.votes.is_empty() {
            score += 10;
        }
    }

    if let Some(articles) = news.available() {
        score += u32::try_from(articles.len()).unwrap_or(u32::MAX).saturating_mul(3).min(30);
    }

    let flags = [
        finance.is_available(),
        ratings.is_available(),
        news.is_available(),
        state_info.is_available(),
    ];
    let succeeded = flags.iter().filter(|ok| **ok).count();
    let score = score.min(100) as u8;

    DataQuality {
        score,
        level: quality_level(score),
        completeness: succeeded as f64 / Domain::ALL.len() as f64,
        has_campaign_finance: flags[0],
        has_ratings: flags[1],
        has_news: flags[2],
        has_state_info: flags[3],
    }
}

pub fn quality_level(score: u8) -> QualityLevel {
    match score {
        70.. => QualityLevel::Good,
        40..=69 => QualityLevel::Partial,
        _ => QualityLevel::Limited,
    }
}

fn rounded_mean(values: &[f64]) -> Option<i32> {
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Some(mean.round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::profile::{Donor, Position, VoteRecord};
    use proptest::prelude::*;

    fn record(ratings: &[(&str, &str)]) -> RatingsRecord {
        RatingsRecord {
            ratings: ratings.iter().map(|(org, r)| Rating::new(*org, *r)).collect(),
            ..RatingsRecord::default()
        }
    }

    #[test]
    fn categories_use_matching_organisations_only() {
        let slot = DomainSlot::Available(record(&[
            ("AFL-CIO", "90"),
            ("United Auto Workers", "81"),
            ("Sierra Club", "70"),
            ("League of Conservation Voters", "a grade"),
            ("Chamber of Commerce", "10"),
        ]));

        let scores = alignment_scores(&slot);
        assert_eq!(scores.worker_rights, Some(86));
        assert_eq!(scores.environment, Some(70));
        assert_eq!(scores.healthcare, None);
        assert_eq!(scores.education, None);
        assert_eq!(scores.overall, Some(78));
    }

    #[test]
    fn failed_ratings_leave_every_score_unset() {
        let slot: DomainSlot<RatingsRecord> = DomainSlot::unavailable(Domain::Ratings, "timeout");
        assert_eq!(alignment_scores(&slot), AlignmentScores::default());
    }

    #[test]
    fn full_quality_is_good() {
        let finance = DomainSlot::Available(CampaignFinance {
            total_raised: 1_250_000.0,
            top_donors: vec![Donor {
                name: "Jane Doe".to_string(),
                occupation: None,
                employer: None,
                amount: 3300.0,
                date: None,
                city: None,
                state: None,
            }],
            ..CampaignFinance::default()
        });
        let ratings = DomainSlot::Available(RatingsRecord {
            ratings: vec![Rating::new("AFL-CIO", "90")],
            positions: vec![Position {
                issue: "Minimum wage".to_string(),
                stance: "Supports".to_string(),
            }],
            votes: vec![VoteRecord {
                bill: "HR 842".to_string(),
                vote: "Yea".to_string(),
                date: None,
            }],
        });
        let news = DomainSlot::Available(vec![article(); 12]);
        let state = DomainSlot::Available(None);

        let quality = data_quality(&finance, &ratings, &news, &state);
        assert_eq!(quality.score, 100);
        assert_eq!(quality.level, QualityLevel::Good);
        assert_eq!(quality.completeness, 1.0);
        assert!(quality.has_state_info);
    }

    #[test]
    fn one_failed_domain_reduces_but_keeps_completeness() {
        let finance = DomainSlot::unavailable(Domain::CampaignFinance, "FEC down");
        let ratings = DomainSlot::Available(record(&[("NEA", "100")]));
        let news = DomainSlot::Available(vec![article(); 3]);
        let state = DomainSlot::Available(None);

        let quality = data_quality(&finance, &ratings, &news, &state);
        assert_eq!(quality.score, 29);
        assert_eq!(quality.level, QualityLevel::Limited);
        assert_eq!(quality.completeness, 0.75);
        assert!(!quality.has_campaign_finance);
        assert!(quality.has_ratings);
    }

    #[test]
    fn zero_raised_earns_no_finance_points() {
        let finance = DomainSlot::Available(CampaignFinance::default());
        let none = DomainSlot::unavailable(Domain::Ratings, "x");
        let news = DomainSlot::unavailable(Domain::News, "x");
        let state = DomainSlot::unavailable(Domain::StateInfo, "x");

        let quality = data_quality(&finance, &none, &news, &state);
        assert_eq!(quality.score, 0);
        assert_eq!(quality.completeness, 0.25);
    }

    #[test]
    fn levels() {
        assert_eq!(quality_level(70), QualityLevel::Good);
        assert_eq!(quality_level(69), QualityLevel::Partial);
        assert_eq!(quality_level(40), QualityLevel::Partial);
        assert_eq!(quality_level(39), QualityLevel::Limited);
    }

    fn article() -> NewsArticle {
        NewsArticle {
            title: "Lawmaker backs broadband bill".to_string(),
            url: "https://apnews.com/article/1".to_string(),
            snippet: None,
            source: "apnews.com".to_string(),
            published_date: None,
        }
    }

    proptest! {
        #[test]
        fn category_score_stays_within_input_range(values in prop::collection::vec(0u8..=100, 1..20)) {
            let ratings: Vec<Rating> = values
                .iter()
                .map(|v| Rating::new("AFL-CIO", v.to_string()))
                .collect();
            let score = category_score(&ratings, WORKER_RIGHTS_ORGS).unwrap();
            let min = i32::from(*values.iter().min().unwrap());
            let max = i32::from(*values.iter().max().unwrap());
            prop_assert!(score >= min && score <= max);
        }

        #[test]
        fn unmatched_organisations_never_score(org in "[a-z ]{1,20}", value in 0u8..=100) {
            // Lowercase names cannot contain any of the capitalised keywords.
            let ratings = vec![Rating::new(org, value.to_string())];
            prop_assert_eq!(category_score(&ratings, WORKER_RIGHTS_ORGS), None);
            prop_assert_eq!(category_score(&ratings, HEALTHCARE_ORGS), None);
        }

        #[test]
        fn quality_score_never_exceeds_100(articles in 0usize..50, raised in 0.0f64..1e7) {
            let finance = DomainSlot::Available(CampaignFinance { total_raised: raised, ..CampaignFinance::default() });
            let ratings = DomainSlot::Available(record(&[("NEA", "1")]));
            let news = DomainSlot::Available(vec![article(); articles]);
            let state = DomainSlot::Available(None);
            prop_assert!(data_quality(&finance, &ratings, &news, &state).score <= 100);
        }
    }
}
