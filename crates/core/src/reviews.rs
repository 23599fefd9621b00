//! Product review models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reviewer identity embedded in a review by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reviewer {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
}

/// One review on a product. Ratings are 1 to 5 stars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: i64,
    #[serde(default)]
    pub product_id: Option<i64>,
    pub rating: u8,
    pub comment: String,
    #[serde(default)]
    pub user: Option<Reviewer>,
    #[serde(default)]
    pub helpful_count: Option<u32>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Payload for posting a review.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewPayload {
    pub rating: u8,
    pub comment: String,
}

/// Mean rating across `reviews`; zero when there are none.
pub fn average_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let sum: u32 = reviews.iter().map(|review| u32::from(review.rating)).sum();
    f64::from(sum) / reviews.len() as f64
}
