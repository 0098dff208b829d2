//! # Review Model
//!
//! A review belongs to one tour and one user, and a user reviews a tour at
//! most once. The tour's rating summary is derived from its reviews and must
//! be recomputed after every review write with [`recalc_ratings`].

use serde::Serialize;
use serde_json::{json, Map, Value};

use super::is_present;
use super::tour::DEFAULT_RATING;
use crate::store::{Collection, CollectionSchema, FieldDef, StoreResult, Validation};

pub const COLLECTION: &str = "reviews";

pub const RATING_MIN: f64 = 1.0;
pub const RATING_MAX: f64 = 5.0;

pub fn schema() -> CollectionSchema {
    CollectionSchema::new(COLLECTION)
        .field("review", FieldDef::text().trim())
        .field("rating", FieldDef::number())
        .field("createdAt", FieldDef::date().default_now())
        .field("tour", FieldDef::id())
        .field("user", FieldDef::id())
        .unique(["tour", "user"])
        .validator(validate)
}

/// Validation rules for a review document
pub fn validate(doc: &Map<String, Value>) -> Vec<String> {
    let mut errors = Vec::new();

    if !is_present(doc, "review") {
        errors.push("Review cannot be empty!".to_string());
    }

    if let Some(rating) = doc.get("rating").and_then(Value::as_f64) {
        if rating < RATING_MIN {
            errors.push("Rating must be above 1.0".to_string());
        } else if rating > RATING_MAX {
            errors.push("Rating must be below 5.0".to_string());
        }
    }

    if !is_present(doc, "tour") {
        errors.push("Review must belong to a tour.".to_string());
    }
    if !is_present(doc, "user") {
        errors.push("Review must belong to a user.".to_string());
    }

    errors
}

/// Rating figures stored on a tour
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub ratings_quantity: u64,
    pub ratings_average: f64,
}

impl RatingSummary {
    /// Summary of a tour nobody has reviewed yet
    pub fn unrated() -> Self {
        Self {
            ratings_quantity: 0,
            ratings_average: DEFAULT_RATING,
        }
    }

    /// Summarize the reviews in `reviews` that belong to `tour_id`. Reviews
    /// without a rating are counted but do not move the average.
    pub fn of_tour(reviews: &[Value], tour_id: &str) -> Self {
        let of_tour: Vec<&Value> = reviews
            .iter()
            .filter(|review| review.get("tour").and_then(Value::as_str) == Some(tour_id))
            .collect();

        if of_tour.is_empty() {
            return Self::unrated();
        }

        let ratings: Vec<f64> = of_tour
            .iter()
            .filter_map(|review| review.get("rating").and_then(Value::as_f64))
            .collect();
        let ratings_average = if ratings.is_empty() {
            DEFAULT_RATING
        } else {
            ratings.iter().sum::<f64>() / ratings.len() as f64
        };

        Self {
            ratings_quantity: of_tour.len() as u64,
            ratings_average,
        }
    }
}

/// Recompute a tour's rating summary from the stored reviews and write it to
/// the tour. A tour that no longer exists is skipped.
pub fn recalc_ratings(reviews: &Collection, tours: &Collection, tour_id: &str) -> StoreResult<RatingSummary> {
    let summary = RatingSummary::of_tour(&reviews.all_raw()?, tour_id);

    let updated = tours.update_by_id(
        tour_id,
        json!({
            "ratingsQuantity": summary.ratings_quantity,
            "ratingsAverage": summary.ratings_average,
        }),
        Validation::Skip,
    )?;
    if updated.is_none() {
        tracing::debug!(tour = %tour_id, "rating summary skipped: tour not found");
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Database;

    fn tour(db: &Database) -> String {
        let doc = db
            .tours
            .insert(
                json!({
                    "name": "The Sea Explorer",
                    "duration": 7,
                    "maxGroupSize": 15,
                    "difficulty": "medium",
                    "price": 497,
                    "summary": "Exploring the jaw-dropping US east coast",
                    "imageCover": "tour-2-cover.jpg"
                }),
                Validation::Run,
            )
            .unwrap();
        doc["_id"].as_str().unwrap().to_string()
    }

    fn user(db: &Database, email: &str) -> String {
        let doc = db
            .users
            .insert(
                json!({
                    "name": "Reviewer",
                    "email": email,
                    "password": "pass1234",
                    "passwordConfirm": "pass1234"
                }),
                Validation::Run,
            )
            .unwrap();
        doc["_id"].as_str().unwrap().to_string()
    }

    fn review(tour: &str, user: &str, rating: f64) -> Value {
        json!({"review": "Lovely trip", "rating": rating, "tour": tour, "user": user})
    }

    #[test]
    fn test_review_requires_fields() {
        let messages = validate(&Map::new());
        assert_eq!(
            messages,
            vec![
                "Review cannot be empty!".to_string(),
                "Review must belong to a tour.".to_string(),
                "Review must belong to a user.".to_string(),
            ]
        );
    }

    #[test]
    fn test_one_review_per_user_and_tour() {
        let db = Database::open();
        let tour_id = tour(&db);
        let user_id = user(&db, "r1@example.com");

        db.reviews.insert(review(&tour_id, &user_id, 4.0), Validation::Run).unwrap();
        let err = db
            .reviews
            .insert(review(&tour_id, &user_id, 5.0), Validation::Run)
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_loaded_review_embeds_author() {
        let db = Database::open();
        let tour_id = tour(&db);
        let user_id = user(&db, "r2@example.com");

        let created = db.reviews.insert(review(&tour_id, &user_id, 4.0), Validation::Run).unwrap();
        assert_eq!(created["user"]["name"], json!("Reviewer"));
        assert_eq!(created["user"]["_id"], json!(user_id));
        assert!(created["user"].get("email").is_none());
    }

    #[test]
    fn test_recalc_ratings() {
        let db = Database::open();
        let tour_id = tour(&db);
        let first = user(&db, "r3@example.com");
        let second = user(&db, "r4@example.com");

        db.reviews.insert(review(&tour_id, &first, 4.0), Validation::Run).unwrap();
        let latest = db.reviews.insert(review(&tour_id, &second, 5.0), Validation::Run).unwrap();

        let summary = recalc_ratings(&db.reviews, &db.tours, &tour_id).unwrap();
        assert_eq!(summary.ratings_quantity, 2);
        assert_eq!(summary.ratings_average, 4.5);

        db.reviews.delete_by_id(latest["_id"].as_str().unwrap()).unwrap();
        recalc_ratings(&db.reviews, &db.tours, &tour_id).unwrap();
        let stored = db.tours.find_by_id(&tour_id).unwrap().unwrap();
        assert_eq!(stored["ratingsQuantity"], json!(1));
        assert_eq!(stored["ratingsAverage"], json!(4.0));
    }

    #[test]
    fn test_unreviewed_tour_resets() {
        let summary = RatingSummary::of_tour(&[], "missing");
        assert_eq!(summary, RatingSummary::unrated());
        assert_eq!(summary.ratings_average, 4.5);
    }
}
