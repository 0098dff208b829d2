//! # Tour Model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{is_present, text_len};
use crate::store::{Collection, CollectionSchema, DurationWeeks, FieldDef, Slugify, StoreError, StoreResult};

pub const COLLECTION: &str = "tours";

/// Accepted difficulty levels
pub const DIFFICULTIES: [&str; 3] = ["easy", "medium", "difficult"];

pub const NAME_MIN_LEN: usize = 10;
pub const NAME_MAX_LEN: usize = 40;

/// Rating a tour carries before its first review
pub const DEFAULT_RATING: f64 = 4.5;

/// Typed view of a stored tour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tour {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub duration: f64,
    pub max_group_size: f64,
    pub difficulty: String,
    #[serde(default = "default_rating")]
    pub ratings_average: f64,
    #[serde(default)]
    pub ratings_quantity: f64,
    pub price: f64,
    #[serde(default)]
    pub price_discount: Option<f64>,
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    pub image_cover: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub start_dates: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

fn default_rating() -> f64 {
    DEFAULT_RATING
}

impl Tour {
    pub fn from_document(doc: Value) -> StoreResult<Self> {
        serde_json::from_value(doc).map_err(|e| StoreError::decode(COLLECTION, e))
    }
}

pub fn schema() -> CollectionSchema {
    CollectionSchema::new(COLLECTION)
        .field("name", FieldDef::text().trim())
        .field("slug", FieldDef::text())
        .field("duration", FieldDef::number())
        .field("maxGroupSize", FieldDef::number())
        .field("difficulty", FieldDef::text())
        .field("ratingsAverage", FieldDef::number().default_value(DEFAULT_RATING))
        .field("ratingsQuantity", FieldDef::number().default_value(0))
        .field("price", FieldDef::number())
        .field("priceDiscount", FieldDef::number())
        .field("summary", FieldDef::text().trim())
        .field("description", FieldDef::text().trim())
        .field("imageCover", FieldDef::text())
        .field("images", FieldDef::text().list())
        .field("createdAt", FieldDef::date().default_now())
        .field("startDates", FieldDef::date().list())
        .unique(["name"])
        .validator(validate)
}

/// The tours collection with its decorators attached
pub fn collection() -> Collection {
    Collection::new(schema()).decorate(Slugify).decorate(DurationWeeks)
}

/// Validation rules for a tour document
pub fn validate(doc: &Map<String, Value>) -> Vec<String> {
    let mut errors = Vec::new();

    match text_len(doc, "name") {
        None => errors.push("A tour must have a name".to_string()),
        Some(len) if len > NAME_MAX_LEN => errors.push(format!(
            "A tour name must have less or equal than {NAME_MAX_LEN} characters"
        )),
        Some(len) if len < NAME_MIN_LEN => errors.push(format!(
            "A tour name must have more or equal than {NAME_MIN_LEN} characters"
        )),
        Some(_) => {}
    }

    for (field, message) in [
        ("duration", "A tour must have a duration"),
        ("maxGroupSize", "A tour must have a group size"),
        ("price", "A tour must have a price"),
        ("summary", "A tour must have a summary"),
        ("imageCover", "A tour must have a cover image"),
    ] {
        if !is_present(doc, field) {
            errors.push(message.to_string());
        }
    }

    match doc.get("difficulty").and_then(Value::as_str) {
        None => errors.push("A tour must have a difficulty".to_string()),
        Some(d) if !DIFFICULTIES.contains(&d) => {
            errors.push("Difficulty is either: easy, medium, difficult".to_string())
        }
        Some(_) => {}
    }

    if let Some(rating) = doc.get("ratingsAverage").and_then(Value::as_f64) {
        if rating < 1.0 {
            errors.push("Rating must be above 1.0".to_string());
        } else if rating > 5.0 {
            errors.push("Rating must be below 5.0".to_string());
        }
    }

    let price = doc.get("price").and_then(Value::as_f64);
    let discount = doc.get("priceDiscount").and_then(Value::as_f64);
    if let (Some(price), Some(discount)) = (price, discount) {
        if discount >= price {
            errors.push(format!(
                "Discount price ({discount}) should be below regular price"
            ));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Validation;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "name": "The Forest Hiker",
            "duration": 5,
            "maxGroupSize": 25,
            "difficulty": "easy",
            "price": 397,
            "summary": "Breathtaking hike through the Canadian Banff National Park",
            "imageCover": "tour-1-cover.jpg",
            "startDates": ["2021-04-25,10:00", "2021-07-20,10:00"]
        })
    }

    #[test]
    fn test_insert_applies_defaults_and_decorators() {
        let tours = collection();
        let doc = tours.insert(valid(), Validation::Run).unwrap();

        assert_eq!(doc["slug"], json!("the-forest-hiker"));
        assert_eq!(doc["ratingsAverage"], json!(4.5));
        assert_eq!(doc["ratingsQuantity"], json!(0));
        assert_eq!(doc["durationWeeks"].as_f64(), Some(5.0 / 7.0));
        assert_eq!(doc["startDates"][0], json!("2021-04-25T10:00:00.000Z"));

        let tour = Tour::from_document(doc).unwrap();
        assert_eq!(tour.difficulty, "easy");
        assert_eq!(tour.start_dates.len(), 2);
    }

    #[test]
    fn test_required_fields() {
        let messages = validate(&Map::new());
        assert!(messages.contains(&"A tour must have a name".to_string()));
        assert!(messages.contains(&"A tour must have a price".to_string()));
        assert!(messages.contains(&"A tour must have a difficulty".to_string()));
    }

    #[test]
    fn test_name_length_and_difficulty() {
        let tours = collection();
        let mut doc = valid();
        doc["name"] = json!("Short");
        doc["difficulty"] = json!("extreme");

        let err = tours.insert(doc, Validation::Run).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid input data. A tour name must have more or equal than 10 characters. \
             Difficulty is either: easy, medium, difficult"
        );
    }

    #[test]
    fn test_price_discount_below_price() {
        let mut doc = valid();
        doc["priceDiscount"] = json!(400);
        let Value::Object(map) = doc else { unreachable!() };
        assert_eq!(
            validate(&map),
            vec!["Discount price (400) should be below regular price".to_string()]
        );
    }

    #[test]
    fn test_rating_bounds() {
        let mut doc = valid();
        doc["ratingsAverage"] = json!(6);
        let Value::Object(map) = doc else { unreachable!() };
        assert_eq!(validate(&map), vec!["Rating must be below 5.0".to_string()]);
    }
}
