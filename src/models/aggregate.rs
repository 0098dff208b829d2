//! # Tour Aggregates
//!
//! Reporting pipelines over the tours collection: per-difficulty statistics
//! for well-rated tours and the number of tour starts per month of a year.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::Serialize;
use serde_json::{json, Value};

use super::tour::DEFAULT_RATING;
use crate::query::{Filter, QuerySpec, Queryable, ShapeError, ShapeResult};
use crate::store::schema::parse_date;
use crate::store::{Collection, StoreResult};

/// Tours rated at least this well count towards the statistics
pub const STATS_MIN_RATING: f64 = DEFAULT_RATING;

/// At most one entry per month
pub const MONTHLY_PLAN_LIMIT: usize = 12;

/// Statistics of one difficulty group
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyStats {
    /// Upper-cased difficulty
    #[serde(rename = "_id")]
    pub difficulty: String,
    pub num_tours: u64,
    pub num_ratings: f64,
    pub avg_rating: f64,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
}

#[derive(Default)]
struct StatsAccumulator {
    tours: u64,
    ratings: f64,
    rating_sum: f64,
    price_sum: f64,
    min_price: Option<f64>,
    max_price: Option<f64>,
}

impl StatsAccumulator {
    fn add(&mut self, tour: &Value) {
        let number = |field: &str| tour.get(field).and_then(Value::as_f64);

        self.tours += 1;
        self.ratings += number("ratingsQuantity").unwrap_or(0.0);
        self.rating_sum += number("ratingsAverage").unwrap_or(DEFAULT_RATING);
        if let Some(price) = number("price") {
            self.price_sum += price;
            self.min_price = Some(self.min_price.map_or(price, |m| m.min(price)));
            self.max_price = Some(self.max_price.map_or(price, |m| m.max(price)));
        }
    }

    fn finish(self, difficulty: String) -> DifficultyStats {
        let count = self.tours.max(1) as f64;
        DifficultyStats {
            difficulty,
            num_tours: self.tours,
            num_ratings: self.ratings,
            avg_rating: self.rating_sum / count,
            avg_price: self.price_sum / count,
            min_price: self.min_price.unwrap_or(0.0),
            max_price: self.max_price.unwrap_or(0.0),
        }
    }
}

/// Group tours rated at least [`STATS_MIN_RATING`] by difficulty, cheapest
/// average price first
pub fn tour_stats(tours: &Collection) -> StoreResult<Vec<DifficultyStats>> {
    let spec = QuerySpec::new().find(Filter::eq("ratingsAverage", json!({"$gte": STATS_MIN_RATING})));

    let mut groups: BTreeMap<String, StatsAccumulator> = BTreeMap::new();
    for tour in tours.run(&spec)? {
        let difficulty = tour
            .get("difficulty")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_uppercase();
        groups.entry(difficulty).or_default().add(&tour);
    }

    let mut stats: Vec<DifficultyStats> = groups
        .into_iter()
        .map(|(difficulty, acc)| acc.finish(difficulty))
        .collect();
    stats.sort_by(|a, b| a.avg_price.total_cmp(&b.avg_price));
    Ok(stats)
}

/// Tour starts within one month
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthPlan {
    pub num_tour_starts: u64,
    /// Names of the tours starting that month, once per start
    pub tours: Vec<String>,
    /// 1 = January
    pub month: u32,
}

/// Tour starts per month of `year`, busiest month first
pub fn monthly_plan(tours: &Collection, year: i32) -> StoreResult<Vec<MonthPlan>> {
    let mut months: BTreeMap<u32, Vec<String>> = BTreeMap::new();

    for tour in tours.all_raw()? {
        let name = tour.get("name").and_then(Value::as_str).unwrap_or_default();
        let starts = tour
            .get("startDates")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for start in starts.iter().filter_map(Value::as_str).filter_map(parse_date) {
            if start.year() == year {
                months.entry(start.month()).or_default().push(name.to_string());
            }
        }
    }

    let mut plan: Vec<MonthPlan> = months
        .into_iter()
        .map(|(month, tours)| MonthPlan {
            num_tour_starts: tours.len() as u64,
            tours,
            month,
        })
        .collect();
    plan.sort_by(|a, b| b.num_tour_starts.cmp(&a.num_tour_starts).then(a.month.cmp(&b.month)));
    plan.truncate(MONTHLY_PLAN_LIMIT);
    Ok(plan)
}

/// Parse the `:year` path segment
pub fn parse_year(raw: &str) -> ShapeResult<i32> {
    raw.trim().parse::<i32>().map_err(|_| ShapeError::InvalidNumber {
        key: "year".to_string(),
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tour;
    use crate::store::Validation;

    fn tours() -> Collection {
        let tours = tour::collection();
        for (name, difficulty, price, rating, dates) in [
            ("The Forest Hiker", "easy", 397, 4.7, vec!["2021-04-25,10:00", "2021-07-20,10:00", "2021-10-05,10:00"]),
            ("The Sea Explorer", "medium", 497, 4.8, vec!["2021-06-19,10:00", "2021-07-20,10:00"]),
            ("The Snow Adventurer", "difficult", 997, 4.5, vec!["2022-01-05,10:00"]),
            ("The City Wanderer", "easy", 1197, 4.6, vec!["2021-03-11,10:00"]),
            ("The Park Camper", "medium", 1497, 4.0, vec!["2021-08-05,10:00"]),
        ] {
            tours
                .insert(
                    json!({
                        "name": name,
                        "duration": 5,
                        "maxGroupSize": 10,
                        "difficulty": difficulty,
                        "price": price,
                        "ratingsAverage": rating,
                        "ratingsQuantity": 10,
                        "summary": "A summary",
                        "imageCover": "cover.jpg",
                        "startDates": dates,
                    }),
                    Validation::Run,
                )
                .unwrap();
        }
        tours
    }

    #[test]
    fn test_tour_stats_groups_by_difficulty() {
        let stats = tour_stats(&tours()).unwrap();
        let ids: Vec<_> = stats.iter().map(|s| s.difficulty.as_str()).collect();
        assert_eq!(ids, vec!["MEDIUM", "EASY", "DIFFICULT"]);

        let easy = &stats[1];
        assert_eq!(easy.num_tours, 2);
        assert_eq!(easy.num_ratings, 20.0);
        assert_eq!(easy.avg_price, 797.0);
        assert_eq!(easy.min_price, 397.0);
        assert_eq!(easy.max_price, 1197.0);

        // The Park Camper is rated below the cut
        assert_eq!(stats[0].num_tours, 1);
    }

    #[test]
    fn test_stats_serialize_with_group_key() {
        let stats = tour_stats(&tours()).unwrap();
        let value = serde_json::to_value(&stats[2]).unwrap();
        assert_eq!(value["_id"], json!("DIFFICULT"));
        assert_eq!(value["numTours"], json!(1));
    }

    #[test]
    fn test_monthly_plan() {
        let plan = monthly_plan(&tours(), 2021).unwrap();
        assert_eq!(plan[0].month, 7);
        assert_eq!(plan[0].num_tour_starts, 2);
        assert_eq!(plan[0].tours, vec!["The Forest Hiker", "The Sea Explorer"]);

        let months: Vec<_> = plan.iter().map(|p| p.month).collect();
        assert_eq!(months, vec![7, 3, 4, 6, 8, 10]);

        let next = monthly_plan(&tours(), 2022).unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].month, 1);
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("2021"), Ok(2021));
        assert!(matches!(parse_year("soon"), Err(ShapeError::InvalidNumber { .. })));
    }
}
