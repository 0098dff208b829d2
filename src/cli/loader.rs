//! Seed import
//!
//! Loads `tours.json`, `users.json` and `reviews.json` from a directory into a
//! [`Database`]. A missing file is skipped; a present one must hold a JSON
//! array of documents.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use super::errors::{CliError, CliResult};
use crate::models::review::recalc_ratings;
use crate::models::Database;
use crate::store::{Collection, Validation};

pub const TOURS_FILE: &str = "tours.json";
pub const USERS_FILE: &str = "users.json";
pub const REVIEWS_FILE: &str = "reviews.json";

/// Documents imported per collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedCounts {
    pub tours: usize,
    pub users: usize,
    pub reviews: usize,
}

fn read_documents(dir: &Path, file: &str) -> CliResult<Vec<Value>> {
    let path = dir.join(file);
    if !path.exists() {
        tracing::warn!(path = %path.display(), "seed file missing, skipped");
        return Ok(Vec::new());
    }

    let text = fs::read_to_string(&path).map_err(|source| CliError::SeedRead {
        path: path.clone(),
        source,
    })?;
    match serde_json::from_str(&text) {
        Ok(Value::Array(documents)) => Ok(documents),
        Ok(_) => Err(CliError::SeedNotArray { path }),
        Err(source) => Err(CliError::SeedJson { path, source }),
    }
}

fn insert_all(collection: &Collection, documents: Vec<Value>, validation: Validation) -> CliResult<usize> {
    let count = documents.len();
    for document in documents {
        collection.insert(document, validation)?;
    }
    Ok(count)
}

/// Import the seed files in `dir`.
///
/// Tours and reviews are validated. Users skip validation so seed files can
/// carry pre-hashed passwords without a confirmation; plaintext passwords are
/// still hashed on the way in. Each reviewed tour gets its rating summary
/// recomputed afterwards.
pub fn import_seed(db: &Database, dir: &Path) -> CliResult<SeedCounts> {
    let tours = read_documents(dir, TOURS_FILE)?;
    let users = read_documents(dir, USERS_FILE)?;
    let reviews = read_documents(dir, REVIEWS_FILE)?;

    let reviewed: BTreeSet<String> = reviews
        .iter()
        .filter_map(|review| review.get("tour").and_then(Value::as_str))
        .map(str::to_string)
        .collect();

    let counts = SeedCounts {
        tours: insert_all(&db.tours, tours, Validation::Run)?,
        users: insert_all(&db.users, users, Validation::Skip)?,
        reviews: insert_all(&db.reviews, reviews, Validation::Run)?,
    };

    for tour_id in &reviewed {
        recalc_ratings(&db.reviews, &db.tours, tour_id)?;
    }

    tracing::info!(
        dir = %dir.display(),
        tours = counts.tours,
        users = counts.users,
        reviews = counts.reviews,
        "seed imported"
    );
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Projection;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &TempDir, file: &str, value: Value) {
        fs::write(dir.path().join(file), value.to_string()).unwrap();
    }

    #[test]
    fn test_import_recomputes_ratings() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            TOURS_FILE,
            json!([{
                "_id": "t1",
                "name": "The Forest Hiker",
                "duration": 5,
                "maxGroupSize": 25,
                "difficulty": "easy",
                "price": 397,
                "summary": "Breathtaking hike through the Canadian Banff National Park",
                "imageCover": "tour-1-cover.jpg"
            }]),
        );
        write(
            &dir,
            USERS_FILE,
            json!([
                {"_id": "u1", "name": "Ann", "email": "ann@example.io", "password": "test1234"},
                {"_id": "u2", "name": "Bob", "email": "bob@example.io", "password": "test1234"}
            ]),
        );
        write(
            &dir,
            REVIEWS_FILE,
            json!([
                {"review": "Great", "rating": 5, "tour": "t1", "user": "u1"},
                {"review": "Fine", "rating": 4, "tour": "t1", "user": "u2"}
            ]),
        );

        let db = Database::open();
        let counts = import_seed(&db, dir.path()).unwrap();
        assert_eq!(counts, SeedCounts { tours: 1, users: 2, reviews: 2 });

        let tour = db.tours.find_by_id("t1").unwrap().unwrap();
        assert_eq!(tour["ratingsQuantity"], json!(2));
        assert_eq!(tour["ratingsAverage"], json!(4.5));
    }

    #[test]
    fn test_plaintext_seed_passwords_are_hashed() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            USERS_FILE,
            json!([{"_id": "u1", "name": "Ann", "email": "ann@example.io", "password": "test1234"}]),
        );

        let db = Database::open();
        import_seed(&db, dir.path()).unwrap();

        let user = db
            .users
            .find_by_id_with("u1", Some(&Projection::parse("+password")))
            .unwrap()
            .unwrap();
        let stored = user["password"].as_str().unwrap();
        assert!(crate::auth::crypto::is_password_hash(stored));
    }

    #[test]
    fn test_missing_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        let counts = import_seed(&Database::open(), dir.path()).unwrap();
        assert_eq!(counts, SeedCounts::default());
    }

    #[test]
    fn test_non_array_seed_is_rejected() {
        let dir = TempDir::new().unwrap();
        write(&dir, TOURS_FILE, json!({"name": "x"}));
        let err = import_seed(&Database::open(), dir.path()).unwrap_err();
        assert!(matches!(err, CliError::SeedNotArray { .. }));
    }

    #[test]
    fn test_invalid_tour_aborts_import() {
        let dir = TempDir::new().unwrap();
        write(&dir, TOURS_FILE, json!([{"name": "short"}]));
        let err = import_seed(&Database::open(), dir.path()).unwrap_err();
        assert!(matches!(err, CliError::Store(_)));
    }
}
