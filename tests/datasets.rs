// Integration tests for the bundled fortune dataset.
// These tests are native-friendly and avoid wasm/browser APIs.

use std::collections::HashSet;

use cat_fortune::{FORTUNES, MAX_STARS, fortune::fortune_at, star_rating};

#[test]
fn fortunes_are_unique_and_rated() {
    let mut seen = HashSet::new();
    for (stars, message) in FORTUNES {
        assert!(seen.insert(*message), "duplicate fortune '{}'", message);
        assert!(*stars <= MAX_STARS, "fortune '{}' has {} stars", message, stars);
        assert!(!message.trim().is_empty());
    }
}

#[test]
fn every_rating_is_represented() {
    let ratings: HashSet<u8> = FORTUNES.iter().map(|(s, _)| *s).collect();
    for stars in 0..=MAX_STARS {
        assert!(ratings.contains(&stars), "no fortune with {} stars", stars);
    }
}

#[test]
fn star_rating_matches_dataset_width() {
    for index in 0..FORTUNES.len() {
        let f = fortune_at(index);
        let text = star_rating(f.stars, MAX_STARS);
        assert_eq!(text.chars().count(), MAX_STARS as usize);
        assert_eq!(text.chars().filter(|c| *c == '★').count(), f.stars as usize);
    }
}
