use crate::sdk::geo::Coordinate;
use std::collections::HashMap;

/// Lookups already answered during this session. Never written to disk.
#[derive(Default, Debug)]
pub struct GeoCache {
    lookups: HashMap<String, Coordinate>,
    places: HashMap<String, Coordinate>,
}

/// Queries that differ only in case or surrounding whitespace share an entry.
fn normalize(query: &str) -> String {
    query.trim().to_lowercase()
}

impl GeoCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_lookup(&self, query: &str) -> Option<Coordinate> {
        self.lookups.get(&normalize(query)).copied()
    }

    pub fn insert_lookup(&mut self, query: &str, coord: Coordinate) {
        self.lookups.insert(normalize(query), coord);
    }

    pub fn get_place(&self, place_id: &str) -> Option<Coordinate> {
        self.places.get(place_id).copied()
    }

    pub fn insert_place(&mut self, place_id: &str, coord: Coordinate) {
        self.places.insert(place_id.to_string(), coord);
    }

    pub fn len(&self) -> usize {
        self.lookups.len() + self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
