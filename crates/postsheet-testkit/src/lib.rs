// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use postsheet_app::{RowField, RowId, RowStore};
use postsheet_http::{Delivery, Transport};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

const FIRST_NAMES: [&str; 16] = [
    "avery", "jordan", "taylor", "riley", "morgan", "casey", "alex", "quinn", "parker", "drew",
    "kai", "elliot", "robin", "cameron", "hayden", "rowan",
];

const BRANDS: [&str; 12] = [
    "bakery", "studio", "coffee", "florist", "salon", "gym", "books", "vintage", "ramen",
    "tailor", "garden", "records",
];

const CITIES: [&str; 10] = [
    "austin", "seattle", "denver", "madison", "raleigh", "portland", "boise", "phoenix",
    "nashville", "omaha",
];

const LABELS: [&str; 6] = ["launch", "promo", "weekly", "event", "restock", "holiday"];

const POST_OPENERS: [&str; 8] = [
    "New arrivals this week",
    "Behind the scenes",
    "Thanks for 1k followers",
    "Weekend hours",
    "Meet the team",
    "Customer spotlight",
    "Fresh batch out of the oven",
    "Last call for the sale",
];

const POST_CLOSERS: [&str; 6] = [
    "see you soon",
    "link in bio",
    "tag a friend",
    "drop a reply with your pick",
    "come say hi",
    "limited stock",
];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn chance(&mut self, percent: u64) -> bool {
        self.next_u64() % 100 < percent
    }
}

/// Plausible account rows from a fixed seed.
#[derive(Debug, Clone)]
pub struct SheetFaker {
    rng: DeterministicRng,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeRow {
    pub account: String,
    pub business_account: String,
    pub label: String,
    pub contents: [String; 3],
}

impl SheetFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn row(&mut self) -> FakeRow {
        let first = self.pick(&FIRST_NAMES);
        let brand = self.pick(&BRANDS);
        let city = self.pick(&CITIES);
        let contents = [self.post(), self.maybe_post(), self.maybe_post()];
        FakeRow {
            account: format!("@{first}.{brand}"),
            business_account: format!("@{city}_{brand}_{}", self.rng.int_n(90) + 10),
            label: self.pick(&LABELS).to_owned(),
            contents,
        }
    }

    /// Appends `count` generated rows to `store` and returns their ids.
    pub fn fill(&mut self, store: &mut RowStore, count: usize) -> Vec<RowId> {
        (0..count)
            .map(|_| {
                let fake = self.row();
                let id = store.add_row();
                store.update_field(id, RowField::Account, fake.account);
                store.update_field(id, RowField::BusinessAccount, fake.business_account);
                store.update_field(id, RowField::Label, fake.label);
                for (field, content) in RowField::CONTENT.into_iter().zip(fake.contents) {
                    store.update_field(id, field, content);
                }
                id
            })
            .collect()
    }

    fn post(&mut self) -> String {
        let opener = self.pick(&POST_OPENERS);
        let closer = self.pick(&POST_CLOSERS);
        format!("{opener} - {closer}")
    }

    fn maybe_post(&mut self) -> String {
        if self.rng.chance(60) {
            self.post()
        } else {
            String::new()
        }
    }

    fn pick<'a>(&mut self, values: &[&'a str]) -> &'a str {
        values[self.rng.int_n(values.len())]
    }
}

pub fn seeded_store(seed: u64, count: usize) -> RowStore {
    let mut store = RowStore::new();
    SheetFaker::new(seed).fill(&mut store, count);
    store
}

pub fn temp_export_dir() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("exports");
    Ok((dir, path))
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub url: String,
    pub token: String,
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureMode {
    Never,
    Always,
    ContentContains(String),
}

/// In-memory transport that records every request it is handed.
#[derive(Debug)]
pub struct RecordingTransport {
    calls: Mutex<Vec<RecordedCall>>,
    failure: FailureMode,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new(FailureMode::Never)
    }
}

impl RecordingTransport {
    pub fn new(failure: FailureMode) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failure,
        }
    }

    pub fn failing() -> Self {
        Self::new(FailureMode::Always)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().len()
    }

    pub fn calls_to(&self, url: &str) -> Vec<RecordedCall> {
        self.lock()
            .iter()
            .filter(|call| call.url == url)
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RecordedCall>> {
        match self.calls.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Transport for RecordingTransport {
    fn post_json(&self, url: &str, token: &str, body: &Value) -> Result<Delivery> {
        self.lock().push(RecordedCall {
            url: url.to_owned(),
            token: token.to_owned(),
            body: body.clone(),
        });

        let content = body.get("content").and_then(Value::as_str).unwrap_or("");
        let fail = match &self.failure {
            FailureMode::Never => false,
            FailureMode::Always => true,
            FailureMode::ContentContains(needle) => content.contains(needle.as_str()),
        };
        if fail {
            bail!("server error (503): unavailable");
        }

        Ok(Delivery {
            status: 200,
            body: "ok".to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{FailureMode, RecordingTransport, SheetFaker, seeded_store};
    use postsheet_http::Transport;
    use serde_json::json;

    #[test]
    fn new_deterministic_seed() {
        let mut left = SheetFaker::new(42);
        let mut right = SheetFaker::new(42);
        assert_eq!(left.row(), right.row());
    }

    #[test]
    fn rows_always_carry_account_and_first_post() {
        let mut faker = SheetFaker::new(7);
        for _ in 0..20 {
            let row = faker.row();
            assert!(row.account.starts_with('@'));
            assert!(row.business_account.starts_with('@'));
            assert!(!row.label.is_empty());
            assert!(!row.contents[0].is_empty());
        }
    }

    #[test]
    fn seeded_store_has_requested_rows() {
        let store = seeded_store(3, 12);
        assert_eq!(store.len(), 12);
        assert!(store.rows().iter().all(|row| !row.account.is_empty()));
    }

    #[test]
    fn recording_transport_fails_on_matching_content() {
        let transport = RecordingTransport::new(FailureMode::ContentContains("bad".to_owned()));
        let good = transport.post_json("http://x/post", "t", &json!({"content": "fine"}));
        let bad = transport.post_json("http://x/post", "t", &json!({"content": "bad news"}));

        assert!(good.is_ok());
        assert!(bad.is_err());
        assert_eq!(transport.call_count(), 2);
        assert_eq!(transport.calls_to("http://x/post").len(), 2);
    }
}
