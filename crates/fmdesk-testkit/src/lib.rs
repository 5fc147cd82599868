// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use fmdesk_app::ResourceKind;
use serde_json::{Value, json};
use std::io::Read;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::Duration as StdDuration;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Duration, Month, OffsetDateTime, Time};
use tiny_http::{Header, Response, Server};

const REFERENCE_YEAR: i32 = 2026;

const COMPANY_PREFIXES: [&str; 12] = [
    "Harbor", "Summit", "Crescent", "Meridian", "Oakline", "Northgate", "Bluewater", "Cedar",
    "Falcon", "Granite", "Lakeside", "Pioneer",
];
const COMPANY_SUFFIXES: [&str; 6] = [
    "Facilities",
    "Properties",
    "Estates",
    "Holdings",
    "Realty",
    "Management",
];
const BILLING_TERMS: [&str; 3] = ["monthly", "quarterly", "yearly"];

const FIRST_NAMES: [&str; 16] = [
    "Amara", "Bilal", "Chen", "Divya", "Farah", "Ibrahim", "Leena", "Marco", "Nadia", "Omar",
    "Priya", "Rashid", "Sana", "Tariq", "Yusuf", "Zara",
];
const LAST_NAMES: [&str; 18] = [
    "Al Mansoori", "Banerjee", "Castillo", "D'Souza", "Fernandes", "Haddad", "Iyer", "Khalil",
    "Menon", "Nasser", "Okafor", "Pereira", "Qureshi", "Rahman", "Saleh", "Thomas", "Varghese",
    "Wong",
];

const SITES: [&str; 8] = [
    "Tower A",
    "Tower B",
    "Riverside Plaza",
    "Sunset Residences",
    "Tech Park",
    "Marina Heights",
    "Central Mall",
    "Green Court",
];
const NOTICE_TOPICS: [&str; 10] = [
    "Water shutdown",
    "Lift maintenance",
    "Fire drill",
    "Parking resurfacing",
    "Pest control visit",
    "Power backup test",
    "Lobby renovation",
    "Holiday schedule",
    "Gym closure",
    "Security audit",
];
const STATUSES: [&str; 5] = ["open", "pending", "approved", "completed", "cancelled"];

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

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator for backend-shaped records. Same seed, same records.
pub struct ConsoleFaker {
    rng: DeterministicRng,
    seed: u64,
}

impl ConsoleFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn company(&mut self, id: i64) -> Value {
        let name = format!(
            "{} {}",
            self.pick(&COMPANY_PREFIXES),
            self.pick(&COMPANY_SUFFIXES)
        );
        json!({
            "id": id,
            "name": name,
            "organization_id": self.int_range(1, 5),
            "country_id": self.int_range(1, 200),
            "billing_term": self.pick(&BILLING_TERMS),
            "billing_rate_cents": self.int_range(50_000, 500_000),
            "live_date": self.date(),
            "created_at": self.timestamp(),
        })
    }

    pub fn banner(&mut self, id: i64) -> Value {
        let site = self.int_n(SITES.len());
        json!({
            "id": id,
            "title": format!("{} update", SITES[site]),
            "project_id": site + 1,
            "active": self.rng.bool(),
            "created_at": self.timestamp(),
        })
    }

    pub fn notice(&mut self, id: i64) -> Value {
        let topic = self.pick(&NOTICE_TOPICS);
        json!({
            "id": id,
            "notice_title": topic,
            "notice_text": format!("{topic} scheduled at {}.", self.pick(&SITES)),
            "status": if self.rng.bool() { "published" } else { "draft" },
            "shared": self.rng.bool(),
            "created_at": self.timestamp(),
        })
    }

    pub fn ev_consumption(&mut self, id: i64) -> Value {
        json!({
            "id": id,
            "transaction_id": format!("TX-{:06}", self.int_range(1, 999_999)),
            "site_id": self.int_range(1, SITES.len() as i64),
            "energy_wh": self.int_range(500, 80_000),
            "amount_cents": self.int_range(100, 25_000),
            "started_on": self.date(),
            "created_at": self.timestamp(),
        })
    }

    pub fn person(&mut self, id: i64) -> Value {
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        json!({
            "id": id,
            "firstname": first,
            "lastname": last,
            "email": format!("{}.{}@example.com", email_part(first), email_part(last)),
            "mobile": format!("9{:09}", self.int_range(0, 999_999_999)),
            "active": self.rng.bool(),
            "created_at": self.timestamp(),
        })
    }

    /// Generic row for resources without a dedicated shape.
    pub fn record(&mut self, kind: ResourceKind, id: i64) -> Value {
        match kind {
            ResourceKind::Companies => self.company(id),
            ResourceKind::Banners => self.banner(id),
            ResourceKind::Notices => self.notice(id),
            ResourceKind::EvConsumptions => self.ev_consumption(id),
            ResourceKind::Employees | ResourceKind::AdminUsers | ResourceKind::ClubMemberships => {
                self.person(id)
            }
            other => json!({
                "id": id,
                "name": format!("{} {id}", capitalize(other.label())),
                "status": self.pick(&STATUSES),
                "created_at": self.timestamp(),
            }),
        }
    }

    pub fn records(&mut self, kind: ResourceKind, count: usize) -> Vec<Value> {
        (1..=count as i64).map(|id| self.record(kind, id)).collect()
    }

    pub fn date_in_year(&mut self, year: i32) -> OffsetDateTime {
        let start = midnight_utc(year, Month::January, 1);
        let offset = self.int_range(0, 364 * 24 * 60 * 60);
        start + Duration::seconds(offset)
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn date(&mut self) -> String {
        self.date_in_year(REFERENCE_YEAR)
            .date()
            .format(format_description!("[year]-[month]-[day]"))
            .unwrap_or_default()
    }

    fn timestamp(&mut self) -> String {
        self.date_in_year(REFERENCE_YEAR)
            .format(&Rfc3339)
            .unwrap_or_default()
    }
}

fn email_part(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn midnight_utc(year: i32, month: Month, day: u8) -> OffsetDateTime {
    Date::from_calendar_date(year, month, day)
        .map(|date| date.with_time(Time::MIDNIGHT).assume_utc())
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

/// List body the way most endpoints send it: items under the first collection key plus
/// a `pagination` block computed from `total`.
pub fn list_body(
    kind: ResourceKind,
    items: &[Value],
    page: i64,
    per_page: i64,
    total: i64,
) -> Value {
    let key = kind.endpoint().collection_keys[0];
    let total_pages = if per_page > 0 {
        total / per_page + i64::from(total % per_page != 0)
    } else {
        0
    };
    json!({
        "code": 200,
        key: items,
        "pagination": {
            "current_page": page,
            "total_pages": total_pages,
            "total_count": total,
            "per_page": per_page,
        },
    })
}

pub fn temp_config_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("config.toml");
    Ok((dir, path))
}

pub fn fixture_datetime() -> &'static str {
    "2026-02-19T12:34:56Z"
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn path(&self) -> &str {
        self.url.split_once('?').map_or(self.url.as_str(), |(path, _)| path)
    }

    /// Decoded query pairs in request order.
    pub fn query(&self) -> Vec<(String, String)> {
        let raw = self.url.split_once('?').map_or("", |(_, query)| query);
        url::form_urlencoded::parse(raw.as_bytes())
            .into_owned()
            .collect()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn body_json(&self) -> Result<Value> {
        serde_json::from_slice(&self.body).context("decode recorded request body")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl ScriptedResponse {
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: body.to_owned(),
        }
    }
}

/// HTTP server on a free local port that answers with `responses` in order, one per
/// request, and records what it was sent.
pub struct MockServer {
    base_url: String,
    handle: JoinHandle<Result<Vec<RecordedRequest>>>,
}

const RECV_TIMEOUT: StdDuration = StdDuration::from_secs(5);

impl MockServer {
    pub fn start(responses: Vec<ScriptedResponse>) -> Result<Self> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let base_url = format!("http://{}", server.server_addr());

        let handle = thread::spawn(move || {
            let mut recorded = Vec::with_capacity(responses.len());
            for scripted in responses {
                let Some(mut request) = server
                    .recv_timeout(RECV_TIMEOUT)
                    .context("receive mock request")?
                else {
                    break;
                };

                let mut body = Vec::new();
                request
                    .as_reader()
                    .read_to_end(&mut body)
                    .context("read mock request body")?;
                recorded.push(RecordedRequest {
                    method: request.method().as_str().to_owned(),
                    url: request.url().to_owned(),
                    headers: request
                        .headers()
                        .iter()
                        .map(|header| {
                            (
                                header.field.as_str().as_str().to_owned(),
                                header.value.as_str().to_owned(),
                            )
                        })
                        .collect(),
                    body,
                });

                let content_type = Header::from_bytes("Content-Type", scripted.content_type)
                    .map_err(|()| anyhow!("invalid content type header"))?;
                let response = Response::from_string(scripted.body)
                    .with_status_code(scripted.status)
                    .with_header(content_type);
                request.respond(response).context("send mock response")?;
            }
            Ok(recorded)
        });

        Ok(Self { base_url, handle })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Waits for the scripted exchanges to finish and returns the recorded requests.
    pub fn finish(self) -> Result<Vec<RecordedRequest>> {
        self.handle
            .join()
            .map_err(|_| anyhow!("mock server thread panicked"))?
    }
}
