use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::config::Category;
use crate::error::SearchError;
use crate::parser::record::lenient_f64;

const SEARCH_URL: &str = "https://m.map.naver.com/search2/interestSpotMore.naver";
const STORE_URL: &str = "https://m.place.naver.com/restaurant";
/// Results per search page; the upstream caps it here.
const DISPLAY_COUNT: &str = "60";
/// 0 = relevance, 1 = distance
const SORT_BY_DISTANCE: &str = "1";

/// A store the search endpoint reported near the query point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub distance: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub npay: bool,
}

impl Candidate {
    pub fn store_url(&self) -> String {
        store_url(&self.id)
    }
}

/// Menu page for a store id.
pub fn store_url(id: &str) -> String {
    format!("{}/{}/menu", STORE_URL, id)
}

/// Query the search endpoint for stores of `category` around (`lat`, `lng`),
/// nearest first.
pub async fn find_candidates(
    client: &reqwest::Client,
    lat: f64,
    lng: f64,
    category: &Category,
) -> Result<Vec<Candidate>, SearchError> {
    let coord = format!("{};{}", lng, lat);
    info!("Searching {} stores around {}", category.label, coord);

    let body = client
        .get(SEARCH_URL)
        .query(&[
            ("type", category.type_code.as_str()),
            ("searchCoord", coord.as_str()),
            ("siteSort", SORT_BY_DISTANCE),
            ("page", "1"),
            ("displayCount", DISPLAY_COUNT),
        ])
        .send()
        .await?
        .text()
        .await?;

    let candidates = parse_candidates(&body)?;
    info!("{} candidates with a menu", candidates.len());
    Ok(candidates)
}

/// Parse `result.site.list`, keeping only stores that publish a menu.
pub fn parse_candidates(body: &str) -> Result<Vec<Candidate>, SearchError> {
    let parsed: Value = serde_json::from_str(body)?;
    let list = parsed
        .pointer("/result/site/list")
        .and_then(Value::as_array)
        .ok_or_else(|| SearchError::Malformed("missing result.site.list".into()))?;

    Ok(list.iter().filter_map(parse_site).collect())
}

fn parse_site(site: &Value) -> Option<Candidate> {
    if site.get("menuExist").and_then(Value::as_str) != Some("1") {
        return None;
    }
    // Ids come prefixed with a one-letter type tag ("s1234").
    let raw_id = site.get("id").and_then(Value::as_str)?;
    let id: String = raw_id.chars().skip(1).collect();
    if id.is_empty() {
        return None;
    }

    Some(Candidate {
        id,
        name: site.get("name").and_then(Value::as_str)?.to_string(),
        distance: site.get("distance").and_then(|d| match d {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }),
        lat: site.get("y").and_then(lenient_f64)?,
        lng: site.get("x").and_then(lenient_f64)?,
        npay: site.get("hasNPay").map(truthy).unwrap_or(false),
    })
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        Value::String(s) => !s.is_empty() && s != "0" && s != "false",
        _ => false,
    }
}
