use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::graph::{GraphKey, NormalizedGraph, Record};
use super::RESTAURANT_TYPE;

static CLOSED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"휴무|휴업|종료").unwrap());

/// Root query fields for the restaurant are named per request, e.g.
/// `restaurant({"id":"1234","isNx":false})`.
const ROOT_RESTAURANT_PREFIX: &str = "restaurant";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Open(String),
    Closed,
    Unknown,
}

/// Where a page keeps today's hours. Chosen by probing the graph; pages carry no
/// version marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoursSource {
    /// `ROOT_QUERY.restaurant(...).newBusinessHours[0]`
    RootQuery,
    /// `RestaurantBase:<id>.businessHours.0`
    BusinessHours,
}

pub fn check_availability(graph: &NormalizedGraph, restaurant: &Record, id: &str) -> Availability {
    if let Some(entry) = root_hours(graph) {
        return judge(graph, HoursSource::RootQuery, entry);
    }
    match legacy_hours(graph, restaurant, id) {
        Some(entry) => judge(graph, HoursSource::BusinessHours, entry),
        None => {
            debug!("{}: no business hours record", id);
            Availability::Unknown
        }
    }
}

/// First element of the first non-empty `newBusinessHours` under a restaurant root
/// field.
fn root_hours(graph: &NormalizedGraph) -> Option<&Record> {
    graph
        .root_fields(ROOT_RESTAURANT_PREFIX)
        .filter_map(|(_, field)| graph.resolve_value(field).ok())
        .find_map(|restaurant| {
            restaurant
                .get("newBusinessHours")
                .and_then(Value::as_array)
                .and_then(|hours| hours.first())
        })
        .and_then(|first| graph.resolve_value(first).ok())
}

fn legacy_hours<'g>(graph: &'g NormalizedGraph, restaurant: &'g Record, id: &str) -> Option<&'g Record> {
    let hours = restaurant.get("businessHours").filter(|v| !v.is_null())?;
    let derived = GraphKey::Field {
        type_tag: RESTAURANT_TYPE,
        id,
        path: "businessHours.0",
    };
    let first = match hours {
        Value::Array(list) => list.first().unwrap_or(&Value::Null),
        other => other,
    };
    graph
        .resolve_or_derive(first, &derived)
        .or_else(|_| graph.resolve(&derived))
        .ok()
}

fn judge(graph: &NormalizedGraph, source: HoursSource, entry: &Record) -> Availability {
    let status_record = match source {
        HoursSource::RootQuery => entry
            .get("businessStatusDescription")
            .and_then(|v| graph.resolve_value(v).ok())
            .unwrap_or(entry),
        HoursSource::BusinessHours => entry,
    };

    let day_off = entry.get("isDayOff").and_then(Value::as_bool).unwrap_or(false);
    let status = text(status_record, "status").unwrap_or_default();
    if day_off || CLOSED_RE.is_match(status) {
        return Availability::Closed;
    }

    let description = match source {
        HoursSource::RootQuery => text(status_record, "description"),
        HoursSource::BusinessHours => {
            text(entry, "hourString").or_else(|| text(entry, "description"))
        }
    };
    match description {
        Some(d) => Availability::Open(d.to_string()),
        None => Availability::Unknown,
    }
}

fn text<'r>(record: &'r Record, field: &str) -> Option<&'r str> {
    record
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
