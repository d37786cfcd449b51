use serde::Serialize;
use serde_json::Value;

use super::graph::Record;
use super::hours::Availability;
use super::menu::Menu;

/// Shown when a page carries no business hours at all.
pub const UNSPECIFIED_HOURS: &str = "알 수 없음";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// One establishment, flattened out of its page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreRecord {
    pub id: String,
    pub name: Option<String>,
    pub url: String,
    pub hours: String,
    pub review_count: Option<u64>,
    pub rating: Option<f64>,
    pub menu: Menu,
    pub coordinates: Option<Coordinates>,
}

/// `None` when the store is closed today or has no admissible menu item.
pub fn build_record(
    restaurant: &Record,
    id: &str,
    url: &str,
    availability: Availability,
    menu: Menu,
) -> Option<StoreRecord> {
    let hours = match availability {
        Availability::Closed => return None,
        Availability::Open(description) => description,
        Availability::Unknown => UNSPECIFIED_HOURS.to_string(),
    };
    if menu.is_empty() {
        return None;
    }

    Some(StoreRecord {
        id: id.to_string(),
        name: restaurant.get("name").and_then(Value::as_str).map(str::to_string),
        url: url.to_string(),
        hours,
        review_count: restaurant.get("visitorReviewsTotal").and_then(lenient_u64),
        rating: restaurant.get("visitorReviewsScore").and_then(lenient_f64),
        menu,
        coordinates: coordinates(restaurant),
    })
}

/// `x`/`y` on the record itself, or under `coordinate`. x is longitude.
fn coordinates(restaurant: &Record) -> Option<Coordinates> {
    let holder = restaurant
        .get("coordinate")
        .and_then(Value::as_object)
        .unwrap_or(restaurant);
    Some(Coordinates {
        lat: holder.get("y").and_then(lenient_f64)?,
        lng: holder.get("x").and_then(lenient_f64)?,
    })
}

// Counts and scores arrive as numbers or numeric strings depending on the page.

fn lenient_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

pub(crate) fn lenient_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn restaurant() -> Record {
        json!({
            "name": "동네카페",
            "visitorReviewsTotal": "1,204",
            "visitorReviewsScore": 4.52,
            "x": "127.0626243",
            "y": "37.514295"
        })
        .as_object()
        .unwrap()
        .clone()
    }

    fn menu() -> Menu {
        Menu::from([("아메리카노".to_string(), 2000)])
    }

    #[test]
    fn open_store() {
        let r = build_record(&restaurant(), "1", "u", Availability::Open("10:00 - 21:00".into()), menu()).unwrap();
        assert_eq!(r.name.as_deref(), Some("동네카페"));
        assert_eq!(r.hours, "10:00 - 21:00");
        assert_eq!(r.review_count, Some(1204));
        assert_eq!(r.rating, Some(4.52));
        assert_eq!(r.coordinates, Some(Coordinates { lat: 37.514295, lng: 127.0626243 }));
    }

    #[test]
    fn unknown_hours_still_reported() {
        let r = build_record(&restaurant(), "1", "u", Availability::Unknown, menu()).unwrap();
        assert_eq!(r.hours, UNSPECIFIED_HOURS);
    }

    #[test]
    fn closed_never_reported() {
        assert!(build_record(&restaurant(), "1", "u", Availability::Closed, menu()).is_none());
    }

    #[test]
    fn empty_menu_never_reported() {
        assert!(build_record(&restaurant(), "1", "u", Availability::Open("x".into()), Menu::new()).is_none());
        assert!(build_record(&restaurant(), "1", "u", Availability::Unknown, Menu::new()).is_none());
    }

    #[test]
    fn nested_coordinate_and_missing_facets() {
        let r = json!({ "coordinate": { "x": 127.0, "y": 37.5 } }).as_object().unwrap().clone();
        let rec = build_record(&r, "9", "u", Availability::Unknown, menu()).unwrap();
        assert_eq!(rec.coordinates, Some(Coordinates { lat: 37.5, lng: 127.0 }));
        assert_eq!(rec.name, None);
        assert_eq!(rec.review_count, None);
        assert_eq!(rec.rating, None);
    }
}
