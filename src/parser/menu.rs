use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use super::graph::{GraphKey, NormalizedGraph, Record};
use super::RESTAURANT_TYPE;
use crate::config::Category;

const MENU_TYPE: &str = "Menu";

/// Item name -> price in won, in discovery order.
pub type Menu = IndexMap<String, u64>;

/// Third-party delivery channels, in lookup priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryVendor {
    Yogiyo,
    Baemin,
}

impl DeliveryVendor {
    pub const PRIORITY: [DeliveryVendor; 2] = [DeliveryVendor::Yogiyo, DeliveryVendor::Baemin];

    /// Pointer field on the restaurant record.
    pub fn field(self) -> &'static str {
        match self {
            DeliveryVendor::Yogiyo => "yogiyo",
            DeliveryVendor::Baemin => "baemin",
        }
    }

    /// First vendor whose pointer is set, with the pointer value.
    pub fn select(restaurant: &Record) -> Option<(DeliveryVendor, &Value)> {
        Self::PRIORITY.into_iter().find_map(|vendor| {
            restaurant
                .get(vendor.field())
                .filter(|v| !v.is_null())
                .map(|v| (vendor, v))
        })
    }
}

/// Merge the delivery-channel menu and the direct menu, keeping items the category
/// admits. On a name collision the first entry seen wins, so delivery prices take
/// precedence over direct ones.
pub fn assemble_menu(graph: &NormalizedGraph, restaurant: &Record, id: &str, category: &Category) -> Menu {
    let mut menu = Menu::new();
    for item in delivery_items(graph, restaurant, id).chain(direct_items(graph, restaurant, id)) {
        admit(&mut menu, item, category);
    }
    menu
}

fn admit(menu: &mut Menu, item: &Record, category: &Category) {
    let Some(name) = item.get("name").and_then(Value::as_str) else {
        return;
    };
    let Some(price) = item.get("price").and_then(Value::as_str).and_then(parse_price) else {
        return;
    };
    if category.admits(price) {
        menu.entry(name.to_string()).or_insert(price);
    }
}

/// Digit-only, non-empty price strings. "시가" (market price), "", "3,000" are not
/// prices. Values too large for `u64` are over any ceiling anyway.
pub fn parse_price(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn delivery_items<'g>(
    graph: &'g NormalizedGraph,
    restaurant: &'g Record,
    id: &'g str,
) -> impl Iterator<Item = &'g Record> + 'g {
    let brand = DeliveryVendor::select(restaurant).and_then(|(vendor, pointer)| {
        let generated = GraphKey::Generated {
            type_tag: RESTAURANT_TYPE,
            id,
            path: vendor.field(),
        };
        graph
            .resolve_or_derive(pointer, &generated)
            .or_else(|_| graph.resolve(&generated))
            .inspect_err(|e| debug!("{}: {:?} brand missing ({})", id, vendor, e))
            .ok()
    });

    brand
        .into_iter()
        .flat_map(|brand| list(brand, "menuGroups"))
        .filter_map(move |group| resolve_logged(graph, group, id))
        .flat_map(|group| list(group, "menus"))
        .filter_map(move |item| resolve_logged(graph, item, id))
}

fn direct_items<'g>(
    graph: &'g NormalizedGraph,
    restaurant: &'g Record,
    id: &'g str,
) -> impl Iterator<Item = &'g Record> + 'g {
    list(restaurant, "menus")
        .enumerate()
        .filter_map(move |(index, entry)| {
            let derived = GraphKey::Indexed {
                type_tag: MENU_TYPE,
                id,
                index,
            };
            graph
                .resolve_or_derive(entry, &derived)
                .inspect_err(|e| debug!("{}: skipping direct menu entry ({})", id, e))
                .ok()
        })
}

fn resolve_logged<'g>(graph: &'g NormalizedGraph, value: &'g Value, id: &str) -> Option<&'g Record> {
    graph
        .resolve_value(value)
        .inspect_err(|e| debug!("{}: skipping menu entry ({})", id, e))
        .ok()
}

/// Elements of a list field; absent or null reads as empty.
fn list<'r>(record: &'r Record, field: &str) -> impl Iterator<Item = &'r Value> + 'r {
    record
        .get(field)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::CategoryTable;

    fn cafe() -> Category {
        CategoryTable::builtin().get("카페").unwrap().clone()
    }

    fn korean() -> Category {
        CategoryTable::builtin().get("한식").unwrap().clone()
    }

    fn build(value: Value) -> NormalizedGraph {
        NormalizedGraph::parse(&value.to_string()).unwrap()
    }

    fn menu_for(g: &NormalizedGraph, id: &str, category: &Category) -> Menu {
        let restaurant = g.get(&format!("RestaurantBase:{}", id)).unwrap();
        assemble_menu(g, restaurant, id, category)
    }

    /// Vendor A (yogiyo) with one group of two items.
    fn delivery_graph(first: &str, second: &str) -> NormalizedGraph {
        build(json!({
            "RestaurantBase:1": {
                "yogiyo": { "type": "id", "generated": true, "id": "$RestaurantBase:1.yogiyo" },
                "baemin": null,
                "menus": null
            },
            "$RestaurantBase:1.yogiyo": {
                "menuGroups": [{ "type": "id", "generated": false, "id": "YogiyoMenuGroup:10" }]
            },
            "YogiyoMenuGroup:10": {
                "name": "커피",
                "menus": [
                    { "type": "id", "id": "YogiyoMenu:100" },
                    { "type": "id", "id": "YogiyoMenu:101" }
                ]
            },
            "YogiyoMenu:100": { "name": "라떼", "price": first },
            "YogiyoMenu:101": { "name": "아메리카노", "price": second }
        }))
    }

    #[test]
    fn delivery_items_over_ceiling_dropped() {
        let g = delivery_graph("3000", "2000");
        let menu = menu_for(&g, "1", &cafe());
        assert_eq!(menu.len(), 1);
        assert_eq!(menu.get("아메리카노"), Some(&2000));
    }

    #[test]
    fn same_item_depends_on_category() {
        let g = delivery_graph("5000", "시가");
        assert!(menu_for(&g, "1", &cafe()).is_empty());
        let menu = menu_for(&g, "1", &korean());
        assert_eq!(menu.get("라떼"), Some(&5000));
        assert!(!menu.contains_key("아메리카노"));
    }

    #[test]
    fn price_admission() {
        assert_eq!(parse_price("2500"), Some(2500));
        assert_eq!(parse_price("0"), Some(0));
        for bad in ["", "시가", "3,000", "-100", " 100", "1.5", "99999999999999999999999"] {
            assert_eq!(parse_price(bad), None, "{:?}", bad);
        }
    }

    #[test]
    fn admission_is_monotonic() {
        let c = cafe();
        let admitted: Vec<u64> = (0..=5000).step_by(50).filter(|p| c.admits(*p)).collect();
        assert_eq!(admitted.last(), Some(&2500));
        assert!(admitted.windows(2).all(|w| w[1] == w[0] + 50));
        assert_eq!(admitted.first(), Some(&0));
    }

    #[test]
    fn vendor_priority() {
        let g = build(json!({
            "RestaurantBase:2": {
                "yogiyo": { "__ref": "Brand:y" },
                "baemin": { "__ref": "Brand:b" }
            },
            "Brand:y": { "menuGroups": [{ "__ref": "Group:y" }] },
            "Brand:b": { "menuGroups": [{ "__ref": "Group:b" }] },
            "Group:y": { "name": "g", "menus": [{ "__ref": "Item:y" }] },
            "Group:b": { "name": "g", "menus": [{ "__ref": "Item:b" }] },
            "Item:y": { "name": "from yogiyo", "price": "1000" },
            "Item:b": { "name": "from baemin", "price": "1000" }
        }));
        let menu = menu_for(&g, "2", &cafe());
        assert_eq!(menu.keys().collect::<Vec<_>>(), vec!["from yogiyo"]);
    }

    #[test]
    fn baemin_used_when_yogiyo_null() {
        let g = build(json!({
            "RestaurantBase:3": { "yogiyo": null, "baemin": { "type": "id", "id": "$RestaurantBase:3.baemin" } },
            "$RestaurantBase:3.baemin": { "menuGroups": [{ "id": "BaeminMenuGroup:1" }] },
            "BaeminMenuGroup:1": { "name": "분식", "menus": [{ "id": "BaeminMenu:1" }] },
            "BaeminMenu:1": { "name": "떡볶이", "price": "4500" }
        }));
        let menu = menu_for(&g, "3", &korean());
        assert_eq!(menu.get("떡볶이"), Some(&4500));
    }

    #[test]
    fn direct_menu_markers_and_derived_keys() {
        let g = build(json!({
            "RestaurantBase:4": {
                "yogiyo": null,
                "baemin": null,
                "menus": [{ "__ref": "Menu:4_0" }, null]
            },
            "Menu:4_0": { "name": "김밥", "price": "3000" },
            "Menu:4_1": { "name": "라면", "price": "4000" }
        }));
        let menu = menu_for(&g, "4", &korean());
        assert_eq!(menu.get("김밥"), Some(&3000));
        assert_eq!(menu.get("라면"), Some(&4000));
    }

    #[test]
    fn delivery_wins_name_collision() {
        let g = build(json!({
            "RestaurantBase:5": {
                "yogiyo": { "__ref": "Brand:5" },
                "menus": [{ "__ref": "Menu:5_0" }]
            },
            "Brand:5": { "menuGroups": [{ "__ref": "Group:5" }] },
            "Group:5": { "name": "g", "menus": [{ "__ref": "Item:5" }] },
            "Item:5": { "name": "비빔밥", "price": "6000" },
            "Menu:5_0": { "name": "비빔밥", "price": "5500" }
        }));
        let menu = menu_for(&g, "5", &korean());
        assert_eq!(menu.len(), 1);
        assert_eq!(menu.get("비빔밥"), Some(&6000));
    }

    #[test]
    fn no_sources_is_empty() {
        let g = build(json!({ "RestaurantBase:6": { "yogiyo": null, "baemin": null, "menus": null } }));
        assert!(menu_for(&g, "6", &korean()).is_empty());
    }

    #[test]
    fn dangling_entries_skipped() {
        let g = build(json!({
            "RestaurantBase:7": {
                "yogiyo": { "__ref": "Brand:missing" },
                "menus": [{ "__ref": "Menu:gone" }, { "__ref": "Menu:7_1" }]
            },
            "Menu:7_1": { "name": "국밥", "price": "7000" }
        }));
        let menu = menu_for(&g, "7", &korean());
        assert_eq!(menu.len(), 1);
        assert_eq!(menu.get("국밥"), Some(&7000));
    }

    #[test]
    fn items_without_price_or_name_skipped() {
        let g = build(json!({
            "RestaurantBase:8": {
                "menus": [{ "__ref": "Menu:a" }, { "__ref": "Menu:b" }, { "__ref": "Menu:c" }]
            },
            "Menu:a": { "name": "no price" },
            "Menu:b": { "price": "1000" },
            "Menu:c": { "name": "null price", "price": null }
        }));
        assert!(menu_for(&g, "8", &korean()).is_empty());
    }
}
