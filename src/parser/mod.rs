pub mod content;
pub mod graph;
pub mod hours;
pub mod menu;
pub mod record;

use tracing::{debug, warn};

use crate::config::Category;
use crate::error::ExtractError;
use content::Markers;
use graph::{GraphKey, NormalizedGraph};
use record::StoreRecord;

pub const RESTAURANT_TYPE: &str = "RestaurantBase";

/// Page → state blob → graph → menu + availability → record.
///
/// `Ok(None)` means the store is closed today, has no admissible menu, or the page
/// has no record for `id`. Errors mean the page layout changed.
pub fn extract_store(
    document: &str,
    source_url: &str,
    id: &str,
    category: &Category,
) -> Result<Option<StoreRecord>, ExtractError> {
    let blob = content::extract_state_blob(document, &Markers::default())?;
    let graph = NormalizedGraph::parse(&blob)?;
    Ok(build_from_graph(&graph, source_url, id, category))
}

pub fn build_from_graph(
    graph: &NormalizedGraph,
    source_url: &str,
    id: &str,
    category: &Category,
) -> Option<StoreRecord> {
    let key = GraphKey::Entity {
        type_tag: RESTAURANT_TYPE,
        id,
    };
    let restaurant = match graph.resolve(&key) {
        Ok(r) => r,
        Err(e) => {
            warn!("{}: page has no restaurant record ({})", id, e);
            return None;
        }
    };

    let availability = hours::check_availability(graph, restaurant, id);
    if availability == hours::Availability::Closed {
        debug!("{}: closed today", id);
        return None;
    }

    let menu = menu::assemble_menu(graph, restaurant, id, category);
    if menu.is_empty() {
        debug!("{}: no menu item within {} won", id, category.price_ceiling);
    }
    record::build_record(restaurant, id, source_url, availability, menu)
}
