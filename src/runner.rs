use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};
use tracing::{info, warn};

use crate::config::Category;
use crate::error::FetchError;
use crate::fetch;
use crate::parser::{self, record::{Coordinates, StoreRecord}};
use crate::search::{self, Candidate};

const CONCURRENCY: usize = 8;

/// A store page ready for extraction. `order` is the candidate's search rank.
pub struct FetchedPage {
    pub order: usize,
    pub candidate: Candidate,
    pub url: String,
    pub html: String,
}

/// Extracted record with the search result's name and position laid over it.
#[derive(Debug, Clone, Serialize)]
pub struct StoreReport {
    #[serde(flatten)]
    pub record: StoreRecord,
    pub distance: Option<String>,
    pub npay: bool,
}

/// Compact per-store view: where it is and where to look.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreSummary {
    pub lng: f64,
    pub lat: f64,
    pub store_name: String,
    pub store_url: String,
}

impl StoreReport {
    pub fn new(candidate: &Candidate, mut record: StoreRecord) -> Self {
        record.name = Some(candidate.name.clone());
        record.coordinates = Some(Coordinates {
            lat: candidate.lat,
            lng: candidate.lng,
        });
        Self {
            record,
            distance: candidate.distance.clone(),
            npay: candidate.npay,
        }
    }

    pub fn summary(&self) -> StoreSummary {
        let coords = self.record.coordinates.unwrap_or(Coordinates { lat: 0.0, lng: 0.0 });
        StoreSummary {
            lng: coords.lng,
            lat: coords.lat,
            store_name: self.record.name.clone().unwrap_or_default(),
            store_url: self.record.url.clone(),
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Reported(Box<StoreReport>),
    /// Closed today, nothing within the price ceiling, or no record on the page.
    Excluded,
    /// Page layout no longer matches.
    Failed,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct RunStats {
    pub candidates: usize,
    pub fetched: usize,
    pub fetch_errors: usize,
    pub extract_errors: usize,
    pub excluded: usize,
    pub reported: usize,
}

impl RunStats {
    pub fn log(&self) {
        info!(
            "{} candidates: {} fetched ({} fetch errors), {} reported, {} excluded, {} extract errors",
            self.candidates, self.fetched, self.fetch_errors, self.reported, self.excluded, self.extract_errors,
        );
    }
}

#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub collected_at: DateTime<Utc>,
    pub category: String,
    pub stats: RunStats,
    pub stores: Vec<StoreReport>,
}

/// Search around a point, fetch every candidate's page, extract in parallel.
/// A failing store never stops the batch.
pub async fn run(
    client: &reqwest::Client,
    lat: f64,
    lng: f64,
    category: &Category,
    limit: Option<usize>,
) -> Result<RunOutput> {
    let collected_at = Utc::now();
    let found = search::find_candidates(client, lat, lng, category)
        .await
        .context("Store search failed")?;

    let mut candidates = dedupe_by_id(found);
    if let Some(n) = limit {
        candidates.truncate(n);
    }

    let mut stats = RunStats {
        candidates: candidates.len(),
        ..Default::default()
    };

    let (pages, fetch_errors) = fetch_pages(client, candidates).await?;
    stats.fetched = pages.len();
    stats.fetch_errors = fetch_errors;

    let stores = collect_reports(process_pages(&pages, category), &mut stats);
    stats.log();

    Ok(RunOutput {
        collected_at,
        category: category.label.clone(),
        stats,
        stores,
    })
}

/// One pipeline run per id; the first (nearest) occurrence is kept.
pub fn dedupe_by_id(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.id.clone()))
        .collect()
}

async fn fetch_pages(
    client: &reqwest::Client,
    candidates: Vec<Candidate>,
) -> Result<(Vec<FetchedPage>, usize)> {
    let semaphore = Arc::new(Semaphore::new(CONCURRENCY));
    let total = candidates.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    // Workers send results, this loop collects them
    let (tx, mut rx) = mpsc::channel::<(usize, Candidate, String, Result<String, FetchError>)>(CONCURRENCY * 2);

    for (order, candidate) in candidates.into_iter().enumerate() {
        let client = client.clone();
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            let url = candidate.store_url();
            let result = fetch::fetch_with_retry(&client, &url).await;
            let _ = tx.send((order, candidate, url, result)).await;
        });
    }

    // Drop our copy of tx so rx closes when all spawned tasks finish
    drop(tx);

    let mut pages = Vec::with_capacity(total);
    let mut errors = 0usize;
    while let Some((order, candidate, url, result)) = rx.recv().await {
        match result {
            Ok(html) => pages.push(FetchedPage {
                order,
                candidate,
                url,
                html,
            }),
            Err(e) => {
                warn!("{} ({}): fetch failed: {}", candidate.name, candidate.id, e);
                errors += 1;
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok((pages, errors))
}

pub fn process_pages(pages: &[FetchedPage], category: &Category) -> Vec<(usize, Outcome)> {
    pages
        .par_iter()
        .map(|page| (page.order, process_page(page, category)))
        .collect()
}

pub fn process_page(page: &FetchedPage, category: &Category) -> Outcome {
    let id = &page.candidate.id;
    match parser::extract_store(&page.html, &page.url, id, category) {
        Ok(Some(record)) => Outcome::Reported(Box::new(StoreReport::new(&page.candidate, record))),
        Ok(None) => Outcome::Excluded,
        Err(e) => {
            warn!("{} ({}): {}", page.candidate.name, id, e);
            Outcome::Failed
        }
    }
}

/// Reports in search order, tallying the rest.
fn collect_reports(mut outcomes: Vec<(usize, Outcome)>, stats: &mut RunStats) -> Vec<StoreReport> {
    outcomes.sort_by_key(|(order, _)| *order);
    let mut reports = Vec::new();
    for (_, outcome) in outcomes {
        match outcome {
            Outcome::Reported(report) => {
                stats.reported += 1;
                reports.push(*report);
            }
            Outcome::Excluded => stats.excluded += 1,
            Outcome::Failed => stats.extract_errors += 1,
        }
    }
    reports
}
