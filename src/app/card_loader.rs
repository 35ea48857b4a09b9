use std::collections::HashMap;

use futures::future::try_join_all;
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::RngCore;

use crate::card_api::{ApiError, CardFilter, CardPage, CardQuery};
use crate::config::DraftPolicy;
use crate::models::card::{self, Card, Color};
use crate::opt::*;

fn log(s: String) {
    log_if(s.as_str(), DbgFlg::Api);
}

pub fn commander_filter() -> CardFilter {
    CardFilter::new().commanders().legal_in("commander")
}

/// Candidate pool assembled from randomly chosen result pages. Pages are
/// fetched together and any failure fails the whole pool.
pub async fn fetch_card_pool(
    api: &dyn CardQuery,
    filter: &str,
    policy: &DraftPolicy,
    rng: &mut dyn RngCore,
) -> Result<Vec<Card>, ApiError> {
    let first = api.search(filter, 1).await?;
    let page_size = api.page_size().max(1);
    let mut page_count = (first.total_count + page_size - 1) / page_size;
    if first.has_more {
        page_count = page_count.max(2);
    }

    let mut pages: Vec<usize> = (1..=page_count).collect();
    pages.shuffle(rng);
    pages.truncate(policy.pool_pages.max(1));
    pages.sort_unstable();
    log(format!("Pool of {} cards, loading pages {:?}", first.total_count, pages));

    let remote_pages: Vec<usize> = pages.iter().copied().filter(|page| *page != 1).collect();
    let fetched: Vec<CardPage> =
        try_join_all(remote_pages.iter().map(|page| api.search(filter, *page))).await?;

    let mut results: Vec<CardPage> = Vec::with_capacity(pages.len());
    if pages.contains(&1) {
        results.push(first);
    }
    results.extend(fetched);

    let pool: Vec<Card> = results
        .into_iter()
        .flat_map(|page| page.cards)
        .unique_by(|card| card.id.clone())
        .collect();
    log(format!("Loaded {} pool cards", pool.len()));

    Ok(pool)
}

/// Random commander candidates, fetched together, duplicates dropped.
pub async fn fetch_commander_candidates(
    api: &dyn CardQuery,
    policy: &DraftPolicy,
) -> Result<Vec<Card>, ApiError> {
    let filter = commander_filter().to_string();
    let candidates =
        try_join_all((0..policy.commander_choices).map(|_| api.random_card(&filter))).await?;

    Ok(candidates
        .into_iter()
        .unique_by(|card| card.id.clone())
        .collect())
}

/// One printing of each basic land the identity can play, in WUBRG order.
pub async fn fetch_basic_lands(
    api: &dyn CardQuery,
    identity: &[Color],
) -> Result<Vec<Card>, ApiError> {
    let names = card::basic_land_names(identity);
    let filter = CardFilter::new().named_any(&names).to_string();
    let page = api.search(&filter, 1).await?;

    let mut by_name: HashMap<String, Card> = HashMap::new();
    for land in page.cards.into_iter().filter(|card| card.is_basic_land()) {
        by_name.entry(land.name.clone()).or_insert(land);
    }

    Ok(names
        .iter()
        .filter_map(|name| by_name.remove(*name))
        .collect())
}
