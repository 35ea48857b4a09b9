use rand::seq::SliceRandom;
use rand::RngCore;

use crate::app::rarity_balancer;
use crate::app::tribal_synergy;
use crate::card_api::CardFilter;
use crate::config::DraftPolicy;
use crate::models::card::{Card, Color};
use crate::models::draft_state::DraftState;

/// Query for the candidate pool of a commander with this identity.
pub fn pool_filter(identity: &[Color]) -> CardFilter {
    CardFilter::new()
        .within_identity(identity)
        .exclude_commanders()
        .exclude_type("land")
        .legal_in("commander")
}

/// Pool cards neither owned nor ever offered.
pub fn eligible_candidates(state: &DraftState) -> Vec<&Card> {
    state
        .available_cards
        .iter()
        .filter(|card| !state.contains_card(&card.id) && !state.was_presented(&card.id))
        .collect()
}

pub fn can_offer(state: &DraftState) -> bool {
    state.is_commander_selected && !state.draft_complete && !state.is_deck_full()
}

/// Next pick: one synergy card per registered subtype, rarity-balanced
/// picks for the remaining slots, shuffled together. With more subtypes
/// than slots, the injected subtypes are a random subset.
pub fn generate_offer(
    state: &DraftState,
    policy: &DraftPolicy,
    rng: &mut dyn RngCore,
) -> Vec<Card> {
    if !can_offer(state) {
        return Vec::new();
    }

    let mut offer = tribal_synergy::pick_synergy_cards(state, rng);
    offer.shuffle(rng);
    offer.truncate(policy.offer_size);
    let slots = policy.offer_size - offer.len();

    let candidates: Vec<&Card> = eligible_candidates(state)
        .into_iter()
        .filter(|card| !offer.iter().any(|picked| picked.id == card.id))
        .collect();
    let deck: Vec<&Card> = state.full_deck().collect();

    offer.extend(rarity_balancer::balance_offer(
        &deck,
        &candidates,
        slots,
        policy,
        rng,
    ));
    offer.shuffle(rng);
    offer
}
