use std::collections::{BTreeMap, HashSet};

use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::RngCore;

use crate::card_api::{ApiError, CardFilter, CardQuery};
use crate::config::DraftPolicy;
use crate::models::card::Card;
use crate::models::draft_state::DraftState;
use crate::opt::*;

fn log(s: String) {
    log_if(s.as_str(), DbgFlg::Synergy);
}

/// Subtype frequency over creature-like cards.
pub fn subtype_counts<'a>(cards: impl IntoIterator<Item = &'a Card>) -> BTreeMap<String, usize> {
    cards
        .into_iter()
        .filter(|card| card.is_creature_like())
        .flat_map(|card| card.subtypes())
        .counts()
        .into_iter()
        .collect()
}

/// Subtypes over the threshold that have no cached candidates yet, sorted.
pub fn unregistered_synergies(state: &DraftState, policy: &DraftPolicy) -> Vec<String> {
    subtype_counts(state.full_deck())
        .into_iter()
        .filter(|(subtype, count)| {
            *count > policy.synergy_threshold && !state.tribal_synergies.contains_key(subtype)
        })
        .map(|(subtype, _)| subtype)
        .collect()
}

pub fn synergy_filter(subtype: &str, state: &DraftState) -> CardFilter {
    let identity = state
        .commander
        .as_ref()
        .map(|commander| commander.color_identity.clone())
        .unwrap_or_default();

    CardFilter::new()
        .within_identity(&identity)
        .with_type(subtype)
        .exclude_commanders()
        .legal_in("commander")
}

/// Reinforcement candidates for `subtype`, minus cards already owned.
pub async fn fetch_synergy_candidates(
    api: &dyn CardQuery,
    subtype: &str,
    state: &DraftState,
    policy: &DraftPolicy,
) -> Result<Vec<Card>, ApiError> {
    let filter = synergy_filter(subtype, state).to_string();
    let page = api.search(&filter, 1).await?;

    let candidates: Vec<Card> = page
        .cards
        .into_iter()
        .filter(|card| !state.contains_card(&card.id))
        .take(policy.synergy_cache_size)
        .collect();

    log(format!(
        "Cached {} candidates for {} out of {}",
        candidates.len(),
        subtype,
        page.total_count
    ));
    Ok(candidates)
}

/// One random still-eligible card per registered subtype, never the same card twice.
pub fn pick_synergy_cards(state: &DraftState, rng: &mut dyn RngCore) -> Vec<Card> {
    let mut chosen: Vec<Card> = Vec::new();
    let mut chosen_ids: HashSet<&str> = HashSet::new();

    for (subtype, cards) in state.tribal_synergies.iter() {
        let eligible: Vec<&Card> = cards
            .iter()
            .filter(|card| {
                !state.contains_card(&card.id)
                    && !state.was_presented(&card.id)
                    && !chosen_ids.contains(card.id.as_str())
            })
            .collect();

        if let Some(card) = eligible.choose(rng).copied() {
            log(format!("Injecting {} for {}", card.name, subtype));
            chosen_ids.insert(card.id.as_str());
            chosen.push(card.clone());
        }
    }

    chosen
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::card_api::fake::FakeCardQuery;
    use crate::models::card::{Color, Rarity};
    use crate::models::draft_state::{DraftAction, DraftStore};

    fn creature(id: &str, subtypes: &str) -> Card {
        Card::new(id, id, Rarity::Common, &format!("Creature — {}", subtypes))
    }

    fn store_with(deck: Vec<Card>) -> DraftStore {
        let mut store = DraftStore::new(&DraftPolicy::default());
        let commander = Card::new("cmd", "Gisa", Rarity::Mythic, "Legendary Creature — Human Wizard")
            .with_identity(&[Color::B]);
        store.dispatch(DraftAction::SelectCommander(commander));
        for card in deck {
            store.dispatch(DraftAction::AddCard(card));
        }
        store
    }

    #[test]
    fn test_subtype_counts_ignore_non_creatures() {
        let cards = vec![
            creature("a", "Zombie Wizard"),
            creature("b", "Zombie"),
            Card::new("e", "Sword", Rarity::Rare, "Artifact — Equipment"),
            Card::new("k", "Kin", Rarity::Rare, "Kindred Instant — Zombie"),
        ];
        let counts = subtype_counts(cards.iter());
        assert_eq!(counts.get("Zombie"), Some(&3));
        assert_eq!(counts.get("Wizard"), Some(&1));
        assert_eq!(counts.get("Equipment"), None);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let policy = DraftPolicy::default();
        let store = store_with(vec![creature("a", "Zombie"), creature("b", "Zombie")]);
        assert!(unregistered_synergies(store.state(), &policy).is_empty());

        let store = store_with(vec![
            creature("a", "Zombie"),
            creature("b", "Zombie"),
            creature("c", "Zombie"),
        ]);
        assert_eq!(unregistered_synergies(store.state(), &policy), vec!["Zombie"]);
    }

    #[test]
    fn test_commander_counts_toward_synergy() {
        let store = store_with(vec![creature("a", "Wizard"), creature("b", "Wizard")]);
        assert_eq!(
            unregistered_synergies(store.state(), &DraftPolicy::default()),
            vec!["Wizard"]
        );
    }

    #[test]
    fn test_registered_subtypes_are_skipped() {
        let mut store = store_with(vec![
            creature("a", "Zombie"),
            creature("b", "Zombie"),
            creature("c", "Zombie"),
        ]);
        store.dispatch(DraftAction::RegisterTribalSynergy {
            subtype: "Zombie".to_string(),
            cards: Vec::new(),
        });
        assert!(unregistered_synergies(store.state(), &DraftPolicy::default()).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_filters_owned_and_caps() {
        let mut policy = DraftPolicy::default();
        policy.synergy_cache_size = 3;
        let store = store_with(vec![creature("z0", "Zombie")]);

        let remote: Vec<Card> = (0..6).map(|i| creature(&format!("z{}", i), "Zombie")).collect();
        let filter = synergy_filter("Zombie", store.state()).to_string();
        assert_eq!(filter, "id<=b t:zombie -is:commander legal:commander");

        let api = FakeCardQuery::new(175).with_results(&filter, remote);
        let cached = fetch_synergy_candidates(&api, "Zombie", store.state(), &policy)
            .await
            .unwrap();
        let ids: Vec<&str> = cached.iter().map(|card| card.id.as_str()).collect();
        assert_eq!(ids, vec!["z1", "z2", "z3"]);
    }

    #[test]
    fn test_pick_one_per_subtype_without_repeats() {
        let mut store = store_with(vec![creature("owned", "Zombie")]);
        let shared = creature("zw", "Zombie Wizard");
        store.dispatch(DraftAction::RegisterTribalSynergy {
            subtype: "Wizard".to_string(),
            cards: vec![shared.clone()],
        });
        store.dispatch(DraftAction::RegisterTribalSynergy {
            subtype: "Zombie".to_string(),
            cards: vec![creature("owned", "Zombie"), shared, creature("z2", "Zombie")],
        });
        store.dispatch(DraftAction::RegisterTribalSynergy {
            subtype: "Elf".to_string(),
            cards: vec![creature("e1", "Elf")],
        });
        store.dispatch(DraftAction::SetCurrentPick(vec![creature("e1", "Elf")]));

        let picks = pick_synergy_cards(store.state(), &mut StdRng::seed_from_u64(0));
        let ids: Vec<&str> = picks.iter().map(|card| card.id.as_str()).collect();
        // Elf exhausted by the presented set, Wizard takes the shared card first.
        assert_eq!(ids, vec!["zw", "z2"]);
    }
}
