use std::collections::{BTreeMap, HashSet};

use crate::config::DraftPolicy;
use crate::models::card::Card;

pub const MAX_LAND_COUNT: i64 = 100;

/// Every mutation of a draft goes through one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftAction {
    SelectCommander(Card),
    RerollCommander,
    AddCard(Card),
    RemoveCard(String),
    SetCurrentPick(Vec<Card>),
    SetAvailableCards(Vec<Card>),
    SetDesiredLandCount(i64),
    RegisterTribalSynergy { subtype: String, cards: Vec<Card> },
    CompleteDraft,
    ToggleEdhrecRank,
    ToggleDebugInfo,
}

/// Snapshot of a draft. The commander is kept out of `deck`, which only
/// holds main-deck cards.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftState {
    pub commander: Option<Card>,
    pub deck: Vec<Card>,
    pub rerolls_remaining: u32,
    pub is_commander_selected: bool,
    pub desired_land_count: u32,
    pub current_pick: Vec<Card>,
    pub draft_complete: bool,
    pub available_cards: Vec<Card>,
    pub presented_cards: HashSet<String>,
    pub tribal_synergies: BTreeMap<String, Vec<Card>>,
    pub show_edhrec_rank: bool,
    pub show_debug_info: bool,
    deck_capacity: usize,
    offer_size: usize,
}

impl DraftState {
    pub fn new(policy: &DraftPolicy) -> Self {
        DraftState {
            commander: None,
            deck: Vec::new(),
            rerolls_remaining: policy.initial_rerolls,
            is_commander_selected: false,
            desired_land_count: policy.initial_land_count,
            current_pick: Vec::new(),
            draft_complete: false,
            available_cards: Vec::new(),
            presented_cards: HashSet::new(),
            tribal_synergies: BTreeMap::new(),
            show_edhrec_rank: false,
            show_debug_info: false,
            deck_capacity: policy.deck_capacity,
            offer_size: policy.offer_size,
        }
    }

    pub fn deck_capacity(&self) -> usize {
        self.deck_capacity
    }

    pub fn main_deck_len(&self) -> usize {
        self.deck.len()
    }

    /// Commander plus main deck.
    pub fn total_cards(&self) -> usize {
        self.deck.len() + usize::from(self.commander.is_some())
    }

    pub fn is_deck_full(&self) -> bool {
        self.deck.len() >= self.deck_capacity
    }

    pub fn can_reroll(&self) -> bool {
        self.rerolls_remaining > 0
    }

    pub fn land_count(&self) -> usize {
        self.deck.iter().filter(|card| card.is_land()).count()
    }

    pub fn contains_card(&self, id: &str) -> bool {
        self.deck.iter().any(|card| card.id == id)
            || self.commander.as_ref().map_or(false, |c| c.id == id)
    }

    pub fn was_presented(&self, id: &str) -> bool {
        self.presented_cards.contains(id)
    }

    /// Commander first, then the main deck in pick order.
    pub fn full_deck(&self) -> impl Iterator<Item = &Card> {
        self.commander.iter().chain(self.deck.iter())
    }

    fn has_copy_of(&self, card: &Card) -> bool {
        !card.is_basic_land() && self.full_deck().any(|owned| owned.name == card.name)
    }

    /// Returns the state after `action`. Rejected actions return an unchanged copy.
    pub fn apply(&self, action: DraftAction) -> DraftState {
        let mut next = self.clone();

        match action {
            DraftAction::SelectCommander(card) => {
                if !next.is_commander_selected {
                    next.commander = Some(card);
                    next.is_commander_selected = true;
                }
            }
            DraftAction::RerollCommander => {
                if next.rerolls_remaining > 0 {
                    next.rerolls_remaining -= 1;
                }
            }
            DraftAction::AddCard(card) => {
                if !next.is_deck_full() && !next.has_copy_of(&card) {
                    next.deck.push(card);
                }
            }
            DraftAction::RemoveCard(id) => {
                if let Some(pos) = next.deck.iter().position(|card| card.id == id) {
                    next.deck.remove(pos);
                }
            }
            DraftAction::SetCurrentPick(cards) => {
                let cards: Vec<Card> = cards.into_iter().take(next.offer_size).collect();
                next.presented_cards
                    .extend(cards.iter().map(|card| card.id.clone()));
                next.current_pick = cards;
            }
            DraftAction::SetAvailableCards(cards) => {
                if next.available_cards.is_empty() {
                    next.available_cards = cards;
                }
            }
            DraftAction::SetDesiredLandCount(count) => {
                next.desired_land_count = count.clamp(0, MAX_LAND_COUNT) as u32;
            }
            DraftAction::RegisterTribalSynergy { subtype, cards } => {
                next.tribal_synergies.entry(subtype).or_insert(cards);
            }
            DraftAction::CompleteDraft => {
                next.draft_complete = true;
                next.current_pick.clear();
            }
            DraftAction::ToggleEdhrecRank => {
                next.show_edhrec_rank = !next.show_edhrec_rank;
            }
            DraftAction::ToggleDebugInfo => {
                next.show_debug_info = !next.show_debug_info;
            }
        }

        next
    }
}

/// Single writer over a [`DraftState`]; transitions apply strictly in dispatch order.
#[derive(Debug)]
pub struct DraftStore {
    state: DraftState,
}

impl DraftStore {
    pub fn new(policy: &DraftPolicy) -> Self {
        DraftStore {
            state: DraftState::new(policy),
        }
    }

    pub fn state(&self) -> &DraftState {
        &self.state
    }

    /// Applies `action` and reports whether the state changed.
    pub fn dispatch(&mut self, action: DraftAction) -> bool {
        let next = self.state.apply(action);
        let changed = next != self.state;
        self.state = next;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::card::Rarity;

    fn card(id: &str) -> Card {
        Card::new(id, &format!("Card {}", id), Rarity::Common, "Creature — Elf")
    }

    fn forest(id: &str) -> Card {
        Card::new(id, "Forest", Rarity::Common, "Basic Land — Forest")
    }

    fn store() -> DraftStore {
        DraftStore::new(&DraftPolicy::default())
    }

    #[test]
    fn test_initial_state() {
        let store = store();
        let state = store.state();
        assert_eq!(state.rerolls_remaining, 2);
        assert_eq!(state.desired_land_count, 37);
        assert!(!state.is_commander_selected);
        assert!(state.deck.is_empty());
        assert_eq!(state.total_cards(), 0);
    }

    #[test]
    fn test_select_commander_once() {
        let mut store = store();
        assert!(store.dispatch(DraftAction::SelectCommander(card("cmd"))));
        assert!(!store.dispatch(DraftAction::SelectCommander(card("other"))));

        let state = store.state();
        assert_eq!(state.commander.as_ref().map(|c| c.id.as_str()), Some("cmd"));
        assert!(state.deck.is_empty());
        assert_eq!(state.total_cards(), 1);
        assert_eq!(state.rerolls_remaining, 2);
    }

    #[test]
    fn test_reroll_exhaustion() {
        let mut store = store();
        assert!(store.dispatch(DraftAction::RerollCommander));
        assert!(store.dispatch(DraftAction::RerollCommander));
        assert_eq!(store.state().rerolls_remaining, 0);

        let before = store.state().clone();
        assert!(!store.dispatch(DraftAction::RerollCommander));
        assert_eq!(store.state(), &before);
    }

    #[test]
    fn test_add_card_capacity() {
        let mut store = store();
        for i in 0..120 {
            store.dispatch(DraftAction::AddCard(card(&i.to_string())));
        }
        assert_eq!(store.state().main_deck_len(), 99);
        assert!(store.state().is_deck_full());
    }

    #[test]
    fn test_add_card_rejects_duplicate_names_except_basics() {
        let mut store = store();
        store.dispatch(DraftAction::SelectCommander(card("cmd")));
        assert!(!store.dispatch(DraftAction::AddCard(card("cmd"))));

        assert!(store.dispatch(DraftAction::AddCard(card("a"))));
        let reprint = Card::new("a2", "Card a", Rarity::Rare, "Creature — Elf");
        assert!(!store.dispatch(DraftAction::AddCard(reprint)));

        assert!(store.dispatch(DraftAction::AddCard(forest("f1"))));
        assert!(store.dispatch(DraftAction::AddCard(forest("f2"))));
        assert_eq!(store.state().land_count(), 2);
    }

    #[test]
    fn test_remove_card_first_match() {
        let mut store = store();
        store.dispatch(DraftAction::AddCard(card("a")));
        store.dispatch(DraftAction::AddCard(card("b")));
        assert!(store.dispatch(DraftAction::RemoveCard("a".to_string())));
        assert!(!store.dispatch(DraftAction::RemoveCard("missing".to_string())));
        assert_eq!(store.state().deck, vec![card("b")]);
    }

    #[test]
    fn test_current_pick_grows_presented() {
        let mut store = store();
        store.dispatch(DraftAction::SetCurrentPick(vec![card("a"), card("b")]));
        store.dispatch(DraftAction::SetCurrentPick(vec![card("c")]));
        store.dispatch(DraftAction::SetCurrentPick(Vec::new()));

        let state = store.state();
        assert!(state.current_pick.is_empty());
        for id in ["a", "b", "c"] {
            assert!(state.was_presented(id));
        }
    }

    #[test]
    fn test_current_pick_capped_at_offer_size() {
        let mut store = store();
        let cards: Vec<Card> = (0..8).map(|i| card(&i.to_string())).collect();
        store.dispatch(DraftAction::SetCurrentPick(cards));
        assert_eq!(store.state().current_pick.len(), 5);
        assert_eq!(store.state().presented_cards.len(), 5);
    }

    #[test]
    fn test_available_cards_set_once() {
        let mut store = store();
        assert!(store.dispatch(DraftAction::SetAvailableCards(vec![card("a")])));
        assert!(!store.dispatch(DraftAction::SetAvailableCards(vec![card("b")])));
        assert_eq!(store.state().available_cards, vec![card("a")]);
    }

    #[test]
    fn test_land_count_clamped() {
        let mut store = store();
        store.dispatch(DraftAction::SetDesiredLandCount(150));
        assert_eq!(store.state().desired_land_count, 100);
        store.dispatch(DraftAction::SetDesiredLandCount(-4));
        assert_eq!(store.state().desired_land_count, 0);
        store.dispatch(DraftAction::SetDesiredLandCount(40));
        assert_eq!(store.state().desired_land_count, 40);
    }

    #[test]
    fn test_synergy_registration_never_replaced() {
        let mut store = store();
        store.dispatch(DraftAction::RegisterTribalSynergy {
            subtype: "Zombie".to_string(),
            cards: vec![card("z1"), card("z2")],
        });
        assert!(!store.dispatch(DraftAction::RegisterTribalSynergy {
            subtype: "Zombie".to_string(),
            cards: Vec::new(),
        }));
        assert_eq!(store.state().tribal_synergies["Zombie"].len(), 2);
    }

    #[test]
    fn test_complete_draft_clears_offer() {
        let mut store = store();
        store.dispatch(DraftAction::SetCurrentPick(vec![card("a")]));
        store.dispatch(DraftAction::CompleteDraft);
        assert!(store.state().draft_complete);
        assert!(store.state().current_pick.is_empty());
    }

    #[test]
    fn test_display_toggles() {
        let mut store = store();
        store.dispatch(DraftAction::ToggleEdhrecRank);
        store.dispatch(DraftAction::ToggleDebugInfo);
        store.dispatch(DraftAction::ToggleDebugInfo);
        assert!(store.state().show_edhrec_rank);
        assert!(!store.state().show_debug_info);
    }
}
