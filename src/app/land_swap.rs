use rand::seq::SliceRandom;
use rand::RngCore;

use crate::models::card::Card;
use crate::models::draft_state::{DraftAction, DraftStore};

/// Adding a basic land to a full deck trades it for a random non-land card,
/// after the user confirms.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LandSwap {
    #[default]
    Idle,
    CandidateSelected { remove: Card, land: Card },
    AwaitingConfirmation { remove: Card, land: Card },
    Swapping { remove: Card, land: Card },
}

impl LandSwap {
    pub fn is_pending(&self) -> bool {
        matches!(self, LandSwap::AwaitingConfirmation { .. })
    }

    /// The card that confirming would remove.
    pub fn candidate(&self) -> Option<&Card> {
        match self {
            LandSwap::Idle => None,
            LandSwap::CandidateSelected { remove, .. }
            | LandSwap::AwaitingConfirmation { remove, .. }
            | LandSwap::Swapping { remove, .. } => Some(remove),
        }
    }

    pub fn land(&self) -> Option<&Card> {
        match self {
            LandSwap::Idle => None,
            LandSwap::CandidateSelected { land, .. }
            | LandSwap::AwaitingConfirmation { land, .. }
            | LandSwap::Swapping { land, .. } => Some(land),
        }
    }

    /// Starts or refreshes a swap for `land`. A pending swap keeps its
    /// candidate and only takes the newly requested land. Returns the
    /// candidate, or `None` if the deck has no non-land card to give up.
    pub fn request(
        &mut self,
        store: &DraftStore,
        land: Card,
        rng: &mut dyn RngCore,
    ) -> Option<&Card> {
        let next = match std::mem::take(self) {
            LandSwap::AwaitingConfirmation { remove, .. }
            | LandSwap::CandidateSelected { remove, .. } => {
                LandSwap::CandidateSelected { remove, land }
            }
            LandSwap::Idle | LandSwap::Swapping { .. } => {
                let spells: Vec<&Card> = store
                    .state()
                    .deck
                    .iter()
                    .filter(|card| !card.is_land())
                    .collect();
                match spells.choose(rng) {
                    Some(remove) => LandSwap::CandidateSelected {
                        remove: (*remove).clone(),
                        land,
                    },
                    None => LandSwap::Idle,
                }
            }
        };

        *self = match next {
            LandSwap::CandidateSelected { remove, land } => {
                LandSwap::AwaitingConfirmation { remove, land }
            }
            other => other,
        };
        self.candidate()
    }

    /// Removes the candidate and adds the land. Both transitions apply or
    /// neither does. Returns whether the deck changed.
    pub fn confirm(&mut self, store: &mut DraftStore) -> bool {
        let (remove, land) = match std::mem::take(self) {
            LandSwap::AwaitingConfirmation { remove, land } => (remove, land),
            other => {
                *self = other;
                return false;
            }
        };
        *self = LandSwap::Swapping {
            remove: remove.clone(),
            land: land.clone(),
        };

        let still_owned = store.state().deck.iter().any(|card| card.id == remove.id);
        let applied = still_owned
            && store.dispatch(DraftAction::RemoveCard(remove.id.clone()))
            && store.dispatch(DraftAction::AddCard(land));
        if still_owned && !applied {
            // Removal went through but the add was refused: put the card back.
            store.dispatch(DraftAction::AddCard(remove));
        }

        *self = LandSwap::Idle;
        applied
    }

    pub fn cancel(&mut self) {
        *self = LandSwap::Idle;
    }
}
