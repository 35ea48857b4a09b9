use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use itertools::Itertools;
use strum::IntoEnumIterator;

use crate::app::tribal_synergy;
use crate::config::RarityTarget;
use crate::models::card::{Card, Rarity};
use crate::models::draft_state::DraftState;

/// Highest mana value bucket; it also holds everything above.
pub const CURVE_TOP: usize = 6;

/// Gap in percentage points before a rarity is flagged.
const RARITY_TOLERANCE: f64 = 5.0;

pub const TRACKED_TYPES: [&str; 7] = [
    "Creature",
    "Land",
    "Artifact",
    "Enchantment",
    "Instant",
    "Sorcery",
    "Planeswalker",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RarityHint {
    OnTarget,
    NeedMore,
    NeedFewer,
}

impl Display for RarityHint {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            RarityHint::OnTarget => write!(f, "on target"),
            RarityHint::NeedMore => write!(f, "need more"),
            RarityHint::NeedFewer => write!(f, "need fewer"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RarityLine {
    pub rarity: Rarity,
    pub count: usize,
    pub percent: f64,
    pub target: f64,
    pub hint: RarityHint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeckStats {
    pub commander: Option<String>,
    pub colors: Vec<&'static str>,
    pub total_cards: usize,
    pub capacity: usize,
    pub type_counts: Vec<(&'static str, usize)>,
    pub mana_curve: [usize; CURVE_TOP + 1],
    pub rarities: Vec<RarityLine>,
    pub subtypes: BTreeMap<String, usize>,
    pub land_count: usize,
    pub desired_land_count: u32,
}

impl DeckStats {
    pub fn of(state: &DraftState, target: &RarityTarget) -> Self {
        let cards: Vec<&Card> = state.full_deck().collect();
        let total = state.total_cards();

        let type_counts = TRACKED_TYPES
            .iter()
            .map(|card_type| {
                let count = cards.iter().filter(|card| card.types().is(card_type)).count();
                (*card_type, count)
            })
            .collect();

        let mut mana_curve = [0; CURVE_TOP + 1];
        for card in cards.iter().filter(|card| !card.is_land()) {
            let bucket = (card.cmc.max(0.0) as usize).min(CURVE_TOP);
            mana_curve[bucket] += 1;
        }

        let counts = cards.iter().map(|card| card.rarity).counts();
        let rarities = Rarity::iter()
            .filter(|rarity| *rarity != Rarity::Special)
            .map(|rarity| {
                let count = counts.get(&rarity).copied().unwrap_or(0);
                let percent = if total == 0 {
                    0.0
                } else {
                    count as f64 / total as f64 * 100.0
                };
                let target = target.share(rarity);
                RarityLine {
                    rarity,
                    count,
                    percent,
                    target,
                    hint: hint(target - percent),
                }
            })
            .collect();

        DeckStats {
            commander: state.commander.as_ref().map(|card| card.name.clone()),
            colors: state
                .commander
                .iter()
                .flat_map(|card| card.color_identity.iter().map(|color| color.name()))
                .collect(),
            total_cards: total,
            capacity: state.deck_capacity() + 1,
            type_counts,
            mana_curve,
            rarities,
            subtypes: tribal_synergy::subtype_counts(cards.iter().copied()),
            land_count: state.land_count(),
            desired_land_count: state.desired_land_count,
        }
    }

    pub fn type_count(&self, card_type: &str) -> usize {
        self.type_counts
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(card_type))
            .map_or(0, |(_, count)| *count)
    }
}

fn hint(gap: f64) -> RarityHint {
    if gap > RARITY_TOLERANCE {
        RarityHint::NeedMore
    } else if gap < -RARITY_TOLERANCE {
        RarityHint::NeedFewer
    } else {
        RarityHint::OnTarget
    }
}

#[cfg(test)]
impl DeckStats {
    pub fn rarity(&self, rarity: Rarity) -> Option<&RarityLine> {
        self.rarities.iter().find(|line| line.rarity == rarity)
    }
}
