use std::collections::HashMap;

use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::RngCore;
use strum::IntoEnumIterator;

use crate::config::{DraftPolicy, RarityTarget};
use crate::models::card::{Card, Rarity};
use crate::opt::*;

fn log(s: String) {
    log_if(s.as_str(), DbgFlg::Draft);
}

/// Percentage of `cards` per rarity. An empty deck sits exactly on target.
pub fn rarity_distribution(cards: &[&Card], target: &RarityTarget) -> HashMap<Rarity, f64> {
    if cards.is_empty() {
        return Rarity::iter()
            .map(|rarity| (rarity, target.share(rarity)))
            .collect();
    }

    let counts = cards.iter().map(|card| card.rarity).counts();
    let total = cards.len() as f64;

    Rarity::iter()
        .map(|rarity| {
            let count = counts.get(&rarity).copied().unwrap_or(0) as f64;
            (rarity, count / total * 100.0)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct RarityBoosts {
    boosts: HashMap<Rarity, f64>,
    pub total: f64,
}

impl RarityBoosts {
    pub fn of(&self, rarity: Rarity) -> f64 {
        self.boosts.get(&rarity).copied().unwrap_or(0.0)
    }

    /// How many cards of `rarity` the first pass admits into `slots`.
    fn quota(&self, rarity: Rarity, slots: usize, policy: &DraftPolicy) -> usize {
        let boost = self.of(rarity);
        if boost <= 0.0 || self.total <= 0.0 {
            return 0;
        }
        policy
            .admission_rounding
            .apply(boost / self.total * slots as f64)
    }
}

pub fn rarity_boosts(deck: &[&Card], target: &RarityTarget) -> RarityBoosts {
    let current = rarity_distribution(deck, target);
    let boosts: HashMap<Rarity, f64> = Rarity::iter()
        .map(|rarity| {
            let now = current.get(&rarity).copied().unwrap_or(0.0);
            (rarity, (target.share(rarity) - now).max(0.0))
        })
        .collect();
    let total = boosts.values().sum();

    RarityBoosts { boosts, total }
}

/// Picks up to `slots` cards from `candidates`, favouring rarities the deck
/// is short of. The result is shuffled so priority never shows as order.
pub fn balance_offer(
    deck: &[&Card],
    candidates: &[&Card],
    slots: usize,
    policy: &DraftPolicy,
    rng: &mut dyn RngCore,
) -> Vec<Card> {
    if slots == 0 || candidates.is_empty() {
        return Vec::new();
    }

    let mut pool: Vec<&Card> = candidates.to_vec();
    pool.shuffle(rng);

    let boosts = rarity_boosts(deck, &policy.target);
    log(format!(
        "Rarity boosts {}",
        Rarity::iter()
            .map(|rarity| format!("{}={:.1}", rarity.name(), boosts.of(rarity)))
            .join(" ")
    ));
    if boosts.total <= 0.0 {
        return pool.into_iter().take(slots).cloned().collect();
    }

    let mut by_priority = pool.clone();
    by_priority.sort_by(|a, b| boosts.of(b.rarity).total_cmp(&boosts.of(a.rarity)));

    let mut admitted: Vec<&Card> = Vec::with_capacity(slots);
    let mut rarity_counts: HashMap<Rarity, usize> = HashMap::new();

    for card in by_priority {
        if admitted.len() >= slots {
            break;
        }
        let count = rarity_counts.entry(card.rarity).or_insert(0);
        if *count < boosts.quota(card.rarity, slots, policy) {
            *count += 1;
            admitted.push(card);
        }
    }

    for card in pool {
        if admitted.len() >= slots {
            break;
        }
        if !admitted.iter().any(|owned| owned.id == card.id) {
            admitted.push(card);
        }
    }

    let mut offer: Vec<Card> = admitted.into_iter().cloned().collect();
    offer.shuffle(rng);
    offer
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn cards(prefix: &str, rarity: Rarity, count: usize) -> Vec<Card> {
        (0..count)
            .map(|i| {
                let id = format!("{}{}", prefix, i);
                Card::new(&id, &id, rarity, "Creature — Elf")
            })
            .collect()
    }

    fn refs(cards: &[Card]) -> Vec<&Card> {
        cards.iter().collect()
    }

    fn count_of(offer: &[Card], rarity: Rarity) -> usize {
        offer.iter().filter(|card| card.rarity == rarity).count()
    }

    #[test]
    fn test_empty_deck_is_on_target() {
        let target = RarityTarget::default();
        let boosts = rarity_boosts(&[], &target);
        assert_eq!(boosts.total, 0.0);
        assert_eq!(rarity_distribution(&[], &target)[&Rarity::Uncommon], 35.0);
    }

    #[test]
    fn test_boosts_for_all_common_deck() {
        let deck = cards("c", Rarity::Common, 10);
        let boosts = rarity_boosts(&refs(&deck), &RarityTarget::default());
        assert_eq!(boosts.of(Rarity::Common), 0.0);
        assert_eq!(boosts.of(Rarity::Uncommon), 35.0);
        assert_eq!(boosts.of(Rarity::Rare), 20.0);
        assert_eq!(boosts.of(Rarity::Mythic), 5.0);
        assert_eq!(boosts.of(Rarity::Special), 0.0);
        assert_eq!(boosts.total, 60.0);
    }

    #[test]
    fn test_on_target_deck_samples_uniformly() {
        let deck: Vec<Card> = [
            cards("c", Rarity::Common, 8),
            cards("u", Rarity::Uncommon, 7),
            cards("r", Rarity::Rare, 4),
            cards("m", Rarity::Mythic, 1),
        ]
        .concat();
        let pool = cards("p", Rarity::Common, 12);

        let offer = balance_offer(
            &refs(&deck),
            &refs(&pool),
            5,
            &DraftPolicy::default(),
            &mut StdRng::seed_from_u64(3),
        );
        assert_eq!(offer.len(), 5);
        assert!(offer.iter().all(|card| card.id.starts_with('p')));
    }

    #[test]
    fn test_largest_mythic_boost_admits_mythics() {
        let deck: Vec<Card> = [
            cards("c", Rarity::Common, 4),
            cards("u", Rarity::Uncommon, 4),
            cards("r", Rarity::Rare, 2),
        ]
        .concat();
        let pool: Vec<Card> = [
            cards("pc", Rarity::Common, 20),
            cards("pm", Rarity::Mythic, 2),
            cards("pu", Rarity::Uncommon, 20),
        ]
        .concat();

        let offer = balance_offer(
            &refs(&deck),
            &refs(&pool),
            5,
            &DraftPolicy::default(),
            &mut StdRng::seed_from_u64(11),
        );
        assert_eq!(offer.len(), 5);
        assert_eq!(count_of(&offer, Rarity::Mythic), 2);
    }

    #[test]
    fn test_mythic_admitted_when_common_deck_meets_scarce_pool() {
        let deck = cards("c", Rarity::Common, 10);
        let pool: Vec<Card> = [
            cards("pc", Rarity::Common, 47),
            cards("pm", Rarity::Mythic, 3),
        ]
        .concat();

        let offer = balance_offer(
            &refs(&deck),
            &refs(&pool),
            5,
            &DraftPolicy::default(),
            &mut StdRng::seed_from_u64(5),
        );
        // ceil(5 / 60 * 5) = 1 mythic admitted up front; the fill pass is unweighted.
        assert_eq!(offer.len(), 5);
        assert!(count_of(&offer, Rarity::Mythic) >= 1);
    }

    #[test]
    fn test_fill_pass_tops_up_offer() {
        let deck = cards("c", Rarity::Common, 10);
        let pool: Vec<Card> = [
            cards("pc", Rarity::Common, 47),
            cards("pm", Rarity::Mythic, 1),
        ]
        .concat();

        let offer = balance_offer(
            &refs(&deck),
            &refs(&pool),
            5,
            &DraftPolicy::default(),
            &mut StdRng::seed_from_u64(8),
        );
        // Commons have no quota, so the four open slots come from the fill pass.
        assert_eq!(offer.len(), 5);
        assert_eq!(count_of(&offer, Rarity::Mythic), 1);
        assert_eq!(count_of(&offer, Rarity::Common), 4);
        assert_eq!(offer.iter().map(|card| card.id.as_str()).unique().count(), 5);
    }

    #[test]
    fn test_first_pass_follows_priority() {
        let deck = cards("c", Rarity::Common, 10);
        let pool: Vec<Card> = [
            cards("pc", Rarity::Common, 5),
            cards("pm", Rarity::Mythic, 3),
            cards("pr", Rarity::Rare, 3),
            cards("pu", Rarity::Uncommon, 5),
        ]
        .concat();

        let offer = balance_offer(
            &refs(&deck),
            &refs(&pool),
            5,
            &DraftPolicy::default(),
            &mut StdRng::seed_from_u64(12),
        );
        // uncommon quota 3, rare quota 2: the offer fills before mythics are reached.
        assert_eq!(count_of(&offer, Rarity::Uncommon), 3);
        assert_eq!(count_of(&offer, Rarity::Rare), 2);
        assert_eq!(count_of(&offer, Rarity::Mythic), 0);
    }

    #[test]
    fn test_small_pool_returns_everything() {
        let deck = cards("c", Rarity::Common, 3);
        let pool = cards("pr", Rarity::Rare, 3);
        let offer = balance_offer(
            &refs(&deck),
            &refs(&pool),
            5,
            &DraftPolicy::default(),
            &mut StdRng::seed_from_u64(1),
        );
        assert_eq!(offer.len(), 3);
    }

    #[test]
    fn test_zero_slots() {
        let pool = cards("p", Rarity::Rare, 3);
        let offer = balance_offer(
            &[],
            &refs(&pool),
            0,
            &DraftPolicy::default(),
            &mut StdRng::seed_from_u64(1),
        );
        assert!(offer.is_empty());
    }
}
