use itertools::Itertools;

use crate::app::deck_stats::{DeckStats, CURVE_TOP, TRACKED_TYPES};
use crate::app::land_swap::LandSwap;
use crate::app::SessionError;
use crate::models::card::Card;
use crate::models::draft_state::DraftState;

const BAR: char = '#';

/// How much detail card lines carry.
#[derive(Debug, Clone, Copy, Default)]
pub struct CardView {
    pub edhrec_rank: bool,
    pub debug: bool,
}

impl CardView {
    pub fn of(state: &DraftState) -> Self {
        CardView {
            edhrec_rank: state.show_edhrec_rank,
            debug: state.show_debug_info,
        }
    }
}

pub fn card_line(card: &Card, view: CardView) -> String {
    let mut line = format!(
        "{:<32} {} {:<8} {}",
        card.name,
        card.rarity,
        card.mana_cost.as_deref().unwrap_or(""),
        card.type_line
    );
    if let (Some(power), Some(toughness)) = (&card.power, &card.toughness) {
        line.push_str(&format!(" {}/{}", power, toughness));
    }
    if let Some(loyalty) = &card.loyalty {
        line.push_str(&format!(" [{}]", loyalty));
    }
    if view.edhrec_rank {
        match card.edhrec_rank {
            Some(rank) => line.push_str(&format!("  EDHREC #{}", rank)),
            None => line.push_str("  EDHREC -"),
        }
    }
    if view.debug {
        line.push_str(&format!(
            "  ({} {} cmc {} {})",
            card.id,
            card.set_name,
            card.cmc,
            card.image_url().unwrap_or("no image")
        ));
        if let Some(text) = &card.oracle_text {
            line.push_str(&format!("\n      {}", text.replace('\n', " / ")));
        }
    }
    line
}

/// Numbered, one-based listing.
pub fn numbered(cards: &[Card], view: CardView) -> String {
    cards
        .iter()
        .enumerate()
        .map(|(i, card)| format!("{:>2}. {}", i + 1, card_line(card, view)))
        .join("\n")
}

pub fn commanders(cards: &[Card], state: &DraftState) -> String {
    if cards.is_empty() {
        return "No commander candidates loaded.".to_string();
    }
    format!(
        "Choose a commander ({} rerolls left):\n{}",
        state.rerolls_remaining,
        numbered(cards, CardView::of(state))
    )
}

pub fn offer(state: &DraftState) -> String {
    if state.draft_complete {
        return "The deck is complete. Use `export` to get the list.".to_string();
    }
    if state.current_pick.is_empty() {
        return "No cards on offer.".to_string();
    }
    format!(
        "Pick {} of {}:\n{}",
        state.main_deck_len() + 1,
        state.deck_capacity(),
        numbered(&state.current_pick, CardView::of(state))
    )
}

pub fn deck(state: &DraftState, swap: &LandSwap) -> String {
    let view = CardView::of(state);
    let mut out = Vec::new();

    match &state.commander {
        Some(commander) => out.push(format!("Commander: {}", card_line(commander, view))),
        None => out.push("Commander: none".to_string()),
    }
    out.push(format!(
        "Deck ({}/{}, {} lands):",
        state.main_deck_len(),
        state.deck_capacity(),
        state.land_count()
    ));
    out.push(numbered(&state.deck, view));

    if let (true, Some(remove), Some(land)) = (swap.is_pending(), swap.candidate(), swap.land()) {
        out.push(swap_prompt(remove, land));
    }
    out.join("\n")
}

pub fn swap_prompt(remove: &Card, land: &Card) -> String {
    format!(
        "The deck is full. Replace {} with {}? Type `confirm` or `cancel`.",
        remove.name, land.name
    )
}

fn bar(count: usize) -> String {
    std::iter::repeat(BAR).take(count).collect()
}

pub fn stats(stats: &DeckStats) -> String {
    let mut out = Vec::new();

    out.push(format!(
        "Commander: {}",
        stats.commander.as_deref().unwrap_or("none")
    ));
    out.push(format!("Colors: {}", stats.colors.join(" / ")));
    out.push(format!("Deck size: {} / {}", stats.total_cards, stats.capacity));
    out.push(format!(
        "Lands: {} (aiming for {})",
        stats.land_count, stats.desired_land_count
    ));

    out.push("Card types:".to_string());
    for card_type in TRACKED_TYPES {
        out.push(format!("  {:<13}{:>3}", card_type, stats.type_count(card_type)));
    }

    out.push("Mana curve:".to_string());
    for (cmc, count) in stats.mana_curve.iter().enumerate() {
        let label = if cmc == CURVE_TOP {
            format!("{}+", cmc)
        } else {
            cmc.to_string()
        };
        out.push(format!("  {:>2} {:>3} {}", label, count, bar(*count)));
    }

    out.push("Rarity:".to_string());
    for line in stats.rarities.iter() {
        out.push(format!(
            "  {} {:>3} {:>5.1}% (target {:.0}%) {}",
            line.rarity, line.count, line.percent, line.target, line.hint
        ));
    }

    let subtypes = stats
        .subtypes
        .iter()
        .sorted_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)))
        .take(10)
        .map(|(subtype, count)| format!("{} {}", subtype, count))
        .join(", ");
    if !subtypes.is_empty() {
        out.push(format!("Subtypes: {}", subtypes));
    }

    out.join("\n")
}

pub fn error_hint(err: &SessionError) -> String {
    format!("({}. Type `retry` to try again.)", err)
}
