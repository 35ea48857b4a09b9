use crate::models::draft_state::DraftState;

/// Plain-text decklist, one line per main-deck card. Basic lands are not stacked.
pub fn export_decklist(state: &DraftState) -> String {
    let mut lines = vec![String::from("Commander")];
    if let Some(commander) = &state.commander {
        lines.push(format!("1 {}", commander.name));
    }
    lines.push(String::new());
    lines.push(String::from("Deck"));
    lines.extend(state.deck.iter().map(|card| format!("1 {}", card.name)));

    lines.join("\n")
}
