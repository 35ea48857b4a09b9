use indicium::simple::SearchIndex;
use strsim::levenshtein;

use crate::models::card::Card;
use crate::opt::*;

fn log(s: String) {
    log_if(s.as_str(), DbgFlg::Cli);
}

fn preprocess_text(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == ',' || *c == '\'')
        .collect::<String>()
        .to_lowercase()
}

/// Resolves typed card names against a small set of cards on screen.
pub struct CardMatcher<'a> {
    cards: &'a [Card],
    index: SearchIndex<usize>,
}

impl<'a> CardMatcher<'a> {
    pub fn new(cards: &'a [Card]) -> Self {
        let index = cards
            .iter()
            .enumerate()
            .fold(SearchIndex::default(), |mut acc, (pos, card)| {
                acc.insert(&pos, &card.name);
                acc
            });

        CardMatcher { cards, index }
    }

    fn nearest(&self, text: &str, positions: impl Iterator<Item = usize>) -> Option<(usize, usize)> {
        positions
            .map(|pos| (pos, levenshtein(text, &preprocess_text(&self.cards[pos].name))))
            .min_by_key(|(_, dist)| *dist)
    }

    pub fn find(&self, text: &str) -> Option<&'a Card> {
        let text = preprocess_text(text.trim());
        if text.is_empty() {
            return None;
        }

        if let Some(card) = self
            .cards
            .iter()
            .find(|card| preprocess_text(&card.name) == text)
        {
            return Some(card);
        }

        let found: Vec<usize> = self.index.search(&text).into_iter().copied().collect();
        log(format!("Index lookup [{}] -> {:?}", text, found));

        let pos = match found.len() {
            0 => {
                // Nothing indexed matched, accept a close misspelling of a whole name.
                let tolerance = (text.chars().count() / 3).max(2);
                self.nearest(&text, 0..self.cards.len())
                    .filter(|(_, dist)| *dist <= tolerance)
                    .map(|(pos, _)| pos)
            }
            1 => Some(found[0]),
            _ => self.nearest(&text, found.into_iter()).map(|(pos, _)| pos),
        };

        pos.and_then(|pos| self.cards.get(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::card::Rarity;

    fn cards() -> Vec<Card> {
        vec![
            Card::new("a", "Llanowar Elves", Rarity::Common, "Creature — Elf Druid"),
            Card::new("b", "Sol Ring", Rarity::Uncommon, "Artifact"),
            Card::new("c", "Counterspell", Rarity::Common, "Instant"),
        ]
    }

    #[test]
    fn test_exact_name_any_case() {
        let cards = cards();
        let matcher = CardMatcher::new(&cards);
        assert_eq!(matcher.find("sol ring").map(|c| c.id.as_str()), Some("b"));
        assert_eq!(matcher.find("  Counterspell ").map(|c| c.id.as_str()), Some("c"));
    }

    #[test]
    fn test_misspelled_name() {
        let cards = cards();
        let matcher = CardMatcher::new(&cards);
        assert_eq!(matcher.find("lanowar elves").map(|c| c.id.as_str()), Some("a"));
        assert_eq!(matcher.find("Countrspell").map(|c| c.id.as_str()), Some("c"));
    }

    #[test]
    fn test_no_match() {
        let cards = cards();
        let matcher = CardMatcher::new(&cards);
        assert!(matcher.find("zzzzzzzzzz").is_none());
        assert!(matcher.find("").is_none());
        assert!(CardMatcher::new(&[]).find("sol ring").is_none());
    }
}
