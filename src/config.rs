use std::env;
use std::str::FromStr;

use strum_macros::{Display, EnumString};

use crate::models::card::Rarity;
use crate::opt::*;

pub const DEFAULT_API_URL: &str = "https://api.scryfall.com";

const API_URL_KEY: &str = "SCRYFALL_API_URL";
const SEED_KEY: &str = "DRAFT_SEED";

/// Rounding applied when turning a rarity's boost share into an admission count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum Rounding {
    Ceil,
    Round,
    Floor,
}

impl Rounding {
    pub fn apply(&self, value: f64) -> usize {
        let rounded = match self {
            Rounding::Ceil => value.ceil(),
            Rounding::Round => value.round(),
            Rounding::Floor => value.floor(),
        };
        rounded.max(0.0) as usize
    }
}

/// Target share of the deck per rarity, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RarityTarget {
    pub common: f64,
    pub uncommon: f64,
    pub rare: f64,
    pub mythic: f64,
}

impl RarityTarget {
    pub fn share(&self, rarity: Rarity) -> f64 {
        match rarity {
            Rarity::Common => self.common,
            Rarity::Uncommon => self.uncommon,
            Rarity::Rare => self.rare,
            Rarity::Mythic => self.mythic,
            Rarity::Special => 0.0,
        }
    }
}

impl Default for RarityTarget {
    fn default() -> Self {
        RarityTarget {
            common: 40.0,
            uncommon: 35.0,
            rare: 20.0,
            mythic: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DraftPolicy {
    pub offer_size: usize,
    /// Main-deck slots, commander excluded.
    pub deck_capacity: usize,
    pub initial_rerolls: u32,
    pub initial_land_count: u32,
    /// A subtype registers once its count exceeds this.
    pub synergy_threshold: usize,
    pub synergy_cache_size: usize,
    /// Random result pages that make up the candidate pool.
    pub pool_pages: usize,
    pub commander_choices: usize,
    pub admission_rounding: Rounding,
    pub target: RarityTarget,
}

impl Default for DraftPolicy {
    fn default() -> Self {
        DraftPolicy {
            offer_size: 5,
            deck_capacity: 99,
            initial_rerolls: 2,
            initial_land_count: 37,
            synergy_threshold: 2,
            synergy_cache_size: 20,
            pool_pages: 4,
            commander_choices: 5,
            admission_rounding: Rounding::Ceil,
            target: RarityTarget::default(),
        }
    }
}

impl DraftPolicy {
    pub fn from_env() -> Res<Self> {
        let defaults = DraftPolicy::default();

        Ok(DraftPolicy {
            offer_size: env_or("DRAFT_OFFER_SIZE", defaults.offer_size)?,
            deck_capacity: env_or("DRAFT_DECK_CAPACITY", defaults.deck_capacity)?,
            initial_rerolls: env_or("DRAFT_REROLLS", defaults.initial_rerolls)?,
            initial_land_count: env_or("DRAFT_LAND_COUNT", defaults.initial_land_count)?
                .min(100),
            synergy_threshold: env_or("DRAFT_SYNERGY_THRESHOLD", defaults.synergy_threshold)?,
            synergy_cache_size: env_or("DRAFT_SYNERGY_CACHE", defaults.synergy_cache_size)?,
            pool_pages: env_or("DRAFT_POOL_PAGES", defaults.pool_pages)?,
            commander_choices: env_or("DRAFT_COMMANDER_CHOICES", defaults.commander_choices)?,
            admission_rounding: env_or("DRAFT_ADMISSION_ROUNDING", defaults.admission_rounding)?,
            target: defaults.target,
        })
    }
}

pub fn api_base_url() -> String {
    env::var(API_URL_KEY).unwrap_or_else(|_| DEFAULT_API_URL.to_string())
}

pub fn seed() -> Res<Option<u64>> {
    match env::var(SEED_KEY) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|err| format!("invalid {}: {}", SEED_KEY, err)),
        Err(_) => Ok(None),
    }
}

fn env_or<T>(key: &str, default: T) -> Res<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|err| format!("invalid {}={}: {}", key, value, err)),
        Err(_) => Ok(default),
    }
}
