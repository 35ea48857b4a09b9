use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use strum_macros::{EnumIter, EnumString};

lazy_static! {
    static ref FACE_SEPARATOR: Regex = Regex::new(r"\s+//\s+").expect("face separator regex");
    static ref SUBTYPE_DASH: Regex = Regex::new(r"\s+[—-]\s+|—").expect("subtype dash regex");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Mythic,
    /// Anything the provider reports outside the four draft rarities.
    Special,
}

impl Rarity {
    pub fn name(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::Mythic => "mythic",
            Rarity::Special => "special",
        }
    }
}

impl Display for Rarity {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match *self {
            Rarity::Common => write!(f, "{:^10}", "Common"),
            Rarity::Uncommon => write!(f, "{:^10}", "Uncommon"),
            Rarity::Rare => write!(f, "{:^10}", "Rare"),
            Rarity::Mythic => write!(f, "{:^10}", "Mythic"),
            Rarity::Special => write!(f, "{:^10}", "Special"),
        }
    }
}

impl<'de> Deserialize<'de> for Rarity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Rarity::from_str(s.trim()).unwrap_or(Rarity::Special))
    }
}

fn default_rarity() -> Rarity {
    Rarity::Special
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum Color {
    W,
    U,
    B,
    R,
    G,
}

impl Color {
    pub fn name(&self) -> &'static str {
        match self {
            Color::W => "White",
            Color::U => "Blue",
            Color::B => "Black",
            Color::R => "Red",
            Color::G => "Green",
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Color::W => 'W',
            Color::U => 'U',
            Color::B => 'B',
            Color::R => 'R',
            Color::G => 'G',
        }
    }

    pub fn basic_land(&self) -> &'static str {
        match self {
            Color::W => "Plains",
            Color::U => "Island",
            Color::B => "Swamp",
            Color::R => "Mountain",
            Color::G => "Forest",
        }
    }
}

pub const COLORLESS_BASIC_LAND: &str = "Wastes";

/// Basic land names available to a color identity, in WUBRG order.
pub fn basic_land_names(identity: &[Color]) -> Vec<&'static str> {
    if identity.is_empty() {
        return vec![COLORLESS_BASIC_LAND];
    }
    let mut colors = identity.to_vec();
    colors.sort();
    colors.dedup();
    colors.iter().map(|color| color.basic_land()).collect()
}

fn deserialize_identity<'de, D>(deserializer: D) -> Result<Vec<Color>, D::Error>
where
    D: Deserializer<'de>,
{
    let symbols = Vec::<String>::deserialize(deserializer)?;
    let mut colors: Vec<Color> = symbols
        .iter()
        .filter_map(|symbol| Color::from_str(symbol.trim()).ok())
        .collect();
    colors.sort();
    colors.dedup();
    Ok(colors)
}

/// Card types and subtypes of a printed type line, merged across faces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeLine {
    pub card_types: Vec<String>,
    pub subtypes: Vec<String>,
}

impl TypeLine {
    pub fn parse(type_line: &str) -> Self {
        let mut parsed = TypeLine::default();

        for face in FACE_SEPARATOR.split(type_line.trim()) {
            let mut halves = SUBTYPE_DASH.splitn(face, 2);
            let types = halves.next().unwrap_or_default();
            let subtypes = halves.next().unwrap_or_default();

            for token in types.split_whitespace() {
                if !parsed.card_types.iter().any(|t| t == token) {
                    parsed.card_types.push(token.to_string());
                }
            }
            for token in subtypes.split_whitespace() {
                if !parsed.subtypes.iter().any(|t| t == token) {
                    parsed.subtypes.push(token.to_string());
                }
            }
        }

        parsed
    }

    pub fn is(&self, card_type: &str) -> bool {
        self.card_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(card_type))
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ImageUris {
    #[serde(default)]
    pub small: Option<String>,
    #[serde(default)]
    pub normal: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Card {
    pub id: String,
    pub name: String,
    #[serde(default = "default_rarity")]
    pub rarity: Rarity,
    #[serde(default)]
    pub type_line: String,
    #[serde(default, deserialize_with = "deserialize_identity")]
    pub color_identity: Vec<Color>,
    #[serde(default)]
    pub cmc: f64,
    #[serde(default)]
    pub mana_cost: Option<String>,
    #[serde(default)]
    pub oracle_text: Option<String>,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
    #[serde(default)]
    pub edhrec_rank: Option<u32>,
    #[serde(default)]
    pub power: Option<String>,
    #[serde(default)]
    pub toughness: Option<String>,
    #[serde(default)]
    pub loyalty: Option<String>,
    #[serde(default)]
    pub set_name: String,
}

impl Card {
    pub fn types(&self) -> TypeLine {
        TypeLine::parse(&self.type_line)
    }

    pub fn is_land(&self) -> bool {
        self.types().is("Land")
    }

    pub fn is_basic_land(&self) -> bool {
        let types = self.types();
        types.is("Basic") && types.is("Land")
    }

    /// Cards whose subtypes count toward tribal synergy.
    pub fn is_creature_like(&self) -> bool {
        let types = self.types();
        types.is("Creature") || types.is("Kindred") || types.is("Tribal")
    }

    pub fn subtypes(&self) -> Vec<String> {
        self.types().subtypes
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_uris
            .as_ref()
            .and_then(|uris| uris.normal.as_deref().or(uris.small.as_deref()))
    }
}

#[cfg(test)]
impl Card {
    pub fn new(id: &str, name: &str, rarity: Rarity, type_line: &str) -> Self {
        Card {
            id: id.to_string(),
            name: name.to_string(),
            rarity,
            type_line: type_line.to_string(),
            color_identity: Vec::new(),
            cmc: 0.0,
            mana_cost: None,
            oracle_text: None,
            image_uris: None,
            edhrec_rank: None,
            power: None,
            toughness: None,
            loyalty: None,
            set_name: String::new(),
        }
    }

    pub fn with_identity(mut self, identity: &[Color]) -> Self {
        self.color_identity = identity.to_vec();
        self
    }

    pub fn with_cmc(mut self, cmc: f64) -> Self {
        self.cmc = cmc;
        self
    }
}
