// Player and team reference data: positions, prices, stats.

use std::fmt;
use std::iter::Sum;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Cricket playing roles used for quota counting and pool filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    Batter,
    Bowler,
    WicketKeeper,
    AllRounder,
}

impl Position {
    /// All positions in display order.
    pub const ALL: [Position; 4] = [
        Position::Batter,
        Position::Bowler,
        Position::WicketKeeper,
        Position::AllRounder,
    ];

    /// Parse a position string into a Position enum.
    ///
    /// Accepts the display names ("Wicket-Keeper"), the older "Batsman"
    /// spelling, and short codes ("BAT", "BOWL", "WK", "AR"). Case-insensitive.
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "BATTER" | "BATSMAN" | "BAT" => Some(Position::Batter),
            "BOWLER" | "BOWL" => Some(Position::Bowler),
            "WICKET-KEEPER" | "WICKETKEEPER" | "KEEPER" | "WK" => Some(Position::WicketKeeper),
            "ALL-ROUNDER" | "ALLROUNDER" | "AR" => Some(Position::AllRounder),
            _ => None,
        }
    }

    /// Return the display string for this position.
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Batter => "Batter",
            Position::Bowler => "Bowler",
            Position::WicketKeeper => "Wicket-Keeper",
            Position::AllRounder => "All-Rounder",
        }
    }

    /// Short code used in compact listings.
    pub fn abbrev(&self) -> &'static str {
        match self {
            Position::Batter => "BAT",
            Position::Bowler => "BOWL",
            Position::WicketKeeper => "WK",
            Position::AllRounder => "AR",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

// ---------------------------------------------------------------------------
// Price
// ---------------------------------------------------------------------------

/// A price in "M" credits, stored as hundredths so that budget reductions
/// are exact. Serializes as a decimal number of millions (e.g. `9.5`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "f64", into = "f64")]
pub struct Price(u32);

impl Price {
    pub const ZERO: Price = Price(0);

    pub const fn from_hundredths(hundredths: u32) -> Self {
        Price(hundredths)
    }

    /// Convert a decimal amount of millions, rounding to the nearest
    /// hundredth. Returns `None` for negative, non-finite, or oversized values.
    pub fn from_millions(millions: f64) -> Option<Self> {
        if !millions.is_finite() || millions < 0.0 {
            return None;
        }
        let hundredths = (millions * 100.0).round();
        if hundredths > f64::from(u32::MAX) {
            return None;
        }
        Some(Price(hundredths as u32))
    }

    pub fn hundredths(self) -> u32 {
        self.0
    }

    pub fn as_millions(self) -> f64 {
        f64::from(self.0) / 100.0
    }

    pub fn checked_add(self, other: Price) -> Option<Price> {
        self.0.checked_add(other.0).map(Price)
    }

    pub fn checked_sub(self, other: Price) -> Option<Price> {
        self.0.checked_sub(other.0).map(Price)
    }

    pub fn saturating_sub(self, other: Price) -> Price {
        Price(self.0.saturating_sub(other.0))
    }
}

impl TryFrom<f64> for Price {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Price::from_millions(value)
            .ok_or_else(|| format!("invalid price {value}: must be a finite, non-negative amount"))
    }
}

impl From<Price> for f64 {
    fn from(price: Price) -> f64 {
        price.as_millions()
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Price>>(iter: I) -> Price {
        Price(iter.map(|p| p.0).sum())
    }
}

impl<'a> Sum<&'a Price> for Price {
    fn sum<I: Iterator<Item = &'a Price>>(iter: I) -> Price {
        iter.copied().sum()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac % 10 == 0 {
            write!(f, "${}.{}M", whole, frac / 10)
        } else {
            write!(f, "${}.{:02}M", whole, frac)
        }
    }
}

// ---------------------------------------------------------------------------
// Player / Team
// ---------------------------------------------------------------------------

/// Career numbers shown alongside a player. Which optional fields are set
/// depends on the player's role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub matches: u32,
    #[serde(default)]
    pub runs: Option<u32>,
    #[serde(default)]
    pub wickets: Option<u32>,
    #[serde(default)]
    pub catches: Option<u32>,
}

impl PlayerStats {
    /// Labelled values in display order. Role stats that do not apply are
    /// left out.
    pub fn entries(&self) -> Vec<(&'static str, u32)> {
        let mut entries = vec![("Matches", self.matches)];
        entries.extend(self.runs.map(|v| ("Runs", v)));
        entries.extend(self.wickets.map(|v| ("Wickets", v)));
        entries.extend(self.catches.map(|v| ("Catches", v)));
        entries
    }

    /// Compact form, e.g. "295 matches, 13906 runs".
    pub fn summary(&self) -> String {
        self.entries()
            .iter()
            .map(|(label, value)| format!("{} {}", value, label.to_lowercase()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A draftable player. Immutable reference data loaded from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub position: Position,
    /// Name of the owning team.
    pub team: String,
    pub price: Price,
    /// Fantasy points; may be negative.
    pub points: i32,
    pub stats: PlayerStats,
}

impl Player {
    /// Upper-cased first letter of each word of the name ("Virat Kohli" -> "VK").
    pub fn initials(&self) -> String {
        self.name
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .flat_map(char::to_uppercase)
            .collect()
    }
}

/// A real-world team and its players in roster order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub short_name: String,
    /// Display color as a hex string, e.g. "#1e40af".
    pub color: String,
    pub players: Vec<Player>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(name: &str) -> Player {
        Player {
            id: "p1".into(),
            name: name.into(),
            position: Position::Batter,
            team: "India".into(),
            price: Price::from_hundredths(900),
            points: 120,
            stats: PlayerStats::default(),
        }
    }

    #[test]
    fn position_parses_display_names_and_codes() {
        assert_eq!(Position::from_str_pos("Batsman"), Some(Position::Batter));
        assert_eq!(Position::from_str_pos("batter"), Some(Position::Batter));
        assert_eq!(Position::from_str_pos("Wicket-Keeper"), Some(Position::WicketKeeper));
        assert_eq!(Position::from_str_pos("wk"), Some(Position::WicketKeeper));
        assert_eq!(Position::from_str_pos(" AR "), Some(Position::AllRounder));
        assert_eq!(Position::from_str_pos("bowl"), Some(Position::Bowler));
        assert_eq!(Position::from_str_pos("pitcher"), None);
    }

    #[test]
    fn position_display_matches_from_str() {
        for pos in Position::ALL {
            assert_eq!(Position::from_str_pos(pos.display_str()), Some(pos));
            assert_eq!(Position::from_str_pos(pos.abbrev()), Some(pos));
        }
    }

    #[test]
    fn price_from_millions_rounds_to_hundredths() {
        assert_eq!(Price::from_millions(9.5), Some(Price::from_hundredths(950)));
        assert_eq!(Price::from_millions(0.1 + 0.2), Some(Price::from_hundredths(30)));
        assert_eq!(Price::from_millions(0.0), Some(Price::ZERO));
    }

    #[test]
    fn price_rejects_negative_and_non_finite() {
        assert_eq!(Price::from_millions(-1.0), None);
        assert_eq!(Price::from_millions(f64::NAN), None);
        assert_eq!(Price::from_millions(f64::INFINITY), None);
    }

    #[test]
    fn price_sum_is_exact() {
        let prices = vec![Price::from_millions(0.1).unwrap(); 10];
        let total: Price = prices.iter().sum();
        assert_eq!(total, Price::from_hundredths(100));
        assert_eq!(total.as_millions(), 1.0);
    }

    #[test]
    fn price_display() {
        assert_eq!(Price::from_hundredths(950).to_string(), "$9.5M");
        assert_eq!(Price::from_hundredths(10_000).to_string(), "$100.0M");
        assert_eq!(Price::from_hundredths(875).to_string(), "$8.75M");
    }

    #[test]
    fn price_serde_as_decimal_millions() {
        let json = serde_json::to_string(&Price::from_hundredths(950)).unwrap();
        assert_eq!(json, "9.5");
        let back: Price = serde_json::from_str("7.25").unwrap();
        assert_eq!(back, Price::from_hundredths(725));
        assert!(serde_json::from_str::<Price>("-3.0").is_err());
    }

    #[test]
    fn initials_from_name_words() {
        assert_eq!(player("Virat Kohli").initials(), "VK");
        assert_eq!(player("ravindra  jadeja").initials(), "RJ");
        assert_eq!(player("Babar").initials(), "B");
    }

    #[test]
    fn stats_entries_skip_missing_role_stats() {
        let stats = PlayerStats {
            matches: 31,
            runs: Some(871),
            wickets: None,
            catches: Some(27),
        };
        assert_eq!(
            stats.entries(),
            vec![("Matches", 31), ("Runs", 871), ("Catches", 27)]
        );
        assert_eq!(stats.summary(), "31 matches, 871 runs, 27 catches");
        assert_eq!(PlayerStats::default().summary(), "0 matches");
    }
}
