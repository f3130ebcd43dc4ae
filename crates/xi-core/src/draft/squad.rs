// Fantasy squad and the roster rules enforced on every mutation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::player::{Player, Position, Price};

/// Maximum number of players in a squad.
pub const MAX_SQUAD_SIZE: usize = 11;

/// Default spending cap: 100.0M.
pub const DEFAULT_BUDGET_CAP: Price = Price::from_hundredths(10_000);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a squad operation was rejected. Never fatal: the squad passed in is
/// left as it was and remains the authoritative state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SquadError {
    #[error("squad already has {max} players")]
    RosterFull { max: usize },

    #[error("{name} is already in the squad")]
    DuplicatePlayer { player_id: String, name: String },

    #[error("need {needed} but only {remaining} remaining")]
    BudgetExceeded { needed: Price, remaining: Price },

    #[error("player `{player_id}` is not in the squad")]
    PlayerNotFound { player_id: String },

    #[error("{position} quota of {limit} already reached")]
    QuotaExceeded { position: Position, limit: usize },
}

// ---------------------------------------------------------------------------
// FantasySquad
// ---------------------------------------------------------------------------

/// The user's drafted players in draft order, plus the budget cap.
///
/// Points and remaining budget are always computed from the current members;
/// there is no way to set them independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FantasySquad {
    players: Vec<Player>,
    budget: Price,
}

impl Default for FantasySquad {
    fn default() -> Self {
        FantasySquad::new(DEFAULT_BUDGET_CAP)
    }
}

impl FantasySquad {
    /// An empty squad with the given budget cap.
    pub fn new(budget: Price) -> Self {
        FantasySquad {
            players: Vec::new(),
            budget,
        }
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// The budget cap.
    pub fn budget(&self) -> Price {
        self.budget
    }

    /// Sum of member prices.
    pub fn spent(&self) -> Price {
        self.players.iter().map(|p| p.price).sum()
    }

    /// Budget cap minus the sum of member prices.
    pub fn remaining_budget(&self) -> Price {
        self.budget.saturating_sub(self.spent())
    }

    /// Sum of member points.
    pub fn total_points(&self) -> i32 {
        self.players.iter().map(|p| p.points).sum()
    }

    pub fn has_player(&self, player_id: &str) -> bool {
        self.players.iter().any(|p| p.id == player_id)
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    /// Number of members playing the given position.
    pub fn count_at(&self, position: Position) -> usize {
        self.players.iter().filter(|p| p.position == position).count()
    }

    /// Member counts for every position (zero counts included).
    pub fn position_counts(&self) -> BTreeMap<Position, usize> {
        Position::ALL
            .iter()
            .map(|&pos| (pos, self.count_at(pos)))
            .collect()
    }

    /// An empty squad with the same budget cap.
    pub fn cleared(&self) -> Self {
        FantasySquad::new(self.budget)
    }
}

// ---------------------------------------------------------------------------
// Pluggable rules
// ---------------------------------------------------------------------------

/// An extra admission check run after the built-in size, duplicate and
/// budget checks.
pub trait SquadRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Decide whether `incoming` may join `squad`. `squad` never contains
    /// `incoming` when this is called.
    fn check(&self, squad: &FantasySquad, incoming: &Player) -> Result<(), SquadError>;
}

// ---------------------------------------------------------------------------
// SquadEngine
// ---------------------------------------------------------------------------

/// Applies add/remove/swap to squads, returning new squads.
pub struct SquadEngine {
    max_players: usize,
    rules: Vec<Box<dyn SquadRule>>,
}

impl Default for SquadEngine {
    fn default() -> Self {
        SquadEngine::new(MAX_SQUAD_SIZE)
    }
}

impl fmt::Debug for SquadEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SquadEngine")
            .field("max_players", &self.max_players)
            .field(
                "rules",
                &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl SquadEngine {
    pub fn new(max_players: usize) -> Self {
        SquadEngine {
            max_players,
            rules: Vec::new(),
        }
    }

    /// Install an additional admission rule.
    pub fn with_rule(mut self, rule: impl SquadRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    pub fn can_add_more(&self, squad: &FantasySquad) -> bool {
        squad.len() < self.max_players
    }

    /// Validate an addition without performing it.
    ///
    /// Check order: roster size, duplicate, budget, then installed rules.
    pub fn check_add(&self, squad: &FantasySquad, player: &Player) -> Result<(), SquadError> {
        if squad.len() >= self.max_players {
            return Err(SquadError::RosterFull {
                max: self.max_players,
            });
        }
        if squad.has_player(&player.id) {
            return Err(SquadError::DuplicatePlayer {
                player_id: player.id.clone(),
                name: player.name.clone(),
            });
        }
        let remaining = squad.remaining_budget();
        if remaining < player.price {
            return Err(SquadError::BudgetExceeded {
                needed: player.price,
                remaining,
            });
        }
        for rule in &self.rules {
            rule.check(squad, player)?;
        }
        Ok(())
    }

    /// Append `player` to the squad.
    pub fn add(&self, squad: &FantasySquad, player: &Player) -> Result<FantasySquad, SquadError> {
        if let Err(e) = self.check_add(squad, player) {
            debug!(player_id = %player.id, error = %e, "add rejected");
            return Err(e);
        }
        let mut next = squad.clone();
        next.players.push(player.clone());
        Ok(next)
    }

    /// Remove the player with `player_id`. Removing an absent player fails
    /// with `PlayerNotFound` every time.
    pub fn remove(&self, squad: &FantasySquad, player_id: &str) -> Result<FantasySquad, SquadError> {
        let Some(idx) = squad.players.iter().position(|p| p.id == player_id) else {
            debug!(player_id, "remove rejected: not in squad");
            return Err(SquadError::PlayerNotFound {
                player_id: player_id.to_string(),
            });
        };
        let mut next = squad.clone();
        next.players.remove(idx);
        Ok(next)
    }

    /// Replace `out_id` with `incoming`: remove followed by add, with the
    /// incoming player appended at the end.
    ///
    /// Atomic: both legs are validated before anything is returned, so on
    /// failure the caller still holds the original squad with `out_id` in
    /// place. The squad size never drops by one because of a failed add leg.
    pub fn swap(
        &self,
        squad: &FantasySquad,
        out_id: &str,
        incoming: &Player,
    ) -> Result<FantasySquad, SquadError> {
        let without = self.remove(squad, out_id)?;
        self.add(&without, incoming)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
