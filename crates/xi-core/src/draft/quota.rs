// Per-position quotas: display counters and an optional enforcing rule.

use serde::{Deserialize, Serialize};

use super::player::{Player, Position};
use super::squad::{FantasySquad, SquadError, SquadRule};

/// Target counts per position. Informational unless a [`PositionQuotaRule`]
/// is installed on the squad engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionQuotas {
    pub batter: usize,
    pub bowler: usize,
    pub wicket_keeper: usize,
    pub all_rounder: usize,
}

impl Default for PositionQuotas {
    fn default() -> Self {
        PositionQuotas {
            batter: 6,
            bowler: 6,
            wicket_keeper: 2,
            all_rounder: 4,
        }
    }
}

impl PositionQuotas {
    pub fn limit(&self, position: Position) -> usize {
        match position {
            Position::Batter => self.batter,
            Position::Bowler => self.bowler,
            Position::WicketKeeper => self.wicket_keeper,
            Position::AllRounder => self.all_rounder,
        }
    }

    /// Current count against the limit for every position, in display order.
    pub fn report(&self, squad: &FantasySquad) -> QuotaReport {
        let lines = Position::ALL
            .iter()
            .map(|&position| QuotaLine {
                position,
                count: squad.count_at(position),
                limit: self.limit(position),
            })
            .collect();
        QuotaReport { lines }
    }
}

/// One "Batters: 3/6" style counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaLine {
    pub position: Position,
    pub count: usize,
    pub limit: usize,
}

impl QuotaLine {
    pub fn is_full(&self) -> bool {
        self.count >= self.limit
    }

    pub fn is_over(&self) -> bool {
        self.count > self.limit
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaReport {
    pub lines: Vec<QuotaLine>,
}

impl QuotaReport {
    pub fn line(&self, position: Position) -> Option<&QuotaLine> {
        self.lines.iter().find(|l| l.position == position)
    }

    /// Positions whose count exceeds the limit (possible while quotas are
    /// display-only).
    pub fn over_quota(&self) -> Vec<Position> {
        self.lines
            .iter()
            .filter(|l| l.is_over())
            .map(|l| l.position)
            .collect()
    }
}

/// Squad rule that turns position quotas into hard constraints.
#[derive(Debug, Clone, Copy)]
pub struct PositionQuotaRule {
    quotas: PositionQuotas,
}

impl PositionQuotaRule {
    pub fn new(quotas: PositionQuotas) -> Self {
        PositionQuotaRule { quotas }
    }
}

impl SquadRule for PositionQuotaRule {
    fn name(&self) -> &'static str {
        "position-quota"
    }

    fn check(&self, squad: &FantasySquad, incoming: &Player) -> Result<(), SquadError> {
        let limit = self.quotas.limit(incoming.position);
        if squad.count_at(incoming.position) >= limit {
            return Err(SquadError::QuotaExceeded {
                position: incoming.position,
                limit,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::player::{Price, PlayerStats};
    use crate::draft::squad::{SquadEngine, DEFAULT_BUDGET_CAP};

    fn make_player(id: &str, position: Position) -> Player {
        Player {
            id: id.into(),
            name: format!("Player {id}"),
            position,
            team: "Test XI".into(),
            price: Price::from_hundredths(500),
            points: 50,
            stats: PlayerStats::default(),
        }
    }

    fn squad_with(players: &[Player]) -> FantasySquad {
        let engine = SquadEngine::default();
        players.iter().fold(FantasySquad::new(DEFAULT_BUDGET_CAP), |squad, p| {
            engine.add(&squad, p).unwrap()
        })
    }

    #[test]
    fn default_quotas() {
        let q = PositionQuotas::default();
        assert_eq!(q.limit(Position::Batter), 6);
        assert_eq!(q.limit(Position::Bowler), 6);
        assert_eq!(q.limit(Position::WicketKeeper), 2);
        assert_eq!(q.limit(Position::AllRounder), 4);
    }

    #[test]
    fn report_counts_each_position_in_display_order() {
        let squad = squad_with(&[
            make_player("b1", Position::Batter),
            make_player("b2", Position::Batter),
            make_player("wk1", Position::WicketKeeper),
        ]);
        let report = PositionQuotas::default().report(&squad);

        let positions: Vec<Position> = report.lines.iter().map(|l| l.position).collect();
        assert_eq!(positions, Position::ALL.to_vec());
        assert_eq!(report.line(Position::Batter).unwrap().count, 2);
        assert_eq!(report.line(Position::WicketKeeper).unwrap().count, 1);
        assert_eq!(report.line(Position::Bowler).unwrap().count, 0);
        assert!(report.over_quota().is_empty());
    }

    #[test]
    fn quotas_are_display_only_without_rule() {
        // Three keepers against a limit of two: the default engine allows it.
        let squad = squad_with(&[
            make_player("wk1", Position::WicketKeeper),
            make_player("wk2", Position::WicketKeeper),
            make_player("wk3", Position::WicketKeeper),
        ]);
        let report = PositionQuotas::default().report(&squad);
        assert!(report.line(Position::WicketKeeper).unwrap().is_over());
        assert_eq!(report.over_quota(), vec![Position::WicketKeeper]);
    }

    #[test]
    fn rule_blocks_player_beyond_quota() {
        let engine =
            SquadEngine::default().with_rule(PositionQuotaRule::new(PositionQuotas::default()));
        let squad = squad_with(&[
            make_player("wk1", Position::WicketKeeper),
            make_player("wk2", Position::WicketKeeper),
        ]);

        let err = engine
            .add(&squad, &make_player("wk3", Position::WicketKeeper))
            .unwrap_err();
        assert_eq!(
            err,
            SquadError::QuotaExceeded {
                position: Position::WicketKeeper,
                limit: 2,
            }
        );

        // Other positions are unaffected.
        assert!(engine.add(&squad, &make_player("bat1", Position::Batter)).is_ok());
    }

    #[test]
    fn rule_allows_swap_within_same_position_at_quota() {
        let engine =
            SquadEngine::default().with_rule(PositionQuotaRule::new(PositionQuotas::default()));
        let squad = squad_with(&[
            make_player("wk1", Position::WicketKeeper),
            make_player("wk2", Position::WicketKeeper),
        ]);
        let swapped = engine
            .swap(&squad, "wk1", &make_player("wk3", Position::WicketKeeper))
            .unwrap();
        assert!(swapped.has_player("wk3"));
        assert!(!swapped.has_player("wk1"));
    }
}
