// Team selection state and the derived candidate pool.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::player::{Player, Position, Team};
use super::squad::FantasySquad;

/// Number of teams a user drafts from.
pub const MAX_SELECTED_TEAMS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("already selected {max} teams")]
    TeamSelectionLimitReached { max: usize },

    #[error("unknown team `{team_id}`")]
    UnknownTeam { team_id: String },
}

// ---------------------------------------------------------------------------
// CricketFormat
// ---------------------------------------------------------------------------

/// Match format the session is drafting for. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CricketFormat {
    T20,
    Odi,
    Test,
}

impl CricketFormat {
    pub const ALL: [CricketFormat; 3] = [CricketFormat::T20, CricketFormat::Odi, CricketFormat::Test];

    pub fn from_str_format(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "T20" | "TWENTY20" => Some(CricketFormat::T20),
            "ODI" => Some(CricketFormat::Odi),
            "TEST" => Some(CricketFormat::Test),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CricketFormat::T20 => "T20",
            CricketFormat::Odi => "ODI",
            CricketFormat::Test => "Test",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            CricketFormat::T20 => "Twenty20",
            CricketFormat::Odi => "One Day International",
            CricketFormat::Test => "Test Match",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CricketFormat::T20 => "Fast-paced 20 overs per side",
            CricketFormat::Odi => "Classic 50 overs format",
            CricketFormat::Test => "Ultimate cricket test over 5 days",
        }
    }

    pub fn duration(&self) -> &'static str {
        match self {
            CricketFormat::T20 => "3 hours",
            CricketFormat::Odi => "8 hours",
            CricketFormat::Test => "5 days",
        }
    }
}

impl fmt::Display for CricketFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ---------------------------------------------------------------------------
// SelectionState
// ---------------------------------------------------------------------------

/// Where the selection is in the Empty -> Picking -> Ready progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionPhase {
    /// No team chosen.
    Empty,
    /// Some but not all teams chosen.
    Picking,
    /// All team slots filled; drafting can start.
    Ready,
}

/// Which teams the user is drafting from. The candidate pool is derived on
/// demand and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    teams: Vec<Team>,
    format: Option<CricketFormat>,
    max_teams: usize,
}

impl Default for SelectionState {
    fn default() -> Self {
        SelectionState::new(MAX_SELECTED_TEAMS)
    }
}

impl SelectionState {
    pub fn new(max_teams: usize) -> Self {
        SelectionState {
            teams: Vec::new(),
            format: None,
            max_teams,
        }
    }

    /// Selected teams in selection order.
    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn format(&self) -> Option<CricketFormat> {
        self.format
    }

    pub fn max_teams(&self) -> usize {
        self.max_teams
    }

    pub fn is_selected(&self, team_id: &str) -> bool {
        self.teams.iter().any(|t| t.id == team_id)
    }

    pub fn can_select_more(&self) -> bool {
        self.teams.len() < self.max_teams
    }

    pub fn phase(&self) -> SelectionPhase {
        if self.teams.is_empty() {
            SelectionPhase::Empty
        } else if self.can_select_more() {
            SelectionPhase::Picking
        } else {
            SelectionPhase::Ready
        }
    }

    /// Whether every team slot is filled (the signal to advance to drafting).
    pub fn is_ready(&self) -> bool {
        self.phase() == SelectionPhase::Ready
    }

    pub fn with_format(&self, format: CricketFormat) -> Self {
        SelectionState {
            format: Some(format),
            ..self.clone()
        }
    }

    /// Toggle `team`.
    ///
    /// - Selected: it is deselected. Players of that team already in a squad
    ///   are not touched; squad membership is independent of selection.
    /// - Not selected and a slot is free: it is appended.
    /// - Not selected and all slots are taken: `TeamSelectionLimitReached`.
    ///   The caller keeps the previous state, so this is a no-op.
    pub fn select_team(&self, team: &Team) -> Result<Self, SelectionError> {
        let mut next = self.clone();
        if let Some(idx) = next.teams.iter().position(|t| t.id == team.id) {
            next.teams.remove(idx);
            info!("Deselected team {}", team.name);
            return Ok(next);
        }
        if !self.can_select_more() {
            return Err(SelectionError::TeamSelectionLimitReached {
                max: self.max_teams,
            });
        }
        next.teams.push(team.clone());
        info!(
            "Selected team {} ({} players available)",
            team.name,
            team.players.len()
        );
        Ok(next)
    }

    /// Shorthand for [`candidate_pool`].
    pub fn candidate_pool<'a>(&'a self, squad: &FantasySquad) -> CandidatePool<'a> {
        candidate_pool(self, squad)
    }

    /// Empty selection with the same team limit.
    pub fn cleared(&self) -> Self {
        SelectionState::new(self.max_teams)
    }
}

// ---------------------------------------------------------------------------
// Candidate pool
// ---------------------------------------------------------------------------

/// Players of the selected teams that are not in the squad, best first.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePool<'a> {
    players: Vec<&'a Player>,
}

/// Derive the draftable players: every player of a selected team whose id is
/// not already in `squad`, sorted by points descending. Ties keep catalog
/// order (selection order, then roster order within a team).
pub fn candidate_pool<'a>(selection: &'a SelectionState, squad: &FantasySquad) -> CandidatePool<'a> {
    let mut players: Vec<&'a Player> = selection
        .teams
        .iter()
        .flat_map(|t| t.players.iter())
        .filter(|p| !squad.has_player(&p.id))
        .collect();
    // sort_by is stable
    players.sort_by(|a, b| b.points.cmp(&a.points));
    CandidatePool { players }
}

impl<'a> CandidatePool<'a> {
    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Player> + '_ {
        self.players.iter().copied()
    }

    pub fn get(&self, player_id: &str) -> Option<&'a Player> {
        self.players.iter().copied().find(|p| p.id == player_id)
    }

    /// Players at `position`, or all of them for `None`. Order preserved.
    pub fn by_position(&self, position: Option<Position>) -> impl Iterator<Item = &'a Player> + '_ {
        self.iter()
            .filter(move |p| position.map_or(true, |pos| p.position == pos))
    }

    pub fn into_vec(self) -> Vec<&'a Player> {
        self.players
    }
}

impl<'a> IntoIterator for CandidatePool<'a> {
    type Item = &'a Player;
    type IntoIter = std::vec::IntoIter<&'a Player>;

    fn into_iter(self) -> Self::IntoIter {
        self.players.into_iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::player::{PlayerStats, Price};
    use crate::draft::squad::SquadEngine;

    fn make_player(id: &str, team: &str, points: i32, position: Position) -> Player {
        Player {
            id: id.into(),
            name: format!("Player {id}"),
            position,
            team: team.into(),
            price: Price::from_hundredths(800),
            points,
            stats: PlayerStats::default(),
        }
    }

    fn make_team(id: &str, players: &[(&str, i32)]) -> Team {
        let name = format!("Team {id}");
        Team {
            id: id.into(),
            name: name.clone(),
            short_name: id.to_uppercase(),
            color: "#000000".into(),
            players: players
                .iter()
                .map(|(pid, pts)| make_player(pid, &name, *pts, Position::Batter))
                .collect(),
        }
    }

    fn ids(pool: &CandidatePool<'_>) -> Vec<String> {
        pool.iter().map(|p| p.id.clone()).collect()
    }

    #[test]
    fn starts_empty() {
        let sel = SelectionState::default();
        assert_eq!(sel.phase(), SelectionPhase::Empty);
        assert!(sel.candidate_pool(&FantasySquad::default()).is_empty());
        assert_eq!(sel.max_teams(), 2);
    }

    #[test]
    fn two_teams_then_third_rejected() {
        let a = make_team("a", &[("a1", 50), ("a2", 90)]);
        let b = make_team("b", &[("b1", 70), ("b2", 110)]);
        let c = make_team("c", &[("c1", 200)]);
        let squad = FantasySquad::default();

        let sel = SelectionState::default().select_team(&a).unwrap();
        assert_eq!(sel.phase(), SelectionPhase::Picking);
        let sel = sel.select_team(&b).unwrap();
        assert_eq!(sel.phase(), SelectionPhase::Ready);
        assert!(sel.is_ready());

        let pool = sel.candidate_pool(&squad);
        assert_eq!(ids(&pool), vec!["b2", "a2", "b1", "a1"]);

        let err = sel.select_team(&c).unwrap_err();
        assert_eq!(err, SelectionError::TeamSelectionLimitReached { max: 2 });
        // Caller keeps `sel`; pool unchanged.
        assert_eq!(ids(&sel.candidate_pool(&squad)), vec!["b2", "a2", "b1", "a1"]);
    }

    #[test]
    fn selecting_again_deselects() {
        let a = make_team("a", &[("a1", 50)]);
        let b = make_team("b", &[("b1", 70)]);
        let sel = SelectionState::default()
            .select_team(&a)
            .unwrap()
            .select_team(&b)
            .unwrap();

        let sel = sel.select_team(&a).unwrap();
        assert!(!sel.is_selected("a"));
        assert!(sel.is_selected("b"));
        assert_eq!(ids(&sel.candidate_pool(&FantasySquad::default())), vec!["b1"]);
        assert_eq!(sel.phase(), SelectionPhase::Picking);
    }

    #[test]
    fn pool_excludes_drafted_players() {
        let a = make_team("a", &[("a1", 50), ("a2", 90)]);
        let sel = SelectionState::default().select_team(&a).unwrap();
        let squad = SquadEngine::default()
            .add(&FantasySquad::default(), &a.players[1])
            .unwrap();
        assert_eq!(ids(&sel.candidate_pool(&squad)), vec!["a1"]);
    }

    #[test]
    fn deselect_keeps_drafted_players_in_squad() {
        let a = make_team("a", &[("a1", 50), ("a2", 90)]);
        let sel = SelectionState::default().select_team(&a).unwrap();
        let squad = SquadEngine::default()
            .add(&FantasySquad::default(), &a.players[0])
            .unwrap();

        let sel = sel.select_team(&a).unwrap();
        assert!(sel.candidate_pool(&squad).is_empty());
        assert!(squad.has_player("a1"));
    }

    #[test]
    fn ties_keep_catalog_order() {
        let a = make_team("a", &[("a1", 80), ("a2", 80)]);
        let b = make_team("b", &[("b1", 80), ("b2", 100)]);
        let sel = SelectionState::default()
            .select_team(&a)
            .unwrap()
            .select_team(&b)
            .unwrap();
        assert_eq!(
            ids(&sel.candidate_pool(&FantasySquad::default())),
            vec!["b2", "a1", "a2", "b1"]
        );
    }

    #[test]
    fn pool_filters_by_position() {
        let mut a = make_team("a", &[("a1", 50), ("a2", 90), ("a3", 70)]);
        a.players[1].position = Position::Bowler;
        let sel = SelectionState::default().select_team(&a).unwrap();
        let squad = FantasySquad::default();
        let pool = sel.candidate_pool(&squad);

        let bowlers: Vec<&str> = pool
            .by_position(Some(Position::Bowler))
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(bowlers, vec!["a2"]);
        assert_eq!(pool.by_position(None).count(), 3);
        assert_eq!(pool.by_position(Some(Position::WicketKeeper)).count(), 0);
        assert!(pool.get("a3").is_some());
        assert!(pool.get("zz").is_none());
    }

    #[test]
    fn format_is_recorded_and_survives_team_changes() {
        let a = make_team("a", &[("a1", 50)]);
        let sel = SelectionState::default().with_format(CricketFormat::Odi);
        let sel = sel.select_team(&a).unwrap();
        assert_eq!(sel.format(), Some(CricketFormat::Odi));
        assert_eq!(sel.cleared().format(), None);
    }

    #[test]
    fn format_parsing() {
        assert_eq!(CricketFormat::from_str_format("t20"), Some(CricketFormat::T20));
        assert_eq!(CricketFormat::from_str_format("ODI"), Some(CricketFormat::Odi));
        assert_eq!(CricketFormat::from_str_format("test"), Some(CricketFormat::Test));
        assert_eq!(CricketFormat::from_str_format("hundred"), None);
        assert_eq!(CricketFormat::Test.title(), "Test Match");
    }
}
