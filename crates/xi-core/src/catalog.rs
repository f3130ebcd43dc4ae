// Team catalog: fixed team and player reference data loaded from CSV.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::draft::player::{Player, PlayerStats, Position, Price, Team};

const BUILTIN_TEAMS_CSV: &str = include_str!("../data/teams.csv");
const BUILTIN_PLAYERS_CSV: &str = include_str!("../data/players.csv");
const BUILTIN_SOURCE: &str = "<builtin>";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("duplicate team id `{team_id}`")]
    DuplicateTeam { team_id: String },

    #[error("duplicate player id `{player_id}`")]
    DuplicatePlayer { player_id: String },

    #[error("player `{player_id}` references unknown team `{team_id}`")]
    UnknownTeam { player_id: String, team_id: String },

    #[error("player `{player_id}` has unknown position `{position}`")]
    InvalidPosition { player_id: String, position: String },

    #[error("player `{player_id}` has invalid price {price}")]
    InvalidPrice { player_id: String, price: f64 },
}

// ---------------------------------------------------------------------------
// Raw CSV rows (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawTeam {
    id: String,
    name: String,
    short_name: String,
    #[serde(default)]
    color: String,
}

/// One player row. Role-specific stat columns are left empty when they do
/// not apply.
#[derive(Debug, Deserialize)]
struct RawPlayer {
    id: String,
    name: String,
    position: String,
    team_id: String,
    price: f64,
    points: i32,
    #[serde(default)]
    matches: u32,
    runs: Option<u32>,
    wickets: Option<u32>,
    catches: Option<u32>,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Read-only set of teams, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    teams: Vec<Team>,
}

impl Catalog {
    /// Build a catalog from already-constructed teams.
    pub fn new(teams: Vec<Team>) -> Self {
        Catalog { teams }
    }

    /// The fixture catalog compiled into the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_readers(
            BUILTIN_TEAMS_CSV.as_bytes(),
            BUILTIN_SOURCE,
            BUILTIN_PLAYERS_CSV.as_bytes(),
            BUILTIN_SOURCE,
        )
    }

    /// Load a catalog from a teams CSV and a players CSV on disk.
    pub fn from_paths(teams_path: &Path, players_path: &Path) -> Result<Self, CatalogError> {
        let teams_file = std::fs::File::open(teams_path).map_err(|e| CatalogError::Io {
            path: teams_path.display().to_string(),
            source: e,
        })?;
        let players_file = std::fs::File::open(players_path).map_err(|e| CatalogError::Io {
            path: players_path.display().to_string(),
            source: e,
        })?;
        let catalog = Self::from_readers(
            teams_file,
            &teams_path.display().to_string(),
            players_file,
            &players_path.display().to_string(),
        )?;
        info!(
            "Loaded catalog from {} and {}: {} teams",
            teams_path.display(),
            players_path.display(),
            catalog.teams.len()
        );
        Ok(catalog)
    }

    fn from_readers<T: Read, P: Read>(
        teams_rdr: T,
        teams_source: &str,
        players_rdr: P,
        players_source: &str,
    ) -> Result<Self, CatalogError> {
        let csv_err = |path: &str| {
            let path = path.to_string();
            move |e: csv::Error| CatalogError::Csv { path, source: e }
        };

        let mut teams: Vec<Team> = Vec::new();
        let mut reader = csv::Reader::from_reader(teams_rdr);
        for row in reader.deserialize::<RawTeam>() {
            let raw = row.map_err(csv_err(teams_source))?;
            let team_id = raw.id.trim().to_string();
            if teams.iter().any(|t| t.id == team_id) {
                return Err(CatalogError::DuplicateTeam { team_id });
            }
            teams.push(Team {
                id: team_id,
                name: raw.name.trim().to_string(),
                short_name: raw.short_name.trim().to_string(),
                color: raw.color.trim().to_string(),
                players: Vec::new(),
            });
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut reader = csv::Reader::from_reader(players_rdr);
        for row in reader.deserialize::<RawPlayer>() {
            let raw = row.map_err(csv_err(players_source))?;
            let player_id = raw.id.trim().to_string();
            if !seen.insert(player_id.clone()) {
                return Err(CatalogError::DuplicatePlayer { player_id });
            }
            let position =
                Position::from_str_pos(&raw.position).ok_or_else(|| CatalogError::InvalidPosition {
                    player_id: player_id.clone(),
                    position: raw.position.clone(),
                })?;
            let price = Price::from_millions(raw.price).ok_or(CatalogError::InvalidPrice {
                player_id: player_id.clone(),
                price: raw.price,
            })?;
            let team_id = raw.team_id.trim();
            let Some(team) = teams.iter_mut().find(|t| t.id == team_id) else {
                return Err(CatalogError::UnknownTeam {
                    player_id,
                    team_id: team_id.to_string(),
                });
            };
            team.players.push(Player {
                id: player_id,
                name: raw.name.trim().to_string(),
                position,
                team: team.name.clone(),
                price,
                points: raw.points,
                stats: PlayerStats {
                    matches: raw.matches,
                    runs: raw.runs,
                    wickets: raw.wickets,
                    catches: raw.catches,
                },
            });
        }

        Ok(Catalog { teams })
    }

    /// All teams in stable catalog order.
    pub fn list_teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn team(&self, team_id: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == team_id)
    }

    /// Look up a team by id or short name, ignoring case ("ind", "IND").
    pub fn find_team(&self, key: &str) -> Option<&Team> {
        let key = key.trim();
        self.teams
            .iter()
            .find(|t| t.id.eq_ignore_ascii_case(key) || t.short_name.eq_ignore_ascii_case(key))
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players().find(|p| p.id == player_id)
    }

    /// Every player of every team, in catalog order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.teams.iter().flat_map(|t| t.players.iter())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
