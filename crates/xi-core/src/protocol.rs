// Message types exchanged between the orchestrator, the assistant tasks,
// and front ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::draft::player::{Player, Position, Price, Team};
use crate::draft::quota::QuotaReport;
use crate::draft::selection::CricketFormat;

/// Placeholder image path used whenever no real image is available.
pub const PLACEHOLDER_IMAGE: &str = "/api/placeholder/150/150";

// ---------------------------------------------------------------------------
// Front end -> orchestrator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    /// Leave the landing screen and start picking teams.
    GetStarted,
    SelectFormat(CricketFormat),
    /// Select or deselect a team (by id or short name).
    ToggleTeam { team: String },
    AddPlayer { player_id: String },
    RemovePlayer { player_id: String },
    SwapPlayers { out_id: String, in_id: String },
    /// Restrict the pool listing to one position, or show all.
    FilterPool(Option<Position>),
    /// Ask the assistant a question.
    SendChat(String),
    LookupImage { player_id: String },
    /// Show career stats for one player, or several side by side.
    ShowStats { player_ids: Vec<String> },
    /// Go back one wizard step.
    Back,
    Reset,
    Quit,
}

// ---------------------------------------------------------------------------
// Wizard steps
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    Hero,
    TeamSelection,
    TeamBuilding,
}

// ---------------------------------------------------------------------------
// Toasts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToastVariant {
    Default,
    Destructive,
}

/// Short outcome notification for a user action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
    pub at: DateTime<Utc>,
}

impl Toast {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Toast {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Default,
            at: Utc::now(),
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Toast {
            variant: ToastVariant::Destructive,
            ..Toast::info(title, description)
        }
    }

    pub fn is_error(&self) -> bool {
        self.variant == ToastVariant::Destructive
    }
}

// ---------------------------------------------------------------------------
// Assistant chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        ChatMessage {
            role: ChatRole::User,
            text: text.into(),
            at: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        ChatMessage {
            role: ChatRole::Assistant,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LlmStatus {
    Idle,
    Streaming,
    Complete,
    Error,
}

/// Events streamed back from an assistant task. `generation` identifies
/// the request so the orchestrator can drop events from superseded ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmEvent {
    Token { text: String, generation: u64 },
    Complete { full_text: String, generation: u64 },
    Error { message: String, generation: u64 },
}

impl LlmEvent {
    pub fn generation(&self) -> u64 {
        match self {
            LlmEvent::Token { generation, .. }
            | LlmEvent::Complete { generation, .. }
            | LlmEvent::Error { generation, .. } => *generation,
        }
    }
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageRef {
    Remote(String),
    Placeholder,
}

impl ImageRef {
    pub fn url(&self) -> &str {
        match self {
            ImageRef::Remote(url) => url,
            ImageRef::Placeholder => PLACEHOLDER_IMAGE,
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator -> front end
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSummary {
    pub id: String,
    pub name: String,
    pub short_name: String,
    pub color: String,
    pub player_count: usize,
    pub selected: bool,
}

impl TeamSummary {
    pub fn from_team(team: &Team, selected: bool) -> Self {
        TeamSummary {
            id: team.id.clone(),
            name: team.name.clone(),
            short_name: team.short_name.clone(),
            color: team.color.clone(),
            player_count: team.players.len(),
            selected,
        }
    }
}

/// Everything a front end needs to render the current session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSnapshot {
    pub step: Step,
    pub format: Option<CricketFormat>,
    pub teams: Vec<TeamSummary>,
    pub max_teams: usize,
    pub squad: Vec<Player>,
    pub max_players: usize,
    pub total_points: i32,
    pub budget: Price,
    pub remaining_budget: Price,
    pub quotas: QuotaReport,
    pub pool_filter: Option<Position>,
    /// Candidate pool after `pool_filter`, best first.
    pub pool: Vec<Player>,
    pub chat: Vec<ChatMessage>,
    pub assistant_status: LlmStatus,
}

impl AppSnapshot {
    pub fn selected_teams(&self) -> impl Iterator<Item = &TeamSummary> {
        self.teams.iter().filter(|t| t.selected)
    }

    pub fn can_add_more(&self) -> bool {
        self.squad.len() < self.max_players
    }
}

/// Stats for the players asked about, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsReport {
    pub players: Vec<Player>,
}

impl StatsReport {
    /// More than one player: shown side by side.
    pub fn is_comparative(&self) -> bool {
        self.players.len() > 1
    }

    pub fn title(&self) -> &'static str {
        if self.is_comparative() {
            "Comparative Stats"
        } else {
            "Player Stats"
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    Snapshot(Box<AppSnapshot>),
    Toast(Toast),
    ChatToken(String),
    ChatComplete(String),
    ChatError(String),
    Image { player_id: String, image: ImageRef },
    Stats(StatsReport),
}
