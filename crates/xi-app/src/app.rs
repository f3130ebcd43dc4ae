// Application orchestrator: owns all session state, processes user commands
// and assistant events, and pushes snapshots and toasts to the front end.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use xi_core::catalog::Catalog;
use xi_core::config::Config;
use xi_core::draft::player::{Player, Position};
use xi_core::draft::quota::PositionQuotaRule;
use xi_core::draft::selection::{CricketFormat, SelectionError, SelectionState};
use xi_core::draft::squad::{FantasySquad, SquadEngine, SquadError};
use xi_core::protocol::{
    AppSnapshot, ChatMessage, LlmEvent, LlmStatus, StatsReport, Step, TeamSummary, Toast, UiUpdate,
    UserCommand,
};
use xi_llm::advisor::{AdviceRequest, Advisor};
use xi_llm::prompt;

use crate::images::ImageLookup;

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Central application state, owned by the event loop.
pub struct AppState {
    pub config: Config,
    pub catalog: Catalog,
    pub selection: SelectionState,
    pub squad: FantasySquad,
    pub engine: SquadEngine,
    pub step: Step,
    /// Position filter applied to the pool in snapshots.
    pub pool_filter: Option<Position>,

    /// Completed chat turns, oldest first.
    pub chat: Vec<ChatMessage>,
    pub chat_status: LlmStatus,
    /// Text of the assistant reply currently streaming in.
    pub streaming_text: String,
    /// Incremented each time a chat task is spawned. Events from stale
    /// generations are discarded in `handle_llm_event`.
    pub llm_generation: u64,
    llm_task: Option<JoinHandle<()>>,

    advisor: Arc<dyn Advisor>,
    images: Arc<dyn ImageLookup>,
    /// Sender for assistant events; chat tasks get a clone.
    llm_tx: mpsc::Sender<LlmEvent>,
}

impl AppState {
    pub fn new(
        config: Config,
        catalog: Catalog,
        advisor: Arc<dyn Advisor>,
        images: Arc<dyn ImageLookup>,
        llm_tx: mpsc::Sender<LlmEvent>,
    ) -> Self {
        let mut engine = SquadEngine::new(config.squad.max_players);
        if config.squad.enforce_quotas {
            engine = engine.with_rule(PositionQuotaRule::new(config.squad.quotas));
        }
        AppState {
            selection: SelectionState::new(config.squad.max_teams),
            squad: FantasySquad::new(config.squad.budget_cap),
            engine,
            step: Step::Hero,
            pool_filter: None,
            chat: Vec::new(),
            chat_status: LlmStatus::Idle,
            streaming_text: String::new(),
            llm_generation: 0,
            llm_task: None,
            advisor,
            images,
            llm_tx,
            config,
            catalog,
        }
    }

    // --- Wizard navigation ---

    pub fn get_started(&mut self) {
        if self.step == Step::Hero {
            self.step = Step::TeamSelection;
            info!("Step -> TeamSelection");
        }
    }

    /// Go back one step. Squad and selection are kept.
    pub fn go_back(&mut self) {
        self.step = match self.step {
            Step::Hero | Step::TeamSelection => Step::Hero,
            Step::TeamBuilding => Step::TeamSelection,
        };
        info!("Step -> {:?}", self.step);
    }

    pub fn select_format(&mut self, format: CricketFormat) -> Toast {
        self.selection = self.selection.with_format(format);
        info!("Format selected: {}", format);
        Toast::info(
            "Format Selected",
            format!("{}: {}.", format.title(), format.description()),
        )
    }

    // --- Team selection ---

    /// Toggle a team by id or short name. Auto-advances to team building
    /// when the last team slot is filled.
    pub fn toggle_team(&mut self, key: &str) -> Vec<Toast> {
        let Some(team) = self.catalog.find_team(key) else {
            warn!("Unknown team `{}`", key);
            return vec![Toast::error(
                "Team Not Found",
                SelectionError::UnknownTeam {
                    team_id: key.to_string(),
                }
                .to_string(),
            )];
        };

        let was_selected = self.selection.is_selected(&team.id);
        let next = match self.selection.select_team(team) {
            Ok(next) => next,
            Err(e) => {
                warn!("Team selection rejected: {}", e);
                return vec![Toast::error(
                    "Team Limit Reached",
                    format!(
                        "You can only select {} teams. Deselect one first.",
                        self.selection.max_teams()
                    ),
                )];
            }
        };
        self.selection = next;
        if self.step == Step::Hero {
            self.step = Step::TeamSelection;
        }

        if was_selected {
            if self.step == Step::TeamBuilding && !self.selection.is_ready() {
                self.step = Step::TeamSelection;
                info!("Step -> TeamSelection");
            }
            return vec![Toast::info(
                "Team Deselected",
                format!("{} has been removed from your selection.", team.name),
            )];
        }

        let mut toasts = vec![Toast::info(
            "Team Selected",
            format!(
                "{} added to your selection. {} players now available.",
                team.name,
                team.players.len()
            ),
        )];
        if self.selection.is_ready() && self.step == Step::TeamSelection {
            self.step = Step::TeamBuilding;
            info!("Step -> TeamBuilding");
            toasts.push(Toast::info(
                "Ready to Build!",
                "Now select players from your selected teams to create your fantasy squad.",
            ));
        }
        toasts
    }

    // --- Squad building ---

    /// Resolve a player that is currently draftable (in the pool) or already
    /// in the squad.
    fn draft_target(&self, player_id: &str) -> Result<&Player, Toast> {
        let Some(player) = self.catalog.player(player_id) else {
            return Err(Toast::error(
                "Player Not Found",
                format!("No player with id `{player_id}`."),
            ));
        };
        let in_selected_team = self
            .selection
            .teams()
            .iter()
            .any(|t| t.players.iter().any(|p| p.id == player.id));
        if !in_selected_team && !self.squad.has_player(&player.id) {
            return Err(Toast::error(
                "Player Unavailable",
                format!("{} is not in the pool of your selected teams.", player.name),
            ));
        }
        Ok(player)
    }

    pub fn add_player(&mut self, player_id: &str) -> Toast {
        let player = match self.draft_target(player_id) {
            Ok(player) => player.clone(),
            Err(toast) => return toast,
        };
        match self.engine.add(&self.squad, &player) {
            Ok(next) => {
                self.squad = next;
                info!(
                    "Added {} ({}) for {}; {} remaining",
                    player.name,
                    player.position,
                    player.price,
                    self.squad.remaining_budget()
                );
                Toast::info(
                    "Player Added",
                    format!("{} has been added to your fantasy team!", player.name),
                )
            }
            Err(e) => squad_error_toast(&e, &player),
        }
    }

    pub fn remove_player(&mut self, player_id: &str) -> Toast {
        let name = self
            .squad
            .player(player_id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| player_id.to_string());
        match self.engine.remove(&self.squad, player_id) {
            Ok(next) => {
                self.squad = next;
                info!("Removed {}", name);
                Toast::info(
                    "Player Removed",
                    format!("{name} has been removed from your fantasy team."),
                )
            }
            Err(e) => {
                warn!("Remove rejected: {}", e);
                Toast::error(
                    "Player Not Found",
                    format!("{name} is not in your fantasy team."),
                )
            }
        }
    }

    /// Replace `out_id` with `in_id` in one step. Either both happen or
    /// neither does.
    pub fn swap_players(&mut self, out_id: &str, in_id: &str) -> Toast {
        let Some(out_name) = self.squad.player(out_id).map(|p| p.name.clone()) else {
            return Toast::error(
                "Player Not Found",
                format!("`{out_id}` is not in your fantasy team."),
            );
        };
        let incoming = match self.draft_target(in_id) {
            Ok(player) => player.clone(),
            Err(toast) => return toast,
        };
        match self.engine.swap(&self.squad, out_id, &incoming) {
            Ok(next) => {
                self.squad = next;
                info!("Swapped {} -> {}", out_name, incoming.name);
                Toast::info(
                    "Players Swapped",
                    format!("{} replaced {} in your fantasy team.", incoming.name, out_name),
                )
            }
            Err(e) => squad_error_toast(&e, &incoming),
        }
    }

    pub fn filter_pool(&mut self, position: Option<Position>) {
        self.pool_filter = position;
    }

    /// Stats for any catalog players, in the order asked.
    pub fn player_stats(&self, player_ids: &[String]) -> Result<StatsReport, Toast> {
        if player_ids.is_empty() {
            return Err(Toast::error("No Players Selected", "Name at least one player."));
        }
        let players = player_ids
            .iter()
            .map(|id| {
                self.catalog.player(id).cloned().ok_or_else(|| {
                    Toast::error("Player Not Found", format!("No player with id `{id}`."))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Stats requested for {} players", players.len());
        Ok(StatsReport { players })
    }

    /// Back to the landing step with an empty selection and squad. The chat
    /// transcript is kept.
    pub fn reset(&mut self) -> Toast {
        self.selection = self.selection.cleared();
        self.squad = self.squad.cleared();
        self.pool_filter = None;
        self.step = Step::Hero;
        info!("Game reset");
        Toast::info("Game Reset", "Starting fresh! Build your dream team again.")
    }

    // --- Assistant chat ---

    /// Cancel the in-flight chat task, if any.
    pub fn cancel_llm_task(&mut self) {
        if let Some(handle) = self.llm_task.take() {
            handle.abort();
        }
    }

    /// Record the user's question and spawn an assistant task for it.
    /// Returns false (and does nothing) for blank input.
    pub fn send_chat(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        self.chat.push(ChatMessage::user(text));

        // Aborting is not enough on its own since events may already be
        // queued; the generation bump makes handle_llm_event drop them.
        self.cancel_llm_task();
        self.llm_generation += 1;
        let generation = self.llm_generation;
        self.chat_status = LlmStatus::Streaming;
        self.streaming_text.clear();

        let request = self.advice_request();
        let advisor = Arc::clone(&self.advisor);
        let tx = self.llm_tx.clone();
        self.llm_task = Some(tokio::spawn(async move {
            if let Err(e) = advisor.advise(request, tx.clone(), generation).await {
                let _ = tx
                    .send(LlmEvent::Error {
                        message: e.to_string(),
                        generation,
                    })
                    .await;
            }
        }));
        info!("Chat request sent (gen: {})", generation);
        true
    }

    fn advice_request(&self) -> AdviceRequest {
        let pool = self.selection.candidate_pool(&self.squad);
        let quotas = self.config.squad.quotas.report(&self.squad);
        let context = prompt::build_squad_context(
            &self.selection,
            &self.squad,
            &pool,
            &quotas,
            self.engine.max_players(),
        );
        let limit = self.config.assistant.history_limit.max(1);
        let start = self.chat.len().saturating_sub(limit);
        AdviceRequest {
            system: prompt::system_prompt(),
            context,
            transcript: self.chat[start..].to_vec(),
            max_tokens: self.config.assistant.max_tokens,
        }
    }

    // --- Snapshot ---

    pub fn build_snapshot(&self) -> AppSnapshot {
        let teams = self
            .catalog
            .list_teams()
            .iter()
            .map(|t| TeamSummary::from_team(t, self.selection.is_selected(&t.id)))
            .collect();
        let pool = self
            .selection
            .candidate_pool(&self.squad)
            .by_position(self.pool_filter)
            .cloned()
            .collect();
        AppSnapshot {
            step: self.step,
            format: self.selection.format(),
            teams,
            max_teams: self.selection.max_teams(),
            squad: self.squad.players().to_vec(),
            max_players: self.engine.max_players(),
            total_points: self.squad.total_points(),
            budget: self.squad.budget(),
            remaining_budget: self.squad.remaining_budget(),
            quotas: self.config.squad.quotas.report(&self.squad),
            pool_filter: self.pool_filter,
            pool,
            chat: self.chat.clone(),
            assistant_status: self.chat_status,
        }
    }
}

/// Toast for a rejected add or swap.
fn squad_error_toast(err: &SquadError, player: &Player) -> Toast {
    warn!("{} rejected: {}", player.name, err);
    match err {
        SquadError::RosterFull { max } => Toast::error(
            "Team Full",
            format!("You can only select {max} players. Remove a player first."),
        ),
        SquadError::DuplicatePlayer { name, .. } => Toast::error(
            "Already Selected",
            format!("{name} is already in your fantasy team."),
        ),
        SquadError::BudgetExceeded { needed, remaining } => Toast::error(
            "Insufficient Budget",
            format!("You need {needed} but only have {remaining} remaining."),
        ),
        SquadError::QuotaExceeded { position, limit } => Toast::error(
            "Position Full",
            format!("You already have {limit} {position} players."),
        ),
        SquadError::PlayerNotFound { player_id } => Toast::error(
            "Player Not Found",
            format!("`{player_id}` is not in your fantasy team."),
        ),
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the application event loop.
///
/// Listens on two channels with `tokio::select!`:
/// - `llm_rx`: streamed assistant events
/// - `cmd_rx`: commands from the front end
///
/// Pushes an initial snapshot, then one snapshot after every command. Exits
/// on `UserCommand::Quit` or when the command channel closes.
pub async fn run(
    mut llm_rx: mpsc::Receiver<LlmEvent>,
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");
    send_snapshot(&state, &ui_tx).await;

    // Once the assistant channel closes, stop polling it so select! never
    // spins on a completed recv.
    let mut llm_open = true;

    loop {
        tokio::select! {
            llm_event = llm_rx.recv(), if llm_open => {
                match llm_event {
                    Some(event) => {
                        handle_llm_event(&mut state, event, &ui_tx).await;
                    }
                    None => {
                        info!("Assistant channel closed");
                        llm_open = false;
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        handle_user_command(&mut state, cmd, &ui_tx).await;
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }
        }
    }

    state.cancel_llm_task();
    info!("Application event loop exiting");
    Ok(())
}

async fn send_snapshot(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let snapshot = state.build_snapshot();
    let _ = ui_tx.send(UiUpdate::Snapshot(Box::new(snapshot))).await;
}

async fn send_toasts(toasts: Vec<Toast>, ui_tx: &mpsc::Sender<UiUpdate>) {
    for toast in toasts {
        let _ = ui_tx.send(UiUpdate::Toast(toast)).await;
    }
}

/// Handle an event from an assistant task.
///
/// Every event carries the generation of the task that produced it; events
/// from anything but the current generation are dropped.
async fn handle_llm_event(state: &mut AppState, event: LlmEvent, ui_tx: &mpsc::Sender<UiUpdate>) {
    if event.generation() != state.llm_generation {
        debug!(
            "Discarding stale assistant event (event gen: {}, current gen: {})",
            event.generation(),
            state.llm_generation
        );
        return;
    }
    if state.chat_status != LlmStatus::Streaming {
        debug!("Assistant event after completion, discarding");
        return;
    }

    match event {
        LlmEvent::Token { text, .. } => {
            state.streaming_text.push_str(&text);
            let _ = ui_tx.send(UiUpdate::ChatToken(text)).await;
        }
        LlmEvent::Complete { full_text, .. } => {
            state.chat.push(ChatMessage::assistant(full_text.clone()));
            state.streaming_text.clear();
            state.chat_status = LlmStatus::Complete;
            state.llm_task = None;
            let _ = ui_tx.send(UiUpdate::ChatComplete(full_text)).await;
        }
        LlmEvent::Error { message, .. } => {
            warn!("Assistant error: {}", message);
            state.streaming_text.clear();
            state.chat_status = LlmStatus::Error;
            state.llm_task = None;
            let _ = ui_tx.send(UiUpdate::ChatError(message)).await;
        }
    }
}

/// Handle a command from the front end.
async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match cmd {
        UserCommand::GetStarted => state.get_started(),
        UserCommand::SelectFormat(format) => {
            let toast = state.select_format(format);
            send_toasts(vec![toast], ui_tx).await;
        }
        UserCommand::ToggleTeam { team } => {
            let toasts = state.toggle_team(&team);
            send_toasts(toasts, ui_tx).await;
        }
        UserCommand::AddPlayer { player_id } => {
            let toast = state.add_player(&player_id);
            send_toasts(vec![toast], ui_tx).await;
        }
        UserCommand::RemovePlayer { player_id } => {
            let toast = state.remove_player(&player_id);
            send_toasts(vec![toast], ui_tx).await;
        }
        UserCommand::SwapPlayers { out_id, in_id } => {
            let toast = state.swap_players(&out_id, &in_id);
            send_toasts(vec![toast], ui_tx).await;
        }
        UserCommand::FilterPool(position) => state.filter_pool(position),
        UserCommand::SendChat(text) => {
            // The reply streams in separately; no snapshot needed.
            state.send_chat(&text);
            return;
        }
        UserCommand::LookupImage { player_id } => {
            match state.catalog.player(&player_id).map(|p| p.name.clone()) {
                Some(name) => {
                    // Runs off the command loop; the result arrives later.
                    let images = Arc::clone(&state.images);
                    let ui_tx = ui_tx.clone();
                    tokio::spawn(async move {
                        let image = images.lookup(&name).await;
                        let _ = ui_tx.send(UiUpdate::Image { player_id, image }).await;
                    });
                }
                None => {
                    let toast = Toast::error(
                        "Player Not Found",
                        format!("No player with id `{player_id}`."),
                    );
                    send_toasts(vec![toast], ui_tx).await;
                }
            }
            return;
        }
        UserCommand::ShowStats { player_ids } => {
            match state.player_stats(&player_ids) {
                Ok(report) => {
                    let _ = ui_tx.send(UiUpdate::Stats(report)).await;
                }
                Err(toast) => send_toasts(vec![toast], ui_tx).await,
            }
            return;
        }
        UserCommand::Back => state.go_back(),
        UserCommand::Reset => {
            let toast = state.reset();
            send_toasts(vec![toast], ui_tx).await;
        }
        UserCommand::Quit => {
            // Handled in the main loop
            return;
        }
    }
    send_snapshot(state, ui_tx).await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
