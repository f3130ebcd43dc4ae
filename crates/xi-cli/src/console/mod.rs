// Line-oriented console front end.
//
// Reads commands from stdin, forwards them to the orchestrator, and prints
// toasts, assistant output and views rendered from the latest snapshot.

pub mod input;
pub mod render;

use std::io::Write as _;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

use xi_core::protocol::{AppSnapshot, UiUpdate, UserCommand};

use input::{LineOutcome, View};

/// Console-side state: the last snapshot plus bookkeeping for output.
#[derive(Debug, Default)]
pub struct ViewState {
    pub snapshot: Option<AppSnapshot>,
    /// View to print when the next snapshot arrives.
    pub pending_view: Option<View>,
    /// An assistant reply is being printed token by token.
    pub streaming: bool,
}

impl ViewState {
    pub fn render_view(&self, view: View) -> String {
        if view == View::Help {
            return render::help_text();
        }
        let Some(snapshot) = &self.snapshot else {
            return "(waiting for state)\n".to_string();
        };
        match view {
            View::Teams => render::render_teams(snapshot),
            View::Pool => render::render_pool(snapshot),
            View::Squad => render::render_squad(snapshot),
            View::Help => render::help_text(),
        }
    }
}

/// Apply an update from the orchestrator and return the text to print.
pub fn apply_ui_update(view_state: &mut ViewState, update: UiUpdate) -> String {
    match update {
        UiUpdate::Snapshot(snapshot) => {
            let step_changed = view_state
                .snapshot
                .as_ref()
                .map_or(true, |prev| prev.step != snapshot.step);
            view_state.snapshot = Some(*snapshot);
            let pending = view_state.pending_view.take();
            match (step_changed, pending) {
                (true, _) => view_state
                    .snapshot
                    .as_ref()
                    .map(render::render_step)
                    .unwrap_or_default(),
                (false, Some(view)) => view_state.render_view(view),
                (false, None) => String::new(),
            }
        }
        UiUpdate::Toast(toast) => render::render_toast(&toast),
        UiUpdate::ChatToken(text) => {
            if view_state.streaming {
                text
            } else {
                view_state.streaming = true;
                format!("assistant> {text}")
            }
        }
        UiUpdate::ChatComplete(full_text) => {
            if std::mem::take(&mut view_state.streaming) {
                "\n".to_string()
            } else {
                format!("assistant> {full_text}\n")
            }
        }
        UiUpdate::ChatError(message) => {
            let prefix = if std::mem::take(&mut view_state.streaming) {
                "\n"
            } else {
                ""
            };
            format!("{prefix}! Assistant error: {message}\n")
        }
        UiUpdate::Image { player_id, image } => format!("image {player_id}: {}\n", image.url()),
        UiUpdate::Stats(report) => render::render_stats(&report),
    }
}

fn print_flush(text: &str) {
    if text.is_empty() {
        return;
    }
    let mut stdout = std::io::stdout().lock();
    let _ = stdout.write_all(text.as_bytes());
    let _ = stdout.flush();
}

/// Run the console until the user quits, stdin closes, or the orchestrator
/// goes away.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut view_state = ViewState::default();

    loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(update) => {
                        let text = apply_ui_update(&mut view_state, update);
                        print_flush(&text);
                    }
                    None => {
                        info!("UI channel closed, console exiting");
                        break;
                    }
                }
            }

            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("stdin closed, quitting");
                    let _ = cmd_tx.send(UserCommand::Quit).await;
                    break;
                };
                match input::handle_line(&line, &mut view_state) {
                    LineOutcome::Send(cmd) => {
                        debug!(?cmd, "console command");
                        let quit = cmd == UserCommand::Quit;
                        if cmd_tx.send(cmd).await.is_err() || quit {
                            break;
                        }
                    }
                    LineOutcome::Print(text) => print_flush(&text),
                    LineOutcome::Nothing => {}
                }
            }
        }
    }

    Ok(())
}
