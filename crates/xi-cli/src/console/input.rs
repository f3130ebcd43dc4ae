// Console line parsing and command dispatch.
//
// Translates one line of user input into a UserCommand for the orchestrator,
// or into a local view request that is answered from the last snapshot.

use xi_core::draft::player::{Player, Position};
use xi_core::draft::selection::CricketFormat;
use xi_core::protocol::{AppSnapshot, UserCommand};

use super::ViewState;

/// A local listing the console can print from the last snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Teams,
    Pool,
    Squad,
    Help,
}

/// What a line of input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Forward to the orchestrator, then show `view` once the resulting
    /// snapshot arrives.
    Command { cmd: UserCommand, view: Option<View> },
    /// Print a view immediately.
    Show(View),
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("unknown command `{0}` (type `help` for a list)")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("unknown format `{0}` (expected t20, odi or test)")]
    UnknownFormat(String),

    #[error("unknown position `{0}` (expected bat, bowl, wk, ar or all)")]
    UnknownPosition(String),

    #[error("no entry #{index} in the {list} listing")]
    BadIndex { index: usize, list: &'static str },
}

/// Parse one console line.
///
/// Player arguments are ids (`ind-07`) or 1-based positions in the last
/// listing: the pool for `add`/`image`/`stats` and the incoming side of `swap`, the
/// squad for `remove` and the outgoing side of `swap`.
pub fn parse_line(line: &str, snapshot: Option<&AppSnapshot>) -> Result<Input, InputError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    if word.is_empty() {
        return Ok(Input::Empty);
    }
    let args: Vec<&str> = rest.split_whitespace().collect();
    let pool = snapshot.map(|s| s.pool.as_slice()).unwrap_or(&[]);
    let squad = snapshot.map(|s| s.squad.as_slice()).unwrap_or(&[]);

    let cmd = |cmd: UserCommand| Ok(Input::Command { cmd, view: None });

    match word.to_ascii_lowercase().as_str() {
        "start" => Ok(Input::Command {
            cmd: UserCommand::GetStarted,
            view: Some(View::Teams),
        }),
        "format" => {
            let [arg] = args[..] else {
                return Err(InputError::Usage("format <t20|odi|test>"));
            };
            let format = CricketFormat::from_str_format(arg)
                .ok_or_else(|| InputError::UnknownFormat(arg.to_string()))?;
            cmd(UserCommand::SelectFormat(format))
        }
        "teams" => Ok(Input::Show(View::Teams)),
        "select" => {
            let [team] = args[..] else {
                return Err(InputError::Usage("select <team>"));
            };
            cmd(UserCommand::ToggleTeam {
                team: team.to_string(),
            })
        }
        "pool" => {
            let filter = match args[..] {
                [] => None,
                [arg] if arg.eq_ignore_ascii_case("all") => None,
                [arg] => Some(
                    Position::from_str_pos(arg)
                        .ok_or_else(|| InputError::UnknownPosition(arg.to_string()))?,
                ),
                _ => return Err(InputError::Usage("pool [bat|bowl|wk|ar|all]")),
            };
            Ok(Input::Command {
                cmd: UserCommand::FilterPool(filter),
                view: Some(View::Pool),
            })
        }
        "add" => {
            let [arg] = args[..] else {
                return Err(InputError::Usage("add <player>"));
            };
            cmd(UserCommand::AddPlayer {
                player_id: resolve_player(arg, pool, "pool")?,
            })
        }
        "remove" | "rm" => {
            let [arg] = args[..] else {
                return Err(InputError::Usage("remove <player>"));
            };
            cmd(UserCommand::RemovePlayer {
                player_id: resolve_player(arg, squad, "squad")?,
            })
        }
        "swap" => {
            let [out_arg, in_arg] = args[..] else {
                return Err(InputError::Usage("swap <squad player> <pool player>"));
            };
            cmd(UserCommand::SwapPlayers {
                out_id: resolve_player(out_arg, squad, "squad")?,
                in_id: resolve_player(in_arg, pool, "pool")?,
            })
        }
        "squad" => Ok(Input::Show(View::Squad)),
        "image" => {
            let [arg] = args[..] else {
                return Err(InputError::Usage("image <player>"));
            };
            cmd(UserCommand::LookupImage {
                player_id: resolve_player(arg, pool, "pool")?,
            })
        }
        "stats" => {
            if args.is_empty() {
                return Err(InputError::Usage("stats <player> [<player>...]"));
            }
            let player_ids = args
                .iter()
                .map(|arg| resolve_player(arg, pool, "pool"))
                .collect::<Result<Vec<_>, _>>()?;
            cmd(UserCommand::ShowStats { player_ids })
        }
        "ask" => {
            if rest.is_empty() {
                return Err(InputError::Usage("ask <question>"));
            }
            cmd(UserCommand::SendChat(rest.to_string()))
        }
        "back" => cmd(UserCommand::Back),
        "reset" => cmd(UserCommand::Reset),
        "help" | "?" => Ok(Input::Show(View::Help)),
        "quit" | "exit" | "q" => cmd(UserCommand::Quit),
        other => Err(InputError::UnknownCommand(other.to_string())),
    }
}

/// Turn a numeric listing reference into a player id; anything else is
/// passed through as an id.
fn resolve_player(arg: &str, listing: &[Player], list: &'static str) -> Result<String, InputError> {
    match arg.parse::<usize>() {
        Ok(index) => listing
            .get(index.wrapping_sub(1))
            .map(|p| p.id.clone())
            .ok_or(InputError::BadIndex { index, list }),
        Err(_) => Ok(arg.to_string()),
    }
}

/// What the console should do with a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Send(UserCommand),
    Print(String),
    Nothing,
}

/// Parse `line` against the current view and decide what to do with it.
pub fn handle_line(line: &str, view_state: &mut ViewState) -> LineOutcome {
    match parse_line(line, view_state.snapshot.as_ref()) {
        Ok(Input::Command { cmd, view }) => {
            view_state.pending_view = view;
            LineOutcome::Send(cmd)
        }
        Ok(Input::Show(view)) => LineOutcome::Print(view_state.render_view(view)),
        Ok(Input::Empty) => LineOutcome::Nothing,
        Err(e) => LineOutcome::Print(format!("error: {e}\n")),
    }
}
