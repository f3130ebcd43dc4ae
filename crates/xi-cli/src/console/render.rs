// Plain-text rendering of snapshots, toasts and help.

use std::fmt::Write;

use xi_core::draft::player::Player;
use xi_core::draft::selection::CricketFormat;
use xi_core::protocol::{AppSnapshot, StatsReport, Step, Toast};

const RULE: &str = "------------------------------------------------------------";

pub fn help_text() -> String {
    "\
Commands:
  start                     leave the landing screen
  format <t20|odi|test>     choose the match format
  teams                     list teams
  select <team>             select or deselect a team (id or short name)
  pool [bat|bowl|wk|ar|all] list available players, optionally by position
  add <player>              draft a player (id or # from the pool listing)
  remove <player>           drop a player (id or # from the squad listing)
  swap <out> <in>           replace a squad player with a pool player
  squad                     show your squad, budget and position balance
  image <player>            look up a player's picture
  stats <player> [...]      career stats, side by side for several players
  ask <question>            ask the assistant
  back                      go back one step
  reset                     start over
  quit                      exit
"
    .to_string()
}

pub fn render_toast(toast: &Toast) -> String {
    let marker = if toast.is_error() { "!" } else { "*" };
    format!("{marker} {}: {}\n", toast.title, toast.description)
}

pub fn render_hero() -> String {
    let mut out = String::new();
    out.push_str("FANTASY XI\n");
    out.push_str("Pick two teams, draft eleven players, stay under budget.\n\n");
    out.push_str("Formats:\n");
    for format in CricketFormat::ALL {
        let _ = writeln!(
            out,
            "  {:<5} {} ({}): {}",
            format.code(),
            format.title(),
            format.duration(),
            format.description()
        );
    }
    out.push_str("\nType `start` to begin or `help` for commands.\n");
    out
}

pub fn render_teams(snapshot: &AppSnapshot) -> String {
    let selected = snapshot.selected_teams().count();
    let mut out = format!(
        "Teams (selected {}/{})\n{}\n",
        selected, snapshot.max_teams, RULE
    );
    for team in &snapshot.teams {
        let mark = if team.selected { "[x]" } else { "[ ]" };
        let _ = writeln!(
            out,
            "{mark} {:<4} {:<12} {} players",
            team.short_name, team.name, team.player_count
        );
    }
    out
}

fn player_row(index: usize, player: &Player) -> String {
    format!(
        "{:>3}. {:<5} {:<22} {:<12} {:>7} {:>4} pts  {}\n",
        index,
        player.position.abbrev(),
        player.name,
        player.team,
        player.price.to_string(),
        player.points,
        player.id
    )
}

pub fn render_pool(snapshot: &AppSnapshot) -> String {
    let heading = match snapshot.pool_filter {
        Some(position) => format!("Available {} players", position.display_str()),
        None => "Available players".to_string(),
    };
    let mut out = format!("{heading} ({})\n{RULE}\n", snapshot.pool.len());
    if snapshot.pool.is_empty() {
        out.push_str("  (none)\n");
    }
    for (i, player) in snapshot.pool.iter().enumerate() {
        out.push_str(&player_row(i + 1, player));
    }
    out
}

pub fn render_squad(snapshot: &AppSnapshot) -> String {
    let mut out = format!(
        "Your squad {}/{} | {} pts | {} of {} left\n{RULE}\n",
        snapshot.squad.len(),
        snapshot.max_players,
        snapshot.total_points,
        snapshot.remaining_budget,
        snapshot.budget
    );
    if snapshot.squad.is_empty() {
        out.push_str("  (empty)\n");
    }
    for (i, player) in snapshot.squad.iter().enumerate() {
        out.push_str(&player_row(i + 1, player));
    }
    let balance: Vec<String> = snapshot
        .quotas
        .lines
        .iter()
        .map(|l| format!("{} {}/{}", l.position.abbrev(), l.count, l.limit))
        .collect();
    if !balance.is_empty() {
        let _ = writeln!(out, "Balance: {}", balance.join("  "));
    }
    out
}

/// One block per player, or a table with a column per player when
/// comparing.
pub fn render_stats(report: &StatsReport) -> String {
    let mut out = format!("{}\n{RULE}\n", report.title());
    if !report.is_comparative() {
        for player in &report.players {
            let _ = writeln!(
                out,
                "{} ({}, {}) {}, {} pts",
                player.name,
                player.position.display_str(),
                player.team,
                player.price,
                player.points
            );
            for (label, value) in player.stats.entries() {
                let _ = writeln!(out, "  {label:<9} {value}");
            }
        }
        return out;
    }

    let row = |out: &mut String, label: &str, cells: Vec<String>| {
        let _ = write!(out, "{label:<10}");
        for cell in cells {
            let _ = write!(out, " {cell:<20}");
        }
        out.push('\n');
    };
    let players = &report.players;
    row(&mut out, "", players.iter().map(|p| p.name.clone()).collect());
    row(&mut out, "Position", players.iter().map(|p| p.position.abbrev().to_string()).collect());
    row(&mut out, "Team", players.iter().map(|p| p.team.clone()).collect());
    row(&mut out, "Price", players.iter().map(|p| p.price.to_string()).collect());
    row(&mut out, "Points", players.iter().map(|p| p.points.to_string()).collect());
    for label in ["Matches", "Runs", "Wickets", "Catches"] {
        let cells = players
            .iter()
            .map(|p| {
                p.stats
                    .entries()
                    .iter()
                    .find(|(l, _)| *l == label)
                    .map_or_else(|| "-".to_string(), |(_, v)| v.to_string())
            })
            .collect();
        row(&mut out, label, cells);
    }
    out
}

/// Screen shown when the wizard lands on a new step.
pub fn render_step(snapshot: &AppSnapshot) -> String {
    match snapshot.step {
        Step::Hero => render_hero(),
        Step::TeamSelection => {
            let mut out = render_teams(snapshot);
            let _ = writeln!(
                out,
                "Select {} teams with `select <team>`.",
                snapshot.max_teams
            );
            out
        }
        Step::TeamBuilding => {
            let mut out = render_squad(snapshot);
            out.push('\n');
            out.push_str(&render_pool(snapshot));
            out
        }
    }
}
