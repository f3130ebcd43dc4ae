// Prompt templates for squad-building advice.
//
// The assistant gets the same numbers the user sees (budget, quotas, the
// best available players) so it can talk about trade-offs instead of doing
// arithmetic.

use xi_core::draft::player::Player;
use xi_core::draft::quota::QuotaReport;
use xi_core::draft::selection::{CandidatePool, SelectionState};
use xi_core::draft::squad::FantasySquad;

/// How many pool entries are listed in the context.
pub const POOL_CONTEXT_LIMIT: usize = 12;

// ---------------------------------------------------------------------------
// System prompt
// ---------------------------------------------------------------------------

/// Return the static system prompt for every assistant call.
pub fn system_prompt() -> String {
    "You are a fantasy cricket team-building assistant.\n\
     \n\
     Rules: the user drafts an XI of at most 11 players from two selected national teams.\n\
     Every player has a price in millions, a fantasy points total and career stats; the squad must stay within its budget.\n\
     Positions are Batter, Bowler, Wicket-Keeper and All-Rounder. Suggested balance is shown as quotas.\n\
     \n\
     When asked for advice:\n\
     1. Recommend specific players by name from the AVAILABLE list only.\n\
     2. Respect the remaining budget and open slots given below.\n\
     3. Point out gaps in position balance.\n\
     \n\
     Be concise and direct. Use the pre-computed numbers provided and do not recompute them."
        .to_string()
}

// ---------------------------------------------------------------------------
// Squad context
// ---------------------------------------------------------------------------

/// Render the current session as a compact context block.
pub fn build_squad_context(
    selection: &SelectionState,
    squad: &FantasySquad,
    pool: &CandidatePool<'_>,
    quotas: &QuotaReport,
    max_players: usize,
) -> String {
    let mut out = String::with_capacity(2048);

    out.push_str("## MATCH\n");
    match selection.format() {
        Some(format) => out.push_str(&format!("Format: {} ({})\n", format.title(), format.duration())),
        None => out.push_str("Format: not chosen\n"),
    }
    if selection.teams().is_empty() {
        out.push_str("Teams: none selected\n");
    } else {
        let names: Vec<&str> = selection.teams().iter().map(|t| t.name.as_str()).collect();
        out.push_str(&format!("Teams: {}\n", names.join(" vs ")));
    }

    out.push_str("\n## MY SQUAD\n");
    out.push_str(&format!(
        "Players: {}/{} | Points: {} | Spent: {} | Remaining: {}\n",
        squad.len(),
        max_players,
        squad.total_points(),
        squad.spent(),
        squad.remaining_budget(),
    ));
    out.push_str(&format_player_lines(squad.players().iter()));

    out.push_str("\n## POSITION BALANCE\n");
    for line in &quotas.lines {
        let flag = if line.is_over() {
            " (over)"
        } else if line.is_full() {
            " (full)"
        } else {
            ""
        };
        out.push_str(&format!(
            "{}: {}/{}{}\n",
            line.position.display_str(),
            line.count,
            line.limit,
            flag
        ));
    }

    out.push_str("\n## AVAILABLE (best first)\n");
    if pool.is_empty() {
        out.push_str("(none)\n");
    } else {
        out.push_str(&format_player_lines(pool.iter().take(POOL_CONTEXT_LIMIT)));
        if pool.len() > POOL_CONTEXT_LIMIT {
            out.push_str(&format!("... and {} more\n", pool.len() - POOL_CONTEXT_LIMIT));
        }
    }

    out
}

fn format_player_lines<'a>(players: impl Iterator<Item = &'a Player>) -> String {
    let mut out = String::new();
    let mut any = false;
    for p in players {
        any = true;
        out.push_str(&format_player_line(p));
        out.push('\n');
    }
    if !any {
        out.push_str("(empty)\n");
    }
    out
}

/// One player as `- Name (AR, Team) $8.5M, 120 pts [40 matches, 900 runs, 31 wickets]`.
pub fn format_player_line(player: &Player) -> String {
    format!(
        "- {} ({}, {}) {}, {} pts [{}]",
        player.name,
        player.position.abbrev(),
        player.team,
        player.price,
        player.points,
        player.stats.summary()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use xi_core::catalog::Catalog;
    use xi_core::draft::quota::PositionQuotas;
    use xi_core::draft::selection::CricketFormat;
    use xi_core::draft::squad::SquadEngine;

    fn session() -> (SelectionState, FantasySquad) {
        let catalog = Catalog::builtin().unwrap();
        let selection = SelectionState::default()
            .with_format(CricketFormat::T20)
            .select_team(catalog.team("ind").unwrap())
            .unwrap()
            .select_team(catalog.team("aus").unwrap())
            .unwrap();
        let engine = SquadEngine::default();
        let squad = engine
            .add(&FantasySquad::default(), catalog.player("ind-01").unwrap())
            .unwrap();
        (selection, squad)
    }

    #[test]
    fn system_prompt_mentions_budget_and_positions() {
        let prompt = system_prompt();
        assert!(prompt.contains("budget"));
        assert!(prompt.contains("Wicket-Keeper"));
    }

    #[test]
    fn context_lists_squad_and_pool() {
        let (selection, squad) = session();
        let pool = selection.candidate_pool(&squad);
        let quotas = PositionQuotas::default().report(&squad);
        let ctx = build_squad_context(&selection, &squad, &pool, &quotas, 11);

        assert!(ctx.contains("Format: Twenty20 (3 hours)"));
        assert!(ctx.contains("Teams: India vs Australia"));
        assert!(ctx.contains("Players: 1/11"));
        assert!(ctx.contains("Remaining: $89.0M"));
        assert!(ctx.contains("- Virat Kohli (BAT, India) $11.0M, 142 pts [295 matches, 13906 runs]"));
        assert!(ctx.contains("Batter: 1/6"));

        // Squad members never appear under AVAILABLE.
        let available = ctx.split("## AVAILABLE").nth(1).unwrap();
        assert!(!available.contains("Virat Kohli"));
        assert!(available.contains("... and 3 more"));
    }

    #[test]
    fn player_line_carries_role_stats() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(
            format_player_line(catalog.player("ind-07").unwrap()),
            "- Jasprit Bumrah (BOWL, India) $10.0M, 125 pts [89 matches, 149 wickets]"
        );
    }

    #[test]
    fn context_for_fresh_session() {
        let selection = SelectionState::default();
        let squad = FantasySquad::default();
        let pool = selection.candidate_pool(&squad);
        let quotas = PositionQuotas::default().report(&squad);
        let ctx = build_squad_context(&selection, &squad, &pool, &quotas, 11);

        assert!(ctx.contains("Format: not chosen"));
        assert!(ctx.contains("Teams: none selected"));
        assert!(ctx.contains("(empty)"));
        assert!(ctx.contains("(none)"));
    }
}
