//! Per-round score tallies shared by the state machine and the summary views.

use indexmap::IndexMap;
use serde::Serialize;

use crate::state::game::{RoundNumber, TeamId};

/// Score book keeping one independent tally per round.
///
/// Scores only ever grow: the single write operation is
/// [`ScoreLedger::record_found`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScoreLedger {
    team_ids: Vec<TeamId>,
    rounds: IndexMap<RoundNumber, IndexMap<TeamId, u32>>,
}

impl ScoreLedger {
    /// Create a ledger for the configured teams, in turn order.
    pub fn new(team_ids: impl IntoIterator<Item = TeamId>) -> Self {
        Self {
            team_ids: team_ids.into_iter().collect(),
            rounds: IndexMap::new(),
        }
    }

    /// Open the tally of `round` with every team at zero. Reopening a round
    /// keeps its existing scores.
    pub fn begin_round(&mut self, round: RoundNumber) {
        let zeroes = self.zeroes();
        self.rounds.entry(round).or_insert(zeroes);
    }

    /// Credit one found phrase to `team_id` in `round`, returning the team's
    /// new score for that round. Unknown teams are ignored.
    pub fn record_found(&mut self, team_id: TeamId, round: RoundNumber) -> Option<u32> {
        if !self.team_ids.contains(&team_id) {
            return None;
        }
        self.begin_round(round);
        let score = self.rounds.get_mut(&round)?.get_mut(&team_id)?;
        *score += 1;
        Some(*score)
    }

    /// Tally of a single round. Rounds not started yet report zeroes.
    pub fn scores_for(&self, round: RoundNumber) -> IndexMap<TeamId, u32> {
        self.rounds
            .get(&round)
            .cloned()
            .unwrap_or_else(|| self.zeroes())
    }

    /// Sum of every round tally so far.
    pub fn cumulative_scores(&self) -> IndexMap<TeamId, u32> {
        let mut totals = self.zeroes();
        for tally in self.rounds.values() {
            for (team_id, score) in tally {
                if let Some(total) = totals.get_mut(team_id) {
                    *total += score;
                }
            }
        }
        totals
    }

    /// Number of phrases found across every round.
    pub fn total_found(&self) -> u32 {
        self.rounds.values().flat_map(|tally| tally.values()).sum()
    }

    /// Teams sharing the best cumulative score. Empty while nobody scored.
    pub fn leaders(&self) -> Vec<TeamId> {
        let totals = self.cumulative_scores();
        let best = totals.values().copied().max().unwrap_or(0);
        if best == 0 {
            return Vec::new();
        }
        totals
            .into_iter()
            .filter(|(_, score)| *score == best)
            .map(|(team_id, _)| team_id)
            .collect()
    }

    fn zeroes(&self) -> IndexMap<TeamId, u32> {
        self.team_ids.iter().map(|id| (*id, 0)).collect()
    }
}
