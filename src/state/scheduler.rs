//! Resolution of the next (team, phrase) pair to play.
//!
//! Everything here is a pure function of the pool state: resolving twice
//! without mutating the pool yields the same slot.

use crate::state::game::{AllocationPolicy, GamePhrase, Team, TeamId};

/// Team and phrase chosen to play next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Index into the team list.
    pub team_index: usize,
    /// Index into the phrase pool.
    pub phrase_index: usize,
}

/// Resolve who plays after the team at `active_team_index`.
///
/// Unique-by-team scans teams round-robin starting with the following team
/// and returns the first one still owning a pending phrase. Shared-pool
/// always hands the turn to the following team with the first pending phrase
/// of the pool. `None` means no pending phrase is left: the round is over.
pub fn next_playable(
    pool: &[GamePhrase],
    teams: &[Team],
    active_team_index: usize,
    policy: AllocationPolicy,
) -> Option<Slot> {
    if teams.is_empty() {
        return None;
    }
    playable_from(pool, teams, (active_team_index + 1) % teams.len(), policy)
}

/// Same as [`next_playable`] but `start_team_index` itself is considered
/// first. Used when a round opens.
pub fn playable_from(
    pool: &[GamePhrase],
    teams: &[Team],
    start_team_index: usize,
    policy: AllocationPolicy,
) -> Option<Slot> {
    let team_count = teams.len();
    if team_count == 0 {
        return None;
    }

    match policy {
        AllocationPolicy::UniqueByTeam => (0..team_count)
            .map(|offset| (start_team_index + offset) % team_count)
            .find_map(|team_index| {
                first_pending_owned_by(pool, teams[team_index].id).map(|phrase_index| Slot {
                    team_index,
                    phrase_index,
                })
            }),
        AllocationPolicy::SharedPool => first_pending(pool).map(|phrase_index| Slot {
            team_index: start_team_index % team_count,
            phrase_index,
        }),
    }
}

/// Next phrase the team `team_id` may play without ending its turn.
pub fn next_phrase_in_turn(
    pool: &[GamePhrase],
    team_id: TeamId,
    policy: AllocationPolicy,
) -> Option<usize> {
    match policy {
        AllocationPolicy::UniqueByTeam => first_pending_owned_by(pool, team_id),
        AllocationPolicy::SharedPool => first_pending(pool),
    }
}

fn first_pending(pool: &[GamePhrase]) -> Option<usize> {
    pool.iter().position(GamePhrase::is_pending)
}

fn first_pending_owned_by(pool: &[GamePhrase], team_id: TeamId) -> Option<usize> {
    pool.iter()
        .position(|phrase| phrase.is_pending() && phrase.owner_team_id == team_id)
}
