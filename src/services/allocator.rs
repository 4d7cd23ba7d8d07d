//! Phrase pool allocation: drawing the phrases of a game and dealing them to
//! teams.

use std::collections::HashSet;

use rand::{Rng, seq::SliceRandom};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    dao::{phrase_store::PhraseStore, storage::StorageResult},
    state::game::{AllocationPolicy, CategoryId, GamePhrase, Phrase, PhraseStatus, Team},
};

/// Fewer phrases were available than requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Shortfall {
    /// Phrases requested (`phrases_per_team * teams`).
    pub requested: usize,
    /// Phrases actually allocated.
    pub allocated: usize,
}

/// Phrases dealt for a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    /// Pool of the first round, in play order.
    pub phrases: Vec<GamePhrase>,
    /// Number of phrases requested.
    pub requested: usize,
    /// Set when the candidates could not cover the request.
    pub shortfall: Option<Shortfall>,
}

impl Allocation {
    fn empty(requested: usize) -> Self {
        Self {
            phrases: Vec::new(),
            requested,
            shortfall: (requested > 0).then_some(Shortfall {
                requested,
                allocated: 0,
            }),
        }
    }

    /// Whether no phrase could be allocated.
    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// Number of phrases allocated.
    pub fn len(&self) -> usize {
        self.phrases.len()
    }
}

/// Fetch the phrases of `category_ids` from `store` and deal them.
///
/// An empty category set yields an empty allocation without querying the
/// store; callers must refuse to start a game with it.
pub async fn allocate<R>(
    store: &dyn PhraseStore,
    category_ids: &[CategoryId],
    phrases_per_team: usize,
    teams: &[Team],
    policy: AllocationPolicy,
    rng: &mut R,
) -> StorageResult<Allocation>
where
    R: Rng + Send + ?Sized,
{
    let requested = phrases_per_team * teams.len();
    if category_ids.is_empty() {
        return Ok(Allocation::empty(requested));
    }

    let candidates: Vec<Phrase> = store
        .fetch_phrases_by_categories(category_ids.to_vec())
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    debug!(
        categories = category_ids.len(),
        candidates = candidates.len(),
        "fetched phrase candidates"
    );
    Ok(allocate_candidates(
        candidates,
        phrases_per_team,
        teams,
        policy,
        rng,
    ))
}

/// Deal `candidates` to `teams` according to `policy`.
///
/// Candidates are deduplicated, uniformly shuffled and truncated to
/// `phrases_per_team * teams.len()`. Unique-by-team hands each team a
/// contiguous slice of the shuffled candidates, in team order, so a short
/// supply leaves the last teams with partial (or no) slices. Shared-pool
/// records owners round-robin but they are never enforced. The returned pool
/// is shuffled again so the play order does not follow the deal.
pub fn allocate_candidates<R>(
    candidates: Vec<Phrase>,
    phrases_per_team: usize,
    teams: &[Team],
    policy: AllocationPolicy,
    rng: &mut R,
) -> Allocation
where
    R: Rng + ?Sized,
{
    let requested = phrases_per_team * teams.len();
    if requested == 0 {
        return Allocation::empty(0);
    }

    let mut candidates = dedupe(candidates);
    candidates.shuffle(rng);
    candidates.truncate(requested);

    let mut phrases: Vec<GamePhrase> = match policy {
        AllocationPolicy::UniqueByTeam => candidates
            .chunks(phrases_per_team)
            .zip(teams)
            .flat_map(|(slice, team)| {
                slice
                    .iter()
                    .map(move |phrase| GamePhrase::pending(phrase, team.id))
            })
            .collect(),
        AllocationPolicy::SharedPool => candidates
            .iter()
            .enumerate()
            .map(|(index, phrase)| GamePhrase::pending(phrase, teams[index % teams.len()].id))
            .collect(),
    };
    phrases.shuffle(rng);

    let shortfall = (phrases.len() < requested).then(|| {
        warn!(
            requested,
            allocated = phrases.len(),
            ?policy,
            "not enough phrases available; playing with a reduced pool"
        );
        Shortfall {
            requested,
            allocated: phrases.len(),
        }
    });

    Allocation {
        phrases,
        requested,
        shortfall,
    }
}

/// Reset every phrase of `pool` to pending, in a fresh random order.
pub fn reshuffle<R>(pool: &[GamePhrase], rng: &mut R) -> Vec<GamePhrase>
where
    R: Rng + ?Sized,
{
    let mut next: Vec<GamePhrase> = pool
        .iter()
        .cloned()
        .map(|mut phrase| {
            phrase.status = PhraseStatus::Pending;
            phrase
        })
        .collect();
    next.shuffle(rng);
    next
}

/// Drop repeated phrase ids and phrases whose text only differs by case or
/// surrounding whitespace, keeping the first occurrence.
fn dedupe(candidates: Vec<Phrase>) -> Vec<Phrase> {
    let mut seen_ids = HashSet::new();
    let mut seen_texts = HashSet::new();
    candidates
        .into_iter()
        .filter(|phrase| {
            let text = phrase.text.trim().to_lowercase();
            seen_ids.insert(phrase.id) && seen_texts.insert(text)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn teams(count: i64) -> Vec<Team> {
        (1..=count)
            .map(|id| Team {
                id,
                color: "#fdd835".into(),
                players: Vec::new(),
            })
            .collect()
    }

    fn candidates(count: i64) -> Vec<Phrase> {
        (1..=count)
            .map(|id| Phrase {
                id,
                text: format!("phrase {id}"),
                category_id: 1,
            })
            .collect()
    }

    fn owners(allocation: &Allocation) -> HashMap<i64, usize> {
        let mut counts = HashMap::new();
        for phrase in &allocation.phrases {
            *counts.entry(phrase.owner_team_id).or_default() += 1;
        }
        counts
    }

    #[test]
    fn unique_policy_deals_disjoint_slices() {
        let mut rng = StdRng::seed_from_u64(1);
        let allocation = allocate_candidates(
            candidates(9),
            3,
            &teams(2),
            AllocationPolicy::UniqueByTeam,
            &mut rng,
        );

        assert_eq!(allocation.len(), 6);
        assert_eq!(allocation.shortfall, None);
        let owners = owners(&allocation);
        assert_eq!(owners[&1], 3);
        assert_eq!(owners[&2], 3);

        let ids: HashSet<_> = allocation.phrases.iter().map(|p| p.phrase_id).collect();
        assert_eq!(ids.len(), 6);
        assert!(allocation.phrases.iter().all(GamePhrase::is_pending));
    }

    #[test]
    fn short_supply_is_allocated_in_team_order() {
        let mut rng = StdRng::seed_from_u64(2);
        let allocation = allocate_candidates(
            candidates(4),
            3,
            &teams(2),
            AllocationPolicy::UniqueByTeam,
            &mut rng,
        );

        assert_eq!(allocation.len(), 4);
        assert_eq!(
            allocation.shortfall,
            Some(Shortfall {
                requested: 6,
                allocated: 4
            })
        );
        let owners = owners(&allocation);
        assert_eq!(owners[&1], 3);
        assert_eq!(owners[&2], 1);
    }

    #[test]
    fn shared_policy_takes_requested_count() {
        let mut rng = StdRng::seed_from_u64(3);
        let allocation = allocate_candidates(
            candidates(20),
            4,
            &teams(3),
            AllocationPolicy::SharedPool,
            &mut rng,
        );
        assert_eq!(allocation.len(), 12);
        assert_eq!(allocation.requested, 12);
        assert!(allocation.shortfall.is_none());
    }

    #[test]
    fn duplicates_are_removed_before_dealing() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut pool = candidates(3);
        pool.push(pool[0].clone());
        pool.push(Phrase {
            id: 42,
            text: "  PHRASE 2 ".into(),
            category_id: 2,
        });

        let allocation =
            allocate_candidates(pool, 5, &teams(2), AllocationPolicy::SharedPool, &mut rng);
        let mut ids: Vec<_> = allocation.phrases.iter().map(|p| p.phrase_id).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn reshuffle_resets_statuses_and_keeps_phrases() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut allocation = allocate_candidates(
            candidates(10),
            5,
            &teams(2),
            AllocationPolicy::SharedPool,
            &mut rng,
        );
        allocation.phrases[0].status = PhraseStatus::Found;
        allocation.phrases[1].status = PhraseStatus::Skipped;

        let next = reshuffle(&allocation.phrases, &mut rng);
        assert!(next.iter().all(GamePhrase::is_pending));

        let mut before: Vec<_> = allocation.phrases.iter().map(|p| p.phrase_id).collect();
        let mut after: Vec<_> = next.iter().map(|p| p.phrase_id).collect();
        before.sort();
        after.sort();
        assert_eq!(before, after);
    }

    #[test]
    fn no_team_means_nothing_to_deal() {
        let mut rng = StdRng::seed_from_u64(6);
        let allocation =
            allocate_candidates(candidates(3), 3, &[], AllocationPolicy::SharedPool, &mut rng);
        assert!(allocation.is_empty());
        assert!(allocation.shortfall.is_none());
    }
}
