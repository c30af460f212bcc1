//! Single-elimination bracket reconstruction.
//!
//! The server hands out a flat, unordered match list where each match only
//! knows which matches feed into it (`parent_matches`). [`BracketBuilder`]
//! turns that list into columns: round 0 holds every match without parents,
//! and each following round holds the matches fed by the round before it.

use crate::{BracketRounds, GroupType, Match, Round};
use chrono::{DateTime, Utc};
use log::warn;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Enough rounds for a 1024-entrant single-elimination tree.
pub const DEFAULT_MAX_DEPTH: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct BracketBuilder {
    /// Upper bound on emitted rounds. Guards against cyclic parent graphs.
    pub max_depth: usize,
}

impl Default for BracketBuilder {
    fn default() -> Self {
        Self { max_depth: DEFAULT_MAX_DEPTH }
    }
}

impl BracketBuilder {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Derive the rounds of a bracket. Never fails: malformed input yields
    /// fewer rounds, and matches that could not be placed are listed in
    /// [`BracketRounds::unplaced`].
    pub fn build(&self, matches: &[Match], type_group: &GroupType) -> BracketRounds {
        if !type_group.is_olympic() || matches.is_empty() || self.max_depth == 0 {
            return BracketRounds::default();
        }

        let (mut current, mut pool): (Vec<&Match>, Vec<&Match>) =
            matches.iter().partition(|m| m.parent_matches.is_empty());

        if current.is_empty() {
            return finish(Vec::new(), pool);
        }
        current.sort_by(|a, b| display_order(a, b));

        let mut rounds: Vec<Vec<&Match>> = Vec::new();
        while rounds.len() < self.max_depth {
            let previous: HashSet<&str> = current.iter().map(|m| m.id.as_str()).collect();
            rounds.push(current);

            let fed_by_previous =
                |m: &Match| m.parent_matches.iter().any(|p| previous.contains(p.as_str()));

            // A parent still waiting in the pool defers the match until that
            // parent has been placed, so each match lands after its latest parent.
            // If every candidate is deferred, the waiting parents can no longer
            // be reached from this round and the candidates are placed anyway.
            let pending: HashSet<&str> = pool.iter().map(|m| m.id.as_str()).collect();
            let ready = |m: &Match| {
                fed_by_previous(m) && !m.parent_matches.iter().any(|p| pending.contains(p.as_str()))
            };
            let any_ready = pool.iter().any(|m| ready(m));
            let (mut next, rest): (Vec<&Match>, Vec<&Match>) = pool
                .into_iter()
                .partition(|m| if any_ready { ready(m) } else { fed_by_previous(m) });
            pool = rest;

            if next.is_empty() {
                return finish(rounds, pool);
            }
            next.sort_by(|a, b| display_order(a, b));
            current = next;
        }

        // Depth cap reached with a round still in hand.
        pool.extend(current);
        finish(rounds, pool)
    }
}

fn finish(rounds: Vec<Vec<&Match>>, leftover: Vec<&Match>) -> BracketRounds {
    let mut unplaced: Vec<String> = leftover.into_iter().map(|m| m.id.clone()).collect();
    unplaced.sort();
    if !unplaced.is_empty() {
        warn!(
            "bracket: {} match(es) could not be placed in a round: {}",
            unplaced.len(),
            unplaced.join(", ")
        );
    }

    let rounds = rounds
        .into_iter()
        .enumerate()
        .map(|(index, matches)| Round {
            index,
            matches: matches.into_iter().cloned().collect(),
        })
        .collect();

    BracketRounds { rounds, unplaced }
}

/// Left-to-right order within a round: planned start time (missing sorts as
/// the epoch), then id.
pub fn display_order(a: &Match, b: &Match) -> Ordering {
    start_key(a).cmp(&start_key(b)).then_with(|| a.id.cmp(&b.id))
}

fn start_key(m: &Match) -> DateTime<Utc> {
    m.planned_start_time.unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Distance between sibling slots in round `round`: `base_gap * 2^round`.
/// Doubling per round puts every parent at the midpoint of its two children.
pub fn sibling_gap(base_gap: u16, round: usize) -> u16 {
    let factor = 1u16.checked_shl(round as u32).unwrap_or(u16::MAX);
    base_gap.saturating_mul(factor)
}

/// Offset of the first slot in round `round`.
pub fn first_slot_offset(base_gap: u16, round: usize) -> u16 {
    sibling_gap(base_gap, round).saturating_sub(1) / 2
}

/// Offset of slot `slot` in round `round`.
pub fn slot_offset(base_gap: u16, round: usize, slot: usize) -> u16 {
    let slot = u16::try_from(slot).unwrap_or(u16::MAX);
    first_slot_offset(base_gap, round).saturating_add(sibling_gap(base_gap, round).saturating_mul(slot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn m(id: &str, parents: &[&str]) -> Match {
        Match {
            id: id.into(),
            parent_matches: parents.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    fn at(mut m: Match, hour: u32) -> Match {
        m.planned_start_time = Some(Utc.with_ymd_and_hms(2026, 5, 1, hour, 0, 0).unwrap());
        m
    }

    fn ids(out: &BracketRounds) -> Vec<Vec<&str>> {
        out.rounds
            .iter()
            .map(|r| r.matches.iter().map(|m| m.id.as_str()).collect())
            .collect()
    }

    fn eight_team() -> Vec<Match> {
        vec![
            m("q1", &[]),
            m("q2", &[]),
            m("q3", &[]),
            m("q4", &[]),
            m("s1", &["q1", "q2"]),
            m("s2", &["q3", "q4"]),
            m("f", &["s1", "s2"]),
        ]
    }

    #[test]
    fn empty_input_has_no_rounds() {
        let out = BracketBuilder::default().build(&[], &GroupType::Olympic);
        assert!(out.is_empty());
        assert!(out.unplaced.is_empty());
    }

    #[test]
    fn parentless_matches_form_one_sorted_round() {
        let matches = vec![m("c", &[]), m("a", &[]), m("b", &[])];
        let out = BracketBuilder::default().build(&matches, &GroupType::Olympic);
        assert_eq!(ids(&out), vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn two_round_chain() {
        let matches = vec![m("C", &["A", "B"]), m("B", &[]), m("A", &[])];
        let out = BracketBuilder::default().build(&matches, &GroupType::Olympic);
        assert_eq!(ids(&out), vec![vec!["A", "B"], vec!["C"]]);
        assert_eq!(out.rounds[1].index, 1);
    }

    #[test]
    fn eight_team_bracket_has_three_rounds() {
        let out = BracketBuilder::default().build(&eight_team(), &GroupType::Olympic);
        assert_eq!(
            ids(&out),
            vec![vec!["q1", "q2", "q3", "q4"], vec!["s1", "s2"], vec!["f"]]
        );
        assert!(out.unplaced.is_empty());
    }

    #[test]
    fn output_is_independent_of_input_order() {
        let builder = BracketBuilder::default();
        let base = eight_team();
        let expected = builder.build(&base, &GroupType::Olympic);

        let mut reversed = base.clone();
        reversed.reverse();
        assert_eq!(builder.build(&reversed, &GroupType::Olympic), expected);

        let mut rotated = base.clone();
        rotated.rotate_left(3);
        assert_eq!(builder.build(&rotated, &GroupType::Olympic), expected);

        let mut swapped = base;
        swapped.swap(0, 6);
        swapped.swap(2, 4);
        assert_eq!(builder.build(&swapped, &GroupType::Olympic), expected);
    }

    #[test]
    fn start_time_orders_before_id() {
        let matches = vec![at(m("a", &[]), 18), at(m("b", &[]), 12), m("c", &[])];
        let out = BracketBuilder::default().build(&matches, &GroupType::Olympic);
        // "c" has no start time and sorts as the epoch.
        assert_eq!(ids(&out), vec![vec!["c", "b", "a"]]);
    }

    #[test]
    fn equal_start_times_tie_break_on_id() {
        let matches = vec![at(m("m-2", &[]), 9), at(m("m-10", &[]), 9), at(m("m-1", &[]), 9)];
        let out = BracketBuilder::default().build(&matches, &GroupType::Olympic);
        assert_eq!(ids(&out), vec![vec!["m-1", "m-10", "m-2"]]);
    }

    #[test]
    fn long_chain_is_cut_at_depth_cap() {
        let mut matches = vec![m("r0", &[])];
        for i in 1..15 {
            let parent = format!("r{}", i - 1);
            matches.push(m(&format!("r{i}"), &[parent.as_str()]));
        }
        let out = BracketBuilder::default().build(&matches, &GroupType::Olympic);
        assert_eq!(out.len(), DEFAULT_MAX_DEPTH);
        assert_eq!(out.rounds.last().unwrap().matches[0].id, "r9");
        assert_eq!(out.unplaced.len(), 5);
        assert!(out.unplaced.contains(&"r14".to_string()));
    }

    #[test]
    fn depth_cap_is_configurable() {
        let out = BracketBuilder::new(2).build(&eight_team(), &GroupType::Olympic);
        assert_eq!(out.len(), 2);
        assert_eq!(out.unplaced, vec!["f".to_string()]);
    }

    #[test]
    fn non_olympic_groups_get_no_rounds() {
        let builder = BracketBuilder::default();
        assert!(builder.build(&eight_team(), &GroupType::RoundRobin).is_empty());
        assert!(builder.build(&eight_team(), &GroupType::parse("round_robin")).is_empty());
        assert!(builder.build(&eight_team(), &GroupType::Other("SWISS".into())).is_empty());
    }

    #[test]
    fn mixed_generation_parent_lands_after_latest_parent() {
        // "late" is fed by a first-round match and by a second-round match.
        let matches = vec![
            m("a", &[]),
            m("b", &[]),
            m("c", &[]),
            m("ab", &["a", "b"]),
            m("late", &["ab", "c"]),
        ];
        let out = BracketBuilder::default().build(&matches, &GroupType::Olympic);
        assert_eq!(ids(&out), vec![vec!["a", "b", "c"], vec!["ab"], vec!["late"]]);
    }

    #[test]
    fn every_match_is_placed_at_most_once() {
        let matches = vec![
            m("a", &[]),
            m("b", &[]),
            m("c", &[]),
            m("ab", &["a", "b"]),
            m("late", &["ab", "c"]),
        ];
        let out = BracketBuilder::default().build(&matches, &GroupType::Olympic);
        let mut seen: Vec<&str> = out.rounds.iter().flat_map(|r| r.matches.iter().map(|m| m.id.as_str())).collect();
        let total = seen.len();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), total);
        assert_eq!(total, matches.len());
    }

    #[test]
    fn unknown_parent_ids_do_not_block_placement() {
        let matches = vec![m("a", &[]), m("b", &["a", "ghost"])];
        let out = BracketBuilder::default().build(&matches, &GroupType::Olympic);
        assert_eq!(ids(&out), vec![vec!["a"], vec!["b"]]);
    }

    #[test]
    fn unreachable_parent_does_not_hide_its_subtree() {
        // y is fed only by a match that does not exist, so it never gets a round.
        let matches = vec![
            m("a", &[]),
            m("b", &[]),
            m("y", &["ghost"]),
            m("x", &["a", "y"]),
            m("f", &["x", "b"]),
        ];
        let out = BracketBuilder::default().build(&matches, &GroupType::Olympic);
        assert_eq!(ids(&out), vec![vec!["a", "b"], vec!["x"], vec!["f"]]);
        assert_eq!(out.unplaced, vec!["y".to_string()]);
    }

    #[test]
    fn cycles_are_reported_not_rendered() {
        let matches = vec![m("a", &[]), m("x", &["y"]), m("y", &["x"])];
        let out = BracketBuilder::default().build(&matches, &GroupType::Olympic);
        assert_eq!(ids(&out), vec![vec!["a"]]);
        assert_eq!(out.unplaced, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn all_matches_with_parents_yields_no_rounds() {
        let matches = vec![m("x", &["y"]), m("y", &["x"])];
        let out = BracketBuilder::default().build(&matches, &GroupType::Olympic);
        assert!(out.is_empty());
        assert_eq!(out.unplaced.len(), 2);
    }

    #[test]
    fn zero_depth_builds_nothing() {
        let out = BracketBuilder::new(0).build(&eight_team(), &GroupType::Olympic);
        assert!(out.is_empty());
    }

    #[test]
    fn sibling_gap_doubles_per_round() {
        assert_eq!(sibling_gap(4, 0), 4);
        assert_eq!(sibling_gap(4, 1), 8);
        assert_eq!(sibling_gap(4, 3), 32);
        assert_eq!(sibling_gap(4, 40), u16::MAX);
    }

    #[test]
    fn parent_slot_is_midpoint_of_children() {
        let base = 4;
        for round in 0..5usize {
            for parent in 0..4usize {
                let top = slot_offset(base, round, 2 * parent);
                let bottom = slot_offset(base, round, 2 * parent + 1);
                assert_eq!(slot_offset(base, round + 1, parent), (top + bottom) / 2);
            }
        }
    }

    #[test]
    fn first_slot_offsets() {
        let offsets: Vec<u16> = (0..4).map(|r| first_slot_offset(4, r)).collect();
        assert_eq!(offsets, vec![1, 3, 7, 15]);
    }
}
