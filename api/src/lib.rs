pub mod bracket;
pub mod client;
pub mod session;
pub mod wire;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Domain types: clean model, independent of the REST wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Tournament {
    pub id: String,
    pub name: String,
    pub sport: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
}

/// Everything the viewer needs to draw one tournament.
#[derive(Debug, Clone, Default)]
pub struct TournamentView {
    pub tournament: Tournament,
    pub bracket: Option<Bracket>,
    pub matches: Vec<Match>,
    /// True when the server was unreachable and the embedded demo data was loaded.
    pub is_demo: bool,
}

impl TournamentView {
    /// Matches listed by the bracket descriptor. An empty id list means
    /// every match of the tournament belongs to the bracket.
    pub fn bracket_matches(&self) -> Vec<Match> {
        match &self.bracket {
            Some(bracket) if !bracket.match_ids.is_empty() => self
                .matches
                .iter()
                .filter(|m| bracket.match_ids.iter().any(|id| *id == m.id))
                .cloned()
                .collect(),
            _ => self.matches.clone(),
        }
    }

    pub fn find_match(&self, match_id: &str) -> Option<&Match> {
        self.matches.iter().find(|m| m.id == match_id)
    }

    /// Replace the match list after a refresh, keeping names already resolved
    /// for participants the refresh only knows by id.
    pub fn merge_matches(&mut self, mut updates: Vec<Match>) {
        for update in &mut updates {
            let Some(previous) = self.find_match(&update.id) else {
                continue;
            };
            for slot in &mut update.participants {
                if let ParticipantRef::Id(id) = &slot.participant
                    && let Some(resolved) = previous
                        .participants
                        .iter()
                        .map(|s| &s.participant)
                        .find(|p| p.is_resolved() && p.id() == id)
                {
                    slot.participant = resolved.clone();
                }
            }
        }
        self.matches = updates;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Match {
    pub id: String,
    pub planned_start_time: Option<DateTime<Utc>>,
    /// Matches whose winners feed into this one. Empty for first-round matches.
    pub parent_matches: Vec<String>,
    pub participants: Vec<ParticipantSlot>, // 0–2 entries
    pub status: MatchStatus,
    pub winner: Option<String>,
}

impl Match {
    pub fn is_live(&self) -> bool {
        self.status == MatchStatus::InProgress
    }

    /// The participant slot holding the winner, if one is recorded.
    pub fn winner_slot(&self) -> Option<&ParticipantSlot> {
        let winner = self.winner.as_deref()?;
        self.participants.iter().find(|s| s.participant.id() == winner)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticipantSlot {
    pub participant: ParticipantRef,
    pub score: Option<i64>,
}

/// A participant as the API hands it out: sometimes only an id, sometimes the
/// whole record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticipantRef {
    Id(String),
    Resolved(Participant),
}

impl Default for ParticipantRef {
    fn default() -> Self {
        ParticipantRef::Id(String::new())
    }
}

impl ParticipantRef {
    pub fn id(&self) -> &str {
        match self {
            ParticipantRef::Id(id) => id,
            ParticipantRef::Resolved(p) => &p.id,
        }
    }

    /// Name when resolved, raw identifier otherwise.
    pub fn display_name(&self) -> &str {
        match self {
            ParticipantRef::Id(id) => id,
            ParticipantRef::Resolved(p) if !p.name.is_empty() => &p.name,
            ParticipantRef::Resolved(p) => &p.id,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ParticipantRef::Resolved(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchStatus {
    #[default]
    Prepared,
    InProgress,
    Finished,
    Cancelled,
}

impl MatchStatus {
    pub fn label(&self) -> &'static str {
        match self {
            MatchStatus::Prepared => "Prepared",
            MatchStatus::InProgress => "Live",
            MatchStatus::Finished => "Final",
            MatchStatus::Cancelled => "Cancelled",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bracket {
    pub id: Option<String>,
    pub type_group: GroupType,
    pub match_ids: Vec<String>,
}

/// How a bracket groups its matches. Only `Olympic` (single elimination)
/// gets computed rounds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GroupType {
    #[default]
    Olympic,
    RoundRobin,
    Other(String),
}

impl GroupType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "OLYMPIC" => GroupType::Olympic,
            "ROUND_ROBIN" | "ROUNDROBIN" => GroupType::RoundRobin,
            _ => GroupType::Other(raw.to_owned()),
        }
    }

    pub fn is_olympic(&self) -> bool {
        *self == GroupType::Olympic
    }

    pub fn label(&self) -> &str {
        match self {
            GroupType::Olympic => "Single elimination",
            GroupType::RoundRobin => "Round robin",
            GroupType::Other(raw) => raw,
        }
    }
}

/// One derived column of a single-elimination bracket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Round {
    /// 0 = first round.
    pub index: usize,
    pub matches: Vec<Match>,
}

impl Round {
    pub fn label(&self, total_rounds: usize) -> String {
        match total_rounds.saturating_sub(self.index) {
            1 => "Final".to_string(),
            2 => "Semifinals".to_string(),
            3 => "Quarterfinals".to_string(),
            _ => format!("Round {}", self.index + 1),
        }
    }
}

/// Output of the bracket builder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BracketRounds {
    pub rounds: Vec<Round>,
    /// Ids of matches that never qualified for a round (cycles, depth cap).
    pub unplaced: Vec<String>,
}

impl BracketRounds {
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(p: ParticipantRef) -> ParticipantSlot {
        ParticipantSlot { participant: p, score: None }
    }

    #[test]
    fn group_type_parse_is_case_insensitive() {
        assert_eq!(GroupType::parse("OLYMPIC"), GroupType::Olympic);
        assert_eq!(GroupType::parse("olympic"), GroupType::Olympic);
        assert_eq!(GroupType::parse("round_robin"), GroupType::RoundRobin);
        assert_eq!(GroupType::parse("swiss"), GroupType::Other("swiss".into()));
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let bare = ParticipantRef::Id("p-7".into());
        assert_eq!(bare.display_name(), "p-7");

        let unnamed = ParticipantRef::Resolved(Participant { id: "p-8".into(), ..Default::default() });
        assert_eq!(unnamed.display_name(), "p-8");

        let named = ParticipantRef::Resolved(Participant {
            id: "p-9".into(),
            name: "Falcons".into(),
            email: None,
        });
        assert_eq!(named.display_name(), "Falcons");
    }

    #[test]
    fn round_labels_count_back_from_the_final() {
        let round = |index| Round { index, matches: vec![] };
        assert_eq!(round(3).label(4), "Final");
        assert_eq!(round(2).label(4), "Semifinals");
        assert_eq!(round(1).label(4), "Quarterfinals");
        assert_eq!(round(0).label(4), "Round 1");
    }

    #[test]
    fn bracket_matches_filters_by_descriptor() {
        let view = TournamentView {
            bracket: Some(Bracket {
                id: None,
                type_group: GroupType::Olympic,
                match_ids: vec!["b".into()],
            }),
            matches: vec![
                Match { id: "a".into(), ..Default::default() },
                Match { id: "b".into(), ..Default::default() },
            ],
            ..Default::default()
        };
        let ids: Vec<String> = view.bracket_matches().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["b".to_string()]);
    }

    #[test]
    fn bracket_matches_empty_descriptor_means_all() {
        let view = TournamentView {
            bracket: Some(Bracket::default()),
            matches: vec![Match { id: "a".into(), ..Default::default() }],
            ..Default::default()
        };
        assert_eq!(view.bracket_matches().len(), 1);
    }

    #[test]
    fn merge_matches_keeps_resolved_names() {
        let falcons = ParticipantRef::Resolved(Participant {
            id: "p1".into(),
            name: "Falcons".into(),
            email: None,
        });
        let mut view = TournamentView {
            matches: vec![Match {
                id: "m1".into(),
                participants: vec![slot(falcons.clone())],
                ..Default::default()
            }],
            ..Default::default()
        };
        view.merge_matches(vec![Match {
            id: "m1".into(),
            participants: vec![ParticipantSlot { participant: ParticipantRef::Id("p1".into()), score: Some(3) }],
            status: MatchStatus::Finished,
            ..Default::default()
        }]);
        let m = view.find_match("m1").unwrap();
        assert_eq!(m.participants[0].participant, falcons);
        assert_eq!(m.participants[0].score, Some(3));
        assert_eq!(m.status, MatchStatus::Finished);
    }

    #[test]
    fn winner_slot_matches_by_participant_id() {
        let m = Match {
            id: "m".into(),
            participants: vec![slot(ParticipantRef::Id("a".into())), slot(ParticipantRef::Id("b".into()))],
            winner: Some("b".into()),
            ..Default::default()
        };
        assert_eq!(m.winner_slot().map(|s| s.participant.id()), Some("b"));
    }
}
