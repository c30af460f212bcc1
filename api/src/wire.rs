/// REST wire types for the tournament platform API.
/// These map to the clean domain types via the `From` impls below.
use crate::{
    Bracket, GroupType, Match, MatchStatus, Participant, ParticipantRef, ParticipantSlot,
    Tournament, User,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Tournaments
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WireTournament {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub sport: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<String>, // ISO 8601
}

// ---------------------------------------------------------------------------
// Matches
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WireMatch {
    pub id: String,
    pub planned_start_time: Option<String>,
    #[serde(default)]
    pub parent_matches: Vec<String>,
    #[serde(default)]
    pub participants: Vec<WireParticipantSlot>,
    pub status: Option<String>, // "prepared" | "in_progress" | "finished" | "cancelled"
    pub winner: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WireParticipantSlot {
    pub participant: WireParticipantRef,
    pub score: Option<i64>,
}

/// Older endpoints send the participant id as a bare string, newer ones embed
/// the record.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum WireParticipantRef {
    Id(String),
    Object(WireParticipant),
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct WireParticipant {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

// ---------------------------------------------------------------------------
// Bracket descriptor
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WireBracket {
    pub id: Option<String>,
    #[serde(default)]
    pub type_group: String,
    #[serde(default)]
    pub matches: Vec<String>,
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Clone)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct LoginResponse {
    pub token: String,
    pub user: Option<User>,
}

/// Demo dataset layout: everything one tournament view needs in one document.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct WireTournamentBundle {
    pub tournament: WireTournament,
    pub bracket: Option<WireBracket>,
    #[serde(default)]
    pub matches: Vec<WireMatch>,
}

// ---------------------------------------------------------------------------
// Mapping: wire types → domain types
// ---------------------------------------------------------------------------

impl From<WireTournament> for Tournament {
    fn from(w: WireTournament) -> Self {
        Tournament {
            start_date: w.start_date.as_deref().and_then(parse_timestamp),
            id: w.id,
            name: w.name,
            sport: w.sport,
            status: w.status,
        }
    }
}

impl From<WireMatch> for Match {
    fn from(w: WireMatch) -> Self {
        Match {
            planned_start_time: w.planned_start_time.as_deref().and_then(parse_timestamp),
            status: w.status.as_deref().map(parse_status).unwrap_or_default(),
            id: w.id,
            parent_matches: w.parent_matches,
            participants: w.participants.into_iter().map(ParticipantSlot::from).collect(),
            winner: w.winner.filter(|id| !id.is_empty()),
        }
    }
}

impl From<WireParticipantSlot> for ParticipantSlot {
    fn from(w: WireParticipantSlot) -> Self {
        ParticipantSlot { participant: w.participant.into(), score: w.score }
    }
}

impl From<WireParticipantRef> for ParticipantRef {
    fn from(w: WireParticipantRef) -> Self {
        match w {
            WireParticipantRef::Id(id) => ParticipantRef::Id(id),
            // An object without a name carries nothing the bare id doesn't.
            WireParticipantRef::Object(p) if p.name.is_none() && p.email.is_none() => {
                ParticipantRef::Id(p.id)
            }
            WireParticipantRef::Object(p) => ParticipantRef::Resolved(p.into()),
        }
    }
}

impl From<WireParticipant> for Participant {
    fn from(w: WireParticipant) -> Self {
        Participant { id: w.id, name: w.name.unwrap_or_default(), email: w.email }
    }
}

impl From<WireBracket> for Bracket {
    fn from(w: WireBracket) -> Self {
        Bracket { id: w.id, type_group: GroupType::parse(&w.type_group), match_ids: w.matches }
    }
}

pub fn parse_status(s: &str) -> MatchStatus {
    match s.trim().to_ascii_lowercase().as_str() {
        "in_progress" | "in-progress" | "inprogress" | "live" => MatchStatus::InProgress,
        "finished" | "completed" | "done" => MatchStatus::Finished,
        "cancelled" | "canceled" => MatchStatus::Cancelled,
        _ => MatchStatus::Prepared,
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_as_bare_string() {
        let raw = r#"{"participant": "p-1", "score": 2}"#;
        let slot: ParticipantSlot = serde_json::from_str::<WireParticipantSlot>(raw).unwrap().into();
        assert_eq!(slot.participant, ParticipantRef::Id("p-1".into()));
        assert_eq!(slot.score, Some(2));
    }

    #[test]
    fn participant_as_object() {
        let raw = r#"{"participant": {"id": "p-2", "name": "Wolves", "email": "w@example.org"}}"#;
        let slot: ParticipantSlot = serde_json::from_str::<WireParticipantSlot>(raw).unwrap().into();
        assert_eq!(
            slot.participant,
            ParticipantRef::Resolved(Participant {
                id: "p-2".into(),
                name: "Wolves".into(),
                email: Some("w@example.org".into()),
            })
        );
        assert_eq!(slot.score, None);
    }

    #[test]
    fn id_only_object_stays_unresolved() {
        let raw = r#"{"participant": {"id": "p-3"}}"#;
        let slot: ParticipantSlot = serde_json::from_str::<WireParticipantSlot>(raw).unwrap().into();
        assert_eq!(slot.participant, ParticipantRef::Id("p-3".into()));
    }

    #[test]
    fn match_maps_all_fields() {
        let raw = r#"{
            "id": "m-5",
            "plannedStartTime": "2026-06-01T18:30:00Z",
            "parentMatches": ["m-1", "m-2"],
            "participants": [{"participant": "a", "score": 3}, {"participant": "b", "score": 1}],
            "status": "FINISHED",
            "winner": "a"
        }"#;
        let m: Match = serde_json::from_str::<WireMatch>(raw).unwrap().into();
        assert_eq!(m.id, "m-5");
        assert_eq!(m.parent_matches, vec!["m-1".to_string(), "m-2".to_string()]);
        assert_eq!(m.status, MatchStatus::Finished);
        assert_eq!(m.winner.as_deref(), Some("a"));
        assert_eq!(m.planned_start_time.unwrap().to_rfc3339(), "2026-06-01T18:30:00+00:00");
    }

    #[test]
    fn match_defaults_for_missing_fields() {
        let m: Match = serde_json::from_str::<WireMatch>(r#"{"id": "m"}"#).unwrap().into();
        assert!(m.parent_matches.is_empty());
        assert!(m.participants.is_empty());
        assert_eq!(m.status, MatchStatus::Prepared);
        assert!(m.planned_start_time.is_none());
    }

    #[test]
    fn bad_timestamp_is_dropped() {
        let raw = r#"{"id": "m", "plannedStartTime": "tomorrow", "winner": ""}"#;
        let m: Match = serde_json::from_str::<WireMatch>(raw).unwrap().into();
        assert!(m.planned_start_time.is_none());
        assert!(m.winner.is_none());
    }

    #[test]
    fn status_parsing() {
        assert_eq!(parse_status("prepared"), MatchStatus::Prepared);
        assert_eq!(parse_status("in_progress"), MatchStatus::InProgress);
        assert_eq!(parse_status("Finished"), MatchStatus::Finished);
        assert_eq!(parse_status("canceled"), MatchStatus::Cancelled);
        assert_eq!(parse_status("???"), MatchStatus::Prepared);
    }

    #[test]
    fn bracket_descriptor_maps_group_type() {
        let raw = r#"{"id": "b1", "typeGroup": "OLYMPIC", "matches": ["m-1"]}"#;
        let b: Bracket = serde_json::from_str::<WireBracket>(raw).unwrap().into();
        assert_eq!(b.type_group, GroupType::Olympic);
        assert_eq!(b.match_ids, vec!["m-1".to_string()]);
    }
}
