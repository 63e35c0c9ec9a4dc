//! Player store keyed by ITTF id
//!
//! Accumulates players seen in ranking profiles and match rows, along with
//! win/loss counters and the matches each player appeared in.

use std::collections::BTreeMap;

use crate::core::{gender_from_event_label, normalize_name, split_association, Gender, Side};
use crate::models::{MatchRecord, Player, PlayerRef};

/// In-memory player database for one run
#[derive(Debug, Default)]
pub struct PlayerStore {
    players: BTreeMap<String, Player>,
    /// ittf_id -> match ids in the order they were recorded
    match_index: BTreeMap<String, Vec<String>>,
    now: String,
}

impl PlayerStore {
    /// Empty store stamping records with `now`
    pub fn new(now: impl Into<String>) -> Self {
        Self {
            players: BTreeMap::new(),
            match_index: BTreeMap::new(),
            now: now.into(),
        }
    }

    /// Insert or merge a full profile; set fields of the new record win
    pub fn upsert(&mut self, player: Player) {
        match self.players.get_mut(&player.ittf_id) {
            Some(existing) => {
                if player.full_name.is_some() {
                    existing.first_name = player.first_name;
                    existing.last_name = player.last_name;
                    existing.full_name = player.full_name;
                }
                if player.nationality.is_some() {
                    existing.nationality = player.nationality;
                }
                if player.gender.is_some() {
                    existing.gender = player.gender;
                }
                existing.sources.extend(player.sources);
                existing.last_seen = player.last_seen;
            }
            None => {
                self.players.insert(player.ittf_id.clone(), player);
            }
        }
    }

    /// Insert or enrich a player from a match participant
    ///
    /// Name and association only fill gaps. Returns `false` when the
    /// participant has no id.
    pub fn upsert_ref(&mut self, participant: &PlayerRef, source: &str) -> bool {
        let Some(id) = participant.ittf_id.as_deref().filter(|id| !id.is_empty()) else {
            return false;
        };

        let (name, name_assoc) = participant
            .name
            .as_deref()
            .map(split_association)
            .map(|(n, a)| (Some(n).filter(|n| !n.is_empty()), a))
            .unwrap_or((None, None));
        let association = participant.association.clone().or(name_assoc);

        let record = self
            .players
            .entry(id.to_string())
            .or_insert_with(|| Player::new(id, &self.now));

        if record.nationality.is_none() {
            record.nationality = association;
        }
        if record.full_name.is_none() {
            if let Some(name) = name {
                let parts = normalize_name(&name);
                record.first_name = parts.first;
                record.last_name = parts.last;
                record.full_name = parts.full;
            }
        }
        record.last_seen = self.now.clone();
        record.sources.insert(source.to_string());
        true
    }

    /// Set a missing gender on both participants from a singles/doubles
    /// event label; mixed events say nothing about either player
    pub fn fill_gender_from_event(&mut self, m: &MatchRecord) {
        let event_gender = m
            .event
            .as_ref()
            .and_then(|e| e.as_str())
            .and_then(gender_from_event_label)
            .filter(|g| *g != Gender::Mixed);
        let Some(gender) = event_gender else {
            return;
        };
        for id in [&m.players.a.ittf_id, &m.players.x.ittf_id].into_iter().flatten() {
            if let Some(p) = self.players.get_mut(id).filter(|p| p.gender.is_none()) {
                p.gender = Some(gender);
            }
        }
    }

    /// Register both participants of a match and update their counters
    ///
    /// Wins and losses are only counted when the score yields a winner and
    /// both ids are known. A men's or women's event fills a missing gender.
    pub fn record_match(&mut self, m: &MatchRecord, source: &str) {
        let a_known = self.upsert_ref(&m.players.a, source);
        let x_known = self.upsert_ref(&m.players.x, source);

        self.fill_gender_from_event(m);

        if m.match_id.is_empty() {
            return;
        }

        let mut played = Vec::new();
        if a_known {
            played.extend(m.players.a.ittf_id.clone());
        }
        if x_known {
            played.extend(m.players.x.ittf_id.clone());
        }
        for id in &played {
            self.match_index
                .entry(id.clone())
                .or_default()
                .push(m.match_id.clone());
            if let Some(p) = self.players.get_mut(id) {
                p.stats.matches_played += 1;
            }
        }

        if !(a_known && x_known) {
            return;
        }
        let (winner, loser) = match m.winner_inferred {
            Some(Side::A) => (&m.players.a.ittf_id, &m.players.x.ittf_id),
            Some(Side::X) => (&m.players.x.ittf_id, &m.players.a.ittf_id),
            None => return,
        };
        if let Some(p) = winner.as_ref().and_then(|id| self.players.get_mut(id)) {
            p.stats.wins += 1;
        }
        if let Some(p) = loser.as_ref().and_then(|id| self.players.get_mut(id)) {
            p.stats.losses += 1;
        }
    }

    pub fn get(&self, ittf_id: &str) -> Option<&Player> {
        self.players.get(ittf_id)
    }

    pub fn contains(&self, ittf_id: &str) -> bool {
        self.players.contains_key(ittf_id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Players keyed by id, sorted
    pub fn as_map(&self) -> &BTreeMap<String, Player> {
        &self.players
    }

    pub fn match_index(&self) -> &BTreeMap<String, Vec<String>> {
        &self.match_index
    }

    /// Player count per gender label, `unknown` for missing gender
    pub fn gender_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts: BTreeMap<&'static str, usize> =
            ["men", "women", "mixed", "unknown"].iter().map(|k| (*k, 0)).collect();
        for p in self.players.values() {
            let key = p.gender.as_ref().map(Gender::label).unwrap_or("unknown");
            *counts.entry(key).or_default() += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GameScore, SetScore};
    use crate::models::{MatchPlayers, MatchSource};

    fn participant(id: Option<&str>, name: &str, assoc: Option<&str>) -> PlayerRef {
        PlayerRef {
            ittf_id: id.map(str::to_string),
            name: Some(name.to_string()),
            association: assoc.map(str::to_string),
        }
    }

    fn record(id: &str, a: PlayerRef, x: PlayerRef, winner: Option<Side>) -> MatchRecord {
        MatchRecord {
            match_id: id.to_string(),
            year: Some("2025".to_string()),
            tournament: None,
            event: None,
            stage: None,
            round: None,
            walkover: false,
            winner_raw: None,
            winner_inferred: winner,
            final_sets: SetScore::default(),
            games: Vec::<GameScore>::new(),
            players: MatchPlayers { a, x },
            source: MatchSource {
                kind: "fabrik_list".to_string(),
                base_url: "http://localhost".to_string(),
                list_id: "31".to_string(),
            },
        }
    }

    #[test]
    fn test_upsert_ref_fills_gaps_only() {
        let mut store = PlayerStore::new("t0");
        assert!(store.upsert_ref(&participant(Some("1"), "WANG Chuqin (CHN)", None), "fabrik_matches"));
        assert!(store.upsert_ref(&participant(Some("1"), "Someone Else", Some("XXX")), "other"));

        let p = store.get("1").unwrap();
        assert_eq!(p.last_name.as_deref(), Some("WANG"));
        assert_eq!(p.first_name.as_deref(), Some("Chuqin"));
        assert_eq!(p.nationality.as_deref(), Some("CHN"));
        assert_eq!(p.sources.len(), 2);
    }

    #[test]
    fn test_upsert_ref_without_id() {
        let mut store = PlayerStore::new("t0");
        assert!(!store.upsert_ref(&participant(None, "Nobody", None), "fabrik_matches"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_upsert_profile_last_write_wins() {
        let mut store = PlayerStore::new("t0");
        store.upsert_ref(&participant(Some("7"), "OLD Name", Some("GER")), "fabrik_matches");

        let mut profile = Player::new("7", "t1");
        profile.full_name = Some("NEW Name".to_string());
        profile.last_name = Some("NEW".to_string());
        profile.gender = Some(Gender::Women);
        profile.sources.insert("rankings_api".to_string());
        store.upsert(profile);

        let p = store.get("7").unwrap();
        assert_eq!(p.full_name.as_deref(), Some("NEW Name"));
        assert_eq!(p.nationality.as_deref(), Some("GER"));
        assert_eq!(p.gender, Some(Gender::Women));
        assert!(p.sources.contains("fabrik_matches"));
        assert!(p.sources.contains("rankings_api"));
        assert_eq!(p.last_seen, "t1");
    }

    #[test]
    fn test_record_match_stats_and_index() {
        let mut store = PlayerStore::new("t0");
        let a = participant(Some("1"), "A Aa", None);
        let x = participant(Some("2"), "B Bb", None);

        store.record_match(&record("m1", a.clone(), x.clone(), Some(Side::A)), "fabrik_matches");
        store.record_match(&record("m2", a.clone(), x.clone(), Some(Side::X)), "fabrik_matches");
        store.record_match(&record("m3", a.clone(), x.clone(), None), "fabrik_matches");

        let p1 = store.get("1").unwrap();
        assert_eq!(p1.stats.matches_played, 3);
        assert_eq!(p1.stats.wins, 1);
        assert_eq!(p1.stats.losses, 1);
        assert_eq!(store.match_index()["2"], vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn test_record_match_one_sided() {
        let mut store = PlayerStore::new("t0");
        let a = participant(Some("1"), "A Aa", None);
        let x = participant(None, "Unknown", None);
        store.record_match(&record("m1", a, x, Some(Side::A)), "fabrik_matches");

        let p1 = store.get("1").unwrap();
        assert_eq!(p1.stats.matches_played, 1);
        assert_eq!(p1.stats.wins, 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_record_match_gender_from_event() {
        let mut store = PlayerStore::new("t0");
        let mut women = record(
            "m1",
            participant(Some("1"), "A Aa", None),
            participant(Some("2"), "B Bb", None),
            None,
        );
        women.event = Some(serde_json::json!("WS"));
        store.record_match(&women, "fabrik_matches");
        assert_eq!(store.get("1").unwrap().gender, Some(Gender::Women));
        assert_eq!(store.get("2").unwrap().gender, Some(Gender::Women));

        let mut mixed = record(
            "m2",
            participant(Some("3"), "C Cc", None),
            participant(Some("1"), "A Aa", None),
            None,
        );
        mixed.event = Some(serde_json::json!("XD"));
        store.record_match(&mixed, "fabrik_matches");
        assert_eq!(store.get("3").unwrap().gender, None);

        let mut men = record(
            "m3",
            participant(Some("1"), "A Aa", None),
            participant(Some("3"), "C Cc", None),
            None,
        );
        men.event = Some(serde_json::json!("MS"));
        store.record_match(&men, "fabrik_matches");
        assert_eq!(store.get("1").unwrap().gender, Some(Gender::Women));
        assert_eq!(store.get("3").unwrap().gender, Some(Gender::Men));
    }

    #[test]
    fn test_gender_counts() {
        let mut store = PlayerStore::new("t0");
        let mut p = Player::new("1", "t0");
        p.gender = Some(Gender::Men);
        store.upsert(p);
        store.upsert(Player::new("2", "t0"));

        let counts = store.gender_counts();
        assert_eq!(counts["men"], 1);
        assert_eq!(counts["unknown"], 1);
        assert_eq!(counts["women"], 0);
    }
}
