//! Game score parsing and winner inference
//!
//! Fabrik match rows carry the per-game points as one string of
//! space-separated `a:x` tokens, e.g. `"11:7 9:11 11:5 11:8"`.
//!
//! A game is won by the side with more points in it; the match is won by
//! the side that won strictly more games.

use serde::{Deserialize, Serialize};

/// Points for one game of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameScore {
    /// 1-based position of the token in the raw score string
    pub game_number: u32,
    pub a_points: u32,
    pub x_points: u32,
}

impl GameScore {
    /// Winning side of this game, `None` for a level (invalid) game
    pub fn winner(&self) -> Option<Side> {
        match self.a_points.cmp(&self.x_points) {
            std::cmp::Ordering::Greater => Some(Side::A),
            std::cmp::Ordering::Less => Some(Side::X),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Participant side in a Fabrik match row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    X,
}

/// Games won by each side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetScore {
    pub a: u32,
    pub x: u32,
}

/// Parse a space-separated list of `a:x` game scores
///
/// Malformed tokens are skipped but still consume a game number, so the
/// numbering always reflects the token position in the source string.
///
/// # Examples
/// ```
/// use ttscrape::core::scores::parse_game_scores;
/// let games = parse_game_scores("11:7 x 9:11");
/// assert_eq!(games.len(), 2);
/// assert_eq!(games[1].game_number, 3);
/// ```
pub fn parse_game_scores(raw: &str) -> Vec<GameScore> {
    let mut games = Vec::new();

    for (idx, token) in raw.split_whitespace().enumerate() {
        let Some((left, right)) = token.split_once(':') else {
            continue;
        };

        let (Ok(a_points), Ok(x_points)) = (left.trim().parse::<u32>(), right.trim().parse::<u32>())
        else {
            tracing::debug!("Could not parse game score: {}", token);
            continue;
        };

        games.push(GameScore {
            game_number: idx as u32 + 1,
            a_points,
            x_points,
        });
    }

    games
}

/// Count games won per side
pub fn compute_set_score(games: &[GameScore]) -> SetScore {
    games.iter().fold(SetScore::default(), |mut acc, game| {
        match game.winner() {
            Some(Side::A) => acc.a += 1,
            Some(Side::X) => acc.x += 1,
            None => {}
        }
        acc
    })
}

/// Infer the match winner from per-game points
///
/// Returns `None` when both sides won the same number of games (including
/// the empty case).
pub fn infer_winner(games: &[GameScore]) -> Option<Side> {
    let sets = compute_set_score(games);
    match sets.a.cmp(&sets.x) {
        std::cmp::Ordering::Greater => Some(Side::A),
        std::cmp::Ordering::Less => Some(Side::X),
        std::cmp::Ordering::Equal => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_game_scores_simple() {
        let games = parse_game_scores("11:7 9:11 11:5");
        assert_eq!(games.len(), 3);
        assert_eq!(
            games[0],
            GameScore {
                game_number: 1,
                a_points: 11,
                x_points: 7
            }
        );
        assert_eq!(games[2].game_number, 3);
        assert_eq!(games[2].x_points, 5);
    }

    #[test]
    fn test_parse_game_scores_skips_malformed() {
        let games = parse_game_scores("11:7 abc 12:x 3:11:4 9:11");
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].game_number, 1);
        // Numbering follows the token position
        assert_eq!(games[1].game_number, 5);
        assert_eq!(games[1].a_points, 9);
    }

    #[test]
    fn test_parse_game_scores_extra_whitespace() {
        let games = parse_game_scores("  11:3    11:4 \t 12:10 ");
        assert_eq!(games.len(), 3);
        assert_eq!(games[2].game_number, 3);
    }

    #[test]
    fn test_parse_game_scores_empty() {
        assert!(parse_game_scores("").is_empty());
        assert!(parse_game_scores("   ").is_empty());
    }

    #[test]
    fn test_compute_set_score() {
        let games = parse_game_scores("11:7 9:11 11:5 11:8");
        assert_eq!(compute_set_score(&games), SetScore { a: 3, x: 1 });
    }

    #[test]
    fn test_level_game_not_counted() {
        let games = parse_game_scores("0:0 11:9");
        assert_eq!(compute_set_score(&games), SetScore { a: 1, x: 0 });
    }

    #[test]
    fn test_infer_winner() {
        assert_eq!(infer_winner(&parse_game_scores("11:7 11:9 11:2")), Some(Side::A));
        assert_eq!(infer_winner(&parse_game_scores("7:11 11:9 2:11")), Some(Side::X));
    }

    #[test]
    fn test_infer_winner_tie() {
        assert_eq!(infer_winner(&parse_game_scores("11:7 7:11")), None);
        assert_eq!(infer_winner(&[]), None);
    }
}
