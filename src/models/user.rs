use serde::{Deserialize, Serialize};

use super::MovieId;

/// Preference label that counts a movie as liked
pub const LIKE: &str = "like";

/// A caller's watchlist; at most one per user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Watchlist {
    pub user_id: String,
    #[serde(default)]
    pub movie_ids: Vec<MovieId>,
}

impl Watchlist {
    pub fn contains(&self, movie_id: &MovieId) -> bool {
        self.movie_ids.contains(movie_id)
    }
}

/// A label the user attached to a movie
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoviePreference {
    pub movie_id: MovieId,
    pub preference: String,
}

impl MoviePreference {
    pub fn is_like(&self) -> bool {
        self.preference.eq_ignore_ascii_case(LIKE)
    }
}

/// Taste profile of one user; at most one per user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UserDetails {
    pub user_id: String,
    #[serde(default)]
    pub actor_ids: Vec<i64>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    #[serde(default)]
    pub movie_ids: Vec<MoviePreference>,
}

impl UserDetails {
    pub fn preference_for(&self, movie_id: &MovieId) -> Option<&MoviePreference> {
        self.movie_ids.iter().find(|entry| &entry.movie_id == movie_id)
    }
}

/// Result of adding an item to a per-user set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The user's document did not exist and was created with the item
    Created,
    Added,
    AlreadyPresent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_lookup() {
        let details = UserDetails {
            user_id: "user_1".into(),
            movie_ids: vec![
                MoviePreference {
                    movie_id: MovieId::from(1),
                    preference: "like".into(),
                },
                MoviePreference {
                    movie_id: MovieId::from(2),
                    preference: "dislike".into(),
                },
            ],
            ..Default::default()
        };

        assert!(details.preference_for(&MovieId::from(1)).unwrap().is_like());
        assert!(!details.preference_for(&MovieId::from(2)).unwrap().is_like());
        assert!(details.preference_for(&MovieId::from(3)).is_none());
    }

    #[test]
    fn test_user_details_missing_lists_default() {
        let details: UserDetails = serde_json::from_str(r#"{"user_id": "u"}"#).unwrap();
        assert!(details.actor_ids.is_empty());
        assert!(details.movie_ids.is_empty());
    }
}
