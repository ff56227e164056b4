use serde::{Deserialize, Serialize};

use super::MovieId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CastMember {
    /// Person id
    pub id: i64,
    pub name: String,
    #[serde(default, alias = "role")]
    pub character: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrewMember {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub job: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

/// Cast and crew of one movie, keyed by the movie id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credit {
    pub id: MovieId,
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

/// Blob name of a person's profile photo
pub fn profile_blob(person_id: i64) -> String {
    format!("profiles/{}.jpg", person_id)
}
