//! Joins catalog documents with the caller's watchlist and taste profile.

use std::collections::{HashMap, HashSet};

use crate::{
    db::CatalogStore,
    error::AppResult,
    models::{
        profile_blob, CastMember, CastView, Credit, CrewMember, CrewView, Genre, GenreView, Movie,
        MovieDetailView, MovieId, MovieView, Rating, UserDetails, Watchlist,
    },
    services::signing::BlobSigner,
};

/// What the enrichment needs to know about the caller
#[derive(Debug, Clone, Default)]
pub struct Personalization {
    /// Watchlist in stored order
    pub watchlist: Vec<MovieId>,
    watchlisted: HashSet<MovieId>,
    liked_genres: HashSet<i64>,
    liked_actors: HashSet<i64>,
    preferences: HashMap<MovieId, String>,
}

impl Personalization {
    pub fn from_documents(watchlist: Option<&Watchlist>, details: Option<&UserDetails>) -> Self {
        let watchlist = watchlist.map(|w| w.movie_ids.clone()).unwrap_or_default();
        let watchlisted = watchlist.iter().cloned().collect();

        let (liked_genres, liked_actors, preferences) = match details {
            Some(details) => (
                details.genre_ids.iter().copied().collect(),
                details.actor_ids.iter().copied().collect(),
                details
                    .movie_ids
                    .iter()
                    .map(|entry| (entry.movie_id.clone(), entry.preference.clone()))
                    .collect(),
            ),
            None => Default::default(),
        };

        Self {
            watchlist,
            watchlisted,
            liked_genres,
            liked_actors,
            preferences,
        }
    }

    /// Loads the caller's watchlist and details documents
    pub async fn load(store: &dyn CatalogStore, user_id: &str) -> AppResult<Self> {
        let watchlist = store.get_watchlist(user_id).await?;
        let details = store.get_user_details(user_id).await?;
        Ok(Self::from_documents(watchlist.as_ref(), details.as_ref()))
    }

    pub fn is_watchlisted(&self, id: &MovieId) -> bool {
        self.watchlisted.contains(id)
    }

    pub fn likes_genre(&self, genre_id: i64) -> bool {
        self.liked_genres.contains(&genre_id)
    }

    pub fn likes_actor(&self, person_id: i64) -> bool {
        self.liked_actors.contains(&person_id)
    }

    pub fn preference(&self, id: &MovieId) -> Option<&str> {
        self.preferences.get(id).map(String::as_str)
    }
}

/// Mean of the ratings rounded to two decimals, 0 when there are none
pub fn average_rating(ratings: &[Rating]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let mean = ratings.iter().map(|r| r.rating).sum::<f64>() / ratings.len() as f64;
    (mean * 100.0).round() / 100.0
}

/// Builds client views of catalog documents for one caller
pub struct Enricher<'a> {
    signer: &'a dyn BlobSigner,
    personalization: &'a Personalization,
}

impl<'a> Enricher<'a> {
    pub fn new(signer: &'a dyn BlobSigner, personalization: &'a Personalization) -> Self {
        Self {
            signer,
            personalization,
        }
    }

    pub fn personalization(&self) -> &Personalization {
        self.personalization
    }

    pub fn genres(&self, genres: &[Genre]) -> Vec<GenreView> {
        genres
            .iter()
            .map(|genre| GenreView {
                id: genre.id,
                name: genre.name.clone(),
                liked: self.personalization.likes_genre(genre.id),
            })
            .collect()
    }

    pub fn cast(&self, cast: &[CastMember]) -> AppResult<Vec<CastView>> {
        cast.iter()
            .map(|member| {
                Ok(CastView {
                    id: member.id,
                    name: member.name.clone(),
                    character: member.character.clone(),
                    profile_url: self.signer.signed_url(&profile_blob(member.id))?,
                    liked: self.personalization.likes_actor(member.id),
                })
            })
            .collect()
    }

    pub fn crew(&self, crew: &[CrewMember]) -> AppResult<Vec<CrewView>> {
        crew.iter()
            .map(|member| {
                Ok(CrewView {
                    id: member.id,
                    name: member.name.clone(),
                    job: member.job.clone(),
                    department: member.department.clone(),
                    profile_url: self.signer.signed_url(&profile_blob(member.id))?,
                })
            })
            .collect()
    }

    /// In skinny mode the credit is ignored and cast/crew are omitted
    pub fn movie(&self, movie: Movie, credit: Option<&Credit>, skinny: bool) -> AppResult<MovieView> {
        let (cast, crew) = if skinny {
            (None, None)
        } else {
            match credit {
                Some(credit) => (Some(self.cast(&credit.cast)?), Some(self.crew(&credit.crew)?)),
                None => (Some(Vec::new()), Some(Vec::new())),
            }
        };

        Ok(MovieView {
            poster_url: self.signer.signed_url(&movie.id.poster_blob())?,
            is_watchlisted: self.personalization.is_watchlisted(&movie.id),
            genres: self.genres(&movie.genres),
            id: movie.id,
            title: movie.title,
            release_date: movie.release_date,
            overview: movie.overview,
            tagline: movie.tagline,
            original_language: movie.original_language,
            runtime: movie.runtime,
            popularity: movie.popularity,
            vote_average: movie.vote_average,
            vote_count: movie.vote_count,
            cast,
            crew,
        })
    }

    pub fn detail(
        &self,
        movie: Movie,
        credit: Option<&Credit>,
        ratings: &[Rating],
    ) -> AppResult<MovieDetailView> {
        let preference = self.personalization.preference(&movie.id).map(str::to_string);
        Ok(MovieDetailView {
            movie: self.movie(movie, credit, false)?,
            average_rating: average_rating(ratings),
            watched: preference.is_some(),
            preference,
        })
    }

    /// Enriches an already-fetched window of movies, joining credits unless skinny
    pub async fn movies(
        &self,
        store: &dyn CatalogStore,
        movies: Vec<Movie>,
        skinny: bool,
    ) -> AppResult<Vec<MovieView>> {
        let credits: HashMap<MovieId, Credit> = if skinny || movies.is_empty() {
            HashMap::new()
        } else {
            let ids: Vec<MovieId> = movies.iter().map(|m| m.id.clone()).collect();
            store
                .get_credits(&ids)
                .await?
                .into_iter()
                .map(|credit| (credit.id.clone(), credit))
                .collect()
        };

        movies
            .into_iter()
            .map(|movie| {
                let credit = credits.get(&movie.id);
                self.movie(movie, credit, skinny)
            })
            .collect()
    }

    /// Fetches and enriches movies by id, keeping the order of `ids`.
    /// Duplicate and unknown ids are dropped.
    pub async fn fetch_movies(
        &self,
        store: &dyn CatalogStore,
        ids: &[MovieId],
        skinny: bool,
    ) -> AppResult<Vec<MovieView>> {
        let mut seen = HashSet::new();
        let ids: Vec<MovieId> = ids.iter().filter(|id| seen.insert(*id)).cloned().collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_id: HashMap<MovieId, Movie> = store
            .get_movies(&ids)
            .await?
            .into_iter()
            .map(|movie| (movie.id.clone(), movie))
            .collect();
        let ordered: Vec<Movie> = ids.iter().filter_map(|id| by_id.remove(id)).collect();

        tracing::debug!(
            requested = ids.len(),
            found = ordered.len(),
            "Batch movie fetch"
        );

        self.movies(store, ordered, skinny).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::db::MemorySeed;
    use crate::models::{MoviePreference, LIKE};

    /// Deterministic signer: `signed://<blob>`
    pub(crate) struct PlainSigner;

    impl BlobSigner for PlainSigner {
        fn signed_url(&self, blob_name: &str) -> AppResult<String> {
            Ok(format!("signed://{}", blob_name))
        }
    }

    fn rating(movie: i64, value: f64) -> Rating {
        Rating {
            user_id: 1,
            movie_id: MovieId::from(movie),
            rating: value,
            timestamp: 0,
        }
    }

    fn movie(id: i64) -> Movie {
        Movie {
            id: MovieId::from(id),
            title: format!("Movie {}", id),
            genres: vec![
                Genre {
                    id: 18,
                    name: "Drama".into(),
                },
                Genre {
                    id: 80,
                    name: "Crime".into(),
                },
            ],
            ..Default::default()
        }
    }

    fn credit(id: i64) -> Credit {
        Credit {
            id: MovieId::from(id),
            cast: vec![
                CastMember {
                    id: 1158,
                    name: "Al Pacino".into(),
                    character: Some("Lt. Vincent Hanna".into()),
                },
                CastMember {
                    id: 380,
                    name: "Robert De Niro".into(),
                    character: Some("Neil McCauley".into()),
                },
            ],
            crew: vec![CrewMember {
                id: 638,
                name: "Michael Mann".into(),
                job: Some("Director".into()),
                department: Some("Directing".into()),
            }],
        }
    }

    fn caller() -> Personalization {
        Personalization::from_documents(
            Some(&Watchlist {
                user_id: "u".into(),
                movie_ids: vec![MovieId::from(949)],
            }),
            Some(&UserDetails {
                user_id: "u".into(),
                actor_ids: vec![380],
                genre_ids: vec![80],
                movie_ids: vec![MoviePreference {
                    movie_id: MovieId::from(949),
                    preference: LIKE.into(),
                }],
            }),
        )
    }

    #[test]
    fn test_average_rating() {
        assert_eq!(average_rating(&[rating(1, 3.0), rating(1, 5.0)]), 4.0);
        assert_eq!(average_rating(&[]), 0.0);
        assert_eq!(
            average_rating(&[rating(1, 3.5), rating(1, 4.0), rating(1, 4.0)]),
            3.83
        );
    }

    #[test]
    fn test_movie_view_flags() {
        let personalization = caller();
        let enricher = Enricher::new(&PlainSigner, &personalization);

        let view = enricher.movie(movie(949), Some(&credit(949)), false).unwrap();

        assert_eq!(view.poster_url, "signed://posters/949.jpg");
        assert!(view.is_watchlisted);
        assert!(!view.genres[0].liked);
        assert!(view.genres[1].liked);

        let cast = view.cast.unwrap();
        assert!(!cast[0].liked);
        assert!(cast[1].liked);
        assert_eq!(cast[1].profile_url, "signed://profiles/380.jpg");
        assert_eq!(view.crew.unwrap()[0].job.as_deref(), Some("Director"));
    }

    #[test]
    fn test_skinny_omits_credits() {
        let personalization = Personalization::default();
        let enricher = Enricher::new(&PlainSigner, &personalization);

        let view = enricher.movie(movie(1), Some(&credit(1)), true).unwrap();
        assert!(view.cast.is_none());
        assert!(view.crew.is_none());
        assert!(!view.is_watchlisted);
    }

    #[test]
    fn test_detail_watched_and_preference() {
        let personalization = caller();
        let enricher = Enricher::new(&PlainSigner, &personalization);

        let detail = enricher
            .detail(movie(949), None, &[rating(949, 3.0), rating(949, 5.0)])
            .unwrap();
        assert_eq!(detail.average_rating, 4.0);
        assert!(detail.watched);
        assert_eq!(detail.preference.as_deref(), Some("like"));

        let unseen = enricher.detail(movie(5), None, &[]).unwrap();
        assert!(!unseen.watched);
        assert_eq!(unseen.average_rating, 0.0);
    }

    #[tokio::test]
    async fn test_fetch_movies_keeps_requested_order() {
        let store = MemoryStore::from_seed(MemorySeed {
            movies: vec![movie(1), movie(2), movie(3)],
            credits: vec![credit(2)],
            ..Default::default()
        });
        let personalization = Personalization::default();
        let enricher = Enricher::new(&PlainSigner, &personalization);

        let ids = vec![
            MovieId::from(3),
            MovieId::from(404),
            MovieId::from(1),
            MovieId::from(3),
            MovieId::from(2),
        ];
        let views = enricher.fetch_movies(&store, &ids, false).await.unwrap();

        let order: Vec<_> = views.iter().map(|v| v.id.to_string()).collect();
        assert_eq!(order, vec!["3", "1", "2"]);
        assert_eq!(views[2].cast.as_ref().unwrap().len(), 2);
        assert!(views[0].cast.as_ref().unwrap().is_empty());
    }
}
