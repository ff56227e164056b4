use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    options::IndexOptions,
    Client, Collection, Database, IndexModel,
};

use super::store::{CatalogStore, LikedSet, MovieSelector};
use crate::{
    error::AppResult,
    models::{
        AddOutcome, Credit, Movie, MovieId, MovieKeywords, MoviePreference, Rating, SortField,
        UserDetails, Watchlist,
    },
};

const MOVIES: &str = "movies_metadata";
const CREDITS: &str = "credits";
const RATINGS: &str = "ratings";
const KEYWORDS: &str = "keywords";
const WATCHLISTS: &str = "watchlists";
const USER_DETAILS: &str = "user_details";

/// Creates a MongoDB client and selects the catalog database
///
/// The driver pools connections internally; the client is cheap to clone.
pub async fn connect(uri: &str, database: &str) -> anyhow::Result<(Client, Database)> {
    let client = Client::with_uri_str(uri).await?;
    let db = client.database(database);
    db.run_command(doc! { "ping": 1 }).await?;
    Ok((client, db))
}

/// All values a stored movie id may take: its string form and, when
/// numeric, its integer form
fn id_variants(id: &MovieId) -> Vec<Bson> {
    let mut variants = vec![Bson::String(id.as_str().to_string())];
    if let Some(n) = id.as_i64() {
        variants.push(Bson::Int64(n));
    }
    variants
}

fn id_filter(field: &str, ids: &[MovieId]) -> Document {
    let values: Vec<Bson> = ids.iter().flat_map(id_variants).collect();
    let mut filter = Document::new();
    filter.insert(field, doc! { "$in": values });
    filter
}

fn movie_id_from_bson(value: &Bson) -> Option<MovieId> {
    match value {
        Bson::String(s) => Some(MovieId::new(s.as_str())),
        Bson::Int32(n) => Some(MovieId::from(*n as i64)),
        Bson::Int64(n) => Some(MovieId::from(*n)),
        Bson::Double(n) if n.fract() == 0.0 => Some(MovieId::from(*n as i64)),
        _ => None,
    }
}

fn set_entry(set: LikedSet, id: i64) -> Document {
    let mut entry = Document::new();
    entry.insert(set.field(), id);
    entry
}

fn case_insensitive(pattern: &str) -> Document {
    doc! { "$regex": regex::escape(pattern), "$options": "i" }
}

/// `CatalogStore` backed by the MongoDB collections of the movie dataset
#[derive(Clone)]
pub struct MongoStore {
    movies: Collection<Movie>,
    credits: Collection<Credit>,
    ratings: Collection<Rating>,
    keywords: Collection<MovieKeywords>,
    watchlists: Collection<Watchlist>,
    user_details: Collection<UserDetails>,
    vector_index: String,
}

impl MongoStore {
    pub fn new(db: &Database, vector_index: impl Into<String>) -> Self {
        Self {
            movies: db.collection(MOVIES),
            credits: db.collection(CREDITS),
            ratings: db.collection(RATINGS),
            keywords: db.collection(KEYWORDS),
            watchlists: db.collection(WATCHLISTS),
            user_details: db.collection(USER_DETAILS),
            vector_index: vector_index.into(),
        }
    }

    /// Creates the indexes the store relies on. Safe to run on every start.
    pub async fn ensure_indexes(&self) -> AppResult<()> {
        let unique_user = || {
            IndexModel::builder()
                .keys(doc! { "user_id": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build()
        };
        self.watchlists.create_index(unique_user()).await?;
        self.user_details.create_index(unique_user()).await?;

        let by_movie = |field: &str| {
            let mut keys = Document::new();
            keys.insert(field, 1);
            IndexModel::builder().keys(keys).build()
        };
        self.movies.create_index(by_movie("id")).await?;
        self.credits.create_index(by_movie("id")).await?;
        self.ratings.create_index(by_movie("movieId")).await?;

        tracing::info!("MongoDB indexes ensured");
        Ok(())
    }

    fn selector_filter(selector: &MovieSelector) -> Document {
        match selector {
            MovieSelector::All => doc! {},
            MovieSelector::TitleContains(text) => doc! { "title": case_insensitive(text) },
            MovieSelector::Ids(ids) => id_filter("id", ids),
        }
    }

    fn user_filter(user_id: &str) -> Document {
        doc! { "user_id": user_id }
    }
}

#[async_trait::async_trait]
impl CatalogStore for MongoStore {
    async fn find_movies(
        &self,
        selector: &MovieSelector,
        sort: Option<SortField>,
        skip: u64,
        limit: u64,
    ) -> AppResult<(Vec<Movie>, u64)> {
        let filter = Self::selector_filter(selector);

        let total = match selector {
            MovieSelector::All => self.movies.estimated_document_count().await?,
            _ => self.movies.count_documents(filter.clone()).await?,
        };

        let mut find = self
            .movies
            .find(filter)
            .projection(doc! { "embedding": 0 })
            .skip(skip)
            .limit(limit as i64);
        if let Some(field) = sort {
            let mut order = Document::new();
            order.insert(field.field(), -1);
            order.insert("_id", 1);
            find = find.sort(order);
        }

        let movies: Vec<Movie> = find.await?.try_collect().await?;
        Ok((movies, total))
    }

    async fn get_movie(&self, id: &MovieId) -> AppResult<Option<Movie>> {
        let movie = self
            .movies
            .find_one(id_filter("id", std::slice::from_ref(id)))
            .projection(doc! { "embedding": 0 })
            .await?;
        Ok(movie)
    }

    async fn get_movies(&self, ids: &[MovieId]) -> AppResult<Vec<Movie>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self
            .movies
            .find(id_filter("id", ids))
            .projection(doc! { "embedding": 0 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn get_credit(&self, id: &MovieId) -> AppResult<Option<Credit>> {
        let credit = self
            .credits
            .find_one(id_filter("id", std::slice::from_ref(id)))
            .await?;
        Ok(credit)
    }

    async fn get_credits(&self, ids: &[MovieId]) -> AppResult<Vec<Credit>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self.credits.find(id_filter("id", ids)).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn ratings_for(&self, id: &MovieId) -> AppResult<Vec<Rating>> {
        let cursor = self
            .ratings
            .find(id_filter("movieId", std::slice::from_ref(id)))
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn keyword_movie_ids(&self, keyword: &str) -> AppResult<Vec<MovieId>> {
        let cursor = self
            .keywords
            .find(doc! {
                "$or": [
                    { "keywords": case_insensitive(keyword) },
                    { "keywords.name": case_insensitive(keyword) },
                ]
            })
            .projection(doc! { "id": 1 })
            .await?;
        let matches: Vec<MovieKeywords> = cursor.try_collect().await?;
        Ok(matches.into_iter().map(|doc| doc.id).collect())
    }

    async fn movie_keywords(&self, id: &MovieId) -> AppResult<Option<MovieKeywords>> {
        let keywords = self
            .keywords
            .find_one(id_filter("id", std::slice::from_ref(id)))
            .await?;
        Ok(keywords)
    }

    async fn vector_search(&self, embedding: &[f32], limit: usize) -> AppResult<Vec<MovieId>> {
        let query_vector: Vec<Bson> = embedding.iter().map(|v| Bson::Double(*v as f64)).collect();
        let pipeline = vec![
            doc! {
                "$vectorSearch": {
                    "index": self.vector_index.as_str(),
                    "path": "embedding",
                    "queryVector": query_vector,
                    "numCandidates": (limit * 10) as i64,
                    "limit": limit as i64,
                }
            },
            doc! { "$project": { "_id": 0, "id": 1 } },
        ];

        let hits: Vec<Document> = self.movies.aggregate(pipeline).await?.try_collect().await?;
        Ok(hits
            .iter()
            .filter_map(|hit| hit.get("id").and_then(movie_id_from_bson))
            .collect())
    }

    async fn get_watchlist(&self, user_id: &str) -> AppResult<Option<Watchlist>> {
        Ok(self.watchlists.find_one(Self::user_filter(user_id)).await?)
    }

    async fn add_to_watchlist(&self, user_id: &str, movie_id: &MovieId) -> AppResult<AddOutcome> {
        let result = self
            .watchlists
            .update_one(
                Self::user_filter(user_id),
                doc! { "$addToSet": { "movie_ids": movie_id.as_str() } },
            )
            .upsert(true)
            .await?;

        Ok(if result.upserted_id.is_some() {
            AddOutcome::Created
        } else if result.modified_count > 0 {
            AddOutcome::Added
        } else {
            AddOutcome::AlreadyPresent
        })
    }

    async fn remove_from_watchlist(&self, user_id: &str, movie_id: &MovieId) -> AppResult<bool> {
        let result = self
            .watchlists
            .update_one(
                Self::user_filter(user_id),
                doc! { "$pull": { "movie_ids": { "$in": id_variants(movie_id) } } },
            )
            .await?;
        Ok(result.modified_count > 0)
    }

    async fn get_user_details(&self, user_id: &str) -> AppResult<Option<UserDetails>> {
        Ok(self.user_details.find_one(Self::user_filter(user_id)).await?)
    }

    async fn add_liked_id(&self, user_id: &str, set: LikedSet, id: i64) -> AppResult<AddOutcome> {
        let result = self
            .user_details
            .update_one(
                Self::user_filter(user_id),
                doc! { "$addToSet": set_entry(set, id) },
            )
            .upsert(true)
            .await?;

        Ok(if result.upserted_id.is_some() {
            AddOutcome::Created
        } else if result.modified_count > 0 {
            AddOutcome::Added
        } else {
            AddOutcome::AlreadyPresent
        })
    }

    async fn remove_liked_id(&self, user_id: &str, set: LikedSet, id: i64) -> AppResult<bool> {
        let result = self
            .user_details
            .update_one(
                Self::user_filter(user_id),
                doc! { "$pull": set_entry(set, id) },
            )
            .await?;
        Ok(result.modified_count > 0)
    }

    async fn add_liked_movie(
        &self,
        user_id: &str,
        entry: MoviePreference,
    ) -> AppResult<AddOutcome> {
        let entry_doc = doc! {
            "movie_id": entry.movie_id.as_str(),
            "preference": entry.preference.as_str(),
        };

        let Some(details) = self.get_user_details(user_id).await? else {
            let result = self
                .user_details
                .update_one(
                    Self::user_filter(user_id),
                    doc! { "$push": { "movie_ids": entry_doc } },
                )
                .upsert(true)
                .await?;
            return Ok(if result.upserted_id.is_some() {
                AddOutcome::Created
            } else {
                AddOutcome::Added
            });
        };

        if details.preference_for(&entry.movie_id).is_some() {
            return Ok(AddOutcome::AlreadyPresent);
        }

        // The $nin guard keeps a concurrent add of the same movie from
        // producing two entries.
        let mut filter = Self::user_filter(user_id);
        filter.insert(
            "movie_ids.movie_id",
            doc! { "$nin": id_variants(&entry.movie_id) },
        );
        let result = self
            .user_details
            .update_one(filter, doc! { "$push": { "movie_ids": entry_doc } })
            .await?;

        Ok(if result.modified_count > 0 {
            AddOutcome::Added
        } else {
            AddOutcome::AlreadyPresent
        })
    }

    async fn remove_liked_movie(&self, user_id: &str, movie_id: &MovieId) -> AppResult<bool> {
        let result = self
            .user_details
            .update_one(
                Self::user_filter(user_id),
                doc! { "$pull": { "movie_ids": { "movie_id": { "$in": id_variants(movie_id) } } } },
            )
            .await?;
        Ok(result.modified_count > 0)
    }
}
