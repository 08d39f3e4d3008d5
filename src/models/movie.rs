use serde::{Deserialize, Serialize};
use std::fmt::Display;

const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";
const IMDB_TITLE_URL: &str = "https://www.imdb.com/title";
const YOUTUBE_EMBED_URL: &str = "https://www.youtube.com/embed";

/// Number of cast members shown on the movie page
pub const TOP_CAST_LIMIT: usize = 6;

/// TMDB movie identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(pub u64);

impl Display for MovieId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for MovieId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Movie as returned by `GET /movie/{id}?append_to_response=videos,credits`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub spoken_languages: Vec<SpokenLanguage>,
    #[serde(default)]
    pub credits: Credits,
    #[serde(default)]
    pub videos: Videos,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpokenLanguage {
    #[serde(default)]
    pub english_name: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastCredit>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CastCredit {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Videos {
    #[serde(default)]
    pub results: Vec<Video>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Video {
    pub key: String,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default, rename = "type")]
    pub video_type: Option<String>,
}

/// One entry of `GET /movie/{id}/recommendations`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieSummary {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
}

/// Generic TMDB paged envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paged<T> {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

// ============================================================================
// Client-facing view model
// ============================================================================

/// Movie page data, shaped for the browser client
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MovieDetails {
    pub id: MovieId,
    pub title: String,
    pub release_year: Option<String>,
    pub tagline: Option<String>,
    pub overview: Option<String>,
    pub rating: Option<Rating>,
    pub runtime_minutes: Option<u32>,
    pub primary_language: Option<String>,
    pub genres: Vec<Genre>,
    pub top_cast: Vec<CastMember>,
    pub poster_url: Option<String>,
    pub homepage: Option<String>,
    pub imdb_url: Option<String>,
    pub trailer_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Rating {
    /// TMDB vote average, out of 10
    pub vote_average: f64,
    /// Same value on a five-star scale
    pub stars: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CastMember {
    pub id: u64,
    pub name: String,
    pub character: Option<String>,
    pub profile_url: String,
}

fn image_url(path: &str) -> String {
    format!("{}/{}", IMAGE_BASE_URL, path.trim_start_matches('/'))
}

impl CastMember {
    /// Cast members without a profile image are not shown
    pub fn from_credit(credit: &CastCredit) -> Option<Self> {
        let profile_path = credit.profile_path.as_deref()?;
        Some(Self {
            id: credit.id,
            name: credit.name.clone(),
            character: credit
                .character
                .as_deref()
                .and_then(|c| c.split('/').next())
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            profile_url: image_url(profile_path),
        })
    }
}

impl From<&Movie> for MovieDetails {
    fn from(movie: &Movie) -> Self {
        let release_year = movie
            .release_date
            .as_deref()
            .and_then(|date| date.split('-').next())
            .filter(|year| !year.is_empty())
            .map(str::to_string);

        let top_cast = movie
            .credits
            .cast
            .iter()
            .take(TOP_CAST_LIMIT)
            .filter_map(CastMember::from_credit)
            .collect();

        Self {
            id: movie.id,
            title: movie.title.clone(),
            release_year,
            tagline: movie.tagline.clone().filter(|t| !t.is_empty()),
            overview: movie.overview.clone(),
            rating: movie.vote_average.map(|vote_average| Rating {
                vote_average,
                stars: vote_average / 2.0,
            }),
            runtime_minutes: movie.runtime,
            primary_language: movie.spoken_languages.first().map(|l| l.name.clone()),
            genres: movie.genres.clone(),
            top_cast,
            poster_url: movie.poster_path.as_deref().map(image_url),
            homepage: movie.homepage.clone().filter(|h| !h.is_empty()),
            imdb_url: movie
                .imdb_id
                .as_deref()
                .map(|id| format!("{}/{}", IMDB_TITLE_URL, id)),
            trailer_url: movie
                .videos
                .results
                .first()
                .map(|video| format!("{}/{}", YOUTUBE_EMBED_URL, video.key)),
        }
    }
}
