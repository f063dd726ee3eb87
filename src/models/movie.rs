use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub poster: Option<String>,
    pub duration_minutes: i32,
}

impl Movie {
    /// Running time used to derive a show's end time.
    pub fn duration(&self) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.duration_minutes))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewMovie {
    #[validate(length(min = 1, max = 255, message = "title must not be empty"))]
    pub title: String,
    pub description: String,
    pub poster: Option<String>,
    #[validate(range(min = 1, max = 1440, message = "duration must be between 1 and 1440 minutes"))]
    pub duration_minutes: i32,
}

impl NewMovie {
    pub fn into_movie(self, id: i64) -> Movie {
        Movie {
            id,
            title: self.title,
            description: self.description,
            poster: self.poster,
            duration_minutes: self.duration_minutes,
        }
    }
}
