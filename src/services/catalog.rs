use std::sync::Arc;

use tracing::info;
use validator::Validate;

use crate::{
    error::{Error, Result},
    models::{Movie, NewMovie, NewShowroom, Showroom},
    services::seatmap,
    store::Store,
};

/// Movies and showrooms: reference data the scheduler builds on.
#[derive(Clone)]
pub struct Catalog<S> {
    store: Arc<S>,
}

impl<S: Store> Catalog<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn add_movie(&self, movie: NewMovie) -> Result<Movie> {
        movie.validate()?;
        let movie = self.store.insert_movie(movie).await?;
        info!(movie_id = movie.id, title = %movie.title, "movie added");
        Ok(movie)
    }

    /// Movies are frozen once a show references them.
    pub async fn update_movie(&self, id: i64, movie: NewMovie) -> Result<Movie> {
        movie.validate()?;
        self.store.update_movie(id, movie).await
    }

    pub async fn movie(&self, id: i64) -> Result<Movie> {
        self.store.movie(id).await?.ok_or_else(|| Error::not_found("movie", id))
    }

    pub async fn movies(&self) -> Result<Vec<Movie>> {
        self.store.movies().await
    }

    /// Registers a showroom after checking that its template covers the
    /// declared capacity exactly once.
    pub async fn add_showroom(&self, showroom: NewShowroom) -> Result<Showroom> {
        showroom.validate()?;
        seatmap::validate_template(showroom.capacity, &showroom.zones)?;
        let showroom = self.store.insert_showroom(showroom).await?;
        info!(
            showroom_id = showroom.id,
            name = %showroom.name,
            capacity = showroom.capacity,
            "showroom added"
        );
        Ok(showroom)
    }

    pub async fn showroom(&self, id: i64) -> Result<Showroom> {
        self.store.showroom(id).await?.ok_or_else(|| Error::not_found("showroom", id))
    }

    pub async fn showrooms(&self) -> Result<Vec<Showroom>> {
        self.store.showrooms().await
    }
}
