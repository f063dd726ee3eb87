use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::{
    error::{Error, Result},
    models::{ScheduleShowRequest, ScheduledShow, Show, ShowDraft},
    services::pricing,
    store::Store,
};

#[derive(Clone)]
pub struct Scheduler<S> {
    store: Arc<S>,
}

impl<S: Store> Scheduler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Creates a show with its seat map and pricing in one unit. The end time
    /// is derived from the movie's duration; a room can only run one show at
    /// a time.
    pub async fn schedule_show(&self, request: ScheduleShowRequest) -> Result<ScheduledShow> {
        pricing::validate_price_sheet(request.base_price, &request.premiums)?;

        let now = Utc::now();
        if request.start_time <= now {
            return Err(Error::Validation(format!(
                "show must start in the future, got {}",
                request.start_time
            )));
        }

        let movie = self
            .store
            .movie(request.movie_id)
            .await?
            .ok_or_else(|| Error::Validation(format!("unknown movie {}", request.movie_id)))?;
        let showroom = self
            .store
            .showroom(request.showroom_id)
            .await?
            .ok_or_else(|| Error::Validation(format!("unknown showroom {}", request.showroom_id)))?;

        let draft = ShowDraft {
            movie_id: movie.id,
            showroom_id: showroom.id,
            start_time: request.start_time,
            base_price: request.base_price,
            premiums: request.premiums,
        };

        match self.store.create_show(draft, &showroom).await {
            Ok(scheduled) => {
                info!(
                    show_id = scheduled.show.id,
                    movie = %movie.title,
                    showroom = %showroom.name,
                    start = %scheduled.show.start_time,
                    seats = scheduled.seats.len(),
                    "show scheduled"
                );
                Ok(scheduled)
            }
            Err(e @ Error::Conflict(_)) => {
                warn!(showroom_id = showroom.id, start = %request.start_time, "scheduling conflict: {}", e);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn show(&self, id: i64) -> Result<Show> {
        self.store.show(id).await?.ok_or_else(|| Error::not_found("show", id))
    }

    pub async fn shows_in_showroom(&self, showroom_id: i64) -> Result<Vec<Show>> {
        self.store.shows_in_showroom(showroom_id).await
    }
}
