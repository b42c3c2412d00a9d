use sqlx::PgPool;

use crate::cache::{keys, CacheService};
use crate::models::{Screening, ScreeningDetail};

impl CacheService {
    pub async fn screening_detail(
        &self,
        pool: &PgPool,
        id: i32,
    ) -> Result<Option<ScreeningDetail>, sqlx::Error> {
        let key = keys::screening(id);
        if let Some(detail) = self.get_json(&key).await {
            return Ok(Some(detail));
        }
        let detail = Screening::find_detail(pool, id).await?;
        if let Some(detail) = &detail {
            self.set_json(&key, detail).await;
        }
        Ok(detail)
    }

    // Seat counter moved: drop the screening and the movie page that lists it
    pub async fn seats_changed(&self, screening_id: i32, movie_id: Option<i32>) {
        let mut stale = vec![keys::screening(screening_id)];
        if let Some(movie_id) = movie_id {
            stale.push(keys::movie(movie_id));
        }
        self.invalidate(&stale).await;
    }
}
