//! Sample catalog for a fresh database: three theaters, fifteen movies and a
//! week of evening screenings. Seeding is skipped when any movie exists.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::PgPool;
use tracing::info;

use crate::models::movie::NewMovie;
use crate::models::screening::NewScreening;
use crate::models::{Movie, Screening, Theater};

const THEATERS: [(&str, i32); 3] = [("Theater 1", 100), ("Theater 2", 150), ("Theater 3", 200)];

struct SampleMovie {
    title: &'static str,
    description: &'static str,
    duration: i32,
    release_date: (i32, u32, u32),
    genre: &'static str,
    rating: f64,
    image_url: &'static str,
}

const MOVIES: [SampleMovie; 15] = [
    SampleMovie {
        title: "The Dark Knight",
        description: "When the menace known as the Joker wreaks havoc and chaos on the people of Gotham, Batman must accept one of the greatest psychological and physical tests of his ability to fight injustice.",
        duration: 152,
        release_date: (2008, 7, 18),
        genre: "Action",
        rating: 9.0,
        image_url: "https://image.tmdb.org/t/p/w500/qJ2tW6WMUDux911r6m7haRef0WH.jpg",
    },
    SampleMovie {
        title: "Inception",
        description: "A thief who steals corporate secrets through the use of dream-sharing technology is given the inverse task of planting an idea into the mind of a C.E.O.",
        duration: 148,
        release_date: (2010, 7, 16),
        genre: "Sci-Fi",
        rating: 8.8,
        image_url: "https://image.tmdb.org/t/p/w500/8IB2e4r4oVhHnANbnm7O3Tj4dYz.jpg",
    },
    SampleMovie {
        title: "Pulp Fiction",
        description: "The lives of two mob hitmen, a boxer, a gangster and his wife, and a pair of diner bandits intertwine in four tales of violence and redemption.",
        duration: 154,
        release_date: (1994, 10, 14),
        genre: "Crime",
        rating: 8.9,
        image_url: "https://image.tmdb.org/t/p/w500/d5iIlFn5s0ImszYzBPb8JPIfbXD.jpg",
    },
    SampleMovie {
        title: "The Matrix",
        description: "A computer programmer discovers that reality as he knows it is a simulation created by machines, and joins a rebellion to break free from the system.",
        duration: 136,
        release_date: (1999, 3, 31),
        genre: "Sci-Fi",
        rating: 8.7,
        image_url: "https://image.tmdb.org/t/p/w500/f89U3ADr1oiB1s9GkdPOEpXUk5H.jpg",
    },
    SampleMovie {
        title: "Forrest Gump",
        description: "The presidencies of Kennedy and Johnson, the Vietnam War, the Watergate scandal and other historical events unfold from the perspective of an Alabama man with an IQ of 75.",
        duration: 142,
        release_date: (1994, 7, 6),
        genre: "Drama",
        rating: 8.8,
        image_url: "https://image.tmdb.org/t/p/w500/saHP97rTPS5eLmrLQEcANmKrsFl.jpg",
    },
    SampleMovie {
        title: "The Godfather",
        description: "The aging patriarch of an organized crime dynasty transfers control of his clandestine empire to his reluctant son.",
        duration: 175,
        release_date: (1972, 3, 14),
        genre: "Crime",
        rating: 9.2,
        image_url: "https://image.tmdb.org/t/p/w500/3bhkrj58Vtu7enYsRolD1fZdja1.jpg",
    },
    SampleMovie {
        title: "Interstellar",
        description: "A team of explorers travel through a wormhole in space in an attempt to ensure humanity's survival.",
        duration: 169,
        release_date: (2014, 11, 7),
        genre: "Sci-Fi",
        rating: 8.6,
        image_url: "https://image.tmdb.org/t/p/w500/gEU2QniE6E77NI6lCU6MxlNBvIx.jpg",
    },
    SampleMovie {
        title: "The Shawshank Redemption",
        description: "Two imprisoned men bond over a number of years, finding solace and eventual redemption through acts of common decency.",
        duration: 142,
        release_date: (1994, 9, 23),
        genre: "Drama",
        rating: 9.3,
        image_url: "https://image.tmdb.org/t/p/w500/q6y0Go1tsGEsmtFryDOJo3dEmqu.jpg",
    },
    SampleMovie {
        title: "Gladiator",
        description: "A former Roman General sets out to exact vengeance against the corrupt emperor who murdered his family and sent him into slavery.",
        duration: 155,
        release_date: (2000, 5, 5),
        genre: "Action",
        rating: 8.5,
        image_url: "https://image.tmdb.org/t/p/w500/ty8TGRuvJLPUmAR1H1nRIsgwvim.jpg",
    },
    SampleMovie {
        title: "Jurassic Park",
        description: "A pragmatic paleontologist visiting an almost complete theme park is tasked with protecting a couple of kids after a power failure causes the park's cloned dinosaurs to run loose.",
        duration: 127,
        release_date: (1993, 6, 11),
        genre: "Adventure",
        rating: 8.1,
        image_url: "https://image.tmdb.org/t/p/w500/oU7Oq2kFAAlGqbU4VoAE36g4hoI.jpg",
    },
    SampleMovie {
        title: "3 Idiots",
        description: "Two friends are searching for their long lost companion. They revisit their college days and recall the memories of their friend who inspired them to think differently.",
        duration: 170,
        release_date: (2009, 12, 25),
        genre: "Comedy",
        rating: 8.4,
        image_url: "https://m.media-amazon.com/images/M/MV5BNTkyOGVjMGEtNmQzZi00NzFlLTlhOWQtODYyMDc2ZGJmYzFhXkEyXkFqcGdeQXVyNjU0OTQ0OTY@._V1_.jpg",
    },
    SampleMovie {
        title: "PK",
        description: "An alien on Earth loses the only device he can use to communicate with his spaceship. His innocent nature and child-like questions force the country to evaluate the impact of religion on its people.",
        duration: 153,
        release_date: (2014, 12, 19),
        genre: "Comedy",
        rating: 8.1,
        image_url: "https://m.media-amazon.com/images/M/MV5BMTYzOTE2NjkxN15BMl5BanBnXkFtZTgwMDgzMTg0MzE@._V1_.jpg",
    },
    SampleMovie {
        title: "Dangal",
        description: "Former wrestler Mahavir Singh Phogat trains his daughters Geeta and Babita to become India's first world-class female wrestlers.",
        duration: 161,
        release_date: (2016, 12, 23),
        genre: "Drama",
        rating: 8.4,
        image_url: "https://m.media-amazon.com/images/M/MV5BMTQ4MzQzMzM2Nl5BMl5BanBnXkFtZTgwMTQ1NjY5Mg@@._V1_.jpg",
    },
    SampleMovie {
        title: "Lagaan",
        description: "The people of a small village in Victorian India stake their future on a game of cricket against their ruthless British rulers.",
        duration: 224,
        release_date: (2001, 6, 15),
        genre: "Drama",
        rating: 8.1,
        image_url: "https://m.media-amazon.com/images/M/MV5BMjRjNTY3MjUyNV5BMl5BanBnXkFtZTgwNjc4NjI2MzE@._V1_.jpg",
    },
    SampleMovie {
        title: "Andhadhun",
        description: "A series of mysterious events change the life of a blind pianist, who must now report a crime that he never actually witnessed.",
        duration: 139,
        release_date: (2018, 10, 5),
        genre: "Thriller",
        rating: 8.2,
        image_url: "https://m.media-amazon.com/images/M/MV5BZWZhMjhhZmYtOTIzZi00YTY4LTgzODctODMyMmM5N2YzZjM5XkEyXkFqcGdeQXVyNTE1NjY5Mg@@._V1_.jpg",
    },
];

const SCREENING_DAYS: i64 = 7;
const SCREENING_PRICE: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedSummary {
    pub theaters: usize,
    pub movies: usize,
    pub screenings: usize,
}

fn release_date((year, month, day): (i32, u32, u32)) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)
}

/// Evening slot for the `index`-th movie on `day`, spread over 18:00-21:00.
fn screening_time(start: NaiveDate, day: i64, index: usize) -> Option<NaiveDateTime> {
    let hour = 18 + (index % 4) as u32;
    let date = start.checked_add_signed(Duration::days(day))?;
    Some(date.and_time(NaiveTime::from_hms_opt(hour, 0, 0)?))
}

/// Inserts the sample catalog unless the database already has movies.
pub async fn seed_catalog(pool: &PgPool) -> Result<SeedSummary, sqlx::Error> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movies")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        info!(existing, "catalog already populated, skipping seed");
        return Ok(SeedSummary::default());
    }

    let mut theaters = Vec::with_capacity(THEATERS.len());
    for (name, total_seats) in THEATERS {
        theaters.push(Theater::create(pool, name, total_seats).await?);
    }

    let first_day = Utc::now().date_naive() + Duration::days(1);
    let mut summary = SeedSummary { theaters: theaters.len(), ..SeedSummary::default() };

    for (index, sample) in MOVIES.iter().enumerate() {
        let Some(release_date) = release_date(sample.release_date) else {
            continue;
        };
        let movie = Movie::create(
            pool,
            &NewMovie {
                title: sample.title.to_string(),
                description: sample.description.to_string(),
                duration: sample.duration,
                release_date,
                genre: sample.genre.to_string(),
                rating: sample.rating,
                image_url: Some(sample.image_url.to_string()),
            },
        )
        .await?;
        summary.movies += 1;

        let theater = &theaters[index % theaters.len()];
        for day in 0..SCREENING_DAYS {
            let Some(screening_time) = screening_time(first_day, day, index) else {
                continue;
            };
            Screening::create(
                pool,
                &NewScreening {
                    movie_id: movie.id,
                    theater_id: theater.id,
                    screening_time,
                    price: SCREENING_PRICE,
                    available_seats: theater.total_seats,
                },
            )
            .await?;
            summary.screenings += 1;
        }
    }

    info!(
        theaters = summary.theaters,
        movies = summary.movies,
        screenings = summary.screenings,
        "sample catalog seeded"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_release_dates_are_valid() {
        for sample in &MOVIES {
            assert!(release_date(sample.release_date).is_some(), "{}", sample.title);
        }
    }

    #[test]
    fn screenings_fall_in_the_evening() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let slot = screening_time(start, 2, 5).unwrap();
        assert_eq!(slot.date(), NaiveDate::from_ymd_opt(2025, 1, 3).unwrap());
        assert_eq!(slot.time(), NaiveTime::from_hms_opt(19, 0, 0).unwrap());
        for index in 0..MOVIES.len() {
            let hour = screening_time(start, 0, index).unwrap().time().format("%H").to_string();
            assert!(("18".."22").contains(&hour.as_str()), "{hour}");
        }
    }
}
