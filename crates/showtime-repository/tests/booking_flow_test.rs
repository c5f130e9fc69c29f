//! Integration tests for the MySQL repositories.
//!
//! These run against a real MySQL server started with testcontainers and
//! need Docker; run them with `cargo test -- --ignored`.

mod common;

use chrono::{Duration, NaiveDate, Utc};
use common::TestDatabase;
use showtime_core::{Booking, Movie, MovieId, Show, User, UserId};
use showtime_repository::{
    BookingRepository, MovieRepository, MySqlBookingRepository, MySqlMovieRepository,
    MySqlShowRepository, MySqlUserRepository, ShowRepository, UserRepository,
};

fn movie(id: &str) -> Movie {
    Movie {
        id: MovieId::new(id),
        title: "Arrival".to_string(),
        overview: "Linguist meets heptapods.".to_string(),
        poster_path: "/poster.jpg".to_string(),
        backdrop_path: "/backdrop.jpg".to_string(),
        release_date: NaiveDate::from_ymd_opt(2016, 11, 11).unwrap(),
        original_language: Some("en".to_string()),
        tagline: None,
        genres: Vec::new(),
        casts: Vec::new(),
        vote_average: 7.6,
        runtime: 116,
        created_at: Utc::now(),
    }
}

fn seats(labels: &[&str]) -> Vec<String> {
    labels.iter().map(ToString::to_string).collect()
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_user_create_update_delete() {
    let db = TestDatabase::new().await;
    let repo = MySqlUserRepository::new(db.pool());

    let mut user = User::new(UserId::new("user_1"), "Ada", "ada@example.com", "img");
    repo.create(&user).await.expect("create");
    assert!(repo.create(&user).await.is_err());

    user.apply_profile("Ada L".into(), "ada@example.com".into(), "img2".into());
    assert!(repo.update(&user).await.expect("update"));

    let found = repo.find_by_id(&user.id).await.expect("find").expect("exists");
    assert_eq!(found.name, "Ada L");

    assert!(repo.delete(&user.id).await.expect("delete"));
    assert!(!repo.delete(&user.id).await.expect("delete again"));
    assert!(repo.find_by_id(&user.id).await.expect("find").is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_stale_seat_write_is_rejected() {
    let db = TestDatabase::new().await;
    let movies = MySqlMovieRepository::new(db.pool());
    let shows = MySqlShowRepository::new(db.pool());

    movies.save(&movie("329865")).await.expect("save movie");
    let show = Show::new(MovieId::new("329865"), Utc::now() + Duration::hours(2), 1200);
    shows.create_many(std::slice::from_ref(&show)).await.expect("create show");

    let mut first = shows.find_by_id(show.id).await.unwrap().unwrap();
    let mut second = first.clone();

    first.claim_seats(&seats(&["A1"]), &UserId::new("U1")).unwrap();
    assert!(shows.update_seats(&first).await.expect("first write"));

    second.claim_seats(&seats(&["A1"]), &UserId::new("U2")).unwrap();
    assert!(!shows.update_seats(&second).await.expect("stale write"));

    let stored = shows.find_by_id(show.id).await.unwrap().unwrap();
    assert_eq!(stored.occupied_seats.get("A1"), Some(&UserId::new("U1")));
    assert_eq!(stored.version, first.version + 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_bookings_listed_newest_first() {
    let db = TestDatabase::new().await;
    let movies = MySqlMovieRepository::new(db.pool());
    let shows = MySqlShowRepository::new(db.pool());
    let bookings = MySqlBookingRepository::new(db.pool());

    movies.save(&movie("329865")).await.unwrap();
    let show = Show::new(MovieId::new("329865"), Utc::now() + Duration::hours(2), 1200);
    shows.create_many(std::slice::from_ref(&show)).await.unwrap();

    let user = UserId::new("U1");
    let mut older = Booking::new(user.clone(), show.id, 1200, seats(&["A1"]));
    older.created_at -= Duration::minutes(5);
    let newer = Booking::new(user.clone(), show.id, 2400, seats(&["B1", "B2"]));
    bookings.create(&older).await.unwrap();
    bookings.create(&newer).await.unwrap();

    let listed = bookings.find_by_user(&user).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, newer.id);

    let mut paid = newer.clone();
    paid.mark_paid();
    assert!(bookings.update_payment(&paid).await.unwrap());
    assert!(bookings.find_by_id(newer.id).await.unwrap().unwrap().is_paid);
    // Payment and the unpaid-only delete are conditional on `is_paid`.
    assert!(!bookings.update_payment(&paid).await.unwrap());
    assert!(!bookings.delete_unpaid(newer.id).await.unwrap());
    assert!(bookings.find_by_id(newer.id).await.unwrap().is_some());

    assert!(bookings.delete_unpaid(older.id).await.unwrap());
    assert!(bookings.find_by_id(older.id).await.unwrap().is_none());
    assert!(!bookings.delete(older.id).await.unwrap());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_find_starting_between_bounds_window() {
    let db = TestDatabase::new().await;
    let movies = MySqlMovieRepository::new(db.pool());
    let shows = MySqlShowRepository::new(db.pool());

    movies.save(&movie("329865")).await.unwrap();
    let now = Utc::now();
    let soon = Show::new(MovieId::new("329865"), now + Duration::hours(3), 1200);
    let later = Show::new(MovieId::new("329865"), now + Duration::hours(12), 1200);
    shows.create_many(&[soon.clone(), later]).await.unwrap();

    let found = shows
        .find_starting_between(now, now + Duration::hours(8))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, soon.id);

    // The upper bound is exclusive.
    let stored = shows.find_by_id(soon.id).await.unwrap().unwrap();
    let found = shows
        .find_starting_between(now, stored.show_date_time)
        .await
        .unwrap();
    assert!(found.is_empty());
}
