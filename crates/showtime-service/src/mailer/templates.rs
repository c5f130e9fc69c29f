//! Email subjects and HTML bodies.

use chrono::{DateTime, Utc};
use showtime_core::{Booking, Movie, Show, User};

/// A rendered email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailContent {
    pub subject: String,
    pub html: String,
}

/// Formats an amount in minor units, e.g. `2450` as `$24.50`.
#[must_use]
pub fn format_amount(minor: i64, currency: &str) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let minor = minor.unsigned_abs();
    format!("{sign}{currency}{}.{:02}", minor / 100, minor % 100)
}

fn format_time(at: DateTime<Utc>) -> String {
    at.format("%A, %B %-d %Y at %H:%M UTC").to_string()
}

#[must_use]
pub fn booking_confirmation(
    user: &User,
    booking: &Booking,
    show: &Show,
    movie: &Movie,
    currency: &str,
) -> EmailContent {
    EmailContent {
        subject: format!("Payment Confirmation: \"{}\" booked!", movie.title),
        html: format!(
            r#"<div style="font-family: Arial, sans-serif; line-height: 1.5;">
  <h2>Hi {name},</h2>
  <p>Your booking for <strong style="color: #F84565;">"{title}"</strong> is confirmed.</p>
  <p>
    <strong>Date:</strong> {when}<br/>
    <strong>Seats:</strong> {seats}<br/>
    <strong>Amount:</strong> {amount}
  </p>
  <p>Enjoy the show!</p>
  <p>Thanks for booking with us!<br/>Showtime Team</p>
</div>"#,
            name = user.name,
            title = movie.title,
            when = format_time(show.show_date_time),
            seats = booking.booked_seats.join(", "),
            amount = format_amount(booking.amount, currency),
        ),
    }
}

#[must_use]
pub fn new_show(user: &User, movie_title: &str) -> EmailContent {
    EmailContent {
        subject: format!("New Show Added: {movie_title}"),
        html: format!(
            r#"<div style="font-family: Arial, sans-serif; padding: 20px;">
  <h2>Hi {name},</h2>
  <p>We've just added a new show to our library:</p>
  <h3 style="color: #F84565;">"{movie_title}"</h3>
  <p>Book your seats before they are gone.</p>
  <br/>
  <p>Thanks,<br/>Showtime Team</p>
</div>"#,
            name = user.name,
        ),
    }
}

#[must_use]
pub fn show_reminder(user: &User, movie_title: &str, show: &Show) -> EmailContent {
    EmailContent {
        subject: format!("Reminder: Your movie \"{movie_title}\" starts soon!"),
        html: format!(
            r#"<div style="font-family: Arial, sans-serif; padding: 20px;">
  <h2>Hello {name},</h2>
  <p>This is a quick reminder that your movie:</p>
  <h3 style="color: #F84565;">"{movie_title}"</h3>
  <p>is scheduled for <strong>{when}</strong>.</p>
  <p>Be there a few minutes early to find your seats.</p>
  <br/>
  <p>Enjoy the show!<br/>Showtime Team</p>
</div>"#,
            name = user.name,
            when = format_time(show.show_date_time),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use showtime_core::{MovieId, UserId};

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(2450, "$"), "$24.50");
        assert_eq!(format_amount(5, "$"), "$0.05");
        assert_eq!(format_amount(-120, "€"), "-€1.20");
    }

    #[test]
    fn test_reminder_mentions_movie_and_time() {
        let user = User::new(UserId::new("U1"), "Ada", "ada@example.com", "");
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 19, 30, 0).unwrap();
        let show = Show::new(MovieId::new("550"), at, 1200);

        let email = show_reminder(&user, "Fight Club", &show);
        assert!(email.subject.contains("Fight Club"));
        assert!(email.html.contains("Hello Ada"));
        assert!(email.html.contains("19:30"));
    }
}
