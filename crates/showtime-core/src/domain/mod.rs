//! Domain entities persisted by the booking backend.

mod booking;
mod movie;
mod show;
mod user;

pub use booking::*;
pub use movie::*;
pub use show::*;
pub use user::*;
