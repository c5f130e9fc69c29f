//! Verification of Clerk session tokens and Svix-signed webhooks.

mod session;
mod webhook;

pub use session::*;
pub use webhook::*;
