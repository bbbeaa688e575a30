//! Gator Intake: client onboarding service.
//!
//! A prospective client fills in the intake form, answers a short scripted
//! chat, reviews the result and downloads a PDF project brief. Copies of the
//! data go to a record store and a spreadsheet along the way.

pub mod admin;
pub mod brief;
pub mod config;
pub mod conversation;
pub mod error;
pub mod intake;
pub mod server;
pub mod session;
pub mod sinks;
