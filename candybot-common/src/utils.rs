pub mod requests;
pub mod schedule;
