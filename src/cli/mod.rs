pub mod breakdown;
pub mod expenses;
pub mod setup;
pub mod ui;
pub mod users;
