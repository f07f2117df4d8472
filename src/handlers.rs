pub mod auth;
pub mod health;
pub mod readings;
pub mod users;
pub mod weather;
