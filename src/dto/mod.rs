pub mod auth;
pub mod cart;
pub mod catalog;
pub mod items;
pub mod notifications;
pub mod payments;
pub mod reviews;
