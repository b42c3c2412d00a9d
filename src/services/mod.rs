pub mod auth;
pub mod booking;
pub mod inventory;
pub mod payment;
pub mod webhook;
