pub mod apperror;
pub mod config;
pub mod form;
pub mod kinds;
pub mod models;
