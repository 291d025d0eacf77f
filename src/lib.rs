pub mod app;
pub mod archive;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod inspire;
pub mod output;
pub mod parcel;
pub mod price_paid;
pub mod record;
pub mod retry;
pub mod staging;
pub mod store;
