//! HTTP clients for the third-party services this backend brokers.

pub mod fcm;
pub mod identity;
pub mod zoom;
