pub mod ads;
pub mod analytics;
pub mod auth;
pub mod bank;
pub mod commission;
pub mod dashboard;
pub mod expenses;
pub mod export;
pub mod notification;
pub mod reconcile;
pub mod returns;
pub mod sales;
pub mod wallet;
