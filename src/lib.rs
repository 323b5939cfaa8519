pub mod analytics;
pub mod billing;
pub mod core;
pub mod finance;
pub mod franchise;
pub mod geography;
pub mod inventory;
pub mod invoicing;
pub mod main_module;
pub mod maintenance;
pub mod security;
pub mod stations;
pub mod subscriptions;
