pub mod config;
pub mod dashboard;
pub mod db;
pub mod domain;
pub mod error;
pub mod import;
pub mod ledger;
pub mod month;
pub mod prepaid;
pub mod report;
pub mod web;
