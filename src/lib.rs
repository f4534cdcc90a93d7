//! bptrack library
//!
//! Home blood pressure and medication log: spreadsheet import, a day
//! editor API and a static HTML analysis report.

pub mod build_info;
pub mod config;
pub mod db;
pub mod import;
pub mod models;
pub mod services;
pub mod web;
