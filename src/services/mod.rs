//! Services
//!
//! Operations shared by the web server and the command-line tools.

pub mod days;
pub mod reports;
