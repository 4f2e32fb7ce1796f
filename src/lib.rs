pub mod application;
pub mod cli;
pub mod client;
pub mod domain;
pub mod io;

pub use domain::*;
