pub mod config;
pub mod contract;
pub mod error;
pub mod feature;
pub mod identifier;
pub mod io;
pub mod materialize;
pub mod paths;
pub mod resolver;
pub mod strategy;
pub mod templates;
pub mod ticket;
pub mod vcs;

pub use error::{ErrorKind, Result, SpecflowError};
