pub mod cliopt;
pub mod credentials;
pub mod error;
pub mod fetch;
pub mod model;
pub mod output;
pub mod runner;
pub mod service;
pub mod utils;
