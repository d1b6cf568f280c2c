pub mod blob;
pub mod cli;
pub mod clipboard;
pub mod config;
pub mod db;
pub mod error;
pub mod imdb;
pub mod utils;
pub mod vision;

pub use config::{DataDir, Opts, Settings, SubCommand};
pub use error::{Error, Result};
pub use imdb::{ImageDB, ImageDBBuilder};
