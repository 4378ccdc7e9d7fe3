mod collection;
mod engine;
mod error;

pub use collection::{take_ordered, Collection};
pub use engine::{Data, Engine, Key};
pub use error::{Error, ParseError, Result};

pub fn init_logger() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init()
}
