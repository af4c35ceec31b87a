use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Records live only as long as the process.
    Memory,
    /// Records are kept in a sled database.
    Sled,
}

#[derive(Parser, Debug)]
#[command(name = "filmorate", version, about = "Films, friends and likes over HTTP")]
pub struct Config {
    /// Address the HTTP server listens on
    #[arg(long, env = "FILMORATE_BIND", default_value = "127.0.0.1:8080")]
    pub bind: String,

    /// Storage backend
    #[arg(long, env = "FILMORATE_STORAGE", value_enum, default_value_t = Backend::Memory)]
    pub storage: Backend,

    /// Directory of the sled database; a temporary one is used when unset
    #[arg(long, env = "FILMORATE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

impl Config {
    pub fn open_sled(&self) -> sled::Result<sled::Db> {
        match &self.data_dir {
            Some(path) => sled::Config::new().path(path).open(),
            None => sled::Config::new().temporary(true).open(),
        }
    }
}
