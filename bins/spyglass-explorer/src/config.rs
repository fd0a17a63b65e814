use std::path::PathBuf;

use anyhow::Result;

pub struct Config {
    pub bind_addr: String,
    /// Directory holding the user and miner registries.
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let data_dir = match std::env::var("EXPLORER_DATA_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("spyglass"),
        };
        Ok(Self {
            bind_addr: std::env::var("EXPLORER_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into()),
            data_dir,
        })
    }
}
