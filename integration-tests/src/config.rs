use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

/// Live environment settings, read from `secrets.json` in the working directory.
#[derive(Debug, Deserialize)]
pub struct Secrets {
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
    pub dataverse_url: String,
    /// Logical-name prefix of the entities under test.
    pub prefix: String,
    /// Display name of an entity that has at least one lookup column.
    pub sample_entity: String,
}

impl Secrets {
    pub fn scope(&self) -> String {
        format!("{}/.default", self.dataverse_url.trim_end_matches('/'))
    }
}

pub fn load_secrets() -> Result<Secrets, String> {
    let mut path = std::env::current_dir().map_err(|e| e.to_string())?;
    path.push("secrets.json");
    read_secrets(&path)
}

fn read_secrets(path: &PathBuf) -> Result<Secrets, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read secrets.json: {e}"))?;
    serde_json::from_str(&contents).map_err(|e| format!("Invalid secrets.json: {e}"))
}
