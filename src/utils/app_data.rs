use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

const APP_NAME: &str = "lexi";

/// Get the application data directory
pub fn get_app_data_dir() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir().map(|h| h.join("Library").join("Application Support"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
    } else {
        // Linux/Unix: use XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };

    let base = base.context("Could not determine app data directory")?;
    let app_dir = base.join(APP_NAME);

    fs::create_dir_all(&app_dir)?;
    Ok(app_dir)
}

/// Get the default directory holding the dictionary store/index pair
pub fn get_dictionary_dir() -> Result<PathBuf> {
    let dir = get_app_data_dir()?.join("dictionary");
    fs::create_dir_all(&dir)?;
    Ok(dir)
}
