use crate::{ExtractError, Result, config::Config, output};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
pub struct ConfigInfo {
    pub path: PathBuf,
    pub exists: bool,
    pub project_path: PathBuf,
    pub project_exists: bool,
}

#[derive(Debug, Serialize)]
pub struct ConfigShowResult {
    pub config: Config,
}

impl output::OutputFormatter for ConfigInfo {
    fn format_text(&self) -> String {
        use crate::output::text;
        format!(
            "{}\n{}\n{}\n{}",
            text::key_value("Config Path", &self.path.display().to_string()),
            text::key_value("Exists", &self.exists.to_string()),
            text::key_value("Project Config", &self.project_path.display().to_string()),
            text::key_value("Project Exists", &self.project_exists.to_string())
        )
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

impl output::OutputFormatter for ConfigShowResult {
    fn format_text(&self) -> String {
        self.config.show_masked()
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(&self.config, pretty)
    }
}

pub fn handle_config_init() -> Result<ConfigInfo> {
    let config_path = crate::config::default_config_path()?;
    init_at(config_path)
}

fn init_at(config_path: PathBuf) -> Result<ConfigInfo> {
    let config_dir = config_path
        .parent()
        .ok_or_else(|| ExtractError::ConfigError("Invalid config path".into()))?;

    std::fs::create_dir_all(config_dir)?;

    if config_path.exists() {
        return Err(ExtractError::ConfigError(format!(
            "Config file already exists at {}",
            config_path.display()
        )));
    }

    let toml_content = toml::to_string_pretty(&Config::default())?;
    std::fs::write(&config_path, toml_content)?;

    let project_path = PathBuf::from(crate::config::PROJECT_CONFIG_FILE);
    Ok(ConfigInfo {
        path: config_path,
        exists: true,
        project_exists: project_path.exists(),
        project_path,
    })
}

pub fn handle_config_show(config: &Config) -> ConfigShowResult {
    ConfigShowResult {
        config: config.clone(),
    }
}

pub fn handle_config_path() -> Result<ConfigInfo> {
    let config_path = crate::config::default_config_path()?;
    let project_path = PathBuf::from(crate::config::PROJECT_CONFIG_FILE);

    Ok(ConfigInfo {
        exists: config_path.exists(),
        path: config_path,
        project_exists: project_path.exists(),
        project_path,
    })
}
