//! Configuration command handlers

use crate::cli::{ConfigAction, ConfigArgs, ConfigFormat, ConfigInitArgs};
use crate::config::Config;
use crate::error::{Error, ErrorContext, Result};
use crate::output::OutputWriter;
use std::path::PathBuf;
use tracing::info;

/// Handle the config command
pub async fn handle_config(args: ConfigArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    match args.action {
        ConfigAction::Init(init_args) => handle_init(init_args, output),
        ConfigAction::Show(show_args) => {
            let rendered = render(config, show_args.format)?;
            output.write(&rendered)
        }
        ConfigAction::Path => {
            let user = Config::user_config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(no config directory on this platform)".to_string());
            let project = Config::find_project_config()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(none)".to_string());
            output.writeln(&format!("user:    {}", user))?;
            output.writeln(&format!("project: {}", project))
        }
    }
}

fn handle_init(args: ConfigInitArgs, output: &mut OutputWriter) -> Result<()> {
    let path = init_path(args.user)?;
    if path.exists() && !args.force {
        return Err(Error::config(format!(
            "{} already exists; use --force to overwrite it",
            path.display()
        )));
    }

    Config::default()
        .save(&path)
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "Wrote configuration");
    output.success(&format!("✓ Created {}", path.display()))
}

fn init_path(user: bool) -> Result<PathBuf> {
    if user {
        Config::user_config_path()
            .ok_or_else(|| Error::config("no user config directory on this platform"))
    } else {
        Ok(PathBuf::from(".cloudshift.yaml"))
    }
}

/// Effective configuration in the requested format
fn render(config: &Config, format: ConfigFormat) -> Result<String> {
    let extension = match format {
        ConfigFormat::Yaml => "yaml",
        ConfigFormat::Json => "json",
        ConfigFormat::Toml => "toml",
    };
    let mut rendered = config.to_string_for(&PathBuf::from(format!("config.{}", extension)))?;
    if !rendered.ends_with('\n') {
        rendered.push('\n');
    }
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_formats() {
        let mut config = Config::default();
        config.defaults.target = Some("azure".to_string());

        let yaml = render(&config, ConfigFormat::Yaml).unwrap();
        assert!(yaml.contains("target: azure"));

        let json = render(&config, ConfigFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["engine"]["max_concurrent_files"], 4);

        let toml = render(&config, ConfigFormat::Toml).unwrap();
        assert!(toml.contains("[defaults]"));
        assert!(toml.ends_with('\n'));
    }

    #[test]
    fn test_project_init_path() {
        assert_eq!(init_path(false).unwrap(), PathBuf::from(".cloudshift.yaml"));
    }
}
