use crate::output::print_json;
use clap::Subcommand;
use hookswitch_core::TargetConfig;
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective configuration
    Show,
    /// Write a config file with the default values (won't overwrite)
    Init,
    /// Print the config file path
    Path,
}

pub fn run(
    config: &TargetConfig,
    config_path: &Path,
    subcommand: ConfigSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    match subcommand {
        ConfigSubcommand::Show => {
            if json {
                print_json(config)
            } else {
                print!("{}", serde_yaml::to_string(config)?);
                Ok(())
            }
        }
        ConfigSubcommand::Init => {
            if config_path.exists() {
                println!("config already exists: {}", config_path.display());
                return Ok(());
            }
            config.save(config_path)?;
            println!("wrote {}", config_path.display());
            Ok(())
        }
        ConfigSubcommand::Path => {
            println!("{}", config_path.display());
            Ok(())
        }
    }
}
