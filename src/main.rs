use shutdown_grid::config::{Cli, Command, Config};
use shutdown_grid::generator::{generate_grids, write_grids};
use shutdown_grid::pipeline::calculate_m;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let config = if let Some(config_file) = cli.config.as_ref() {
        let config_str = std::fs::read_to_string(config_file)
            .with_context(|| format!("cannot read config file: {config_file}"))?;
        Config::from_yaml_str(&config_str)
            .with_context(|| format!("error with config file: {config_file}"))?
    } else {
        info!("No config file specified, using default config");
        Config::default()
    }
    .override_from_command_line(&cli)?;

    match cli.command {
        Command::Solve(_) => {
            let table = calculate_m(&config.grid_path, config.max_length, config.search_options())?;
            table.print(config.show_paths);
            if let Some(output_path) = &config.output_path {
                table.write_to_file(output_path)?;
                info!("Results written to {output_path}");
            }
        }
        Command::Generate(_) => {
            let grids = generate_grids(&config.generator)?;
            write_grids(&config.generator, &grids, &config.output_dir)?;
        }
    }

    Ok(())
}
