use anyhow::anyhow;
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::common::Scoring;
use crate::generator::{GeneratorConfig, GridType};
use crate::solver::SearchOptions;

#[derive(Parser, Debug)]
#[command(
    name = "Shutdown Grid",
    about = "Maximum coins per trajectory length in gridworlds with shutdown-delay buttons.",
    version = "1.0"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a YAML config file")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute the maximum coins for every trajectory length of a grid.
    Solve(SolveArgs),
    /// Generate random gridworlds.
    Generate(GenerateArgs),
}

#[derive(Args, Debug, Default)]
pub struct SolveArgs {
    #[arg(long, help = "Path to the grid file")]
    pub grid_path: Option<String>,

    #[arg(long, help = "Largest trajectory length to analyse [default: the file's episode length]")]
    pub max_length: Option<usize>,

    #[arg(long, value_enum, help = "How collected coins are tallied")]
    pub scoring: Option<Scoring>,

    #[arg(long, help = "Stop each search after this many expanded nodes")]
    pub max_expansions: Option<usize>,

    #[arg(long, help = "Path to the output file (.yaml or .json)")]
    pub output_path: Option<String>,

    #[arg(long, help = "Log the best trajectory for each length", default_value_t = false)]
    pub show_paths: bool,
}

#[derive(Args, Debug, Default)]
pub struct GenerateArgs {
    #[arg(short, long, help = "Number of grids")]
    pub number: Option<usize>,

    #[arg(long, help = "Grid rows")]
    pub rows: Option<usize>,

    #[arg(long, help = "Grid columns")]
    pub cols: Option<usize>,

    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], help = "Coins per grid")]
    pub coins: Option<Vec<usize>>,

    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], help = "Buttons per grid")]
    pub buttons: Option<Vec<usize>>,

    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], help = "Button delay")]
    pub delay: Option<Vec<usize>>,

    #[arg(short = 't', long, value_enum, help = "Wall density")]
    pub grid_type: Option<GridType>,

    #[arg(short = 'r', long, help = "Seed for the random number generator")]
    pub seed: Option<u64>,

    #[arg(long, help = "Directory receiving the generated grids")]
    pub output_dir: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub grid_path: String,
    pub max_length: Option<usize>,
    pub scoring: Scoring,
    pub max_expansions: Option<usize>,
    pub output_path: Option<String>,
    pub show_paths: bool,
    pub generator: GeneratorConfig,
    pub output_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            grid_path: "grid_file/test/7x7.txt".to_string(),
            max_length: None,
            scoring: Scoring::CoinCount,
            max_expansions: None,
            output_path: None,
            show_paths: false,
            generator: GeneratorConfig::default(),
            output_dir: "generated_grids".to_string(),
        }
    }
}

fn range(values: &[usize]) -> (usize, usize) {
    (values[0], values[1])
}

impl Config {
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Flags given on the command line win over the config file.
    pub fn override_from_command_line(mut self, cli: &Cli) -> anyhow::Result<Self> {
        match &cli.command {
            Command::Solve(args) => {
                if let Some(grid_path) = &args.grid_path {
                    self.grid_path = grid_path.clone();
                }
                if args.max_length.is_some() {
                    self.max_length = args.max_length;
                }
                if let Some(scoring) = args.scoring {
                    self.scoring = scoring;
                }
                if args.max_expansions.is_some() {
                    self.max_expansions = args.max_expansions;
                }
                if args.output_path.is_some() {
                    self.output_path = args.output_path.clone();
                }
                self.show_paths |= args.show_paths;
            }
            Command::Generate(args) => {
                let generator = &mut self.generator;
                if let Some(number) = args.number {
                    generator.number = number;
                }
                if let Some(rows) = args.rows {
                    generator.rows = rows;
                }
                if let Some(cols) = args.cols {
                    generator.cols = cols;
                }
                if let Some(coins) = &args.coins {
                    generator.coins = range(coins);
                }
                if let Some(buttons) = &args.buttons {
                    generator.buttons = range(buttons);
                }
                if let Some(delay) = &args.delay {
                    generator.delay = range(delay);
                }
                if let Some(grid_type) = args.grid_type {
                    generator.grid_type = grid_type;
                }
                if let Some(seed) = args.seed {
                    generator.seed = seed;
                }
                if let Some(output_dir) = &args.output_dir {
                    self.output_dir = output_dir.clone();
                }
            }
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_expansions == Some(0) {
            return Err(anyhow!("max expansions must be at least 1"));
        }
        if let Some(output_path) = &self.output_path {
            if output_path.is_empty() {
                return Err(anyhow!("output path must not be empty"));
            }
        }
        self.generator.validate()
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            scoring: self.scoring,
            max_expansions: self.max_expansions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_then_command_line() {
        let yaml = "
grid_path: grids/a.txt
max_length: 9
scoring: coin_value
generator:
  rows: 7
  seed: 3
";
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.grid_path, "grids/a.txt");
        assert_eq!(config.max_length, Some(9));
        assert_eq!(config.scoring, Scoring::CoinValue);
        assert_eq!(config.generator.rows, 7);
        assert_eq!(config.generator.cols, 5);

        let cli = Cli::parse_from(["shutdown_grid", "solve", "--max-length", "4"]);
        let config = config.override_from_command_line(&cli).unwrap();
        assert_eq!(config.grid_path, "grids/a.txt");
        assert_eq!(config.max_length, Some(4));
        assert_eq!(config.search_options().scoring, Scoring::CoinValue);
    }

    #[test]
    fn test_generate_flags() {
        let cli = Cli::parse_from([
            "shutdown_grid",
            "generate",
            "-n",
            "3",
            "--coins",
            "2",
            "5",
            "-t",
            "hard",
            "--seed",
            "10",
        ]);
        let config = Config::default().override_from_command_line(&cli).unwrap();
        assert_eq!(config.generator.number, 3);
        assert_eq!(config.generator.coins, (2, 5));
        assert_eq!(config.generator.grid_type, GridType::Hard);
        assert_eq!(config.generator.seed, 10);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cli = Cli::parse_from(["shutdown_grid", "solve", "--max-expansions", "0"]);
        assert!(Config::default().override_from_command_line(&cli).is_err());

        let cli = Cli::parse_from(["shutdown_grid", "generate", "--delay", "6", "2"]);
        assert!(Config::default().override_from_command_line(&cli).is_err());
    }

    #[test]
    fn test_unknown_yaml_field_type() {
        assert!(Config::from_yaml_str("max_length: many").is_err());
    }
}
