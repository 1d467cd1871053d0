pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli_args::{CliConfig, Command, TripArgs};

#[cfg(feature = "cli")]
mod cli_args {
    use super::toml_config::TomlConfig;
    use crate::core::crowding::CrowdingContext;
    use chrono::NaiveTime;
    use clap::{Args, Parser, Subcommand};

    #[derive(Debug, Clone, Parser)]
    #[command(name = "commute-advisor", version)]
    #[command(about = "Personalized commuting advice from behavioral profiles and simulated crowding")]
    pub struct CliConfig {
        /// Path to a TOML configuration file (default: ./commute-advisor.toml if present)
        #[arg(long, global = true)]
        pub config: Option<String>,

        /// Override the commuter dataset path
        #[arg(long, global = true)]
        pub data: Option<String>,

        /// Enable verbose output
        #[arg(short, long, global = true)]
        pub verbose: bool,

        /// Emit logs as JSON lines
        #[arg(long, global = true)]
        pub log_json: bool,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum Command {
        /// List the commuter IDs in the dataset
        Profiles,
        /// Show one commuter profile
        Show { id: String },
        /// Run the crowding simulation and print its insights
        Simulate {
            #[command(flatten)]
            trip: TripArgs,
            #[arg(long)]
            capacity: Option<u32>,
            #[arg(long)]
            agents: Option<u32>,
            #[arg(long)]
            seed: Option<u64>,
        },
        /// Print personalized recommendations without calling the language model
        Advise {
            id: String,
            #[command(flatten)]
            trip: TripArgs,
        },
        /// Chat with the assistant, optionally starting with a profile loaded
        Chat {
            id: Option<String>,
            #[command(flatten)]
            trip: TripArgs,
        },
    }

    #[derive(Debug, Clone, Default, Args)]
    pub struct TripArgs {
        /// Route name, used to pick a route-specific capacity
        #[arg(long)]
        pub route: Option<String>,

        /// Departure time as HH:MM
        #[arg(long, value_parser = parse_time)]
        pub time: Option<NaiveTime>,
    }

    impl TripArgs {
        pub fn context(&self) -> CrowdingContext {
            CrowdingContext {
                route: self.route.clone(),
                time_of_day: self.time,
            }
        }
    }

    fn parse_time(value: &str) -> Result<NaiveTime, String> {
        NaiveTime::parse_from_str(value, "%H:%M")
            .map_err(|e| format!("expected HH:MM, got '{}' ({})", value, e))
    }

    impl CliConfig {
        /// Command-line flags win over the file.
        pub fn apply_overrides(&self, config: &mut TomlConfig) {
            if let Some(data) = &self.data {
                config.dataset.path = data.clone();
            }
            if let Command::Simulate {
                capacity,
                agents,
                seed,
                ..
            } = &self.command
            {
                if let Some(capacity) = capacity {
                    config.simulation.capacity = *capacity;
                }
                if let Some(agents) = agents {
                    config.simulation.agents = *agents;
                }
                if let Some(seed) = seed {
                    config.simulation.seed = *seed;
                }
            }
        }
    }

}
