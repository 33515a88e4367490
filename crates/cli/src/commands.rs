use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Poll the stream on a fixed interval until interrupted
    Run {
        #[arg(long, help = "Config file path")]
        config: String,

        #[arg(long, help = "Optional .env file with KINESIS_BRIDGE_* overrides")]
        env_file: Option<String>,

        #[arg(
            long,
            help = "Keep cursors in memory and log events instead of sending them"
        )]
        dry_run: bool,
    },
    /// Run a single cycle, wait for every shard and print the outcomes
    PollOnce {
        #[arg(long, help = "Config file path")]
        config: String,

        #[arg(long, help = "Optional .env file with KINESIS_BRIDGE_* overrides")]
        env_file: Option<String>,

        #[arg(
            long,
            help = "Keep cursors in memory and log events instead of sending them"
        )]
        dry_run: bool,
    },
    /// Print the persisted cursor of a shard
    Cursor {
        #[arg(long, help = "Config file path")]
        config: String,

        #[arg(long, help = "Shard ID, e.g. shardId-000000000000")]
        shard: String,
    },
    /// Apply a mapping to a JSON payload file and print the resulting event
    Map {
        #[arg(long, help = "Dotted path to the event name")]
        event_key: String,

        #[arg(long, default_value = "", help = "Comma-separated source:destination pairs")]
        mappings: String,

        #[arg(long, help = "Path to a JSON record payload")]
        payload: String,
    },
}
