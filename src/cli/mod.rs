use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "habitrack", about = "Habit streak & task tracking backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP API until interrupted
    Serve,
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    Status,
    Habit {
        #[command(subcommand)]
        command: HabitCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}

#[derive(Debug, Subcommand)]
pub enum HabitCommands {
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value = "daily")]
        frequency: String,
    },
    List,
    Checkin {
        id: i64,
        /// Check-in date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    Stats {
        id: i64,
    },
    Logs {
        id: i64,
        #[arg(long)]
        days: Option<u32>,
    },
    Remove {
        id: i64,
    },
}
