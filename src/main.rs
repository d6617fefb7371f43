mod api;
mod cli;
mod config;
mod db;
mod error;
mod streak;

use crate::cli::{Cli, Commands, ConfigCommands, HabitCommands};
use crate::config::Config;
use crate::db::habits::NewHabit;
use crate::db::{Database, Frequency, Table, parse_date};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            let config = load_or_default_config()?;
            run_service(config).await
        }
        Commands::Config { command } => handle_config_command(command),
        Commands::Status => handle_status(),
        Commands::Habit { command } => handle_habit_command(command),
    }
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config()?;
            config.set_value(&key, &value)?;
            config.ensure_bootstrap_files()?;
            config.save()?;

            println!("Config saved: {key} = {value}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = load_or_default_config()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_status() -> Result<()> {
    let config = load_or_default_config()?;
    let database = Database::open(&config.db_path)?;

    println!("Habitrack status");
    println!("- db_path: {}", config.db_path.display());
    println!("- api_port: {}", config.api_port);
    println!("- habits: {}", database.count_rows(Table::Habits)?);
    println!("- habit_logs: {}", database.count_rows(Table::HabitLogs)?);
    println!("- tasks: {}", database.count_rows(Table::Tasks)?);

    Ok(())
}

fn handle_habit_command(command: HabitCommands) -> Result<()> {
    let config = load_or_default_config()?;
    let mut database = Database::open(&config.db_path)?;

    match command {
        HabitCommands::Add {
            name,
            description,
            frequency,
        } => {
            let frequency = frequency.parse::<Frequency>()?;
            let habit = database.insert_habit(&NewHabit::new(&name, description, frequency)?)?;
            println!("Habit created: #{} {} ({})", habit.id, habit.name, habit.frequency);
        }
        HabitCommands::List => {
            let habits = database.list_habits()?;
            if habits.is_empty() {
                println!("No habits yet. Add one with `habitrack habit add <name>`.");
            }
            for habit in habits {
                let completions = database.count_entries(habit.id, Some(true))?;
                println!(
                    "#{} {} [{}] streak={} completions={} last_checkin={}",
                    habit.id,
                    habit.name,
                    habit.frequency,
                    habit.streak,
                    completions,
                    habit
                        .last_checkin
                        .map(|date| date.to_string())
                        .unwrap_or_else(|| "none".to_string())
                );
            }
        }
        HabitCommands::Checkin { id, date } => {
            let date = parse_optional_date(date)?;
            let habit = database.checkin(id, date)?;
            println!("Checked in #{} on {date}: streak={}", habit.id, habit.streak);
        }
        HabitCommands::Stats { id } => {
            let stats = database.habit_stats(id, today(), config.stats_window_days)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&stats).context("Failed to serialize stats")?
            );
        }
        HabitCommands::Logs { id, days } => {
            let days = days.unwrap_or(config.logs_default_days);
            let logs = database.habit_logs(id, today(), days)?;
            println!("{} check-in(s) in the last {days} day(s)", logs.len());
            for log in logs {
                println!("- {}", log.date);
            }
        }
        HabitCommands::Remove { id } => {
            let removed_logs = database.delete_habit(id)?;
            println!("Habit #{id} deleted ({removed_logs} log entries removed)");
        }
    }

    Ok(())
}

async fn run_service(config: Config) -> Result<()> {
    config.ensure_bootstrap_files()?;
    let _ = Database::open(&config.db_path)?;

    let api_config = Arc::new(config);

    info!("Habitrack service started");

    tokio::select! {
        api_result = api::run_server(api_config) => {
            api_result?;
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn parse_optional_date(input: Option<String>) -> Result<NaiveDate> {
    Ok(input
        .as_deref()
        .map(parse_date)
        .transpose()?
        .unwrap_or_else(today))
}

fn load_or_default_config() -> Result<Config> {
    Config::load().or_else(|_| {
        let config = Config::default();
        config.ensure_bootstrap_files()?;
        config.save()?;
        Ok(config)
    })
}
