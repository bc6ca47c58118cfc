use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use inquire::{Select, Text};

use common::{Config, GroupPermissions, Role};
use dtperm_agent::{apply_defaults_batch, teams_from_lines, Account, ReconcileReport};

#[derive(Parser)]
#[command(name = "dtperm", version, about = "Manage Dynatrace team permission groups")]
struct Cli {
    /// Config file (TOML)
    #[arg(short, long, env = "DTPERM_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone)]
enum Command {
    /// Show current permissions of a team's groups
    GetPerms { team: Option<String> },
    /// Apply the default permissions to a team
    SetPerms { team: Option<String> },
    /// Remove every permission from one of a team's groups
    Clear { team: String, role: Role },
    /// Check whether a team has permission groups
    Verify { team: Option<String> },
    /// Apply defaults to every team listed in a file
    ReadFile { file: Option<String> },
    /// List the permission names valid for the account
    Permissions,
    /// List the account's tenants
    Tenants,
}

const COMMANDS: &[&str] = &[
    "get_perms", "set_perms", "clear", "verify", "read_file", "permissions", "tenants", "reload", "exit",
];

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(Config::default_path);
    let config = Config::resolve(&config_path)?;
    if let Some(path) = common::logging::init(&config.logging)? {
        println!("{} {}", "Logging to".dimmed(), path.display().to_string().dimmed());
    }

    let account = Account::from_config(&config)?;
    println!("{}", account.to_string().bright_cyan().bold());

    match cli.command {
        Some(command) => run_command(&account, command).await,
        None => run_interactive(&account).await,
    }
}

enum Step {
    Run(Command),
    Reload,
    Exit,
}

/// Maps a menu choice to the next step, prompting for arguments `clear` needs.
fn next_step<P>(choice: &str, prompt_clear: P) -> Result<Step>
where
    P: FnOnce() -> Result<(String, Role)>,
{
    let command = match choice {
        "get_perms" => Command::GetPerms { team: None },
        "set_perms" => Command::SetPerms { team: None },
        "verify" => Command::Verify { team: None },
        "read_file" => Command::ReadFile { file: None },
        "permissions" => Command::Permissions,
        "tenants" => Command::Tenants,
        "reload" => return Ok(Step::Reload),
        "clear" => {
            let (team, role) = prompt_clear()?;
            Command::Clear { team, role }
        }
        _ => return Ok(Step::Exit),
    };
    Ok(Step::Run(command))
}

fn prompt_clear() -> Result<(String, Role)> {
    let team = prompt_team()?;
    let role = Select::new("Group type:", Role::ALL.to_vec()).prompt()?;
    Ok((team, role))
}

async fn run_interactive(account: &Account) -> Result<()> {
    loop {
        let choice = match Select::new("Command:", COMMANDS.to_vec()).prompt() {
            Ok(choice) => choice,
            Err(_) => break,
        };

        let outcome = match next_step(choice, prompt_clear) {
            Ok(Step::Exit) => break,
            Ok(Step::Reload) => account
                .reload()
                .await
                .map(|()| println!("{}", "✔ Group cache and defaults reloaded".green()))
                .map_err(anyhow::Error::from),
            Ok(Step::Run(command)) => run_command(account, command).await,
            Err(e) => Err(e),
        };

        if let Err(e) = outcome {
            println!("{} {:#}", "❌ Error:".red().bold(), e);
        }
    }
    println!("{}", "Bye".dimmed());
    Ok(())
}

async fn run_command(account: &Account, command: Command) -> Result<()> {
    match command {
        Command::GetPerms { team } => {
            let team = team.map_or_else(prompt_team, Ok)?;
            match account.get_permissions(&team).await? {
                Some(groups) => groups.iter().try_for_each(print_group)?,
                None => println!("{} {}", "Team has not been added:".yellow(), team),
            }
        }
        Command::SetPerms { team } => {
            let team = team.map_or_else(prompt_team, Ok)?;
            let report = account.set_defaults(&team).await?;
            print_report(&report, &format!("Permissions set for {}", team));
        }
        Command::Clear { team, role } => {
            let report = account.clear(&team, role).await?;
            if report.outcomes.is_empty() {
                println!("{} {} has no permissions", "ℹ".blue(), role);
            } else {
                print_report(&report, &format!("Permissions removed for {} {}", team, role));
            }
        }
        Command::Verify { team } => {
            let team = team.map_or_else(prompt_team, Ok)?;
            if account.team_exists(&team).await? {
                println!("{} {} exists", "✔".green().bold(), team);
            } else {
                println!("{} {} is unknown!", "✘".red().bold(), team);
            }
        }
        Command::ReadFile { file } => {
            let file = match file {
                Some(file) => file,
                None => {
                    let candidates = text_files(Path::new("."))?;
                    if !candidates.is_empty() {
                        println!("{} {}", "Text files:".bright_cyan(), candidates.join("  "));
                    }
                    Text::new("Enter a text file:").prompt()?
                }
            };
            read_from_file(account, &team_file_path(&file)).await?;
        }
        Command::Permissions => {
            for permission in account.valid_permissions().await? {
                match permission.description {
                    Some(description) => println!("{} {}", format!("{:32}", permission.name).bright_white(), description.dimmed()),
                    None => println!("{}", permission.name.bright_white()),
                }
            }
        }
        Command::Tenants => {
            for tenant in account.tenants().await? {
                println!("{} {}", format!("{:16}", tenant.id).bright_white().bold(), tenant.name);
            }
        }
    }
    Ok(())
}

async fn read_from_file(account: &Account, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let teams = teams_from_lines(&content);
    println!("{} {} team(s) from {}", "Applying defaults to".bright_cyan(), teams.len(), path.display());

    for result in apply_defaults_batch(account, &teams).await {
        match &result.outcome {
            Ok(report) => print_report(report, &format!("Permissions set for {}", result.team)),
            Err(e) => println!("{} {}: {}", "❌".red(), result.team.bold(), e),
        }
    }
    Ok(())
}

/// Sorted names of the `*.txt` files directly inside `dir`.
fn text_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("cannot list {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
            if let Some(name) = path.file_name() {
                names.push(name.to_string_lossy().into_owned());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Bare names get the `.txt` extension.
fn team_file_path(name: &str) -> PathBuf {
    let path = PathBuf::from(name);
    if path.extension().is_none() {
        path.with_extension("txt")
    } else {
        path
    }
}

fn prompt_team() -> Result<String> {
    let team = Text::new("Enter a team name:").prompt()?;
    Ok(team.trim().to_string())
}

fn print_group(group: &GroupPermissions) -> Result<()> {
    let mut permissions = group.permissions.clone();
    permissions.sort();
    println!("{} {}", "group_name:".bright_cyan(), group.name.bright_white().bold());
    println!("{} {}", "Group ID:".bright_cyan(), group.uuid);
    println!("{} {}", "Permissions:".bright_cyan(), serde_json::to_string_pretty(&permissions)?);
    Ok(())
}

fn print_report(report: &ReconcileReport, success: &str) {
    if report.is_success() {
        println!("{} {}", "✔".green().bold(), success);
        return;
    }
    println!("{}", "❌ An error occurred!".red().bold());
    for failure in report.failures() {
        println!(
            "   {} {} {:?} on tenant {}: {}",
            failure.action,
            failure.group,
            failure.permissions,
            failure.tenant,
            failure.error.as_deref().unwrap_or("unknown error").red()
        );
    }
}
