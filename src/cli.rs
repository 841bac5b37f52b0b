// CLI module - command-line argument parsing and handlers
//
// Provides subcommands for session and configuration management:
// - login / logout / whoami: manage the saved backend session
// - config --show: Display effective configuration
// - config --reset: Regenerate config file with defaults
// - config --edit: Open config file in $EDITOR
// - config --path: Show config file path

use crate::api::ApiClient;
use crate::config::{Config, VERSION};
use crate::session::SessionStore;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::process::Command;

/// corral - terminal client for the CRM backend
#[derive(Parser)]
#[command(name = "corral")]
#[command(version = VERSION)]
#[command(about = "Terminal client for the CRM backend", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in to the backend and save the session token
    Login {
        /// Email address (prompted if omitted)
        #[arg(long)]
        email: Option<String>,
    },

    /// Discard the saved session token
    Logout,

    /// Show the currently authenticated user
    Whoami,

    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Reset config file to defaults
        #[arg(long)]
        reset: bool,

        /// Open config file in $EDITOR
        #[arg(long)]
        edit: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

/// Handle CLI commands. Returns true if a command was handled (exit after).
pub async fn handle_cli(config: &Config) -> bool {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Login { email }) => {
            handle_login(config, email).await;
            true
        }
        Some(Commands::Logout) => {
            handle_logout();
            true
        }
        Some(Commands::Whoami) => {
            handle_whoami(config).await;
            true
        }
        Some(Commands::Config {
            show,
            reset,
            edit,
            path,
        }) => {
            if path {
                handle_config_path();
            } else if show {
                handle_config_show(config);
            } else if reset {
                handle_config_reset();
            } else if edit {
                handle_config_edit();
            } else {
                // No flag provided, show help
                println!("Usage: corral config [--show|--reset|--edit|--path]");
                println!();
                println!("Options:");
                println!("  --show    Display effective configuration");
                println!("  --reset   Reset config file to defaults");
                println!("  --edit    Open config file in $EDITOR");
                println!("  --path    Show config file path");
            }
            true
        }
        None => false, // No subcommand, run the TUI
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session commands
// ─────────────────────────────────────────────────────────────────────────────

fn prompt(label: &str) -> String {
    eprint!("{}: ", label);
    let _ = std::io::stderr().flush();

    let mut input = String::new();
    if std::io::stdin().read_line(&mut input).is_err() {
        eprintln!("Error: failed to read input");
        std::process::exit(1);
    }
    input.trim().to_string()
}

async fn handle_login(config: &Config, email: Option<String>) {
    let email = match email {
        Some(e) if !e.trim().is_empty() => e.trim().to_string(),
        _ => prompt("Email"),
    };
    let password = prompt("Password");

    if email.is_empty() || password.is_empty() {
        eprintln!("Error: email and password are required");
        std::process::exit(1);
    }

    let session = SessionStore::new();
    let api = match ApiClient::new(config, session.clone(), None) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match api.login(&email, &password).await {
        Ok(login) => {
            if let Err(e) = session.establish(login.token, login.user.clone()) {
                eprintln!("Error: could not save session token: {}", e);
                std::process::exit(1);
            }
            println!("Logged in as {}", login.user.email);
        }
        Err(e) => {
            eprintln!("Login failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn handle_logout() {
    let session = SessionStore::new();
    session.clear();
    println!("Logged out.");
}

async fn handle_whoami(config: &Config) {
    let session = SessionStore::new();

    if !session.has_token() {
        println!("Not logged in. Run: corral login");
        return;
    }

    let api = match ApiClient::new(config, session.clone(), None) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    match api.me().await {
        Ok(user) => {
            match user.name {
                Some(name) => println!("{} <{}>", name, user.email),
                None => println!("{}", user.email),
            }
            if let Some(hash) = session.token_hash() {
                println!("Session: {}", hash);
            }
        }
        Err(e) => {
            eprintln!("Session check failed: {}", e);
            eprintln!("Run: corral login");
            std::process::exit(1);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Config commands
// ─────────────────────────────────────────────────────────────────────────────

fn handle_config_path() {
    match Config::config_path() {
        Some(path) => println!("{}", path.display()),
        None => {
            eprintln!("Error: Could not determine config path");
            std::process::exit(1);
        }
    }
}

fn handle_config_show(config: &Config) {
    println!("# Effective configuration (env > file > defaults)");
    println!();
    println!("api_url = {:?}", config.api_url);
    println!("request_timeout_secs = {}", config.request_timeout_secs);
    println!();
    println!("[logging]");
    println!("level = {:?}", config.logging.level);
    println!("file_enabled = {}", config.logging.file_enabled);
    println!("file_dir = {:?}", config.logging.file_dir.display().to_string());
    println!("file_rotation = {:?}", config.logging.file_rotation.as_str());
    println!("file_prefix = {:?}", config.logging.file_prefix);
    println!();
    println!("[assistant]");
    println!("suggestion_limit = {}", config.assistant.suggestion_limit);

    // Show source info
    println!();
    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("# Source: {}", path.display());
        } else {
            println!("# Source: defaults (no config file)");
        }
    }
}

fn handle_config_reset() {
    let Some(path) = Config::config_path() else {
        eprintln!("Error: Could not determine config path");
        std::process::exit(1);
    };

    // Confirm if file exists
    if path.exists() {
        eprint!(
            "Config file exists at {}. Overwrite? [y/N] ",
            path.display()
        );
        let _ = std::io::stderr().flush();

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input).is_err() {
            eprintln!("Error: failed to read input");
            std::process::exit(1);
        }

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return;
        }
    }

    // Create parent directory
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("Error creating directory: {}", e);
            std::process::exit(1);
        }
    }

    // Write the default config (using Config's single source of truth)
    if let Err(e) = std::fs::write(&path, Config::default().to_toml()) {
        eprintln!("Error writing config: {}", e);
        std::process::exit(1);
    }

    println!("Config reset to defaults: {}", path.display());
}

fn handle_config_edit() {
    let Some(path) = Config::config_path() else {
        eprintln!("Error: Could not determine config path");
        std::process::exit(1);
    };

    // Ensure config exists
    if !path.exists() {
        Config::ensure_config_exists();
        println!("Created new config file: {}", path.display());
    }

    // Get editor from environment
    let editor = std::env::var("EDITOR")
        .or_else(|_| std::env::var("VISUAL"))
        .unwrap_or_else(|_| {
            // Platform-specific fallback
            if cfg!(windows) {
                "notepad".to_string()
            } else {
                "nano".to_string()
            }
        });

    println!("Opening {} with {}", path.display(), editor);

    let status = Command::new(&editor).arg(&path).status();

    match status {
        Ok(s) if s.success() => {}
        Ok(s) => {
            eprintln!("Editor exited with status: {}", s);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Failed to launch editor '{}': {}", editor, e);
            eprintln!("Set $EDITOR environment variable to your preferred editor");
            std::process::exit(1);
        }
    }
}
