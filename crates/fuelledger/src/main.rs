//! `fuelctl` - CLI for fuelledger
//!
//! This binary provides the command-line interface for recording fuel loads
//! and reading the fleet ledger.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;

use fuelledger::auth::{require_admin, Authenticator, NewAccount};
use fuelledger::cli::{
    AccountCommand, Cli, Command, ConfigCommand, DriverCommand, HistoryCommand, OutputFormat,
    RecordCommand, VehicleCommand,
};
use fuelledger::filter::resolve_driver_id;
use fuelledger::report::{
    build_dashboard, build_history, format_liters, format_money, render_dashboard,
    render_history_plain, render_history_table,
};
use fuelledger::session::{
    current_session, end_session, require_actor, FileSessionStore, SessionStore,
};
use fuelledger::submission::{
    preview, register_driver, register_vehicle, submit_fuel_load, validate_fuel_load,
    SubmissionRules, SubmitOutcome,
};
use fuelledger::{init_logging, seed, Config, Error, Storage};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    match cli.command {
        Command::Login(cmd) => handle_login(&config, &cmd.username, cmd.password),
        Command::Logout => handle_logout(&config),
        Command::Whoami { json } => handle_whoami(&config, json),
        Command::Dashboard { json } => handle_dashboard(&config, json),
        Command::History(cmd) => handle_history(&config, cmd),
        Command::Record(cmd) => handle_record(&config, &cmd),
        Command::Vehicle(cmd) => handle_vehicle(&config, cmd),
        Command::Driver(cmd) => handle_driver(&config, cmd),
        Command::Account(cmd) => handle_account(&config, cmd),
        Command::Seed => handle_seed(&config),
        Command::Status(cmd) => handle_status(&config, cmd.json),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn open_storage(config: &Config) -> Result<Storage> {
    let path = config.database_path();
    Storage::open(&path).with_context(|| format!("failed to open ledger at {}", path.display()))
}

fn session_store(config: &Config) -> FileSessionStore {
    FileSessionStore::new(config.session_path())
}

fn read_password(prompt: &str) -> Result<String> {
    eprint!("{prompt}");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn handle_login(config: &Config, username: &str, password: Option<String>) -> Result<()> {
    let storage = open_storage(config)?;
    let password = match password {
        Some(password) => password,
        None => read_password("Password: ")?,
    };

    let auth = Authenticator::from_config(&storage, &config.auth, &config.session);
    let session = auth.login(username, &password, Utc::now())?;
    session_store(config).save(&session)?;

    println!(
        "Logged in as {} ({}), session valid until {}",
        session.actor.display_name,
        session.actor.role,
        session.expires_at.format("%Y-%m-%d %H:%M UTC")
    );
    Ok(())
}

fn handle_logout(config: &Config) -> Result<()> {
    let storage = open_storage(config)?;
    if end_session(&session_store(config), &storage)? {
        println!("Logged out.");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

fn handle_whoami(config: &Config, json: bool) -> Result<()> {
    let storage = open_storage(config)?;
    let Some(session) = current_session(&session_store(config), &storage, Utc::now())? else {
        return Err(Error::NotAuthenticated.into());
    };

    if json {
        return print_json(&serde_json::json!({
            "actor": session.actor,
            "issued_at": session.issued_at,
            "expires_at": session.expires_at,
        }));
    }

    println!("Username:      {}", session.actor.username);
    println!("Name:          {}", session.actor.display_name);
    println!("Role:          {}", session.actor.role);
    if let Some(driver_id) = session.actor.driver_id {
        println!("Driver:        #{driver_id}");
    }
    println!(
        "Expires:       {}",
        session.expires_at.format("%Y-%m-%d %H:%M UTC")
    );
    Ok(())
}

fn handle_dashboard(config: &Config, json: bool) -> Result<()> {
    let storage = open_storage(config)?;
    let actor = require_actor(&session_store(config), &storage, Utc::now())?;
    let ledger = storage.snapshot()?;
    let report = build_dashboard(&ledger, &actor, config.display.recent_loads);

    if json {
        print_json(&report)
    } else {
        print!(
            "{}",
            render_dashboard(&report, &actor, &config.display.currency_symbol)
        );
        Ok(())
    }
}

fn handle_history(config: &Config, cmd: HistoryCommand) -> Result<()> {
    let storage = open_storage(config)?;
    let actor = require_actor(&session_store(config), &storage, Utc::now())?;
    let ledger = storage.snapshot()?;
    let query = cmd.query.unwrap_or_default();
    let limit = cmd.limit.unwrap_or(config.display.history_limit);
    let report = build_history(&ledger, &actor, &query, limit);
    let currency = &config.display.currency_symbol;

    match cmd.format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print!("{}", render_history_table(&report, currency)),
        OutputFormat::Plain => print!("{}", render_history_plain(&report, currency)),
    }
    Ok(())
}

fn handle_record(config: &Config, cmd: &RecordCommand) -> Result<()> {
    let storage = open_storage(config)?;
    let actor = require_actor(&session_store(config), &storage, Utc::now())?;
    let rules = SubmissionRules::from_config(&config.submission)?;
    let ledger = storage.snapshot()?;

    let driver_id = match cmd.driver {
        Some(id) => id,
        None if actor.is_admin() => {
            bail!("--driver is required when recording as an administrator")
        }
        None => resolve_driver_id(&actor, ledger.drivers())
            .context("no driver is linked to this account; pass --driver")?,
    };
    let request = cmd.to_request(driver_id);
    let currency = &config.display.currency_symbol;

    if cmd.dry_run {
        let preview = preview(&request);
        let errors = validate_fuel_load(&request, &ledger, &rules);
        if cmd.json {
            print_json(&serde_json::json!({ "preview": preview, "errors": errors }))?;
        } else {
            println!("Distance:      {} km", preview.distance);
            println!("Consumption:   {} L/100km", preview.consumption_rate);
            for error in &errors {
                println!("  ! {error}");
            }
        }
        if !errors.is_empty() {
            return Err(Error::InvalidSubmission {
                subject: "fuel load",
                errors,
            }
            .into());
        }
        return Ok(());
    }

    match submit_fuel_load(&storage, &actor, request, &rules)? {
        SubmitOutcome::Recorded(record) => {
            if cmd.json {
                print_json(&ledger.entry(&record).to_row())?;
            } else {
                let entry = ledger.entry(&record);
                println!(
                    "Recorded fuel load #{}: {} {} on {}, {}, {} L/100km",
                    record.id,
                    entry.plate(),
                    format_liters(record.liters),
                    record.date,
                    format_money(record.price, currency),
                    entry.consumption_rate()
                );
            }
        }
        SubmitOutcome::Duplicate => {
            println!("An identical fuel load is already recorded; nothing was written.");
        }
    }
    Ok(())
}

fn handle_vehicle(config: &Config, cmd: VehicleCommand) -> Result<()> {
    let storage = open_storage(config)?;
    let actor = require_actor(&session_store(config), &storage, Utc::now())?;

    match cmd {
        VehicleCommand::Add(args) => {
            let rules = SubmissionRules::from_config(&config.submission)?;
            let id = register_vehicle(&storage, &actor, args.into(), &rules)?;
            println!("Registered vehicle #{id}");
        }
        VehicleCommand::List { json } => {
            let vehicles = storage.vehicles()?;
            if json {
                print_json(&vehicles)?;
            } else {
                println!(
                    "{:>4}  {:<8}  {:<24}  {:<16}  {:>8}  {}",
                    "ID", "PLATE", "VEHICLE", "CATEGORY", "TANK", "ACTIVE"
                );
                for v in &vehicles {
                    println!(
                        "{:>4}  {:<8}  {:<24}  {:<16}  {:>8}  {}",
                        v.id,
                        v.plate,
                        format!("{} {}", v.make, v.model),
                        v.category.as_str(),
                        format_liters(v.tank_capacity),
                        if v.active { "yes" } else { "no" }
                    );
                }
            }
        }
    }
    Ok(())
}

fn handle_driver(config: &Config, cmd: DriverCommand) -> Result<()> {
    let storage = open_storage(config)?;
    let actor = require_actor(&session_store(config), &storage, Utc::now())?;

    match cmd {
        DriverCommand::Add(args) => {
            let id = register_driver(&storage, &actor, args.into())?;
            println!("Registered driver #{id}");
        }
        DriverCommand::List { json } => {
            let drivers = storage.drivers()?;
            if json {
                print_json(&drivers)?;
            } else {
                println!(
                    "{:>4}  {:<24}  {:<12}  {:<7}  {}",
                    "ID", "NAME", "NATIONAL ID", "LICENSE", "ACTIVE"
                );
                for d in &drivers {
                    println!(
                        "{:>4}  {:<24}  {:<12}  {:<7}  {}",
                        d.id,
                        d.full_name(),
                        d.national_id,
                        d.license_class,
                        if d.active { "yes" } else { "no" }
                    );
                }
            }
        }
    }
    Ok(())
}

fn handle_account(config: &Config, cmd: AccountCommand) -> Result<()> {
    let storage = open_storage(config)?;
    let actor = require_actor(&session_store(config), &storage, Utc::now())?;

    match cmd {
        AccountCommand::Add(args) => {
            require_admin(&actor, "creating accounts")?;
            let password = match args.password {
                Some(password) => password,
                None => read_password(&format!("Password for {}: ", args.username))?,
            };
            let auth = Authenticator::from_config(&storage, &config.auth, &config.session);
            let id = auth.register(
                &actor,
                &NewAccount {
                    username: args.username,
                    password,
                    role: args.role.into(),
                    display_name: args.display_name,
                    driver_id: args.driver,
                },
            )?;
            println!("Created account #{id}");
        }
        AccountCommand::List { json } => {
            require_admin(&actor, "listing accounts")?;
            let accounts = storage.accounts()?;
            if json {
                print_json(&accounts)?;
            } else {
                println!(
                    "{:>4}  {:<12}  {:<24}  {:<6}  {}",
                    "ID", "USERNAME", "NAME", "ROLE", "DRIVER"
                );
                for a in &accounts {
                    println!(
                        "{:>4}  {:<12}  {:<24}  {:<6}  {}",
                        a.id,
                        a.username,
                        a.display_name,
                        a.role.as_str(),
                        a.driver_id.map_or_else(|| "-".to_string(), |id| format!("#{id}"))
                    );
                }
            }
        }
    }
    Ok(())
}

fn handle_seed(config: &Config) -> Result<()> {
    let storage = open_storage(config)?;
    let auth = Authenticator::from_config(&storage, &config.auth, &config.session);
    let summary = seed::seed_demo(&storage, &auth)?;

    println!(
        "Seeded {} vehicles, {} drivers, {} fuel loads and {} accounts.",
        summary.vehicles, summary.drivers, summary.fuel_loads, summary.accounts
    );
    println!("Demo logins: admin / admin123, chofer1 / chofer123");
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> Result<()> {
    let storage = open_storage(config)?;
    let stats = storage.stats()?;
    let session = current_session(&session_store(config), &storage, Utc::now())?;
    let latest = storage.recent_fuel_loads(1)?.into_iter().next();

    if json {
        return print_json(&serde_json::json!({
            "database_path": storage.path(),
            "stats": stats,
            "latest_load": latest,
            "session": session.as_ref().map(|s| serde_json::json!({
                "username": s.actor.username,
                "role": s.actor.role,
                "expires_at": s.expires_at,
            })),
        }));
    }

    println!("fuelctl status");
    println!("--------------");
    println!("Database:      {}", storage.path().display());
    println!("Schema:        v{}", stats.schema_version);
    println!("Size:          {} bytes", stats.db_size_bytes);
    println!("Vehicles:      {}", stats.vehicles);
    println!("Drivers:       {}", stats.drivers);
    println!("Fuel loads:    {}", stats.fuel_loads);
    println!("Accounts:      {}", stats.accounts);
    if let (Some(first), Some(last)) = (stats.first_load, stats.last_load) {
        println!("Loads span:    {first} .. {last}");
    }
    if let Some(load) = latest {
        println!(
            "Latest load:   #{} {} {} at {} ({}, by {})",
            load.id,
            load.date,
            load.time.format("%H:%M"),
            load.station,
            format_liters(load.liters),
            load.recorded_by
        );
    }
    match session {
        Some(s) => println!("Session:       {} ({})", s.actor.username, s.actor.role),
        None => println!("Session:       not logged in"),
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                print_json(config)?;
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Session]");
                println!("  Session path:       {}", config.session_path().display());
                println!("  TTL (minutes):      {}", config.session.ttl_minutes);
                println!();
                println!("[Auth]");
                println!("  bcrypt cost:        {}", config.auth.bcrypt_cost);
                println!();
                println!("[Submission]");
                println!("  Plate pattern:      {}", config.submission.plate_pattern);
                println!(
                    "  Capacity tolerance: {} L",
                    config.submission.max_liters_over_capacity
                );
                println!();
                println!("[Display]");
                println!("  Currency:           {}", config.display.currency_symbol);
                println!("  Recent loads:       {}", config.display.recent_loads);
                println!("  History limit:      {}", config.display.history_limit);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}
