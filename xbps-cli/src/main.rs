//! `xbps-remove`: the removal front-end over the embedder API (§6).

mod cli;

use std::{
    error::Error as StdError,
    io::{self, Write},
    process::ExitCode,
    str::FromStr,
};

use clap::Parser;
use cli::Cli;
use log::{LevelFilter, info, warn};
use simplelog::{ColorChoice, Config as LogConfig, TermLogger, TerminalMode};
use xbps_cli::{Config, Flags, Handle};
use xbps_transaction::{Event, EventState, ExecuteOptions, NoopCollaborator, Outcome};
use xbps_types::Name;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.debug { LevelFilter::Debug } else { LevelFilter::Info };
    if let Err(error) = TermLogger::init(level, LogConfig::default(), TerminalMode::Stderr, ColorChoice::Auto) {
        eprintln!("failed to initialize logger:\n{error}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("xbps-remove: {error}");
            ExitCode::from(exit_code_for_error(&error))
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, xbps_cli::Error> {
    if cli.clean_cache {
        info!("--clean-cache requested; cache maintenance is out of scope, nothing to do");
    }

    let config = Config {
        rootdir: cli.rootdir.clone().unwrap_or_else(|| "/".into()),
        cachedir: cli.cachedir.clone(),
        conffile: cli.config.clone(),
        flags: Flags {
            debug: cli.debug,
            verbose: cli.verbose,
            force_remove_files: cli.force,
            disable_syslog: false,
            force_revdeps: cli.force_revdeps,
        },
    };

    let mut handle = Handle::init(config)?;

    let mut names = Vec::with_capacity(cli.packages.len());
    for raw in &cli.packages {
        let name = Name::from_str(raw)?;
        handle.transaction_remove_pkg(&name, cli.recursive)?;
        names.push(name);
    }
    if cli.remove_orphans {
        handle.transaction_autoremove_pkgs();
    }

    if names.is_empty() && !cli.remove_orphans {
        warn!("nothing requested, no packages and no --remove-orphans");
        return Ok(ExitCode::SUCCESS);
    }

    if !cli.dry_run && !cli.yes && !confirm() {
        info!("cancelled by user");
        return Ok(ExitCode::SUCCESS);
    }

    if !cli.dry_run {
        handle.pkgdb_lock()?;
    }

    let options = ExecuteOptions {
        dry_run: cli.dry_run,
        assume_yes: cli.yes,
        force_remove_files: cli.force,
        force_revdeps: cli.force_revdeps,
        verbose: cli.verbose,
    };

    handle.register_state_cb(move |event: Event| {
        log_event(&event);
    });

    let outcome = handle.exec_transaction(NoopCollaborator, &options);

    if !cli.dry_run {
        handle.pkgdb_unlock()?;
    }

    match outcome? {
        Outcome::Success => Ok(ExitCode::SUCCESS),
        Outcome::RemovalBlocked { blocked } => {
            for (name, revdeps) in &blocked {
                println!("WARNING: {name} IS REQUIRED BY {} PACKAGE(S):", revdeps.len());
                for dep in revdeps {
                    match handle.pkgdb().find_installed(dep) {
                        Some(record) => println!("{}", record.pkgver),
                        None => println!("{dep}"),
                    }
                }
            }
            // EEXIST: the front-end's contractual exit code for a revdeps-blocked removal (§6).
            Ok(ExitCode::from(17))
        }
    }
}

fn log_event(event: &Event) {
    match &event.state {
        EventState::RemoveFail | EventState::RemoveFileFail | EventState::RemoveFileHashFail => {
            warn!("{}: {}", event.arg, event.err.as_deref().unwrap_or("failed"));
        }
        EventState::RemoveFileObsolete => {
            info!("{}: left in place (directory not empty)", event.arg);
        }
        _ => {
            info!("{:?}: {}", event.state, event.arg);
        }
    }
}

fn confirm() -> bool {
    print!("Do you want to continue? [Y/n] ");
    if io::stdout().flush().is_err() {
        return true;
    }
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_err() {
        return true;
    }
    let answer = line.trim();
    answer.is_empty() || answer.eq_ignore_ascii_case("y")
}

fn exit_code_for_error(error: &xbps_cli::Error) -> u8 {
    let mut source: Option<&(dyn StdError + 'static)> = error.source();
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<io::Error>()
            && let Some(code) = io_err.raw_os_error()
        {
            return code.clamp(1, 255) as u8;
        }
        source = err.source();
    }
    1
}
