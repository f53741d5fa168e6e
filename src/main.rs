// ABOUTME: Entry point for the dokimi CLI application.
// ABOUTME: Parses arguments and dispatches to lifecycle phase handlers.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use dokimi::config::{self, Config, InstanceState};
use dokimi::driver::{Driver, StaticInstance};
use dokimi::error::{Error, Result};
use dokimi::output::{Output, OutputMode};
use dokimi::transport::{ConnectionArgs, SshTransport};
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let mut output = Output::new(mode);

    if let Err(e) = run(cli, &mut output).await {
        output.failed(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &mut Output) -> Result<()> {
    match cli.command {
        Commands::Init { host, force } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, host.as_deref(), force)?;
            output.done("Created dokimi.yml");
            Ok(())
        }
        Commands::Create => {
            let driver = load_driver()?;
            let mut state = instance_state(&driver)?;
            output.phase("create", &state.hostname);
            driver.create(&mut state).await?;
            output.done("Instance is ready");
            Ok(())
        }
        Commands::Converge => {
            let driver = load_driver()?;
            let state = instance_state(&driver)?;
            output.phase("converge", &state.hostname);
            driver.converge(&state).await?;
            output.done("Converge finished");
            Ok(())
        }
        Commands::Setup => {
            let driver = load_driver()?;
            let state = instance_state(&driver)?;
            output.phase("setup", &state.hostname);
            driver.setup(&state).await?;
            output.done("Setup finished");
            Ok(())
        }
        Commands::Verify => {
            let driver = load_driver()?;
            let state = instance_state(&driver)?;
            output.phase("verify", &state.hostname);
            driver.verify(&state).await?;
            output.done("Verify finished");
            Ok(())
        }
        Commands::Destroy => {
            let driver = load_driver()?;
            let mut state = instance_state(&driver)?;
            output.phase("destroy", &state.hostname);
            driver.destroy(&mut state).await?;
            output.done("Instance released");
            Ok(())
        }
        Commands::Test => {
            let driver = load_driver()?;
            let mut state = instance_state(&driver)?;
            full_cycle(&driver, &mut state, output).await
        }
        Commands::Login => {
            let driver = load_driver()?;
            let state = instance_state(&driver)?;
            let login = driver.login_command(&state);
            output.progress(&login.rendered());

            let status = tokio::process::Command::new(&login.program)
                .args(&login.args)
                .status()
                .await?;
            if !status.success() {
                return Err(Error::ActionFailed(format!(
                    "login session exited with {status}"
                )));
            }
            Ok(())
        }
        Commands::Exec { command } => {
            let driver = load_driver()?;
            let state = instance_state(&driver)?;
            let args = ConnectionArgs::from_config(driver.config(), &state);
            driver.ssh(&args, &command).await
        }
        Commands::Status => {
            let driver = load_driver()?;
            let state = instance_state(&driver)?;
            let args = ConnectionArgs::from_config(driver.config(), &state);
            output.progress(&format!(
                "Instance: {}@{}:{}",
                args.user, args.host, args.options.port
            ));
            output.done(&format!("Login: {}", driver.login_command(&state)));
            Ok(())
        }
    }
}

/// Run every phase in order against one instance.
async fn full_cycle(
    driver: &Driver<StaticInstance>,
    state: &mut InstanceState,
    output: &mut Output,
) -> Result<()> {
    output.phase("create", &state.hostname);
    driver.create(state).await?;

    output.phase("converge", &state.hostname);
    driver.converge(state).await?;

    output.phase("setup", &state.hostname);
    driver.setup(state).await?;

    output.phase("verify", &state.hostname);
    driver.verify(state).await?;

    output.phase("destroy", &state.hostname);
    driver.destroy(state).await?;

    output.done("All phases finished");
    Ok(())
}

fn load_driver() -> Result<Driver<StaticInstance>> {
    let cwd = env::current_dir()?;
    let config = Config::discover(&cwd)?;
    let transport = Arc::new(SshTransport::new().ready_timeout(config.ready_timeout));
    Ok(Driver::new(config, transport, StaticInstance))
}

fn instance_state(driver: &Driver<StaticInstance>) -> Result<InstanceState> {
    driver.config().instance.clone().ok_or(Error::NoInstance)
}
