mod cli;

use jpb::client::{JenkinsClient, JobServer, LocalServer};
use jpb::config::Config;
use jpb::definitions::Definitions;
use jpb::generator::{Generator, Report};
use jpb::pull_request::{GitHub, PullRequestSource};
use tracing_subscriber::filter::LevelFilter;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    let level = if cli.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .with_env_var("JPB_LOG")
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match &cli.command {
        cli::Command::Bootstrap { path, name } => {
            generator(&cli).and_then(|mut generator| {
                report(generator.bootstrap(path, name.as_deref())?)
            })
        }
        cli::Command::PullRequest(pr_cli) => pull_request(&cli, pr_cli),
        cli::Command::Dump { job } => dump(&cli, job),
        cli::Command::Attributes { all } => attributes(*all),
        cli::Command::Dev(dev_cli) => dev(dev_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

/// Config file (if any) with command line overrides applied
fn config(cli: &cli::Cli) -> anyhow::Result<Config> {
    let args = &cli.server;
    let mut config = match &args.credentials {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if args.server_url.is_some() {
        config.server_url.clone_from(&args.server_url);
    }
    if args.username.is_some() {
        config.username.clone_from(&args.username);
    }
    if args.password.is_some() {
        config.password.clone_from(&args.password);
    }
    config.strict_capabilities |= args.strict_capabilities;

    Ok(config)
}

fn server(cli: &cli::Cli, config: &Config) -> anyhow::Result<Box<dyn JobServer>> {
    if cli.debug {
        tracing::info!(dir = %cli.output_dir.display(), "debug mode, writing documents to files");
        return Ok(Box::new(LocalServer::new(&cli.output_dir)));
    }

    Ok(Box::new(jenkins(config)?))
}

fn jenkins(config: &Config) -> anyhow::Result<JenkinsClient> {
    let Some(url) = &config.server_url else {
        anyhow::bail!("No server url, use --server-url, JPB_SERVER_URL or a credentials file");
    };

    Ok(JenkinsClient::new(
        url,
        config.username.clone().unwrap_or_default(),
        config.password.clone().unwrap_or_default(),
        config.timeout(),
    )?)
}

fn generator(cli: &cli::Cli) -> anyhow::Result<Generator> {
    let config = config(cli)?;
    let server = server(cli, &config)?;
    Ok(Generator::boxed(server).strict_capabilities(config.strict_capabilities))
}

fn report(report: Report) -> anyhow::Result<()> {
    for (action, names) in [
        ("created", &report.created),
        ("updated", &report.updated),
        ("deleted", &report.deleted),
    ] {
        for name in names {
            println!("{action} {name}");
        }
    }

    for error in &report.errors {
        eprintln!("{error}");
    }

    anyhow::ensure!(
        report.is_success(),
        "{} job(s) failed",
        report.errors.len()
    );
    Ok(())
}

pub fn pull_request(cli: &cli::Cli, pr_cli: &cli::PullRequestCommand) -> anyhow::Result<()> {
    let config = config(cli)?;
    let definitions = Definitions::from_path(&pr_cli.path)?;

    let source: Box<dyn PullRequestSource> = if !pr_cli.numbers.is_empty() {
        Box::new(pr_cli.numbers.clone())
    } else {
        let project = definitions
            .find(jpb::definition::Kind::Project, &pr_cli.name)
            .ok_or_else(|| anyhow::anyhow!("No project named `{}`", pr_cli.name))?;
        let repository = pr_cli
            .github
            .clone()
            .or_else(|| project.pull_request.as_ref()?.github.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No repository to ask for pull requests, use --github, --pr or set `pull_request.github`"
                )
            })?;
        let token = pr_cli.github_token.clone().or(config.github_token.clone());
        Box::new(GitHub::new(repository, token, config.timeout())?)
    };

    let server = server(cli, &config)?;
    let mut generator =
        Generator::boxed(server).strict_capabilities(config.strict_capabilities);
    report(generator.pull_request_with(&definitions, &pr_cli.name, source.as_ref())?)
}

pub fn dump(cli: &cli::Cli, job: &str) -> anyhow::Result<()> {
    let config = config(cli)?;
    // the configuration comes from the real server even in debug mode
    let path = Generator::new(jenkins(&config)?).dump(job, &cli.output_dir)?;
    println!("{}", path.display());
    Ok(())
}

pub fn attributes(all: bool) -> anyhow::Result<()> {
    let registry = jpb::registry::AttributeRegistry::with_builtin();
    let descriptors: Vec<_> = if all {
        registry.iter().collect()
    } else {
        registry.announced().collect()
    };

    for descriptor in descriptors {
        println!(
            "{} ({}) [{}]",
            descriptor.name, descriptor.display_name, descriptor.capability_id
        );
        if !descriptor.description.is_empty() {
            println!("    {}", descriptor.description);
        }
    }

    Ok(())
}

/// (jpb-)developer utilities
///
/// A quick way to expose internal structures for debugging purposes
pub fn dev(cli: &cli::DevCommand) -> anyhow::Result<()> {
    match &cli.command {
        cli::DevSubCommand::Definitions { path } => {
            let definitions = Definitions::from_path(path)?;
            println!("{definitions:#?}");
        }
        cli::DevSubCommand::Resolved { path } => {
            let definitions = Definitions::from_path(path)?;
            let resolved = jpb::generator::resolve(&definitions, None)?;
            println!("{resolved:#?}");
        }
    }

    Ok(())
}
