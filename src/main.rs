use clap::{CommandFactory, Parser};

use zapper::cli::{parse_task_args, Cli, Commands, GlobalOpts};
use zapper::config::resolve::resolve_config;
use zapper::config::CliOverrides;
use zapper::docker::cli::DockerCli;
use zapper::instance::isolate_project;
use zapper::orchestrator::Orchestrator;
use zapper::supervisor::pm2::Pm2;

const STARTER_CONFIG: &str = r#"project: myproject

env_files:
  - .env

native:
  api:
    cmd: npm run dev
    cwd: ./api
    depends_on: [db]
    health_check: http://localhost:3000/health

docker:
  db:
    image: postgres:16-alpine
    ports: ["5432:5432"]
    volumes:
      - pgdata:/var/lib/postgresql/data
    env:
      POSTGRES_PASSWORD: dev
"#;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.global);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(global: &GlobalOpts) {
    let default_level = if global.debug {
        "trace"
    } else if global.verbose {
        "debug"
    } else if global.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Commands that need no project configuration.
    match &cli.command {
        Commands::Init => return run_init(),
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "zap", &mut std::io::stdout());
            return Ok(());
        }
        _ => {}
    }

    let config_path = resolve_config(cli.global.config_file.as_deref())?;
    let overrides = CliOverrides {
        http: cli.global.http,
        ssh: cli.global.ssh,
    };
    let ctx = zapper::config::load_context(&config_path, &overrides)?;

    if matches!(cli.command, Commands::Validate) {
        println!("{} is valid", config_path.display());
        return Ok(());
    }

    let supervisor = Pm2::new(&ctx.project_root);
    let orchestrator = Orchestrator::with_context(ctx, supervisor, DockerCli);

    // User abort cancels outstanding waves cooperatively.
    let cancel = orchestrator.cancellation_token();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        eprintln!("\nInterrupted, finishing current actions...");
        cancel.cancel();
    });

    match cli.command {
        Commands::Up {
            services,
            service,
            all,
            force,
        } => {
            let targets = if all {
                Vec::new()
            } else {
                Commands::merged_services(&services, &service)
            };
            orchestrator.start_processes(&targets, force).await
        }
        Commands::Down {
            services,
            service,
            all,
        } => {
            let targets = if all {
                Vec::new()
            } else {
                Commands::merged_services(&services, &service)
            };
            orchestrator.stop_processes(&targets).await
        }
        Commands::Restart { services, service } => {
            let targets = Commands::merged_services(&services, &service);
            orchestrator.restart_processes(&targets).await
        }
        Commands::Status => orchestrator.status().await,
        Commands::Logs {
            service,
            follow: _,
            no_follow,
        } => {
            // Logs follow by default; --no-follow prints and exits.
            orchestrator.show_logs(&service, !no_follow).await
        }
        Commands::Reset { force } => {
            let project = orchestrator.context()?.project_name.clone();
            if !force && !confirm(&format!("Reset project `{project}`?"))? {
                println!("aborted");
                return Ok(());
            }
            orchestrator.reset().await
        }
        Commands::Clone { services } => orchestrator.clone_repos(&services).await,
        Commands::Task { name, args } => {
            orchestrator.run_task(&name, &parse_task_args(&args)?).await
        }
        Commands::Checkout { branch } => orchestrator.git_checkout_all(&branch).await,
        Commands::Pull => orchestrator.git_pull_all().await,
        Commands::GitStatus => orchestrator.git_status_all().await,
        Commands::Isolate { id } => {
            let root = orchestrator.context()?.project_root.clone();
            let id = isolate_project(&root, id.as_deref())?;
            println!("instance id: {id}");
            Ok(())
        }
        Commands::Profile { name, clear } => {
            if clear {
                orchestrator.set_active_profile(None).await?;
                println!("active profile cleared");
            } else if let Some(name) = name {
                orchestrator.set_active_profile(Some(name.clone())).await?;
                println!("active profile: {name}");
            } else {
                let ctx = orchestrator.context()?;
                match &ctx.state.active_profile {
                    Some(active) => println!("active profile: {active}"),
                    None => println!("no active profile"),
                }
                if !ctx.profiles.is_empty() {
                    println!("available: {}", ctx.profiles.join(", "));
                }
            }
            Ok(())
        }
        Commands::Environment { name, clear } => {
            if clear {
                orchestrator.set_active_environment(None).await?;
                println!("active environment cleared");
            } else if let Some(name) = name {
                orchestrator
                    .set_active_environment(Some(name.clone()))
                    .await?;
                println!("active environment: {name}");
            } else {
                let ctx = orchestrator.context()?;
                match &ctx.state.active_environment {
                    Some(active) => println!("active environment: {active}"),
                    None => println!("no active environment"),
                }
                if !ctx.environments.is_empty() {
                    let available: Vec<&str> =
                        ctx.environments.iter().map(|e| e.as_str()).collect();
                    println!("available: {}", available.join(", "));
                }
            }
            Ok(())
        }
        Commands::Env { service } => orchestrator.show_env(&service),
        Commands::Init | Commands::Validate | Commands::Completions { .. } => unreachable!(),
    }
}

fn run_init() -> anyhow::Result<()> {
    let path = std::path::Path::new("zapper.yml");
    if path.exists() {
        anyhow::bail!("zapper.yml already exists here");
    }
    std::fs::write(path, STARTER_CONFIG)?;
    println!("wrote zapper.yml");
    Ok(())
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    use std::io::Write;
    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(matches!(input.trim(), "y" | "Y" | "yes"))
}
