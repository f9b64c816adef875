use clap::{Parser, Subcommand};
use optool::{
    start_server, LoggingConfig, OptimizationProblem, ProblemSpec, ServerConfig, SolveOrchestrator,
    SolverBackend, SolverConfig,
};
use std::path::PathBuf;
use tracing::{error, info};

/// optool - JSON optimization problems (LP, MILP, QP, MIQP, QCP, MIQCP) as agent tools.
#[derive(Parser, Debug)]
#[command(name = "optool-server")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Solver backend: auto, highs, clarabel or cbc
    #[arg(long, global = true, default_value = "auto", value_parser = parse_backend)]
    backend: SolverBackend,

    /// Time limit per solve in seconds
    #[arg(long, global = true)]
    time_limit: Option<f64>,

    /// Relative MIP gap
    #[arg(long, global = true)]
    gap: Option<f64>,

    /// Let the solver print its own log (to stderr)
    #[arg(long, global = true)]
    verbose: bool,

    /// Log level, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log format: pretty or json
    #[arg(long, global = true, default_value = "pretty")]
    log_format: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve tool requests as JSON lines on stdin/stdout (default)
    Serve {
        /// Requests solved at the same time
        #[arg(long, default_value_t = optool::infrastructure::server::DEFAULT_MAX_CONCURRENT_REQUESTS)]
        max_concurrent_requests: usize,
    },

    /// Solve a problem file and print the result
    Solve { file: PathBuf },

    /// Print a problem file as LP text
    Export { file: PathBuf },
}

fn parse_backend(value: &str) -> Result<SolverBackend, String> {
    SolverBackend::parse(value).ok_or_else(|| format!("unknown solver backend '{}'", value))
}

fn read_spec(file: &PathBuf) -> Result<ProblemSpec, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(file)?;
    Ok(ProblemSpec::from_json_str(&text)?)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    LoggingConfig::new(&cli.log_level, &cli.log_format).init();

    let solver = SolverConfig {
        backend: cli.backend,
        time_limit: cli.time_limit,
        gap_tolerance: cli.gap,
        verbose: cli.verbose,
    };

    let command = cli.command.unwrap_or(Commands::Serve {
        max_concurrent_requests: optool::infrastructure::server::DEFAULT_MAX_CONCURRENT_REQUESTS,
    });

    if let Err(e) = run(command, solver).await {
        error!(error = %e, "Fatal error");
        std::process::exit(1);
    }
}

async fn run(command: Commands, solver: SolverConfig) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Serve {
            max_concurrent_requests,
        } => {
            let config =
                ServerConfig::new(solver).with_max_concurrent_requests(max_concurrent_requests);
            start_server(config).await?;
        }
        Commands::Solve { file } => {
            let spec = read_spec(&file)?;
            let orchestrator = SolveOrchestrator::new(solver);
            let result = tokio::task::spawn_blocking(move || orchestrator.solve(spec)).await?;
            match result {
                Ok(result) => println!("{}", serde_json::to_string_pretty(&result)?),
                Err(failure) => {
                    println!("{}", failure);
                    std::process::exit(2);
                }
            }
        }
        Commands::Export { file } => {
            let mut problem = OptimizationProblem::from_spec(read_spec(&file)?)?;
            if let Err(e) = problem.build() {
                info!(error = %e, "model was not built");
            }
            print!("{}", problem.problem_as_lp()?);
        }
    }
    Ok(())
}
