use clap::Parser;
use cohort_dashboard::core::report;
use cohort_dashboard::core::QueryExecutor;
use cohort_dashboard::utils::error::ErrorSeverity;
use cohort_dashboard::utils::{logger, validation::Validate};
use cohort_dashboard::{
    CliConfig, DashboardEngine, DashboardError, MentorScope, PgExecutor, TomlConfig,
};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose, cli.log_json);

    tracing::info!("Starting cohort-dashboard");
    if cli.verbose {
        tracing::debug!(
            config = ?cli.config,
            mentor = ?cli.mentor,
            role = ?cli.role,
            format = ?cli.format,
            "CLI arguments"
        );
    }

    match run(&cli).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            tracing::error!(
                "❌ Dashboard request failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }
}

async fn run(cli: &CliConfig) -> Result<String, DashboardError> {
    // Resolve the scope first: a refused caller never touches the database.
    let scope = cli.requested_scope()?;

    let engine = match &cli.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            let mut config = TomlConfig::from_file(path)?;
            cli.apply_to(&mut config);
            config.validate()?;
            cli.validate_request_args()?;

            let executor = PgExecutor::connect(&config).await?;
            DashboardEngine::from_config(executor, &config)
        }
        None => {
            cli.validate()?;

            let executor = PgExecutor::connect(cli).await?;
            DashboardEngine::from_config(executor, cli)
        }
    };

    render(&engine, cli, scope.as_ref()).await
}

async fn render<E: QueryExecutor>(
    engine: &DashboardEngine<E>,
    cli: &CliConfig,
    scope: Option<&MentorScope>,
) -> Result<String, DashboardError> {
    if cli.payments_only {
        let summary = engine.payments_summary(scope).await?;
        report::render(&summary, cli.format)
    } else {
        let stats = engine.stats(scope).await?;
        report::render(&stats, cli.format)
    }
}
