use clap::Parser;
use plateau_gspatial::config::{Command, PrepareArgs, PublishArgs};
use plateau_gspatial::utils::error::ErrorSeverity;
use plateau_gspatial::utils::logger::{self, LogFormat};
use plateau_gspatial::utils::validation::Validate;
use plateau_gspatial::{
    command_single, CliConfig, CommandPreparer, HttpCkan, HttpCms, HttpDownloader, PlateauError,
    PrepareOutcome, Publisher, TomlConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    logger::init_logger(cli.verbose, format);

    tracing::info!("Starting plateau-gspatial");
    tracing::info!("📁 Loading configuration from: {}", cli.config);

    let config = match TomlConfig::from_file(&cli.config).and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };

    let result = match &cli.command {
        Command::Prepare(args) => prepare(&config, args).await,
        Command::Publish(args) => publish(&config, args).await,
    };

    if let Err(e) = result {
        exit_with(&e);
    }

    Ok(())
}

async fn prepare(config: &TomlConfig, args: &PrepareArgs) -> plateau_gspatial::Result<()> {
    let command = args
        .worker_command(config)
        .ok_or_else(|| PlateauError::MissingConfigError {
            field: "prepare.worker_command".to_string(),
        })?;

    let cms = HttpCms::new(&config.cms.base_url, &config.cms.token);
    let preparer = CommandPreparer::from_command_line(command)?;
    let downloader = HttpDownloader::new();

    match command_single(&cms, &preparer, &downloader, args.to_prepare_config(config)).await? {
        PrepareOutcome::Completed => {
            tracing::info!("✅ Preparation completed: {}", args.city_item_id);
            println!("✅ Preparation completed: {}", args.city_item_id);
        }
        PrepareOutcome::Skipped(reason) => {
            tracing::info!("⏭️ Skipped {}: {}", args.city_item_id, reason);
            println!("⏭️ Skipped {}: {}", args.city_item_id, reason);
        }
    }
    Ok(())
}

async fn publish(config: &TomlConfig, args: &PublishArgs) -> plateau_gspatial::Result<()> {
    let ckan_config = config.ckan()?;
    let private = args.private.or(ckan_config.private).unwrap_or(false);

    let publisher = Publisher::new(
        HttpCms::new(&config.cms.base_url, &config.cms.token),
        HttpCkan::new(&ckan_config.base_url, &ckan_config.token),
        &ckan_config.base_url,
        &ckan_config.org,
    )
    .with_private(private);

    let report = publisher.publish(&args.city_item_id).await?;
    let verb = if report.created { "created" } else { "updated" };
    tracing::info!(
        "✅ Package {} with {} resource(s): {}",
        verb,
        report.resources.len(),
        report.url
    );
    println!("✅ Package {}: {}", verb, report.url);
    Ok(())
}

fn exit_with(e: &PlateauError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
