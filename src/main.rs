use clap::Parser;
use proxilink::app::commands;
use proxilink::config::{AppConfig, CliConfig, Command};
use proxilink::utils::error::ProxiError;
use proxilink::utils::{logger, validation::Validate};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);

    tracing::info!("🚀 Starting proxilink CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 驗證命令列參數
    if let Err(e) = cli.validate() {
        tracing::error!("❌ Argument validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    // 載入並驗證 TOML 配置
    let config = match AppConfig::load(cli.config.as_deref()).and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    let mut stdout = std::io::stdout().lock();
    let result = match &cli.command {
        Command::Nearby(args) => commands::nearby(&config, args, &mut stdout).await,
        Command::Locate(args) => commands::locate(&config, args, &mut stdout).await,
        Command::Radius(args) => commands::radius(&config, args, &mut stdout),
        Command::Push(args) => commands::push(&config, args, &mut stdout).await,
        Command::Notifications(args) => commands::notifications(&config, args, &mut stdout).await,
        Command::VapidKeys => commands::vapid_keys(&mut stdout),
    };

    if let Err(e) = result {
        report_failure(&e);
    }

    Ok(())
}

fn report_failure(e: &ProxiError) {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    // 輸出用戶友好的錯誤信息
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = e.severity().exit_code();

    if exit_code > 0 {
        std::process::exit(exit_code);
    }
}
