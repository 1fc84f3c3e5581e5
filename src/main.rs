use log::{error, info};
use reset_monitor::config::Config;
use reset_monitor::{cli, monitor};

#[tokio::main(flavor = "current_thread")] // one sequential polling loop, no parallelism
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cmd = cli::build_cli();
    let matches = cmd.get_matches();
    let log_level = matches.get_one::<String>("log-level").cloned();
    let version_flag = matches.get_flag("version");

    cli::init_logging(log_level.as_deref());

    if version_flag {
        println!("reset-monitor {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };
    cfg.log_summary();

    tokio::select! {
        res = monitor::run(&cfg) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("monitor stopped by user");
            Ok(())
        }
    }
}
