mod api;
mod app;
mod error;
mod form;
mod storage;
mod sync;
mod ui;
mod utils;

use std::io::BufRead;
use tokio::sync::mpsc;

use crate::api::client::ApiClient;
use crate::app::AppConfig;
use crate::storage::Store;
use crate::ui::commands::{Command, HELP};
use crate::ui::dashboard::Dashboard;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::load();
    let backend = config.backend_url();
    log::info!("backend {backend} ({:?})", config.environment);

    let store = match Store::open(config.data_dir.as_deref()) {
        Ok(store) => store,
        Err(e) => {
            log::error!("cannot open local store: {e}");
            std::process::exit(1);
        }
    };
    let runtime = match utils::build_runtime() {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("cannot start runtime: {e}");
            std::process::exit(1);
        }
    };

    let (tx, rx) = mpsc::channel(16);
    spawn_command_reader(tx);
    println!("{HELP}");

    runtime.block_on(async move {
        let dashboard = Dashboard::new(&config, ApiClient::new(&backend), store);
        dashboard
            .run(rx, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    log::error!("cannot listen for ctrl-c: {e}");
                    std::future::pending::<()>().await;
                }
            })
            .await;
    });
    // The stdin thread may still be parked on a read.
    runtime.shutdown_background();
}

/// Terminal input lives on its own thread so a blocked read never holds
/// up the event loop or teardown.
fn spawn_command_reader(tx: mpsc::Sender<Result<Command, String>>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            if tx.blocking_send(Command::parse(&line)).is_err() {
                break;
            }
        }
    });
}
