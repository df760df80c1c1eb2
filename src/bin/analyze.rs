//! セッションファイルを解析してレポートを書き出すCLI
//!
//! ポーズ推定サービスが記録したセッションJSONを入力に取り、
//! 隣に `<name>.report.json` を出力する。複数ファイルは並列処理。

use std::path::PathBuf;
use std::thread;

use anyhow::{bail, Context, Result};

use barpath_tracker::config::Config;
use barpath_tracker::report::save_report;
use barpath_tracker::session::{load_session, process_session};

const CONFIG_PATH: &str = "config.toml";

fn print_usage() {
    println!("Usage: analyze <session.json> [session.json ...]");
    println!();
    println!("  ポーズ推定サービスのセッション記録を解析し、");
    println!("  入力と同じ場所に <name>.report.json を書き出します");
    println!();
    println!("  設定: {} (無ければ既定値)", CONFIG_PATH);
    println!("  ログ: RUST_LOG で調整 (既定: info)");
}

fn analyze_file(config: &Config, path: &PathBuf) -> Result<PathBuf> {
    let session = load_session(path)
        .with_context(|| format!("failed to load session {}", path.display()))?;
    let report = process_session(config, &session)
        .with_context(|| format!("analysis failed for {}", path.display()))?;

    let out_path = path.with_extension("report.json");
    save_report(&out_path, &report)
        .with_context(|| format!("failed to write report {}", out_path.display()))?;

    if let Some(metrics) = &report.velocity_metrics {
        println!(
            "{}: {} reps, displacement {:.0}px, peak {:.0}px/s",
            path.display(),
            metrics.estimated_reps,
            metrics.vertical_displacement,
            metrics.peak_concentric_velocity
        );
    }
    Ok(out_path)
}

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        if args.len() < 2 {
            bail!("セッションファイルを指定してください");
        }
        return Ok(());
    }

    println!("=== Barpath Analyze ({}) ===", env!("GIT_VERSION"));

    let config = Config::load_or_default(CONFIG_PATH);

    // セッションごとに状態が独立なので、ファイル単位のスレッドで並列処理する
    let mut handles = Vec::new();
    for arg in &args[1..] {
        let path = PathBuf::from(arg);
        let config = config.clone();
        handles.push(thread::spawn(move || analyze_file(&config, &path)));
    }

    let mut failed = 0usize;
    for handle in handles {
        match handle.join() {
            Ok(Ok(out_path)) => println!("書き出し: {}", out_path.display()),
            Ok(Err(e)) => {
                eprintln!("エラー: {:#}", e);
                failed += 1;
            }
            Err(_) => {
                eprintln!("エラー: ワーカースレッドがpanicしました");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{}件のセッションが失敗", failed);
    }
    Ok(())
}
