use anyhow::{anyhow, Result};
use chrono::Utc;
use std::io::Write;
use std::path::Path;

use uturn_tracker::animate::CounterAnimation;
use uturn_tracker::feed::{FeedConfig, FeedPoller, HttpFeedSource};
use uturn_tracker::logging::{log, obj, ts_now, v_str, Domain, Level};
use uturn_tracker::scan::{
    classify_failure, validate_credential, FailureKind, InfoScan, ScanKind, ScanOutcome,
    ScanProgress,
};
use uturn_tracker::site::build_site;
use uturn_tracker::state::{AppState, Config};
use uturn_tracker::stats::Stats;
use uturn_tracker::store::{LocalStore, API_KEY_SLOT, LAST_SCAN_SLOT};

const USAGE: &str = "usage: uturn-tracker [render [--with-feed] | stats | scan [--set-key KEY | --clear-key] | check [--json]]";

struct StdoutProgress;

impl ScanProgress for StdoutProgress {
    fn stage(&mut self, msg: &str) {
        println!("  {}", msg);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let rest = args.get(1..).unwrap_or(&[]);

    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("command", v_str(args.first().map(String::as_str).unwrap_or("render"))),
            ("data_path", v_str(&cfg.data_path)),
        ]),
    );

    match args.first().map(String::as_str).unwrap_or("render") {
        "render" => render(&cfg, rest).await,
        "stats" => stats(&cfg).await,
        "scan" => scan(&cfg, rest).await,
        "check" => check(&cfg, rest),
        "-h" | "--help" | "help" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => Err(anyhow!("unknown command '{}'\n{}", other, USAGE)),
    }
}

async fn render(cfg: &Config, args: &[String]) -> Result<()> {
    let state = AppState::load_or_empty(Path::new(&cfg.data_path));
    let stats = Stats::compute(&state, cfg.government_start, Utc::now().date_naive());
    let scan = InfoScan::new(&state.last_updated).outcome();

    let feed = if args.iter().any(|a| a == "--with-feed") {
        let mut poller = FeedPoller::new(FeedConfig::from_config(cfg));
        Some(poller.poll(&HttpFeedSource::new()).await)
    } else {
        None
    };

    let report = build_site(
        Path::new(&cfg.out_dir),
        &state,
        &stats,
        &scan,
        feed.as_ref(),
        Utc::now(),
    )?;
    println!("wrote {} files to {}", report.pages.len(), cfg.out_dir);
    if !report.manifest.issues.is_empty() {
        println!(
            "{} data consistency issue(s); run `uturn-tracker check` for details",
            report.manifest.issues.len()
        );
    }
    Ok(())
}

async fn stats(cfg: &Config) -> Result<()> {
    let state = AppState::load_or_empty(Path::new(&cfg.data_path));
    let stats = Stats::compute(&state, cfg.government_start, Utc::now().date_naive());

    let mut stdout = std::io::stdout();
    CounterAnimation::new(stats.total as u64)
        .play(&mut stdout, "U-turns")
        .await?;
    writeln!(stdout, "Days in power: {}", stats.days_in_power)?;
    writeln!(stdout, "U-turns per month: {}", stats.rate_display())?;
    writeln!(stdout, "Fastest U-turn (days): {}", stats.fastest_display())?;
    Ok(())
}

fn describe(outcome: &ScanOutcome) -> String {
    match outcome {
        ScanOutcome::NoNewUturns => "Scan complete: no new U-turns detected today.".to_string(),
        ScanOutcome::Found(list) => {
            let mut out = format!("Scan complete: {} possible new U-turn(s)", list.len());
            for c in list {
                out.push_str(&format!("\n  - {} ({}): {} -> {}", c.title, c.date, c.original_policy, c.reversal));
            }
            out
        }
        ScanOutcome::Unparsed { excerpt } => {
            format!("Scan finished but the response could not be read:\n{}", excerpt)
        }
        ScanOutcome::Info { last_updated, links } => {
            let mut out = format!("Live scanning is off. Data last updated {}.", last_updated);
            for l in links {
                out.push_str(&format!("\n  {}: {}", l.label, l.url));
            }
            out
        }
    }
}

async fn scan(cfg: &Config, args: &[String]) -> Result<()> {
    let mut store = LocalStore::new(&cfg.store_path)?;
    store.init()?;

    match args.first().map(String::as_str) {
        Some("--set-key") => {
            let key = args.get(1).ok_or_else(|| anyhow!("--set-key needs a value"))?;
            if !validate_credential(key) {
                eprintln!("that does not look like an API key (expected it to start with sk-ant-)");
                std::process::exit(2);
            }
            store.set(API_KEY_SLOT, key.trim())?;
            println!("API key saved to {}", cfg.store_path);
            return Ok(());
        }
        Some("--clear-key") => {
            if store.remove(API_KEY_SLOT)? {
                println!("stored API key removed");
            } else {
                println!("no stored API key");
            }
            return Ok(());
        }
        Some(other) => return Err(anyhow!("unknown scan option '{}'\n{}", other, USAGE)),
        None => {}
    }

    let state = AppState::load_or_empty(Path::new(&cfg.data_path));
    let kind = ScanKind::parse(&cfg.scan_mode);
    let credential = match cfg.api_key.clone() {
        Some(key) => Some(key),
        None => store.get(API_KEY_SLOT)?,
    };
    let provider = kind.build(cfg, credential, &state.last_updated)?;

    if let Some(last) = store.get(LAST_SCAN_SLOT)? {
        println!("Last scan: {}", last);
    }
    println!("Scanning ({})...", kind.as_str());

    match provider.scan(&mut StdoutProgress).await {
        Ok(outcome) => {
            println!("{}", describe(&outcome));
            if kind != ScanKind::Disabled {
                store.set(LAST_SCAN_SLOT, &ts_now())?;
            }
            Ok(())
        }
        Err(err) => match classify_failure(&err) {
            FailureKind::Auth => {
                eprintln!("Scan failed: credential problem ({:#}).", err);
                eprintln!("Run `uturn-tracker scan --clear-key` to remove the stored key.");
                std::process::exit(3);
            }
            FailureKind::Other => {
                eprintln!("Scan failed: {:#}", err);
                std::process::exit(4);
            }
        },
    }
}

fn check(cfg: &Config, args: &[String]) -> Result<()> {
    let state = match AppState::load(Path::new(&cfg.data_path)) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("could not load {}: {:#}", cfg.data_path, err);
            std::process::exit(1);
        }
    };

    if args.iter().any(|a| a == "--json") {
        println!("{}", serde_json::to_string_pretty(&state.issues)?);
    } else if state.issues.is_empty() {
        println!("{} records, no consistency issues", state.total_count());
    } else {
        for issue in &state.issues {
            println!("{}", issue);
        }
    }

    if !state.issues.is_empty() {
        std::process::exit(2);
    }
    Ok(())
}
