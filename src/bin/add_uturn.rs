use chrono::Utc;
use std::env;
use std::fs;
use std::path::Path;

use uturn_tracker::data::save_document;
use uturn_tracker::state::{AppState, Config, NewUturn};

fn main() {
    let cfg = Config::from_env();
    let record_path = match env::args().nth(1) {
        Some(p) => p,
        None => {
            eprintln!("usage: add_uturn <record.json>");
            std::process::exit(1);
        }
    };

    let raw = match fs::read_to_string(&record_path) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("failed to read {}: {}", record_path, err);
            std::process::exit(1);
        }
    };
    let new: NewUturn = match serde_json::from_str(&raw) {
        Ok(r) => r,
        Err(err) => {
            eprintln!("record is not valid JSON: {}", err);
            std::process::exit(2);
        }
    };
    if new.title.trim().is_empty() || new.minister.trim().is_empty() {
        eprintln!("record needs at least a title and a minister");
        std::process::exit(2);
    }

    let data_path = Path::new(&cfg.data_path);
    let mut state = match AppState::load(data_path) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("failed to load {}: {:#}", cfg.data_path, err);
            std::process::exit(3);
        }
    };

    let minister = new.minister.clone();
    let id = state.add_uturn(new, Utc::now());

    if let Err(err) = save_document(data_path, &state.to_document()) {
        eprintln!("failed to write {}: {:#}", cfg.data_path, err);
        std::process::exit(4);
    }

    println!(
        "added #{} ({} now has {}, {} total)",
        id,
        minister,
        state.minister_count(&minister),
        state.total_count()
    );
}
