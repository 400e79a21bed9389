/*!
 * Operator console.
 *
 * A background thread reads stdin line by line and turns each line into
 * an action on the shared engine: pausing, resuming, skipping, rotating
 * or adding credentials, printing statistics, saving the cache and
 * stopping the run. A plain thread is used instead of a blocking task:
 * stdin may stay open forever and must not hold up runtime shutdown
 * when the run finishes first.
 */

use log::{info, warn};
use std::io::BufRead;
use std::sync::Arc;

use crate::engine::Engine;

const HELP: &str = "\
Commands:
  pause          hold the worker at the next checkpoint
  resume         release a pause
  skip file      abandon the current file, its output is still saved
  skip api       rotate to the next credential before the next call
  add api <key>  add a credential to the pool
  exhausted      blacklist the active credential and rotate away
  stats          print run statistics
  save cache     write the translation cache to disk now
  stop | exit    finish the current file, save, then end the run
  help           show this list";

/// Spawn the stdin command loop. The thread ends when stdin closes or
/// the operator types a stop command.
pub fn spawn(engine: Arc<Engine>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            if dispatch(&engine, &line) {
                break;
            }
        }
    })
}

/// Handle one console line. Returns true when the loop should end.
pub fn dispatch(engine: &Engine, line: &str) -> bool {
    let command = line.trim();
    if command.is_empty() {
        return false;
    }

    // Key material is case-sensitive, handle this one before folding
    if let Some(key) = command.strip_prefix("add api ") {
        engine.pool.add(key.trim());
        return false;
    }

    match command.to_ascii_lowercase().as_str() {
        "pause" => engine.control.request_pause(),
        "resume" => engine.control.resume(),
        "skip file" => engine.control.request_skip_file(),
        "skip api" => engine.control.request_skip_credential(),
        "stats" => println!("{}", engine.render_stats()),
        "save cache" => match engine.save_cache() {
            Ok(()) => info!("Cache saved"),
            Err(e) => warn!("Cache save failed: {:#}", e),
        },
        "exhausted" => match engine.pool.blacklist_active() {
            Ok(index) => info!("Active credential blacklisted, now using #{}", index),
            Err(e) => warn!("Could not blacklist the active credential: {}", e),
        },
        "stop" | "exit" => {
            engine.control.request_stop();
            return true;
        }
        "help" => println!("{}", HELP),
        _ => {
            warn!("Unknown command {:?}", command);
            println!("{}", HELP);
        }
    }
    false
}
