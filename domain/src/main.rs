use std::env;
use std::io::{self, BufRead, Write};
use std::process;

use domain::adapters::memory_repo::{InMemoryStore, SequentialIds};
use domain::ops::Operation;
use domain::service::KanbanService;
use domain::Clock;

/// Card stamp format: local wall-clock time with microseconds.
const CREATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Local time, formatted the same way the server stamps cards.
struct LocalClock;
impl Clock for LocalClock {
    fn timestamp(&self) -> String {
        chrono::Local::now().format(CREATED_FORMAT).to_string()
    }
}

type DemoService = KanbanService<InMemoryStore, SequentialIds, LocalClock>;

/// Counts reported once stdin is exhausted.
#[derive(Debug, Default, PartialEq, Eq)]
struct Summary {
    ops: usize,
    writes: usize,
    errors: usize,
}

fn print_usage() {
    eprintln!(
        "{}\n\nUsage:\n  domain < ops.jsonl\n\nEach stdin line is one JSON operation, for example:\n  {{\"op\":\"addBoard\",\"title\":\"Sprint\"}}\n  {{\"op\":\"addColumn\",\"title\":\"Todo\",\"board\":\"demo-000001\",\"order\":0}}\n  {{\"op\":\"columns\",\"board\":\"demo-000001\"}}\n\nNotes:\n  - This demo CLI uses an in-memory store; data lives for one run only.",
        domain::about()
    );
}

/// Execute every operation line from `input`, writing one JSON reply per line.
fn process_lines<R: BufRead, W: Write>(
    svc: &DemoService,
    input: R,
    out: &mut W,
) -> Result<Summary, String> {
    let mut summary = Summary::default();
    for line in input.lines() {
        let line = line.map_err(|e| format!("read stdin: {}", e))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let reply = match serde_json::from_str::<Operation>(trimmed) {
            Ok(op) => {
                summary.ops += 1;
                let name = op.name();
                if op.is_mutation() {
                    summary.writes += 1;
                }
                match svc.execute(op) {
                    Ok(outcome) => serde_json::to_value(outcome)
                        .unwrap_or_else(|e| serde_json::json!({ "op": name, "error": e.to_string() })),
                    Err(e) => {
                        summary.errors += 1;
                        serde_json::json!({ "op": name, "error": e.to_string() })
                    }
                }
            }
            Err(e) => {
                summary.errors += 1;
                serde_json::json!({ "error": format!("invalid operation: {}", e) })
            }
        };
        writeln!(out, "{}", reply).map_err(|e| format!("write stdout: {}", e))?;
    }
    Ok(summary)
}

fn run() -> Result<(), String> {
    if let Some(arg) = env::args().nth(1) {
        if arg == "--help" || arg == "-h" {
            print_usage();
            return Ok(());
        }
        return Err(format!("unknown argument: {}", arg));
    }

    let svc = KanbanService::new(InMemoryStore::new(), SequentialIds::new("demo"), LocalClock);
    let stdin = io::stdin();
    let stdout = io::stdout();
    let summary = process_lines(&svc, stdin.lock(), &mut stdout.lock())?;
    eprintln!(
        "{} operations ({} writes, {} errors)",
        summary.ops, summary.writes, summary.errors
    );
    Ok(())
}

fn main() {
    if let Err(msg) = run() {
        eprintln!("error: {}", msg);
        process::exit(1);
    }
}
