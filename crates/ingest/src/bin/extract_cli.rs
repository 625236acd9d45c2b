use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader};

use ingest::{EventOutcome, SessionTracker, events_from_reader};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("usage: extract_cli <path|-> [worktree]");
        std::process::exit(2);
    }

    let path = &args[1];
    let reader: Box<dyn BufRead> = if path == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file = File::open(path).unwrap_or_else(|err| {
            eprintln!("failed to open {}: {}", path, err);
            std::process::exit(1);
        });
        Box::new(BufReader::new(file))
    };

    let events = events_from_reader(reader).unwrap_or_else(|err| {
        eprintln!("failed to read events: {}", err);
        std::process::exit(1);
    });

    let worktree = args.get(2).map(String::as_str).unwrap_or("unknown");
    let mut tracker = SessionTracker::for_worktree(worktree);
    let mut emitted = 0usize;
    for event in &events {
        if let EventOutcome::Record(record) = tracker.handle(event) {
            match serde_json::to_string(&record) {
                Ok(line) => println!("{}", line),
                Err(err) => {
                    eprintln!("failed to encode record: {}", err);
                    std::process::exit(1);
                }
            }
            emitted += 1;
        }
    }

    if emitted == 0 {
        eprintln!("no completed assistant turns found");
        std::process::exit(3);
    }
}
