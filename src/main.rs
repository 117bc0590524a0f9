//! `gh-issues-local` - Local GitHub Issues REST API
//!
//! Serves the GitHub Issues endpoints from a single JSONL file so that
//! GitHub clients can run against a private, offline issue tracker.

use gh_issues_local::run;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
