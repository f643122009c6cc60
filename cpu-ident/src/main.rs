mod cli;
mod error;

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use cpu_ident_core::report::{format_run_line, RunRecord};
use cpu_ident_core::{Engine, ReferenceIndex, WindowScanner};

use cli::{Action, ScanArgs, WholeArgs};

fn main() -> ExitCode {
    env_logger::init();

    use clap::Parser;
    let opt = cli::Opt::parse();

    let result = match opt.action {
        Action::Scan(args) => do_scan_action(args),
        Action::Whole(args) => do_whole_action(args),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("cpu-ident: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(true)` if every file was opened and analyzed (regardless of
/// verdict), `Ok(false)` if any file could not be opened. A `None` verdict
/// is a normal outcome, not a reason to fail.
fn do_scan_action(args: ScanArgs) -> error::Result<bool> {
    let index = ReferenceIndex::load(&args.corpus_args.corpus)?;
    let step = args.step.unwrap_or(args.window);
    if args.window == 0 || step == 0 {
        return Err(error::CliError::ZeroWindow);
    }
    let engine = Engine::new(index).with_scanner(WindowScanner::new(args.window, step));

    let mut all_opened = true;
    for path in &args.files {
        match fs::read(path) {
            Ok(data) => {
                let runs = engine.segment(&data);
                if args.files.len() > 1 {
                    println!("{}:", path.display());
                }
                for run in &runs {
                    if args.json {
                        let record = RunRecord::from(run);
                        println!("{}", serde_json::to_string(&record).unwrap());
                    } else {
                        println!("{}", format_run_line(run));
                    }
                }
            }
            Err(err) => {
                eprintln!("cpu-ident: could not open {:?}: {}", path, err);
                all_opened = false;
            }
        }
    }
    Ok(all_opened)
}

fn do_whole_action(args: WholeArgs) -> error::Result<bool> {
    let index = ReferenceIndex::load(&args.corpus_args.corpus)?;
    let engine = Engine::new(index);

    let mut all_opened = true;
    for path in &args.files {
        match fs::read(path) {
            Ok(data) => {
                let verdict = engine.classify_whole(&data);
                print_whole_verdict(path, &verdict, args.json);
            }
            Err(err) => {
                eprintln!("cpu-ident: could not open {:?}: {}", path, err);
                all_opened = false;
            }
        }
    }
    Ok(all_opened)
}

fn print_whole_verdict(path: &Path, verdict: &cpu_ident_core::Verdict, json: bool) {
    if json {
        let record = serde_json::json!({
            "file": path,
            "label": verdict.label,
            "confident": verdict.confident,
        });
        println!("{}", serde_json::to_string(&record).unwrap());
    } else {
        let label = verdict.label.as_deref().unwrap_or("None");
        println!("{}: {}", path.display(), label);
    }
}
