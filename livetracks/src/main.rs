mod cli;

use std::path::PathBuf;
use std::process::exit;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::Context;
use env_logger::Env;
use livetracks_core::{plan_steps, remove_active_scratch, run, Config, Step};
use log::{info, warn};

use crate::cli::{build_cli, parse_list_format};

/// Exit status after SIGINT, SIGTERM or SIGHUP.
const INTERRUPTED_STATUS: i32 = 130;

fn main() {
    env_logger::init_from_env(Env::new().default_filter_or("info"));

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupt_flag = Arc::clone(&interrupted);
    if let Err(err) = ctrlc::set_handler(move || {
        interrupt_flag.store(true, Ordering::SeqCst);
        remove_active_scratch();
        exit(INTERRUPTED_STATUS);
    }) {
        warn!("could not install the interrupt handler: {err}");
    }

    let result = try_main();

    // The interrupted tool usually dies with us; leave the exit to the handler.
    if interrupted.load(Ordering::SeqCst) {
        loop {
            thread::park();
        }
    }

    if let Err(err) = result {
        println!("{err:#}");
        exit(1);
    }
}

fn try_main() -> anyhow::Result<()> {
    let matches = build_cli().get_matches();

    let output_dir = matches
        .get_one::<PathBuf>("output")
        .expect("defaulted argument");
    let ffmpeg = matches
        .get_one::<PathBuf>("ffmpeg")
        .expect("defaulted argument");

    let mut builder = Config::builder(output_dir)
        .ffmpeg(ffmpeg)
        .codec(matches.get_one::<String>("codec").cloned());
    if let Some(channels) = matches.get_many::<String>("channels") {
        builder = builder.inline_channels(channels.cloned());
    }
    if let Some(list) = matches.get_one::<PathBuf>("list") {
        let format = matches
            .get_one::<String>("list-format")
            .and_then(|value| parse_list_format(value));
        builder = builder.channel_list(list, format);
    }
    if let Some(files) = matches.get_many::<PathBuf>("files") {
        builder = builder.input_files(files.cloned());
    }
    let config = builder.build()?;

    if matches.get_flag("dry-run") {
        let steps = plan_steps(&config)?;
        println!("Dry run: would run {} command(s):", steps.len());
        for step in &steps {
            if let Step::Merge {
                manifest_path,
                manifest,
                ..
            } = step
            {
                println!("  write {}:", manifest_path.display());
                for line in manifest.render().lines() {
                    println!("    {line}");
                }
            }
            println!("  {}", step.invocation());
        }
        return Ok(());
    }

    let report = run(config)
        .with_context(|| format!("failed to extract tracks into '{}'", output_dir.display()))?;
    info!(
        "wrote {} track(s) to {} ({} extract, {} merge call(s))",
        report.tracks.len(),
        output_dir.display(),
        report.extract_calls,
        report.merge_calls
    );

    Ok(())
}
