use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};

use packlet::packager::Packager;
use packlet::plan::BuildPlan;
use packlet::watcher::{watch, WatchEvent, WatchOptions};

use super::print_warnings;

pub fn cmd_watch(plan: &BuildPlan, json: bool) -> Result<()> {
    let mut roots: Vec<_> = plan
        .aliases
        .dirs()
        .filter(|dir| dir.is_dir())
        .map(|dir| dir.to_path_buf())
        .collect();
    if roots.is_empty() {
        roots.push(plan.root.clone());
    }
    roots.sort();
    roots.dedup();

    let options = WatchOptions {
        roots,
        ignore: vec![plan.out_dir.clone()],
    };

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
    })
    .context("cannot install the Ctrl+C handler")?;

    if !json {
        println!("packlet watch: {}", plan.identity.name());
        println!("Press Ctrl+C to stop\n");
    }

    let packager = Packager::new(plan);
    watch(
        &options,
        running,
        || {
            let report = packager.run()?;
            if !json {
                print_warnings(&report.warnings);
            }
            Ok(report)
        },
        |event| {
            if json {
                println!("{}", event.to_json());
                return;
            }
            match event {
                WatchEvent::WatchStarted { roots } => println!("watching {}", roots.join(", ")),
                WatchEvent::FileChanged { path } => println!("changed: {}", path),
                WatchEvent::BuildStarted => println!("building..."),
                WatchEvent::BuildComplete {
                    artifacts,
                    warnings,
                } => println!("✓ built {} artifacts, {} warning(s)", artifacts, warnings),
                WatchEvent::Error { message } => eprintln!("✗ {}", message),
                WatchEvent::Shutdown => println!("\nshutting down"),
            }
        },
    )?;
    Ok(())
}
