use crate::journal::{JournalSummary, process_journal};
use crate::utils::{ExportConfig, discover_journals, make_bar, report_totals};
use crossbeam_channel::bounded;
use eyre::{Result, eyre};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Convert every journal in the source folder on a pool of worker threads.
///
/// Journals never share output folders or link indexes, so each one is
/// handed whole to a single worker.
pub fn execute(config: ExportConfig) -> Result<()> {
    let journals = discover_journals(&config.source_dir)?;
    if journals.is_empty() {
        if !config.quiet {
            eprintln!(
                "No journal exports found in {}",
                config.source_dir.display()
            );
        }
        return Ok(());
    }

    let pb = make_bar(config.quiet)?;
    let (tx, rx) = bounded::<PathBuf>(32);
    let count_errors = AtomicUsize::new(0);
    let n_workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(journals.len());

    let totals = std::thread::scope(|s| {
        let mut handles = Vec::with_capacity(n_workers);
        for _ in 0..n_workers {
            let rx = rx.clone();
            let (config, pb, count_errors) = (&config, &pb, &count_errors);

            handles.push(s.spawn(move || {
                let mut summary = JournalSummary::default();
                while let Ok(path) = rx.recv() {
                    match process_journal(&path, config, pb) {
                        Ok(done) => summary += done,
                        Err(e) => {
                            count_errors.fetch_add(1, Ordering::Relaxed);
                            pb.println(format!("Error [{}]: {:#}", path.display(), e));
                        }
                    }
                }
                summary
            }));
        }

        drop(rx);

        for path in &journals {
            if tx.send(path.clone()).is_err() {
                break;
            }
        }

        drop(tx);

        let mut totals = JournalSummary::default();
        for handle in handles {
            totals += handle
                .join()
                .map_err(|_| eyre!("A journal worker panicked"))?;
        }
        Ok::<_, eyre::Error>(totals)
    })?;

    pb.finish_and_clear();

    if !config.quiet {
        report_totals(
            &totals,
            journals.len(),
            count_errors.load(Ordering::Relaxed),
        );
    }

    Ok(())
}
