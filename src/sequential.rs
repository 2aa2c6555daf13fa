use crate::journal::{JournalSummary, process_journal};
use crate::utils::{ExportConfig, discover_journals, make_bar, report_totals};
use eyre::Result;

/// Convert every journal in the source folder one after the other.
pub fn execute(config: ExportConfig) -> Result<()> {
    let journals = discover_journals(&config.source_dir)?;
    let pb = make_bar(config.quiet)?;

    if !config.quiet {
        pb.println(format!("Found {} journal export(s).", journals.len()));
    }

    let mut totals = JournalSummary::default();
    let mut count_errors = 0usize;

    for path in &journals {
        if config.verbose > 0 {
            pb.println(format!("Begin processing entries for '{}'", path.display()));
        }
        match process_journal(path, &config, &pb) {
            Ok(summary) => totals += summary,
            Err(e) => {
                count_errors += 1;
                pb.println(format!("Error [{}]: {:#}", path.display(), e));
            }
        }
    }

    pb.finish_and_clear();

    if !config.quiet {
        report_totals(&totals, journals.len(), count_errors);
    }

    Ok(())
}
