mod args;
mod config;
mod reader;
mod runner;
mod writer;

use runner::ScriptRunner;
use ttl::Result;

fn main() -> Result {
    config::configure_app()?;

    log::debug!("Application configured. Beginning process...");

    let args = args::parse_input_args()?;
    log::debug!("Found input args: {args:?}");

    let ledger_config = config::load_ledger_config(args.config.as_deref())?;
    let mut runner = ScriptRunner::new(ledger_config)?;

    process_script(&args.script, &mut runner)?;

    log::debug!("Process complete. Beginning report...");

    report_to_std_out(&runner)?;

    log::debug!("Application finished successfully!");

    Ok(())
}

/// Run each command of the script in order; failed rows are logged and skipped
fn process_script(path: &std::path::Path, runner: &mut ScriptRunner) -> Result {
    for (row, command) in reader::read_script(path)?.enumerate() {
        let command = match command {
            Ok(command) => command,
            Err(e) => {
                log::warn!("Skipping script row {}: {e}", row + 1);
                continue;
            }
        };

        log::debug!("Running command: {command:?}");
        if let Err(e) = runner.run(command) {
            log::warn!("Command on script row {} failed: {e}", row + 1);
        }
    }

    Ok(())
}

/// Build report from results, and write report to stdout
fn report_to_std_out(runner: &ScriptRunner) -> Result {
    let report = runner.build_report()?;
    log::debug!("Successfully built reports for {} accounts", report.len());

    let output = writer::write_report(&report)?;

    log::debug!("Writing to stdout: {output:?}");
    print!("{}", output);

    Ok(())
}
