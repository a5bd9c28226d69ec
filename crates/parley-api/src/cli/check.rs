//! Backend reachability check.

use anyhow::{Result, bail};
use console::style;

use parley_infra::backend::check_backends;

use crate::state::AppState;

/// Reach each store and print one line per store.
///
/// Fails if any store could not answer.
pub async fn check(state: &AppState) -> Result<()> {
    let results = check_backends(&state.coordinator).await;

    println!();
    println!(
        "  {} backend: {}",
        style("Parley").bold(),
        style(state.config.backend.kind).cyan()
    );
    println!();

    let mut failed = 0;
    for (store, result) in &results {
        match result {
            Ok(()) => println!("  {} {store}", style("✓").green()),
            Err(e) => {
                failed += 1;
                println!("  {} {store}: {e}", style("✗").red());
            }
        }
    }
    println!();

    if failed > 0 {
        bail!("{failed} of {} stores unreachable", results.len());
    }
    Ok(())
}
