// ==============================================================================
// `send-cli check`: validate a manifest
// ==============================================================================
//
// Compiles every type in the manifest and reports what would keep a method
// out of dispatch, oversized expansions, and fatal configuration errors,
// followed by a one-line summary.

use std::error::Error;

use send_core::compile;

use crate::{load, ManifestArgs};

/// Entry point for `send-cli check`. Returns whether there were no errors.
pub fn run_check(args: &ManifestArgs) -> Result<bool, Box<dyn Error>> {
    let Some(loaded) = load(args)? else {
        return Ok(false);
    };

    let mut errors = 0usize;
    let mut warnings = 0usize;
    let mut dispatchable = 0usize;

    for decl in &loaded.decls {
        match compile(decl, &loaded.options) {
            Ok(compiled) => {
                for diag in &compiled.diagnostics {
                    println!("warning: {diag}");
                }
                warnings += compiled.diagnostics.len();
                dispatchable += compiled.plan.entry_count();
            }
            Err(err) => {
                eprintln!("{:?}", loaded.report(err));
                errors += 1;
            }
        }
    }

    println!(
        "checked {} types in {}: {dispatchable} dispatch entries, {errors} errors, {warnings} warnings",
        loaded.decls.len(),
        loaded.name,
    );

    Ok(errors == 0)
}
