// ==============================================================================
// `send-cli plan`: print compiled dispatch plans
// ==============================================================================

use std::error::Error;

use send_core::compile;

use crate::{load, ManifestArgs};

/// Entry point for `send-cli plan`. Returns whether every type compiled.
pub fn run_plan(args: &ManifestArgs) -> Result<bool, Box<dyn Error>> {
    let Some(loaded) = load(args)? else {
        return Ok(false);
    };

    let mut ok = true;
    for decl in &loaded.decls {
        match compile(decl, &loaded.options) {
            Ok(compiled) => {
                print!("{}", compiled.plan);
                for diag in &compiled.diagnostics {
                    eprintln!("warning: {diag}");
                }
            }
            Err(err) => {
                eprintln!("{:?}", loaded.report(err));
                ok = false;
            }
        }
    }

    Ok(ok)
}
