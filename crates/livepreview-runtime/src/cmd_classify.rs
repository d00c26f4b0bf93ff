//! `livepreview classify`: offline impact decision for a patch.

use anyhow::Context;
use livepreview_core::classify_impact;
use livepreview_runtime::settings::load_document;

use crate::cli::ClassifyOpts;

pub fn cmd_classify(opts: &ClassifyOpts) -> anyhow::Result<()> {
    let active = load_document(&opts.active).context("loading active config")?;
    let patch = load_document(&opts.patch).context("loading patch")?;
    let decision = classify_impact(patch.as_map(), &active);
    println!("{decision}");
    Ok(())
}
