//! Remove retained diff artifacts

use std::path::PathBuf;

use clap::Args;

use visreg_core::baseline::{BaselineStore, StoreConfig};

#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Directory of committed baseline images
    #[arg(long, default_value = "baselines")]
    baseline_dir: PathBuf,

    /// Output directory holding the diff artifacts
    #[arg(short, long, default_value = "test-results")]
    output: PathBuf,
}

pub fn execute(args: CleanArgs) -> anyhow::Result<bool> {
    let store = BaselineStore::new(StoreConfig {
        baseline_dir: args.baseline_dir,
        capture_dir: args.output.join("captures"),
        diff_dir: args.output.join("diffs"),
    })?;

    let removed = store.clean_diffs()?;
    println!("removed {removed} diff image(s)");
    Ok(true)
}
