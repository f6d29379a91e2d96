//! Baseline maintenance
//!
//! Promoting captures to baselines is a deliberate, separate action; runs
//! never do it implicitly outside `--update-baselines`.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use visreg_core::baseline::{BaselineStore, StoreConfig};

#[derive(Subcommand, Debug)]
pub enum BaselineCommands {
    /// Promote retained captures to baselines
    Update(UpdateArgs),
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Scenario to promote; all retained captures when omitted
    name: Option<String>,

    /// Directory of committed baseline images
    #[arg(long, default_value = "baselines")]
    baseline_dir: PathBuf,

    /// Output directory the captures were retained under
    #[arg(short, long, default_value = "test-results")]
    output: PathBuf,
}

pub fn execute(command: BaselineCommands) -> anyhow::Result<bool> {
    match command {
        BaselineCommands::Update(args) => {
            let store = BaselineStore::new(StoreConfig {
                baseline_dir: args.baseline_dir,
                capture_dir: args.output.join("captures"),
                diff_dir: args.output.join("diffs"),
            })?;

            match args.name {
                Some(name) => {
                    let path = store.promote(&name)?;
                    println!("updated {}", path.display());
                }
                None => {
                    let promoted = store.promote_all()?;
                    if promoted.is_empty() {
                        println!("no retained captures to promote");
                    } else {
                        for name in &promoted {
                            println!("updated {}", store.baseline_path(name).display());
                        }
                    }
                }
            }

            Ok(true)
        }
    }
}
