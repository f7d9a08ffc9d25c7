use crate::output::print_json;
use anyhow::Context;
use specflow_core::feature::{self, FeaturePaths};
use specflow_core::vcs::GitCli;
use std::path::Path;

fn locate(root: &Path, feature_name: Option<&str>) -> anyhow::Result<FeaturePaths> {
    let config = super::load_config(root)?;
    let vcs = GitCli::new(root);
    Ok(feature::locate(root, &config, &vcs, feature_name)?)
}

pub fn paths(root: &Path, feature_name: Option<&str>, json: bool) -> anyhow::Result<()> {
    let fp = locate(root, feature_name)?;
    if json {
        print_json(&fp)?;
    } else {
        print!("{}", fp.to_lines());
    }
    Ok(())
}

pub fn plan(root: &Path, feature_name: Option<&str>, json: bool) -> anyhow::Result<()> {
    let fp = locate(root, feature_name)?;
    let setup = feature::setup_plan(fp).context("failed to set up plan")?;
    if json {
        return print_json(&setup);
    }
    println!("FEATURE_SPEC: {}", setup.paths.feature_spec.display());
    println!("IMPL_PLAN: {}", setup.paths.impl_plan.display());
    println!("SPECS_DIR: {}", setup.paths.feature_dir.display());
    println!("BRANCH: {}", setup.paths.branch);
    for w in &setup.warnings {
        println!("WARNING: [{}] {}", w.code, w.message);
    }
    Ok(())
}

pub fn check(root: &Path, feature_name: Option<&str>, json: bool) -> anyhow::Result<()> {
    let fp = locate(root, feature_name)?;
    let report = feature::check_prerequisites(&fp)?;
    if json {
        return print_json(&report);
    }
    println!("FEATURE_DIR: {}", report.feature_dir.display());
    println!("AVAILABLE_DOCS:");
    for doc in ["research.md", "data-model.md", "contracts/", "quickstart.md"] {
        let mark = if report.available_docs.iter().any(|d| d == doc) {
            "✓"
        } else {
            "✗"
        };
        println!("  {mark} {doc}");
    }
    Ok(())
}
