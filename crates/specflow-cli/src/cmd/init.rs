use crate::output::{print_json, print_path_status};
use anyhow::Context;
use serde::Serialize;
use specflow_core::{config::Config, io, paths, templates};
use std::path::{Path, PathBuf};

#[derive(Serialize, Default)]
struct InitReport {
    root: PathBuf,
    created: Vec<PathBuf>,
    existing: Vec<PathBuf>,
}

impl InitReport {
    fn record(&mut self, path: PathBuf, created: bool) {
        if created {
            self.created.push(path);
        } else {
            self.existing.push(path);
        }
    }
}

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let mut report = InitReport {
        root: root.to_path_buf(),
        ..Default::default()
    };

    // 1. .specify/ and .specify/templates/
    for dir in [paths::SPECIFY_DIR, paths::TEMPLATES_DIR] {
        let p = root.join(dir);
        let created =
            io::ensure_dir(&p).with_context(|| format!("failed to create {}", p.display()))?;
        report.record(p, created);
    }

    // 2. config.yaml, only if missing
    let config_path = paths::config_path(root);
    let body = serde_yaml::to_string(&Config::default()).context("failed to render config")?;
    let created = io::write_if_missing(&config_path, body.as_bytes())
        .with_context(|| format!("failed to write {}", config_path.display()))?;
    report.record(config_path, created);

    // 3. templates, only if missing
    for (name, body) in templates::all() {
        let p = paths::template_path(root, name);
        let created = io::write_if_missing(&p, body.as_bytes())
            .with_context(|| format!("failed to write {}", p.display()))?;
        report.record(p, created);
    }

    if json {
        return print_json(&report);
    }

    println!("Initializing specflow in: {}", root.display());
    for p in &report.created {
        print_path_status(root, p, true);
    }
    for p in &report.existing {
        print_path_status(root, p, false);
    }
    println!("\nNext: specflow create \"<short feature description>\"");
    Ok(())
}
