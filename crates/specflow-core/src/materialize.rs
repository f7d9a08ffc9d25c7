//! Workspace materialization: run the selected plan and make sure the feature
//! skeleton exists.
//!
//! Every file goes through [`io::write_if_missing`]; nothing here deletes,
//! truncates or rewrites existing content. A worktree that already holds the
//! branch is reused as is. A failed worktree is not fatal: the feature is
//! created on a branch in place and the fallback is reported.

use crate::config::{PlacementStrategy, WorkflowMode};
use crate::contract::{Warning, WarningCode};
use crate::error::{Result, SpecflowError};
use crate::identifier::FeatureIdentifier;
use crate::io;
use crate::paths;
use crate::strategy::Strategy;
use crate::templates;
use crate::vcs::Vcs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where a feature ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceLocation {
    pub root_path: PathBuf,
    pub spec_dir: PathBuf,
    pub spec_file: PathBuf,
    pub mode: WorkflowMode,
    pub placement: Option<PlacementStrategy>,
    pub created: Vec<PathBuf>,
    pub warnings: Vec<Warning>,
}

/// Paths created by [`ensure_skeleton`]; empty on a rerun.
#[derive(Debug, Default)]
pub struct Skeleton {
    pub created: Vec<PathBuf>,
    pub warnings: Vec<Warning>,
}

pub struct Materializer<'a> {
    vcs: Option<&'a dyn Vcs>,
    repo_root: &'a Path,
}

impl<'a> Materializer<'a> {
    /// `vcs` is `None` when version control is disabled or unavailable; the
    /// feature then gets directories only.
    pub fn new(vcs: Option<&'a dyn Vcs>, repo_root: &'a Path) -> Self {
        Self { vcs, repo_root }
    }

    /// Execute `strategy` for `id`. `branch_exists` says whether a local branch
    /// of that name was already observed.
    pub fn materialize(
        &self,
        strategy: &Strategy,
        id: &FeatureIdentifier,
        branch_exists: bool,
    ) -> Result<WorkspaceLocation> {
        let mut warnings = Vec::new();
        let mut created = Vec::new();

        let (root_path, mode, placement) = match strategy {
            Strategy::Branch => {
                self.branch_in_place(&id.branch_name, branch_exists, &mut warnings)?;
                (self.repo_root.to_path_buf(), WorkflowMode::Branch, None)
            }
            Strategy::Worktree { placement, .. } => {
                let target = strategy.target_path(self.repo_root, &id.branch_name);
                let attached = if branch_exists {
                    self.attached_worktree(&id.branch_name)
                } else {
                    None
                };
                if let Some(existing) = attached {
                    if !same_path(&existing, &target) {
                        warnings.push(Warning::new(
                            WarningCode::BranchExists,
                            format!(
                                "branch {} is already checked out at {}; using that worktree",
                                id.branch_name,
                                existing.display()
                            ),
                        ));
                    }
                    debug!(path = %existing.display(), "reusing existing worktree");
                    (existing, WorkflowMode::Worktree, Some(*placement))
                } else {
                    match self.add_worktree(&target, &id.branch_name, branch_exists) {
                        Ok(()) => {
                            created.push(target.clone());
                            if *placement == PlacementStrategy::Nested {
                                self.ignore_nested_worktrees(&mut created, &mut warnings);
                            }
                            (target, WorkflowMode::Worktree, Some(*placement))
                        }
                        Err(e) => {
                            warnings.push(Warning::new(
                                WarningCode::WorktreeFallback,
                                format!(
                                    "worktree at {} could not be created ({e}); created branch {} in place instead",
                                    target.display(),
                                    id.branch_name
                                ),
                            ));
                            self.fall_back_in_place(&id.branch_name, branch_exists, &mut warnings)?;
                            (self.repo_root.to_path_buf(), WorkflowMode::Branch, None)
                        }
                    }
                }
            }
        };

        let skeleton = ensure_skeleton(&root_path, self.repo_root, &id.branch_name)?;
        created.extend(skeleton.created);
        warnings.extend(skeleton.warnings);

        let spec_dir = paths::spec_dir(&root_path, &id.branch_name);
        let spec_file = spec_dir.join(paths::SPEC_FILE);
        Ok(WorkspaceLocation {
            root_path,
            spec_dir,
            spec_file,
            mode,
            placement,
            created,
            warnings,
        })
    }

    fn branch_in_place(
        &self,
        branch: &str,
        exists: bool,
        warnings: &mut Vec<Warning>,
    ) -> Result<()> {
        let Some(vcs) = self.vcs else {
            debug!(branch, "version control disabled, skipping branch creation");
            return Ok(());
        };
        if exists {
            let current = vcs.current_branch().ok().flatten();
            if current.as_deref() == Some(branch) {
                warnings.push(Warning::new(
                    WarningCode::BranchExists,
                    format!("branch {branch} already exists and is checked out"),
                ));
                return Ok(());
            }
            vcs.checkout_branch(branch)?;
            info!(branch, "checked out existing branch");
            warnings.push(Warning::new(
                WarningCode::BranchExists,
                format!("branch {branch} already exists; checked it out instead of creating it"),
            ));
            return Ok(());
        }
        vcs.create_branch(branch)?;
        info!(branch, "created branch");
        Ok(())
    }

    /// `git worktree add -b` may create the branch before it rejects the path,
    /// so a branch that appeared during the attempt is checked out, not created.
    fn fall_back_in_place(
        &self,
        branch: &str,
        existed_before: bool,
        warnings: &mut Vec<Warning>,
    ) -> Result<()> {
        if let (Some(vcs), false) = (self.vcs, existed_before) {
            if self.branch_exists(branch) {
                vcs.checkout_branch(branch)?;
                info!(branch, "checked out branch left by failed worktree attempt");
                return Ok(());
            }
        }
        self.branch_in_place(branch, existed_before, warnings)
    }

    fn add_worktree(&self, target: &Path, branch: &str, branch_exists: bool) -> Result<()> {
        let vcs = self.vcs.ok_or_else(|| SpecflowError::VcsCommand {
            step: "create worktree".to_string(),
            detail: "version control is not available".to_string(),
        })?;
        vcs.add_worktree(target, branch, !branch_exists)?;
        info!(branch, path = %target.display(), "created worktree");
        Ok(())
    }

    /// Runs only once the nested worktree exists, so a fallback leaves
    /// `.gitignore` untouched.
    fn ignore_nested_worktrees(&self, created: &mut Vec<PathBuf>, warnings: &mut Vec<Warning>) {
        let entry = format!("{}/", paths::NESTED_WORKTREES_DIR);
        match io::ensure_gitignore_entry(self.repo_root, &entry) {
            Ok(true) => created.push(self.repo_root.join(".gitignore")),
            Ok(false) => {}
            Err(e) => warnings.push(Warning::new(
                WarningCode::ArtifactFailed,
                format!("could not add {entry} to .gitignore: {e}"),
            )),
        }
    }

    /// Path of a linked worktree that already has `branch` checked out. The
    /// main checkout does not count.
    fn attached_worktree(&self, branch: &str) -> Option<PathBuf> {
        let entries = self.vcs?.list_worktrees().ok()?;
        entries
            .into_iter()
            .filter(|e| e.branch.as_deref() == Some(branch))
            .map(|e| PathBuf::from(e.path))
            .find(|p| !same_path(p, self.repo_root))
    }

    fn branch_exists(&self, branch: &str) -> bool {
        self.vcs
            .and_then(|vcs| vcs.local_branches().ok())
            .is_some_and(|names| names.iter().any(|n| n == branch))
    }
}

/// Ensure `<root_path>/specs/<branch>/spec.md` exists, seeding it from the
/// project template under `template_root`. Existing files are left untouched,
/// so a second call creates nothing.
pub fn ensure_skeleton(
    root_path: &Path,
    template_root: &Path,
    branch_name: &str,
) -> Result<Skeleton> {
    let mut skeleton = Skeleton::default();
    let spec_dir = paths::spec_dir(root_path, branch_name);
    let spec_file = spec_dir.join(paths::SPEC_FILE);

    if io::ensure_dir(&spec_dir).map_err(|e| into_fatal("create spec directory", &spec_dir, e))? {
        skeleton.created.push(spec_dir.clone());
    }

    if spec_file.exists() {
        debug!(path = %spec_file.display(), "spec file exists, leaving it as is");
        return Ok(skeleton);
    }

    let (body, warning) = templates::load(template_root, paths::SPEC_TEMPLATE)?;
    skeleton.warnings.extend(warning);
    if io::write_if_missing(&spec_file, &body)
        .map_err(|e| into_fatal("write spec file", &spec_file, e))?
    {
        info!(path = %spec_file.display(), "created spec file");
        skeleton.created.push(spec_file);
    }
    Ok(skeleton)
}

fn same_path(a: &Path, b: &Path) -> bool {
    a == b
        || matches!(
            (a.canonicalize(), b.canonicalize()),
            (Ok(x), Ok(y)) if x == y
        )
}

/// Promote a plain I/O failure on the primary artifact to `FatalIo`.
pub(crate) fn into_fatal(step: &str, path: &Path, e: SpecflowError) -> SpecflowError {
    match e {
        SpecflowError::Io(source) => SpecflowError::fatal_io(step, path, source),
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
