//! Built-in template bodies.
//!
//! Project templates under `.specify/templates/` always win; these are only used
//! when a project has not been initialized or a template was deleted. `specflow
//! init` writes them out so teams can edit them.

use crate::contract::{Warning, WarningCode};
use crate::error::Result;
use crate::paths;
use std::path::Path;

pub const SPEC_TEMPLATE: &str = "\
# Feature Specification

**Status**: Draft

## User Scenarios

<!-- Describe the primary user journeys this feature enables. -->

## Requirements

- **FR-001**:

## Success Criteria

## Open Questions
";

pub const PLAN_TEMPLATE: &str = "\
# Implementation Plan

## Summary

## Technical Context

**Language/Version**:
**Primary Dependencies**:
**Storage**:
**Testing**:

## Project Structure

## Phases

### Phase 0: Research

### Phase 1: Design and Contracts

### Phase 2: Task Planning
";

pub const TASKS_TEMPLATE: &str = "\
# Tasks

## Setup

- [ ] T001

## Tests First

## Core Implementation

## Polish
";

pub const TICKET_INTAKE_TEMPLATE: &str = "\
# Ticket Intake

## Summary

## Acceptance Criteria

## Notes
";

pub const TICKET_OVERVIEW: &str = "\
# Plan Overview

## Approach

## Risks
";

pub const TICKET_CHECKLIST: &str = "\
# Checklist

- [ ] Intake reviewed
- [ ] Plan written
- [ ] Code review
- [ ] Security review
- [ ] Test review
";

/// Body of `plan/step-NN.md`.
pub fn ticket_step(step: u32) -> String {
    format!("# Step {step:02}\n\n## Goal\n\n## Changes\n\n## Verification\n")
}

/// Built-in body for a project template file name, if there is one.
pub fn builtin(name: &str) -> Option<&'static str> {
    match name {
        paths::SPEC_TEMPLATE => Some(SPEC_TEMPLATE),
        paths::PLAN_TEMPLATE => Some(PLAN_TEMPLATE),
        paths::TASKS_TEMPLATE => Some(TASKS_TEMPLATE),
        paths::TICKET_INTAKE_TEMPLATE => Some(TICKET_INTAKE_TEMPLATE),
        _ => None,
    }
}

/// Every template `specflow init` writes, as `(file name, body)`.
pub fn all() -> [(&'static str, &'static str); 4] {
    [
        (paths::SPEC_TEMPLATE, SPEC_TEMPLATE),
        (paths::PLAN_TEMPLATE, PLAN_TEMPLATE),
        (paths::TASKS_TEMPLATE, TASKS_TEMPLATE),
        (paths::TICKET_INTAKE_TEMPLATE, TICKET_INTAKE_TEMPLATE),
    ]
}

/// Read `<repo_root>/.specify/templates/<name>` as raw bytes, falling back to
/// the built-in body with a `template_missing` warning. Project templates are
/// not required to be UTF-8.
pub fn load(repo_root: &Path, name: &str) -> Result<(Vec<u8>, Option<Warning>)> {
    let path = paths::template_path(repo_root, name);
    if path.is_file() {
        return Ok((std::fs::read(&path)?, None));
    }
    let warning = Warning::new(
        WarningCode::TemplateMissing,
        format!(
            "{} not found, using the built-in template (run 'specflow init' to customize)",
            path.display()
        ),
    );
    Ok((builtin(name).unwrap_or_default().as_bytes().to_vec(), Some(warning)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn project_template_wins_over_builtin() {
        let dir = TempDir::new().unwrap();
        let path = paths::template_path(dir.path(), paths::SPEC_TEMPLATE);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "# Ours\n").unwrap();
        let (body, warning) = load(dir.path(), paths::SPEC_TEMPLATE).unwrap();
        assert_eq!(body, b"# Ours\n");
        assert!(warning.is_none());
    }

    #[test]
    fn non_utf8_template_is_read_as_is() {
        let dir = TempDir::new().unwrap();
        let path = paths::template_path(dir.path(), paths::SPEC_TEMPLATE);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"# Caf\xE9\n").unwrap();
        let (body, warning) = load(dir.path(), paths::SPEC_TEMPLATE).unwrap();
        assert_eq!(body, b"# Caf\xE9\n");
        assert!(warning.is_none());
    }

    #[test]
    fn missing_template_falls_back_with_warning() {
        let dir = TempDir::new().unwrap();
        let (body, warning) = load(dir.path(), paths::PLAN_TEMPLATE).unwrap();
        assert_eq!(body, PLAN_TEMPLATE.as_bytes());
        assert_eq!(warning.unwrap().code, WarningCode::TemplateMissing);
    }

    #[test]
    fn every_project_template_has_a_builtin() {
        for (name, body) in all() {
            assert_eq!(builtin(name), Some(body));
        }
        assert_eq!(builtin("unknown.md"), None);
    }

    #[test]
    fn step_numbers_are_padded() {
        assert!(ticket_step(3).starts_with("# Step 03"));
    }
}
