//! Hostname to project resolution.

use crate::config::ProjectConfig;
use regex::Regex;

/// A project with its host patterns compiled.
pub struct Project {
    pub config: ProjectConfig,
    patterns: Vec<CompiledPattern>,
}

struct CompiledPattern {
    regex: Regex,
    labels: usize,
}

/// How a hostname reached its project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    /// Matched a wildcard pattern with this many dot-separated labels.
    Pattern { labels: usize },
    /// Nothing matched; the default project was used.
    Fallback,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::Exact => "exact",
            MatchKind::Pattern { .. } => "pattern",
            MatchKind::Fallback => "fallback",
        }
    }
}

pub struct Resolution<'a> {
    pub project: &'a Project,
    pub kind: MatchKind,
}

/// Maps hostnames to projects: exact domains first, then patterns in
/// configuration order, then the default project.
pub struct ProjectResolver {
    projects: Vec<Project>,
    default_index: usize,
}

impl ProjectResolver {
    pub fn new(configs: &[ProjectConfig], default_index: usize) -> Result<Self, String> {
        if configs.is_empty() {
            return Err("No projects configured".to_string());
        }
        if default_index >= configs.len() {
            return Err(format!("Default project index {default_index} out of range"));
        }

        let mut projects = Vec::with_capacity(configs.len());
        for config in configs {
            projects.push(compile_project(config)?);
        }

        Ok(ProjectResolver {
            projects,
            default_index,
        })
    }

    pub fn resolve(&self, hostname: &str) -> Resolution<'_> {
        // Exact domains across every project win over any pattern.
        for project in &self.projects {
            if project.config.match_domains.iter().any(|d| d == hostname) {
                return Resolution {
                    project,
                    kind: MatchKind::Exact,
                };
            }
        }

        for project in &self.projects {
            if let Some(pattern) = project.patterns.iter().find(|p| p.regex.is_match(hostname)) {
                return Resolution {
                    project,
                    kind: MatchKind::Pattern {
                        labels: pattern.labels,
                    },
                };
            }
        }

        Resolution {
            project: &self.projects[self.default_index],
            kind: MatchKind::Fallback,
        }
    }

    pub fn default_project(&self) -> &Project {
        &self.projects[self.default_index]
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }
}

impl Project {
    pub fn name(&self) -> &str {
        &self.config.name
    }
}

fn compile_project(config: &ProjectConfig) -> Result<Project, String> {
    let patterns = config
        .match_patterns
        .iter()
        .map(|pattern| {
            compile_pattern(pattern).map_err(|e| {
                format!(
                    "Invalid match pattern '{}' in project '{}': {}",
                    pattern, config.name, e
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Project {
        config: config.clone(),
        patterns,
    })
}

/// `*` matches any run of characters (including none); everything else is literal.
fn compile_pattern(pattern: &str) -> Result<CompiledPattern, regex::Error> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Ok(CompiledPattern {
        regex: Regex::new(&format!("^{body}$"))?,
        labels: label_count(pattern),
    })
}

pub(crate) fn label_count(hostname: &str) -> usize {
    hostname.split('.').count()
}
