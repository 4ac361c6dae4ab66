//! Quality probe seam
//!
//! The snapshot embeds one [`QualityMetrics`] record produced by a
//! replaceable probe. The assembler only depends on the call shape;
//! the bundled heuristic keeps fresh snapshots from carrying zeros.

use crate::core::error::Result;
use crate::snapshot::types::QualityMetrics;
use once_cell::sync::Lazy;
use regex::Regex;

/// One file handed to the probe
#[derive(Debug, Clone)]
pub struct QualityFileInput {
    pub rel_path: String,
    pub source: String,
}

/// Replaceable analysis service consumed by the assembler
pub trait QualityProbe: Send + Sync {
    fn analyze(&self, files: &[QualityFileInput]) -> Result<QualityMetrics>;
}

static BRANCH_TOKENS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:if|for|while|switch|catch)\b|&&|\|\|").unwrap());

/// File length beyond which a file is flagged as oversized
const LONG_FILE_LINES: usize = 400;

/// Default probe: size, branching density and comment density rolled
/// into 0–100 scores. The formula is deliberately simple; callers that
/// need a real analyzer supply their own [`QualityProbe`].
pub struct HeuristicProbe;

impl QualityProbe for HeuristicProbe {
    fn analyze(&self, files: &[QualityFileInput]) -> Result<QualityMetrics> {
        if files.is_empty() {
            return Ok(QualityMetrics::default());
        }

        let mut total_lines = 0usize;
        let mut total_branches = 0usize;
        let mut total_comment_lines = 0usize;
        let mut issues: Vec<(usize, String)> = Vec::new();

        for file in files {
            let lines = file.source.lines().count();
            let branches = BRANCH_TOKENS.find_iter(&file.source).count();
            let comment_lines = file
                .source
                .lines()
                .filter(|l| {
                    let t = l.trim_start();
                    t.starts_with("//") || t.starts_with("/*") || t.starts_with('*')
                })
                .count();

            total_lines += lines;
            total_branches += branches;
            total_comment_lines += comment_lines;

            if lines > LONG_FILE_LINES {
                issues.push((lines, format!("{}: {} lines", file.rel_path, lines)));
            }
            if lines > 0 && branches * 10 > lines * 3 {
                issues.push((
                    branches,
                    format!("{}: dense branching ({} sites)", file.rel_path, branches),
                ));
            }
        }

        // Branch sites per hundred lines, clamped to 0-100
        let complexity = if total_lines == 0 {
            0.0
        } else {
            (total_branches as f64 * 100.0 / total_lines as f64).min(100.0)
        };

        let comment_ratio = if total_lines == 0 {
            0.0
        } else {
            total_comment_lines as f64 / total_lines as f64
        };
        let avg_file_lines = total_lines as f64 / files.len() as f64;
        let size_penalty = (avg_file_lines / LONG_FILE_LINES as f64 * 40.0).min(40.0);
        let maintainability =
            (100.0 - size_penalty - complexity * 0.4 + comment_ratio * 10.0).clamp(0.0, 100.0);

        let shit_score = (complexity * 0.5 + size_penalty + (100.0 - maintainability) * 0.3)
            .clamp(0.0, 100.0);

        issues.sort_by(|a, b| b.0.cmp(&a.0));
        let top_issues = issues.into_iter().map(|(_, msg)| msg).take(10).collect();

        Ok(QualityMetrics {
            shit_score,
            complexity,
            maintainability,
            top_issues,
            extra: Default::default(),
        })
    }
}
