use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum NamingRule {
    /// Keep the source file name
    #[default]
    Original,
    Prefix,
    Suffix,
    PrefixSuffix,
}

/// What to do when the output file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Replace it; re-running a batch gives the same result
    #[default]
    Overwrite,
    /// Append `_1`, `_2`, ... until the name is free
    Rename,
    /// Leave the existing file and skip the source
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct NamingConfig {
    pub rule: NamingRule,
    pub prefix: String,
    pub suffix: String,
    pub on_conflict: ConflictPolicy,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            rule: NamingRule::default(),
            prefix: "wm_".to_string(),
            suffix: "_watermarked".to_string(),
            on_conflict: ConflictPolicy::default(),
        }
    }
}

impl NamingConfig {
    /// Output file name for `source` with the given extension.
    pub fn file_name(&self, source: &Path, extension: &str) -> String {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let name = match self.rule {
            NamingRule::Original => stem,
            NamingRule::Prefix => format!("{}{}", self.prefix, stem),
            NamingRule::Suffix => format!("{}{}", stem, self.suffix),
            NamingRule::PrefixSuffix => format!("{}{}{}", self.prefix, stem, self.suffix),
        };

        if extension.is_empty() {
            name
        } else {
            format!("{}.{}", name, extension)
        }
    }
}

/// Tracks output paths handed out during one batch run.
#[derive(Debug, Default)]
pub struct OutputPlanner {
    claimed: HashSet<PathBuf>,
}

impl OutputPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a path for `candidate` under `policy`; `None` means skip.
    ///
    /// A path already claimed earlier in the same run is never reused, so
    /// two sources that map to one name both survive.
    pub fn claim(&mut self, candidate: PathBuf, policy: ConflictPolicy) -> Option<PathBuf> {
        let taken_on_disk = candidate.exists();
        let taken_this_run = self.claimed.contains(&candidate);

        let path = match (taken_this_run, taken_on_disk, policy) {
            (false, false, _) | (false, true, ConflictPolicy::Overwrite) => candidate,
            (false, true, ConflictPolicy::Skip) => return None,
            _ => self.next_free(&candidate, policy),
        };

        self.claimed.insert(path.clone());
        Some(path)
    }

    /// First `_N` variant of `candidate` not claimed in this run. Under
    /// `Overwrite` a file left on disk by an earlier run is reused, so
    /// repeated runs write the same set of names.
    fn next_free(&self, candidate: &Path, policy: ConflictPolicy) -> PathBuf {
        let parent = candidate.parent().unwrap_or_else(|| Path::new(""));
        let stem = candidate
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = candidate
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let mut counter = 1;
        loop {
            let path = parent.join(format!("{}_{}{}", stem, counter, extension));
            let taken_on_disk = policy != ConflictPolicy::Overwrite && path.exists();
            if !taken_on_disk && !self.claimed.contains(&path) {
                return path;
            }
            counter += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_name_rules() {
        let source = Path::new("/photos/IMG_0042.jpeg");
        let mut naming = NamingConfig::default();

        assert_eq!(naming.file_name(source, "jpeg"), "IMG_0042.jpeg");

        naming.rule = NamingRule::Prefix;
        assert_eq!(naming.file_name(source, "jpg"), "wm_IMG_0042.jpg");

        naming.rule = NamingRule::Suffix;
        assert_eq!(naming.file_name(source, "png"), "IMG_0042_watermarked.png");

        naming.rule = NamingRule::PrefixSuffix;
        naming.prefix = "dated-".to_string();
        naming.suffix = "-stamp".to_string();
        assert_eq!(naming.file_name(source, "jpg"), "dated-IMG_0042-stamp.jpg");
    }

    #[test]
    fn test_claim_free_path() {
        let temp_dir = TempDir::new().unwrap();
        let mut planner = OutputPlanner::new();
        let candidate = temp_dir.path().join("a.jpg");

        assert_eq!(
            planner.claim(candidate.clone(), ConflictPolicy::Skip),
            Some(candidate)
        );
    }

    #[test]
    fn test_claim_existing_file_by_policy() {
        let temp_dir = TempDir::new().unwrap();
        let existing = temp_dir.path().join("a.jpg");
        std::fs::write(&existing, b"old").unwrap();

        assert_eq!(
            OutputPlanner::new().claim(existing.clone(), ConflictPolicy::Overwrite),
            Some(existing.clone())
        );
        assert_eq!(
            OutputPlanner::new().claim(existing.clone(), ConflictPolicy::Skip),
            None
        );
        assert_eq!(
            OutputPlanner::new().claim(existing.clone(), ConflictPolicy::Rename),
            Some(temp_dir.path().join("a_1.jpg"))
        );
    }

    #[test]
    fn test_rename_skips_numbers_in_use() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.jpg"), b"").unwrap();
        std::fs::write(temp_dir.path().join("a_1.jpg"), b"").unwrap();

        let claimed = OutputPlanner::new()
            .claim(temp_dir.path().join("a.jpg"), ConflictPolicy::Rename)
            .unwrap();
        assert_eq!(claimed, temp_dir.path().join("a_2.jpg"));
    }

    #[test]
    fn test_same_run_collisions_never_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let mut planner = OutputPlanner::new();
        let candidate = temp_dir.path().join("a.jpg");

        let first = planner.claim(candidate.clone(), ConflictPolicy::Overwrite);
        let second = planner.claim(candidate.clone(), ConflictPolicy::Overwrite);

        assert_eq!(first, Some(candidate));
        assert_eq!(second, Some(temp_dir.path().join("a_1.jpg")));
    }

    #[test]
    fn test_overwrite_reuses_numbered_names_from_earlier_runs() {
        let temp_dir = TempDir::new().unwrap();
        let candidate = temp_dir.path().join("a.jpg");
        std::fs::write(&candidate, b"old").unwrap();
        std::fs::write(temp_dir.path().join("a_1.jpg"), b"old").unwrap();

        let mut planner = OutputPlanner::new();
        let first = planner.claim(candidate.clone(), ConflictPolicy::Overwrite);
        let second = planner.claim(candidate.clone(), ConflictPolicy::Overwrite);

        assert_eq!(first, Some(candidate));
        assert_eq!(second, Some(temp_dir.path().join("a_1.jpg")));
    }
}
