// Target list assembly from flags and files

use anyhow::{Context, Result};
use clap::Args;
use fanout_core::Target;
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Target host (`host`, `host:port`, `[v6]:port`); repeatable
    #[arg(short, long = "target", value_name = "HOST")]
    pub targets: Vec<String>,

    /// File with one target per line; `#` starts a comment
    #[arg(short = 'f', long, value_name = "PATH")]
    pub targets_file: Option<PathBuf>,
}

impl TargetArgs {
    /// Flag targets first, then file targets, in order and without deduplication
    pub fn collect(&self) -> Result<Vec<Target>> {
        let mut targets = Vec::new();
        for raw in &self.targets {
            let target = raw
                .parse::<Target>()
                .with_context(|| format!("Invalid --target {:?}", raw))?;
            targets.push(target);
        }
        if let Some(path) = &self.targets_file {
            targets.extend(read_targets_file(path)?);
        }
        if targets.is_empty() {
            anyhow::bail!("No targets given (use --target or --targets-file)");
        }
        Ok(targets)
    }
}

pub fn read_targets_file(path: &Path) -> Result<Vec<Target>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read targets file {}", path.display()))?;
    parse_target_lines(&text).with_context(|| format!("In targets file {}", path.display()))
}

/// Parse one target per line, skipping blanks and `#` comments
pub fn parse_target_lines(text: &str) -> Result<Vec<Target>> {
    let mut targets = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = match line.split_once('#') {
            Some((before, _)) => before,
            None => line,
        }
        .trim();
        if line.is_empty() {
            continue;
        }
        let target = line
            .parse::<Target>()
            .with_context(|| format!("line {}: invalid target {:?}", index + 1, line))?;
        targets.push(target);
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let text = "\
# inventory
web01
  web02:8080   # trailing comment

[::1]:22
";
        let targets = parse_target_lines(text).unwrap();

        assert_eq!(targets.len(), 3);
        assert_eq!(targets[0], Target::new("web01"));
        assert_eq!(targets[1], Target::new("web02").with_port(8080));
        assert_eq!(targets[2], Target::new("::1").with_port(22));
    }

    #[test]
    fn test_parse_reports_line_number() {
        let err = parse_target_lines("ok01\nbad host\n").unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn test_collect_keeps_order_and_duplicates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "b\na").unwrap();

        let args = TargetArgs {
            targets: vec!["a".to_string()],
            targets_file: Some(file.path().to_path_buf()),
        };
        let hosts: Vec<_> = args
            .collect()
            .unwrap()
            .iter()
            .map(|t| t.host().to_string())
            .collect();

        assert_eq!(hosts, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_collect_requires_targets() {
        let args = TargetArgs {
            targets: Vec::new(),
            targets_file: None,
        };
        assert!(args.collect().is_err());
    }
}
