use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const REPORT_HEADER: &str = "Time,Experiment Name,Request Name,Status Code,Latency";

/// The stage name becomes a file name, so it must be a single plain path
/// component: no separators, no parent traversal, not empty.
fn sanitize_stage_name(stage: &str) -> Result<&str> {
    let invalid = stage.is_empty()
        || stage == "."
        || stage == ".."
        || stage.contains('/')
        || stage.contains('\\');
    if invalid {
        return Err(Error::InvalidStageName(stage.to_string()));
    }
    Ok(stage)
}

/// Writes one stage's raw rows to `{folder}/{stage}.csv`, creating the folder
/// if needed. The file is written in one shot: header first, then one row per
/// completed call (non-200 rows included).
pub fn write_stage_report(folder: &Path, stage: &str, rows: &[String]) -> Result<PathBuf> {
    let stage = sanitize_stage_name(stage)?;

    std::fs::create_dir_all(folder)?;
    let path = folder.join(format!("{stage}.csv"));

    let mut content = String::with_capacity(
        REPORT_HEADER.len() + 1 + rows.iter().map(|r| r.len() + 1).sum::<usize>(),
    );
    content.push_str(REPORT_HEADER);
    content.push('\n');
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }

    std::fs::write(&path, content)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("stats");
        let rows = vec![
            "2026-01-01T00:00:00.000Z,warmup,GET-users,200,12".to_string(),
            "2026-01-01T00:00:02.000Z,warmup,GET-users,503,40".to_string(),
        ];

        let path = write_stage_report(&folder, "warmup", &rows).unwrap();
        assert_eq!(path, folder.join("warmup.csv"));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], REPORT_HEADER);
        assert_eq!(lines.len(), 3);
        assert!(lines[2].ends_with("503,40"));
    }

    #[test]
    fn empty_stage_still_gets_a_header_only_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_stage_report(dir.path(), "idle", &[]).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, format!("{REPORT_HEADER}\n"));
    }

    #[test]
    fn rejects_stage_names_that_escape_the_folder() {
        let dir = tempfile::tempdir().unwrap();
        for stage in ["", ".", "..", "a/b", "a\\b", "../escape"] {
            let err = write_stage_report(dir.path(), stage, &[]).unwrap_err();
            assert!(matches!(err, Error::InvalidStageName(_)), "stage: {stage:?}");
        }
    }
}
