//! Reader for `/proc/[pid]/mountinfo` lines, see
//! [`proc_pid_mountinfo(5)`](https://man7.org/linux/man-pages/man5/proc_pid_mountinfo.5.html).
//!
//! Only the fields needed to classify cgroup mounts are kept; the optional
//! fields before the ` - ` separator are skipped.

/// A mount entry, borrowing from the parsed line.
#[derive(Debug, PartialEq, Eq)]
pub struct MountInfo<'a> {
    pub mount_point: &'a str,
    /// `cgroup` for legacy controllers, `cgroup2` for the unified hierarchy.
    pub fs_type: &'a str,
    /// For `cgroup` mounts this lists the attached controllers.
    pub super_options: &'a str,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("no ` - ` separator in `{0}`")]
    MissingSeparator(String),
    #[error("no `{field}` field in `{line}`")]
    MissingField { field: &'static str, line: String },
}

/// Parses one mountinfo line without allocating unless it is malformed.
///
/// # Errors
///
/// Returns [`ParseError`] if the separator or a required field is missing.
pub fn parse_mount_info_line(line: &str) -> Result<MountInfo<'_>, ParseError> {
    let (pre, post) = line
        .split_once(" - ")
        .ok_or_else(|| ParseError::MissingSeparator(line.to_owned()))?;
    let missing = |field| ParseError::MissingField {
        field,
        line: line.to_owned(),
    };

    let mut pre = pre.split_whitespace();
    for field in ["mount_id", "parent_id", "major:minor", "root"] {
        pre.next().ok_or_else(|| missing(field))?;
    }
    let mount_point = pre.next().ok_or_else(|| missing("mount_point"))?;

    let mut post = post.split_whitespace();
    let fs_type = post.next().ok_or_else(|| missing("fs_type"))?;
    post.next().ok_or_else(|| missing("source"))?;
    let super_options = post.next().ok_or_else(|| missing("super_options"))?;

    Ok(MountInfo {
        mount_point,
        fs_type,
        super_options,
    })
}
