mod detect;
mod error;
mod parser;

pub use detect::{CGROUP_MOUNT_POINT, CgroupMode, HYBRID_UNIFIED_MOUNT_POINT, detect_cgroup_mode};
pub use error::{Error, Result};
pub use parser::{MountInfo, ParseError, parse_mount_info_line};
