//! Archive file names: `{project}_v{version}_{YYYY-MM-DD}_{HH.MM.SS}.{ext}`.

use chrono::{DateTime, Local, NaiveDateTime};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H.%M.%S";

/// Parsed components of an archive file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    pub version: String,
    pub timestamp: NaiveDateTime,
}

/// Compose the archive file name. Whitespace in `version` is dropped and `_`
/// becomes `-`, so the version segment never contains the separator.
pub fn archive_file_name(
    project_name: &str,
    version: &str,
    at: &DateTime<Local>,
    extension: &str,
) -> String {
    let version: String = version
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '_' { '-' } else { c })
        .collect();
    format!(
        "{project_name}_v{version}_{}_{}.{extension}",
        at.format(DATE_FORMAT),
        at.format(TIME_FORMAT)
    )
}

/// Parse a file name produced by [`archive_file_name`] for `project_name`.
///
/// Returns `None` for anything else, including archives of other projects.
/// A project whose name extends this one with `_v…` would otherwise leave a
/// `_` in the version segment, so such names are rejected.
pub fn parse_archive_name(file_name: &str, project_name: &str, extension: &str) -> Option<ArchiveName> {
    let rest = file_name.strip_prefix(project_name)?.strip_prefix("_v")?;
    let rest = rest.strip_suffix(extension)?.strip_suffix('.')?;
    let mut parts = rest.rsplitn(3, '_');
    let time = parts.next()?;
    let date = parts.next()?;
    let version = parts.next()?;
    if version.contains('_') {
        return None;
    }
    let timestamp = NaiveDateTime::parse_from_str(
        &format!("{date}_{time}"),
        &format!("{DATE_FORMAT}_{TIME_FORMAT}"),
    )
    .ok()?;
    Some(ArchiveName {
        version: version.to_string(),
        timestamp,
    })
}
