//! Rotation policy and backup retention.
//!
//! A rotated file is renamed to `<stem>-<timestamp><ext>` next to the active
//! file, with the timestamp in UTC (`2026-01-09T14-03-07.120`). Retention then
//! prunes backups by count and age and optionally gzips the survivors.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use time::macros::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

use crate::Config;

const MEGABYTE: u64 = 1024 * 1024;
const GZ_SUFFIX: &str = ".gz";

/// Limits applied by [`RotatingWriter`](crate::RotatingWriter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Maximum size of the active file in bytes.
    pub max_size: u64,
    /// Backups to keep; zero keeps all of them.
    pub max_backups: usize,
    /// Backup retention in days; zero disables age pruning.
    pub max_age_days: u64,
    /// Gzip backups after rotation.
    pub compress: bool,
}

impl RotationPolicy {
    /// Create a policy with the size given in megabytes.
    pub fn new(max_size_mb: u64, max_backups: usize, max_age_days: u64) -> Self {
        Self {
            max_size: max_size_mb.saturating_mul(MEGABYTE),
            max_backups,
            max_age_days,
            compress: false,
        }
    }

    /// Set the size limit in bytes.
    pub fn with_max_size_bytes(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Policy for a normalized configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_size, config.max_backups, config.max_age).with_compress(config.compress)
    }
}

/// Backup path for `path` rotated at `at`.
pub fn backup_name(path: &Path, at: OffsetDateTime) -> PathBuf {
    let (stem, ext) = split_name(path);
    let at = at.to_offset(time::UtcOffset::UTC);
    let stamp = at
        .format(format_description!(
            "[year]-[month]-[day]T[hour]-[minute]-[second].[subsecond digits:3]"
        ))
        .unwrap_or_default();
    path.with_file_name(format!("{}-{}{}", stem, stamp, ext))
}

/// First backup name for `path` at or after `at` that is not taken, neither
/// plain nor gzipped. Rotations within the same millisecond move on to the
/// next one.
pub fn free_backup_name(path: &Path, mut at: OffsetDateTime) -> PathBuf {
    loop {
        let candidate = backup_name(path, at);
        let mut gz = candidate.as_os_str().to_owned();
        gz.push(GZ_SUFFIX);
        if !candidate.exists() && !Path::new(&gz).exists() {
            return candidate;
        }
        at += Duration::milliseconds(1);
    }
}

/// A rotated file found next to the active log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    pub path: PathBuf,
    pub rotated_at: OffsetDateTime,
    pub compressed: bool,
}

/// List the backups of `path`, newest first.
pub fn list_backups(path: &Path) -> io::Result<Vec<Backup>> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let (stem, ext) = split_name(path);
    let prefix = format!("{}-", stem);

    let mut backups = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let (plain, compressed) = match name.strip_suffix(GZ_SUFFIX) {
            Some(plain) => (plain, true),
            None => (name.as_str(), false),
        };
        if let Some(rotated_at) = parse_backup_time(plain, &prefix, &ext) {
            backups.push(Backup {
                path: entry.path(),
                rotated_at,
                compressed,
            });
        }
    }

    backups.sort_by(|a, b| b.rotated_at.cmp(&a.rotated_at));
    Ok(backups)
}

/// Apply count, age and compression rules to the backups of `path`.
pub fn enforce_retention(path: &Path, policy: &RotationPolicy) -> io::Result<()> {
    let backups = list_backups(path)?;
    let cutoff = age_cutoff(OffsetDateTime::now_utc(), policy.max_age_days);

    // A backup and its gzipped twin count once.
    let mut kept_stamps: Vec<OffsetDateTime> = Vec::new();
    let mut survivors = Vec::new();
    for backup in backups {
        let expired = cutoff.is_some_and(|cutoff| backup.rotated_at < cutoff);
        let is_new_stamp = !kept_stamps.contains(&backup.rotated_at);
        let over_count = policy.max_backups > 0
            && is_new_stamp
            && kept_stamps.len() >= policy.max_backups;

        if expired || over_count {
            fs::remove_file(&backup.path)?;
            continue;
        }
        if is_new_stamp {
            kept_stamps.push(backup.rotated_at);
        }
        survivors.push(backup);
    }

    if policy.compress {
        for backup in survivors.iter().filter(|b| !b.compressed) {
            let already_done = survivors
                .iter()
                .any(|b| b.compressed && b.rotated_at == backup.rotated_at);
            if already_done {
                fs::remove_file(&backup.path)?;
            } else {
                compress_file(&backup.path)?;
            }
        }
    }

    Ok(())
}

/// Oldest rotation time that survives age pruning. `None` when pruning is off
/// or the age reaches past the representable range.
fn age_cutoff(now: OffsetDateTime, max_age_days: u64) -> Option<OffsetDateTime> {
    if max_age_days == 0 {
        return None;
    }
    let seconds = i64::try_from(max_age_days).ok()?.checked_mul(86_400)?;
    now.checked_sub(Duration::seconds(seconds))
}

#[cfg(feature = "compress")]
fn compress_file(path: &Path) -> io::Result<()> {
    use flate2::Compression;
    use flate2::write::GzEncoder;

    let mut target = path.as_os_str().to_owned();
    target.push(GZ_SUFFIX);

    let mut source = fs::File::open(path)?;
    let out = fs::File::create(&target)?;
    let mut encoder = GzEncoder::new(out, Compression::default());
    io::copy(&mut source, &mut encoder)?;
    encoder.finish()?.sync_all()?;
    drop(source);
    fs::remove_file(path)
}

#[cfg(not(feature = "compress"))]
fn compress_file(_path: &Path) -> io::Result<()> {
    Ok(())
}

fn split_name(path: &Path) -> (String, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (stem, ext)
}

fn parse_backup_time(name: &str, prefix: &str, ext: &str) -> Option<OffsetDateTime> {
    let stamp = name.strip_prefix(prefix)?.strip_suffix(ext)?;
    PrimitiveDateTime::parse(
        stamp,
        format_description!("[year]-[month]-[day]T[hour]-[minute]-[second].[subsecond digits:3]"),
    )
    .ok()
    .map(PrimitiveDateTime::assume_utc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_policy_from_config() {
        let config = Config::new()
            .with_max_size(2)
            .with_max_backups(4)
            .with_max_age(7)
            .with_compress(true);
        let policy = RotationPolicy::from_config(&config);
        assert_eq!(policy.max_size, 2 * 1024 * 1024);
        assert_eq!(policy.max_backups, 4);
        assert_eq!(policy.max_age_days, 7);
        assert!(policy.compress);
    }

    #[test]
    fn test_backup_name() {
        let at = datetime!(2026-01-09 14:03:07.120 UTC);
        assert_eq!(
            backup_name(Path::new("/var/log/app.log"), at),
            PathBuf::from("/var/log/app-2026-01-09T14-03-07.120.log")
        );
        assert_eq!(
            backup_name(Path::new("noext"), at),
            PathBuf::from("noext-2026-01-09T14-03-07.120")
        );
    }

    #[test]
    fn test_backup_name_uses_utc() {
        let at = datetime!(2026-01-09 16:00:00.000 +02:00);
        assert_eq!(
            backup_name(Path::new("app.log"), at),
            PathBuf::from("app-2026-01-09T14-00-00.000.log")
        );
    }

    #[test]
    fn test_free_backup_name_skips_taken_names() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("app.log");
        let at = datetime!(2026-01-09 14:03:07.120 UTC);

        assert_eq!(free_backup_name(&log, at), backup_name(&log, at));

        touch(&backup_name(&log, at));
        let gz = dir.path().join("app-2026-01-09T14-03-07.121.log.gz");
        touch(&gz);
        assert_eq!(
            free_backup_name(&log, at),
            dir.path().join("app-2026-01-09T14-03-07.122.log")
        );
    }

    #[test]
    fn test_age_cutoff() {
        let now = datetime!(2026-01-09 00:00:00 UTC);
        assert_eq!(age_cutoff(now, 0), None);
        assert_eq!(age_cutoff(now, 2), Some(datetime!(2026-01-07 00:00:00 UTC)));
        assert_eq!(age_cutoff(now, 1 << 62), None);
        assert_eq!(age_cutoff(now, u64::MAX), None);
        assert_eq!(age_cutoff(now, 365 * 100_000), None);
    }

    #[test]
    fn test_huge_max_age_disables_age_pruning() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("app.log");
        let recent = backup_name(&log, OffsetDateTime::now_utc() - Duration::hours(1));
        let old = backup_name(&log, datetime!(2000-01-01 00:00:00 UTC));
        touch(&recent);
        touch(&old);

        for days in [u64::MAX, 1 << 62] {
            enforce_retention(&log, &RotationPolicy::new(1, 3, days)).unwrap();
            assert!(recent.exists());
            assert!(old.exists());
        }
    }

    #[test]
    fn test_parse_backup_time() {
        let parsed = parse_backup_time("app-2026-01-09T14-03-07.120.log", "app-", ".log");
        assert_eq!(parsed, Some(datetime!(2026-01-09 14:03:07.120 UTC)));
        assert_eq!(parse_backup_time("app.log", "app-", ".log"), None);
        assert_eq!(parse_backup_time("app-garbage.log", "app-", ".log"), None);
        assert_eq!(parse_backup_time("other-2026-01-09T14-03-07.120.log", "app-", ".log"), None);
    }

    fn touch(path: &Path) {
        fs::write(path, b"x\n").unwrap();
    }

    #[test]
    fn test_list_backups_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("app.log");
        touch(&log);
        touch(&backup_name(&log, datetime!(2026-01-01 00:00:00 UTC)));
        touch(&backup_name(&log, datetime!(2026-01-03 00:00:00 UTC)));
        touch(&dir.path().join("app-2026-01-02T00-00-00.000.log.gz"));
        touch(&dir.path().join("unrelated.txt"));

        let backups = list_backups(&log).unwrap();
        assert_eq!(backups.len(), 3);
        assert_eq!(backups[0].rotated_at, datetime!(2026-01-03 00:00:00 UTC));
        assert!(backups[1].compressed);
        assert_eq!(backups[2].rotated_at, datetime!(2026-01-01 00:00:00 UTC));
    }

    #[test]
    fn test_retention_by_count() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("app.log");
        let now = OffsetDateTime::now_utc();
        for minutes in 1..=5 {
            touch(&backup_name(&log, now - Duration::minutes(minutes)));
        }

        let policy = RotationPolicy::new(1, 2, 0);
        enforce_retention(&log, &policy).unwrap();

        let backups = list_backups(&log).unwrap();
        assert_eq!(backups.len(), 2);
        assert!(backups[0].rotated_at > backups[1].rotated_at);
    }

    #[test]
    fn test_retention_by_age() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("app.log");
        let now = OffsetDateTime::now_utc();
        let fresh = backup_name(&log, now - Duration::hours(1));
        let stale = backup_name(&log, now - Duration::days(10));
        touch(&fresh);
        touch(&stale);

        let policy = RotationPolicy::new(1, 0, 7);
        enforce_retention(&log, &policy).unwrap();

        assert!(fresh.exists());
        assert!(!stale.exists());
    }

    #[cfg(feature = "compress")]
    #[test]
    fn test_retention_compresses() {
        use std::io::Read;

        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("app.log");
        let backup = backup_name(&log, OffsetDateTime::now_utc());
        fs::write(&backup, b"rotated content\n").unwrap();

        let policy = RotationPolicy::new(1, 3, 30).with_compress(true);
        enforce_retention(&log, &policy).unwrap();

        assert!(!backup.exists());
        let gz = PathBuf::from(format!("{}.gz", backup.display()));
        assert!(gz.exists());

        let mut decoded = String::new();
        flate2::read::GzDecoder::new(fs::File::open(&gz).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "rotated content\n");
    }
}
