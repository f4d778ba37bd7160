//! Timestamped photo file names.

use chrono::{DateTime, Local, TimeZone};
use std::fmt::Display;
use std::path::{Path, PathBuf};

/// `strftime` pattern for photo names: `yyyy-MM-dd-HH-mm-ss-SSS`.
pub const FILENAME_FORMAT: &str = "%Y-%m-%d-%H-%M-%S-%3f";

/// Extension appended to every photo.
pub const PHOTO_EXTENSION: &str = "jpg";

/// Path of a photo about to be captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPhotoFile {
    path: PathBuf,
}

impl CapturedPhotoFile {
    /// Names a photo taken at `at` inside `dir`.
    pub fn new<Tz>(dir: &Path, at: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let name = format!("{}.{}", at.format(FILENAME_FORMAT), PHOTO_EXTENSION);
        Self {
            path: dir.join(name),
        }
    }

    /// Names a photo taken now, in local time.
    pub fn now(dir: &Path) -> Self {
        Self::new(dir, &Local::now())
    }

    /// Full path of the photo.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name component, e.g. `2024-03-05-14-07-09-042.jpg`.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }

    /// Consumes the name and returns its full path.
    pub fn into_path(self) -> PathBuf {
        self.path
    }

    /// Returns true if `name` follows the photo naming pattern.
    pub fn is_photo_name(name: &str) -> bool {
        let Some(stem) = name.strip_suffix(".jpg") else {
            return false;
        };
        // digit groups of yyyy-MM-dd-HH-mm-ss-SSS
        const GROUPS: [usize; 7] = [4, 2, 2, 2, 2, 2, 3];
        let parts: Vec<&str> = stem.split('-').collect();
        parts.len() == GROUPS.len()
            && parts
                .iter()
                .zip(GROUPS)
                .all(|(part, len)| part.len() == len && part.bytes().all(|b| b.is_ascii_digit()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use proptest::prelude::*;

    #[test]
    fn test_name_from_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap() + Duration::milliseconds(42);
        let photo = CapturedPhotoFile::new(Path::new("/photos"), &at);

        assert_eq!(photo.file_name(), "2024-03-05-14-07-09-042.jpg");
        assert_eq!(
            photo.path(),
            Path::new("/photos/2024-03-05-14-07-09-042.jpg")
        );
    }

    #[test]
    fn test_now_matches_pattern() {
        let photo = CapturedPhotoFile::now(Path::new("out"));
        assert!(CapturedPhotoFile::is_photo_name(photo.file_name()));
        assert_eq!(photo.path().parent(), Some(Path::new("out")));
    }

    #[test]
    fn test_rejects_other_names() {
        assert!(!CapturedPhotoFile::is_photo_name("2024-03-05-14-07-09.jpg"));
        assert!(!CapturedPhotoFile::is_photo_name("2024-03-05-14-07-09-042.png"));
        assert!(!CapturedPhotoFile::is_photo_name("2024-3-05-14-07-09-042.jpg"));
        assert!(!CapturedPhotoFile::is_photo_name("photo.jpg"));
    }

    proptest! {
        #[test]
        fn prop_every_instant_yields_pattern_name(millis in 0i64..4_102_444_800_000i64) {
            let at = Utc.timestamp_millis_opt(millis).unwrap();
            let photo = CapturedPhotoFile::new(Path::new("dir"), &at);
            prop_assert!(CapturedPhotoFile::is_photo_name(photo.file_name()));
            let expected_millis = format!("-{:03}.jpg", millis % 1000);
            prop_assert!(photo.file_name().ends_with(&expected_millis));
        }
    }
}
