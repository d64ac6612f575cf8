//! Save-destination collaborators.

use std::path::{Path, PathBuf};

use chrono::Local;

/// A file location chosen for a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveDestination {
    path: PathBuf,
}

impl SaveDestination {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Asks where to save; `None` means the user cancelled.
pub trait SavePicker {
    fn pick_save_destination(
        &mut self,
        suggested_name: &str,
        allowed_extensions: &[&str],
    ) -> Option<SaveDestination>;
}

/// Saves into a fixed directory under the suggested name.
#[derive(Debug, Clone)]
pub struct DirectoryPicker {
    dir: PathBuf,
    timestamped: bool,
}

impl DirectoryPicker {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            timestamped: false,
        }
    }

    /// Appends a local timestamp to every picked name.
    pub fn timestamped(mut self, enabled: bool) -> Self {
        self.timestamped = enabled;
        self
    }
}

impl SavePicker for DirectoryPicker {
    fn pick_save_destination(
        &mut self,
        suggested_name: &str,
        allowed_extensions: &[&str],
    ) -> Option<SaveDestination> {
        let stem = if self.timestamped {
            format!("{}_{}", suggested_name, Local::now().format("%Y%m%d_%H%M%S_%3f"))
        } else {
            suggested_name.to_string()
        };
        let file_name = format!("{}.{}", stem, first_extension(allowed_extensions));
        Some(SaveDestination::new(self.dir.join(file_name)))
    }
}

/// Saves to one explicit path, or cancels when there is none.
///
/// A path whose extension is not allowed gets the first allowed one.
#[derive(Debug, Clone, Default)]
pub struct FilePicker {
    path: Option<PathBuf>,
}

impl FilePicker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// A picker that behaves like a dismissed dialog.
    pub fn cancelled() -> Self {
        Self { path: None }
    }
}

impl SavePicker for FilePicker {
    fn pick_save_destination(
        &mut self,
        _suggested_name: &str,
        allowed_extensions: &[&str],
    ) -> Option<SaveDestination> {
        let mut path = self.path.clone()?;
        let allowed = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                allowed_extensions
                    .iter()
                    .any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(ext))
            });
        if !allowed {
            path.set_extension(first_extension(allowed_extensions));
        }
        Some(SaveDestination::new(path))
    }
}

fn first_extension<'a>(allowed_extensions: &[&'a str]) -> &'a str {
    allowed_extensions
        .first()
        .copied()
        .map(|ext| ext.trim_start_matches('.'))
        .unwrap_or("png")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_picker_plain_name() {
        let mut picker = DirectoryPicker::new("/tmp/captures");
        let dest = picker.pick_save_destination("IR_Capture", &[".png"]).unwrap();
        assert_eq!(dest.path(), Path::new("/tmp/captures/IR_Capture.png"));
    }

    #[test]
    fn test_directory_picker_timestamped_name() {
        let mut picker = DirectoryPicker::new("out").timestamped(true);
        let dest = picker.pick_save_destination("IR_Capture", &["png"]).unwrap();
        let name = dest.path().file_name().unwrap().to_str().unwrap().to_string();

        assert!(name.starts_with("IR_Capture_"));
        assert!(name.ends_with(".png"));
        assert!(name.len() > "IR_Capture_.png".len());
    }

    #[test]
    fn test_file_picker_fixes_extension() {
        let mut picker = FilePicker::new("shot.bmp");
        let dest = picker.pick_save_destination("IR_Capture", &["png"]).unwrap();
        assert_eq!(dest.path(), Path::new("shot.png"));

        let mut picker = FilePicker::new("shot.PNG");
        let dest = picker.pick_save_destination("IR_Capture", &["png"]).unwrap();
        assert_eq!(dest.path(), Path::new("shot.PNG"));
    }

    #[test]
    fn test_cancelled_picker() {
        let mut picker = FilePicker::cancelled();
        assert!(picker.pick_save_destination("IR_Capture", &["png"]).is_none());
    }
}
