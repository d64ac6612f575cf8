//! Saving the displayed frame.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::encoder::{EncodeError, EncodeParams, ImageEncoder, PngImageEncoder};
use super::picker::SavePicker;
use crate::pipeline::ColorBuffer;

/// Errors that can occur while exporting.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no frame buffer to export")]
    NothingToExport,
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of a save request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Saved(PathBuf),
    /// The destination picker was dismissed; nothing was written.
    Cancelled,
}

/// Encodes a front buffer and writes it where the picker says.
///
/// The buffer is borrowed for the whole call, so it cannot be swapped
/// out from under the encoder.
#[derive(Debug, Clone)]
pub struct SaveExporter<E: ImageEncoder = PngImageEncoder> {
    encoder: E,
    suggested_name: String,
}

impl SaveExporter {
    /// A PNG exporter offering `suggested_name` to the picker.
    pub fn new(suggested_name: impl Into<String>) -> Self {
        Self::with_encoder(PngImageEncoder, suggested_name)
    }
}

impl<E: ImageEncoder> SaveExporter<E> {
    pub fn with_encoder(encoder: E, suggested_name: impl Into<String>) -> Self {
        Self {
            encoder,
            suggested_name: suggested_name.into(),
        }
    }

    pub fn suggested_name(&self) -> &str {
        &self.suggested_name
    }

    /// Encodes `buffer` with fixed RGBA8 / alpha-ignored / 96 DPI settings.
    pub fn encode(&self, buffer: &ColorBuffer) -> Result<Vec<u8>, ExportError> {
        let params = EncodeParams::rgba8(buffer.width(), buffer.height());
        let mut encoded = Vec::new();
        self.encoder.encode(buffer.as_bytes(), &params, &mut encoded)?;
        Ok(encoded)
    }

    /// Asks `picker` for a destination and saves `buffer` there.
    ///
    /// A cancelled picker is not an error and writes nothing. The image is
    /// encoded fully before the file is created, so an encode failure
    /// never leaves a partial file behind.
    pub fn save<P: SavePicker + ?Sized>(
        &self,
        buffer: &ColorBuffer,
        picker: &mut P,
    ) -> Result<ExportOutcome, ExportError> {
        let extensions = [self.encoder.extension()];
        let Some(destination) = picker.pick_save_destination(&self.suggested_name, &extensions)
        else {
            tracing::info!("Save cancelled");
            return Ok(ExportOutcome::Cancelled);
        };

        let encoded = self.encode(buffer)?;
        let path = destination.path().to_path_buf();
        write_file(&path, &encoded)?;

        tracing::info!(
            path = %path.display(),
            bytes = encoded.len(),
            width = buffer.width(),
            height = buffer.height(),
            "Saved frame"
        );
        Ok(ExportOutcome::Saved(path))
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::create(path).map_err(io_err)?;
    file.write_all(bytes).map_err(io_err)?;
    file.flush().map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{FilePicker, SaveDestination};
    use std::io;

    struct FailingEncoder;

    impl ImageEncoder for FailingEncoder {
        fn extension(&self) -> &'static str {
            "png"
        }

        fn encode(
            &self,
            _pixels: &[u8],
            _params: &EncodeParams,
            _out: &mut dyn Write,
        ) -> Result<(), EncodeError> {
            Err(EncodeError::Io(io::Error::new(io::ErrorKind::Other, "disk full")))
        }
    }

    struct RecordingPicker {
        seen: Vec<(String, Vec<String>)>,
    }

    impl SavePicker for RecordingPicker {
        fn pick_save_destination(
            &mut self,
            suggested_name: &str,
            allowed_extensions: &[&str],
        ) -> Option<SaveDestination> {
            self.seen.push((
                suggested_name.to_string(),
                allowed_extensions.iter().map(|s| s.to_string()).collect(),
            ));
            None
        }
    }

    #[test]
    fn test_encode_produces_png_signature() {
        let mut buffer = ColorBuffer::new(2, 2);
        buffer.fill([5, 5, 5, 255]);

        let encoded = SaveExporter::new("IR_Capture").encode(&buffer).unwrap();
        assert_eq!(&encoded[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_picker_sees_suggested_name_and_extension() {
        let mut picker = RecordingPicker { seen: Vec::new() };
        let outcome = SaveExporter::new("IR_Capture")
            .save(&ColorBuffer::new(1, 1), &mut picker)
            .unwrap();

        assert_eq!(outcome, ExportOutcome::Cancelled);
        assert_eq!(
            picker.seen,
            vec![("IR_Capture".to_string(), vec!["png".to_string()])]
        );
    }

    #[test]
    fn test_encode_failure_propagates_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let exporter = SaveExporter::with_encoder(FailingEncoder, "IR_Capture");

        let result = exporter.save(&ColorBuffer::new(1, 1), &mut FilePicker::new(&path));

        assert!(matches!(result, Err(ExportError::Encode(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_unwritable_destination_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("frame.png");

        let result =
            SaveExporter::new("IR_Capture").save(&ColorBuffer::new(1, 1), &mut FilePicker::new(&path));

        match result {
            Err(ExportError::Io { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
