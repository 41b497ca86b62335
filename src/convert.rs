//! WebP -> PNG conversion.
//!
//! The source is decoded fully before anything is written, and the PNG is
//! encoded into a temporary file in the output directory that is renamed over
//! the target only once complete. A corrupt source or a failed encode never
//! leaves a partial PNG behind and never clobbers an existing one. The source
//! file is only ever opened for reading.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use image::{ImageError, ImageFormat};
use tempfile::Builder;

use crate::error::ConvertError;
use crate::filter::output_path_for;

/// Hidden `.png.tmp` names never pass the WebP filter while a write is in flight.
fn temp_builder() -> Builder<'static, 'static> {
    let mut builder = Builder::new();
    builder.prefix(".webpwatch-").suffix(".png.tmp");
    // subject to umask, like File::create
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    builder
}

/// Convert `path` to a PNG sibling and return the output path.
pub fn convert(path: &Path) -> Result<PathBuf, ConvertError> {
    let output_path = output_path_for(path);

    let file = File::open(path).map_err(|source| ConvertError::OpenFailed {
        path: path.to_path_buf(),
        source,
    })?;

    let decoded = image::load(BufReader::new(file), ImageFormat::WebP).map_err(|source| {
        ConvertError::DecodeFailed {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let dir = match output_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = temp_builder()
        .tempfile_in(dir)
        .map_err(|source| ConvertError::CreateOutputFailed {
            path: output_path.clone(),
            source,
        })?;

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        // on error the temp file is deleted when `tmp` drops
        decoded
            .write_to(&mut writer, ImageFormat::Png)
            .and_then(|_| writer.flush().map_err(ImageError::IoError))
            .map_err(|source| ConvertError::EncodeFailed {
                path: output_path.clone(),
                source,
            })?;
    }

    tmp.persist(&output_path).map_err(|e| ConvertError::CreateOutputFailed {
        path: output_path.clone(),
        source: e.error,
    })?;

    log::debug!(
        "decoded {}x{} {:?} from {}",
        decoded.width(),
        decoded.height(),
        decoded.color(),
        path.display()
    );
    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::fs;
    use tempfile::TempDir;

    fn sample_image(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) % 256) as u8, 255])
        })
    }

    fn write_webp(path: &Path, img: &RgbaImage) {
        DynamicImage::ImageRgba8(img.clone())
            .save_with_format(path, ImageFormat::WebP)
            .unwrap();
    }

    #[test]
    fn test_round_trip_preserves_pixels() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("sample.webp");
        let original = sample_image(17, 9);
        write_webp(&src, &original);

        let out = convert(&src).unwrap();
        assert_eq!(out, dir.path().join("sample.png"));

        let png = image::open(&out).unwrap();
        assert_eq!((png.width(), png.height()), (17, 9));
        assert_eq!(png.to_rgba8(), original);
    }

    #[test]
    fn test_source_left_untouched() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("keep.webp");
        write_webp(&src, &sample_image(4, 4));
        let before = fs::read(&src).unwrap();

        convert(&src).unwrap();

        assert_eq!(fs::read(&src).unwrap(), before);
    }

    #[test]
    fn test_existing_output_is_replaced() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("again.webp");
        let original = sample_image(5, 5);
        write_webp(&src, &original);
        fs::write(dir.path().join("again.png"), b"stale").unwrap();

        let out = convert(&src).unwrap();
        assert_eq!(image::open(&out).unwrap().to_rgba8(), original);
    }

    #[test]
    fn test_failed_conversion_keeps_existing_output_and_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("photo.webp");
        fs::write(&src, b"RIFF\x10\x00\x00\x00WEBPVP8 garbage").unwrap();
        let existing = dir.path().join("photo.png");
        fs::write(&existing, b"previous png").unwrap();

        assert!(convert(&src).is_err());
        assert_eq!(fs::read(&existing).unwrap(), b"previous png");

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2, "stray files: {:?}", names);
    }

    #[test]
    fn test_successful_conversion_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("clean.webp");
        write_webp(&src, &sample_image(3, 3));

        convert(&src).unwrap();

        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["clean.png".to_string(), "clean.webp".to_string()]);
    }

    #[test]
    fn test_missing_source_is_open_failed() {
        let dir = TempDir::new().unwrap();
        let err = convert(&dir.path().join("nope.webp")).unwrap_err();
        assert!(matches!(err, ConvertError::OpenFailed { .. }), "err={:?}", err);
        assert!(!dir.path().join("nope.png").exists());
    }

    #[test]
    fn test_corrupt_source_is_decode_failed_without_output() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("broken.webp");
        fs::write(&src, b"RIFF\x10\x00\x00\x00WEBPVP8 garbage").unwrap();

        let err = convert(&src).unwrap_err();
        assert!(matches!(err, ConvertError::DecodeFailed { .. }), "err={:?}", err);
        assert!(!dir.path().join("broken.png").exists());
    }

    #[test]
    fn test_truncated_source_is_decode_failed() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.webp");
        write_webp(&good, &sample_image(32, 32));
        let bytes = fs::read(&good).unwrap();

        let src = dir.path().join("half.webp");
        fs::write(&src, &bytes[..bytes.len() / 2]).unwrap();

        let err = convert(&src).unwrap_err();
        assert!(matches!(err, ConvertError::DecodeFailed { .. }), "err={:?}", err);
        assert!(!dir.path().join("half.png").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_unwritable_directory_is_create_output_failed() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let src = dir.path().join("locked.webp");
        write_webp(&src, &sample_image(2, 2));
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o555)).unwrap();

        let result = convert(&src);
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();

        // root ignores directory permissions
        if let Err(err) = result {
            assert!(matches!(err, ConvertError::CreateOutputFailed { .. }), "err={:?}", err);
        }
    }
}
