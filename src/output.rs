//! Framebuffer image encoders

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::rasterizer::Framebuffer;

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Encode error: {0}")]
    Encode(#[from] image::ImageError),
    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),
}

/// Raw binary PPM: `P6` header, then 3 bytes per pixel, top row first
pub fn write_ppm<W: Write>(fb: &Framebuffer, mut writer: W) -> std::io::Result<()> {
    write!(writer, "P6\n{} {}\n255\n", fb.width, fb.height)?;
    writer.write_all(&fb.to_rgb8())?;
    writer.flush()
}

pub fn save_ppm<P: AsRef<Path>>(fb: &Framebuffer, path: P) -> Result<(), OutputError> {
    let file = File::create(path)?;
    write_ppm(fb, BufWriter::new(file))?;
    Ok(())
}

pub fn save_png<P: AsRef<Path>>(fb: &Framebuffer, path: P) -> Result<(), OutputError> {
    image::save_buffer_with_format(
        path,
        &fb.to_rgb8(),
        fb.width as u32,
        fb.height as u32,
        image::ColorType::Rgb8,
        image::ImageFormat::Png,
    )?;
    Ok(())
}

/// Pick the encoder from the file extension (`png` or `ppm`)
pub fn save_image<P: AsRef<Path>>(fb: &Framebuffer, path: P) -> Result<(), OutputError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => save_png(fb, path),
        "ppm" => save_ppm(fb, path),
        _ => Err(OutputError::UnsupportedFormat(path.display().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::Vec3;

    fn two_by_one() -> Framebuffer {
        let mut fb = Framebuffer::new(2, 1, false);
        fb.pixels[0] = Vec3::new(1.0, 0.0, 0.0);
        fb.pixels[1] = Vec3::new(2.0, 0.5, -1.0);
        fb
    }

    #[test]
    fn test_ppm_layout() {
        let mut out = Vec::new();
        write_ppm(&two_by_one(), &mut out).unwrap();
        let header = b"P6\n2 1\n255\n";
        assert_eq!(&out[..header.len()], header);
        assert_eq!(&out[header.len()..], &[255, 0, 0, 255, 127, 0]);
    }

    #[test]
    fn test_png_decodes_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        save_image(&two_by_one(), &path).unwrap();
        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (2, 1));
        assert_eq!(img.get_pixel(1, 0).0, [255, 127, 0]);
    }

    #[test]
    fn test_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let err = save_image(&two_by_one(), dir.path().join("out.gif")).unwrap_err();
        assert!(matches!(err, OutputError::UnsupportedFormat(_)));
    }
}
