/// Image resolution against an archive image-entry index
///
/// Archive-backed formats (EPUB, FB2-in-zip) carry their illustrations as
/// zip entries. The normalizer only needs to know whether an entry exists;
/// the classifier later pulls the bytes and decodes them. Both sides go
/// through the [`ImageSource`] trait so tests can substitute an in-memory
/// index.
use std::collections::HashMap;
use std::io::{Read, Seek};

use image::RgbaImage;
use zip::ZipArchive;

use crate::error::Result;

/// Provider of local image entries for one open book archive
///
/// File names are matched case-insensitively on the basename, so
/// `cover.PNG` resolves against an archive entry `images/cover.png`.
pub trait ImageSource {
    /// Whether an entry with this basename exists.
    fn contains(&self, file_name: &str) -> bool;

    /// Read the raw bytes of the entry with this basename.
    ///
    /// Returns `None` when the entry is missing or unreadable; callers
    /// treat that the same as a decode failure and drop the image.
    fn read(&mut self, file_name: &str) -> Option<Vec<u8>>;

    /// Basenames of all indexed image entries (lowercased).
    fn entry_names(&self) -> &[String];
}

/// Raster formats the reader can decode
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// Zip-backed [`ImageSource`]
///
/// Indexes the archive's raster-image entries once at construction,
/// keyed by lowercased basename. The archive handle stays open for the
/// duration of one parse; the caller owns opening and closing it.
pub struct ZipImageSource<R: Read + Seek> {
    archive: ZipArchive<R>,
    /// lowercased basename -> full entry path inside the archive
    index: HashMap<String, String>,
    names: Vec<String>,
}

impl<R: Read + Seek> ZipImageSource<R> {
    /// Opens the archive from a raw reader and builds the index.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader does not hold a valid ZIP archive.
    pub fn from_reader(reader: R) -> Result<Self> {
        Ok(Self::new(ZipArchive::new(reader)?))
    }

    /// Builds the image-entry index over an open archive.
    #[must_use = "creates an image source over the archive"]
    pub fn new(archive: ZipArchive<R>) -> Self {
        let mut index = HashMap::new();
        for entry in archive.file_names() {
            let Some(name) = basename(entry) else {
                continue;
            };
            let lower = name.to_lowercase();
            if has_image_extension(&lower) {
                index.insert(lower, entry.to_string());
            }
        }
        let mut names: Vec<String> = index.keys().cloned().collect();
        names.sort_unstable();
        Self {
            archive,
            index,
            names,
        }
    }
}

impl<R: Read + Seek> ImageSource for ZipImageSource<R> {
    fn contains(&self, file_name: &str) -> bool {
        self.index.contains_key(&file_name.to_lowercase())
    }

    fn read(&mut self, file_name: &str) -> Option<Vec<u8>> {
        let entry_path = self.index.get(&file_name.to_lowercase())?.clone();
        let mut entry = match self.archive.by_name(&entry_path) {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Failed to open archive entry {entry_path}: {e}");
                return None;
            }
        };
        let mut bytes = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
        if let Err(e) = entry.read_to_end(&mut bytes) {
            log::warn!("Failed to read archive entry {entry_path}: {e}");
            return None;
        }
        Some(bytes)
    }

    fn entry_names(&self) -> &[String] {
        &self.names
    }
}

/// Decode entry bytes into a render-ready bitmap
///
/// Decoding is unconditional full resolution; the RGBA conversion
/// pre-warms the buffer so the reader can blit it without further work.
/// Corrupt or unsupported bytes yield `None` and the caller drops the
/// image together with its caption.
#[must_use = "returns the decoded bitmap"]
pub(crate) fn decode_image(bytes: &[u8]) -> Option<RgbaImage> {
    match image::load_from_memory(bytes) {
        Ok(decoded) => Some(decoded.to_rgba8()),
        Err(e) => {
            log::debug!("Image decode failed: {e}");
            None
        }
    }
}

/// Final path component of an archive entry, if it has one
fn basename(entry: &str) -> Option<&str> {
    let name = entry.rsplit(['/', '\\']).next()?;
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn has_image_extension(name: &str) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::{Cursor, Write};

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    use super::*;

    /// Valid 2x2 PNG produced by the image crate
    pub(crate) fn tiny_png() -> Vec<u8> {
        let img = RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 255]));
        let mut bytes = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut bytes, image::ImageFormat::Png)
            .expect("png encode");
        bytes.into_inner()
    }

    pub(crate) fn archive_with(entries: &[(&str, &[u8])]) -> ZipArchive<Cursor<Vec<u8>>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .expect("start zip entry");
            writer.write_all(data).expect("write zip entry");
        }
        let cursor = writer.finish().expect("finish zip");
        ZipArchive::new(Cursor::new(cursor.into_inner())).expect("reopen zip")
    }

    #[test]
    fn test_index_is_case_insensitive_on_basename() {
        let png = tiny_png();
        let source = ZipImageSource::new(archive_with(&[
            ("OEBPS/Images/Cover.PNG", png.as_slice()),
            ("OEBPS/style.css", b"body {}".as_slice()),
        ]));

        assert!(source.contains("cover.png"));
        assert!(source.contains("COVER.PNG"));
        assert!(!source.contains("style.css"));
        assert!(!source.contains("missing.png"));
        assert_eq!(source.entry_names(), ["cover.png"]);
    }

    #[test]
    fn test_read_and_decode() {
        let png = tiny_png();
        let mut source =
            ZipImageSource::new(archive_with(&[("img/photo.png", png.as_slice())]));

        let bytes = source.read("PHOTO.png").expect("entry bytes");
        let bitmap = decode_image(&bytes).expect("decoded bitmap");
        assert_eq!(bitmap.dimensions(), (2, 2));
    }

    #[test]
    fn test_decode_failure_returns_none() {
        assert!(decode_image(b"not an image").is_none());
    }

    #[test]
    fn test_from_reader_rejects_non_zip() {
        assert!(ZipImageSource::from_reader(Cursor::new(vec![1, 2, 3])).is_err());
    }

    #[test]
    fn test_read_missing_entry() {
        let mut source = ZipImageSource::new(archive_with(&[]));
        assert!(source.read("nope.png").is_none());
    }

    #[test]
    fn test_on_disk_archive() {
        let png = tiny_png();
        let mut writer = ZipWriter::new(tempfile::tempfile().expect("temp file"));
        writer
            .start_file("pic.jpg", SimpleFileOptions::default())
            .expect("start zip entry");
        writer.write_all(&png).expect("write zip entry");
        let file = writer.finish().expect("finish zip");

        let source = ZipImageSource::new(ZipArchive::new(file).expect("open zip"));
        assert!(source.contains("pic.jpg"));
    }
}
