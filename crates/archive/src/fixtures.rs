//! Builders for comic archives on disk, for tests in this and other crates.
//!
//! Everything here panics on failure.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// A solid-colour PNG of the given dimensions.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 40, 40])));
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png).expect("encode fixture png");
    buffer.into_inner()
}

#[derive(Debug, Default)]
pub struct CbzBuilder {
    entries: Vec<(String, Vec<u8>)>,
    comment: Option<String>,
}

impl CbzBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `count` small PNG pages named `page000.png`, `page001.png`, ...
    pub fn pages(mut self, count: usize) -> Self {
        let offset = self.entries.len();
        for i in 0..count {
            self.entries.push((format!("page{:03}.png", offset + i), png(32, 48)));
        }
        self
    }

    pub fn page(mut self, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.entries.push((name.into(), bytes));
        self
    }

    pub fn comic_info(self, xml: &str) -> Self {
        self.page(crate::consts::COMIC_INFO_ENTRY, xml.as_bytes().to_vec())
    }

    /// Sets the archive comment, which is where ComicBookInfo lives.
    pub fn comic_book_info(mut self, json: &str) -> Self {
        self.comment = Some(json.to_string());
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, bytes) in &self.entries {
            zip.start_file(name.as_str(), options).expect("start fixture entry");
            zip.write_all(bytes).expect("write fixture entry");
        }
        if let Some(comment) = &self.comment {
            zip.set_comment(comment.clone());
        }
        zip.finish().expect("finish fixture archive").into_inner()
    }

    pub fn write(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture directory");
        }
        std::fs::write(path, self.to_bytes()).expect("write fixture archive");
    }
}
