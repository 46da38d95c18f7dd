use crate::types::SelectedImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::io::Reader as ImageReader;
use image::GenericImageView;
use log::warn;
use std::io::Cursor;

/// A local rendering of the selected image; no network involved.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub data_url: String,
    pub dimensions: Option<(u32, u32)>,
}

pub fn render(image: &SelectedImage) -> Preview {
    let data_url = format!("data:{};base64,{}", image.mime, STANDARD.encode(&image.bytes));
    // Undecodable bytes still get a data URL; the backend is the judge of
    // whether the image is usable.
    let dimensions = match ImageReader::new(Cursor::new(&image.bytes))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)
        .and_then(|r| r.decode())
    {
        Ok(i) => Some(i.dimensions()),
        Err(e) => {
            warn!("Failed to decode preview for {}: {:?}", image.name, e);
            None
        }
    };
    Preview {
        data_url,
        dimensions,
    }
}
