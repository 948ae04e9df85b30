//! Favicon conversion: one authored SVG in, an optimized SVG plus a
//! multi-resolution ICO out.
//!
//! The vector source is the single point of truth. The optimization pass is
//! a streaming rewrite that drops comments, the XML declaration, DOCTYPE,
//! and inter-element whitespace. The raster pass renders the vector at
//! 16/32/48 px and packs the frames into one `favicon.ico` — the sizes
//! browsers actually request for tabs, pinned sites, and shortcuts.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::Event;
use resvg::{tiny_skia, usvg};
use std::io::Cursor;
use thiserror::Error;

/// Raster resolutions packed into the ICO, smallest first.
pub const ICO_SIZES: [u32; 3] = [16, 32, 48];

#[derive(Error, Debug)]
pub enum FaviconError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("SVG parse error: {0}")]
    Svg(String),
    #[error("SVG render failed at {0}px")]
    Render(u32),
    #[error("ICO encoding failed: {0}")]
    Encode(String),
}

/// Strip an SVG down to its structural content.
///
/// Drops the XML declaration, DOCTYPE, comments, processing instructions,
/// and whitespace-only text nodes. Element content and attributes pass
/// through byte-for-byte.
pub fn optimize_svg(svg: &str) -> Result<String, FaviconError> {
    let mut reader = Reader::from_str(svg);
    let mut writer = Writer::new(Vec::new());

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Decl(_) | Event::DocType(_) | Event::Comment(_) | Event::PI(_) => {}
            Event::Text(e) => {
                // Whitespace between elements is layout noise in an SVG
                let keep = !e.unescape()?.trim().is_empty();
                if keep {
                    writer.write_event(Event::Text(e))?;
                }
            }
            other => writer.write_event(other)?,
        }
    }

    Ok(String::from_utf8(writer.into_inner()).expect("rewritten SVG is UTF-8"))
}

/// Rasterize the SVG at each of [`ICO_SIZES`] and encode a multi-frame ICO.
pub fn render_ico(svg: &str) -> Result<Vec<u8>, FaviconError> {
    let options = usvg::Options::default();
    let tree =
        usvg::Tree::from_data(svg.as_bytes(), &options).map_err(|e| FaviconError::Svg(e.to_string()))?;

    let mut rasters = Vec::with_capacity(ICO_SIZES.len());
    for size in ICO_SIZES {
        rasters.push((size, rasterize(&tree, size)?));
    }
    let mut frames = Vec::with_capacity(rasters.len());
    for (size, rgba) in &rasters {
        let frame = image::codecs::ico::IcoFrame::as_png(
            rgba,
            *size,
            *size,
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| FaviconError::Encode(e.to_string()))?;
        frames.push(frame);
    }

    let mut out = Cursor::new(Vec::new());
    image::codecs::ico::IcoEncoder::new(&mut out)
        .encode_images(&frames)
        .map_err(|e| FaviconError::Encode(e.to_string()))?;
    Ok(out.into_inner())
}

/// Render the tree into a square `size`×`size` straight-alpha RGBA buffer.
fn rasterize(tree: &usvg::Tree, size: u32) -> Result<Vec<u8>, FaviconError> {
    let mut pixmap = tiny_skia::Pixmap::new(size, size).ok_or(FaviconError::Render(size))?;
    let source = tree.size();
    let transform = tiny_skia::Transform::from_scale(
        size as f32 / source.width(),
        size as f32 / source.height(),
    );
    resvg::render(tree, transform, &mut pixmap.as_mut());

    // tiny-skia stores premultiplied alpha; ICO frames want straight alpha
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);
    for pixel in pixmap.pixels() {
        let p = pixel.demultiply();
        rgba.extend_from_slice(&[p.red(), p.green(), p.blue(), p.alpha()]);
    }
    Ok(rgba)
}
