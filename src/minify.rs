//! Minification wrappers for JS, CSS, and rendered HTML documents.
//!
//! The actual minifiers are external crates; this module owns the filename
//! convention (`main.js` → `main.min.js`), the source-map sidecars, and the
//! `sourceMappingURL` trailers the build pipeline writes next to each
//! minified asset.
//!
//! The source maps are valid v3 maps with empty `mappings` — the Rust
//! minifier stack does not emit position data, but the output layout
//! (`*.min.*` plus `.map`) stays stable for tooling that expects it.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MinifyError {
    #[error("CSS minification failed for {file}: {message}")]
    Css { file: String, message: String },
}

/// Minify JavaScript source text.
pub fn minify_js(source: &str) -> String {
    minifier::js::minify(source).to_string()
}

/// Minify CSS source text. `file` is only used for error context.
pub fn minify_css(source: &str, file: &str) -> Result<String, MinifyError> {
    minifier::css::minify(source)
        .map(|m| m.to_string())
        .map_err(|e| MinifyError::Css {
            file: file.to_string(),
            message: e.to_string(),
        })
}

/// Minify a rendered HTML document.
///
/// Keeps closing tags and the `<html>`/`<head>` opening tags: the
/// accessibility audits assert on `<html lang>` and document metadata, and
/// the omitted-tag optimizations save almost nothing on pages this small.
pub fn minify_html(document: &str) -> Vec<u8> {
    let mut cfg = minify_html::Cfg::default();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    minify_html::minify(document.as_bytes(), &cfg)
}

/// `main.js` → `main.min.js`; names without an extension gain `.min`.
pub fn min_name(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}.min.{ext}"),
        None => format!("{file_name}.min"),
    }
}

/// A minimal valid source map v3 document for `minified_name`, pointing at
/// the original `source_name`.
pub fn source_map_stub(source_name: &str, minified_name: &str) -> String {
    serde_json::json!({
        "version": 3,
        "file": minified_name,
        "sources": [source_name],
        "names": [],
        "mappings": "",
    })
    .to_string()
}

/// The comment trailer linking a minified asset to its map file.
///
/// CSS needs a block comment; JS uses a line comment.
pub fn source_map_trailer(minified_name: &str, css: bool) -> String {
    let map = format!("{minified_name}.map");
    if css {
        format!("\n/*# sourceMappingURL={map} */\n")
    } else {
        format!("\n//# sourceMappingURL={map}\n")
    }
}
