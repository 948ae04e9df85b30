//! Page rendering: Markdown content to complete HTML documents.
//!
//! Each `content/*.md` file becomes one page. The document shell is built
//! with [maud](https://maud.lambda.xyz/) — compile-time templates, type-safe
//! interpolation, auto-escaping — and the Markdown body is converted with
//! pulldown-cmark and spliced in pre-escaped.
//!
//! Asset references are injected structurally: the build pipeline hands this
//! module the minified stylesheet and script names it produced, so rendered
//! pages point at `*.min.*` files by construction rather than by a
//! find-and-replace pass over the HTML.
//!
//! Every page carries the metadata the accessibility audits check for:
//! `<html lang>`, charset, viewport, description, and a non-empty title.

use crate::config::SiteConfig;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd, html as md_html};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("page file has no stem: {0}")]
    BadPageName(String),
}

/// A content page sourced from one Markdown file.
#[derive(Debug, Clone)]
pub struct Page {
    /// Output name without extension (`index`, `about`, ...).
    pub slug: String,
    /// First `#` heading, or the slug when the page has none.
    pub title: String,
    /// Converted Markdown body.
    pub body_html: String,
}

/// Minified asset names the template stage links into every page.
#[derive(Debug, Clone, Default)]
pub struct AssetRefs {
    /// Stylesheet names under `css/`, sorted for deterministic output.
    pub stylesheets: Vec<String>,
    /// Primary script name under `js/`, when the site has one.
    pub script: Option<String>,
    /// Whether favicon.svg / favicon.ico were produced.
    pub favicon: bool,
}

/// Read every `*.md` file in `content_dir` into a [`Page`], sorted by slug.
pub fn collect_pages(content_dir: &Path) -> Result<Vec<Page>, RenderError> {
    let mut pages = Vec::new();
    for entry in fs::read_dir(content_dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().is_none_or(|e| e != "md") {
            continue;
        }
        let slug = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| RenderError::BadPageName(path.display().to_string()))?
            .to_string();
        let markdown = fs::read_to_string(&path)?;
        let (title, body_html) = markdown_to_html(&markdown);
        pages.push(Page {
            title: title.unwrap_or_else(|| slug.clone()),
            slug,
            body_html,
        });
    }
    pages.sort_by(|a, b| a.slug.cmp(&b.slug));
    Ok(pages)
}

/// Convert Markdown to HTML, extracting the first `#` heading as the title.
pub fn markdown_to_html(markdown: &str) -> (Option<String>, String) {
    let mut title: Option<String> = None;
    let mut in_first_h1 = false;
    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) if title.is_none() => in_first_h1 = true,
            Event::End(TagEnd::Heading(HeadingLevel::H1)) if in_first_h1 => {
                in_first_h1 = false;
                if title.is_none() {
                    title = Some(String::new());
                }
            }
            Event::Text(text) | Event::Code(text) if in_first_h1 => {
                title.get_or_insert_with(String::new).push_str(&text);
            }
            _ => {}
        }
    }
    // An empty captured heading is as good as none
    let title = title.filter(|t| !t.trim().is_empty());

    let mut body = String::new();
    md_html::push_html(&mut body, Parser::new(markdown));
    (title, body)
}

/// Render one page into a complete HTML document.
pub fn render_page(config: &SiteConfig, page: &Page, assets: &AssetRefs) -> Markup {
    let document_title = if page.slug == "index" {
        config.title.clone()
    } else {
        format!("{} — {}", page.title, config.title)
    };

    html! {
        (DOCTYPE)
        html lang=(config.language) {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                @if !config.description.is_empty() {
                    meta name="description" content=(config.description);
                }
                title { (document_title) }
                @if assets.favicon {
                    link rel="icon" href="/favicon.ico" sizes="48x48";
                    link rel="icon" href="/favicon.svg" type="image/svg+xml";
                }
                @for stylesheet in &assets.stylesheets {
                    link rel="stylesheet" href={ "/css/" (stylesheet) };
                }
            }
            body {
                main {
                    (PreEscaped(&page.body_html))
                }
                @if let Some(script) = &assets.script {
                    script src={ "/js/" (script) } defer {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn assets() -> AssetRefs {
        AssetRefs {
            stylesheets: vec!["main.min.css".to_string()],
            script: Some("main.min.js".to_string()),
            favicon: true,
        }
    }

    #[test]
    fn title_comes_from_first_heading() {
        let (title, body) = markdown_to_html("# Hello World\n\nSome *text*.\n");
        assert_eq!(title.as_deref(), Some("Hello World"));
        assert!(body.contains("<h1>Hello World</h1>"));
        assert!(body.contains("<em>text</em>"));
    }

    #[test]
    fn pages_without_a_heading_fall_back_to_the_slug() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("notes.md"), "just a paragraph\n").unwrap();
        let pages = collect_pages(tmp.path()).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].title, "notes");
    }

    #[test]
    fn pages_are_sorted_by_slug() {
        let tmp = TempDir::new().unwrap();
        for name in ["work.md", "about.md", "index.md"] {
            fs::write(tmp.path().join(name), "# T\n").unwrap();
        }
        fs::write(tmp.path().join("ignore.txt"), "not a page").unwrap();
        let pages = collect_pages(tmp.path()).unwrap();
        let slugs: Vec<&str> = pages.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, ["about", "index", "work"]);
    }

    #[test]
    fn rendered_page_links_minified_assets() {
        let config = SiteConfig::default();
        let page = Page {
            slug: "about".to_string(),
            title: "About".to_string(),
            body_html: "<h1>About</h1>".to_string(),
        };
        let doc = render_page(&config, &page, &assets()).into_string();
        assert!(doc.contains(r#"href="/css/main.min.css""#));
        assert!(doc.contains(r#"src="/js/main.min.js""#));
        assert!(doc.contains(r#"href="/favicon.ico""#));
    }

    #[test]
    fn rendered_page_carries_audit_metadata() {
        let mut config = SiteConfig::default();
        config.description = "Personal portfolio".to_string();
        let page = Page {
            slug: "index".to_string(),
            title: "Home".to_string(),
            body_html: "<h1>Home</h1>".to_string(),
        };
        let doc = render_page(&config, &page, &assets()).into_string();
        assert!(doc.contains(r#"<html lang="en">"#));
        assert!(doc.contains(r#"charset="UTF-8""#));
        assert!(doc.contains(r#"name="viewport""#));
        assert!(doc.contains(r#"content="Personal portfolio""#));
        assert!(doc.contains(&format!("<title>{}</title>", config.title)));
    }

    #[test]
    fn non_index_titles_include_the_site_name() {
        let config = SiteConfig::default();
        let page = Page {
            slug: "about".to_string(),
            title: "About".to_string(),
            body_html: String::new(),
        };
        let doc = render_page(&config, &page, &assets()).into_string();
        assert!(doc.contains("<title>About — Portfolio</title>"));
    }
}
