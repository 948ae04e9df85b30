//! Build pipeline orchestration.
//!
//! The pipeline is a linear sequence of file transformations:
//!
//! ```text
//! 1. Clean      remove + recreate the output directory
//! 2. Assets     minify script + stylesheets, favicon, copies, sitemap  (parallel)
//! 3. Pages      markdown → template → minified HTML                    (sequential)
//! ```
//!
//! The asset stage fans out over independent [`AssetTask`]s with rayon.
//! Every task writes to a disjoint output path, so the stage needs no
//! synchronization; completion is a join and the first failure aborts the
//! build. The page stage runs after the join because it links the minified
//! filenames the asset stage produced.
//!
//! Failure policy is global: any error propagates out and the process exits
//! non-zero. No partial build is ever reported as success.

use crate::config::{self, SiteConfig};
use crate::favicon::{self, FaviconError};
use crate::minify::{self, MinifyError};
use crate::render::{self, AssetRefs, RenderError};
use crate::sitemap::{self, SitemapError};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Minify error: {0}")]
    Minify(#[from] MinifyError),
    #[error("Favicon error: {0}")]
    Favicon(#[from] FaviconError),
    #[error("Sitemap error: {0}")]
    Sitemap(#[from] SitemapError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    #[error("content directory not found: {0}")]
    MissingContent(PathBuf),
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Build inputs resolved by the CLI.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Site source directory (contains `content/`, `static/`, ...).
    pub source: PathBuf,
    /// Output directory; removed and recreated on every build.
    pub output: PathBuf,
    /// Override for the sitemap date; tests pin this for determinism.
    /// Falls back to `build.sitemap_date` from config, then today.
    pub date: Option<String>,
}

/// What the build produced, for CLI display.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// One line per completed asset task.
    pub assets: Vec<String>,
    /// `(title, output file)` per rendered page.
    pub pages: Vec<(String, String)>,
}

/// One unit of the parallel asset stage. Every variant writes only to paths
/// derived from its own inputs.
enum AssetTask {
    MinifyScript { source: PathBuf, name: String },
    MinifyStylesheet { source: PathBuf, name: String },
    Favicon { source: PathBuf },
    Sitemap { source: PathBuf, date: String },
    CopyDir { source: PathBuf, name: String },
    CopyFile { source: PathBuf, name: String },
}

/// Run the full pipeline. Returns a report on success; the first failing
/// stage or task aborts the build.
pub fn build(options: &BuildOptions) -> Result<BuildReport, BuildError> {
    let config = config::load_config(&options.source)?;
    let content_dir = options.source.join("content");
    if !content_dir.is_dir() {
        return Err(BuildError::MissingContent(content_dir));
    }

    clean_output(&options.output)?;

    let date = options
        .date
        .clone()
        .or_else(|| config.build.sitemap_date.clone())
        .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());

    let tasks = plan_asset_tasks(&options.source, &config, &date)?;
    let mut assets: Vec<String> = tasks
        .par_iter()
        .map(|task| run_asset_task(task, &options.output))
        .collect::<Result<_, _>>()?;
    assets.sort();

    let asset_refs = collect_asset_refs(&options.output, &config);
    let pages = render_pages(&content_dir, &config, &asset_refs, &options.output)?;

    Ok(BuildReport { assets, pages })
}

/// Recursively delete then recreate the output directory.
fn clean_output(output: &Path) -> Result<(), BuildError> {
    if output.exists() {
        fs::remove_dir_all(output)?;
    }
    fs::create_dir_all(output)?;
    Ok(())
}

/// Enumerate the asset stage from whatever the source tree provides.
///
/// Only `content/` is required input; a site without a favicon, sitemap, or
/// script simply gets fewer tasks.
fn plan_asset_tasks(
    source: &Path,
    config: &SiteConfig,
    date: &str,
) -> Result<Vec<AssetTask>, BuildError> {
    let static_dir = source.join("static");
    let mut tasks = Vec::new();

    let script = static_dir.join("js").join(&config.build.primary_script);
    if script.is_file() {
        tasks.push(AssetTask::MinifyScript {
            name: config.build.primary_script.clone(),
            source: script,
        });
    }

    let css_dir = static_dir.join("css");
    if css_dir.is_dir() {
        for entry in fs::read_dir(&css_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|e| e == "css") {
                let name = entry.file_name().to_string_lossy().into_owned();
                tasks.push(AssetTask::MinifyStylesheet { source: path, name });
            }
        }
    }

    let favicon = static_dir.join("favicon.svg");
    if favicon.is_file() {
        tasks.push(AssetTask::Favicon { source: favicon });
    }

    let sitemap = static_dir.join("sitemap.xml");
    if sitemap.is_file() {
        tasks.push(AssetTask::Sitemap {
            source: sitemap,
            date: date.to_string(),
        });
    }

    // Root-level static files (robots.txt and friends) pass through as-is
    if static_dir.is_dir() {
        for entry in fs::read_dir(&static_dir)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if path.is_file() && name != "favicon.svg" && name != "sitemap.xml" {
                tasks.push(AssetTask::CopyFile { source: path, name });
            }
        }
    }

    for dir in &config.build.copy_dirs {
        let path = source.join(dir);
        if path.is_dir() {
            tasks.push(AssetTask::CopyDir {
                source: path,
                name: dir.clone(),
            });
        }
    }

    Ok(tasks)
}

/// Execute one asset task, returning its report line.
fn run_asset_task(task: &AssetTask, output: &Path) -> Result<String, BuildError> {
    match task {
        AssetTask::MinifyScript { source, name } => {
            let min = minify::min_name(name);
            let js_dir = output.join("js");
            fs::create_dir_all(&js_dir)?;
            let minified = minify::minify_js(&fs::read_to_string(source)?);
            let trailer = minify::source_map_trailer(&min, false);
            fs::write(js_dir.join(&min), format!("{minified}{trailer}"))?;
            fs::write(
                js_dir.join(format!("{min}.map")),
                minify::source_map_stub(name, &min),
            )?;
            Ok(format!("js/{min}"))
        }
        AssetTask::MinifyStylesheet { source, name } => {
            let min = minify::min_name(name);
            let css_dir = output.join("css");
            fs::create_dir_all(&css_dir)?;
            let minified = minify::minify_css(&fs::read_to_string(source)?, name)?;
            let trailer = minify::source_map_trailer(&min, true);
            fs::write(css_dir.join(&min), format!("{minified}{trailer}"))?;
            fs::write(
                css_dir.join(format!("{min}.map")),
                minify::source_map_stub(name, &min),
            )?;
            Ok(format!("css/{min}"))
        }
        AssetTask::Favicon { source } => {
            let svg = fs::read_to_string(source)?;
            let optimized = favicon::optimize_svg(&svg)?;
            fs::write(output.join("favicon.svg"), &optimized)?;
            fs::write(output.join("favicon.ico"), favicon::render_ico(&optimized)?)?;
            Ok("favicon.svg + favicon.ico".to_string())
        }
        AssetTask::Sitemap { source, date } => {
            let xml = fs::read_to_string(source)?;
            fs::write(
                output.join("sitemap.xml"),
                sitemap::refresh_lastmod(&xml, date)?,
            )?;
            Ok(format!("sitemap.xml (lastmod {date})"))
        }
        AssetTask::CopyDir { source, name } => {
            let copied = copy_tree(source, &output.join(name))?;
            Ok(format!("{name}/ ({copied} files)"))
        }
        AssetTask::CopyFile { source, name } => {
            fs::copy(source, output.join(name))?;
            Ok(name.clone())
        }
    }
}

/// Copy a directory tree, returning the number of files copied.
fn copy_tree(source: &Path, dest: &Path) -> Result<usize, BuildError> {
    let mut copied = 0;
    for entry in WalkDir::new(source) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .expect("walkdir yields descendants of its root");
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Derive the asset names pages should link, from what the asset stage wrote.
fn collect_asset_refs(output: &Path, config: &SiteConfig) -> AssetRefs {
    let mut stylesheets = Vec::new();
    if let Ok(entries) = fs::read_dir(output.join("css")) {
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".css") {
                stylesheets.push(name);
            }
        }
    }
    stylesheets.sort();

    let min_script = minify::min_name(&config.build.primary_script);
    let script = output.join("js").join(&min_script).is_file().then_some(min_script);
    let favicon = output.join("favicon.ico").is_file();

    AssetRefs {
        stylesheets,
        script,
        favicon,
    }
}

/// The sequential template stage: render, minify, write each page.
fn render_pages(
    content_dir: &Path,
    config: &SiteConfig,
    assets: &AssetRefs,
    output: &Path,
) -> Result<Vec<(String, String)>, BuildError> {
    let mut rendered = Vec::new();
    for page in render::collect_pages(content_dir)? {
        let document = render::render_page(config, &page, assets).into_string();
        let file = format!("{}.html", page.slug);
        fs::write(output.join(&file), minify::minify_html(&document))?;
        rendered.push((page.title, file));
    }
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn minimal_site(root: &Path) {
        write(&root.join("content/index.md"), "# Hello\n\nWelcome.\n");
        write(
            &root.join("static/css/main.css"),
            "body { color: #111111; }\n",
        );
    }

    #[test]
    fn missing_content_dir_is_a_configuration_error() {
        let tmp = TempDir::new().unwrap();
        let options = BuildOptions {
            source: tmp.path().join("site"),
            output: tmp.path().join("dist"),
            date: None,
        };
        let err = build(&options).unwrap_err();
        assert!(matches!(err, BuildError::MissingContent(_)), "got: {err}");
    }

    #[test]
    fn clean_removes_stale_output() {
        let tmp = TempDir::new().unwrap();
        let site = tmp.path().join("site");
        minimal_site(&site);
        let dist = tmp.path().join("dist");
        write(&dist.join("stale.html"), "old");

        build(&BuildOptions {
            source: site,
            output: dist.clone(),
            date: Some("2026-01-01".to_string()),
        })
        .unwrap();

        assert!(!dist.join("stale.html").exists());
        assert!(dist.join("index.html").exists());
    }

    #[test]
    fn pages_link_the_minified_stylesheet() {
        let tmp = TempDir::new().unwrap();
        let site = tmp.path().join("site");
        minimal_site(&site);
        let dist = tmp.path().join("dist");

        build(&BuildOptions {
            source: site,
            output: dist.clone(),
            date: Some("2026-01-01".to_string()),
        })
        .unwrap();

        assert!(dist.join("css/main.min.css").exists());
        assert!(dist.join("css/main.min.css.map").exists());
        let page = fs::read_to_string(dist.join("index.html")).unwrap();
        assert!(page.contains("/css/main.min.css"), "page: {page}");
    }

    #[test]
    fn absent_optional_inputs_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let site = tmp.path().join("site");
        minimal_site(&site);

        let report = build(&BuildOptions {
            source: site,
            output: tmp.path().join("dist"),
            date: Some("2026-01-01".to_string()),
        })
        .unwrap();

        // No favicon, sitemap, script, or copy dirs in the minimal site
        assert_eq!(report.assets, vec!["css/main.min.css".to_string()]);
        assert_eq!(report.pages.len(), 1);
    }
}
