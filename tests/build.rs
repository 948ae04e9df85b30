//! Full-pipeline integration tests: fixture site in, complete dist/ out.
//!
//! Fixtures are written programmatically into a temp directory so every test
//! gets an isolated site it can mutate freely.

use folio::build::{BuildOptions, build};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

const FAVICON_SVG: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 64 64">
  <rect x="4" y="4" width="56" height="56" rx="8" fill="#222244"/>
</svg>
"##;

const SITEMAP_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url>
    <loc>https://example.com/</loc>
    <lastmod>2021-01-01</lastmod>
  </url>
</urlset>
"#;

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// A complete fixture site exercising every asset task.
fn fixture_site(root: &Path) {
    write(
        &root.join("folio.toml"),
        "title = \"Jane Doe\"\ndescription = \"Portfolio of Jane Doe\"\n",
    );
    write(
        &root.join("content/index.md"),
        "# Hello\n\nWelcome to my portfolio.\n",
    );
    write(
        &root.join("content/about.md"),
        "# About\n\nI build things.\n",
    );
    write(
        &root.join("static/css/main.css"),
        "body {\n    margin: 0;\n    color: #111111;\n}\n",
    );
    write(
        &root.join("static/js/main.js"),
        "// entry point\nfunction init() {\n    console.log('ready');\n}\ninit();\n",
    );
    write(&root.join("static/favicon.svg"), FAVICON_SVG);
    write(&root.join("static/sitemap.xml"), SITEMAP_XML);
    write(&root.join("static/robots.txt"), "User-agent: *\nAllow: /\n");
    write(&root.join("images/project.svg"), "<svg xmlns=\"http://www.w3.org/2000/svg\"/>");
    write(&root.join("case-studies/one.html"), "<p>case</p>");
}

fn build_fixture(date: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let site = tmp.path().join("site");
    fixture_site(&site);
    let dist = tmp.path().join("dist");
    build(&BuildOptions {
        source: site,
        output: dist.clone(),
        date: Some(date.to_string()),
    })
    .unwrap();
    (tmp, dist)
}

/// Snapshot a directory tree as relative path → file bytes.
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut files = BTreeMap::new();
    for entry in WalkDir::new(root) {
        let entry = entry.unwrap();
        if entry.file_type().is_file() {
            let relative = entry.path().strip_prefix(root).unwrap().to_path_buf();
            files.insert(relative, fs::read(entry.path()).unwrap());
        }
    }
    files
}

#[test]
fn build_produces_the_full_output_layout() {
    let (_tmp, dist) = build_fixture("2026-08-30");

    for file in [
        "index.html",
        "about.html",
        "css/main.min.css",
        "css/main.min.css.map",
        "js/main.min.js",
        "js/main.min.js.map",
        "favicon.svg",
        "favicon.ico",
        "sitemap.xml",
        "robots.txt",
        "images/project.svg",
        "case-studies/one.html",
    ] {
        assert!(dist.join(file).is_file(), "missing {file}");
    }
}

#[test]
fn pages_reference_minified_assets() {
    let (_tmp, dist) = build_fixture("2026-08-30");

    let index = fs::read_to_string(dist.join("index.html")).unwrap();
    assert!(index.contains("/css/main.min.css"), "index: {index}");
    assert!(index.contains("/js/main.min.js"));
    assert!(index.contains("Welcome to my portfolio"));
    // Configured metadata made it through
    assert!(index.contains("Jane Doe"));
    assert!(index.contains("Portfolio of Jane Doe"));
}

#[test]
fn minified_assets_are_smaller_and_mapped() {
    let (tmp, dist) = build_fixture("2026-08-30");

    let original = fs::metadata(tmp.path().join("site/static/css/main.css"))
        .unwrap()
        .len();
    let minified = fs::read_to_string(dist.join("css/main.min.css")).unwrap();
    assert!((minified.len() as u64) < original + 60, "not minified: {minified}");
    assert!(minified.contains("sourceMappingURL=main.min.css.map"));

    let js = fs::read_to_string(dist.join("js/main.min.js")).unwrap();
    assert!(!js.contains("// entry point"));
    assert!(js.contains("sourceMappingURL=main.min.js.map"));
}

#[test]
fn sitemap_carries_the_build_date() {
    let (_tmp, dist) = build_fixture("2026-08-30");
    let sitemap = fs::read_to_string(dist.join("sitemap.xml")).unwrap();
    assert!(sitemap.contains("<lastmod>2026-08-30</lastmod>"));
    assert!(!sitemap.contains("2021-01-01"));
}

#[test]
fn favicon_pair_is_generated_from_the_vector_source() {
    let (_tmp, dist) = build_fixture("2026-08-30");

    let svg = fs::read_to_string(dist.join("favicon.svg")).unwrap();
    assert!(!svg.contains("<?xml"), "svg not optimized: {svg}");
    assert!(svg.starts_with("<svg"));

    let ico = fs::read(dist.join("favicon.ico")).unwrap();
    assert_eq!(&ico[0..4], &[0, 0, 1, 0], "not an ICO file");
}

#[test]
fn builds_are_deterministic_for_a_fixed_date() {
    let tmp = TempDir::new().unwrap();
    let site = tmp.path().join("site");
    fixture_site(&site);

    let dist_a = tmp.path().join("dist-a");
    let dist_b = tmp.path().join("dist-b");
    for dist in [&dist_a, &dist_b] {
        build(&BuildOptions {
            source: site.clone(),
            output: dist.clone(),
            date: Some("2026-08-30".to_string()),
        })
        .unwrap();
    }

    let a = snapshot(&dist_a);
    let b = snapshot(&dist_b);
    assert_eq!(
        a.keys().collect::<Vec<_>>(),
        b.keys().collect::<Vec<_>>(),
        "file sets differ"
    );
    for (path, bytes) in &a {
        assert_eq!(bytes, &b[path], "{} differs between builds", path.display());
    }
}

#[test]
fn rebuild_over_existing_output_is_clean() {
    let tmp = TempDir::new().unwrap();
    let site = tmp.path().join("site");
    fixture_site(&site);
    let dist = tmp.path().join("dist");

    let options = BuildOptions {
        source: site.clone(),
        output: dist.clone(),
        date: Some("2026-08-30".to_string()),
    };
    build(&options).unwrap();

    // Remove a page from the source; a rebuild must not leave the old one
    fs::remove_file(site.join("content/about.md")).unwrap();
    build(&options).unwrap();
    assert!(!dist.join("about.html").exists());
    assert!(dist.join("index.html").exists());
}

#[test]
fn invalid_css_aborts_the_build() {
    let tmp = TempDir::new().unwrap();
    let site = tmp.path().join("site");
    fixture_site(&site);
    // An unterminated comment is one of the few things the CSS minifier rejects
    write(&site.join("static/css/broken.css"), "/* never closed");

    let result = build(&BuildOptions {
        source: site,
        output: tmp.path().join("dist"),
        date: Some("2026-08-30".to_string()),
    });
    assert!(result.is_err(), "broken stylesheet should fail the build");
}
