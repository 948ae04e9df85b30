//! # Folio
//!
//! A minimal static site builder for personal portfolio sites. Markdown
//! content and handwritten assets go in; minified HTML, CSS, and JS come
//! out, ready to drop on any file server.
//!
//! # Architecture: Three-Stage Pipeline
//!
//! ```text
//! 1. Clean      remove + recreate dist/
//! 2. Assets     minify, favicon, copies, sitemap      (parallel fan-out)
//! 3. Pages      markdown → template → minified HTML   (sequential)
//! ```
//!
//! The asset stage runs its tasks concurrently with rayon: every task
//! writes to a disjoint output path, so the stage needs no synchronization
//! and joins fail-fast on the first error. The page stage runs after the
//! join because it links the minified filenames the asset stage produced.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`build`] | Pipeline orchestration — clean, parallel asset stage, page stage |
//! | [`config`] | Typed `folio.toml` loading, pure merge, validation |
//! | [`render`] | Markdown → HTML pages via Maud, minified asset refs injected |
//! | [`minify`] | JS/CSS/HTML minification wrappers, `*.min.*` naming, map sidecars |
//! | [`favicon`] | SVG optimization + multi-resolution ICO encoding |
//! | [`sitemap`] | `<lastmod>` refresh to the build date |
//! | [`server`] | Traversal-safe static file server for previews and tests |
//! | [`output`] | CLI output formatting — pure format functions + print wrappers |
//!
//! # Design Decisions
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/), a compile-time
//! HTML macro system, rather than a runtime template engine:
//!
//! - **Compile-time checking**: malformed HTML is a build error, not a runtime surprise.
//! - **Type-safe**: template variables are Rust expressions — no stringly-typed lookups.
//! - **XSS-safe by default**: all interpolation is auto-escaped.
//! - **Zero runtime files**: no template directory to ship or get out of sync.
//!
//! Asset references are part of the template inputs, so pages link the
//! minified `*.min.*` filenames by construction instead of through a
//! post-render find-and-replace.
//!
//! ## A Server Worth Specifying
//!
//! The one component with a real security contract is [`server`]: every
//! request path is canonicalized and checked for containment in the served
//! root before any file is read. Traversal attempts get `403`, directories
//! without an `index.html` get `404` rather than a listing, and a bad
//! request never takes down the listener. The accessibility test suite
//! drives a headless browser against this server.
//!
//! ## Typed Config, Pure Merge
//!
//! `folio.toml` deserializes into a typed struct with defaults for every
//! field; user files are sparse overlays merged by a pure, unit-tested
//! function. Unknown keys are rejected to catch typos early.
//!
//! ## Fail-Fast Builds
//!
//! Any task failure aborts the whole build and the process exits non-zero.
//! No partial-success state is ever published — the output directory is
//! either a complete site or absent.

pub mod build;
pub mod config;
pub mod favicon;
pub mod minify;
pub mod output;
pub mod render;
pub mod server;
pub mod sitemap;
