//! # SEO Refinery
//!
//! A multi-pass validation and correction engine for generated content.
//!
//! SEO Refinery takes a structured content record (title, body, meta
//! description, keywords, image prompts) and iteratively transforms it until
//! it satisfies configurable SEO and readability constraints, or until the
//! loop can prove it cannot improve further.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌───────────────┐
//! │  Detector   │──▶│   Pipeline    │──▶│   Optimizer    │
//! │ issues+score│   │ correct+check│   │ passes+policy │
//! └─────────────┘   └──────┬───────┘   └──────┬────────┘
//!                          │                  │
//!                     ┌────▼─────┐      ┌─────▼─────┐
//!                     │  Cache   │      │  Tracker   │
//!                     │ mem+file │      │ audit+roll │
//!                     └──────────┘      └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! seo validate article.json --focus-keyword rust
//! seo optimize article.json --focus-keyword rust --output fixed.json
//! seo optimize article.json --json > report.json
//! seo completions bash
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`analysis`] | Pure text measurement |
//! | [`detector`] | Issue detection and compliance scoring |
//! | [`traits`] | Analyzer / Corrector / StructurePreserver seams |
//! | [`correct`] | Built-in correctors, one per aspect |
//! | [`store`] | Key-value persistence (memory and JSON file) |
//! | [`cache`] | Two-tier validation cache |
//! | [`retry`] | Bounded retry with strategy learning |
//! | [`pipeline`] | Aspect-ordered validate/correct pipeline |
//! | [`improvement`] | Before/after measurement and trends |
//! | [`tracker`] | Session audit trail and rollback |
//! | [`optimizer`] | The multi-pass optimization loop |
//! | [`log`] | Injectable stderr log sinks |

pub mod analysis;
pub mod cache;
pub mod config;
pub mod correct;
pub mod detector;
pub mod improvement;
pub mod log;
pub mod models;
pub mod optimizer;
pub mod pipeline;
pub mod retry;
pub mod store;
pub mod tracker;
pub mod traits;
