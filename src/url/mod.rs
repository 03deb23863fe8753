//! URL handling module for Sumi-Lattice
//!
//! This module provides URL canonicalization, domain extraction, and the
//! resolution rules for relative hrefs found in crawled pages.

mod domain;
mod normalize;

pub use domain::{extract_domain, resolve_href};
pub use normalize::{canonical_host, canonicalize, CanonicalUrl};
