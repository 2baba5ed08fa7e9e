//! Filename derivation and sanitization for downloaded PDFs.
//!
//! PubMed candidates are stored under their PMC identifier. Scholar
//! candidates are URLs, so their stem is built from the last path segment
//! plus a short SHA-256 digest of the whole URL; two different URLs never
//! collide, and the same URL always maps to the same file.

use sha2::{Digest, Sha256};
use url::Url;

use crate::search::Candidate;
use crate::source::Provider;

/// Maximum characters kept from a URL's last path segment.
const MAX_URL_STEM_CHARS: usize = 80;

/// Hex characters of the URL digest appended to Scholar stems.
const DIGEST_HEX_CHARS: usize = 8;

/// Returns the `.pdf` filename a candidate is downloaded to.
#[must_use]
pub fn pdf_file_name(provider: Provider, candidate: &Candidate) -> String {
    format!("{}.pdf", file_stem_for(provider, candidate))
}

/// Returns the filename stem (no extension) for a candidate.
#[must_use]
pub fn file_stem_for(provider: Provider, candidate: &Candidate) -> String {
    match provider {
        Provider::PubMed => {
            let stem = sanitize_filename_component(candidate.as_str());
            if stem.is_empty() {
                format!("pmc_{}", url_digest(candidate.as_str()))
            } else {
                stem
            }
        }
        Provider::Scholar => scholar_stem(candidate.as_str()),
    }
}

fn scholar_stem(url: &str) -> String {
    let digest = url_digest(url);
    let segment = Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.rfind(|s| !s.is_empty()).map(str::to_string))
        })
        .unwrap_or_default();
    let segment = urlencoding::decode(&segment)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or(segment);

    let without_ext = match segment.rfind('.') {
        Some(pos) if pos > 0 => &segment[..pos],
        _ => segment.as_str(),
    };
    let cleaned: String = sanitize_filename_component(without_ext)
        .chars()
        .take(MAX_URL_STEM_CHARS)
        .collect();

    if cleaned.is_empty() {
        format!("scholar_{digest}")
    } else {
        format!("{cleaned}_{digest}")
    }
}

fn url_digest(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    let mut hex = String::with_capacity(DIGEST_HEX_CHARS);
    for byte in digest.iter().take(DIGEST_HEX_CHARS / 2) {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

/// Collapses anything outside `[A-Za-z0-9._-]` (Unicode letters allowed) into
/// single underscores and trims leading/trailing underscores.
pub(crate) fn sanitize_filename_component(value: &str) -> String {
    let mut out = String::new();
    let mut prev_sep = false;
    for ch in value.chars() {
        let mapped = match ch {
            c if c.is_alphanumeric() || matches!(c, '-' | '.') => c,
            _ => '_',
        };
        if mapped == '_' {
            if !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else {
            out.push(mapped);
            prev_sep = false;
        }
    }
    out.trim_matches('_').to_string()
}

/// Replaces the characters `< > : " / \ | ? *` and control characters with
/// underscores, leaving everything else intact.
pub(crate) fn replace_reserved_chars(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pubmed_stem_is_pmcid() {
        let candidate = Candidate::new("PMC1234567");
        assert_eq!(file_stem_for(Provider::PubMed, &candidate), "PMC1234567");
        assert_eq!(
            pdf_file_name(Provider::PubMed, &candidate),
            "PMC1234567.pdf"
        );
    }

    #[test]
    fn test_scholar_stem_uses_last_segment_and_digest() {
        let candidate = Candidate::new("https://arxiv.org/pdf/2101.00001v2.pdf");
        let stem = file_stem_for(Provider::Scholar, &candidate);
        assert!(stem.starts_with("2101.00001v2_"), "got {stem}");
        assert_eq!(stem.len(), "2101.00001v2_".len() + DIGEST_HEX_CHARS);
    }

    #[test]
    fn test_scholar_stem_is_stable_and_distinct() {
        let a = Candidate::new("https://a.example/paper.pdf");
        let b = Candidate::new("https://b.example/paper.pdf");
        assert_eq!(
            file_stem_for(Provider::Scholar, &a),
            file_stem_for(Provider::Scholar, &a)
        );
        assert_ne!(
            file_stem_for(Provider::Scholar, &a),
            file_stem_for(Provider::Scholar, &b)
        );
    }

    #[test]
    fn test_scholar_stem_without_path_falls_back() {
        let candidate = Candidate::new("https://example.com/");
        let stem = file_stem_for(Provider::Scholar, &candidate);
        assert!(stem.starts_with("scholar_"), "got {stem}");
    }

    #[test]
    fn test_scholar_stem_truncates_long_segments() {
        let long = "x".repeat(300);
        let candidate = Candidate::new(format!("https://example.com/{long}.pdf"));
        let stem = file_stem_for(Provider::Scholar, &candidate);
        assert_eq!(stem.len(), MAX_URL_STEM_CHARS + 1 + DIGEST_HEX_CHARS);
    }

    #[test]
    fn test_sanitize_filename_component_collapses_separators() {
        assert_eq!(sanitize_filename_component("a b//c"), "a_b_c");
        assert_eq!(sanitize_filename_component("__x__"), "x");
    }

    #[test]
    fn test_replace_reserved_chars() {
        assert_eq!(replace_reserved_chars("a<b>c:d\"e/f\\g|h?i*j"), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(replace_reserved_chars("plain term"), "plain term");
    }
}
