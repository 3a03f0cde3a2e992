//! Input envelope and request normalization.
//!
//! The envelope is the canonical, content-addressed representation of
//! one estimation request. Normalization is deterministic and
//! side-effect free apart from optional reference resolution, which is
//! the caller's network seam.
//!
//! The input hash covers *only* the fields that affect estimation:
//! canonical path, resolved reference, mode, usage profile. Option
//! flags, timestamps, and client identity never reach the hash.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EstimateError, EstimateResult};
use crate::hashing::sha256_hex;

// =============================================================================
// SOURCE KIND
// =============================================================================

/// Where the configuration comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A git repository (github/gitlab/bitbucket hosts normalize here).
    Git,
    /// An uploaded archive.
    Upload,
    /// A local filesystem path.
    Local,
}

impl SourceKind {
    /// Normalizes a raw source-kind string.
    ///
    /// `github`/`gitlab`/`bitbucket` → git, `uploaded` → upload,
    /// `file`/`path` → local; anything unrecognized → local.
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "git" | "github" | "gitlab" | "bitbucket" => Self::Git,
            "upload" | "uploaded" => Self::Upload,
            _ => Self::Local,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Git => "git",
            Self::Upload => "upload",
            Self::Local => "local",
        };
        write!(f, "{s}")
    }
}

// =============================================================================
// ESTIMATION MODE
// =============================================================================

/// Whether unresolved conditions surface as symbolic outputs plus
/// warnings (permissive) or abort the estimation (strict).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimationMode {
    /// Unresolvable conditions abort with an error.
    Strict,
    /// Unresolvable conditions become symbolic outputs and warnings.
    #[default]
    Permissive,
}

impl EstimationMode {
    /// Parses a mode string; anything unrecognized is permissive.
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "strict" => Self::Strict,
            _ => Self::Permissive,
        }
    }

    /// True in strict mode.
    #[must_use]
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Strict)
    }
}

impl fmt::Display for EstimationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Strict => "strict",
            Self::Permissive => "permissive",
        };
        write!(f, "{s}")
    }
}

// =============================================================================
// REFERENCE RESOLUTION
// =============================================================================

/// Resolves git references (branches, tags) to commit identifiers.
///
/// This is the only network seam in normalization. Implementations
/// live with the caller; the core never talks to a remote.
pub trait RefResolver {
    /// Resolves `reference` in `repository` to a commit id.
    fn resolve(&self, repository: &str, reference: &str) -> Result<String, String>;
}

// =============================================================================
// RAW REQUEST
// =============================================================================

/// Option flags on a request. These shape the output, never the hash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeOptions {
    /// Include the sealed dependency graph in the result.
    #[serde(default)]
    pub include_dependency_graph: bool,
    /// Include per-unit lineage records.
    #[serde(default)]
    pub include_lineage: bool,
    /// Include per-component cost units.
    #[serde(default)]
    pub include_components: bool,
}

/// An unnormalized request descriptor as received from the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRequest {
    /// Raw source kind string (`github`, `uploaded`, `file`, ...).
    pub source: String,
    /// Repository URL for git sources.
    #[serde(default)]
    pub repository: Option<String>,
    /// Branch, tag, or commit for git sources.
    #[serde(default)]
    pub reference: Option<String>,
    /// Configuration path, or the upload id for upload sources.
    pub path: String,
    /// Raw mode string.
    #[serde(default)]
    pub mode: String,
    /// Usage profile tag; empty means `default`.
    #[serde(default)]
    pub usage_profile: Option<String>,
    /// Output-shaping flags.
    #[serde(default)]
    pub options: EnvelopeOptions,
}

// =============================================================================
// INPUT ENVELOPE
// =============================================================================

/// The canonical, deterministic representation of one estimation
/// request.
///
/// Two envelopes with equal `input_hash` must produce identical
/// estimation outputs for the same pricing snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEnvelope {
    /// Normalized source kind.
    pub source: SourceKind,
    /// Normalized repository URL, for git sources.
    pub repository: Option<String>,
    /// Resolved commit reference, when resolution succeeded.
    pub reference: Option<String>,
    /// Canonical path (`git:<repo>@<ref>:<path>`, `upload:<id>`, or a
    /// cleaned local path).
    pub canonical_path: String,
    /// Estimation mode.
    pub mode: EstimationMode,
    /// Usage profile tag.
    pub usage_profile: String,
    /// Output-shaping flags; not part of the hash.
    pub options: EnvelopeOptions,
    /// SHA-256 over the hashable fields.
    pub input_hash: String,
}

impl InputEnvelope {
    /// Normalizes a raw request into an envelope.
    ///
    /// When a resolver is supplied, git references are resolved to
    /// commit ids. Resolution failures are tolerated in permissive
    /// mode and fail with `InvalidInput` in strict mode.
    pub fn normalize(
        raw: &RawRequest,
        resolver: Option<&dyn RefResolver>,
    ) -> EstimateResult<InputEnvelope> {
        let source = SourceKind::normalize(&raw.source);
        let mode = EstimationMode::normalize(&raw.mode);
        let repository = raw.repository.as_deref().map(normalize_repository);
        let usage_profile = raw
            .usage_profile
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "default".to_string());

        let reference = match (source, resolver, raw.reference.as_deref()) {
            (SourceKind::Git, Some(resolver), Some(reference)) => {
                let repo = repository.as_deref().unwrap_or("");
                match resolver.resolve(repo, reference) {
                    Ok(commit) => Some(commit),
                    Err(cause) if mode.is_strict() => {
                        return Err(EstimateError::invalid_input_at(
                            format!("cannot resolve reference {reference:?}: {cause}"),
                            repo,
                        ));
                    }
                    Err(cause) => {
                        tracing::debug!(reference, cause, "reference resolution failed");
                        Some(reference.to_string())
                    }
                }
            }
            (SourceKind::Git, None, reference) => reference.map(str::to_string),
            _ => None,
        };

        let canonical_path = match source {
            SourceKind::Git => format!(
                "git:{}@{}:{}",
                repository.as_deref().unwrap_or(""),
                reference.as_deref().unwrap_or(""),
                clean_path(&raw.path)
            ),
            SourceKind::Upload => format!("upload:{}", raw.path.trim()),
            SourceKind::Local => clean_path(&raw.path),
        };

        if raw.path.trim().is_empty() {
            return Err(EstimateError::invalid_input("path must not be empty"));
        }

        let input_hash = compute_input_hash(&canonical_path, reference.as_deref(), mode, &usage_profile);

        Ok(InputEnvelope {
            source,
            repository,
            reference,
            canonical_path,
            mode,
            usage_profile,
            options: raw.options,
            input_hash,
        })
    }
}

/// SHA-256 over the JSON-encoded hashable tuple.
fn compute_input_hash(
    canonical_path: &str,
    reference: Option<&str>,
    mode: EstimationMode,
    usage_profile: &str,
) -> String {
    let tuple = (canonical_path, reference, mode.to_string(), usage_profile);
    let encoded = serde_json::to_vec(&tuple).expect("hash tuple serializes");
    sha256_hex(&encoded)
}

/// Strips a trailing `.git` and rewrites SSH URLs
/// (`user@host:path`) into `https://host/path`.
fn normalize_repository(raw: &str) -> String {
    let trimmed = raw.trim();
    let stripped = trimmed.strip_suffix(".git").unwrap_or(trimmed);

    if !stripped.contains("://") {
        if let Some((userinfo, rest)) = stripped.split_once('@') {
            if let Some((host, path)) = rest.split_once(':') {
                if !userinfo.contains('/') && !host.contains('/') {
                    return format!("https://{host}/{path}");
                }
            }
        }
    }
    stripped.to_string()
}

/// Resolves `.`/`..` segments, collapses separators, converts to
/// forward slashes, and drops any `./` prefix.
fn clean_path(raw: &str) -> String {
    let forward = raw.trim().replace('\\', "/");
    let absolute = forward.starts_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in forward.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedResolver;

    impl RefResolver for FixedResolver {
        fn resolve(&self, _repository: &str, reference: &str) -> Result<String, String> {
            match reference {
                "main" => Ok("abc123def456".to_string()),
                other => Err(format!("unknown ref {other}")),
            }
        }
    }

    fn git_request() -> RawRequest {
        RawRequest {
            source: "github".into(),
            repository: Some("git@github.com:acme/infra.git".into()),
            reference: Some("main".into()),
            path: "./envs/prod".into(),
            mode: "strict".into(),
            usage_profile: None,
            options: EnvelopeOptions::default(),
        }
    }

    #[test]
    fn normalizes_github_ssh_source() {
        let envelope = InputEnvelope::normalize(&git_request(), Some(&FixedResolver)).unwrap();
        assert_eq!(envelope.source, SourceKind::Git);
        assert_eq!(
            envelope.repository.as_deref(),
            Some("https://github.com/acme/infra")
        );
        assert_eq!(envelope.reference.as_deref(), Some("abc123def456"));
        assert_eq!(
            envelope.canonical_path,
            "git:https://github.com/acme/infra@abc123def456:envs/prod"
        );
    }

    #[test]
    fn strict_mode_fails_on_unresolvable_ref() {
        let mut raw = git_request();
        raw.reference = Some("gone".into());
        let err = InputEnvelope::normalize(&raw, Some(&FixedResolver)).unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn permissive_mode_tolerates_unresolvable_ref() {
        let mut raw = git_request();
        raw.reference = Some("gone".into());
        raw.mode = "permissive".into();
        let envelope = InputEnvelope::normalize(&raw, Some(&FixedResolver)).unwrap();
        assert_eq!(envelope.reference.as_deref(), Some("gone"));
    }

    #[test]
    fn cleans_local_paths() {
        let raw = RawRequest {
            source: "file".into(),
            path: "./modules\\network//./../network/vpc".into(),
            ..RawRequest::default()
        };
        let envelope = InputEnvelope::normalize(&raw, None).unwrap();
        assert_eq!(envelope.source, SourceKind::Local);
        assert_eq!(envelope.canonical_path, "network/vpc");
    }

    #[test]
    fn unknown_kinds_fall_back() {
        assert_eq!(SourceKind::normalize("s3-bucket"), SourceKind::Local);
        assert_eq!(EstimationMode::normalize("lenient"), EstimationMode::Permissive);
    }

    #[test]
    fn empty_path_is_invalid() {
        let raw = RawRequest {
            source: "local".into(),
            path: "  ".into(),
            ..RawRequest::default()
        };
        let err = InputEnvelope::normalize(&raw, None).unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn hash_covers_only_hashable_fields() {
        let raw = git_request();
        let a = InputEnvelope::normalize(&raw, Some(&FixedResolver)).unwrap();

        let mut with_options = git_request();
        with_options.options.include_lineage = true;
        let b = InputEnvelope::normalize(&with_options, Some(&FixedResolver)).unwrap();
        assert_eq!(a.input_hash, b.input_hash);

        let mut other_profile = git_request();
        other_profile.usage_profile = Some("prod-heavy".into());
        let c = InputEnvelope::normalize(&other_profile, Some(&FixedResolver)).unwrap();
        assert_ne!(a.input_hash, c.input_hash);
    }

    #[test]
    fn upload_canonical_path_uses_id() {
        let raw = RawRequest {
            source: "uploaded".into(),
            path: "upl-42".into(),
            ..RawRequest::default()
        };
        let envelope = InputEnvelope::normalize(&raw, None).unwrap();
        assert_eq!(envelope.canonical_path, "upload:upl-42");
    }
}
