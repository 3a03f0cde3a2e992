//! Reference-string normalization.
//!
//! Attribute expressions reference other blocks by address plus an
//! attribute tail: `aws_subnet.main[0].id`, `data.aws_ami.ubuntu.id`,
//! `module.net.aws_vpc.main.cidr_block`. Normalization strips index
//! accesses, splats, and attribute tails down to candidate node
//! addresses. A reference can be ambiguous (`module.cfg.worker_names`
//! is either a nested block or an output of `module.cfg`), so the
//! result is an ordered candidate list; the builder links the first
//! candidate that names a real node.

/// Normalizes one raw reference string into candidate node addresses,
/// most specific first. Returns an empty list for references that can
/// never target a node (`each.*`, `count.*`, `path.*`, `terraform.*`).
#[must_use]
pub fn normalize_reference(raw: &str) -> Vec<String> {
    let stripped = strip_brackets(raw.trim());
    let segments: Vec<&str> = stripped
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if segments.is_empty() {
        return Vec::new();
    }

    match segments[0] {
        "each" | "count" | "path" | "terraform" | "self" => Vec::new(),
        "var" | "local" => head(&segments, 2).into_iter().collect(),
        "data" => head(&segments, 3).into_iter().collect(),
        "module" => module_candidates(&segments),
        // A splat like `aws_instance.web` with no tail is already an
        // address; anything longer strips to its first two segments.
        _ => head(&segments, 2).into_iter().collect(),
    }
}

/// The first `n` segments joined by dots, when that many exist.
fn head(segments: &[&str], n: usize) -> Option<String> {
    if segments.len() >= n {
        Some(segments[..n].join("."))
    } else {
        None
    }
}

/// Candidates for a `module.`-prefixed reference.
///
/// `module.net.aws_vpc.main.id` yields the nested resource address
/// first, then the module itself (an output reference). Nested module
/// chains (`module.a.module.b.*`) recurse.
fn module_candidates(segments: &[&str]) -> Vec<String> {
    let mut candidates = Vec::new();
    if segments.len() < 2 {
        return candidates;
    }
    let prefix = format!("module.{}", segments[1]);
    let rest = &segments[2..];

    if !rest.is_empty() {
        for nested in normalize_reference(&rest.join(".")) {
            candidates.push(format!("{prefix}.{nested}"));
        }
    }
    candidates.push(prefix);
    candidates
}

/// Removes every `[...]` group: indexes, key lookups, and splats.
fn strip_brackets(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut depth = 0usize;
    for ch in raw.chars() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_index_and_attribute_tail() {
        assert_eq!(
            normalize_reference("aws_subnet.main[0].id"),
            vec!["aws_subnet.main"]
        );
        assert_eq!(
            normalize_reference("aws_subnet.main[*].id"),
            vec!["aws_subnet.main"]
        );
        assert_eq!(
            normalize_reference(r#"aws_subnet.main["a"].id"#),
            vec!["aws_subnet.main"]
        );
    }

    #[test]
    fn data_references_keep_three_segments() {
        assert_eq!(
            normalize_reference("data.aws_ami.ubuntu.id"),
            vec!["data.aws_ami.ubuntu"]
        );
    }

    #[test]
    fn module_references_are_ambiguous() {
        assert_eq!(
            normalize_reference("module.net.aws_vpc.main.cidr_block"),
            vec!["module.net.aws_vpc.main", "module.net"]
        );
        assert_eq!(
            normalize_reference("module.cfg.worker_names"),
            vec!["module.cfg"]
        );
    }

    #[test]
    fn nested_modules_recurse() {
        let candidates = normalize_reference("module.a.module.b.aws_vpc.main.id");
        assert_eq!(
            candidates,
            vec![
                "module.a.module.b.aws_vpc.main",
                "module.a.module.b",
                "module.a",
            ]
        );
    }

    #[test]
    fn iteration_pseudorefs_are_dropped() {
        assert!(normalize_reference("each.key").is_empty());
        assert!(normalize_reference("count.index").is_empty());
        assert!(normalize_reference("self.id").is_empty());
    }

    #[test]
    fn variables_and_locals() {
        assert_eq!(normalize_reference("var.region"), vec!["var.region"]);
        assert_eq!(normalize_reference("local.tags.Name"), vec!["local.tags"]);
    }
}
