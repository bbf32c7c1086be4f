//! Scope-based check selection.

use crate::policy::CheckSpec;
use crate::task::Scope;

/// Select the checks relevant to `scope`.
///
/// `full` and `unknown` keep everything. Narrowed scopes keep a check when its
/// cwd or id mentions the area or its scope tag names it; untagged checks are
/// dropped. Matching is case-insensitive.
pub fn filter_checks_by_scope(checks: &[CheckSpec], scope: Scope) -> Vec<CheckSpec> {
    checks
        .iter()
        .filter(|check| matches_scope(check, scope))
        .cloned()
        .collect()
}

fn matches_scope(check: &CheckSpec, scope: Scope) -> bool {
    let cwd = check.cwd.as_deref().unwrap_or_default().to_lowercase();
    let id = check.id.to_lowercase();
    let tag = check.scope.as_deref().unwrap_or_default().to_lowercase();

    match scope {
        Scope::Full | Scope::Unknown => true,
        Scope::FrontendOnly => {
            cwd.contains("frontend") || id.contains("frontend") || tag == "frontend"
        }
        Scope::BackendOnly => cwd.contains("backend") || id.contains("backend") || tag == "backend",
        Scope::DocOnly => tag == "doc" || id.contains("doc"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checks() -> Vec<CheckSpec> {
        vec![
            CheckSpec {
                cwd: Some("Backend".to_string()),
                ..CheckSpec::new("unit", "npm test")
            },
            CheckSpec::new("frontend-lint", "npm run lint"),
            CheckSpec {
                scope: Some("FRONTEND".to_string()),
                ..CheckSpec::new("e2e", "npx playwright test")
            },
            CheckSpec::new("docs-links", "lychee docs"),
            CheckSpec {
                scope: Some("doc".to_string()),
                ..CheckSpec::new("spelling", "cspell")
            },
            CheckSpec::new("typecheck", "tsc --noEmit"),
        ]
    }

    fn ids(checks: &[CheckSpec]) -> Vec<&str> {
        checks.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn full_and_unknown_keep_everything() {
        let all = checks();

        assert_eq!(filter_checks_by_scope(&all, Scope::Full), all);
        assert_eq!(filter_checks_by_scope(&all, Scope::Unknown), all);
    }

    #[test]
    fn backend_only_matches_cwd_case_insensitively() {
        let filtered = filter_checks_by_scope(&checks(), Scope::BackendOnly);

        assert_eq!(ids(&filtered), vec!["unit"]);
    }

    #[test]
    fn frontend_only_matches_id_and_tag() {
        let filtered = filter_checks_by_scope(&checks(), Scope::FrontendOnly);

        assert_eq!(ids(&filtered), vec!["frontend-lint", "e2e"]);
    }

    #[test]
    fn doc_only_matches_tag_or_id() {
        let filtered = filter_checks_by_scope(&checks(), Scope::DocOnly);

        assert_eq!(ids(&filtered), vec!["docs-links", "spelling"]);
    }

    #[test]
    fn narrowed_scopes_are_subsets() {
        let all = checks();
        for scope in [Scope::BackendOnly, Scope::FrontendOnly, Scope::DocOnly] {
            let filtered = filter_checks_by_scope(&all, scope);
            assert!(filtered.iter().all(|c| all.contains(c)));
            assert!(!ids(&filtered).contains(&"typecheck"));
        }
    }
}
