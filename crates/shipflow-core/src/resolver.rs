//! ブランチ → 環境の解決

use crate::model::BranchRules;
use tracing::debug;

/// Gitの完全なref（`refs/heads/main`）からブランチ名を取り出す
///
/// それ以外の文字列はそのまま返す。
pub fn branch_from_ref(reference: &str) -> &str {
    reference.strip_prefix("refs/heads/").unwrap_or(reference)
}

/// ブランチ名から環境名を解決する
///
/// ルールを宣言順に評価し、最初にマッチしたものを採用する。
/// どれにもマッチしなければデフォルト環境を返すため、必ず何かしらの環境が決まる。
pub fn resolve<'a>(branch: &str, rules: &'a BranchRules) -> &'a str {
    let environment = rules
        .rules
        .iter()
        .find(|rule| rule.pattern.matches(branch))
        .map(|rule| rule.environment.as_str())
        .unwrap_or(rules.default_environment.as_str());
    debug!(branch, environment, "Resolved environment");
    environment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BranchPattern, BranchRule};
    use proptest::prelude::*;

    fn rules() -> BranchRules {
        BranchRules::new(
            vec![
                BranchRule::new(BranchPattern::parse("main").unwrap(), "prod"),
                BranchRule::new(BranchPattern::parse("develop").unwrap(), "staging"),
                BranchRule::new(BranchPattern::parse("feature/*").unwrap(), "dev"),
            ],
            "dev",
        )
    }

    #[test]
    fn test_resolve_rules() {
        let rules = rules();
        assert_eq!(resolve("main", &rules), "prod");
        assert_eq!(resolve("develop", &rules), "staging");
        assert_eq!(resolve("feature/x", &rules), "dev");
        assert_eq!(resolve("hotfix/y", &rules), "dev");
    }

    #[test]
    fn test_resolve_first_match_wins() {
        let rules = BranchRules::new(
            vec![
                BranchRule::new(BranchPattern::parse("release/*").unwrap(), "staging"),
                BranchRule::new(BranchPattern::parse("release/v1").unwrap(), "prod"),
            ],
            "dev",
        );
        assert_eq!(resolve("release/v1", &rules), "staging");
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        assert_eq!(resolve("Main", &rules()), "dev");
    }

    #[test]
    fn test_resolve_without_rules_uses_default() {
        assert_eq!(resolve("main", &BranchRules::default()), "dev");
        let custom = BranchRules::new(vec![], "sandbox");
        assert_eq!(resolve("anything", &custom), "sandbox");
    }

    #[test]
    fn test_branch_from_ref() {
        assert_eq!(branch_from_ref("refs/heads/main"), "main");
        assert_eq!(branch_from_ref("refs/heads/feature/x"), "feature/x");
        assert_eq!(branch_from_ref("develop"), "develop");
        assert_eq!(branch_from_ref("refs/tags/v1.0"), "refs/tags/v1.0");
    }

    proptest! {
        #[test]
        fn prop_resolve_is_total(branch in "[a-zA-Z0-9/*._-]{0,24}") {
            let rules = rules();
            let env = resolve(&branch, &rules);
            prop_assert!(["prod", "staging", "dev"].contains(&env));
        }

        #[test]
        fn prop_resolve_any_string(branch in any::<String>()) {
            let rules = rules();
            let env = resolve(&branch, &rules);
            prop_assert!(!env.is_empty());
        }
    }
}
