//! 変更検知
//!
//! 変更ファイル一覧から、デプロイが必要なサービスを求める。

use crate::model::{ServiceDefinition, normalize_path};
use std::collections::BTreeSet;
use tracing::debug;

/// 変更ファイルにマッチしたサービス名の集合を返す
///
/// ファイルはパスセグメント境界でサービスの path と照合する。
/// 1ファイルは高々1サービスにマッチし、重なりがある場合はレジストリ順で先のサービスが勝つ。
/// どのサービスにも属さないファイルは無視する。
pub fn detect<S: AsRef<str>>(changed_files: &[S], services: &[ServiceDefinition]) -> BTreeSet<String> {
    let mut changed = BTreeSet::new();

    for file in changed_files {
        let file = normalize_path(file.as_ref());
        if file.is_empty() {
            continue;
        }
        match services.iter().find(|s| s.owns(&file)) {
            Some(service) => {
                changed.insert(service.name.clone());
            }
            None => debug!(file = %file, "File does not belong to any service"),
        }
    }

    debug!(files = changed_files.len(), services = changed.len(), "Change detection finished");
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ServiceKind;
    use proptest::prelude::*;

    fn services() -> Vec<ServiceDefinition> {
        vec![
            ServiceDefinition::new("user", "backend/user", ServiceKind::Function),
            ServiceDefinition::new("ui", "ui", ServiceKind::ContainerService),
            ServiceDefinition::new(
                "notification",
                "backend/notification_service",
                ServiceKind::Function,
            ),
        ]
    }

    #[test]
    fn test_detect_basic() {
        let changed = detect(&["backend/user/main", "docs/readme.md"], &services()[..2]);
        assert_eq!(changed, BTreeSet::from(["user".to_string()]));
    }

    #[test]
    fn test_detect_empty_input() {
        let files: [&str; 0] = [];
        assert!(detect(&files, &services()).is_empty());
    }

    #[test]
    fn test_detect_no_matches() {
        assert!(detect(&["README.md", "docs/arch.md"], &services()).is_empty());
    }

    #[test]
    fn test_detect_segment_boundary() {
        let svcs = vec![ServiceDefinition::new(
            "user",
            "backend/user_service",
            ServiceKind::Function,
        )];

        assert!(detect(&["backend/user_service_v2/x"], &svcs).is_empty());
        assert_eq!(detect(&["backend/user_service"], &svcs).len(), 1);
    }

    #[test]
    fn test_detect_normalizes_file_paths() {
        let changed = detect(&["./ui/src/App.tsx", "backend/user/"], &services());
        assert_eq!(
            changed,
            BTreeSet::from(["ui".to_string(), "user".to_string()])
        );
    }

    #[test]
    fn test_detect_first_match_wins_on_overlap() {
        // 検証を通していないレジストリ
        let svcs = vec![
            ServiceDefinition::new("backend", "backend", ServiceKind::ContainerService),
            ServiceDefinition::new("user", "backend/user", ServiceKind::Function),
        ];
        let changed = detect(&["backend/user/main.py"], &svcs);
        assert_eq!(changed, BTreeSet::from(["backend".to_string()]));
    }

    fn file_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("backend/user/main.py".to_string()),
            Just("backend/notification_service/handler.py".to_string()),
            Just("ui/package.json".to_string()),
            Just("docs/readme.md".to_string()),
            "[a-z]{1,8}(/[a-z_]{1,8}){0,3}",
        ]
    }

    proptest! {
        #[test]
        fn prop_detect_is_order_independent(
            (files, shuffled) in prop::collection::vec(file_strategy(), 0..16)
                .prop_flat_map(|files| {
                    let shuffled = Just(files.clone()).prop_shuffle();
                    (Just(files), shuffled)
                })
        ) {
            let svcs = services();
            prop_assert_eq!(detect(&files, &svcs), detect(&shuffled, &svcs));
        }

        #[test]
        fn prop_detected_services_are_registered(files in prop::collection::vec(file_strategy(), 0..16)) {
            let svcs = services();
            for name in detect(&files, &svcs) {
                prop_assert!(svcs.iter().any(|s| s.name == name));
            }
        }
    }
}
