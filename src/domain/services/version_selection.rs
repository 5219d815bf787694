//! # Version Selection Service
//!
//! 要求を満たすバージョンの選択

use crate::domain::entities::dependency_manifest::Requirement;
use crate::domain::entities::version::Version;

/// バージョン選択サービス
///
/// 公開済みバージョンから要求を満たすものを選ぶビジネスロジック
pub struct VersionSelectionService;

impl VersionSelectionService {
    /// 要求を満たす最も新しいバージョンを選択する
    ///
    /// プレリリースは、指定子がそのプレリリースを明示的に固定している場合のみ候補になる
    ///
    /// # Arguments
    ///
    /// * `requirement` - マニフェストの要求
    /// * `releases` - インデックス上のバージョン文字列
    ///
    /// # Returns
    ///
    /// 選択されたバージョン。該当なしの場合は `None`
    pub fn select(requirement: &Requirement, releases: &[String]) -> Option<Version> {
        let allow_pre = requirement.specifiers.iter().any(|s| s.pins_pre_release());

        releases
            .iter()
            .filter_map(|r| Version::parse(r))
            .filter(|v| allow_pre || !v.is_pre_release())
            .filter(|v| requirement.specifiers.iter().all(|s| s.matches(v)))
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn releases(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_select_latest_without_specifier() {
        let req = Requirement::parse("flask", 1).unwrap();
        let selected =
            VersionSelectionService::select(&req, &releases(&["2.3.3", "3.0.0", "2.0.1"])).unwrap();
        assert_eq!(selected.as_str(), "3.0.0");
    }

    #[test]
    fn test_select_respects_all_specifiers() {
        let req = Requirement::parse("openai>=1.0,<1.40,!=1.35.0", 1).unwrap();
        let selected = VersionSelectionService::select(
            &req,
            &releases(&["0.28.1", "1.30.0", "1.35.0", "1.40.0"]),
        )
        .unwrap();
        assert_eq!(selected.as_str(), "1.30.0");
    }

    #[test]
    fn test_select_skips_pre_releases() {
        let req = Requirement::parse("torch>=2.0", 1).unwrap();
        let selected =
            VersionSelectionService::select(&req, &releases(&["2.1.0", "2.2.0rc1"])).unwrap();
        assert_eq!(selected.as_str(), "2.1.0");
    }

    #[test]
    fn test_select_pinned_pre_release() {
        let req = Requirement::parse("torch==2.2.0rc1", 1).unwrap();
        let selected =
            VersionSelectionService::select(&req, &releases(&["2.1.0", "2.2.0rc1"])).unwrap();
        assert_eq!(selected.as_str(), "2.2.0rc1");
    }

    #[test]
    fn test_select_exact_pin_among_suffixed_releases() {
        let req = Requirement::parse("torch==2.0rc1", 1).unwrap();
        let selected =
            VersionSelectionService::select(&req, &releases(&["2.0rc1", "2.0rc2"])).unwrap();
        assert_eq!(selected.as_str(), "2.0rc1");

        let req = Requirement::parse("flask==1.0", 1).unwrap();
        let selected =
            VersionSelectionService::select(&req, &releases(&["1.0", "1.0.post1"])).unwrap();
        assert_eq!(selected.as_str(), "1.0");
    }

    #[test]
    fn test_select_prefers_post_release_when_unpinned() {
        let req = Requirement::parse("flask>=1.0", 1).unwrap();
        let selected =
            VersionSelectionService::select(&req, &releases(&["1.0.post1", "1.0"])).unwrap();
        assert_eq!(selected.as_str(), "1.0.post1");
    }

    #[test]
    fn test_select_none_when_nothing_matches() {
        let req = Requirement::parse("flask==99.0", 1).unwrap();
        assert!(VersionSelectionService::select(&req, &releases(&["3.0.0"])).is_none());
        assert!(VersionSelectionService::select(&req, &[]).is_none());
    }

    #[test]
    fn test_select_ignores_unparsable_releases() {
        let req = Requirement::parse("faiss-cpu", 1).unwrap();
        let selected =
            VersionSelectionService::select(&req, &releases(&["nightly", "1.7.4"])).unwrap();
        assert_eq!(selected.as_str(), "1.7.4");
    }
}
