//! # Version Value Objects
//!
//! パッケージバージョンとバージョン指定子

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

/// 公開バージョンの書式（大文字小文字を区別しない）
const VERSION_PATTERN: &str = r"(?ix)^
    v?
    (?:(?P<epoch>[0-9]+)!)?
    (?P<release>[0-9]+(?:\.[0-9]+)*)
    (?:[-_.]?(?P<pre_l>alpha|a|beta|b|preview|pre|c|rc)[-_.]?(?P<pre_n>[0-9]+)?)?
    (?:-(?P<post_n1>[0-9]+)|[-_.]?(?P<post_l>post|rev|r)[-_.]?(?P<post_n2>[0-9]+)?)?
    (?:[-_.]?(?P<dev_l>dev)[-_.]?(?P<dev_n>[0-9]+)?)?
    (?:\+[a-z0-9]+(?:[-_.][a-z0-9]+)*)?
$";

fn version_regex() -> Option<&'static Regex> {
    static REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(VERSION_PATTERN).ok()).as_ref()
}

/// プレリリースの種別（a < b < rc）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PreReleaseKind {
    Alpha,
    Beta,
    ReleaseCandidate,
}

impl PreReleaseKind {
    fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "a" | "alpha" => PreReleaseKind::Alpha,
            "b" | "beta" => PreReleaseKind::Beta,
            _ => PreReleaseKind::ReleaseCandidate,
        }
    }
}

/// パッケージバージョン
///
/// エポック、リリースセグメント（不足分は0として扱う）、プレリリース、
/// ポストリリース、開発版の順に比較する。ローカル部（`+` 以降）は無視する
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    epoch: u64,
    release: Vec<u64>,
    pre: Option<(PreReleaseKind, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
}

fn parse_number(value: Option<regex::Match<'_>>) -> Option<u64> {
    match value {
        Some(m) => m.as_str().parse().ok(),
        None => Some(0),
    }
}

impl Version {
    /// バージョン文字列を解析する
    ///
    /// 書式に合わない場合は `None`
    pub fn parse(value: &str) -> Option<Self> {
        let raw = value.trim();
        let caps = version_regex()?.captures(raw)?;

        let epoch = match caps.name("epoch") {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        let release = caps
            .name("release")?
            .as_str()
            .split('.')
            .map(|s| s.parse().ok())
            .collect::<Option<Vec<u64>>>()?;

        let pre = match caps.name("pre_l") {
            Some(label) => Some((
                PreReleaseKind::from_label(label.as_str()),
                parse_number(caps.name("pre_n"))?,
            )),
            None => None,
        };
        let post = if let Some(n) = caps.name("post_n1") {
            Some(n.as_str().parse().ok()?)
        } else if caps.name("post_l").is_some() {
            Some(parse_number(caps.name("post_n2"))?)
        } else {
            None
        };
        let dev = match caps.name("dev_l") {
            Some(_) => Some(parse_number(caps.name("dev_n"))?),
            None => None,
        };

        Some(Self {
            raw: raw.to_string(),
            epoch,
            release,
            pre,
            post,
            dev,
        })
    }

    /// リリースセグメント
    pub fn release(&self) -> &[u64] {
        &self.release
    }

    /// プレリリース（a/b/rc/dev）かどうか
    pub fn is_pre_release(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    /// ポストリリースかどうか
    pub fn is_post_release(&self) -> bool {
        self.post.is_some()
    }

    /// 元の文字列
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn segment(&self, index: usize) -> u64 {
        self.release.get(index).copied().unwrap_or(0)
    }

    fn cmp_release(&self, other: &Self) -> Ordering {
        let len = self.release.len().max(other.release.len());
        for i in 0..len {
            match self.segment(i).cmp(&other.segment(i)) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }

    /// プレリリース部の比較キー
    ///
    /// `1.0.dev0` < `1.0a1` < `1.0` の順
    fn pre_key(&self) -> (u8, Option<(PreReleaseKind, u64)>) {
        match (self.pre, self.post, self.dev) {
            (None, None, Some(_)) => (0, None),
            (Some(pre), _, _) => (1, Some(pre)),
            (None, _, _) => (2, None),
        }
    }

    /// 開発版は同じ位置の正式なものより前
    fn dev_key(&self) -> (bool, u64) {
        match self.dev {
            Some(n) => (false, n),
            None => (true, 0),
        }
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| self.cmp_release(other))
            .then_with(|| self.pre_key().cmp(&other.pre_key()))
            .then_with(|| self.post.cmp(&other.post))
            .then_with(|| self.dev_key().cmp(&other.dev_key()))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// 比較演算子
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `==`（`==1.4.*` のワイルドカードを含む）
    Equal,
    /// `!=`
    NotEqual,
    /// `<=`
    LessEqual,
    /// `>=`
    GreaterEqual,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `~=`
    Compatible,
    /// `===`（文字列として完全一致）
    Arbitrary,
}

impl Operator {
    fn symbol(&self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::LessEqual => "<=",
            Operator::GreaterEqual => ">=",
            Operator::Less => "<",
            Operator::Greater => ">",
            Operator::Compatible => "~=",
            Operator::Arbitrary => "===",
        }
    }
}

/// バージョン指定子（例: `>=2.0`, `==1.4.*`）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSpecifier {
    pub operator: Operator,
    /// 演算子の右辺（原文）
    pub version: String,
}

impl VersionSpecifier {
    /// 指定子を解析する
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        // 長い演算子から順に試す
        let operators = [
            Operator::Arbitrary,
            Operator::Equal,
            Operator::NotEqual,
            Operator::LessEqual,
            Operator::GreaterEqual,
            Operator::Compatible,
            Operator::Less,
            Operator::Greater,
        ];

        let (operator, rest) = operators
            .iter()
            .find_map(|op| value.strip_prefix(op.symbol()).map(|rest| (*op, rest.trim())))?;

        if rest.is_empty() {
            return None;
        }

        match operator {
            Operator::Arbitrary => {}
            Operator::Equal | Operator::NotEqual => {
                let base = rest.strip_suffix(".*").unwrap_or(rest);
                Version::parse(base)?;
            }
            Operator::Compatible => {
                // `~=` は2セグメント以上が必要
                if Version::parse(rest)?.release().len() < 2 {
                    return None;
                }
            }
            _ => {
                Version::parse(rest)?;
            }
        }

        Some(Self {
            operator,
            version: rest.to_string(),
        })
    }

    /// プレリリースを明示的に指定しているか
    pub fn pins_pre_release(&self) -> bool {
        matches!(self.operator, Operator::Equal | Operator::Arbitrary)
            && Version::parse(&self.version).is_some_and(|v| v.is_pre_release())
    }

    /// 候補バージョンがこの指定子を満たすか
    pub fn matches(&self, candidate: &Version) -> bool {
        if self.operator == Operator::Arbitrary {
            return candidate.as_str() == self.version;
        }

        if let Some(prefix) = self.version.strip_suffix(".*") {
            let Some(prefix) = Version::parse(prefix) else {
                return false;
            };
            let matched = prefix
                .release()
                .iter()
                .enumerate()
                .all(|(i, seg)| candidate.segment(i) == *seg);
            return match self.operator {
                Operator::NotEqual => !matched,
                _ => matched,
            };
        }

        let Some(target) = Version::parse(&self.version) else {
            return false;
        };

        match self.operator {
            Operator::Equal => candidate == &target,
            Operator::NotEqual => candidate != &target,
            Operator::LessEqual => candidate <= &target,
            Operator::GreaterEqual => candidate >= &target,
            Operator::Less => candidate < &target,
            // `>1.0` は `1.0.post1` を含まない
            Operator::Greater => {
                candidate > &target
                    && !(candidate.is_post_release()
                        && !target.is_post_release()
                        && candidate.cmp_release(&target) == Ordering::Equal
                        && candidate.pre == target.pre)
            }
            Operator::Compatible => {
                let prefix_len = target.release().len() - 1;
                candidate >= &target
                    && (0..prefix_len).all(|i| candidate.segment(i) == target.segment(i))
            }
            Operator::Arbitrary => unreachable!("handled above"),
        }
    }
}

impl fmt::Display for VersionSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator.symbol(), self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn spec(s: &str) -> VersionSpecifier {
        VersionSpecifier::parse(s).unwrap()
    }

    #[test]
    fn test_version_parse() {
        assert_eq!(v("2.3.1").release(), &[2, 3, 1]);
        assert_eq!(v("v1.0").release(), &[1, 0]);
        assert_eq!(v("1.0+local.7").release(), &[1, 0]);
        assert!(v("2.0rc1").is_pre_release());
        assert!(v("2.0.dev3").is_pre_release());
        assert!(!v("2.0.post1").is_pre_release());
        assert!(v("2.0.post1").is_post_release());
        assert_eq!(v("1!2.0").release(), &[2, 0]);
        assert!(Version::parse("latest").is_none());
        assert!(Version::parse("").is_none());
    }

    #[test]
    fn test_version_ordering() {
        assert!(v("1.10") > v("1.9"));
        assert_eq!(v("1.0"), v("1.0.0"));
        assert!(v("2.0") > v("2.0rc1"));
        assert!(v("2.0rc1") > v("1.9.9"));
        assert!(v("1!1.0") > v("2.0"));
    }

    #[test]
    fn test_version_ordering_suffixes() {
        let ordered = [
            "1.0.dev0", "1.0a1", "1.0a2.dev1", "1.0a2", "1.0b1", "1.0rc1", "1.0rc2", "1.0",
            "1.0.post1.dev0", "1.0.post1", "1.0.post2", "1.1",
        ];
        for pair in ordered.windows(2) {
            assert!(v(pair[0]) < v(pair[1]), "{} < {}", pair[0], pair[1]);
        }
        assert_eq!(v("1.0RC1"), v("1.0rc1"));
        assert_eq!(v("1.0-1"), v("1.0.post1"));
        assert_eq!(v("1.0alpha1"), v("1.0a1"));
    }

    #[test]
    fn test_specifier_parse() {
        assert_eq!(spec(">=2.0").operator, Operator::GreaterEqual);
        assert_eq!(spec("== 1.4.*").version, "1.4.*");
        assert_eq!(spec("===foo").operator, Operator::Arbitrary);
        assert!(VersionSpecifier::parse("~=1").is_none());
        assert!(VersionSpecifier::parse("=>1.0").is_none());
        assert!(VersionSpecifier::parse(">=").is_none());
        assert!(VersionSpecifier::parse("1.0").is_none());
    }

    #[test]
    fn test_specifier_matches() {
        assert!(spec("==2.0").matches(&v("2.0.0")));
        assert!(!spec("==2.0").matches(&v("2.0.1")));
        assert!(spec("!=2.0").matches(&v("2.1")));
        assert!(spec(">=2.0").matches(&v("2.0")));
        assert!(!spec(">2.0").matches(&v("2.0")));
        assert!(spec("<3").matches(&v("2.99")));
        assert!(spec("<=3").matches(&v("3.0")));
    }

    #[test]
    fn test_exact_pin_distinguishes_suffixes() {
        assert!(spec("==2.0rc1").matches(&v("2.0rc1")));
        assert!(!spec("==2.0rc1").matches(&v("2.0rc2")));
        assert!(spec("==1.0").matches(&v("1.0")));
        assert!(!spec("==1.0").matches(&v("1.0.post1")));
        assert!(spec("==1.0").matches(&v("1.0+ubuntu1")));
    }

    #[test]
    fn test_greater_than_excludes_post_of_same_release() {
        assert!(!spec(">1.0").matches(&v("1.0.post1")));
        assert!(spec(">1.0").matches(&v("1.0.1")));
        assert!(spec(">1.0.post1").matches(&v("1.0.post2")));
    }

    #[test]
    fn test_specifier_wildcard() {
        assert!(spec("==1.4.*").matches(&v("1.4.9")));
        assert!(!spec("==1.4.*").matches(&v("1.5.0")));
        assert!(spec("!=1.4.*").matches(&v("1.5.0")));
    }

    #[test]
    fn test_specifier_compatible_release() {
        let compat = spec("~=1.4.2");
        assert!(compat.matches(&v("1.4.2")));
        assert!(compat.matches(&v("1.4.9")));
        assert!(!compat.matches(&v("1.5.0")));
        assert!(!compat.matches(&v("1.4.1")));

        let compat = spec("~=2.2");
        assert!(compat.matches(&v("2.9")));
        assert!(!compat.matches(&v("3.0")));
    }

    #[test]
    fn test_pins_pre_release() {
        assert!(spec("==2.0rc1").pins_pre_release());
        assert!(!spec(">=2.0rc1").pins_pre_release());
        assert!(!spec("==2.0").pins_pre_release());
    }
}
