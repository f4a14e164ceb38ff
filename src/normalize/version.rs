/// RPM version comparison
///
/// Orders `epoch:version-release` triples the way rpm does: epochs compare
/// numerically, then version and release strings are compared segment by
/// segment with the rpmvercmp rules:
/// - digit runs compare as integers and beat letter runs
/// - letter runs compare lexicographically
/// - other characters only separate segments
/// - `~` sorts before everything, including the end of the string
///
/// # Examples
///
/// ```
/// use dnf_dbus::normalize::version::RpmVersion;
/// use std::cmp::Ordering;
///
/// let pre = RpmVersion::new(None, "1.0~rc1".to_string(), "1".to_string());
/// let rel = RpmVersion::new(None, "1.0".to_string(), "1".to_string());
/// assert_eq!(pre.cmp(&rel), Ordering::Less);
/// ```
use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpmVersion {
    pub epoch: i64,
    pub version: String,
    pub release: String,
}

impl RpmVersion {
    pub fn new(epoch: Option<i64>, version: String, release: String) -> Self {
        Self {
            epoch: epoch.unwrap_or(0),
            version,
            release,
        }
    }

    /// rpmvercmp over a single version or release string
    pub fn compare_segments(a: &str, b: &str) -> Ordering {
        let mut a = a.chars().peekable();
        let mut b = b.chars().peekable();

        loop {
            skip_separators(&mut a);
            skip_separators(&mut b);

            match (a.peek() == Some(&'~'), b.peek() == Some(&'~')) {
                (true, true) => {
                    a.next();
                    b.next();
                    continue;
                }
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                (false, false) => {}
            }

            let (a_head, b_head) = match (a.peek().copied(), b.peek().copied()) {
                (None, None) => return Ordering::Equal,
                (None, Some(_)) => return Ordering::Less,
                (Some(_), None) => return Ordering::Greater,
                (Some(x), Some(y)) => (x, y),
            };

            let ordering = match (a_head.is_ascii_digit(), b_head.is_ascii_digit()) {
                (true, false) => return Ordering::Greater,
                (false, true) => return Ordering::Less,
                (true, true) => {
                    let a_seg = take_segment(&mut a, |c| c.is_ascii_digit());
                    let b_seg = take_segment(&mut b, |c| c.is_ascii_digit());
                    compare_numeric(&a_seg, &b_seg)
                }
                (false, false) => {
                    let is_alpha = |c: char| c.is_alphanumeric() && !c.is_ascii_digit();
                    take_segment(&mut a, is_alpha).cmp(&take_segment(&mut b, is_alpha))
                }
            };

            if ordering != Ordering::Equal {
                return ordering;
            }
        }
    }
}

fn skip_separators(chars: &mut Peekable<Chars<'_>>) {
    while chars
        .peek()
        .is_some_and(|c| !c.is_alphanumeric() && *c != '~')
    {
        chars.next();
    }
}

fn take_segment(chars: &mut Peekable<Chars<'_>>, accept: impl Fn(char) -> bool) -> String {
    let mut segment = String::new();
    while let Some(&c) = chars.peek() {
        if !accept(c) {
            break;
        }
        segment.push(c);
        chars.next();
    }
    segment
}

/// Numeric segments of any length: strip leading zeros, longer wins, then lexical
fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

impl PartialOrd for RpmVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RpmVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| Self::compare_segments(&self.version, &other.version))
            .then_with(|| Self::compare_segments(&self.release, &other.release))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(epoch: Option<i64>, version: &str, release: &str) -> RpmVersion {
        RpmVersion::new(epoch, version.to_string(), release.to_string())
    }

    #[test]
    fn test_epoch_wins() {
        assert!(v(Some(1), "1.0", "1") < v(Some(2), "1.0", "1"));
        assert!(v(Some(1), "2.6.32", "100.el6") > v(None, "3.0.0", "1.el6"));
    }

    #[test]
    fn test_numeric_segments() {
        assert!(v(None, "1.0", "1") < v(None, "2.0", "1"));
        assert!(v(None, "1.10", "1") > v(None, "1.2", "1"));
        assert_eq!(
            RpmVersion::compare_segments("1.001", "1.1"),
            Ordering::Equal
        );
        assert_eq!(
            RpmVersion::compare_segments("20210101123456789012", "20210101123456789013"),
            Ordering::Less
        );
    }

    #[test]
    fn test_alpha_and_mixed_segments() {
        assert!(v(None, "1.0a", "1") < v(None, "1.0b", "1"));
        assert!(v(None, "1.0.1", "1") > v(None, "1.0.a", "1"));
    }

    #[test]
    fn test_release_comparison() {
        assert!(v(None, "1.0", "1.fc34") < v(None, "1.0", "2.fc34"));
        assert!(v(None, "2.6.32", "279.el6") < v(None, "2.6.32", "754.el6"));
        assert_eq!(v(None, "1.0", "1.fc34"), v(Some(0), "1.0", "1.fc34"));
    }

    #[test]
    fn test_tilde_prerelease() {
        assert!(v(None, "1.0~rc1", "1") < v(None, "1.0", "1"));
        assert!(v(None, "1.0~alpha", "1") < v(None, "1.0~beta", "1"));
        assert!(v(None, "2.0~1", "1") < v(None, "2.0~2", "1"));
        assert!(v(None, "1.0", "1~rc1") < v(None, "1.0", "1"));
    }
}
