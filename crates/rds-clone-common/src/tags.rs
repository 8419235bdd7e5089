//! Ownership tag schema for rds-clone
//!
//! Every RDS resource the tool creates carries exactly two tags, attached
//! in the create/restore call itself and never modified afterwards.
//!
//! ## Tag Schema
//!
//! | Tag Key   | Description |
//! |-----------|-------------|
//! | `rt_name` | Owner name, always prefixed with [`APP_NAME`] |
//! | `rt_time` | Creation time token ([`TIME_TOKEN_FORMAT`], UTC) |

use chrono::{DateTime, Utc};

/// Fixed application name; owner-name tag values start with it
pub const APP_NAME: &str = "rds-clone";

/// Tag key for the owner name
pub const TAG_NAME: &str = "rt_name";

/// Tag key for the creation time
pub const TAG_TIME: &str = "rt_time";

/// Number of recognized tag matches required to treat a resource as owned.
///
/// A name tag with the application prefix counts once and the mere presence
/// of a time tag counts once. The threshold is a fixed policy matching the
/// two-tag schema rather than something derived from the tag values.
pub const OWNERSHIP_MATCH_THRESHOLD: usize = 2;

/// Timestamp token format used in tag values, identifiers and file names
pub const TIME_TOKEN_FORMAT: &str = "%Y%m%d%H%M%S";

/// Value written to the owner-name tag
pub fn owner_name_value() -> String {
    format!("{}-v{}", APP_NAME, env!("CARGO_PKG_VERSION"))
}

/// Format a timestamp as a time token
pub fn format_time_token(time: DateTime<Utc>) -> String {
    time.format(TIME_TOKEN_FORMAT).to_string()
}

/// The two ownership tags as key/value pairs, stamped with `now`
pub fn ownership_tag_pairs(now: DateTime<Utc>) -> [(&'static str, String); 2] {
    [
        (TAG_NAME, owner_name_value()),
        (TAG_TIME, format_time_token(now)),
    ]
}

/// Count recognized ownership tags in a tag list.
pub fn count_ownership_matches<'a, I>(tags: I) -> usize
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    tags.into_iter()
        .filter(|(key, value)| match *key {
            TAG_NAME => value.starts_with(APP_NAME),
            TAG_TIME => true,
            _ => false,
        })
        .count()
}

/// Whether a tag list marks its resource as created by this tool
pub fn is_owned_tag_set<'a, I>(tags: I) -> bool
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    count_ownership_matches(tags) >= OWNERSHIP_MATCH_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[test]
    fn test_time_token_has_second_precision() {
        let time = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(format_time_token(time), "20240309070501");
        assert_eq!(format_time_token(time + chrono::Duration::milliseconds(999)), "20240309070501");
    }

    #[test]
    fn test_ownership_pairs_are_recognized() {
        let pairs = ownership_tag_pairs(Utc::now());
        assert!(is_owned_tag_set(pairs.iter().map(|(k, v)| (*k, v.as_str()))));
    }

    #[test]
    fn test_name_without_prefix_does_not_count() {
        let tags = [(TAG_NAME, "someone-else"), (TAG_TIME, "20240101000000")];
        assert_eq!(count_ownership_matches(tags), 1);
        assert!(!is_owned_tag_set(tags));
    }

    #[test]
    fn test_time_value_is_not_inspected() {
        let tags = [(TAG_NAME, APP_NAME), (TAG_TIME, "")];
        assert!(is_owned_tag_set(tags));
    }

    proptest! {
        /// Name tag with the prefix plus any time tag is always owned
        #[test]
        fn owned_when_both_tags_present(
            suffix in "[a-z0-9-]{0,20}",
            time in ".*",
            extra in prop::collection::vec(("[a-zA-Z:_]{1,12}", ".*"), 0..5)
        ) {
            let name = format!("{APP_NAME}{suffix}");
            let mut tags: Vec<(String, String)> = extra
                .into_iter()
                .filter(|(k, _)| k != TAG_NAME && k != TAG_TIME)
                .collect();
            tags.push((TAG_NAME.to_string(), name));
            tags.push((TAG_TIME.to_string(), time));
            prop_assert!(is_owned_tag_set(tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))));
        }

        /// A single recognized tag is never enough
        #[test]
        fn not_owned_with_one_tag(use_name in any::<bool>(), value in ".*") {
            let tags = if use_name {
                vec![(TAG_NAME.to_string(), format!("{APP_NAME}{value}"))]
            } else {
                vec![(TAG_TIME.to_string(), value)]
            };
            prop_assert!(!is_owned_tag_set(tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))));
        }
    }
}
