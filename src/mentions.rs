//! Parsing of positionally encoded mention lists.
//!
//! The table stream encodes mentions as parallel comma-separated strings:
//! offsets, lengths and target ids, aligned by position. A malformed entry
//! only drops its own position.

use crate::types::{Mention, MentionKind};

/// Parses mentions from the offsets, lengths and ids strings.
///
/// Positions whose offset or id is not an integer are skipped. A missing or
/// malformed length defaults to 0. Empty offsets or ids yield no mentions.
pub fn parse_mentions(offsets: &str, lengths: &str, ids: &str) -> Vec<Mention> {
    parse_mentions_with_kinds(offsets, lengths, ids, "")
}

/// Like [`parse_mentions`], with an optional fourth list of mention kinds.
/// Unknown or missing kinds leave [`Mention::kind`] unset.
pub fn parse_mentions_with_kinds(
    offsets: &str,
    lengths: &str,
    ids: &str,
    kinds: &str,
) -> Vec<Mention> {
    if offsets.is_empty() || ids.is_empty() {
        return Vec::new();
    }

    let offset_parts: Vec<&str> = offsets.split(',').collect();
    let length_parts: Vec<&str> = lengths.split(',').collect();
    let id_parts: Vec<&str> = ids.split(',').collect();
    let kind_parts: Vec<&str> = kinds.split(',').collect();

    let count = offset_parts.len().min(id_parts.len());
    let mut mentions = Vec::with_capacity(count);

    for i in 0..count {
        let Ok(offset) = offset_parts[i].trim().parse::<i64>() else {
            continue;
        };
        let Ok(user_id) = id_parts[i].trim().parse::<i64>() else {
            continue;
        };
        let length = length_parts
            .get(i)
            .and_then(|l| l.trim().parse::<i64>().ok())
            .unwrap_or(0);
        let kind = kind_parts
            .get(i)
            .and_then(|k| k.trim().parse::<MentionKind>().ok());

        mentions.push(Mention {
            user_id,
            offset,
            length,
            kind,
        });
    }

    mentions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mention(user_id: i64, offset: i64, length: i64) -> Mention {
        Mention {
            user_id,
            offset,
            length,
            kind: None,
        }
    }

    #[test]
    fn test_missing_length_defaults_to_zero() {
        let mentions = parse_mentions("0,5", "3", "111,222");
        assert_eq!(mentions, vec![mention(111, 0, 3), mention(222, 5, 0)]);
    }

    #[test]
    fn test_empty_offsets_or_ids_yield_nothing() {
        assert!(parse_mentions("", "3", "111").is_empty());
        assert!(parse_mentions("0", "3", "").is_empty());
        assert!(parse_mentions("", "", "").is_empty());
    }

    #[test]
    fn test_malformed_entries_are_skipped_not_fatal() {
        let mentions = parse_mentions("0,x,10", "2,2,4", "111,222,abc");
        // position 1 has a bad offset, position 2 a bad id
        assert_eq!(mentions, vec![mention(111, 0, 2)]);

        let mentions = parse_mentions("0,4,8", "1,1,1", "1,oops,3");
        assert_eq!(mentions, vec![mention(1, 0, 1), mention(3, 8, 1)]);
    }

    #[test]
    fn test_count_is_bounded_by_shorter_of_offsets_and_ids() {
        let mentions = parse_mentions("0,5,9", "1,1,1", "7,8");
        assert_eq!(mentions.len(), 2);

        let mentions = parse_mentions("0", "1,1", "7,8,9");
        assert_eq!(mentions, vec![mention(7, 0, 1)]);
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let mentions = parse_mentions(" 0 , 6", "5, 4 ", "10 , 20");
        assert_eq!(mentions, vec![mention(10, 0, 5), mention(20, 6, 4)]);
    }

    #[test]
    fn test_bad_length_defaults_to_zero() {
        let mentions = parse_mentions("3", "long", "99");
        assert_eq!(mentions, vec![mention(99, 3, 0)]);
    }

    #[test]
    fn test_kinds_in_lock_step() {
        let mentions = parse_mentions_with_kinds("0,5,9", "4,3,2", "1,2,3", "user,bogus");
        assert_eq!(mentions[0].kind, Some(MentionKind::User));
        assert_eq!(mentions[1].kind, None);
        assert_eq!(mentions[2].kind, None);
    }

    #[test]
    fn test_offsets_beyond_32_bits_are_kept() {
        let mentions = parse_mentions("4294967296", "3000000000", "5");
        assert_eq!(mentions, vec![mention(5, 4_294_967_296, 3_000_000_000)]);
    }
}
