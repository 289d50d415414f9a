//! Client resolver: maps a user-supplied token (slot number or partial
//! name) to connected client slots. Read-only over the match context.

use crate::state::{MatchContext, MAX_CLIENTS};
use crate::strutil::{self, MAX_NAME_LENGTH, MAX_STRING_CHARS};

/// All connected slots whose sanitized name contains the sanitized token
/// as a substring. A token that is entirely digits is treated as a slot
/// number and never name-matched, even if a player's name happens to be
/// that digit string.
pub fn find_clients(ctx: &MatchContext, token: &str) -> Vec<usize> {
    if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
        return match token.parse::<usize>() {
            Ok(slot) if slot < ctx.clients.len() && ctx.clients[slot].connected() => vec![slot],
            _ => Vec::new(),
        };
    }

    let needle = strutil::sanitize(token, MAX_NAME_LENGTH);
    if needle.is_empty() {
        return Vec::new();
    }

    ctx.connected_slots()
        .filter(|&i| ctx.clients[i].name_clean.contains(&needle))
        .take(MAX_CLIENTS)
        .collect()
}

/// Exact match only: a token starting with a digit reads as a slot number
/// (trailing junk ignored); otherwise the decolored token must equal a
/// connected client's decolored name, case included. A case-insensitive
/// exact match would swallow the ambiguity a lowercase token is supposed
/// to report.
pub fn find_exact(ctx: &MatchContext, token: &str) -> Option<usize> {
    if token.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        let digits: String = token.chars().take_while(|c| c.is_ascii_digit()).collect();
        let slot = digits.parse::<usize>().ok()?;
        return (slot < ctx.clients.len() && ctx.clients[slot].connected()).then_some(slot);
    }

    let needle = strutil::decolor(token);
    ctx.connected_slots()
        .find(|&i| strutil::decolor(&ctx.clients[i].name) == needle)
}

/// Reduce a match set to a single slot, or explain why it cannot be done.
/// The multi-match report enumerates "slot - name" lines and is truncated
/// to fit a bounded message.
pub fn match_one(ctx: &MatchContext, matches: &[usize]) -> Result<usize, String> {
    match matches {
        [] => Err("no connected player by that name or slot #".to_string()),
        [only] => Ok(*only),
        many => {
            let mut err = String::from(
                "more than one player name matches. be more specific or use the slot #:\n",
            );
            for &slot in many {
                if let Some(cl) = ctx.client(slot) {
                    let line = format!("{slot:2} - {}^7\n", cl.name);
                    if err.chars().count() + line.chars().count() > MAX_STRING_CHARS {
                        break;
                    }
                    err.push_str(&line);
                }
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MatchContext;

    fn ctx_with(names: &[(usize, &str)]) -> MatchContext {
        let mut ctx = MatchContext::new();
        for &(slot, name) in names {
            ctx.connect_client(slot, name, "127.0.0.1");
        }
        ctx
    }

    #[test]
    fn digit_token_is_a_slot_never_a_name() {
        // a player literally named "7" must not shadow slot 7
        let ctx = ctx_with(&[(2, "7"), (7, "seven")]);
        assert_eq!(find_clients(&ctx, "7"), vec![7]);
    }

    #[test]
    fn digit_token_to_empty_slot_matches_nothing() {
        let ctx = ctx_with(&[(2, "7")]);
        assert!(find_clients(&ctx, "7").is_empty());
        assert!(find_clients(&ctx, "9999").is_empty());
    }

    #[test]
    fn substring_match_collects_all_candidates() {
        let ctx = ctx_with(&[(0, "Foo"), (1, "Foobar"), (2, "other")]);
        assert_eq!(find_clients(&ctx, "foo"), vec![0, 1]);
        assert_eq!(find_clients(&ctx, "bar"), vec![1]);
    }

    #[test]
    fn match_is_color_and_case_insensitive() {
        let ctx = ctx_with(&[(4, "^1Big ^7Cat")]);
        assert_eq!(find_clients(&ctx, "BIG c"), vec![4]);
    }

    #[test]
    fn exact_match_breaks_substring_ties() {
        let ctx = ctx_with(&[(0, "Foo"), (1, "Foobar")]);
        assert_eq!(find_exact(&ctx, "Foo"), Some(0));
        // a lowercase token is not exact; the ambiguity stands
        assert_eq!(find_exact(&ctx, "foo"), None);
        assert_eq!(find_exact(&ctx, "fo"), None);
    }

    #[test]
    fn exact_match_ignores_colors_but_not_case() {
        let ctx = ctx_with(&[(2, "^1Big ^7Cat")]);
        assert_eq!(find_exact(&ctx, "Big Cat"), Some(2));
        assert_eq!(find_exact(&ctx, "big cat"), None);
    }

    #[test]
    fn match_one_reports_ambiguity_with_slot_listing() {
        let ctx = ctx_with(&[(0, "Foo"), (1, "Foobar")]);
        let err = match_one(&ctx, &[0, 1]).unwrap_err();
        assert!(err.contains("more than one player"));
        assert!(err.contains(" 0 - Foo"));
        assert!(err.contains(" 1 - Foobar"));
    }

    #[test]
    fn match_one_empty_and_single() {
        let ctx = ctx_with(&[(3, "solo")]);
        assert!(match_one(&ctx, &[]).unwrap_err().contains("no connected player"));
        assert_eq!(match_one(&ctx, &[3]), Ok(3));
    }
}
