//! The verdict micro-protocol: prompt template and parser.
//!
//! The protocol is deliberately textual and tiny: the judge is asked for
//! exactly one of five tokens, and the parser — not the judge's
//! surrounding prose — is the sole source of truth for the outcome.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::Outcome;

/// Matches `[[A≫B]]`, `[[A>>B]]`, `[[A>B]]`, `[[A=B]]`, `[[B>A]]`,
/// `[[B≫A]]`/`[[B>>A]]` anywhere in a reply. Both the Unicode `≫` (U+226B)
/// and the ASCII `>>` digraph are accepted: judges are not consistent about
/// which one they emit.
static VERDICT_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\[(A(?:\x{226B}|>>)B|A>B|A=B|B>A|B(?:\x{226B}|>>)A)\]\]").unwrap()
});

/// The last occurrence in the reply wins: a judge may hedge early and
/// commit later, and later text supersedes earlier text.
pub fn parse_verdict(reply: &str) -> Option<Outcome> {
    let last = VERDICT_TOKEN.captures_iter(reply).last()?;
    let token = last.get(1)?.as_str();

    Some(match token {
        "A\u{226B}B" | "A>>B" => Outcome::StrongA,
        "A>B" => Outcome::WeakA,
        "A=B" => Outcome::Tie,
        "B>A" => Outcome::WeakB,
        "B\u{226B}A" | "B>>A" => Outcome::StrongB,
        _ => return None,
    })
}

/// The instruction appended to every judge prompt.
pub const VERDICT_INSTRUCTION: &str = "\
Compare the two answers above and report your verdict using exactly one \
of these five tokens, and nothing else after it:\n\
  [[A\u{226B}B]]  — A is much better than B\n\
  [[A>B]]   — A is somewhat better than B\n\
  [[A=B]]   — the two are equivalent\n\
  [[B>A]]   — B is somewhat better than A\n\
  [[B\u{226B}A]]  — B is much better than A\n\
You may reason briefly first, but only the last such token in your reply is read. \
Example: \"A is more thorough, but B is clearer. [[B>A]]\"";

/// Builds the full judge prompt for one pair of (possibly anonymized)
/// candidate answers.
pub fn build_judge_prompt(task: &str, label_a: &str, text_a: &str, label_b: &str, text_b: &str) -> String {
    format!(
        "Task given to the candidates:\n{task}\n\n\
         === {label_a} ===\n{text_a}\n\n\
         === {label_b} ===\n{text_b}\n\n\
         {VERDICT_INSTRUCTION}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_five_unicode_tokens() {
        assert_eq!(parse_verdict("well [[A\u{226B}B]] done"), Some(Outcome::StrongA));
        assert_eq!(parse_verdict("hmm [[A>B]] yes"), Some(Outcome::WeakA));
        assert_eq!(parse_verdict("[[A=B]]"), Some(Outcome::Tie));
        assert_eq!(parse_verdict("[[B>A]]"), Some(Outcome::WeakB));
        assert_eq!(parse_verdict("[[B\u{226B}A]]"), Some(Outcome::StrongB));
    }

    #[test]
    fn accepts_ascii_digraph() {
        assert_eq!(parse_verdict("[[A>>B]]"), Some(Outcome::StrongA));
        assert_eq!(parse_verdict("[[B>>A]]"), Some(Outcome::StrongB));
    }

    #[test]
    fn no_token_is_unparseable() {
        assert_eq!(parse_verdict("I'm not sure which is better."), None);
    }

    #[test]
    fn last_occurrence_wins() {
        let reply = "Initially I thought [[A>B]] but on reflection [[B\u{226B}A]].";
        assert_eq!(parse_verdict(reply), Some(Outcome::StrongB));
    }

    #[test]
    fn ignores_reasoning_around_token() {
        let reply = "A is more thorough, but B is clearer overall. [[B>A]]";
        assert_eq!(parse_verdict(reply), Some(Outcome::WeakB));
    }
}
