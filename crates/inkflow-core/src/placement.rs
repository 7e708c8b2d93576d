//! Best-effort body-placement detection from free-text tattoo ideas.
//!
//! This is a first-match lookup, not a ranking: keywords are tried in table
//! order and the first one contained in the text wins. Text mentioning both
//! "shoulder" and "back" therefore always yields the shoulder label.

/// Keyword → placement label, in match order. Each Hebrew keyword is
/// followed by its English equivalent; both map to the Hebrew label.
pub const PLACEMENT_KEYWORDS: &[(&str, &str)] = &[
  ("כתף", SHOULDER),
  ("shoulder", SHOULDER),
  ("זרוע", "זרוע"),
  ("arm", "זרוע"),
  ("יד", "יד"),
  ("hand", "יד"),
  ("גב", "גב"),
  ("back", "גב"),
  ("רגל", "רגל"),
  ("leg", "רגל"),
  ("קרסול", "קרסול"),
  ("ankle", "קרסול"),
  ("צוואר", "צוואר"),
  ("neck", "צוואר"),
  ("חזה", "חזה"),
  ("chest", "חזה"),
];

/// Label used for shoulder placements.
pub const SHOULDER: &str = "כתף";

/// Detect a placement label in `text`, or `None` when no keyword matches.
pub fn detect_placement(text: &str) -> Option<&'static str> {
  if text.is_empty() {
    return None;
  }
  let lower = text.to_lowercase();
  PLACEMENT_KEYWORDS
    .iter()
    .find(|(keyword, _)| lower.contains(keyword))
    .map(|&(_, label)| label)
}
