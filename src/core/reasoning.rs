//! Reasoning-block segmentation.
//!
//! Models wrap intermediate "thinking" in `<think>…</think>`. The raw text is
//! split into a sequence of typed segments so renderers never have to splice
//! placeholder strings back into generated markup. Segments are derived from
//! scratch on every pass; their ids are only meaningful within one result.

use std::borrow::Cow;

pub const OPEN_MARKER: &str = "<think>";
pub const CLOSE_MARKER: &str = "</think>";

/// Phrases that [`ReasoningPolicy::LeadInHeuristic`] treats as the start of
/// model reasoning.
pub const LEAD_IN_PHRASES: [&str; 4] = ["AI Thoughts", "Let me", "I'll", "First,"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningSegment {
    pub id: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Reasoning(ReasoningSegment),
}

/// Split `raw` into plain-text and reasoning segments.
///
/// Matching is non-greedy and does not nest: each open marker pairs with the
/// first close marker after it. An open marker without a close stays in the
/// surrounding text.
pub fn segment(raw: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = raw;
    let mut next_id = 0;

    while let Some(open) = rest.find(OPEN_MARKER) {
        let body_start = open + OPEN_MARKER.len();
        let Some(close) = rest[body_start..].find(CLOSE_MARKER) else {
            break;
        };
        let body_end = body_start + close;

        if open > 0 {
            segments.push(Segment::Text(rest[..open].to_string()));
        }
        segments.push(Segment::Reasoning(ReasoningSegment {
            id: next_id,
            text: rest[body_start..body_end].to_string(),
        }));
        next_id += 1;
        rest = &rest[body_end + CLOSE_MARKER.len()..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Text(rest.to_string()));
    }
    segments
}

/// Rebuild the raw text that produced `segments`.
pub fn reassemble(segments: &[Segment]) -> String {
    let mut raw = String::new();
    for segment in segments {
        match segment {
            Segment::Text(text) => raw.push_str(text),
            Segment::Reasoning(reasoning) => {
                raw.push_str(OPEN_MARKER);
                raw.push_str(&reasoning.text);
                raw.push_str(CLOSE_MARKER);
            }
        }
    }
    raw
}

pub fn reasoning_segments(segments: &[Segment]) -> impl Iterator<Item = &ReasoningSegment> {
    segments.iter().filter_map(|segment| match segment {
        Segment::Reasoning(reasoning) => Some(reasoning),
        Segment::Text(_) => None,
    })
}

/// How streamed fragments are classified before they join the raw buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReasoningPolicy {
    /// Only explicit markers from the server delimit reasoning.
    #[default]
    MarkersOnly,
    /// Additionally wrap any fragment containing one of [`LEAD_IN_PHRASES`]
    /// in markers. This is a guess made at inference time and will also
    /// catch ordinary prose such as "Let me know".
    LeadInHeuristic,
}

impl ReasoningPolicy {
    pub fn from_heuristic_flag(enabled: bool) -> Self {
        if enabled {
            ReasoningPolicy::LeadInHeuristic
        } else {
            ReasoningPolicy::MarkersOnly
        }
    }

    pub fn apply<'a>(self, fragment: &'a str) -> Cow<'a, str> {
        match self {
            ReasoningPolicy::MarkersOnly => Cow::Borrowed(fragment),
            ReasoningPolicy::LeadInHeuristic => {
                if LEAD_IN_PHRASES
                    .iter()
                    .any(|phrase| fragment.contains(phrase))
                {
                    Cow::Owned(format!("{OPEN_MARKER}{fragment}{CLOSE_MARKER}"))
                } else {
                    Cow::Borrowed(fragment)
                }
            }
        }
    }
}
