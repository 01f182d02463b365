//! Welcome template compiler.
//!
//! A template is plain text with zero or more `{at}` placeholders. Compiling
//! it against a member id yields the ordered segments of the greeting.

use std::fmt;

/// Reserved token marking where the new member is mentioned.
pub const PLACEHOLDER: &str = "{at}";

/// Template used when none is configured.
pub const DEFAULT_TEMPLATE: &str = "欢迎{at}加入本群！";

/// One atomic unit of a compiled greeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text { content: String },
    Mention { target_id: String },
}

impl Segment {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    pub fn mention(target_id: impl Into<String>) -> Self {
        Self::Mention {
            target_id: target_id.into(),
        }
    }
}

/// Immutable welcome template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WelcomeTemplate(String);

impl WelcomeTemplate {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of placeholder occurrences.
    pub fn placeholder_count(&self) -> usize {
        self.0.matches(PLACEHOLDER).count()
    }

    /// Compile into segments, mentioning `member_id` at every placeholder.
    pub fn compile(&self, member_id: &str) -> Vec<Segment> {
        compile_template(&self.0, member_id)
    }
}

impl Default for WelcomeTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

impl fmt::Display for WelcomeTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split `template` on the placeholder, emitting non-empty text runs and one
/// mention per placeholder occurrence.
///
/// Total: the empty template compiles to an empty sequence.
pub fn compile_template(template: &str, member_id: &str) -> Vec<Segment> {
    let mut segments = Vec::new();

    for (i, piece) in template.split(PLACEHOLDER).enumerate() {
        if i > 0 {
            segments.push(Segment::mention(member_id));
        }
        if !piece.is_empty() {
            segments.push(Segment::text(piece));
        }
    }

    segments
}
