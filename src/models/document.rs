use serde::{Deserialize, Serialize};

use super::enums::{ItemPattern, PatternFamily, Platform, SectionKind};

/// Byte range `[start, end)` into the sanitized input text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Immutable input of one analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    text: String,
    platform: Option<Platform>,
    source_url: Option<String>,
}

impl RawDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            platform: None,
            source_url: None,
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Record the posting URL; the platform is inferred from it unless already set.
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        if self.platform.is_none() {
            self.platform = Some(Platform::from_url(&url));
        }
        self.source_url = Some(url);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn platform(&self) -> Option<Platform> {
        self.platform
    }

    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }
}

/// A possible section boundary found by one pattern family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionCandidate {
    /// `Unknown` until the classifier assigns a kind.
    pub kind: SectionKind,
    pub confidence: f32,
    /// Span of the header text itself.
    pub span: Span,
    pub title: Option<String>,
    pub family: PatternFamily,
}

/// A label/description pair, possibly nested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub label: String,
    pub description: String,
    pub confidence: f32,
    pub source_span: Span,
    /// Indentation level of the source line.
    pub level: usize,
    pub pattern: ItemPattern,
    pub children: Vec<ListItem>,
}

impl ListItem {
    /// Number of items in this subtree, including this one.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(ListItem::subtree_len).sum::<usize>()
    }
}

/// Depth-first, document-order flattening of an item forest.
pub fn flatten_items(items: &[ListItem]) -> Vec<&ListItem> {
    fn walk<'a>(items: &'a [ListItem], out: &mut Vec<&'a ListItem>) {
        for item in items {
            out.push(item);
            walk(&item.children, out);
        }
    }
    let mut out = Vec::new();
    walk(items, &mut out);
    out
}

/// Where a finalized section's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SectionOrigin {
    /// Found by boundary detection and classification.
    Detected,
    /// Built from the text preceding the first detected header.
    Preamble,
    /// Built from another section's content.
    Fallback { from: SectionKind },
    /// Nothing usable was found.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub kind: SectionKind,
    pub title: String,
    pub body: String,
    pub items: Vec<ListItem>,
    pub confidence: f32,
    /// True when the section was not detected in the input.
    pub synthesized: bool,
    /// Accepted below the acceptance threshold to fill a required kind.
    pub low_confidence: bool,
    pub origin: SectionOrigin,
    /// Header span of the highest-confidence detected instance.
    pub span: Option<Span>,
}

impl Section {
    /// Explicit empty section for a kind that could not be found anywhere.
    pub fn placeholder(kind: SectionKind) -> Self {
        Self {
            kind,
            title: kind.canonical_title().to_string(),
            body: String::new(),
            items: Vec::new(),
            confidence: 0.0,
            synthesized: true,
            low_confidence: true,
            origin: SectionOrigin::Placeholder,
            span: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.origin, SectionOrigin::Placeholder)
    }

    pub fn is_detected(&self) -> bool {
        matches!(self.origin, SectionOrigin::Detected)
    }

    pub fn has_content(&self) -> bool {
        !self.body.trim().is_empty() || !self.items.is_empty()
    }
}

/// Finalized hierarchical document: at most one section per kind,
/// in canonical order, required kinds always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Document {
    pub sections: Vec<Section>,
}

impl Document {
    /// Document composed only of required placeholders.
    pub fn placeholders() -> Self {
        Self {
            sections: SectionKind::REQUIRED
                .iter()
                .map(|k| Section::placeholder(*k))
                .collect(),
        }
    }

    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    /// Body of a section, empty when absent.
    pub fn body(&self, kind: SectionKind) -> &str {
        self.section(kind).map(|s| s.body.as_str()).unwrap_or_default()
    }

    pub fn kinds(&self) -> Vec<SectionKind> {
        self.sections.iter().map(|s| s.kind).collect()
    }

    /// Kinds of detected sections in the order they appeared in the input.
    pub fn detected_order(&self) -> Vec<SectionKind> {
        let mut detected: Vec<&Section> =
            self.sections.iter().filter(|s| s.is_detected()).collect();
        detected.sort_by_key(|s| s.span.map(|sp| sp.start).unwrap_or(usize::MAX));
        detected.iter().map(|s| s.kind).collect()
    }

    pub fn all_items(&self) -> Vec<&ListItem> {
        self.sections
            .iter()
            .flat_map(|s| flatten_items(&s.items))
            .collect()
    }

    /// True when no section carries any body text or items.
    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|s| !s.has_content())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(label: &str, level: usize, children: Vec<ListItem>) -> ListItem {
        ListItem {
            label: label.into(),
            description: String::new(),
            confidence: 0.8,
            source_span: Span::new(0, 1),
            level,
            pattern: ItemPattern::BulletColon,
            children,
        }
    }

    #[test]
    fn span_overlap() {
        let a = Span::new(0, 10);
        assert!(a.overlaps(&Span::new(5, 15)));
        assert!(!a.overlaps(&Span::new(10, 20)));
        assert_eq!(Span::new(5, 2).len(), 0);
    }

    #[test]
    fn source_url_infers_platform() {
        let raw = RawDocument::new("text").with_source_url("https://www.indeed.com/viewjob");
        assert_eq!(raw.platform(), Some(Platform::Indeed));

        let raw = RawDocument::new("text")
            .with_platform(Platform::LinkedIn)
            .with_source_url("https://www.indeed.com/viewjob");
        assert_eq!(raw.platform(), Some(Platform::LinkedIn));
    }

    #[test]
    fn placeholders_cover_required_kinds() {
        let doc = Document::placeholders();
        assert_eq!(doc.sections.len(), 4);
        assert!(doc.sections.iter().all(|s| s.synthesized && s.is_placeholder()));
        assert!(doc.is_empty());
        assert_eq!(doc.section(SectionKind::Overview).unwrap().title, "Overview");
    }

    #[test]
    fn flatten_is_depth_first() {
        let tree = vec![
            item("A", 0, vec![item("A1", 1, vec![]), item("A2", 1, vec![])]),
            item("B", 0, vec![]),
        ];
        let labels: Vec<&str> = flatten_items(&tree).iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["A", "A1", "A2", "B"]);
        assert_eq!(tree[0].subtree_len(), 3);
    }
}
