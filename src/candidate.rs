use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::config::ReaderProfile;

/// One child of the reader's chapter container as seen in a single snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterCandidate {
    pub id: Option<String>,
    pub classes: Vec<String>,
    /// Outer HTML of the candidate element.
    pub markup: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind<'a> {
    Chapter(&'a str),
    EndOfBook,
    Loading,
    Unrecognized,
}

impl ChapterCandidate {
    pub fn classify(&self, profile: &ReaderProfile) -> CandidateKind<'_> {
        if let Some(id) = self.id.as_deref().map(str::trim)
            && !id.is_empty()
        {
            return CandidateKind::Chapter(id);
        }
        if self.has_class(&profile.end_of_book_class) {
            return CandidateKind::EndOfBook;
        }
        if self.has_class(&profile.loading_class) {
            return CandidateKind::Loading;
        }
        CandidateKind::Unrecognized
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// Pulls chapter candidates out of snapshot HTML with the profile's selector.
#[derive(Debug, Clone)]
pub struct CandidateExtractor {
    selector: Selector,
}

impl CandidateExtractor {
    pub fn new(profile: &ReaderProfile) -> anyhow::Result<Self> {
        let raw = profile.chapter_selector.as_str();
        let selector = Selector::parse(raw)
            .map_err(|err| anyhow::anyhow!("invalid chapter selector {raw:?}: {err}"))?;
        Ok(Self { selector })
    }

    pub fn extract(&self, snapshot_html: &str) -> Vec<ChapterCandidate> {
        let fragment = Html::parse_fragment(snapshot_html);
        fragment
            .select(&self.selector)
            .map(|element| {
                let value = element.value();
                ChapterCandidate {
                    id: value.id().map(str::to_owned),
                    classes: value.classes().map(str::to_owned).collect(),
                    markup: element.html(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"<div class="reader"><div class="epub-main">
<div id="chap01"><p>One</p></div>
<div class="scroll-loading">loading…</div>
<div id="chap02"><p>Two</p><div id="nested">not a candidate</div></div>
<div class="read-end">The end</div>
<div class="mystery"></div>
</div></div>"#;

    #[test]
    fn extracts_direct_children_in_document_order() -> anyhow::Result<()> {
        let extractor = CandidateExtractor::new(&ReaderProfile::default())?;
        let candidates = extractor.extract(SNAPSHOT);

        let ids = candidates
            .iter()
            .map(|c| c.id.as_deref())
            .collect::<Vec<_>>();
        assert_eq!(
            ids,
            vec![Some("chap01"), None, Some("chap02"), None, None]
        );
        assert!(candidates[0].markup.starts_with(r#"<div id="chap01">"#));
        Ok(())
    }

    #[test]
    fn classifies_every_kind() -> anyhow::Result<()> {
        let profile = ReaderProfile::default();
        let extractor = CandidateExtractor::new(&profile)?;
        let kinds = extractor
            .extract(SNAPSHOT)
            .iter()
            .map(|c| match c.classify(&profile) {
                CandidateKind::Chapter(id) => format!("chapter:{id}"),
                CandidateKind::EndOfBook => "end".to_owned(),
                CandidateKind::Loading => "loading".to_owned(),
                CandidateKind::Unrecognized => "unrecognized".to_owned(),
            })
            .collect::<Vec<_>>();

        assert_eq!(
            kinds,
            vec![
                "chapter:chap01",
                "loading",
                "chapter:chap02",
                "end",
                "unrecognized"
            ]
        );
        Ok(())
    }

    #[test]
    fn blank_id_is_not_a_chapter() {
        let candidate = ChapterCandidate {
            id: Some("  ".to_owned()),
            classes: Vec::new(),
            markup: "<div id=\"  \"></div>".to_owned(),
        };
        assert_eq!(
            candidate.classify(&ReaderProfile::default()),
            CandidateKind::Unrecognized
        );
    }

    #[test]
    fn invalid_selector_is_an_error() {
        let profile = ReaderProfile {
            chapter_selector: "div >>".to_owned(),
            ..ReaderProfile::default()
        };
        assert!(CandidateExtractor::new(&profile).is_err());
    }
}
