use crate::listing::RawFragment;
use crate::normalize::normalize_text;
use scraper::{ElementRef, Html, Node, Selector};
use std::ops::Deref;

/// The reviewer link inside a fragment: visible name plus `href`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRef {
    pub name: String,
    pub href: String,
}

/// Typed access to the parts of one review entry.
///
/// Field rules in [`crate::review`] only talk to this trait, so they do not
/// care which markup library located the pieces. Every accessor returns
/// `None` when the piece is missing or empty after trimming.
pub trait ReviewFragment {
    /// The heading, e.g. `"Crushing - 95%"`.
    fn title_line(&self) -> Option<String>;

    /// The link to the reviewer's profile.
    fn profile_ref(&self) -> Option<ProfileRef>;

    /// The node right after the profile link, e.g. `", January 1st, 2020"`.
    fn byline(&self) -> Option<String>;

    /// The review body, with line breaks kept.
    fn content_block(&self) -> Option<String>;
}

/// A review fragment parsed with `scraper`.
pub struct HtmlFragment {
    doc: Html,
}

impl HtmlFragment {
    pub fn parse(raw: &RawFragment) -> Self {
        Self {
            doc: Html::parse_fragment(&raw.html),
        }
    }

    fn first(&self, selector: &str) -> Option<ElementRef<'_>> {
        let sel = Selector::parse(selector).expect("valid selector");
        self.doc.select(&sel).next()
    }

    fn profile_anchor(&self) -> Option<ElementRef<'_>> {
        self.first("a.profileMenu")
    }
}

impl ReviewFragment for HtmlFragment {
    fn title_line(&self) -> Option<String> {
        self.first("h3.reviewTitle")
            .map(|h3| h3.text().collect::<String>())
            .and_then(non_empty)
    }

    fn profile_ref(&self) -> Option<ProfileRef> {
        let anchor = self.profile_anchor()?;
        let name = non_empty(anchor.text().collect::<String>())?;
        let href = non_empty(anchor.value().attr("href")?.to_string())?;
        Some(ProfileRef { name, href })
    }

    fn byline(&self) -> Option<String> {
        let sibling = self.profile_anchor()?.next_sibling()?;
        let text = match sibling.value() {
            Node::Text(text) => text.deref().to_string(),
            Node::Element(_) => ElementRef::wrap(sibling)?
                .text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
            _ => return None,
        };
        non_empty(text)
    }

    fn content_block(&self) -> Option<String> {
        let body = self.first("div.reviewContent")?;
        non_empty(normalize_text(&collect_all_text(body.id(), body.tree())))
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Collect all text content under a node, recursively, turning `<br>` into newlines.
fn collect_all_text(node_id: ego_tree::NodeId, tree: &ego_tree::Tree<Node>) -> String {
    let Some(node) = tree.get(node_id) else {
        return String::new();
    };
    let mut text = String::new();

    for child in node.children() {
        match child.value() {
            Node::Text(t) => text.push_str(t.deref()),
            Node::Element(elem) => match elem.name() {
                "br" => text.push('\n'),
                "script" | "style" => {}
                _ => text.push_str(&collect_all_text(child.id(), tree)),
            },
            _ => {}
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(html: &str) -> HtmlFragment {
        HtmlFragment::parse(&RawFragment {
            index: 0,
            html: html.to_string(),
        })
    }

    const BOX: &str = r#"
        <div class="reviewBox">
          <h3 class="reviewTitle">
            Crushing - 95%
          </h3>
          <div>
            <a href="https://www.metal-archives.com/users/Some%20Reviewer" class="profileMenu">Some Reviewer</a>, January 1st, 2020
          </div>
          <div class="reviewContent">
            First paragraph.<br /><br />
            Second &amp; last paragraph.
          </div>
        </div>
    "#;

    #[test]
    fn test_accessors() {
        let f = fragment(BOX);
        assert_eq!(f.title_line().as_deref(), Some("Crushing - 95%"));
        assert_eq!(
            f.profile_ref(),
            Some(ProfileRef {
                name: "Some Reviewer".into(),
                href: "https://www.metal-archives.com/users/Some%20Reviewer".into(),
            })
        );
        assert_eq!(f.byline().as_deref(), Some(", January 1st, 2020"));
        assert_eq!(
            f.content_block().as_deref(),
            Some("First paragraph.\n\nSecond & last paragraph.")
        );
    }

    #[test]
    fn test_byline_inside_element() {
        let f = fragment(
            r#"<div class="reviewBox"><div><a class="profileMenu" href="/users/x">x</a><span>, May 5th, 2019</span></div></div>"#,
        );
        assert_eq!(f.byline().as_deref(), Some(", May 5th, 2019"));
    }

    #[test]
    fn test_missing_pieces() {
        let f = fragment(r#"<div class="reviewBox"><h3 class="reviewTitle">   </h3></div>"#);
        assert!(f.title_line().is_none());
        assert!(f.profile_ref().is_none());
        assert!(f.byline().is_none());
        assert!(f.content_block().is_none());
    }
}
