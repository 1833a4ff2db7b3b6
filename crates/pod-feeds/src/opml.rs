//! OPML 2.0 subscription-list import.
//!
//! Mirrors the attribute-fallback-chain behavior podcast apps rely on:
//! `xmlUrl` is the canonical feed-URL attribute, `title`/`text` both name an
//! outline, and a parent outline with no URL but with children becomes a
//! category label applied to its descendants. Some exporters write the
//! feed URL under a non-canonical attribute name; a raw pass over the
//! document's `<outline>` attributes backstops the `opml` crate's
//! canonical-only `xml_url` field against those.

use std::collections::HashMap;

use opml::OPML;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::FeedError;
use crate::html::rewrite_feed_scheme;

const ALLOWED_SCHEMES: &[&str] = &["http://", "https://", "feed://"];

/// Attribute names known to carry a feed URL, tried in priority order
/// when `xmlUrl` is absent or empty.
const URL_ATTRIBUTES: &[&str] = &["xmlUrl", "xmlurl", "url", "feedUrl", "feedurl"];

/// A single feed entry recovered from an OPML document.
#[derive(Debug, Clone)]
pub struct OpmlFeed {
    pub feed_url: String,
    pub title: Option<String>,
    pub website_url: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// Aggregate result of parsing one OPML document, independent of whatever
/// is later done with the feeds (dry-run or persisted).
#[derive(Debug, Clone, Default)]
pub struct OpmlImportResult {
    pub feeds: Vec<OpmlFeed>,
    pub total_outlines: usize,
    pub skipped_no_url: usize,
}

/// Parses OPML bytes into an [`OpmlImportResult`]. Pure: does not touch a
/// repository. Callers decide whether to upsert, dry-run, or diff.
///
/// # Errors
///
/// Returns `FeedError::MalformedOpml` if the document isn't valid OPML.
pub fn import_opml(content: &str) -> Result<OpmlImportResult, FeedError> {
    let doc = OPML::from_str(content).map_err(|e| FeedError::MalformedOpml(e.to_string()))?;
    let raw_forest = parse_raw_outline_forest(content);

    let mut result = OpmlImportResult::default();
    process_outlines(&doc.body.outlines, &raw_forest, None, &mut result);
    Ok(result)
}

fn process_outlines(
    outlines: &[opml::Outline],
    raw_siblings: &[RawOutline],
    category: Option<&str>,
    result: &mut OpmlImportResult,
) {
    for (i, outline) in outlines.iter().enumerate() {
        result.total_outlines += 1;
        let raw_node = raw_siblings.get(i);

        let feed_url = outline
            .xml_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .map(str::trim)
            .or_else(|| raw_node.and_then(raw_outline_url).filter(|u| !u.is_empty()));

        if let Some(url) = feed_url {
            if let Some(feed) = extract_feed(outline, url, category) {
                result.feeds.push(feed);
            } else {
                result.skipped_no_url += 1;
            }
        } else if outline.outlines.is_empty() {
            result.skipped_no_url += 1;
        } else {
            let own_title = outline_label(outline);
            let next_category = own_title.as_deref().or(category);
            let children = raw_node.map_or(&[][..], |n| n.children.as_slice());
            process_outlines(&outline.outlines, children, next_category, result);
        }
    }
}

/// One `<outline>` element's raw attributes, parsed independently of the
/// `opml` crate so attribute names outside its canonical set survive.
/// Built in document order, mirroring `opml::Outline`'s own nesting, so
/// [`process_outlines`] can zip the two trees by position.
#[derive(Debug, Default)]
struct RawOutline {
    attrs: HashMap<String, String>,
    children: Vec<RawOutline>,
}

fn raw_outline_url(node: &RawOutline) -> Option<&str> {
    URL_ATTRIBUTES.iter().find_map(|key| node.attrs.get(*key)).map(String::as_str)
}

/// Walks the raw XML with a stack of in-progress `<outline>` nodes,
/// attaching each closed node to its parent's (or the forest's) children
/// the moment its matching end tag is seen.
fn parse_raw_outline_forest(content: &str) -> Vec<RawOutline> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text_start = true;
    reader.config_mut().trim_text_end = true;

    let mut stack: Vec<RawOutline> = Vec::new();
    let mut forest: Vec<RawOutline> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(tag)) if tag.local_name().as_ref() == b"outline" => {
                stack.push(raw_outline_from_tag(&tag));
            }
            Ok(Event::Empty(tag)) if tag.local_name().as_ref() == b"outline" => {
                let node = raw_outline_from_tag(&tag);
                attach_raw_node(&mut stack, &mut forest, node);
            }
            Ok(Event::End(tag)) if tag.local_name().as_ref() == b"outline" => {
                if let Some(node) = stack.pop() {
                    attach_raw_node(&mut stack, &mut forest, node);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => break,
        }
    }

    forest
}

fn raw_outline_from_tag(tag: &BytesStart) -> RawOutline {
    let mut attrs = HashMap::new();
    for attr in tag.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        if let Ok(value) = attr.unescape_value() {
            attrs.insert(key, value.into_owned());
        }
    }
    RawOutline { attrs, children: Vec::new() }
}

fn attach_raw_node(stack: &mut Vec<RawOutline>, forest: &mut Vec<RawOutline>, node: RawOutline) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => forest.push(node),
    }
}

fn outline_label(outline: &opml::Outline) -> Option<String> {
    outline
        .title
        .clone()
        .filter(|t| !t.is_empty())
        .or_else(|| Some(outline.text.clone()).filter(|t| !t.is_empty()))
}

fn extract_feed(outline: &opml::Outline, raw_url: &str, category: Option<&str>) -> Option<OpmlFeed> {
    let scheme_ok = ALLOWED_SCHEMES.iter().any(|s| raw_url.starts_with(s));
    if !scheme_ok {
        return None;
    }

    let feed_url = rewrite_feed_scheme(raw_url);

    Some(OpmlFeed {
        feed_url,
        title: outline_label(outline),
        website_url: outline.html_url.clone().filter(|u| !u.is_empty()),
        description: outline.description.clone().filter(|d| !d.is_empty()),
        category: category.map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const THREE_FEEDS: &str = r#"<?xml version="1.0"?>
<opml version="2.0">
  <head><title>Subscriptions</title></head>
  <body>
    <outline text="F1" title="F1" xmlUrl="https://x.test/f1.xml"/>
    <outline text="Tech">
      <outline text="F2" title="F2" xmlUrl="https://x.test/f2.xml"/>
    </outline>
    <outline text="F3" title="F3" xmlUrl="https://x.test/f3.xml"/>
    <outline text="Empty Folder"/>
  </body>
</opml>"#;

    #[test]
    fn three_feed_file_with_category_and_skip() {
        let result = import_opml(THREE_FEEDS).unwrap();
        assert_eq!(result.total_outlines, 4);
        assert_eq!(result.feeds.len(), 3);
        assert_eq!(result.skipped_no_url, 1);

        let f2 = result.feeds.iter().find(|f| f.title.as_deref() == Some("F2")).unwrap();
        assert_eq!(f2.category.as_deref(), Some("Tech"));

        let f1 = result.feeds.iter().find(|f| f.title.as_deref() == Some("F1")).unwrap();
        assert!(f1.category.is_none());
    }

    #[test]
    fn feed_scheme_is_rewritten_to_https() {
        let opml = r#"<?xml version="1.0"?>
<opml version="2.0"><head/><body>
  <outline text="F" xmlUrl="feed://x.test/f.xml"/>
</body></opml>"#;
        let result = import_opml(opml).unwrap();
        assert_eq!(result.feeds[0].feed_url, "https://x.test/f.xml");
    }

    #[test]
    fn falls_back_to_non_canonical_url_attribute() {
        let opml = r#"<?xml version="1.0"?>
<opml version="2.0"><head/><body>
  <outline text="F" url="https://x.test/f.xml"/>
  <outline text="G" feedUrl="https://x.test/g.xml"/>
</body></opml>"#;
        let result = import_opml(opml).unwrap();
        assert_eq!(result.skipped_no_url, 0);
        assert_eq!(result.feeds.len(), 2);
        assert_eq!(result.feeds[0].feed_url, "https://x.test/f.xml");
        assert_eq!(result.feeds[1].feed_url, "https://x.test/g.xml");
    }

    #[test]
    fn rejects_unsupported_scheme() {
        let opml = r#"<?xml version="1.0"?>
<opml version="2.0"><head/><body>
  <outline text="F" xmlUrl="ftp://x.test/f.xml"/>
</body></opml>"#;
        let result = import_opml(opml).unwrap();
        assert_eq!(result.feeds.len(), 0);
        assert_eq!(result.skipped_no_url, 1);
    }
}
