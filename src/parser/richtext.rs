use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

const SITE_ORIGIN: &str = "https://www.bg-wiki.com";
const CONTENT_ROOT: &str = "https://www.bg-wiki.com/ffxi/";

static LINE_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<li[^>]*>|<br\s*/?>").unwrap());
static LI_CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</li>").unwrap());
static P_WRAPPER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?p[^>]*>").unwrap());
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"<a\s+[^>]*href="([^"]*)"[^>]*>([^<]*)</a>"#).unwrap());
static SC_ICON_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"<img[^>]*alt="([^"]*SC Icon[^"]*)"[^>]*>"#).unwrap());
static NO_SC_ALT_FIRST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img[^>]*alt="None"[^>]*src="[^"]*Status_Ability\.png"[^>]*>"#).unwrap()
});
static NO_SC_SRC_FIRST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img[^>]*src="[^"]*Status_Ability\.png"[^>]*alt="None"[^>]*>"#).unwrap()
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const PUNCTUATION: &[char] = &['.', ',', ':', ';', '!', '?'];

/// One atomic unit of a rendered line. Serializes with the same tagging the
/// wiki JSON consumers expect: `{"type": "text", "value": ...}` etc.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InlineElement {
    Text { value: String },
    Link { text: String, url: String },
    Skillchain { value: String },
}

/// Elements in left-to-right reading order. Never empty once emitted.
pub type Line = Vec<InlineElement>;

/// Convert one cell's raw inline markup into rich-text lines.
///
/// `None` means the field was absent from the source (blank markup or the
/// wiki's literal `None` placeholder) — distinct from present-but-empty,
/// which cannot occur: empty lines are never emitted.
pub fn convert(markup: &str) -> Option<Vec<Line>> {
    let trimmed = markup.trim();
    if trimmed.is_empty() || trimmed == "None" {
        return None;
    }

    let mut lines = Vec::new();
    for raw_segment in LINE_BREAK_RE.split(markup) {
        if raw_segment.trim().is_empty() {
            continue;
        }
        let segment = LI_CLOSE_RE.replace_all(raw_segment, "");
        let segment = P_WRAPPER_RE.replace_all(&segment, "");
        let line = convert_segment(&segment);
        if !line.is_empty() {
            lines.push(line);
        }
    }

    if lines.is_empty() { None } else { Some(lines) }
}

/// Flatten lines to plain text (for console listings).
pub fn lines_to_text(lines: &[Line]) -> String {
    let parts: Vec<String> = lines
        .iter()
        .map(|line| {
            line.iter()
                .map(|el| match el {
                    InlineElement::Text { value } => value.clone(),
                    InlineElement::Link { text, .. } => text.clone(),
                    InlineElement::Skillchain { value } => format!("[{}]", value),
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();
    parts.join("; ")
}

/// A matched markup construct tagged with its byte span in the segment.
struct Span {
    start: usize,
    end: usize,
    element: InlineElement,
}

fn convert_segment(segment: &str) -> Line {
    let spans = scan_spans(segment);

    let mut items: Line = Vec::new();
    let mut cursor = 0;
    for span in spans {
        // Overlapping matches should not occur in well-formed markup; the
        // earlier-starting one wins.
        if span.start < cursor {
            continue;
        }
        if let Some(text) = clean_gap(&segment[cursor..span.start]) {
            items.push(InlineElement::Text { value: text });
        }
        match span.element {
            // Links with no visible label contribute nothing.
            InlineElement::Link { ref text, .. } if text.is_empty() => {}
            element => items.push(element),
        }
        cursor = span.end;
    }
    if let Some(text) = clean_gap(&segment[cursor..]) {
        items.push(InlineElement::Text { value: text });
    }

    merge_punctuation(items)
}

/// Find all links and icons in the segment, sorted by start offset.
fn scan_spans(segment: &str) -> Vec<Span> {
    let mut spans = Vec::new();

    for caps in LINK_RE.captures_iter(segment) {
        let m = caps.get(0).unwrap();
        spans.push(Span {
            start: m.start(),
            end: m.end(),
            element: InlineElement::Link {
                text: caps[2].trim().to_string(),
                url: absolute_url(&caps[1]),
            },
        });
    }

    for caps in SC_ICON_RE.captures_iter(segment) {
        let name = caps[1].replace(" SC Icon.png", "").replace(" SC Icon", "");
        if name.is_empty() {
            continue;
        }
        let m = caps.get(0).unwrap();
        spans.push(Span {
            start: m.start(),
            end: m.end(),
            element: InlineElement::Skillchain { value: name },
        });
    }

    // "None" placeholder icon, either attribute order.
    for re in [&*NO_SC_ALT_FIRST_RE, &*NO_SC_SRC_FIRST_RE] {
        for m in re.find_iter(segment) {
            spans.push(Span {
                start: m.start(),
                end: m.end(),
                element: InlineElement::Skillchain {
                    value: "Status_Ability".to_string(),
                },
            });
        }
    }

    spans.sort_by_key(|s| s.start);
    spans
}

/// Clean the prose between two matches: strip leftover tags, decode entities,
/// collapse whitespace. A lone `/` separator is kept as `" / "`.
fn clean_gap(raw: &str) -> Option<String> {
    let stripped = TAG_RE.replace_all(raw, "");
    let decoded = html_escape::decode_html_entities(&stripped);
    let collapsed = WHITESPACE_RE.replace_all(&decoded, " ");
    let trimmed = collapsed.trim();
    if trimmed == "/" {
        return Some(" / ".to_string());
    }
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn absolute_url(href: &str) -> String {
    if href.starts_with('/') {
        format!("{}{}", SITE_ORIGIN, href)
    } else if !href.starts_with("http") {
        format!("{}{}", CONTENT_ROOT, href)
    } else {
        href.to_string()
    }
}

/// Re-attach stray punctuation to the preceding element and collapse adjacent
/// text runs. Single forward pass building a fresh list.
///
/// Skillchain icons never absorb punctuation: their names feed icon lookup
/// downstream and must stay exact.
fn merge_punctuation(items: Line) -> Line {
    let mut out: Line = Vec::with_capacity(items.len());

    for item in items {
        let InlineElement::Text { value } = item else {
            out.push(item);
            continue;
        };

        // Lone punctuation character.
        let mut chars = value.chars();
        if let (Some(ch), None) = (chars.next(), chars.next()) {
            if PUNCTUATION.contains(&ch) {
                let keep = match out.last_mut() {
                    Some(InlineElement::Link { text, .. }) => {
                        text.push(ch);
                        false
                    }
                    Some(InlineElement::Text { value: prev }) => {
                        prev.push(ch);
                        false
                    }
                    // After an icon it stays as its own element.
                    Some(InlineElement::Skillchain { .. }) => true,
                    // No preceding element to attach to: dropped.
                    None => false,
                };
                if keep {
                    out.push(InlineElement::Text { value });
                }
                continue;
            }
        }

        // Leading punctuation glued to whatever came before.
        let mut value = value;
        if let Some(first) = value.chars().next().filter(|c| PUNCTUATION.contains(c)) {
            let donated = match out.last_mut() {
                Some(InlineElement::Link { text, .. }) => {
                    text.push(first);
                    true
                }
                Some(InlineElement::Text { value: prev }) => {
                    prev.push(first);
                    true
                }
                _ => false,
            };
            if donated {
                value = value[first.len_utf8()..].trim_start().to_string();
                if value.is_empty() {
                    continue;
                }
            }
        }

        // Adjacent text runs (left behind by a dropped empty link) join up.
        if let Some(InlineElement::Text { value: prev }) = out.last_mut() {
            *prev = format!("{} {}", prev.trim_end(), value.trim_start());
            continue;
        }
        out.push(InlineElement::Text { value });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> InlineElement {
        InlineElement::Text {
            value: value.to_string(),
        }
    }

    fn link(text: &str, url: &str) -> InlineElement {
        InlineElement::Link {
            text: text.to_string(),
            url: url.to_string(),
        }
    }

    fn sc(value: &str) -> InlineElement {
        InlineElement::Skillchain {
            value: value.to_string(),
        }
    }

    #[test]
    fn empty_input_is_absent() {
        assert_eq!(convert(""), None);
        assert_eq!(convert("   \n "), None);
    }

    #[test]
    fn none_placeholder_is_absent() {
        assert_eq!(convert("None"), None);
        assert_eq!(convert("  None  "), None);
    }

    #[test]
    fn plain_prose_single_text() {
        let lines = convert("Casts   elemental\n magic.").unwrap();
        assert_eq!(lines, vec![vec![text("Casts elemental magic.")]]);
    }

    #[test]
    fn idempotent_on_own_plain_text() {
        let lines = convert("Uses  ranged attacks.").unwrap();
        let flat: String = lines[0]
            .iter()
            .map(|el| match el {
                InlineElement::Text { value } => value.clone(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(convert(&flat).unwrap(), lines);
    }

    #[test]
    fn relative_link_rooted_at_origin() {
        let lines = convert(r#"<a href="/wiki/Fire">Fire</a>"#).unwrap();
        assert_eq!(
            lines,
            vec![vec![link("Fire", "https://www.bg-wiki.com/wiki/Fire")]]
        );
    }

    #[test]
    fn bare_link_rooted_at_content_path() {
        let lines = convert(r#"<a href="Cure_IV">Cure IV</a>"#).unwrap();
        assert_eq!(
            lines,
            vec![vec![link("Cure IV", "https://www.bg-wiki.com/ffxi/Cure_IV")]]
        );
    }

    #[test]
    fn absolute_link_kept_verbatim() {
        let lines = convert(r#"<a href="https://example.com/x">x</a>"#).unwrap();
        assert_eq!(lines, vec![vec![link("x", "https://example.com/x")]]);
    }

    #[test]
    fn trailing_period_merges_into_link() {
        let lines = convert(r#"The quick <a href="/wiki/Fox">Fox</a>."#).unwrap();
        assert_eq!(
            lines,
            vec![vec![
                text("The quick"),
                link("Fox.", "https://www.bg-wiki.com/wiki/Fox"),
            ]]
        );
    }

    #[test]
    fn leading_punctuation_donated_then_remainder_kept() {
        let lines = convert(r#"<a href="/wiki/A">A</a>, then B"#).unwrap();
        assert_eq!(
            lines,
            vec![vec![
                link("A,", "https://www.bg-wiki.com/wiki/A"),
                text("then B"),
            ]]
        );
    }

    #[test]
    fn skillchain_icon_name_stripped() {
        let lines =
            convert(r#"<img class="sc" alt="Light SC Icon.png" src="/images/light.png">"#).unwrap();
        assert_eq!(lines, vec![vec![sc("Light")]]);
    }

    #[test]
    fn punctuation_after_skillchain_stays_separate() {
        let lines = convert(r#"<img alt="Light SC Icon.png" src="/i/l.png">."#).unwrap();
        assert_eq!(lines, vec![vec![sc("Light"), text(".")]]);
    }

    #[test]
    fn sentinel_icon_alt_first() {
        let lines = convert(r#"<img alt="None" src="/images/Status_Ability.png">"#).unwrap();
        assert_eq!(lines, vec![vec![sc("Status_Ability")]]);
    }

    #[test]
    fn sentinel_icon_src_first() {
        let lines = convert(r#"<img src="/images/Status_Ability.png" alt="None">"#).unwrap();
        assert_eq!(lines, vec![vec![sc("Status_Ability")]]);
    }

    #[test]
    fn sentinel_icon_emitted_exactly_once() {
        let lines =
            convert(r#"before <img alt="None" src="/i/Status_Ability.png"> after"#).unwrap();
        let count = lines[0]
            .iter()
            .filter(|el| matches!(el, InlineElement::Skillchain { value } if value == "Status_Ability"))
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn slash_separator_between_links_preserved() {
        let lines =
            convert(r#"<a href="/wiki/A">A</a> / <a href="/wiki/B">B</a>"#).unwrap();
        assert_eq!(
            lines,
            vec![vec![
                link("A", "https://www.bg-wiki.com/wiki/A"),
                text(" / "),
                link("B", "https://www.bg-wiki.com/wiki/B"),
            ]]
        );
    }

    #[test]
    fn empty_link_contributes_nothing() {
        let lines = convert(r#"foo <a href="x"></a> bar"#).unwrap();
        assert_eq!(lines, vec![vec![text("foo bar")]]);
    }

    #[test]
    fn empty_link_alone_is_absent() {
        assert_eq!(convert(r#"<a href="x"></a>"#), None);
    }

    #[test]
    fn list_items_split_into_lines() {
        let lines = convert("<ul><li>First</li><li>Second</li></ul>").unwrap();
        assert_eq!(lines, vec![vec![text("First")], vec![text("Second")]]);
    }

    #[test]
    fn br_splits_lines() {
        let lines = convert("one<br>two<br/>three").unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], vec![text("three")]);
    }

    #[test]
    fn entities_decoded() {
        let lines = convert("Fish &amp; chips &mdash; hot").unwrap();
        assert_eq!(lines, vec![vec![text("Fish & chips — hot")]]);
    }

    #[test]
    fn unknown_tags_stripped_to_text() {
        let lines = convert("<span class=\"x\">Hello</span> <b>world</b>").unwrap();
        assert_eq!(lines, vec![vec![text("Hello world")]]);
    }

    #[test]
    fn lone_leading_punctuation_dropped() {
        let lines = convert(". <a href=\"/wiki/A\">A</a>").unwrap();
        assert_eq!(lines, vec![vec![link("A", "https://www.bg-wiki.com/wiki/A")]]);
    }

    #[test]
    fn punctuation_merge_applies_per_line() {
        let lines = convert(r#"<a href="/wiki/A">A</a>.<br>done"#).unwrap();
        assert_eq!(lines[0], vec![link("A.", "https://www.bg-wiki.com/wiki/A")]);
        assert_eq!(lines[1], vec![text("done")]);
    }

    #[test]
    fn punctuation_run_merges_greedily_left_to_right() {
        // Only the first punctuation character is donated; the remainder
        // stays with the following text run.
        let lines = convert(r#"<a href="/wiki/A">A</a>. , b"#).unwrap();
        assert_eq!(
            lines,
            vec![vec![
                link("A.", "https://www.bg-wiki.com/wiki/A"),
                text(", b"),
            ]]
        );
    }

    #[test]
    fn no_adjacent_texts_and_no_empty_elements() {
        let inputs = [
            r#"foo <a href="x"></a> bar <a href="/wiki/C">C</a>, baz."#,
            r#"a<br><a href="y"></a><br>b , c"#,
            r#"<img alt="Light SC Icon.png" src="/i.png"> , <a href="/wiki/D">D</a>"#,
        ];
        for input in inputs {
            let Some(lines) = convert(input) else { continue };
            for line in &lines {
                assert!(!line.is_empty());
                for pair in line.windows(2) {
                    assert!(
                        !matches!(
                            (&pair[0], &pair[1]),
                            (InlineElement::Text { .. }, InlineElement::Text { .. })
                        ),
                        "adjacent text in {:?}",
                        line
                    );
                }
                for el in line {
                    match el {
                        InlineElement::Text { value } => assert!(!value.is_empty()),
                        InlineElement::Link { text, .. } => assert!(!text.is_empty()),
                        InlineElement::Skillchain { value } => assert!(!value.is_empty()),
                    }
                }
            }
        }
    }

    #[test]
    fn weapon_skill_row_with_icon_and_links() {
        let lines = convert(
            r#"<a href="/wiki/Red_Lotus_Blade">Red Lotus Blade</a> <img alt="Liquefaction SC Icon.png" src="/images/Liquefaction_SC_Icon.png">"#,
        )
        .unwrap();
        assert_eq!(
            lines,
            vec![vec![
                link("Red Lotus Blade", "https://www.bg-wiki.com/wiki/Red_Lotus_Blade"),
                sc("Liquefaction"),
            ]]
        );
    }

    #[test]
    fn serializes_with_type_tags() {
        let el = sc("Light");
        let json = serde_json::to_string(&el).unwrap();
        assert_eq!(json, r#"{"type":"skillchain","value":"Light"}"#);
        let el = link("Fox.", "https://www.bg-wiki.com/wiki/Fox");
        let json = serde_json::to_value(&el).unwrap();
        assert_eq!(json["type"], "link");
        assert_eq!(json["text"], "Fox.");
    }
}
