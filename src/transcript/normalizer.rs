// Caption text normalization
//
// Flattens the three subtitle serializations upstreams hand back into one
// plain-text string:
// - timed-text XML (`<text>`, srv3 `<p>`/`<s>`, TTML `<p>`)
// - WebVTT
// - SRT-like cue lists
//
// The format is sniffed from the content; upstreams do not declare it reliably.

use regex::{Captures, Regex};

use super::errors::TranscriptError;

lazy_static::lazy_static! {
    static ref SEGMENT_RE: Regex =
        Regex::new(r"(?s)<(?:text|p|s)\b[^>]*>(.*?)</(?:text|p|s)>").unwrap();
    // Element tags and VTT inline timestamps; a bare `<` or `>` in text is left alone
    static ref TAG_RE: Regex = Regex::new(r"<(?:/?[A-Za-z]|\d{1,2}:)[^<>]*>").unwrap();
    static ref ENTITY_RE: Regex =
        Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});").unwrap();
    static ref CUE_TIMING_RE: Regex = Regex::new(
        r"^(?:\d{1,2}:)?\d{2}:\d{2}[.,]\d{3}\s*-->\s*(?:\d{1,2}:)?\d{2}:\d{2}[.,]\d{3}"
    ).unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
}

// &amp;#39; style double escaping shows up in timed-text responses
const MAX_DECODE_PASSES: usize = 3;

/// Convert a raw caption body into whitespace-normalized plain text.
///
/// Returns `TranscriptError::ParseEmpty` when nothing survives stripping.
pub fn normalize(raw: &str) -> Result<String, TranscriptError> {
    let text = if looks_like_timed_text(raw) {
        parse_timed_text(raw)
    } else {
        parse_cues(raw)
    };

    if text.is_empty() {
        Err(TranscriptError::ParseEmpty)
    } else {
        Ok(text)
    }
}

fn looks_like_timed_text(raw: &str) -> bool {
    let trimmed = raw.trim_start_matches('\u{feff}').trim_start();
    trimmed.starts_with('<') && SEGMENT_RE.is_match(trimmed)
}

fn parse_timed_text(xml: &str) -> String {
    let segments: Vec<String> = SEGMENT_RE
        .captures_iter(xml)
        .filter_map(|caps| {
            let inner = TAG_RE.replace_all(&caps[1], "");
            let decoded = decode_entities(&inner).replace('\n', " ");
            let text = TAG_RE.replace_all(&decoded, "");
            let text = text.trim();
            if text.is_empty() {
                None
            } else {
                Some(text.to_string())
            }
        })
        .collect();

    finish(&segments.join(" "))
}

fn parse_cues(raw: &str) -> String {
    let body = raw.trim_start_matches('\u{feff}');
    let is_vtt = body.trim_start().starts_with("WEBVTT");
    let has_cues = body.lines().any(|l| CUE_TIMING_RE.is_match(l.trim()));

    let mut kept: Vec<String> = Vec::new();
    let mut skipping_block = false;

    for line in body.lines() {
        let l = line.trim();
        if l.is_empty() {
            skipping_block = false;
            continue;
        }
        if skipping_block {
            continue;
        }
        if is_vtt {
            if l.starts_with("WEBVTT") || l.starts_with("Kind:") || l.starts_with("Language:") {
                continue;
            }
            // NOTE / STYLE / REGION blocks run until the next blank line
            if l == "NOTE" || l.starts_with("NOTE ") || l == "STYLE" || l == "REGION" {
                skipping_block = true;
                continue;
            }
        }
        if CUE_TIMING_RE.is_match(l) {
            continue;
        }
        if has_cues && l.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }

        let cleaned = clean_line(l);
        if cleaned.is_empty() {
            continue;
        }
        // Auto-generated VTT repeats the previous cue line as a rolling window
        if has_cues && kept.last() == Some(&cleaned) {
            continue;
        }
        kept.push(cleaned);
    }

    finish(&kept.join(" "))
}

fn clean_line(line: &str) -> String {
    let decoded = decode_entities(line);
    let stripped = TAG_RE.replace_all(&decoded, " ");
    collapse_whitespace(&stripped)
}

fn finish(text: &str) -> String {
    let stripped = TAG_RE.replace_all(text, " ");
    collapse_whitespace(&stripped)
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

/// Decode the HTML entities caption formats use, repeating for double-escaped input
pub fn decode_entities(text: &str) -> String {
    let mut current = text.to_string();
    for _ in 0..MAX_DECODE_PASSES {
        let next = ENTITY_RE
            .replace_all(&current, |caps: &Captures| match decode_entity(&caps[1]) {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            })
            .into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn decode_entity(body: &str) -> Option<char> {
    if let Some(num) = body.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return match code {
            0xA0 => Some(' '),
            _ => char::from_u32(code),
        };
    }

    match body {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        "hellip" => Some('\u{2026}'),
        "mdash" => Some('\u{2014}'),
        "ndash" => Some('\u{2013}'),
        "lsquo" => Some('\u{2018}'),
        "rsquo" => Some('\u{2019}'),
        "ldquo" => Some('\u{201c}'),
        "rdquo" => Some('\u{201d}'),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_clean(out: &str) {
        assert!(!TAG_RE.is_match(out), "tag left in {:?}", out);
        assert!(!ENTITY_RE.is_match(out), "entity left in {:?}", out);
        assert!(!out.contains("  "), "double space in {:?}", out);
        assert!(!out.contains('\n'), "newline in {:?}", out);
        assert!(!out.contains("-->"), "timing left in {:?}", out);
    }

    #[test]
    fn timed_text_segments() {
        let xml = r#"<text start="0">Hello &amp; welcome</text><text start="1">  to the show  </text>"#;
        assert_eq!(normalize(xml).unwrap(), "Hello & welcome to the show");
    }

    #[test]
    fn timed_text_document_with_double_escaping() {
        let xml = "<?xml version=\"1.0\" encoding=\"utf-8\" ?><transcript>\
                   <text start=\"0.5\" dur=\"2\">it&amp;#39;s\nfine</text>\
                   <text start=\"3\" dur=\"1\"></text>\
                   <text start=\"4\" dur=\"1\">&lt;b&gt;bold&lt;/b&gt; move</text>\
                   </transcript>";
        let out = normalize(xml).unwrap();
        assert_eq!(out, "it's fine bold move");
        assert_clean(&out);
    }

    #[test]
    fn srv3_paragraphs_and_spans() {
        let xml = r#"<timedtext format="3"><body><p t="0" d="1000"><s>never</s><s t="200"> gonna</s></p><p t="1000" d="500">give&nbsp;you up</p></body></timedtext>"#;
        assert_eq!(normalize(xml).unwrap(), "never gonna give you up");
    }

    #[test]
    fn span_is_not_a_segment_tag() {
        let ttml = r#"<tt><body><div><p begin="0s"><span style="s1">hi</span> there</p></div></body></tt>"#;
        assert_eq!(normalize(ttml).unwrap(), "hi there");
    }

    #[test]
    fn webvtt_basic() {
        let vtt = "WEBVTT\n\n00:00:00.000 --> 00:00:02.000\nHello<br>world\n";
        assert_eq!(normalize(vtt).unwrap(), "Hello world");
    }

    #[test]
    fn webvtt_with_metadata_and_positioning() {
        let vtt = "WEBVTT\nKind: captions\nLanguage: en\n\n\
                   NOTE generated\nby a tool\n\n\
                   00:00:01.000 --> 00:00:03.000 align:start position:0%\n\
                   we&#39;re <c.colorE5E5E5>no</c> strangers\n\n\
                   00:00:03.000 --> 00:00:05.000 align:start position:0%\n\
                   to&nbsp;love\n";
        let out = normalize(vtt).unwrap();
        assert_eq!(out, "we're no strangers to love");
        assert_clean(&out);
    }

    #[test]
    fn rolling_auto_captions_are_deduplicated() {
        let vtt = "WEBVTT\n\n\
                   00:00:00.000 --> 00:00:02.000\nhello world\n\n\
                   00:00:02.000 --> 00:00:02.010\nhello world\n\n\
                   00:00:02.010 --> 00:00:04.000\nhello world\nand more\n";
        assert_eq!(normalize(vtt).unwrap(), "hello world and more");
    }

    #[test]
    fn srt_cues() {
        let srt = "1\n00:00:01,000 --> 00:00:02,500\nFirst line\n\n2\n00:00:02,500 --> 00:00:04,000\nSecond <i>line</i>\n";
        assert_eq!(normalize(srt).unwrap(), "First line Second line");
    }

    #[test]
    fn empty_input_signals_parse_empty() {
        assert!(matches!(normalize(""), Err(TranscriptError::ParseEmpty)));
        assert!(matches!(
            normalize("WEBVTT\n\n00:00:00.000 --> 00:00:01.000\n\n"),
            Err(TranscriptError::ParseEmpty)
        ));
        assert!(matches!(
            normalize("<transcript><text start=\"0\">  </text></transcript>"),
            Err(TranscriptError::ParseEmpty)
        ));
    }

    #[test]
    fn plain_text_is_idempotent() {
        let samples = [
            "Hello world",
            "  spaced   out\ttext\nacross lines  ",
            "numbers 42 and symbols & stuff",
            "Kind words for everyone",
        ];
        for s in samples {
            let once = normalize(s).unwrap();
            let twice = normalize(&once).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn outputs_are_clean_for_every_shape() {
        let inputs = [
            "<transcript><text start=\"0\">a &quot;quote&quot;</text><text start=\"1\">&lt;</text><text start=\"2\">x&gt;</text></transcript>",
            "WEBVTT\n\n00:00.000 --> 00:02.000\n<v Speaker>short &amp;amp; timing</v>\n",
            "3\n00:00:01,000 --> 00:00:02,000\n  lots    of\n   space \n",
        ];
        for input in inputs {
            assert_clean(&normalize(input).unwrap());
        }
    }

    #[test]
    fn decoded_comparisons_are_not_taken_for_tags() {
        let xml = r#"<transcript><text start="0">if x &lt; 5 and y &gt; 2 we win</text></transcript>"#;
        let out = normalize(xml).unwrap();
        assert_eq!(out, "if x < 5 and y > 2 we win");
        assert_eq!(normalize(&out).unwrap(), out);

        let vtt = "WEBVTT\n\n00:00:00.000 --> 00:00:02.000\n<00:00:00.500><c>a &lt; b</c>\n";
        assert_eq!(normalize(vtt).unwrap(), "a < b");
    }

    #[test]
    fn decodes_numeric_entities() {
        assert_eq!(decode_entities("&#x27;hi&#39; &#160;"), "'hi'  ");
        assert_eq!(decode_entities("&unknown; stays"), "&unknown; stays");
    }
}
