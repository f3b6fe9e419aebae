//! マークアップ（HTML / RTF）からプレーンテキストを導出する
//!
//! AppKit のパーサが使えない環境用の簡易変換です。
//! 完全な描画結果ではなく「選択された文字列」が取り出せれば十分という前提。

use once_cell::sync::Lazy;
use regex::Regex;

static HTML_DROPPED_BLOCKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style|head|title)\b[^>]*>.*?</(script|style|head|title)\s*>|<!--.*?-->")
        .expect("valid regex")
});
static HTML_LINE_BREAKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(p|div|li|tr|h[1-6]|blockquote|pre|table|ul|ol)\s*>")
        .expect("valid regex")
});
static HTML_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static HTML_ENTITIES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").expect("valid regex"));
static INLINE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{a0}]+").expect("valid regex"));
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// HTML 断片をプレーンテキストに変換する
pub fn html_to_text(html: &str) -> String {
    let without_blocks = HTML_DROPPED_BLOCKS.replace_all(html, "");
    // ソース中の改行は空白扱い
    let flattened = without_blocks.replace(['\r', '\n'], " ");
    let with_breaks = HTML_LINE_BREAKS.replace_all(&flattened, "\n");
    let without_tags = HTML_TAGS.replace_all(&with_breaks, "");
    let decoded = HTML_ENTITIES.replace_all(&without_tags, |caps: &regex::Captures<'_>| {
        decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    });
    normalize_whitespace(&decoded)
}

fn decode_entity(name: &str) -> Option<String> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    let ch = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "hellip" => '\u{2026}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "copy" => '\u{a9}',
        _ => return None,
    };
    Some(ch.to_string())
}

fn normalize_whitespace(text: &str) -> String {
    let lines: Vec<String> = text
        .split('\n')
        .map(|line| INLINE_SPACES.replace_all(line, " ").trim().to_string())
        .collect();
    let joined = lines.join("\n");
    BLANK_LINES.replace_all(joined.trim(), "\n\n").into_owned()
}

/// 本文ではない destination グループ
const RTF_SKIPPED_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "header",
    "footer",
    "listtable",
    "listoverridetable",
    "expandedcolortbl",
];

/// `\ansicpg1252` で 0x80..=0x9F に割り当てられている文字（未定義は None）
#[rustfmt::skip]
const CP1252_HIGH: [Option<char>; 32] = [
    Some('\u{20ac}'), None, Some('\u{201a}'), Some('\u{0192}'),
    Some('\u{201e}'), Some('\u{2026}'), Some('\u{2020}'), Some('\u{2021}'),
    Some('\u{02c6}'), Some('\u{2030}'), Some('\u{0160}'), Some('\u{2039}'),
    Some('\u{0152}'), None, Some('\u{017d}'), None,
    None, Some('\u{2018}'), Some('\u{2019}'), Some('\u{201c}'),
    Some('\u{201d}'), Some('\u{2022}'), Some('\u{2013}'), Some('\u{2014}'),
    Some('\u{02dc}'), Some('\u{2122}'), Some('\u{0161}'), Some('\u{203a}'),
    Some('\u{0153}'), None, Some('\u{017e}'), Some('\u{0178}'),
];

fn decode_ansi_byte(byte: u8, cp1252: bool) -> Option<char> {
    match byte {
        0x80..=0x9f if cp1252 => CP1252_HIGH[usize::from(byte - 0x80)],
        _ => Some(char::from(byte)),
    }
}

/// グループ単位で引き継がれる状態
#[derive(Debug, Clone, Copy)]
struct RtfGroup {
    skipping: bool,
    /// `\ucN`: `\uN` の後に続く代替文字数
    unicode_skip: usize,
}

impl Default for RtfGroup {
    fn default() -> Self {
        Self {
            skipping: false,
            unicode_skip: 1,
        }
    }
}

/// RTF 文書をプレーンテキストに変換する
pub fn rtf_to_text(rtf: &str) -> String {
    let chars: Vec<char> = rtf.chars().collect();
    let len = chars.len();
    let mut out = String::new();
    let mut i = 0;
    let mut stack: Vec<RtfGroup> = Vec::new();
    let mut group = RtfGroup::default();
    // 文書全体のコードページ（\ansicpgN）
    let mut cp1252 = false;
    // \uN の直後に置かれる代替文字の残数
    let mut fallback_chars = 0usize;

    while i < len {
        let c = chars[i];
        match c {
            '{' => {
                stack.push(group);
                i += 1;
                if chars.get(i) == Some(&'\\') && chars.get(i + 1) == Some(&'*') {
                    group.skipping = true;
                }
            }
            '}' => {
                group = stack.pop().unwrap_or_default();
                fallback_chars = 0;
                i += 1;
            }
            '\\' => {
                i += 1;
                let Some(&next) = chars.get(i) else {
                    break;
                };
                if next.is_ascii_alphabetic() {
                    let start = i;
                    while i < len && chars[i].is_ascii_alphabetic() {
                        i += 1;
                    }
                    let word: String = chars[start..i].iter().collect();
                    let param_start = i;
                    if i < len && chars[i] == '-' {
                        i += 1;
                    }
                    while i < len && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                    let param: Option<i32> = chars[param_start..i]
                        .iter()
                        .collect::<String>()
                        .parse()
                        .ok();
                    if i < len && chars[i] == ' ' {
                        i += 1;
                    }
                    match word.as_str() {
                        "ansicpg" => cp1252 = param == Some(1252),
                        "uc" => {
                            group.unicode_skip =
                                param.and_then(|n| usize::try_from(n).ok()).unwrap_or(1);
                        }
                        _ if group.skipping => {}
                        "par" | "line" | "row" => out.push('\n'),
                        "tab" | "cell" => out.push('\t'),
                        "u" => {
                            if let Some(n) = param {
                                let code = if n < 0 { n + 65536 } else { n };
                                if let Some(ch) = u32::try_from(code).ok().and_then(char::from_u32) {
                                    out.push(ch);
                                }
                                fallback_chars = group.unicode_skip;
                            }
                        }
                        w if RTF_SKIPPED_DESTINATIONS.contains(&w) => group.skipping = true,
                        _ => {}
                    }
                } else if next == '\'' {
                    let hex: String = chars.iter().skip(i + 1).take(2).collect();
                    i += 1 + hex.len();
                    if group.skipping {
                        continue;
                    }
                    if fallback_chars > 0 {
                        fallback_chars -= 1;
                    } else if let Some(ch) = u8::from_str_radix(&hex, 16)
                        .ok()
                        .and_then(|byte| decode_ansi_byte(byte, cp1252))
                    {
                        out.push(ch);
                    }
                } else {
                    i += 1;
                    if group.skipping {
                        continue;
                    }
                    match next {
                        '\\' | '{' | '}' => out.push(next),
                        '~' => out.push(' '),
                        '\n' | '\r' => out.push('\n'),
                        _ => {}
                    }
                }
            }
            '\r' | '\n' => i += 1,
            _ => {
                i += 1;
                if group.skipping {
                    continue;
                }
                if fallback_chars > 0 {
                    fallback_chars -= 1;
                    continue;
                }
                out.push(c);
            }
        }
    }

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_tags_are_stripped() {
        assert_eq!(html_to_text("<b>hello</b>"), "hello");
    }

    #[test]
    fn html_block_elements_become_lines() {
        let html = "<div>first</div><div>second<br>third</div>";
        assert_eq!(html_to_text(html), "first\nsecond\nthird");
    }

    #[test]
    fn html_entities_are_decoded() {
        assert_eq!(
            html_to_text("a &amp; b &lt;c&gt; &#65;&#x42; &unknown;"),
            "a & b <c> AB &unknown;"
        );
    }

    #[test]
    fn html_document_wrapper_is_ignored() {
        let html = r#"<html><head><meta charset="utf-8"><style>p{color:red}</style></head>
            <body><!-- StartFragment --><span>draft   text</span><!-- EndFragment --></body></html>"#;
        assert_eq!(html_to_text(html), "draft text");
    }

    #[test]
    fn rtf_basic_groups() {
        assert_eq!(rtf_to_text(r"{\rtf1\ansi {\b bold} text}"), "bold text");
    }

    #[test]
    fn rtf_cocoa_document() {
        let rtf = "{\\rtf1\\ansi\\ansicpg1252\\cocoartf2639\n\\cocoatextscaling0\\cocoaplatform0{\\fonttbl\\f0\\fswiss\\fcharset0 Helvetica;}\n{\\colortbl;\\red255\\green255\\blue255;}\n{\\*\\expandedcolortbl;;}\n\\pard\\f0\\fs24 \\cf0 line one\\\nline two}";
        assert_eq!(rtf_to_text(rtf), "line one\nline two");
    }

    #[test]
    fn rtf_unicode_and_hex_escapes() {
        assert_eq!(rtf_to_text(r"{\rtf1 caf\'e9 \u26085?\u26412?}"), "café 日本");
    }

    #[test]
    fn rtf_uc0_has_no_fallback_characters() {
        assert_eq!(
            rtf_to_text(r"{\rtf1\ansi\uc0 \u8220 quoted\u8221  text}"),
            "\u{201c}quoted\u{201d} text"
        );
    }

    #[test]
    fn rtf_uc_value_is_scoped_to_group() {
        // \uc2 はグループ内だけ。外側は既定の 1 に戻る
        assert_eq!(rtf_to_text(r"{\rtf1 {\uc2 \u26085??}\u26412?x}"), "日本x");
    }

    #[test]
    fn rtf_hex_escapes_follow_cp1252() {
        assert_eq!(
            rtf_to_text(r"{\rtf1\ansi\ansicpg1252 \'93hi\'94 \'80 caf\'e9}"),
            "\u{201c}hi\u{201d} \u{20ac} café"
        );
    }

    #[test]
    fn rtf_escaped_braces() {
        assert_eq!(rtf_to_text(r"{\rtf1 a \{b\} c\\d}"), r"a {b} c\d");
    }
}
