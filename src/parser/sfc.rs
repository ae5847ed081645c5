//! Vue single-file component blocks
//!
//! Splits a `.vue` file into its top-level `<script>`, `<template>` and
//! `<style>` blocks. Block contents are returned verbatim.

use std::collections::BTreeMap;

use super::lexer::LexError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SfcBlock {
    pub content: String,
    pub attrs: BTreeMap<String, String>,
    /// Line of the first content line in the `.vue` file
    pub line: usize,
}

impl SfcBlock {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn has(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    pub fn lang(&self) -> Option<&str> {
        self.attr("lang")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sfc {
    pub script: Option<SfcBlock>,
    pub script_setup: Option<SfcBlock>,
    pub template: Option<SfcBlock>,
    pub styles: Vec<SfcBlock>,
}

pub fn split(src: &str) -> Result<Sfc, LexError> {
    let mut sfc = Sfc::default();
    let mut pos = 0;

    while let Some(offset) = src[pos..].find('<') {
        let open = pos + offset;
        let rest = &src[open..];

        if rest.starts_with("<!--") {
            pos = match rest.find("-->") {
                Some(end) => open + end + 3,
                None => return Err(error(src, open, "unterminated comment")),
            };
            continue;
        }

        let name_len = rest[1..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
            .unwrap_or(rest.len() - 1);
        let name = &rest[1..1 + name_len];
        if name.is_empty() {
            pos = open + 1;
            continue;
        }

        let (attrs, tag_end, self_closing) = parse_attrs(src, open + 1 + name_len)?;
        let content_start = tag_end;
        let (content_end, after) = if self_closing {
            (content_start, content_start)
        } else {
            find_close(src, content_start, name)
                .ok_or_else(|| error(src, open, &format!("unclosed <{}> block", name)))?
        };

        let block = SfcBlock {
            content: src[content_start..content_end].to_string(),
            attrs,
            line: line_at(src, content_start),
        };

        match name {
            "script" if block.has("setup") => {
                if sfc.script_setup.replace(block).is_some() {
                    return Err(error(src, open, "more than one <script setup> block"));
                }
            }
            "script" => {
                if block.has("src") {
                    return Err(error(src, open, "external <script src> is not supported"));
                }
                if sfc.script.replace(block).is_some() {
                    return Err(error(src, open, "more than one <script> block"));
                }
            }
            "template" => {
                if sfc.template.replace(block).is_some() {
                    return Err(error(src, open, "more than one <template> block"));
                }
            }
            "style" => sfc.styles.push(block),
            // custom blocks are ignored
            _ => {}
        }
        pos = after;
    }

    Ok(sfc)
}

fn error(src: &str, at: usize, message: &str) -> LexError {
    LexError {
        line: line_at(src, at),
        message: message.to_string(),
    }
}

fn line_at(src: &str, at: usize) -> usize {
    src[..at].bytes().filter(|b| *b == b'\n').count() + 1
}

/// Attributes of an opening tag; returns them with the index after `>`.
fn parse_attrs(src: &str, mut i: usize) -> Result<(BTreeMap<String, String>, usize, bool), LexError> {
    let bytes = src.as_bytes();
    let mut attrs = BTreeMap::new();
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i) {
            None => return Err(error(src, i, "unterminated tag")),
            Some(b'>') => return Ok((attrs, i + 1, false)),
            Some(b'/') if bytes.get(i + 1) == Some(&b'>') => return Ok((attrs, i + 2, true)),
            _ => {}
        }

        let start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && !matches!(bytes[i], b'=' | b'>' | b'/') {
            i += 1;
        }
        let key = src[start..i].to_string();
        if key.is_empty() {
            i += 1;
            continue;
        }

        let mut value = String::new();
        if bytes.get(i) == Some(&b'=') {
            i += 1;
            match bytes.get(i) {
                Some(q @ (b'"' | b'\'')) => {
                    let close = src[i + 1..]
                        .find(*q as char)
                        .ok_or_else(|| error(src, i, "unterminated attribute value"))?;
                    value = src[i + 1..i + 1 + close].to_string();
                    i += close + 2;
                }
                _ => {
                    let vstart = i;
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                    value = src[vstart..i].to_string();
                }
            }
        }
        attrs.insert(key, value);
    }
}

/// End of a block's content and the index after its closing tag.
///
/// `<template>` blocks nest; other blocks end at the first closing tag.
fn find_close(src: &str, from: usize, name: &str) -> Option<(usize, usize)> {
    let open_tag = format!("<{}", name);
    let close_tag = format!("</{}", name);
    let nests = name == "template";
    let mut depth = 0usize;
    let mut i = from;

    loop {
        let next_close = src[i..].find(&close_tag).map(|o| i + o)?;
        if nests {
            if let Some(next_open) = src[i..next_close].find(&open_tag).map(|o| i + o) {
                let boundary = src.as_bytes().get(next_open + open_tag.len()).copied();
                if matches!(boundary, Some(b'>' | b' ' | b'\n' | b'\t' | b'\r' | b'/')) {
                    depth += 1;
                }
                i = next_open + open_tag.len();
                continue;
            }
        }
        let tag_end = src[next_close..].find('>').map(|o| next_close + o + 1)?;
        if depth == 0 {
            return Some((next_close, tag_end));
        }
        depth -= 1;
        i = tag_end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPONENT: &str = r#"<template>
  <div class="map">
    <template v-if="ready"><slot /></template>
  </div>
</template>

<script lang="ts">
import { defineComponent } from "vue";
export default defineComponent({ name: "LMap" });
</script>

<!-- <style>ignored</style> -->
<style scoped>
.map { height: 100%; }
</style>
"#;

    #[test]
    fn splits_blocks() {
        let sfc = split(COMPONENT).unwrap();

        let template = sfc.template.unwrap();
        assert!(template.content.contains(r#"<template v-if="ready"><slot /></template>"#));
        assert!(template.content.trim_end().ends_with("</div>"));

        let script = sfc.script.unwrap();
        assert_eq!(script.lang(), Some("ts"));
        assert_eq!(script.line, 7);
        assert!(script.content.contains("defineComponent({ name: \"LMap\" })"));

        assert_eq!(sfc.styles.len(), 1);
        assert!(sfc.styles[0].has("scoped"));
        assert!(sfc.styles[0].content.contains(".map"));
        assert!(sfc.script_setup.is_none());
    }

    #[test]
    fn script_setup_is_kept_apart() {
        let sfc = split("<script setup lang='ts'>const a = 1</script>").unwrap();
        assert!(sfc.script.is_none());
        assert_eq!(sfc.script_setup.unwrap().content, "const a = 1");
    }

    #[test]
    fn unclosed_block_is_an_error() {
        let err = split("<template>\n<div>").unwrap_err();
        assert!(err.message.contains("<template>"));
    }

    #[test]
    fn duplicate_script_is_an_error() {
        assert!(split("<script>a</script><script>b</script>").is_err());
    }
}
