//! Server-side style extraction
//!
//! Pure reads over live cache entries. For any entry carrying a style
//! payload, extraction reproduces byte-identical text to what the live
//! injection path upserts for that entry, so server-rendered markup and
//! client-side hydration agree.

use crate::derive::DerivedTokens;
use crate::engine::StyleEngine;
use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;

/// Injection priority of CSS-variable blocks; sorts ahead of everything else
pub const CSS_VAR_PRIORITY: i32 = -999;

/// Extract the style payload of one entry, if it has one
///
/// Returns `(priority, theme key, style text)`; `None` for entries with
/// nothing to extract (non-CSS-variable token sets).
pub fn extract_style(entry: &DerivedTokens) -> Option<(i32, String, String)> {
    entry
        .css_vars
        .as_ref()
        .map(|block| (CSS_VAR_PRIORITY, block.key.clone(), block.text.clone()))
}

/// Assemble the document-embeddable style payload from every live entry
///
/// One block per theme key, selecting the block the live injection path
/// keeps: the already injected text when a block is live, otherwise the
/// text of the entry that would inject first (acquire order). Blocks are
/// sorted by `(priority, id)`. With `plain` set, raw style text is
/// concatenated; otherwise each block is wrapped in a `<style>` tag
/// carrying its theme key so hydration can adopt existing blocks instead of
/// re-injecting them.
pub fn extract_all(engine: &StyleEngine, plain: bool) -> String {
    let pending = engine.pending_commits();

    // Theme key -> (priority, commit-queue position, text) of the winner.
    let mut chosen: FxHashMap<String, (i32, Option<usize>, String)> = FxHashMap::default();
    engine.for_each_entry(|encoded, entry| {
        let (priority, id, text) = match extract_style(entry) {
            Some(block) => block,
            None => return,
        };
        let pos = pending.iter().position(|queued| queued == encoded);
        match chosen.entry(id) {
            Entry::Vacant(slot) => {
                slot.insert((priority, pos, text));
            }
            Entry::Occupied(mut slot) => {
                let current = slot.get();
                let earlier = match (pos, current.1) {
                    (Some(a), Some(b)) => a < b,
                    (Some(_), None) => true,
                    (None, Some(_)) => false,
                    (None, None) => text < current.2,
                };
                if earlier {
                    slot.insert((priority, pos, text));
                }
            }
        }
    });

    let mut blocks: Vec<(i32, String, String)> = chosen
        .into_iter()
        .map(|(id, (priority, _, text))| {
            // A live injected block wins outright: the document already
            // holds that exact text.
            let text = engine.injected_text(&id).unwrap_or(text);
            (priority, id, text)
        })
        .collect();
    blocks.sort();

    let mut out = String::new();
    for (priority, id, text) in blocks {
        if plain {
            out.push_str(&text);
        } else {
            out.push_str(&format!(
                "<style data-tint-key=\"{id}\" data-priority=\"{priority}\">{text}</style>"
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css_var::CssVarBlock;
    use crate::token::TokenMap;

    fn entry(css_vars: Option<CssVarBlock>) -> DerivedTokens {
        DerivedTokens {
            payload: TokenMap::new(),
            plain: TokenMap::new(),
            token_key: "k".into(),
            theme_key: css_vars
                .as_ref()
                .map(|block| block.key.clone())
                .unwrap_or_else(|| "k".into()),
            hash_id: "tint-dev-x".into(),
            css_vars,
        }
    }

    #[test]
    fn test_no_payload_extracts_none() {
        assert_eq!(extract_style(&entry(None)), None);
    }

    #[test]
    fn test_extracts_block_text_verbatim() {
        let block = CssVarBlock {
            key: "scope".into(),
            text: ".scope{--tint-a:1px;}".into(),
        };
        let extracted = extract_style(&entry(Some(block.clone()))).unwrap();
        assert_eq!(extracted, (CSS_VAR_PRIORITY, block.key, block.text));
    }
}
