//! Deterministic fresh-identifier generation.
//!
//! Generated names come in a fixed minimal-length-first sequence: all
//! one-character names (letters), then two-character names (letter
//! followed by letter-or-digit), and so on, lexicographically within each
//! length. Keywords are skipped. The registry keeps one cursor and one
//! reserved-name set per scope: registering a name rewinds the cursor so
//! the next request re-scans from the shortest candidate, and `reset`
//! releases a speculative reservation without consuming sequence
//! positions.

use std::collections::{HashMap, HashSet};

use molt_python_cst::is_keyword;

use crate::analysis::scope::ScopeId;

const FIRST_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const REST_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// The `index`-th name of the sequence.
fn name_at(index: u64) -> String {
    let first_len = FIRST_CHARS.len() as u64;
    let rest_len = REST_CHARS.len() as u64;

    let mut length = 1u32;
    let mut block = first_len;
    let mut base = 0u64;
    while index >= base + block {
        base += block;
        block *= rest_len;
        length += 1;
    }
    let mut offset = index - base;

    let mut out = Vec::with_capacity(length as usize);
    let mut divisor = rest_len.pow(length - 1);
    out.push(FIRST_CHARS[(offset / divisor) as usize]);
    offset %= divisor;
    for _ in 1..length {
        divisor /= rest_len;
        out.push(REST_CHARS[(offset / divisor) as usize]);
        offset %= divisor;
    }
    String::from_utf8(out).expect("alphabet is ASCII")
}

/// Per-scope fresh-name registry used by the rename and hoist passes.
#[derive(Debug, Default)]
pub struct NameRegistry {
    cursors: HashMap<ScopeId, u64>,
    registered: HashMap<ScopeId, HashSet<String>>,
}

impl NameRegistry {
    pub fn new() -> Self {
        NameRegistry::default()
    }

    /// Next candidate name for `scope`: shortest first, skipping keywords
    /// and names registered for the scope. The cursor advances past the
    /// returned candidate; call [`NameRegistry::reset`] to release it or
    /// [`NameRegistry::register_name_for_scope`] to commit it.
    pub fn generate_name_for_scope(&mut self, scope: ScopeId) -> String {
        let cursor = self.cursors.entry(scope).or_insert(0);
        let registered = self.registered.entry(scope).or_default();
        loop {
            let name = name_at(*cursor);
            *cursor += 1;
            if is_keyword(&name) || registered.contains(&name) {
                continue;
            }
            return name;
        }
    }

    /// Commit `name` for `scope` and rewind so the next candidate search
    /// starts from the shortest name again.
    pub fn register_name_for_scope(&mut self, scope: ScopeId, name: impl Into<String>) {
        self.registered.entry(scope).or_default().insert(name.into());
        self.cursors.insert(scope, 0);
    }

    /// Release a speculative candidate for `scope`.
    pub fn reset(&mut self, scope: ScopeId) {
        self.cursors.insert(scope, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCOPE: ScopeId = ScopeId(1);

    #[test]
    fn sequence_is_minimal_length_first() {
        assert_eq!(name_at(0), "a");
        assert_eq!(name_at(1), "b");
        assert_eq!(name_at(25), "z");
        assert_eq!(name_at(26), "A");
        assert_eq!(name_at(51), "Z");
        assert_eq!(name_at(52), "aa");
        assert_eq!(name_at(53), "ab");
        assert_eq!(name_at(52 + 61), "a9");
        assert_eq!(name_at(52 + 62), "ba");
        assert_eq!(name_at(52 + 52 * 62), "aaa");
    }

    #[test]
    fn generate_skips_registered_names() {
        let mut registry = NameRegistry::new();
        registry.register_name_for_scope(SCOPE, "a");
        registry.register_name_for_scope(SCOPE, "b");
        assert_eq!(registry.generate_name_for_scope(SCOPE), "c");
    }

    #[test]
    fn register_rewinds_to_shortest() {
        let mut registry = NameRegistry::new();
        // advance the cursor a few positions
        assert_eq!(registry.generate_name_for_scope(SCOPE), "a");
        assert_eq!(registry.generate_name_for_scope(SCOPE), "b");
        registry.register_name_for_scope(SCOPE, "b");
        // "a" was never committed, so it is offered again
        assert_eq!(registry.generate_name_for_scope(SCOPE), "a");
    }

    #[test]
    fn reset_releases_speculative_candidate() {
        let mut registry = NameRegistry::new();
        assert_eq!(registry.generate_name_for_scope(SCOPE), "a");
        registry.reset(SCOPE);
        assert_eq!(registry.generate_name_for_scope(SCOPE), "a");
    }

    #[test]
    fn scopes_are_independent() {
        let mut registry = NameRegistry::new();
        registry.register_name_for_scope(ScopeId(1), "a");
        assert_eq!(registry.generate_name_for_scope(ScopeId(2)), "a");
    }

    #[test]
    fn keywords_are_never_generated() {
        // index of "if" within the two-character block:
        // first char 'i' = 8, second 'f' = 5 -> 52 + 8*62 + 5
        let index = 52 + 8 * 62 + 5;
        assert_eq!(name_at(index), "if");
        let mut registry = NameRegistry::new();
        let mut cursor_name = String::new();
        for _ in 0..=index {
            cursor_name = registry.generate_name_for_scope(SCOPE);
        }
        // one extra candidate was produced somewhere to skip "if"
        assert_ne!(cursor_name, "if");
    }
}
