//! # Device Name Normalizer
//!
//! Canonicalizes the many observed spellings of fabric device names so the
//! rest of the pipeline can compare devices by value. Handles separator
//! variants (`_`, whitespace), parenthesized control-card suffixes
//! (`(NCPL)`), the NCP/NCC suffix vocabulary and a small table of known
//! one-off renames.
//!
//! The normalizer is constructed once per run and injected; the
//! memoization map is the only shared mutable table in the core and its
//! writes are idempotent.

use crate::domain::DeviceId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

/// Suffix vocabulary: observed variant -> canonical form.
///
/// Ordered longest-first so a single pass can take the first match.
const SUFFIX_VOCABULARY: &[(&str, &str)] = &[
    ("NCPL", "NCP1"),
    ("NCP0", "NCP1"),
    ("NCP1", "NCP1"),
    ("NCP2", "NCP1"),
    ("NCC0", "NCC0"),
    ("NCC1", "NCC1"),
    ("NCP", "NCP1"),
    ("NCC", "NCC0"),
];

/// Known one-off renames applied after suffix normalization
const NAME_OVERRIDES: &[(&str, &str)] = &[
    ("DNAAS-SPINE-NCP1-B08", "DNAAS-SPINE-B08"),
    ("DNAAS-SPINE-NCPL-B08", "DNAAS-SPINE-B08"),
    ("DNAAS-SPINE-NCP-B08", "DNAAS-SPINE-B08"),
    ("DNAAS-SPINE-NCP1-D14", "DNAAS-SPINE-D14"),
    ("DNAAS-SPINE-NCPL-D14", "DNAAS-SPINE-D14"),
    ("DNAAS-SPINE-NCP-D14", "DNAAS-SPINE-D14"),
];

/// Persistable normalization state (raw -> canonical plus the tables)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizationMaps {
    /// Raw name -> canonical name, as learned during the run
    pub name_mappings: BTreeMap<String, String>,
    /// Canonical key -> every raw variant observed for it
    pub canonical_to_variants: BTreeMap<String, BTreeSet<String>>,
    /// Suffix vocabulary in effect
    pub suffix_mappings: BTreeMap<String, String>,
    /// Override table in effect
    pub overrides: BTreeMap<String, String>,
}

/// What normalization did during a run: every rename applied, the variant
/// groups observed, and fuzzy-match suggestions for names that matched no
/// known device.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizationReport {
    /// Raw names that changed under normalization
    pub renamed: BTreeMap<String, String>,
    /// Canonical key -> observed raw variants (only keys with > 1 variant)
    pub variant_groups: BTreeMap<String, BTreeSet<String>>,
    /// Unmatched name -> similar known names
    pub suggestions: BTreeMap<String, Vec<String>>,
}

/// Canonicalizes device names and mints [`DeviceId`]s.
pub struct DeviceNameNormalizer {
    overrides: HashMap<String, String>,
    cache: RwLock<HashMap<String, String>>,
    name_mappings: RwLock<BTreeMap<String, String>>,
    variants: RwLock<BTreeMap<String, BTreeSet<String>>>,
}

impl Default for DeviceNameNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceNameNormalizer {
    /// Create a normalizer with the built-in vocabulary and overrides
    pub fn new() -> Self {
        Self {
            overrides: NAME_OVERRIDES
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            cache: RwLock::new(HashMap::new()),
            name_mappings: RwLock::new(BTreeMap::new()),
            variants: RwLock::new(BTreeMap::new()),
        }
    }

    /// Restore a normalizer from persisted state
    pub fn from_maps(maps: &NormalizationMaps) -> Self {
        let normalizer = Self::new();
        normalizer.import_maps(maps);
        normalizer
    }

    /// Normalize a device name to its canonical display form.
    ///
    /// Unknown names pass through uppercased and separator-normalized;
    /// this never fails.
    pub fn normalize(&self, raw: &str) -> String {
        if raw.is_empty() {
            return String::new();
        }
        if let Some(hit) = self.cache.read().ok().and_then(|c| c.get(raw).cloned()) {
            return hit;
        }

        let canonical = normalize_uncached(raw, &self.overrides);
        if canonical != raw {
            tracing::debug!(raw, %canonical, "normalized device name");
        }

        self.remember(raw, &canonical);
        canonical
    }

    /// Canonical comparison key: the canonical name with all
    /// non-alphanumerics stripped and the suffix vocabulary applied to the
    /// key tail (catches variants written without separators).
    pub fn canonical_key(&self, raw: &str) -> String {
        if raw.is_empty() {
            return String::new();
        }
        let canonical = self.normalize(raw);
        let mut key: String = canonical.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
        for (suffix, target) in SUFFIX_VOCABULARY {
            if key.ends_with(suffix) {
                key.truncate(key.len() - suffix.len());
                key.push_str(target);
                break;
            }
        }
        key
    }

    /// Whether two raw names refer to the same physical device
    pub fn same_device(&self, a: &str, b: &str) -> bool {
        self.canonical_key(a) == self.canonical_key(b)
    }

    /// Chassis-level key: like [`Self::canonical_key`] but with a trailing
    /// NCC control-card designator stripped, so `…-NCC0` and `…-NCC1`
    /// address the same logical superspine chassis.
    pub fn chassis_key(&self, raw: &str) -> String {
        let mut key = self.canonical_key(raw);
        for card in ["NCC0", "NCC1"] {
            if key.ends_with(card) {
                key.truncate(key.len() - card.len());
                break;
            }
        }
        key
    }

    /// Whether two raw names address the same chassis (NCC variants equal)
    pub fn same_chassis(&self, a: &str, b: &str) -> bool {
        self.chassis_key(a) == self.chassis_key(b)
    }

    /// Mint a [`DeviceId`] for a raw name
    pub fn device_id(&self, raw: &str) -> DeviceId {
        DeviceId::from_parts(raw.to_string(), self.normalize(raw), self.canonical_key(raw))
    }

    /// Every raw variant observed so far for the device behind `raw`
    pub fn variants_by_key(&self, raw: &str) -> BTreeSet<String> {
        let key = self.canonical_key(raw);
        self.variants
            .read()
            .ok()
            .and_then(|v| v.get(&key).cloned())
            .unwrap_or_default()
    }

    /// Devices already seen whose canonical names resemble `raw`.
    ///
    /// Used by the coverage report to suggest fixes for unmatched names.
    pub fn find_similar_devices(&self, raw: &str, threshold: f64) -> Vec<String> {
        let target = self.normalize(raw);
        let target_key = self.canonical_key(raw);
        let known = match self.name_mappings.read() {
            Ok(m) => m.clone(),
            Err(_) => return Vec::new(),
        };
        let mut similar: Vec<String> = known
            .into_iter()
            .filter(|(other_raw, canonical)| {
                self.canonical_key(other_raw) != target_key
                    && similarity_ratio(&target, canonical) >= threshold
            })
            .map(|(other_raw, _)| other_raw)
            .collect();
        similar.sort();
        similar.dedup();
        similar
    }

    /// Summarize what normalization did, suggesting fixes for names that
    /// matched nothing in the topology.
    pub fn report(&self, unmatched: &[String]) -> NormalizationReport {
        let renamed = self
            .name_mappings
            .read()
            .map(|m| {
                m.iter()
                    .filter(|(raw, canonical)| raw != canonical)
                    .map(|(raw, canonical)| (raw.clone(), canonical.clone()))
                    .collect()
            })
            .unwrap_or_default();
        let variant_groups = self
            .variants
            .read()
            .map(|v| {
                v.iter()
                    .filter(|(_, set)| set.len() > 1)
                    .map(|(key, set)| (key.clone(), set.clone()))
                    .collect()
            })
            .unwrap_or_default();
        let suggestions = unmatched
            .iter()
            .map(|name| (name.clone(), self.find_similar_devices(name, 0.8)))
            .collect();
        NormalizationReport {
            renamed,
            variant_groups,
            suggestions,
        }
    }

    /// Export the learned mappings for persistence
    pub fn export_maps(&self) -> NormalizationMaps {
        NormalizationMaps {
            name_mappings: self.name_mappings.read().map(|m| m.clone()).unwrap_or_default(),
            canonical_to_variants: self.variants.read().map(|v| v.clone()).unwrap_or_default(),
            suffix_mappings: SUFFIX_VOCABULARY
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            overrides: self
                .overrides
                .iter()
                .map(|(from, to)| (from.clone(), to.clone()))
                .collect(),
        }
    }

    /// Merge persisted mappings into this normalizer
    pub fn import_maps(&self, maps: &NormalizationMaps) {
        if let Ok(mut cache) = self.cache.write() {
            for (raw, canonical) in &maps.name_mappings {
                cache.insert(raw.clone(), canonical.clone());
            }
        }
        if let Ok(mut mappings) = self.name_mappings.write() {
            for (raw, canonical) in &maps.name_mappings {
                mappings.insert(raw.clone(), canonical.clone());
            }
        }
        if let Ok(mut variants) = self.variants.write() {
            for (key, set) in &maps.canonical_to_variants {
                variants.entry(key.clone()).or_default().extend(set.iter().cloned());
            }
        }
    }

    fn remember(&self, raw: &str, canonical: &str) {
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(raw.to_string(), canonical.to_string());
        }
        if let Ok(mut mappings) = self.name_mappings.write() {
            mappings.insert(raw.to_string(), canonical.to_string());
        }
        // The variants index is keyed by canonical key; compute it without
        // re-entering normalize to keep the lock order flat.
        let mut key: String = canonical.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
        for (suffix, target) in SUFFIX_VOCABULARY {
            if key.ends_with(suffix) {
                key.truncate(key.len() - suffix.len());
                key.push_str(target);
                break;
            }
        }
        if let Ok(mut variants) = self.variants.write() {
            variants.entry(key).or_default().insert(raw.to_string());
        }
    }
}

fn normalize_uncached(raw: &str, overrides: &HashMap<String, String>) -> String {
    // Uppercase and unify separators
    let upper = raw.trim().to_ascii_uppercase();
    let mut cleaned = String::with_capacity(upper.len());
    let mut last_was_sep = false;
    for c in upper.chars() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !last_was_sep && !cleaned.is_empty() {
                cleaned.push('-');
            }
            last_was_sep = true;
        } else {
            cleaned.push(c);
            last_was_sep = false;
        }
    }
    while cleaned.ends_with('-') {
        cleaned.pop();
    }

    // Re-emit a parenthesized suffix as a hyphenated one: `X-(NCPL)` or
    // `X(NCPL)` -> `X-NCPL` (vocabulary applied below)
    if let Some(open) = cleaned.rfind('(') {
        if cleaned.ends_with(')') {
            let suffix: String = cleaned[open + 1..cleaned.len() - 1]
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect();
            let mut base = cleaned[..open].trim_end_matches('-').to_string();
            if !suffix.is_empty() {
                base.push('-');
                base.push_str(&suffix);
            }
            cleaned = base;
        }
    }
    // Drop any stray non-name characters that survived
    cleaned.retain(|c| c.is_ascii_alphanumeric() || c == '-');
    while cleaned.contains("--") {
        cleaned = cleaned.replace("--", "-");
    }

    // Normalize the final name segment through the suffix vocabulary
    if let Some(pos) = cleaned.rfind('-') {
        let segment = &cleaned[pos + 1..];
        if let Some((_, target)) = SUFFIX_VOCABULARY.iter().find(|(from, _)| from == &segment) {
            cleaned = format!("{}-{}", &cleaned[..pos], target);
        }
    }

    // Known one-off renames
    if let Some(fixed) = overrides.get(&cleaned) {
        return fixed.clone();
    }
    cleaned
}

/// Similarity in [0,1] between two names (1 = equal), based on edit
/// distance over the longer name.
fn similarity_ratio(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - (levenshtein(a, b) as f64) / (longest as f64)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut prev, &mut current);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators_unify() {
        let n = DeviceNameNormalizer::new();
        assert_eq!(n.normalize("dnaas_leaf_b06"), "DNAAS-LEAF-B06");
        assert_eq!(n.normalize("DNAAS LEAF B06"), "DNAAS-LEAF-B06");
        assert_eq!(n.normalize("DNAAS--LEAF--B06"), "DNAAS-LEAF-B06");
    }

    #[test]
    fn parenthesized_suffix_rewrites() {
        let n = DeviceNameNormalizer::new();
        assert_eq!(n.normalize("DNAAS-LEAF-B06-2 (NCPL)"), "DNAAS-LEAF-B06-2-NCP1");
        assert_eq!(n.normalize("DNAAS-LEAF-B06-2(NCPL)"), "DNAAS-LEAF-B06-2-NCP1");
    }

    #[test]
    fn suffix_vocabulary_applies() {
        let n = DeviceNameNormalizer::new();
        assert_eq!(n.normalize("DNAAS-LEAF-B06-2-NCP"), "DNAAS-LEAF-B06-2-NCP1");
        assert_eq!(n.normalize("DNAAS-LEAF-B06-2-NCP0"), "DNAAS-LEAF-B06-2-NCP1");
        assert_eq!(n.normalize("DNAAS-SUPERSPINE-D04-NCC"), "DNAAS-SUPERSPINE-D04-NCC0");
        assert_eq!(n.normalize("DNAAS-SUPERSPINE-D04-NCC1"), "DNAAS-SUPERSPINE-D04-NCC1");
    }

    #[test]
    fn override_table_applies() {
        let n = DeviceNameNormalizer::new();
        assert_eq!(n.normalize("DNAAS-SPINE-NCP1-B08"), "DNAAS-SPINE-B08");
        assert_eq!(n.normalize("dnaas_spine_ncpl_d14"), "DNAAS-SPINE-D14");
    }

    #[test]
    fn same_device_across_variants() {
        let n = DeviceNameNormalizer::new();
        assert!(n.same_device("DNAAS-LEAF-B06-2 (NCPL)", "dnaas_leaf_b06_2_ncp1"));
        assert!(n.same_device("DNAAS-SPINE-NCP1-B08", "DNAAS-SPINE-B08"));
        assert!(!n.same_device("DNAAS-LEAF-B06", "DNAAS-LEAF-B07"));
    }

    #[test]
    fn key_catches_unseparated_suffix() {
        let n = DeviceNameNormalizer::new();
        assert_eq!(
            n.canonical_key("DNAAS-LEAF-B06-2NCPL"),
            n.canonical_key("DNAAS-LEAF-B06-2-NCP1")
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let n = DeviceNameNormalizer::new();
        for raw in [
            "DNAAS-LEAF-B06-2 (NCPL)",
            "dnaas_spine_ncp_b08",
            "DNAAS-SUPERSPINE-D04-NCC",
            "weird device 42",
        ] {
            let once = n.normalize(raw);
            assert_eq!(n.normalize(&once), once);
            assert_eq!(n.canonical_key(&once), n.canonical_key(raw));
        }
    }

    #[test]
    fn unknown_names_pass_through() {
        let n = DeviceNameNormalizer::new();
        assert_eq!(n.normalize("core router 9"), "CORE-ROUTER-9");
        assert_eq!(n.normalize(""), "");
    }

    #[test]
    fn variants_index_accumulates() {
        let n = DeviceNameNormalizer::new();
        n.normalize("DNAAS-LEAF-B06-2 (NCPL)");
        n.normalize("dnaas_leaf_b06_2_ncp1");
        let variants = n.variants_by_key("DNAAS-LEAF-B06-2-NCP1");
        assert!(variants.contains("DNAAS-LEAF-B06-2 (NCPL)"));
        assert!(variants.contains("dnaas_leaf_b06_2_ncp1"));
    }

    #[test]
    fn export_import_round_trip() {
        let n = DeviceNameNormalizer::new();
        n.normalize("DNAAS-SPINE-NCP1-B08");
        let maps = n.export_maps();
        let restored = DeviceNameNormalizer::from_maps(&maps);
        assert_eq!(restored.normalize("DNAAS-SPINE-NCP1-B08"), "DNAAS-SPINE-B08");
        assert!(!restored.variants_by_key("DNAAS-SPINE-B08").is_empty());
    }

    #[test]
    fn similar_devices_suggested() {
        let n = DeviceNameNormalizer::new();
        n.normalize("DNAAS-LEAF-B14");
        n.normalize("DNAAS-LEAF-B15");
        let similar = n.find_similar_devices("DNAAS-LEAF-B16", 0.8);
        assert!(similar.contains(&"DNAAS-LEAF-B14".to_string()));
    }
}
