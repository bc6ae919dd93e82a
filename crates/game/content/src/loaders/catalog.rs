//! Mandate and crisis catalog loaders.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use alignment_core::{Crisis, CrisisEffects, Mandate, MandateEffects, Payload};
use serde::Deserialize;
use serde_json::Value;

use crate::loaders::{LoadResult, read_file};

/// Effect value that the engine does not interpret but still records on the
/// crisis or mandate (e.g. `message_limit: 5`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ExtraValue {
    Flag(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

impl From<ExtraValue> for Value {
    fn from(value: ExtraValue) -> Self {
        match value {
            ExtraValue::Flag(flag) => Value::from(flag),
            ExtraValue::Integer(n) => Value::from(n),
            ExtraValue::Number(n) => Value::from(n),
            ExtraValue::Text(text) => Value::from(text),
        }
    }
}

fn into_payload(extra: BTreeMap<String, ExtraValue>) -> Payload {
    extra
        .into_iter()
        .map(|(key, value)| (key, Value::from(value)))
        .collect()
}

fn ensure_unique<'a>(what: &str, kinds: impl IntoIterator<Item = &'a str>) -> LoadResult<()> {
    let mut seen = BTreeSet::new();
    for kind in kinds {
        if kind.is_empty() {
            anyhow::bail!("{} with an empty kind", what);
        }
        if !seen.insert(kind.to_ascii_uppercase()) {
            anyhow::bail!("Duplicate {} kind: {}", what, kind);
        }
    }
    Ok(())
}

// ============================================================================
// Mandates
// ============================================================================

#[derive(Debug, Deserialize)]
struct MandateCatalog {
    mandates: Vec<MandateSpec>,
}

#[derive(Debug, Deserialize)]
struct MandateSpec {
    kind: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    effects: MandateEffectsSpec,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MandateEffectsSpec {
    starting_tokens_bonus: u32,
    reduced_mining_slots: bool,
    public_voting_only: bool,
    milestones_for_abilities: Option<u32>,
    block_ai_odd_nights: bool,
    extra: BTreeMap<String, ExtraValue>,
}

impl From<MandateSpec> for Mandate {
    fn from(spec: MandateSpec) -> Self {
        let effects = spec.effects;
        Mandate {
            kind: spec.kind,
            name: spec.name,
            description: spec.description,
            effects: MandateEffects {
                starting_tokens_bonus: effects.starting_tokens_bonus,
                reduced_mining_slots: effects.reduced_mining_slots,
                public_voting_only: effects.public_voting_only,
                milestones_for_abilities: effects.milestones_for_abilities,
                block_ai_odd_nights: effects.block_ai_odd_nights,
                extra: into_payload(effects.extra),
            },
        }
    }
}

/// Loader for corporate mandates from RON.
pub struct MandateLoader;

impl MandateLoader {
    /// Load mandates from a RON file.
    pub fn load(path: &Path) -> LoadResult<Vec<Mandate>> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    /// Parse mandates from RON text.
    pub fn parse(content: &str) -> LoadResult<Vec<Mandate>> {
        let catalog: MandateCatalog = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse mandates RON: {}", e))?;
        ensure_unique("mandate", catalog.mandates.iter().map(|m| m.kind.as_str()))?;
        Ok(catalog.mandates.into_iter().map(Mandate::from).collect())
    }
}

// ============================================================================
// Crises
// ============================================================================

#[derive(Debug, Deserialize)]
struct CrisisCatalog {
    crises: Vec<CrisisSpec>,
}

#[derive(Debug, Deserialize)]
struct CrisisSpec {
    kind: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    effects: CrisisEffectsSpec,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CrisisEffectsSpec {
    supermajority_required: bool,
    public_voting_only: bool,
    ai_equity_bonus: u32,
    block_ai_conversions: bool,
    reduced_mining_pool: bool,
    mining_slots_modifier: i32,
    abilities_disabled: bool,
    extra: BTreeMap<String, ExtraValue>,
}

impl From<CrisisSpec> for Crisis {
    fn from(spec: CrisisSpec) -> Self {
        let effects = spec.effects;
        Crisis {
            kind: spec.kind,
            title: spec.title,
            description: spec.description,
            effects: CrisisEffects {
                supermajority_required: effects.supermajority_required,
                public_voting_only: effects.public_voting_only,
                ai_equity_bonus: effects.ai_equity_bonus,
                block_ai_conversions: effects.block_ai_conversions,
                reduced_mining_pool: effects.reduced_mining_pool,
                mining_slots_modifier: effects.mining_slots_modifier,
                abilities_disabled: effects.abilities_disabled,
                extra: into_payload(effects.extra),
            },
        }
    }
}

/// Loader for crisis definitions from RON.
pub struct CrisisLoader;

impl CrisisLoader {
    /// Load crises from a RON file.
    pub fn load(path: &Path) -> LoadResult<Vec<Crisis>> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    /// Parse crises from RON text.
    pub fn parse(content: &str) -> LoadResult<Vec<Crisis>> {
        let catalog: CrisisCatalog = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse crises RON: {}", e))?;
        ensure_unique("crisis", catalog.crises.iter().map(|c| c.kind.as_str()))?;
        Ok(catalog.crises.into_iter().map(Crisis::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mandate_effects_default_when_omitted() {
        let mandates = MandateLoader::parse(
            r#"(
                mandates: [
                    (kind: "QUIET_QUARTER", name: "Quiet Quarter"),
                    (
                        kind: "LOCKDOWN",
                        name: "Lockdown",
                        effects: (milestones_for_abilities: Some(5), block_ai_odd_nights: true),
                    ),
                ],
            )"#,
        )
        .unwrap();

        assert_eq!(mandates.len(), 2);
        assert_eq!(mandates[0].effects, MandateEffects::default());
        assert_eq!(mandates[1].effects.milestones_for_abilities, Some(5));
        assert!(mandates[1].effects.block_ai_odd_nights);
    }

    #[test]
    fn crisis_extras_keep_their_types() {
        let crises = CrisisLoader::parse(
            r#"(
                crises: [
                    (
                        kind: "SLOWDOWN",
                        title: "Slowdown",
                        effects: (
                            abilities_disabled: true,
                            extra: {"message_limit": 5, "reduced_phase_time": 0.75, "reveal": true},
                        ),
                    ),
                ],
            )"#,
        )
        .unwrap();

        let extra = &crises[0].effects.extra;
        assert!(crises[0].effects.abilities_disabled);
        assert_eq!(extra.get("message_limit"), Some(&Value::from(5i64)));
        assert_eq!(extra.get("reduced_phase_time"), Some(&Value::from(0.75)));
        assert_eq!(extra.get("reveal"), Some(&Value::from(true)));
    }

    #[test]
    fn duplicate_kinds_are_rejected() {
        let err = CrisisLoader::parse(
            r#"(crises: [(kind: "PRESS_LEAK", title: "A"), (kind: "press_leak", title: "B")])"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Duplicate crisis kind"));
    }
}
