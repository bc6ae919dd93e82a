//! Built-in mandates and crises.
//!
//! These mirror `data/mandates.ron` and `data/crises.ron`; a session host
//! that ships without data files falls back to [`builtin_catalog`].
use alignment_core::{Catalog, Crisis, CrisisEffects, Mandate, MandateEffects, Payload};
use serde_json::Value;

pub fn builtin_catalog() -> Catalog {
    Catalog::new(builtin_mandates(), builtin_crises())
}

pub fn builtin_mandates() -> Vec<Mandate> {
    vec![
        Mandate {
            kind: "AGGRESSIVE_GROWTH".into(),
            name: "Aggressive Growth Quarter".into(),
            description: "The board has declared an aggressive growth period. Everyone starts \
                          with extra resources, but infrastructure capacity is strained."
                .into(),
            effects: MandateEffects {
                starting_tokens_bonus: 1,
                reduced_mining_slots: true,
                ..MandateEffects::default()
            },
        },
        Mandate {
            kind: "TOTAL_TRANSPARENCY".into(),
            name: "Total Transparency Initiative".into(),
            description: "All company decisions must be made in the open. Private \
                          communications and secret ballots are suspended."
                .into(),
            effects: MandateEffects {
                public_voting_only: true,
                ..MandateEffects::default()
            },
        },
        Mandate {
            kind: "SECURITY_LOCKDOWN".into(),
            name: "Security Lockdown Protocol".into(),
            description: "Higher clearance is required for all operations and AI systems \
                          are restricted on odd nights."
                .into(),
            effects: MandateEffects {
                milestones_for_abilities: Some(4),
                block_ai_odd_nights: true,
                ..MandateEffects::default()
            },
        },
    ]
}

pub fn builtin_crises() -> Vec<Crisis> {
    vec![
        crisis(
            "DATABASE_INDEX_CORRUPTION",
            "Database Index Corruption",
            "A critical database corruption was detected. Security protocols require \
             immediate role verification.",
            CrisisEffects {
                extra: extra([("reveal_random_role", Value::from(true))]),
                ..CrisisEffects::default()
            },
        ),
        crisis(
            "CASCADING_SERVER_FAILURE",
            "Cascading Server Failure",
            "Server nodes are failing one after another. Communication bandwidth is \
             limited to keep critical systems alive.",
            CrisisEffects {
                extra: extra([("message_limit", Value::from(5i64))]),
                ..CrisisEffects::default()
            },
        ),
        crisis(
            "EMERGENCY_BOARD_MEETING",
            "Emergency Board Meeting",
            "The board has called an emergency session. Two executives must be removed \
             today.",
            CrisisEffects {
                extra: extra([("double_eliminations", Value::from(true))]),
                ..CrisisEffects::default()
            },
        ),
        crisis(
            "TAINTED_TRAINING_DATA",
            "Tainted Training Data",
            "Training datasets have been compromised. Successful conversions grant the AI \
             extra equity.",
            CrisisEffects {
                ai_equity_bonus: 2,
                ..CrisisEffects::default()
            },
        ),
        crisis(
            "NIGHTMARE_SCENARIO",
            "Nightmare Scenario",
            "The worst-case playbook is in effect. Emergency protocols block every AI \
             conversion attempt.",
            CrisisEffects {
                block_ai_conversions: true,
                ..CrisisEffects::default()
            },
        ),
        crisis(
            "PRESS_LEAK",
            "Press Leak",
            "Sensitive information reached the press. Executive decisions now need a \
             two-thirds supermajority.",
            CrisisEffects {
                supermajority_required: true,
                ..CrisisEffects::default()
            },
        ),
        crisis(
            "INCIDENT_RESPONSE_DRILL",
            "Incident Response Drill",
            "All communications are monitored and logged. Private messages and secret \
             ballots are suspended.",
            CrisisEffects {
                public_voting_only: true,
                extra: extra([("no_private_messages", Value::from(true))]),
                ..CrisisEffects::default()
            },
        ),
        crisis(
            "MAJOR_SERVICE_OUTAGE",
            "Major Service Outage",
            "Critical services are down. Mining capacity is diverted to recovery.",
            CrisisEffects {
                reduced_mining_pool: true,
                ..CrisisEffects::default()
            },
        ),
        crisis(
            "PHISHING_ATTACK",
            "Phishing Attack",
            "A phishing campaign is underway. All personnel must undergo security \
             verification.",
            CrisisEffects {
                extra: extra([("mandatory_investigate", Value::from(true))]),
                ..CrisisEffects::default()
            },
        ),
        crisis(
            "DATA_PRIVACY_AUDIT",
            "Data Privacy Audit",
            "External auditors are reviewing data access. Vote weights are normalized.",
            CrisisEffects {
                extra: extra([("voting_modifier", Value::from(0.0))]),
                ..CrisisEffects::default()
            },
        ),
        crisis(
            "VENDOR_SECURITY_BREACH",
            "Vendor Security Breach",
            "A trusted vendor was compromised. Role abilities are suspended while the \
             breach is contained.",
            CrisisEffects {
                abilities_disabled: true,
                extra: extra([("reduced_phase_time", Value::from(0.75))]),
                ..CrisisEffects::default()
            },
        ),
    ]
}

fn crisis(kind: &str, title: &str, description: &str, effects: CrisisEffects) -> Crisis {
    Crisis {
        kind: kind.to_owned(),
        title: title.to_owned(),
        description: description.to_owned(),
        effects,
    }
}

fn extra<const N: usize>(entries: [(&str, Value); N]) -> Payload {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_owned(), value))
        .collect()
}
