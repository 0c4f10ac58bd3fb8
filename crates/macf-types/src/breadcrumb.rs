//! The composite `c/s/p/t/g` address token carried on every event (spec §3.1).

use serde::{Deserialize, Serialize};

/// A parsed breadcrumb. `session_id` and `prompt_uuid` here are the short
/// (8-char) forms actually carried on the wire, not full UUIDs — minting
/// truncates before building one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub cycle: u64,
    pub session_id: String,
    pub prompt_uuid: Option<String>,
    pub timestamp: Option<i64>,
    pub git_hash: Option<String>,
}

impl Breadcrumb {
    pub fn new(cycle: u64, session_id: impl Into<String>) -> Self {
        Self {
            cycle,
            session_id: session_id.into(),
            prompt_uuid: None,
            timestamp: None,
            git_hash: None,
        }
    }

    pub fn with_prompt(mut self, prompt_uuid: impl Into<String>) -> Self {
        self.prompt_uuid = Some(prompt_uuid.into());
        self
    }

    pub fn with_timestamp(mut self, ts: i64) -> Self {
        self.timestamp = Some(ts);
        self
    }

    pub fn with_git_hash(mut self, hash: impl Into<String>) -> Self {
        self.git_hash = Some(hash.into());
        self
    }

    /// Render the canonical prefixed form: `c_{cycle}/s_{session}/p_{prompt|none}[/t_{ts}][/g_{hash}]`.
    pub fn format(&self) -> String {
        let mut parts = vec![
            format!("c_{}", self.cycle),
            format!("s_{}", self.session_id),
            format!(
                "p_{}",
                self.prompt_uuid.as_deref().unwrap_or("none")
            ),
        ];
        if let Some(ts) = self.timestamp {
            parts.push(format!("t_{ts}"));
        }
        if let Some(git) = &self.git_hash {
            parts.push(format!("g_{git}"));
        }
        parts.join("/")
    }

    /// Parse either the prefixed form above, or the legacy positional form
    /// `C{n}/{session8}/{prompt8}`. Returns `None` on any malformed input —
    /// an unparseable breadcrumb never invalidates the event it's attached to.
    pub fn parse(s: &str) -> Option<Breadcrumb> {
        let mut cycle: Option<u64> = None;
        let mut session_id: Option<String> = None;
        let mut prompt_uuid: Option<String> = None;
        let mut timestamp: Option<i64> = None;
        let mut git_hash: Option<String> = None;

        for part in s.split('/') {
            if part.is_empty() {
                continue;
            }
            if let Some((prefix, value)) = part.split_once('_') {
                match prefix {
                    "c" => cycle = value.parse().ok(),
                    "s" => session_id = Some(value.to_string()),
                    "p" => {
                        prompt_uuid = if value == "none" {
                            None
                        } else {
                            Some(value.to_string())
                        }
                    }
                    "t" => timestamp = parse_legacy_timestamp(value),
                    "g" => {
                        git_hash = if value == "none" {
                            None
                        } else {
                            Some(value.to_string())
                        }
                    }
                    _ => {
                        // Prefix we don't recognize: this is actually the legacy
                        // form colliding with an underscore inside a token
                        // (e.g. a prompt uuid segment). Fall through to legacy
                        // handling for this part.
                        legacy_part(part, &mut cycle, &mut session_id, &mut prompt_uuid);
                    }
                }
            } else {
                legacy_part(part, &mut cycle, &mut session_id, &mut prompt_uuid);
            }
        }

        Some(Breadcrumb {
            cycle: cycle?,
            session_id: session_id?,
            prompt_uuid,
            timestamp,
            git_hash,
        })
    }
}

fn legacy_part(
    part: &str,
    cycle: &mut Option<u64>,
    session_id: &mut Option<String>,
    prompt_uuid: &mut Option<String>,
) {
    if let Some(rest) = part.strip_prefix('C') {
        if let Ok(n) = rest.parse::<u64>() {
            *cycle = Some(n);
            return;
        }
    }
    if part.len() == 8 && session_id.is_none() {
        *session_id = Some(part.to_string());
        return;
    }
    if (part.len() == 7 || part.len() == 8) && prompt_uuid.is_none() {
        *prompt_uuid = Some(part.to_string());
    }
}

/// Accepts either a bare unix-epoch integer or the legacy `YYYYMMDD_HHMM` form.
fn parse_legacy_timestamp(value: &str) -> Option<i64> {
    if value.len() == 13 && value.as_bytes().get(8) == Some(&b'_') {
        let (date, time) = value.split_at(8);
        let time = &time[1..];
        let dt = chrono::NaiveDateTime::parse_from_str(
            &format!("{date}{time}"),
            "%Y%m%d%H%M",
        )
        .ok()?;
        return Some(dt.and_utc().timestamp());
    }
    value.parse().ok()
}

impl std::fmt::Display for Breadcrumb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_prefixed_form() {
        let b = Breadcrumb::parse("c_61/s_4107604e/p_ead030a5/t_1761360651/g_c3ec870").unwrap();
        assert_eq!(b.cycle, 61);
        assert_eq!(b.session_id, "4107604e");
        assert_eq!(b.prompt_uuid.as_deref(), Some("ead030a5"));
        assert_eq!(b.timestamp, Some(1761360651));
        assert_eq!(b.git_hash.as_deref(), Some("c3ec870"));
    }

    #[test]
    fn parses_minimal_form_with_none_prompt() {
        let b = Breadcrumb::parse("c_5/s_abcdefgh/p_none").unwrap();
        assert_eq!(b.cycle, 5);
        assert!(b.prompt_uuid.is_none());
    }

    #[test]
    fn parses_legacy_form() {
        let b = Breadcrumb::parse("C60/4107604e/ead030a5").unwrap();
        assert_eq!(b.cycle, 60);
        assert_eq!(b.session_id, "4107604e");
        assert_eq!(b.prompt_uuid.as_deref(), Some("ead030a5"));
    }

    #[test]
    fn unparseable_returns_none() {
        assert!(Breadcrumb::parse("not-a-breadcrumb").is_none());
        assert!(Breadcrumb::parse("").is_none());
    }

    #[test]
    fn missing_cycle_returns_none() {
        assert!(Breadcrumb::parse("s_abcdefgh/p_none").is_none());
    }

    proptest! {
        /// Invariant 2 (§8): for canonical breadcrumbs (those produced by
        /// `format`), parse(format(b)) round-trips every present field.
        #[test]
        fn roundtrip_canonical(
            cycle in 0u64..10_000,
            session_id in "[a-f0-9]{8}",
            has_prompt in any::<bool>(),
            prompt_uuid in "[a-f0-9]{8}",
            has_ts in any::<bool>(),
            ts in 0i64..2_000_000_000,
            has_git in any::<bool>(),
            git_hash in "[a-f0-9]{7}",
        ) {
            let mut b = Breadcrumb::new(cycle, session_id);
            if has_prompt {
                b = b.with_prompt(prompt_uuid);
            }
            if has_ts {
                b = b.with_timestamp(ts);
            }
            if has_git {
                b = b.with_git_hash(git_hash);
            }
            let formatted = b.format();
            let parsed = Breadcrumb::parse(&formatted).unwrap();
            prop_assert_eq!(parsed, b);
        }
    }
}
