//! Kebab-case receive endpoint naming.
//!
//! Registrations that do not name their endpoint get one derived from the
//! registration name: the type path is dropped, a well-known role suffix is
//! stripped, and the rest is kebab-cased.
//!
//! | Registration | Endpoint |
//! |--------------|----------|
//! | `SubmitOrderConsumer` | `submit-order` |
//! | `orders::OrderStateMachine` | `order` |
//! | `HTTPRequestActivity` | `http-request` |

/// Suffixes stripped before kebab-casing, longest first.
const ROLE_SUFFIXES: [&str; 4] = ["StateMachine", "Consumer", "Activity", "Saga"];

/// Formats registration names into receive endpoint names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointNameFormatter {
    prefix: Option<String>,
}

impl EndpointNameFormatter {
    /// Plain kebab-case formatter.
    #[must_use]
    pub const fn kebab_case() -> Self {
        Self { prefix: None }
    }

    /// Kebab-case formatter that prefixes every endpoint (`<prefix>-<name>`).
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        let prefix = to_kebab(&prefix.into());
        Self {
            prefix: (!prefix.is_empty()).then_some(prefix),
        }
    }

    /// Endpoint name for a registration name.
    #[must_use]
    pub fn format(&self, registration_name: &str) -> String {
        let name = to_kebab(strip_role_suffix(short_type_name(registration_name)));
        match &self.prefix {
            Some(prefix) => format!("{prefix}-{name}"),
            None => name,
        }
    }
}

fn short_type_name(name: &str) -> &str {
    let without_generics = name.split('<').next().unwrap_or(name);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
        .trim()
}

fn strip_role_suffix(name: &str) -> &str {
    ROLE_SUFFIXES
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix).filter(|rest| !rest.is_empty()))
        .unwrap_or(name)
}

fn to_kebab(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if matches!(c, '_' | '-' | ' ' | '.') {
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
            continue;
        }

        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary && !out.ends_with('-') {
                out.push('-');
            }
        }

        out.extend(c.to_lowercase());
    }

    out.trim_matches('-').to_string()
}
