//! # Path Templates
//!
//! Compiles a Swagger path template (`/subscriptions/{subscriptionId}/...`)
//! into segments and matches concrete request paths against it. Literal
//! segments compare case-insensitively; a parameter may sit inside a segment
//! with a literal prefix/suffix (`{name}.json`). Trailing slashes are ignored.

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param {
        prefix: String,
        name: String,
        suffix: String,
    },
}

/// A compiled path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    template: String,
    segments: Vec<Segment>,
    param_names: Vec<String>,
}

impl PathPattern {
    /// Compile a template.
    pub fn compile(template: &str) -> Self {
        let segments: Vec<Segment> = split_path(template)
            .map(|raw| match (raw.find('{'), raw.find('}')) {
                (Some(open), Some(close)) if open < close => Segment::Param {
                    prefix: raw[..open].to_string(),
                    name: raw[open + 1..close].to_string(),
                    suffix: raw[close + 1..].to_string(),
                },
                _ => Segment::Literal(raw.to_string()),
            })
            .collect();
        let param_names = segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param { name, .. } => Some(name.clone()),
                Segment::Literal(_) => None,
            })
            .collect();
        Self {
            template: template.to_string(),
            segments,
            param_names,
        }
    }

    /// The template this pattern was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Parameter names, in capture order.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Number of fully literal segments; more literals means a more specific
    /// route.
    pub fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    /// Match a concrete path, returning the raw (still percent-encoded)
    /// capture for each parameter in [`param_names`](Self::param_names) order.
    pub fn captures(&self, path: &str) -> Option<Vec<String>> {
        let parts: Vec<&str> = split_path(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut captures = Vec::with_capacity(self.param_names.len());
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) => {
                    if !literal.eq_ignore_ascii_case(part) {
                        return None;
                    }
                }
                Segment::Param { prefix, suffix, .. } => {
                    if part.len() < prefix.len() + suffix.len() {
                        return None;
                    }
                    let value_end = part.len() - suffix.len();
                    let (Some(head), Some(value), Some(tail)) = (
                        part.get(..prefix.len()),
                        part.get(prefix.len()..value_end),
                        part.get(value_end..),
                    ) else {
                        return None;
                    };
                    if !head.eq_ignore_ascii_case(prefix)
                        || !tail.eq_ignore_ascii_case(suffix)
                        || value.is_empty()
                    {
                        return None;
                    }
                    captures.push(value.to_string());
                }
            }
        }
        Some(captures)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    let trimmed = path.trim_start_matches('/').trim_end_matches('/');
    trimmed.split('/').filter(move |_| !trimmed.is_empty())
}
