//! Module: transform
//! Responsibility: rewrites applied to a parsed filter tree before it is
//! compiled or matched.
//! Does not own: parsing, resolution or typing of the rewritten tree.
//! Boundary: transformers run in registration order, once per filter.

use qlfilter_core::{ast::FilterNode, error::FilterError};
use std::collections::BTreeMap;

// ============================================================================
// NodeTransformer
// ============================================================================

/// A rewrite of the whole filter tree.
pub trait NodeTransformer: Send + Sync {
    fn transform(&self, node: FilterNode) -> Result<FilterNode, FilterError>;
}

/// Apply `transform` to every argument of every comparison in `node`.
pub fn map_arguments<F>(node: FilterNode, transform: &mut F) -> Result<FilterNode, FilterError>
where
    F: FnMut(&str, String) -> Result<String, FilterError>,
{
    match node {
        FilterNode::And(children) => Ok(FilterNode::And(
            children
                .into_iter()
                .map(|child| map_arguments(child, &mut *transform))
                .collect::<Result<_, _>>()?,
        )),
        FilterNode::Or(children) => Ok(FilterNode::Or(
            children
                .into_iter()
                .map(|child| map_arguments(child, &mut *transform))
                .collect::<Result<_, _>>()?,
        )),
        FilterNode::Compare {
            selector,
            operator,
            arguments,
        } => {
            let arguments = arguments
                .into_iter()
                .map(|argument| transform(&selector, argument))
                .collect::<Result<_, _>>()?;

            Ok(FilterNode::Compare {
                selector,
                operator,
                arguments,
            })
        }
    }
}

// ============================================================================
// VirtualPropertyTransformer
// ============================================================================

///
/// VirtualPropertyTransformer
///
/// Expands `${NAME}` placeholders in argument values from a fixed table.
/// Names match case-insensitively. `$${NAME}` stands for the literal text
/// `${NAME}`; unknown names and unterminated placeholders are kept verbatim.
///

#[derive(Clone, Debug, Default)]
pub struct VirtualPropertyTransformer {
    properties: BTreeMap<String, String>,
}

impl VirtualPropertyTransformer {
    #[must_use]
    pub fn new<K, V>(properties: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            properties: properties
                .into_iter()
                .map(|(name, value)| (name.as_ref().to_ascii_uppercase(), value.into()))
                .collect(),
        }
    }

    #[must_use]
    pub fn with_property(mut self, name: &str, value: impl Into<String>) -> Self {
        self.properties.insert(name.to_ascii_uppercase(), value.into());
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.properties
            .get(&name.to_ascii_uppercase())
            .map(String::as_str)
    }

    /// Expand every placeholder in `input`.
    #[must_use]
    pub fn expand(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(start) = rest.find('$') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];

            if let Some(after) = tail.strip_prefix("$${") {
                out.push_str("${");
                rest = after;
                continue;
            }

            if let Some(body) = tail.strip_prefix("${")
                && let Some(end) = body.find('}')
            {
                let name = &body[..end];
                match self.lookup(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &body[end + 1..];
                continue;
            }

            out.push('$');
            rest = &tail[1..];
        }
        out.push_str(rest);

        out
    }
}

impl NodeTransformer for VirtualPropertyTransformer {
    fn transform(&self, node: FilterNode) -> Result<FilterNode, FilterError> {
        map_arguments(node, &mut |selector, argument| {
            if !argument.contains("${") {
                return Ok(argument);
            }
            let expanded = self.expand(&argument);
            tracing::trace!(
                selector,
                from = %argument,
                to = %expanded,
                "expanded virtual properties"
            );

            Ok(expanded)
        })
    }
}
