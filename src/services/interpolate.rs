use indexmap::IndexMap;
use regex::Regex;
use std::borrow::Cow;

/// Named live values a running skin can substitute into command text.
pub trait ValueProducers {
    /// Current formatted value of `name`, matched case-insensitively.
    fn value_of(&self, name: &str) -> Option<String>;
}

impl ValueProducers for IndexMap<String, String> {
    fn value_of(&self, name: &str) -> Option<String> {
        self.iter()
            .find(|(key, _)| crate::utils::eq_ignore_case(key, name))
            .map(|(_, value)| value.clone())
    }
}

/// Single-pass `[name]` substitution.
///
/// Each bracketed span is handled once, left to right; a substituted value is
/// never scanned again, so values containing brackets stay literal.
pub struct VariableInterpolator {
    reference: Regex,
}

impl Default for VariableInterpolator {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableInterpolator {
    pub fn new() -> Self {
        Self {
            // Opening bracket up to the next closing bracket
            reference: Regex::new(r"\[([^\]]*)\]").expect("Invalid variable reference regex"),
        }
    }

    /// Substitute references in `text` from `producers`.
    ///
    /// - `[!...]` is a nested bang and stays as written
    /// - `[*name*]` loses its stars and is not looked up
    /// - `[name]` is replaced on a hit and left alone on a miss
    ///
    /// Without producers the text is returned unchanged.
    pub fn interpolate<'a>(
        &self,
        text: &'a str,
        producers: Option<&dyn ValueProducers>,
    ) -> Cow<'a, str> {
        let Some(producers) = producers else {
            return Cow::Borrowed(text);
        };

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        let mut changed = false;

        for caps in self.reference.captures_iter(text) {
            let (Some(span), Some(content)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let content = content.as_str();

            let replacement = if content.starts_with('!') {
                None
            } else if let Some(name) = escaped_name(content) {
                Some(format!("[{name}]"))
            } else {
                producers.value_of(content)
            };

            if let Some(replacement) = replacement {
                out.push_str(&text[last..span.start()]);
                out.push_str(&replacement);
                last = span.end();
                changed = true;
            }
        }

        if !changed {
            return Cow::Borrowed(text);
        }
        out.push_str(&text[last..]);
        Cow::Owned(out)
    }
}

/// `*name*` → `name`
fn escaped_name(content: &str) -> Option<&str> {
    if content.len() >= 2 {
        content.strip_prefix('*')?.strip_suffix('*')
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn producers(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_hit_and_miss() {
        let interpolator = VariableInterpolator::new();
        let values = producers(&[("M", "42")]);
        assert_eq!(
            interpolator.interpolate("Value is [M] and [Unknown]", Some(&values)),
            "Value is 42 and [Unknown]"
        );
    }

    #[test]
    fn test_lookup_ignores_case() {
        let interpolator = VariableInterpolator::new();
        let values = producers(&[("MeasureCpu", "7")]);
        assert_eq!(
            interpolator.interpolate("[measurecpu]%", Some(&values)),
            "7%"
        );
    }

    #[test]
    fn test_nested_bang_untouched() {
        let interpolator = VariableInterpolator::new();
        let values = producers(&[("!Show", "x")]);
        assert_eq!(
            interpolator.interpolate("!Execute [!Show]", Some(&values)),
            "!Execute [!Show]"
        );
    }

    #[test]
    fn test_escaped_reference_loses_stars() {
        let interpolator = VariableInterpolator::new();
        let values = producers(&[("M", "42")]);
        assert_eq!(
            interpolator.interpolate("[*M*] vs [M]", Some(&values)),
            "[M] vs 42"
        );
    }

    #[test]
    fn test_single_star_is_a_normal_lookup() {
        let interpolator = VariableInterpolator::new();
        let values = producers(&[("*", "star")]);
        assert_eq!(interpolator.interpolate("[*]", Some(&values)), "star");
    }

    #[test]
    fn test_substituted_value_not_rescanned() {
        let interpolator = VariableInterpolator::new();
        let values = producers(&[("A", "[B]"), ("B", "nope")]);
        assert_eq!(interpolator.interpolate("[A][B]", Some(&values)), "[B]nope");
    }

    #[test]
    fn test_no_producers_leaves_text_alone() {
        let interpolator = VariableInterpolator::new();
        assert_eq!(interpolator.interpolate("[M]", None), "[M]");
    }

    proptest! {
        #[test]
        fn prop_text_without_brackets_is_unchanged(text in "[^\\[\\]]{0,60}") {
            let interpolator = VariableInterpolator::new();
            let values = producers(&[("M", "42")]);
            prop_assert_eq!(interpolator.interpolate(&text, Some(&values)), text.as_str());
        }
    }
}
