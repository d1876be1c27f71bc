use std::{collections::HashMap, sync::LazyLock};

use regex::{Regex, Replacer};

// From https://dashif.org/docs/DASH-IF-IOP-v4.3.pdf:
// "For the avoidance of doubt, only %0[width]d is permitted and no other
// identifiers. The reason is that such a string replacement can be easily
// implemented without requiring a specific library."
//
// Example template: "$RepresentationID$/$Number%06d$.m4s"
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(RepresentationID|Number|Time|Bandwidth)(?:%0(\d+)d)?\$|\$\$").unwrap()
});

/// Substitutes `$Identifier$` and `$Identifier%0Nd$` tokens over the closed
/// identifier set `{RepresentationID, Number, Time, Bandwidth}`; `$$` is a
/// literal dollar. Tokens with an unknown identifier, or whose identifier has
/// no value yet, pass through unchanged so that future DASH identifiers do
/// not break URL generation.
pub struct Template<'a> {
    args: HashMap<&'a str, String>,
}

impl Template<'_> {
    pub const REPRESENTATION_ID: &'static str = "RepresentationID";
    pub const NUMBER: &'static str = "Number";
    pub const TIME: &'static str = "Time";
    pub const BANDWIDTH: &'static str = "Bandwidth";

    pub fn new() -> Self {
        Self {
            args: HashMap::with_capacity(4),
        }
    }

    pub fn insert(&mut self, key: &'static str, value: String) {
        self.args.insert(key, value);
    }

    pub fn resolve(&self, template: &str) -> String {
        TEMPLATE_REGEX
            .replace_all(template, TemplateReplacer(&self.args))
            .to_string()
    }
}

impl Default for Template<'_> {
    fn default() -> Self {
        Self::new()
    }
}

struct TemplateReplacer<'a>(&'a HashMap<&'a str, String>);

impl Replacer for TemplateReplacer<'_> {
    fn replace_append(&mut self, caps: &regex::Captures<'_>, dst: &mut String) {
        let Some(key) = caps.get(1) else {
            // the "$$" alternative
            dst.push('$');
            return;
        };
        let key = key.as_str();
        let Some(value) = self.0.get(key) else {
            dst.push_str(caps.get(0).unwrap().as_str());
            return;
        };

        // RepresentationID is substituted verbatim, never padded
        let width = if key == Template::REPRESENTATION_ID {
            None
        } else {
            caps.get(2).and_then(|m| m.as_str().parse::<usize>().ok())
        };
        match width {
            Some(width) => dst.push_str(&format!("{value:0>width$}")),
            None => dst.push_str(value.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Template;

    fn template() -> Template<'static> {
        let mut template = Template::new();
        template.insert(Template::REPRESENTATION_ID, "v1".to_string());
        template.insert(Template::NUMBER, "7".to_string());
        template.insert(Template::TIME, "3".to_string());
        template.insert(Template::BANDWIDTH, "4800000".to_string());
        template
    }

    #[test]
    fn test_plain_substitution() {
        let template = template();
        assert_eq!(template.resolve("$RepresentationID$"), "v1");
        assert_eq!(template.resolve("$Number$"), "7");
        assert_eq!(template.resolve("$Time$"), "3");
        assert_eq!(template.resolve("$Bandwidth$"), "4800000");
        assert_eq!(
            template.resolve("seg-$RepresentationID$-$Number$.m4s"),
            "seg-v1-7.m4s"
        );
    }

    #[test]
    fn test_width_padding() {
        let template = template();
        assert_eq!(
            template.resolve("seg-$RepresentationID$-$Number%05d$.m4s"),
            "seg-v1-00007.m4s"
        );
        assert_eq!(template.resolve("$Time%02d$"), "03");
        // value longer than the width is not truncated
        assert_eq!(template.resolve("$Bandwidth%02d$"), "4800000");
    }

    #[test]
    fn test_representation_id_never_padded() {
        let template = template();
        assert_eq!(template.resolve("$RepresentationID%08d$"), "v1");
    }

    #[test]
    fn test_literal_dollar() {
        let template = template();
        assert_eq!(template.resolve("price$$$Number$"), "price$7");
        assert_eq!(template.resolve("$$"), "$");
    }

    #[test]
    fn test_unknown_identifier_passes_through() {
        let template = template();
        assert_eq!(template.resolve("$Unknown$"), "$Unknown$");
        assert_eq!(template.resolve("$SubNumber%04d$"), "$SubNumber%04d$");
    }

    #[test]
    fn test_unset_identifier_passes_through() {
        let template = Template::new();
        assert_eq!(template.resolve("$Number$"), "$Number$");
    }

    #[test]
    fn test_stray_dollar_kept() {
        let template = template();
        assert_eq!(template.resolve("file$x"), "file$x");
    }
}
