//! Item source resolution.
//!
//! Items come from exactly one of two places: an explicit list, or a content
//! block that is rendered as a template and split on a delimiter. Having both
//! or neither configured is a fatal [`ConfigurationError`].

use std::collections::BTreeMap;
use std::fmt;

use minijinja::{Environment, UndefinedBehavior, context};

/// Default delimiter for splitting rendered content into items.
pub const DEFAULT_DELIMITER: &str = ",";

/// Fatal configuration problem detected before any invocation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Neither `items` nor `content` is configured.
    NoItemSource,
    /// Both `items` and `content` are configured.
    BothItemSources,
    /// `content` rendered and split to zero items.
    EmptyContent,
    /// `content` failed to render as a template.
    Template(String),
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoItemSource => {
                write!(f, "You have to use at least one. Either items or content!")
            }
            Self::BothItemSources => write!(
                f,
                "You can use only one. Either items or content but not both!"
            ),
            Self::EmptyContent => write!(f, "content did not produce any items"),
            Self::Template(msg) => write!(f, "render content template: {msg}"),
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// True when an explicit, non-empty item list is configured.
pub fn is_items_set(items: &[String]) -> bool {
    !items.is_empty()
}

/// True when a content block with anything besides whitespace is configured.
pub fn is_content_set(content: Option<&str>) -> bool {
    content.is_some_and(|c| !c.trim().is_empty())
}

/// Where the items for a run come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemSource {
    Items(Vec<String>),
    Content(String),
}

impl ItemSource {
    /// Pick the single configured source, enforcing mutual exclusivity.
    pub fn from_config(
        items: &[String],
        content: Option<&str>,
    ) -> Result<Self, ConfigurationError> {
        match (is_items_set(items), is_content_set(content)) {
            (false, false) => Err(ConfigurationError::NoItemSource),
            (true, true) => Err(ConfigurationError::BothItemSources),
            (true, false) => Ok(Self::Items(items.to_vec())),
            (false, true) => Ok(Self::Content(content.unwrap_or_default().to_string())),
        }
    }

    /// Produce the ordered item sequence.
    ///
    /// `vars` is exposed to content templates as `env`.
    pub fn items(
        &self,
        delimiter: &str,
        vars: &BTreeMap<String, String>,
    ) -> Result<Vec<String>, ConfigurationError> {
        match self {
            Self::Items(items) => Ok(items.clone()),
            Self::Content(content) => {
                let rendered = render_content(content, vars)?;
                let items = split_items(&rendered, delimiter);
                if items.is_empty() {
                    return Err(ConfigurationError::EmptyContent);
                }
                Ok(items)
            }
        }
    }
}

fn render_content(
    content: &str,
    vars: &BTreeMap<String, String>,
) -> Result<String, ConfigurationError> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.render_str(content, context! { env => vars })
        .map_err(|err| ConfigurationError::Template(err.to_string()))
}

/// Split on `delimiter`, trimming each piece and dropping empty ones.
fn split_items(rendered: &str, delimiter: &str) -> Vec<String> {
    rendered
        .split(delimiter)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn neither_source_is_rejected() {
        assert_eq!(
            ItemSource::from_config(&[], None),
            Err(ConfigurationError::NoItemSource)
        );
        assert_eq!(
            ItemSource::from_config(&[], Some("  \n ")),
            Err(ConfigurationError::NoItemSource)
        );
    }

    #[test]
    fn both_sources_are_rejected() {
        let err = ItemSource::from_config(&strings(&["a"]), Some("b,c")).unwrap_err();
        assert_eq!(err, ConfigurationError::BothItemSources);
        assert!(err.to_string().contains("not both"));
    }

    #[test]
    fn explicit_items_keep_order() {
        let source = ItemSource::from_config(&strings(&["b", "a", "c"]), None).expect("source");
        let items = source.items(DEFAULT_DELIMITER, &BTreeMap::new()).expect("items");
        assert_eq!(items, strings(&["b", "a", "c"]));
    }

    #[test]
    fn content_is_split_and_trimmed() {
        let source = ItemSource::from_config(&[], Some(" v1 ,v2,\n v3 ,, ")).expect("source");
        let items = source.items(DEFAULT_DELIMITER, &BTreeMap::new()).expect("items");
        assert_eq!(items, strings(&["v1", "v2", "v3"]));
    }

    #[test]
    fn content_honours_custom_delimiter() {
        let source = ItemSource::from_config(&[], Some("a,b;c")).expect("source");
        let items = source.items(";", &BTreeMap::new()).expect("items");
        assert_eq!(items, strings(&["a,b", "c"]));
    }

    #[test]
    fn content_is_rendered_as_template() {
        let mut vars = BTreeMap::new();
        vars.insert("JDK".to_string(), "17".to_string());
        let content = "{% for v in ['1.0', '2.0'] %}{{ v }}-jdk{{ env.JDK }},{% endfor %}";
        let source = ItemSource::from_config(&[], Some(content)).expect("source");
        let items = source.items(DEFAULT_DELIMITER, &vars).expect("items");
        assert_eq!(items, strings(&["1.0-jdk17", "2.0-jdk17"]));
    }

    #[test]
    fn undefined_template_variable_is_a_configuration_error() {
        let source = ItemSource::from_config(&[], Some("{{ env.MISSING }}")).expect("source");
        let err = source.items(DEFAULT_DELIMITER, &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ConfigurationError::Template(_)));
    }

    #[test]
    fn content_without_items_is_rejected() {
        let source = ItemSource::from_config(&[], Some(" , ,")).expect("source");
        let err = source.items(DEFAULT_DELIMITER, &BTreeMap::new()).unwrap_err();
        assert_eq!(err, ConfigurationError::EmptyContent);
    }
}
