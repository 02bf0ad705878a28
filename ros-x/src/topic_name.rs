//! Topic and service name validation and qualification.

/// Errors that can occur during name qualification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicNameError {
    /// Name is empty
    Empty,
    /// Name ends with a forward slash
    EndsWithSlash,
    /// Name contains an invalid component
    InvalidCharacters(String),
    /// Node name is invalid
    InvalidNodeName(String),
}

impl std::fmt::Display for TopicNameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "name is empty"),
            Self::EndsWithSlash => write!(f, "name ends with forward slash"),
            Self::InvalidCharacters(s) => write!(f, "invalid component '{}'", s),
            Self::InvalidNodeName(s) => write!(f, "invalid node name '{}'", s),
        }
    }
}

impl std::error::Error for TopicNameError {}

/// Components must start with a letter or underscore, followed by
/// alphanumerics or underscores.
fn is_valid_component(component: &str) -> bool {
    let bytes = component.as_bytes();
    match bytes.first() {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => bytes[1..]
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || b == b'_'),
        _ => false,
    }
}

pub fn validate_node_name(node_name: &str) -> Result<(), TopicNameError> {
    if node_name.is_empty() {
        return Err(TopicNameError::InvalidNodeName("<empty>".to_string()));
    }
    if !is_valid_component(node_name) {
        return Err(TopicNameError::InvalidNodeName(node_name.to_string()));
    }
    Ok(())
}

fn validate_path(path: &str) -> Result<(), TopicNameError> {
    for part in path.split('/') {
        if part.is_empty() {
            continue; // leading slash produces an empty first component
        }
        if !is_valid_component(part) {
            return Err(TopicNameError::InvalidCharacters(part.to_string()));
        }
    }
    Ok(())
}

/// Qualify a topic name against a node's namespace and name.
///
/// - absolute names (`/...`) are kept as-is
/// - private names (`~...`) expand under `/<namespace>/<node_name>`
/// - relative names expand under `/<namespace>`
pub fn qualify_topic_name(
    topic: &str,
    namespace: &str,
    node_name: &str,
) -> Result<String, TopicNameError> {
    if topic.is_empty() {
        return Err(TopicNameError::Empty);
    }
    if topic.ends_with('/') {
        return Err(TopicNameError::EndsWithSlash);
    }
    let namespace = namespace.trim_end_matches('/');

    let qualified = if let Some(absolute) = topic.strip_prefix('/') {
        validate_path(absolute)?;
        topic.to_string()
    } else if let Some(private) = topic.strip_prefix('~') {
        let private = private.strip_prefix('/').unwrap_or(private);
        validate_path(private)?;
        format!("{namespace}/{node_name}/{private}")
    } else {
        validate_path(topic)?;
        format!("{namespace}/{topic}")
    };

    // Namespaces may be empty; re-root the result in that case.
    if qualified.starts_with('/') {
        Ok(qualified)
    } else {
        Ok(format!("/{qualified}"))
    }
}

/// Service names follow the same qualification rules as topic names.
pub fn qualify_service_name(
    service: &str,
    namespace: &str,
    node_name: &str,
) -> Result<String, TopicNameError> {
    qualify_topic_name(service, namespace, node_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_names_kept() {
        assert_eq!(qualify_topic_name("/chatter", "/ns", "n").unwrap(), "/chatter");
    }

    #[test]
    fn relative_names_expand_under_namespace() {
        assert_eq!(qualify_topic_name("chatter", "/ns", "n").unwrap(), "/ns/chatter");
        assert_eq!(qualify_topic_name("chatter", "", "n").unwrap(), "/chatter");
    }

    #[test]
    fn private_names_expand_under_node() {
        assert_eq!(qualify_topic_name("~status", "/ns", "n").unwrap(), "/ns/n/status");
        assert_eq!(qualify_topic_name("~/status", "", "n").unwrap(), "/n/status");
    }

    #[test]
    fn invalid_names_rejected() {
        assert_eq!(qualify_topic_name("", "", "n"), Err(TopicNameError::Empty));
        assert_eq!(
            qualify_topic_name("a/", "", "n"),
            Err(TopicNameError::EndsWithSlash)
        );
        assert!(matches!(
            qualify_topic_name("9bad", "", "n"),
            Err(TopicNameError::InvalidCharacters(_))
        ));
        assert!(validate_node_name("").is_err());
        assert!(validate_node_name("my_node").is_ok());
    }
}
