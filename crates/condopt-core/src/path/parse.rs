use crate::{
    error::{ErrorOrigin, InternalError, QueryError},
    path::{AttributePath, PathComponent},
};

const EXPANSION_MARKER: &str = "[*]";

// Grammar: component ("." component)*, where a component is a non-empty name
// free of brackets, optionally followed by exactly "[*]".
pub(super) fn parse(input: &str) -> Result<AttributePath, InternalError> {
    let mut components = Vec::new();

    for segment in input.split('.') {
        let (name, expand) = match segment.strip_suffix(EXPANSION_MARKER) {
            Some(name) => (name, true),
            None => (segment, false),
        };

        if name.is_empty() || name.contains(['[', ']']) {
            return Err(parse_error(input));
        }

        components.push(PathComponent::new(name, expand));
    }

    Ok(AttributePath::from_components(components))
}

fn parse_error(input: &str) -> InternalError {
    InternalError::query(
        ErrorOrigin::Path,
        QueryError::AttributeParserFailed {
            input: input.to_string(),
        },
    )
}
