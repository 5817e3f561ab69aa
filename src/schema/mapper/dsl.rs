use super::types::{MappingRule, Presence};
use crate::schema::MapperError;

/// Parse a mapping DSL string into a vector of mapping rules
///
/// Syntax, one rule per line:
///
/// ```text
/// # comment
/// RENAME source TO target
/// MAP source TO target [WITH function] [CLEAR_IF_ABSENT]
/// ```
///
/// # Errors
///
/// Returns `MapperError::InvalidDsl` naming the offending line if:
/// - A command is unknown
/// - A RENAME or MAP rule is malformed
pub fn parse_mapping_dsl(dsl: &str) -> Result<Vec<MappingRule>, MapperError> {
    let mut rules = Vec::new();

    for (i, line) in dsl.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        match tokens.first().map(|s| s.to_uppercase()) {
            Some(cmd) => match cmd.as_str() {
                "RENAME" => {
                    if tokens.len() != 4 || tokens[2].to_uppercase() != "TO" {
                        return Err(MapperError::InvalidDsl(format!(
                            "Invalid RENAME syntax on line {}",
                            i + 1
                        )));
                    }
                    rules.push(MappingRule::new(tokens[3], tokens[1]));
                }
                "MAP" => rules.push(parse_map(&tokens, i + 1)?),
                _ => {
                    return Err(MapperError::InvalidDsl(format!(
                        "Unknown command on line {}",
                        i + 1
                    )))
                }
            },
            None => {
                return Err(MapperError::InvalidDsl(format!(
                    "Empty command on line {}",
                    i + 1
                )))
            }
        }
    }

    Ok(rules)
}

fn parse_map(tokens: &[&str], line: usize) -> Result<MappingRule, MapperError> {
    if tokens.len() < 4 || tokens[2].to_uppercase() != "TO" {
        return Err(MapperError::InvalidDsl(format!(
            "Invalid MAP syntax on line {}. Expected: MAP source TO target [WITH function] [CLEAR_IF_ABSENT]",
            line
        )));
    }
    let mut rule = MappingRule::new(tokens[3], tokens[1]);

    let mut rest = &tokens[4..];
    while let Some((keyword, tail)) = rest.split_first() {
        match keyword.to_uppercase().as_str() {
            "WITH" => {
                let function = tail.first().ok_or_else(|| {
                    MapperError::InvalidDsl(format!(
                        "Invalid MAP syntax on line {}. Expected function name after WITH",
                        line
                    ))
                })?;
                if rule.function.is_some() {
                    return Err(MapperError::InvalidDsl(format!(
                        "Invalid MAP syntax on line {}. WITH given twice",
                        line
                    )));
                }
                rule.function = Some(function.to_string());
                rest = &tail[1..];
            }
            "CLEAR_IF_ABSENT" => {
                rule.presence = Presence::ClearIfAbsent;
                rest = tail;
            }
            other => {
                return Err(MapperError::InvalidDsl(format!(
                    "Invalid MAP syntax on line {}. Unexpected token '{}'",
                    line, other
                )))
            }
        }
    }

    Ok(rule)
}

/// Render rules back into DSL text, one rule per line.
pub fn format_mapping_dsl(rules: &[MappingRule]) -> String {
    let mut out = String::new();
    for rule in rules {
        out.push_str(&format!("MAP {} TO {}", rule.source_path, rule.target_field));
        if let Some(function) = &rule.function {
            out.push_str(&format!(" WITH {}", function));
        }
        if rule.presence == Presence::ClearIfAbsent {
            out.push_str(" CLEAR_IF_ABSENT");
        }
        out.push('\n');
    }
    out
}
