/// Discord rejects messages longer than this.
pub const MESSAGE_LIMIT: usize = 2000;

/// Renders names as inline code, one per line for short lists and
/// space-separated otherwise, split into messages that fit the limit.
pub fn format_names(heading: Option<&str>, names: &[&str]) -> Vec<String> {
    let one_per_line = names.len() <= 10;

    let mut messages = Vec::new();
    let mut current = heading.map(|h| format!("**{h}**\n")).unwrap_or_default();

    for name in names {
        let entry = if one_per_line {
            format!("`{name}`\n")
        } else {
            format!("`{name}` ")
        };
        if current.len() + entry.len() > MESSAGE_LIMIT && !current.is_empty() {
            messages.push(std::mem::take(&mut current));
        }
        current.push_str(&entry);
    }

    if !current.trim().is_empty() {
        messages.push(current);
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_short_lists_one_per_line() {
        assert_eq!(
            format_names(Some("Tags:"), &["memes", "music"]),
            vec!["**Tags:**\n`memes`\n`music`\n".to_string()]
        );
    }

    #[test]
    fn test_long_lists_are_split() {
        let names: Vec<String> = (0..500).map(|i| format!("clip_number_{i}")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();

        let messages = format_names(None, &names);
        assert!(messages.len() > 1);
        assert!(messages.iter().all(|m| m.len() <= MESSAGE_LIMIT));
        assert!(messages[0].starts_with("`clip_number_0` `clip_number_1` "));
        assert_eq!(messages.concat().matches('`').count(), 1000);
    }

    #[test]
    fn test_empty() {
        assert!(format_names(None, &[]).is_empty());
    }
}
