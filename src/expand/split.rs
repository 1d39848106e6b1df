//! Field Splitting
//!
//! `$IFS`-driven splitting of unquoted expansion results. IFS whitespace
//! (the intersection with space/tab/newline) collapses and trims;
//! non-whitespace IFS characters are hard one-per-boundary delimiters.

pub const DEFAULT_IFS: &str = " \t\n";

pub fn split_fields(text: &str, ifs: &str) -> Vec<String> {
    if ifs.is_empty() {
        // Empty IFS: no splitting at all.
        return vec![text.to_string()];
    }
    let ws: Vec<char> = ifs.chars().filter(|c| " \t\n".contains(*c)).collect();
    let hard: Vec<char> = ifs.chars().filter(|c| !" \t\n".contains(*c)).collect();

    let mut fields: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut pending_hard = false;
    let mut started = false;

    for c in text.chars() {
        if ws.contains(&c) {
            if !current.is_empty() {
                fields.push(std::mem::take(&mut current));
                pending_hard = false;
            }
            continue;
        }
        if hard.contains(&c) {
            if !current.is_empty() {
                fields.push(std::mem::take(&mut current));
            } else if pending_hard || !started {
                // Two hard delimiters in a row, or a leading one after
                // only whitespace, yield an empty field.
                fields.push(String::new());
            }
            pending_hard = true;
            started = true;
            continue;
        }
        current.push(c);
        started = true;
        pending_hard = false;
    }
    if !current.is_empty() {
        fields.push(current);
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_whitespace_splitting() {
        assert_eq!(
            split_fields("  a\tb \n c  ", DEFAULT_IFS),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(split_fields("", DEFAULT_IFS).is_empty());
        assert!(split_fields("   ", DEFAULT_IFS).is_empty());
    }

    #[test]
    fn test_hard_delimiter() {
        assert_eq!(split_fields("a:b:c", ":"), vec!["a", "b", "c"]);
        assert_eq!(split_fields("a::c", ":"), vec!["a", "", "c"]);
        assert_eq!(split_fields(":a", ":"), vec!["", "a"]);
    }

    #[test]
    fn test_mixed_ifs() {
        assert_eq!(split_fields("a : b:c", ": "), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_ifs_keeps_whole() {
        assert_eq!(split_fields("a b c", ""), vec!["a b c"]);
    }
}
