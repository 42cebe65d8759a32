//! Inbound classifier: splits a chat line into keyword and arguments.
//!
//! Classification is pure: it never consults the registry, the store or the
//! clock. Unknown keywords are still `Classified` here and are dropped later
//! by the registry lookup.

/// Result of classifying one inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Plain chat; forwarded to ambient capture by the caller when relevant.
    NotACommand,
    /// A prefixed command line.
    Classified(ClassifiedCommand),
}

/// A prefixed line split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedCommand {
    /// First token after the prefix, lowercased.
    pub keyword: String,
    /// Everything after the first run of whitespace. Empty when absent.
    pub args: String,
}

/// Classify a line of text.
///
/// `own_identity` is the bot's own name on the network the line came from;
/// lines it authored are never commands.
#[must_use]
pub fn classify(line: &str, sender: &str, own_identity: &str, prefix: &str) -> Classification {
    if prefix.is_empty() || sender == own_identity {
        return Classification::NotACommand;
    }
    let Some(rest) = line.strip_prefix(prefix) else {
        return Classification::NotACommand;
    };
    let rest = rest.trim();
    let (keyword, args) = match rest.split_once(char::is_whitespace) {
        Some((keyword, args)) => (keyword, args.trim_start()),
        None => (rest, ""),
    };
    if keyword.is_empty() {
        return Classification::NotACommand;
    }
    Classification::Classified(ClassifiedCommand {
        keyword: keyword.to_lowercase(),
        args: args.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classified(keyword: &str, args: &str) -> Classification {
        Classification::Classified(ClassifiedCommand {
            keyword: keyword.to_string(),
            args: args.to_string(),
        })
    }

    #[test]
    fn keyword_is_lowercased_and_args_split_on_first_whitespace() {
        assert_eq!(
            classify("!Verify  Notch extra words", "alice", "Bot", "!"),
            classified("verify", "Notch extra words")
        );
    }

    #[test]
    fn bare_keyword_has_empty_args() {
        let Classification::Classified(cmd) = classify("!ftop", "alice", "Bot", "!") else {
            panic!("expected a command");
        };
        assert_eq!(cmd.keyword, "ftop");
        assert!(cmd.args.is_empty());
    }

    #[test]
    fn whitespace_after_prefix_is_trimmed() {
        assert_eq!(classify("!  help  ", "alice", "Bot", "!"), classified("help", ""));
    }

    #[test]
    fn self_authored_lines_are_chat() {
        assert_eq!(classify("!ftop", "Bot", "Bot", "!"), Classification::NotACommand);
    }

    #[test]
    fn prefixless_and_empty_lines_are_chat() {
        assert_eq!(classify("ftop", "alice", "Bot", "!"), Classification::NotACommand);
        assert_eq!(classify("", "alice", "Bot", "!"), Classification::NotACommand);
        assert_eq!(classify("!", "alice", "Bot", "!"), Classification::NotACommand);
        assert_eq!(classify("!   ", "alice", "Bot", "!"), Classification::NotACommand);
    }

    #[test]
    fn multi_character_prefix() {
        assert_eq!(classify("bb:flist", "alice", "Bot", "bb:"), classified("flist", ""));
    }
}
