//! Splitting one input line into a command name and its arguments.

/// A parsed, not yet bound, input line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandLine {
    pub command: String,
    /// `label=value` tokens in input order; labels are lowercased.
    pub named: Vec<(String, String)>,
    pub positional: Vec<String>,
}

impl CommandLine {
    /// Returns `None` for blank input.
    ///
    /// A token is named when it contains `=` after at least one character;
    /// the value is everything after the first `=`, kept verbatim and possibly
    /// empty. Any other token is positional.
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let command = tokens.next()?.to_lowercase();
        let mut named = Vec::new();
        let mut positional = Vec::new();
        for token in tokens {
            match token.split_once('=') {
                Some((label, value)) if !label.is_empty() => {
                    named.push((label.to_lowercase(), value.to_string()));
                }
                _ => positional.push(token.to_string()),
            }
        }
        Some(Self {
            command,
            named,
            positional,
        })
    }
}
