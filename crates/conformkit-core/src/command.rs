//! Source command tokenization.

/// A single source command: code token plus single-letter numeric parameters.
///
/// Built once per source line and consumed immediately by the motion state
/// machine. Parameter letters are unique; a later duplicate overwrites the
/// earlier value. Order is irrelevant.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    code: String,
    params: Vec<(char, f64)>,
}

impl Command {
    /// Tokenize an argument string into letter/value pairs.
    ///
    /// Pairs whose numeric part fails to parse are dropped from the command
    /// and returned separately so the caller can report them.
    pub fn tokenize(code: &str, args: &str) -> (Self, Vec<String>) {
        let mut params: Vec<(char, f64)> = Vec::new();
        let mut invalid = Vec::new();
        for bit in args.split_whitespace() {
            let mut chars = bit.chars();
            let letter = match chars.next() {
                Some(letter) => letter,
                None => continue,
            };
            match chars.as_str().parse::<f64>() {
                Ok(value) => match params.iter_mut().find(|(l, _)| *l == letter) {
                    Some(slot) => slot.1 = value,
                    None => params.push((letter, value)),
                },
                Err(_) => invalid.push(bit.to_string()),
            }
        }
        (
            Self {
                code: code.to_string(),
                params,
            },
            invalid,
        )
    }

    /// The code token this command was built from.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Value of the parameter with the given letter, if named.
    pub fn get(&self, letter: char) -> Option<f64> {
        self.params
            .iter()
            .find(|(l, _)| *l == letter)
            .map(|(_, v)| *v)
    }

    /// All letter/value pairs in source order.
    pub fn params(&self) -> impl Iterator<Item = (char, f64)> + '_ {
        self.params.iter().copied()
    }

    /// Whether the command named no parameters at all.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_pairs() {
        let (cmd, invalid) = Command::tokenize("G1", "X10.5 Y-20 E0.1");
        assert!(invalid.is_empty());
        assert_eq!(cmd.code(), "G1");
        assert_eq!(cmd.get('X'), Some(10.5));
        assert_eq!(cmd.get('Y'), Some(-20.0));
        assert_eq!(cmd.get('E'), Some(0.1));
        assert_eq!(cmd.get('Z'), None);
    }

    #[test]
    fn test_invalid_pair_dropped() {
        let (cmd, invalid) = Command::tokenize("G1", "X1 Yabc Z2");
        assert_eq!(invalid, vec!["Yabc".to_string()]);
        assert_eq!(cmd.get('X'), Some(1.0));
        assert_eq!(cmd.get('Y'), None);
        assert_eq!(cmd.get('Z'), Some(2.0));
    }

    #[test]
    fn test_bare_letter_is_invalid() {
        let (cmd, invalid) = Command::tokenize("G1", "X");
        assert!(cmd.is_empty());
        assert_eq!(invalid, vec!["X".to_string()]);
    }

    #[test]
    fn test_duplicate_letter_overwrites() {
        let (cmd, _) = Command::tokenize("G1", "X1 X2");
        assert_eq!(cmd.get('X'), Some(2.0));
        assert_eq!(cmd.params().count(), 1);
    }

    #[test]
    fn test_empty_args() {
        let (cmd, invalid) = Command::tokenize("G28", "");
        assert!(cmd.is_empty());
        assert!(invalid.is_empty());
    }
}
