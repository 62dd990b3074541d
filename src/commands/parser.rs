use ethers::types::U256;
use ethers::utils::{parse_units, Units};
use thiserror::Error;

/// One line of an interaction script
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Call a contract method: `[as <signer>] <method> [args...] [value=<amount>]`
    Invoke {
        signer: Option<usize>,
        method: String,
        args: Vec<String>,
        value: U256,
    },
    /// Print a signer's native balance: `balance <signer>`
    Balance { signer: usize },
    /// Visual separator: `---`
    Separator,
}

#[derive(Error, Debug, PartialEq)]
#[error("step {position} ({text:?}): {reason}")]
pub struct StepError {
    pub position: usize,
    pub text: String,
    pub reason: String,
}

/// Group read back by the default sequence.
pub const DEFAULT_GROUP_ID: &str = "0x0dc019b57f99c040692d0e0da8e4c6ad";

/// Steps run when none are given: the message count, the first message,
/// the messages of [`DEFAULT_GROUP_ID`], then both signer balances.
pub fn default_steps() -> Vec<Step> {
    let query = |method: &str, args: &[&str]| Step::Invoke {
        signer: None,
        method: method.to_string(),
        args: args.iter().map(|arg| arg.to_string()).collect(),
        value: U256::zero(),
    };

    vec![
        query("messageCount", &[]),
        Step::Separator,
        query("messages", &["0"]),
        Step::Separator,
        query("getMessagesByGroupId", &[DEFAULT_GROUP_ID]),
        Step::Separator,
        Step::Balance { signer: 0 },
        Step::Balance { signer: 1 },
    ]
}

/// Parse steps given one per item, e.g. repeated command line flags.
pub fn parse_steps<S: AsRef<str>>(items: &[S]) -> Result<Vec<Step>, StepError> {
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| parse_step(item.as_ref(), i + 1).transpose())
        .collect()
}

/// Parse a script file, one step per line. Blank lines and `#` comments
/// are skipped.
pub fn parse_script(text: &str) -> Result<Vec<Step>, StepError> {
    text.lines()
        .enumerate()
        .filter_map(|(i, line)| parse_step(line, i + 1).transpose())
        .collect()
}

/// Parse a single step. Returns `None` for blank lines and comments.
pub fn parse_step(text: &str, position: usize) -> Result<Option<Step>, StepError> {
    let error = |reason: String| StepError {
        position,
        text: text.trim().to_string(),
        reason,
    };

    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    if trimmed.len() >= 3 && trimmed.chars().all(|c| c == '-') {
        return Ok(Some(Step::Separator));
    }

    let words = split_words(trimmed).map_err(error)?;
    let mut words = words.as_slice();

    if words[0] == "balance" {
        return match words {
            [_, index] => Ok(Some(Step::Balance {
                signer: parse_signer(index).map_err(error)?,
            })),
            _ => Err(error("usage: balance <signer>".to_string())),
        };
    }

    let mut signer = None;
    if words[0] == "as" {
        match words {
            [_, index, rest @ ..] if !rest.is_empty() => {
                signer = Some(parse_signer(index).map_err(error)?);
                words = rest;
            }
            _ => return Err(error("usage: as <signer> <method> [args...]".to_string())),
        }
    }

    let method = words[0].clone();
    if !is_identifier(&method) {
        return Err(error(format!("{:?} is not a method name", method)));
    }

    let mut args = Vec::new();
    let mut value = None;
    for word in &words[1..] {
        match word.strip_prefix("value=") {
            Some(amount) => {
                if value.is_some() {
                    return Err(error("value given twice".to_string()));
                }
                value = Some(parse_value(amount).map_err(error)?);
            }
            None => args.push(word.clone()),
        }
    }

    Ok(Some(Step::Invoke {
        signer,
        method,
        args,
        value: value.unwrap_or_default(),
    }))
}

fn parse_signer(index: &str) -> Result<usize, String> {
    index
        .parse()
        .map_err(|_| format!("{:?} is not a signer index", index))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Parse an amount with an optional unit suffix (`wei`, `gwei`, `ether`).
/// A bare number is wei.
pub fn parse_value(amount: &str) -> Result<U256, String> {
    let split = amount
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(amount.len());
    let (number, unit) = amount.split_at(split);
    let unit = if unit.is_empty() { "wei" } else { unit };

    if number.is_empty() || number.starts_with('-') {
        return Err(format!("invalid amount {:?}", amount));
    }

    // Digits finer than the unit would be dropped silently
    let decimals = Units::try_from(unit)
        .map_err(|e| format!("invalid amount {:?}: {}", amount, e))?
        .as_num() as usize;
    if let Some((_, fraction)) = number.split_once('.') {
        if fraction.trim_end_matches('0').len() > decimals {
            return Err(format!(
                "invalid amount {:?}: {} allows at most {} decimal(s)",
                amount, unit, decimals
            ));
        }
    }

    parse_units(number, unit)
        .map(Into::into)
        .map_err(|e| format!("invalid amount {:?}: {}", amount, e))
}

/// Split on whitespace. Double quotes group words (`\"` escapes a quote)
/// and square brackets keep array literals together, dropping the spaces
/// inside them.
fn split_words(text: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut in_quotes = false;
    let mut depth = 0usize;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' if in_quotes => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => return Err("dangling escape".to_string()),
            },
            '"' => {
                in_quotes = !in_quotes;
                in_word = true;
                // Inside arrays the quotes belong to the element.
                if depth > 0 {
                    current.push(c);
                }
            }
            c if c.is_whitespace() && !in_quotes => {
                if depth == 0 && in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '[' if !in_quotes => {
                depth += 1;
                in_word = true;
                current.push(c);
            }
            ']' if !in_quotes => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "unbalanced ']'".to_string())?;
                current.push(c);
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }

    if in_quotes {
        return Err("unterminated quote".to_string());
    }
    if depth > 0 {
        return Err("unbalanced '['".to_string());
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
