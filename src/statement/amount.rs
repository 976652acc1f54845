use crate::error::AmountError;

/// Turn a matched money token into a number.
///
/// Strips the `$` and thousands commas. The sign comes only from the token
/// itself: a leading `-` (before or after the `$`), a trailing `-`, or
/// enclosing parentheses.
pub fn normalize_amount(token: &str) -> Result<f64, AmountError> {
    let mut body = token.trim();
    if body.is_empty() {
        return Err(AmountError::Empty);
    }

    let mut negative = false;
    if let Some(inner) = body.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
        negative = true;
        body = inner;
    }
    if let Some(rest) = body.strip_suffix('-') {
        negative = true;
        body = rest;
    }
    if let Some(rest) = body.strip_prefix('-') {
        negative = true;
        body = rest;
    }
    if let Some(rest) = body.strip_prefix('$') {
        body = rest;
    }
    if let Some(rest) = body.strip_prefix('-') {
        negative = true;
        body = rest;
    }

    let digits: String = body.chars().filter(|&c| c != ',').collect();
    let numeric = !digits.is_empty()
        && digits.bytes().any(|b| b.is_ascii_digit())
        && digits.bytes().all(|b| b.is_ascii_digit() || b == b'.');
    if !numeric {
        return Err(AmountError::Invalid(token.to_string()));
    }

    let value: f64 = digits
        .parse()
        .map_err(|_| AmountError::Invalid(token.to_string()))?;
    Ok(if negative { -value } else { value })
}
