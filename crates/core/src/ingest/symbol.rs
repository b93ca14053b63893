use anyhow::ensure;

const MAX_SYMBOL_LEN: usize = 15;

/// Trims and upper-cases a user-entered ticker, rejecting anything that could
/// not be a listing symbol (and would otherwise end up in a URL path).
pub fn normalize_symbol(input: &str) -> anyhow::Result<String> {
    let symbol = input.trim().to_ascii_uppercase();
    ensure!(!symbol.is_empty(), "ticker symbol must be non-empty");
    ensure!(
        symbol.len() <= MAX_SYMBOL_LEN,
        "ticker symbol is too long (max {MAX_SYMBOL_LEN} characters)"
    );
    ensure!(
        symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=')),
        "ticker symbol contains invalid characters: {symbol:?}"
    );
    ensure!(
        symbol.chars().any(|c| c.is_ascii_alphanumeric()),
        "ticker symbol must contain a letter or digit: {symbol:?}"
    );
    Ok(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uppercases_and_trims() {
        assert_eq!(normalize_symbol("  aapl ").unwrap(), "AAPL");
        assert_eq!(normalize_symbol("brk-b").unwrap(), "BRK-B");
        assert_eq!(normalize_symbol("^gspc").unwrap(), "^GSPC");
        assert_eq!(normalize_symbol("005930.ks").unwrap(), "005930.KS");
    }

    #[test]
    fn rejects_empty_and_path_like_input() {
        assert!(normalize_symbol("   ").is_err());
        assert!(normalize_symbol("../etc").is_err());
        assert!(normalize_symbol("AAPL MSFT").is_err());
        assert!(normalize_symbol("ABCDEFGHIJKLMNOP").is_err());
    }

    #[test]
    fn rejects_symbols_without_alphanumerics() {
        assert!(normalize_symbol(".").is_err());
        assert!(normalize_symbol("..").is_err());
        assert!(normalize_symbol(" ^-= ").is_err());
        assert_eq!(normalize_symbol("^n225").unwrap(), "^N225");
    }
}
