use crate::error::LedgerError;

/// Parse a quantity typed or scanned by an operator.
///
/// Accepts a positive whole number with surrounding whitespace. Empty,
/// non-numeric, zero and negative inputs are `InvalidQuantity`.
pub fn parse_quantity(input: &str) -> Result<u64, LedgerError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::invalid_quantity("quantity is required"));
    }

    let value: i128 = trimmed
        .parse()
        .map_err(|_| LedgerError::invalid_quantity(format!("'{trimmed}' is not a whole number")))?;

    if value <= 0 {
        return Err(LedgerError::invalid_quantity("quantity must be greater than zero"));
    }

    u64::try_from(value).map_err(|_| LedgerError::invalid_quantity(format!("'{trimmed}' is too large")))
}
