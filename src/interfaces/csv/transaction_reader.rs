use crate::domain::transaction::TransactionRequest;
use crate::error::{LedgerError, Result};
use std::io::Read;

/// Reads transaction requests from a CSV source.
///
/// Expected header: `account, type, amount`. Rows are only deserialized here;
/// kind and amount are validated at admission.
pub struct TransactionReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> TransactionReader<R> {
    /// Creates a new `TransactionReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes requests.
    pub fn requests(self) -> impl Iterator<Item = Result<TransactionRequest>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(LedgerError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reader_valid_stream() {
        let data = "account, type, amount\nacc-1, credit, 100.0\nacc-1, debit, 0.5";
        let reader = TransactionReader::new(data.as_bytes());
        let results: Vec<Result<TransactionRequest>> = reader.requests().collect();

        assert_eq!(results.len(), 2);
        let first = results[0].as_ref().unwrap();
        assert_eq!(first.account, "acc-1");
        assert_eq!(first.kind, "credit");
        assert_eq!(first.amount, dec!(100.0));
    }

    #[test]
    fn test_reader_keeps_unknown_kind_for_admission() {
        let data = "account, type, amount\nacc-1, refund, 1.0";
        let reader = TransactionReader::new(data.as_bytes());
        let results: Vec<Result<TransactionRequest>> = reader.requests().collect();

        assert_eq!(results[0].as_ref().unwrap().kind, "refund");
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "account, type, amount\nacc-1, credit, not_a_number";
        let reader = TransactionReader::new(data.as_bytes());
        let results: Vec<Result<TransactionRequest>> = reader.requests().collect();

        assert!(matches!(results[0], Err(LedgerError::CsvError(_))));
    }
}
