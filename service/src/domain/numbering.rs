//! Human-readable document numbering.
//!
//! Projects get a `PRJ-YYYYMMDD-NNNN` code derived from the creation time.
//! Quotes and invoices are numbered sequentially inside a calendar month:
//! `COT-YYYYMM-NNNN` and `FAC-YYYYMM-NNNN` respectively.

use common::{DateTimeOf, YearMonth};
use derive_more::{Display, From, Into};
use xxhash_rust::xxh3::xxh3_64;

/// Kind of a sequentially numbered document.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Document {
    /// Quote, prefixed with `COT`.
    Quote,

    /// Invoice, prefixed with `FAC`.
    Invoice,
}

impl Document {
    /// Returns the number prefix of this [`Document`] kind.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Quote => "COT",
            Self::Invoice => "FAC",
        }
    }
}

/// Monthly series of [`Document`] numbers.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Series {
    /// [`Document`] kind numbered by this [`Series`].
    pub document: Document,

    /// Calendar month of this [`Series`].
    pub month: YearMonth,
}

impl Series {
    /// Creates a new [`Series`] of the provided [`Document`] kind for the
    /// month the provided moment belongs to.
    #[must_use]
    pub fn of<Of: ?Sized>(document: Document, at: DateTimeOf<Of>) -> Self {
        Self {
            document,
            month: at.year_month(),
        }
    }

    /// Returns the key of the transaction-scoped advisory lock serializing
    /// numbering inside this [`Series`].
    #[must_use]
    pub fn lock_key(&self) -> i64 {
        let hash = xxh3_64(
            format!("{}-{}", self.document.prefix(), self.month.compact())
                .as_bytes(),
        );
        i64::from_ne_bytes(hash.to_ne_bytes())
    }

    /// Formats the document number with the provided [`Sequence`].
    #[must_use]
    pub fn format(&self, seq: Sequence) -> String {
        format!(
            "{}-{}-{:04}",
            self.document.prefix(),
            self.month.compact(),
            seq.0,
        )
    }
}

/// Number of documents ever created in a [`Series`], deleted ones included.
#[derive(Clone, Copy, Debug, Default, Eq, From, Into, PartialEq)]
pub struct Issued(u32);

/// Position of a document inside its [`Series`], starting from `1`.
#[derive(Clone, Copy, Debug, Display, Eq, Ord, PartialEq, PartialOrd)]
pub struct Sequence(u32);

impl Sequence {
    /// Returns the [`Sequence`] following the provided number of already
    /// [`Issued`] documents.
    #[must_use]
    pub fn after(Issued(count): Issued) -> Self {
        Self(count.saturating_add(1))
    }
}

/// Generates a project code for a project created at the provided moment.
///
/// The trailing 4 digits are the Unix timestamp modulo `10000`, so codes
/// generated at different moments of the same day may collide.
#[must_use]
pub fn project_code<Of: ?Sized>(at: DateTimeOf<Of>) -> String {
    format!(
        "PRJ-{}-{:04}",
        at.compact_date(),
        at.unix_timestamp().rem_euclid(10_000),
    )
}

#[cfg(test)]
mod spec {
    use common::{DateTime, YearMonth};

    use super::{project_code, Document, Issued, Sequence, Series};

    fn march_2024(document: Document) -> Series {
        Series {
            document,
            month: YearMonth::new(2024, 3).unwrap(),
        }
    }

    #[test]
    fn third_quote_of_march() {
        let series = march_2024(Document::Quote);

        assert_eq!(
            series.format(Sequence::after(Issued::from(2))),
            "COT-202403-0003",
        );
    }

    #[test]
    fn invoice_numbers_increase() {
        let series = march_2024(Document::Invoice);

        let numbers = (0..12)
            .map(|n| series.format(Sequence::after(Issued::from(n))))
            .collect::<Vec<_>>();

        assert_eq!(numbers.first().map(String::as_str), Some("FAC-202403-0001"));
        assert!(numbers.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn series_of_moment() {
        let at = DateTime::parse("2024-12-31T23:59:59Z").unwrap();

        assert_eq!(
            Series::of(Document::Quote, at),
            Series {
                document: Document::Quote,
                month: YearMonth::new(2024, 12).unwrap(),
            },
        );
    }

    #[test]
    fn lock_keys_differ_by_kind_and_month() {
        let quote = march_2024(Document::Quote);
        let invoice = march_2024(Document::Invoice);
        let april = Series {
            month: YearMonth::new(2024, 4).unwrap(),
            ..quote
        };

        assert_eq!(quote.lock_key(), march_2024(Document::Quote).lock_key());
        assert_ne!(quote.lock_key(), invoice.lock_key());
        assert_ne!(quote.lock_key(), april.lock_key());
    }

    #[test]
    fn project_code_format() {
        // 1710504000 % 10000 == 4000
        let at = DateTime::from_unix_timestamp(1_710_504_000).unwrap();

        assert_eq!(project_code(at), "PRJ-20240315-4000");
    }
}
