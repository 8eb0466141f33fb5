//! Date and time utilities.

#[cfg(feature = "postgres")]
use std::error::Error as StdError;
use std::{cmp::Ordering, fmt, marker::PhantomData, ops, time::Duration};

use derive_more::{Debug, Display, Error};
#[cfg(feature = "postgres")]
use postgres_types::{
    accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql, Type,
};
use time::{
    format_description::well_known::Rfc3339, macros::format_description,
    Month, UtcOffset,
};

/// Untyped date and time.
pub type DateTime = DateTimeOf;

/// UTC date and time.
#[derive(Debug)]
pub struct DateTimeOf<Of: ?Sized = ()> {
    /// Inner representation of the date and time.
    inner: time::OffsetDateTime,

    /// Type parameter describing the kind of date and time.
    #[debug(skip)]
    _of: PhantomData<Of>,
}

impl<Of: ?Sized> DateTimeOf<Of> {
    /// A [`DateTime`] representing the Unix epoch.
    pub const UNIX_EPOCH: Self = Self {
        inner: time::OffsetDateTime::UNIX_EPOCH,
        _of: PhantomData,
    };

    /// Creates a new [`DateTime`] representing the current date and time.
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn now() -> Self {
        let inner = time::OffsetDateTime::now_utc();
        Self {
            _of: PhantomData,
            inner: inner
                .replace_microsecond(inner.microsecond())
                .expect("infallible"),
        }
    }

    /// Creates a new [`DateTime`] from the provided [`UNIX_EPOCH`] timestamp.
    ///
    /// [`None`] is returned if the timestamp is invalid.
    ///
    /// [`UNIX_EPOCH`]: Self::UNIX_EPOCH
    #[must_use]
    pub fn from_unix_timestamp(timestamp: i64) -> Option<Self> {
        Some(Self {
            inner: time::OffsetDateTime::from_unix_timestamp(timestamp).ok()?,
            _of: PhantomData,
        })
    }

    /// Returns the [`UNIX_EPOCH`] timestamp of this [`DateTime`].
    ///
    /// [`UNIX_EPOCH`]: Self::UNIX_EPOCH
    #[must_use]
    pub fn unix_timestamp(&self) -> i64 {
        self.inner.unix_timestamp()
    }

    /// Creates a new [`DateTime`] from the provided [RFC 3339] string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid [RFC 3339] date and time.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    pub fn from_rfc3339(input: &str) -> Result<Self, ParseError> {
        use ParseError as E;

        time::OffsetDateTime::parse(input, &Rfc3339)
            .map_err(E::Parse)?
            .try_into()
            .map_err(E::ComponentRange)
    }

    /// Creates a new [`DateTime`] pointing to the UTC midnight of the
    /// provided `YYYY-MM-DD` date.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid `YYYY-MM-DD` date.
    pub fn from_date(input: &str) -> Result<Self, ParseError> {
        let date =
            time::Date::parse(input, format_description!("[year]-[month]-[day]"))
                .map_err(ParseError::Parse)?;
        Ok(Self {
            inner: date.midnight().assume_utc(),
            _of: PhantomData,
        })
    }

    /// Parses a [`DateTime`] either from a [RFC 3339] string or from a
    /// `YYYY-MM-DD` date.
    ///
    /// # Errors
    ///
    /// Returns an error if the string matches neither of the formats.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        Self::from_rfc3339(input).or_else(|_| Self::from_date(input))
    }

    /// Returns the [`DateTime`] as an [RFC 3339] string.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.inner.format(&Rfc3339).unwrap_or_else(|e| {
            panic!("cannot format `DateTime` as RFC 3339: {e}")
        })
    }

    /// Returns the date of this [`DateTime`] in a `YYYYMMDD` form.
    #[must_use]
    pub fn compact_date(&self) -> String {
        format!(
            "{:04}{:02}{:02}",
            self.inner.year(),
            u8::from(self.inner.month()),
            self.inner.day(),
        )
    }

    /// Returns the [`YearMonth`] this [`DateTime`] belongs to.
    #[must_use]
    pub fn year_month(&self) -> YearMonth {
        YearMonth {
            year: self.inner.year(),
            month: self.inner.month().into(),
        }
    }

    /// Returns the midnight of the next day after this [`DateTime`].
    ///
    /// Used as an exclusive upper bound of inclusive date ranges.
    #[must_use]
    pub fn next_day(&self) -> Self {
        Self {
            inner: self.inner.replace_time(time::Time::MIDNIGHT)
                + time::Duration::DAY,
            _of: PhantomData,
        }
    }

    /// Shifts this [`DateTime`] by the provided number of calendar `months`,
    /// clamping the day to the length of the target month.
    ///
    /// [`None`] is returned if the result is out of the supported range.
    #[must_use]
    pub fn checked_add_months(&self, months: i32) -> Option<Self> {
        let ym = self.year_month().shift(months)?;
        let day = self
            .inner
            .day()
            .min(time::util::days_in_year_month(ym.year, ym.calendar_month()?));
        let date =
            time::Date::from_calendar_date(ym.year, ym.calendar_month()?, day)
                .ok()?;
        Some(Self {
            inner: self.inner.replace_date(date),
            _of: PhantomData,
        })
    }

    /// Returns the signed number of whole days from this [`DateTime`] until
    /// the `other` one.
    #[must_use]
    pub fn days_until<O: ?Sized>(&self, other: &DateTimeOf<O>) -> i64 {
        (other.inner - self.inner).whole_days()
    }

    /// Coerces one kind of [`DateTime`] into another.
    #[must_use]
    pub fn coerce<NewOf: ?Sized>(self) -> DateTimeOf<NewOf> {
        DateTimeOf {
            inner: self.inner,
            _of: PhantomData,
        }
    }
}

/// Error of parsing [`DateTime`] from a string.
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum ParseError {
    /// Failed to parse the string into an [`DateTime`].
    Parse(time::error::Parse),

    /// Parsed [`DateTime`] has an out of range component.
    ComponentRange(time::error::ComponentRange),
}

impl<Of: ?Sized> Copy for DateTimeOf<Of> {}
impl<Of: ?Sized> Clone for DateTimeOf<Of> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Of: ?Sized> Eq for DateTimeOf<Of> {}
impl<Of: ?Sized> PartialEq for DateTimeOf<Of> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<Of: ?Sized> Ord for DateTimeOf<Of> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}
impl<Of: ?Sized> PartialOrd for DateTimeOf<Of> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<Of: ?Sized> fmt::Display for DateTimeOf<Of> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl<Of: ?Sized> TryFrom<time::OffsetDateTime> for DateTimeOf<Of> {
    type Error = time::error::ComponentRange;

    fn try_from(dt: time::OffsetDateTime) -> Result<Self, Self::Error> {
        dt.to_offset(UtcOffset::UTC)
            .replace_microsecond(dt.microsecond())
            .map(|inner| Self {
                inner,
                _of: PhantomData,
            })
    }
}

impl<Of: ?Sized> From<DateTimeOf<Of>> for time::OffsetDateTime {
    fn from(dt: DateTimeOf<Of>) -> Self {
        dt.inner
    }
}

impl<Of: ?Sized> ops::Add<Duration> for DateTimeOf<Of> {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self {
            inner: self.inner + rhs,
            _of: PhantomData,
        }
    }
}

impl<Of: ?Sized> ops::Sub<Duration> for DateTimeOf<Of> {
    type Output = Self;

    fn sub(self, rhs: Duration) -> Self::Output {
        Self {
            inner: self.inner - rhs,
            _of: PhantomData,
        }
    }
}

/// Calendar month of a specific year.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct YearMonth {
    /// Year of this [`YearMonth`].
    year: i32,

    /// Month number (`1..=12`) of this [`YearMonth`].
    month: u8,
}

impl YearMonth {
    /// Creates a new [`YearMonth`] out of the provided `year` and `month`
    /// number (`1..=12`).
    #[must_use]
    pub fn new(year: i32, month: u8) -> Option<Self> {
        let m = Month::try_from(month).ok()?;
        _ = time::Date::from_calendar_date(year, m, 1).ok()?;
        Some(Self { year, month })
    }

    /// Returns the year of this [`YearMonth`].
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    /// Returns the month number (`1..=12`) of this [`YearMonth`].
    #[must_use]
    pub const fn month(self) -> u8 {
        self.month
    }

    /// Returns the [`Month`] of this [`YearMonth`].
    fn calendar_month(self) -> Option<Month> {
        Month::try_from(self.month).ok()
    }

    /// Returns this [`YearMonth`] in a `YYYYMM` form.
    #[must_use]
    pub fn compact(self) -> String {
        format!("{:04}{:02}", self.year, self.month())
    }

    /// Returns the [`YearMonth`] following this one.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        self.shift(1)
    }

    /// Returns the [`YearMonth`] preceding this one.
    #[must_use]
    pub fn prev(self) -> Option<Self> {
        self.shift(-1)
    }

    /// Shifts this [`YearMonth`] by the provided number of `months`.
    ///
    /// [`None`] is returned if the result is out of the supported range.
    #[must_use]
    pub fn shift(self, months: i32) -> Option<Self> {
        let index = self.year.checked_mul(12)?
            + i32::from(self.month()) - 1
            + months;
        let month = u8::try_from(index.rem_euclid(12) + 1).ok()?;
        Self::new(index.div_euclid(12), month)
    }

    /// Returns the UTC midnight of the first day of this [`YearMonth`].
    #[must_use]
    pub fn start<Of: ?Sized>(self) -> Option<DateTimeOf<Of>> {
        let date =
            time::Date::from_calendar_date(self.year, self.calendar_month()?, 1)
                .ok()?;
        Some(DateTimeOf {
            inner: date.midnight().assume_utc(),
            _of: PhantomData,
        })
    }

    /// Returns the `[start; end)` range of this [`YearMonth`].
    #[must_use]
    pub fn range<Of: ?Sized>(
        self,
    ) -> Option<(DateTimeOf<Of>, DateTimeOf<Of>)> {
        Some((self.start()?, self.next()?.start()?))
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month())
    }
}

#[cfg(feature = "postgres")]
impl<Of: ?Sized> FromSql<'_> for DateTimeOf<Of> {
    accepts!(TIMESTAMPTZ);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        time::OffsetDateTime::from_sql(ty, raw)?
            .try_into()
            .map_err(Box::from)
    }
}

#[cfg(feature = "postgres")]
impl<Of: ?Sized> ToSql for DateTimeOf<Of> {
    accepts!(TIMESTAMPTZ);
    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        w: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.inner.to_sql(ty, w)
    }
}

#[cfg(feature = "serde")]
pub mod serde {
    //! Module providing integration with [`serde`] crate.
    //!
    //! [`DateTimeOf`] is serialized as a [RFC 3339] string, and deserialized
    //! either from a [RFC 3339] string or from a `YYYY-MM-DD` date.
    //!
    //! [RFC 3339]: https://tools.ietf.org/html/rfc3339

    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    use super::{DateTimeOf, YearMonth};

    impl<Of: ?Sized> Serialize for DateTimeOf<Of> {
        fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
            s.serialize_str(&self.to_rfc3339())
        }
    }

    impl<'de, Of: ?Sized> Deserialize<'de> for DateTimeOf<Of> {
        fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
            let s = <std::borrow::Cow<'de, str>>::deserialize(d)?;
            Self::parse(&s).map_err(|e| {
                de::Error::custom(format!("invalid date `{s}`: {e}"))
            })
        }
    }

    impl Serialize for YearMonth {
        fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
            s.collect_str(self)
        }
    }

    pub mod unix_timestamp {
        //! Module providing serialization and deserialization of [`DateTimeOf`]
        //! as a Unix timestamp.

        use serde::{de::Error, Deserialize, Deserializer, Serializer};

        use super::DateTimeOf;

        /// Serializes the [`DateTimeOf`] as a Unix timestamp.
        ///
        /// # Errors
        ///
        /// Returns an error if the timestamp is invalid.
        pub fn serialize<Of, S>(
            dt: &DateTimeOf<Of>,
            serializer: S,
        ) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
            Of: ?Sized,
        {
            serializer.serialize_i64(dt.unix_timestamp())
        }

        /// Deserializes the Unix timestamp into a [`DateTimeOf`].
        ///
        /// # Errors
        ///
        /// Returns an error if the timestamp is invalid.
        pub fn deserialize<'de, D, Of>(
            deserializer: D,
        ) -> Result<DateTimeOf<Of>, D::Error>
        where
            D: Deserializer<'de>,
            Of: ?Sized,
        {
            DateTimeOf::from_unix_timestamp(i64::deserialize(deserializer)?)
                .ok_or_else(|| Error::custom("invalid timestamp"))
        }
    }
}

#[cfg(test)]
mod spec {
    use super::{DateTime, YearMonth};

    fn at(s: &str) -> DateTime {
        DateTime::parse(s).unwrap()
    }

    #[test]
    fn parses_dates_and_rfc3339() {
        assert_eq!(at("2024-03-15"), at("2024-03-15T00:00:00Z"));
        assert_eq!(at("2024-03-15T12:00:00+02:00"), at("2024-03-15T10:00:00Z"));

        assert!(DateTime::parse("2024-13-01").is_err());
        assert!(DateTime::parse("15/03/2024").is_err());
        assert!(DateTime::parse("").is_err());
    }

    #[test]
    fn compact_date() {
        assert_eq!(at("2024-03-05T23:59:59Z").compact_date(), "20240305");
    }

    #[test]
    fn next_day() {
        assert_eq!(at("2024-02-28T13:45:00Z").next_day(), at("2024-02-29"));
        assert_eq!(at("2024-12-31").next_day(), at("2025-01-01"));
    }

    #[test]
    fn checked_add_months() {
        assert_eq!(
            at("2024-03-31T08:00:00Z").checked_add_months(-1),
            Some(at("2024-02-29T08:00:00Z")),
        );
        assert_eq!(
            at("2024-01-15").checked_add_months(-1),
            Some(at("2023-12-15")),
        );
        assert_eq!(
            at("2024-11-30").checked_add_months(3),
            Some(at("2025-02-28")),
        );
    }

    #[test]
    fn days_until() {
        let now = at("2024-03-10T12:00:00Z");

        assert_eq!(now.days_until(&at("2024-03-20T12:00:00Z")), 10);
        assert_eq!(now.days_until(&at("2024-03-11T06:00:00Z")), 0);
        assert_eq!(now.days_until(&at("2024-03-05T12:00:00Z")), -5);
    }

    #[test]
    fn year_month() {
        let ym = at("2024-03-15T10:00:00Z").year_month();

        assert_eq!(ym, YearMonth::new(2024, 3).unwrap());
        assert_eq!(ym.to_string(), "2024-03");
        assert_eq!(ym.compact(), "202403");
        assert_eq!(ym.range::<()>(), Some((at("2024-03-01"), at("2024-04-01"))));
    }

    #[test]
    fn year_month_shift_wraps_years() {
        let jan = YearMonth::new(2024, 1).unwrap();

        assert_eq!(jan.prev(), YearMonth::new(2023, 12));
        assert_eq!(jan.shift(-11), YearMonth::new(2023, 2));
        assert_eq!(jan.shift(-13), YearMonth::new(2022, 12));
        assert_eq!(YearMonth::new(2023, 12).unwrap().next(), Some(jan));
        assert_eq!(YearMonth::new(2023, 0), None);
        assert_eq!(YearMonth::new(2023, 13), None);
    }
}
