//! Macros for defining kind enums.

/// Macro for defining a kind enum.
///
/// Variants are represented as `snake_case` strings everywhere: in
/// [`Display`], [`FromStr`], JSON (requires the `serde` feature of this
/// crate) and PostgreSQL `VARCHAR` columns (requires the `postgres` feature
/// of the crate invoking this macro).
///
/// # Example
///
/// ```rust,ignore
/// # use common::define_kind;
///
/// define_kind! {
///     #[doc = "Shape kind."]
///     enum Kind {
///         #[doc = "A cube"]
///         Cube,
///
///         #[doc = "A sphere"]
///         Sphere,
///     }
/// }
///
/// assert_eq!(Kind::Cube.to_string(), "cube");
/// ```
///
/// [`Display`]: std::fmt::Display
/// [`FromStr`]: std::str::FromStr
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_kind {
    (
        #[doc = $doc:literal]
        enum $name:ident {
            $(
                #[doc = $variant_doc:literal]
                $variant:ident
            ),* $(,)?
        }
    ) => {
        #[derive(
            Clone,
            Copy,
            Debug,
            $crate::private::serde::Deserialize,
            $crate::private::strum::Display,
            $crate::private::strum::EnumString,
            $crate::private::strum::IntoStaticStr,
            Eq,
            Hash,
            Ord,
            PartialEq,
            PartialOrd,
            $crate::private::serde::Serialize,
        )]
        #[doc = $doc]
        #[serde(
            crate = "::common::private::serde",
            rename_all = "snake_case",
        )]
        #[strum(
            crate = "::common::private::strum",
            serialize_all = "snake_case",
        )]
        pub enum $name {
            $(
                 #[doc = $variant_doc]
                 $variant,
            )*
        }

        impl $name {
            /// All the variants, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),*];

            /// Returns the `snake_case` representation of this value.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                self.into()
            }
        }

        #[cfg(feature = "postgres")]
        impl<'a> $crate::private::postgres_types::FromSql<'a> for $name {
            fn from_sql(
                ty: &$crate::private::postgres_types::Type,
                raw: &'a [u8],
            ) -> Result<
                $name,
                Box<dyn ::std::error::Error
                    + ::core::marker::Sync
                    + ::core::marker::Send>,
            > {
                let s = <&str as $crate::private::postgres_types::FromSql>
                    ::from_sql(ty, raw)?;
                s.parse().map_err(|_| {
                    ::std::format!(
                        "invalid `{}` value: {s}",
                        ::core::stringify!($name),
                    )
                    .into()
                })
            }

            fn accepts(ty: &$crate::private::postgres_types::Type) -> bool {
                <&str as $crate::private::postgres_types::FromSql>::accepts(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl $crate::private::postgres_types::ToSql for $name {
            $crate::private::postgres_types::to_sql_checked!();

            fn to_sql(
                &self,
                ty: &$crate::private::postgres_types::Type,
                w: &mut $crate::private::postgres_types::private::BytesMut,
            ) -> Result<
                $crate::private::postgres_types::IsNull,
                ::std::boxed::Box<
                    dyn ::std::error::Error
                        + ::core::marker::Sync
                        + ::core::marker::Send
                >,
            > {
                $crate::private::postgres_types::ToSql::to_sql(
                    &self.as_str(),
                    ty,
                    w,
                )
            }

            fn accepts(ty: &$crate::private::postgres_types::Type) -> bool {
                <&str as $crate::private::postgres_types::ToSql>::accepts(ty)
            }
        }
    };
}
