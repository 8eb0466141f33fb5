//! [`User`] read model definition.
//!
//! [`User`]: crate::domain::User

pub mod list {
    //! [`User`]s list definitions.

    use common::define_pagination;

    #[cfg(doc)]
    use crate::domain::User;
    use crate::{domain, read::Search};

    define_pagination!(domain::User, Filter);

    /// Filter for [`Selector`].
    #[derive(Clone, Debug, Default)]
    pub struct Filter {
        /// [`Search`] over email, first and last names.
        pub search: Option<Search>,

        /// Whether to select only active or only inactive [`User`]s.
        pub active: Option<bool>,
    }
}
