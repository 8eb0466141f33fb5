//! Recent [`Activity`] read model definition.

use common::{define_kind, DateTime};
use serde::Serialize;
use smart_default::SmartDefault;
use uuid::Uuid;

use crate::domain::{Client, Material, Project, Quote};

/// Name used for a [`Client`] which cannot be found anymore.
pub const UNKNOWN_CLIENT: &str = "unknown client";

/// Selector of the most recent entities of every [`Kind`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, SmartDefault)]
pub struct Recent {
    /// Total number of [`Activity`] entries to produce.
    #[default(10)]
    pub limit: u32,
}

impl Recent {
    /// Number of entities to select per [`Kind`] so that the merged
    /// [`Activity`] feed has enough entries to choose from.
    #[must_use]
    pub fn per_kind(&self) -> u32 {
        self.limit / 4 + 1
    }
}

define_kind! {
    #[doc = "Kind of an entity an [`Activity`] relates to."]
    enum Kind {
        #[doc = "[`Client`] activity."]
        Client,

        #[doc = "[`Project`] activity."]
        Project,

        #[doc = "[`Quote`] activity."]
        Quote,

        #[doc = "[`Material`] activity."]
        Material,
    }
}

define_kind! {
    #[doc = "Action an [`Activity`] reports."]
    enum Action {
        #[doc = "An entity has been created."]
        Created,

        #[doc = "A [`Material`] has run low on stock."]
        LowStock,
    }
}

/// Single entry of the recent activity feed.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Activity {
    /// [`Kind`] of the entity.
    #[serde(rename = "type")]
    pub kind: Kind,

    /// [`Action`] happened to the entity.
    pub action: Action,

    /// Human-readable description.
    pub description: String,

    /// [`DateTime`] when the [`Action`] happened.
    pub created_at: DateTime,

    /// ID of the entity.
    pub id: Uuid,
}

impl Activity {
    /// Creates an [`Activity`] of a [`Client`] creation.
    #[must_use]
    pub fn client_created(client: &Client) -> Self {
        Self {
            kind: Kind::Client,
            action: Action::Created,
            description: format!("New client: {}", client.name),
            created_at: client.created_at.coerce(),
            id: client.id.into(),
        }
    }

    /// Creates an [`Activity`] of a [`Project`] creation for the [`Client`]
    /// with the provided name.
    #[must_use]
    pub fn project_created(project: &Project, client: Option<&str>) -> Self {
        Self {
            kind: Kind::Project,
            action: Action::Created,
            description: format!(
                "New project: {} for {}",
                project.name,
                client.unwrap_or(UNKNOWN_CLIENT),
            ),
            created_at: project.created_at.coerce(),
            id: project.id.into(),
        }
    }

    /// Creates an [`Activity`] of a [`Quote`] creation for the [`Client`]
    /// with the provided name.
    #[must_use]
    pub fn quote_created(quote: &Quote, client: Option<&str>) -> Self {
        Self {
            kind: Kind::Quote,
            action: Action::Created,
            description: format!(
                "New quote: {} for {}",
                quote.title,
                client.unwrap_or(UNKNOWN_CLIENT),
            ),
            created_at: quote.created_at.coerce(),
            id: quote.id.into(),
        }
    }

    /// Creates an [`Activity`] of a [`Material`] being low on stock.
    ///
    /// The moment of the last [`Material`] modification is used.
    #[must_use]
    pub fn low_stock(material: &Material) -> Self {
        Self {
            kind: Kind::Material,
            action: Action::LowStock,
            description: format!(
                "Low stock: {} ({} {})",
                material.name, material.stock, material.unit,
            ),
            created_at: material.updated_at.coerce(),
            id: material.id.into(),
        }
    }
}

/// Merges the provided [`Activity`] entries into a feed, newest first,
/// truncated to the `limit`.
#[must_use]
pub fn merge(
    activities: impl IntoIterator<Item = Activity>,
    limit: u32,
) -> Vec<Activity> {
    let mut feed = activities.into_iter().collect::<Vec<_>>();
    feed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    feed.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
    feed
}

#[cfg(test)]
mod spec {
    use common::DateTime;
    use uuid::Uuid;

    use crate::domain::{material, quote};

    use super::{merge, Action, Activity, Kind, Recent};

    #[test]
    fn per_kind_share() {
        assert_eq!(Recent::default().per_kind(), 3);
        assert_eq!(Recent { limit: 1 }.per_kind(), 1);
        assert_eq!(Recent { limit: 20 }.per_kind(), 6);
    }

    #[test]
    fn merges_newest_first_and_truncates() {
        let old = quote::spec::quote(quote::Status::Draft, "1", "2024-01-01");
        let new = quote::spec::quote(quote::Status::Draft, "1", "2024-03-01");
        let mut low = material::spec::material("2", "5", "10");
        low.updated_at = DateTime::parse("2024-02-01").unwrap().coerce();

        let feed = merge(
            [
                Activity::quote_created(&old, Some("ACME")),
                Activity::low_stock(&low),
                Activity::quote_created(&new, None),
            ],
            2,
        );

        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].id, Uuid::from(new.id));
        assert_eq!(
            feed[0].description,
            "New quote: Kitchen renovation for unknown client",
        );
        assert_eq!(feed[1].kind, Kind::Material);
        assert_eq!(feed[1].action, Action::LowStock);
    }

    #[test]
    fn low_stock_description() {
        let m = material::spec::material("2.5", "5", "10");

        assert_eq!(
            Activity::low_stock(&m).description,
            "Low stock: Cement (2.5 bag)",
        );
    }
}
