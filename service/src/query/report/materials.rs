//! [`Materials`] report definition.

use std::collections::BTreeMap;

use common::{
    operations::{By, Select},
    Money, Quantity,
};
use serde::Serialize;
use tracerr::Traced;

use crate::{
    domain::Material,
    infra::{database, Database},
    read, Query, Service,
};

/// [`Query`] reporting the stock of live [`Material`]s.
#[derive(Clone, Debug)]
pub struct Materials(pub read::material::report::Filter);

/// Output of the [`Materials`] [`Query`].
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    /// Aggregated [`Summary`] of the [`Row`]s.
    pub summary: Summary,

    /// Reported [`Material`]s.
    #[serde(rename = "materials")]
    pub rows: Vec<Row>,
}

/// Summary of a [`Materials`] [`Report`].
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Summary {
    /// Number of reported [`Material`]s.
    pub total_materials: usize,

    /// Value of the whole reported stock.
    pub total_value: Money,

    /// Sum of the reported stock [`Quantity`]s.
    pub total_stock: Quantity,

    /// Number of reported [`Material`]s low on stock.
    pub low_stock_count: usize,

    /// [`CategoryStats`] of every present category.
    pub category_stats: BTreeMap<String, CategoryStats>,
}

/// Stock statistics of a single category.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct CategoryStats {
    /// Number of [`Material`]s in the category.
    pub count: usize,

    /// Value of the category stock.
    pub value: Money,

    /// Sum of the category stock [`Quantity`]s.
    pub stock: Quantity,
}

/// Single [`Material`] of a [`Report`].
#[derive(Clone, Debug, Serialize)]
pub struct Row {
    /// Reported [`Material`].
    #[serde(flatten)]
    pub material: Material,

    /// Value of the [`Material`] stock.
    pub value: Money,

    /// Whether the [`Material`] is low on stock.
    pub low_stock: bool,
}

impl Report {
    /// Builds a new [`Report`] out of the provided [`Material`]s.
    #[must_use]
    pub fn new(materials: Vec<Material>) -> Self {
        let rows = materials
            .into_iter()
            .map(|material| Row {
                value: material.stock_value(),
                low_stock: material.is_low_stock(),
                material,
            })
            .collect::<Vec<_>>();

        let mut summary = Summary {
            total_materials: rows.len(),
            ..Summary::default()
        };
        for row in &rows {
            let Row {
                material,
                value,
                low_stock,
            } = row;

            summary.total_value += *value;
            summary.total_stock = summary.total_stock + material.stock;
            if *low_stock {
                summary.low_stock_count += 1;
            }

            let category = summary
                .category_stats
                .entry(material.category.to_string())
                .or_default();
            category.count += 1;
            category.value += *value;
            category.stock = category.stock + material.stock;
        }

        Self { summary, rows }
    }
}

impl<Db> Query<Materials> for Service<Db>
where
    Db: Database<
        Select<By<Vec<Material>, read::material::report::Filter>>,
        Ok = Vec<Material>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Report;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Materials(filter): Materials,
    ) -> Result<Self::Ok, Self::Err> {
        self.database()
            .execute(Select(By::new(filter)))
            .await
            .map(Report::new)
            .map_err(tracerr::wrap!())
    }
}

#[cfg(test)]
mod spec {
    use common::{Money, Quantity};

    use crate::domain::{material::spec::material, text::Line};

    use super::Report;

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    #[test]
    fn groups_stock_by_category() {
        let cement = material("10", "5", "7.5");
        let low = material("2", "5", "10");
        let mut tiles = material("20", "0", "1.25");
        tiles.category = Line::new("Finishes").unwrap();

        let report = Report::new(vec![cement, low, tiles]);

        let summary = &report.summary;
        assert_eq!(summary.total_materials, 3);
        assert_eq!(summary.total_value, money("120"));
        assert_eq!(summary.total_stock, "32".parse::<Quantity>().unwrap());
        assert_eq!(summary.low_stock_count, 1);

        let masonry = summary.category_stats.get("Masonry").unwrap();
        assert_eq!(masonry.count, 2);
        assert_eq!(masonry.value, money("95"));
        assert_eq!(masonry.stock, "12".parse::<Quantity>().unwrap());
        let finishes = summary.category_stats.get("Finishes").unwrap();
        assert_eq!(finishes.count, 1);
        assert_eq!(finishes.value, money("25"));

        assert!(report.rows[1].low_stock);
        assert_eq!(report.rows[1].value, money("20"));
    }
}
