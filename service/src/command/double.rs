//! In-memory [`Database`] for testing [`Command`]s.
//!
//! [`Command`]: super::Command

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use common::{
    operations::{Adjust, By, Commit, Insert, Lock, Select, Transact, Update},
    DateTime, Money, Percent, Quantity,
};
use tracerr::Traced;

use crate::{
    domain::{
        client, invoice,
        item::{Draft, Item},
        material::{self, Sku, StockAdjustment},
        numbering::{Document, Issued, Sequence, Series},
        project::{self, material as project_material},
        quote,
        text::Line,
        user, Client, Email, Invoice, Material, Project, ProjectMaterial,
        Quote, User,
    },
    infra::{database, Database},
    read::{client::OngoingProjects, material::References},
    Config, Service,
};

/// Builds an [`Item`] [`Draft`] out of the provided amounts.
pub(crate) fn draft(quantity: &str, unit_price: &str) -> Draft {
    Draft {
        description: Line::new("Concrete works").unwrap(),
        quantity: quantity.parse().unwrap(),
        unit: None,
        unit_price: unit_price.parse().unwrap(),
        notes: None,
    }
}

/// Stored entities.
#[derive(Debug, Default)]
pub(crate) struct State {
    pub(crate) clients: HashMap<client::Id, Client>,
    pub(crate) projects: HashMap<project::Id, Project>,
    pub(crate) materials: HashMap<material::Id, Material>,
    pub(crate) quotes: HashMap<quote::Id, Quote>,
    pub(crate) invoices: HashMap<invoice::Id, Invoice>,
    pub(crate) users: HashMap<user::Id, User>,
    pub(crate) project_materials:
        HashMap<project_material::Id, ProjectMaterial>,
}

/// Shared in-memory storage, being its own transaction.
#[derive(Clone, Debug, Default)]
pub(crate) struct Memory(Arc<Mutex<State>>);

/// [`Config`] of the [`Service`]s under test.
pub(crate) fn config() -> Config {
    let secret = b"construction-crm-test-secret";
    Config {
        jwt_encoding_key: jsonwebtoken::EncodingKey::from_secret(secret),
        jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(secret),
        token_ttl: Duration::from_secs(3600),
    }
}

impl Memory {
    /// Creates a new [`Service`] backed by an empty [`Memory`].
    pub(crate) fn service() -> Service<Self> {
        Service::new(config(), Self::default())
    }

    /// Locks the [`State`] for inspection.
    pub(crate) fn state(&self) -> MutexGuard<'_, State> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a new active [`Client`].
    pub(crate) fn client(&self, name: &str, email: Option<&str>) -> Client {
        let now = DateTime::now();
        let client = Client {
            id: client::Id::new(),
            name: Line::new(name).unwrap(),
            email: email.map(|e| Email::new(e).unwrap()),
            phone: None,
            address: None,
            city: None,
            state: None,
            zip_code: None,
            company: None,
            tax_id: None,
            contact_type: client::ContactType::default(),
            notes: None,
            is_active: true,
            created_at: now.coerce(),
            updated_at: now.coerce(),
            deleted_at: None,
        };
        drop(self.state().clients.insert(client.id, client.clone()));
        client
    }

    /// Stores a new [`Project`] of the provided [`Client`].
    pub(crate) fn project(
        &self,
        client_id: client::Id,
        status: project::Status,
    ) -> Project {
        let now = DateTime::now();
        let project = Project {
            id: project::Id::new(),
            client_id,
            code: project::Code::generate(now.coerce()),
            name: Line::new("House extension").unwrap(),
            description: None,
            status,
            priority: project::Priority::default(),
            kind: project::Kind::default(),
            address: None,
            city: None,
            state: None,
            zip_code: None,
            start_date: None,
            end_date: None,
            budget: Money::ZERO,
            estimated_cost: Money::ZERO,
            actual_cost: Money::ZERO,
            progress: project::Progress::default(),
            notes: None,
            created_at: now.coerce(),
            updated_at: now.coerce(),
            deleted_at: None,
        };
        drop(self.state().projects.insert(project.id, project.clone()));
        project
    }

    /// Stores a new active [`Material`] with the provided stock.
    pub(crate) fn material(&self, stock: &str) -> Material {
        let now = DateTime::now();
        let material = Material {
            id: material::Id::new(),
            name: Line::new("Cement").unwrap(),
            description: None,
            category: Line::new("Binders").unwrap(),
            unit: Line::new("bag").unwrap(),
            unit_price: "7.5".parse().unwrap(),
            supplier: None,
            sku: None,
            stock: stock.parse().unwrap(),
            min_stock: Quantity::ZERO,
            is_active: true,
            notes: None,
            created_at: now.coerce(),
            updated_at: now.coerce(),
            deleted_at: None,
        };
        drop(self.state().materials.insert(material.id, material.clone()));
        material
    }

    /// Stores a new [`User`] with the provided credentials.
    pub(crate) fn user(
        &self,
        email: &str,
        password: &str,
        is_active: bool,
    ) -> User {
        let now = DateTime::now();
        let user = User {
            id: user::Id::new(),
            email: Email::new(email).unwrap(),
            password_hash: user::PasswordHash::new(
                &user::Password::new(password).unwrap(),
            )
            .unwrap(),
            first_name: Line::new("Ana").unwrap(),
            last_name: Line::new("Builder").unwrap(),
            role: user::Role::default(),
            is_active,
            created_at: now.coerce(),
            updated_at: now.coerce(),
            deleted_at: None,
        };
        drop(self.state().users.insert(user.id, user.clone()));
        user
    }

    /// Stores a new untaxed [`Quote`] with a single [`Item`] worth `total`.
    pub(crate) fn quote(&self, status: quote::Status, total: &str) -> Quote {
        let client = self.client("Quoted", None);
        let now = DateTime::now();
        let series = quote::Number::series(now.coerce());
        let issued = self.issued(series);
        let mut quote = Quote {
            id: quote::Id::new(),
            number: quote::Number::new(&series, Sequence::after(issued)),
            client_id: client.id,
            project_id: None,
            title: Line::new("Bathroom tiling").unwrap(),
            description: None,
            status,
            valid_until: None,
            subtotal: Money::ZERO,
            tax_rate: Percent::ZERO,
            tax_amount: Money::ZERO,
            discount: Money::ZERO,
            total: Money::ZERO,
            notes: None,
            terms: None,
            items: vec![Item::new(draft("1", total), 0).unwrap()],
            created_at: now.coerce(),
            updated_at: now.coerce(),
            deleted_at: None,
        };
        quote.recompute();
        drop(self.state().quotes.insert(quote.id, quote.clone()));
        quote
    }

    /// Stores a new untaxed unpaid [`Invoice`] with a single [`Item`] worth
    /// `total`, settled if [`invoice::Status::Paid`].
    pub(crate) fn invoice(
        &self,
        status: invoice::Status,
        total: &str,
    ) -> Invoice {
        let client = self.client("Invoiced", None);
        let now = DateTime::now();
        let series = invoice::Number::series(now.coerce());
        let issued = self.issued(series);
        let mut invoice = Invoice {
            id: invoice::Id::new(),
            number: invoice::Number::new(&series, Sequence::after(issued)),
            client_id: client.id,
            project_id: None,
            quote_id: None,
            title: Line::new("Roof works").unwrap(),
            description: None,
            status,
            issue_date: now.coerce(),
            due_date: now.coerce(),
            paid_date: None,
            subtotal: Money::ZERO,
            tax_rate: Percent::ZERO,
            tax_amount: Money::ZERO,
            discount: Money::ZERO,
            total: Money::ZERO,
            paid_amount: Money::ZERO,
            balance: Money::ZERO,
            notes: None,
            terms: None,
            items: vec![Item::new(draft("1", total), 0).unwrap()],
            created_at: now.coerce(),
            updated_at: now.coerce(),
            deleted_at: None,
        };
        invoice.recompute();
        if status == invoice::Status::Paid {
            invoice.settle(now.coerce());
        }
        drop(self.state().invoices.insert(invoice.id, invoice.clone()));
        invoice
    }

    /// Counts documents ever created in the provided [`Series`].
    fn issued(&self, series: Series) -> Issued {
        let state = self.state();
        let count = match series.document {
            Document::Quote => state
                .quotes
                .values()
                .filter(|q| q.created_at.year_month() == series.month)
                .count(),
            Document::Invoice => state
                .invoices
                .values()
                .filter(|i| i.created_at.year_month() == series.month)
                .count(),
        };
        Issued::from(u32::try_from(count).unwrap())
    }
}

/// Implements keyed storage [`Database`] operations of an entity.
macro_rules! impl_storage {
    ($entity:ident, $module:ident, $field:ident) => {
        impl Database<Select<By<Option<$entity>, $module::Id>>> for Memory {
            type Ok = Option<$entity>;
            type Err = Traced<database::Error>;

            async fn execute(
                &self,
                Select(by): Select<By<Option<$entity>, $module::Id>>,
            ) -> Result<Self::Ok, Self::Err> {
                Ok(self
                    .state()
                    .$field
                    .get(&by.into_inner())
                    .filter(|e| e.deleted_at.is_none())
                    .cloned())
            }
        }

        impl Database<Lock<By<$entity, $module::Id>>> for Memory {
            type Ok = ();
            type Err = Traced<database::Error>;

            async fn execute(
                &self,
                _: Lock<By<$entity, $module::Id>>,
            ) -> Result<Self::Ok, Self::Err> {
                Ok(())
            }
        }

        impl Database<Insert<$entity>> for Memory {
            type Ok = ();
            type Err = Traced<database::Error>;

            async fn execute(
                &self,
                Insert(entity): Insert<$entity>,
            ) -> Result<Self::Ok, Self::Err> {
                drop(self.state().$field.insert(entity.id, entity));
                Ok(())
            }
        }

        impl Database<Update<$entity>> for Memory {
            type Ok = ();
            type Err = Traced<database::Error>;

            async fn execute(
                &self,
                Update(entity): Update<$entity>,
            ) -> Result<Self::Ok, Self::Err> {
                drop(self.state().$field.insert(entity.id, entity));
                Ok(())
            }
        }
    };
}

impl_storage!(Client, client, clients);
impl_storage!(Project, project, projects);
impl_storage!(Material, material, materials);
impl_storage!(Quote, quote, quotes);
impl_storage!(Invoice, invoice, invoices);
impl_storage!(User, user, users);

impl Database<Transact> for Memory {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl Database<Lock<Series>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Lock<Series>) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl Database<Select<By<Issued, Series>>> for Memory {
    type Ok = Issued;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Issued, Series>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.issued(by.into_inner()))
    }
}

impl<'l> Database<Select<By<Option<Client>, &'l Email>>> for Memory {
    type Ok = Option<Client>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Client>, &'l Email>>,
    ) -> Result<Self::Ok, Self::Err> {
        let email = by.into_inner().to_string();
        Ok(self
            .state()
            .clients
            .values()
            .find(|c| {
                c.deleted_at.is_none()
                    && c.email.as_ref().is_some_and(|e| {
                        e.to_string().eq_ignore_ascii_case(&email)
                    })
            })
            .cloned())
    }
}

impl Database<Select<By<OngoingProjects, client::Id>>> for Memory {
    type Ok = OngoingProjects;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<OngoingProjects, client::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let client_id = by.into_inner();
        let count = self
            .state()
            .projects
            .values()
            .filter(|p| {
                p.client_id == client_id
                    && p.deleted_at.is_none()
                    && project::Status::ONGOING.contains(&p.status)
            })
            .count();
        Ok(OngoingProjects(i64::try_from(count).unwrap()))
    }
}

impl Database<Adjust<StockAdjustment>> for Memory {
    type Ok = Option<Quantity>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Adjust(adjustment): Adjust<StockAdjustment>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut state = self.state();
        let Some(material) = state
            .materials
            .get_mut(&adjustment.material_id)
            .filter(|m| m.deleted_at.is_none())
        else {
            return Ok(None);
        };
        let stock = adjustment.apply(material.stock);
        if let Some(stock) = stock {
            material.stock = stock;
        }
        Ok(stock)
    }
}

impl<'l> Database<Select<By<Option<User>, &'l Email>>> for Memory {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'l Email>>,
    ) -> Result<Self::Ok, Self::Err> {
        let email = by.into_inner().to_string();
        Ok(self
            .state()
            .users
            .values()
            .find(|u| {
                u.deleted_at.is_none()
                    && u.email.to_string().eq_ignore_ascii_case(&email)
            })
            .cloned())
    }
}

impl<'l> Database<Select<By<Option<Material>, &'l Sku>>> for Memory {
    type Ok = Option<Material>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Material>, &'l Sku>>,
    ) -> Result<Self::Ok, Self::Err> {
        let sku = by.into_inner();
        Ok(self
            .state()
            .materials
            .values()
            .find(|m| m.deleted_at.is_none() && m.sku.as_ref() == Some(sku))
            .cloned())
    }
}

impl<'l> Database<Select<By<Option<Project>, &'l project::Code>>> for Memory {
    type Ok = Option<Project>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Project>, &'l project::Code>>,
    ) -> Result<Self::Ok, Self::Err> {
        let code = by.into_inner();
        Ok(self
            .state()
            .projects
            .values()
            .find(|p| p.deleted_at.is_none() && &p.code == code)
            .cloned())
    }
}

impl Database<Select<By<References, material::Id>>> for Memory {
    type Ok = References;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<References, material::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let material_id = by.into_inner();
        let count = self
            .state()
            .project_materials
            .values()
            .filter(|pm| pm.material_id == material_id)
            .count();
        Ok(References(i64::try_from(count).unwrap()))
    }
}

impl Database<Insert<ProjectMaterial>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(planned): Insert<ProjectMaterial>,
    ) -> Result<Self::Ok, Self::Err> {
        drop(self.state().project_materials.insert(planned.id, planned));
        Ok(())
    }
}
