//! In-memory [`Database`] backing the [`Service`] in tests.

#![allow(dead_code, reason = "not every test uses every helper")]

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use common::{
    operations::{By, Commit, Delete, Insert, Lock, Select, Transact, Update},
    DateTime,
};
use secrecy::{SecretBox, SecretString};
use service::{
    command::CreateUser,
    crypto::{PasswordHasher, TokenCodec},
    domain::{product, product_type, user, Product, ProductType, User},
    infra::{database, Database},
    read, Config, Service,
};
use tracerr::Traced;
use uuid::Uuid;

/// IDs of the seeded [`ProductType`]s.
pub const PRODUCT_TYPES: [&str; 5] = [
    "6c1f2b0e-5d0a-4a3c-9d43-0d1f3e7a0001",
    "6c1f2b0e-5d0a-4a3c-9d43-0d1f3e7a0002",
    "6c1f2b0e-5d0a-4a3c-9d43-0d1f3e7a0003",
    "6c1f2b0e-5d0a-4a3c-9d43-0d1f3e7a0004",
    "6c1f2b0e-5d0a-4a3c-9d43-0d1f3e7a0005",
];

/// Stored rows.
#[derive(Debug, Default)]
struct State {
    users: Vec<User>,
    product_types: Vec<ProductType>,
    products: Vec<Product>,

    /// Whether [`User`] lookups miss the stored rows.
    stale_reads: bool,
}

/// [`Database`] keeping everything in memory.
///
/// Transactions share the same storage and are never rolled back.
#[derive(Clone, Debug, Default)]
pub struct Memory(Arc<Mutex<State>>);

impl Memory {
    /// Creates a new [`Memory`] with the [`ProductType`]s catalogue seeded.
    pub fn seeded() -> Self {
        let names = ["Beverages", "Dairy", "Bakery", "Grocery", "Household"];
        let now = DateTime::now();
        let product_types = PRODUCT_TYPES
            .iter()
            .zip(names)
            .map(|(id, name)| ProductType {
                id: id.parse().unwrap(),
                name: product_type::Name::new(name).unwrap(),
                description: None,
                created_at: now.coerce(),
                updated_at: now.coerce(),
            })
            .collect();
        Self(Arc::new(Mutex::new(State {
            product_types,
            ..State::default()
        })))
    }

    /// Makes [`User`] lookups miss the already stored rows, as if they were
    /// committed by a concurrent transaction after the lookup.
    pub fn read_stale(&self) {
        self.state().stale_reads = true;
    }

    /// Returns all the stored [`User`]s.
    pub fn users(&self) -> Vec<User> {
        self.state().users.clone()
    }

    /// Returns all the stored [`Product`]s.
    pub fn products(&self) -> Vec<Product> {
        self.state().products.clone()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_product(state: &State, product: &Product) -> read::Product {
        let product_type = state
            .product_types
            .iter()
            .find(|t| t.id == product.product_type_id)
            .cloned()
            .unwrap();
        read::Product {
            product: product.clone(),
            product_type,
        }
    }
}

type Result<T> = std::result::Result<T, Traced<database::Error>>;

impl Database<Transact> for Memory {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<()> {
        Ok(())
    }
}

impl Database<Select<By<Option<User>, user::Id>>> for Memory {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok> {
        let id = by.into_inner();
        Ok(self.state().users.iter().find(|u| u.id == id).cloned())
    }
}

impl<'l> Database<Select<By<Option<User>, &'l user::Username>>> for Memory {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'l user::Username>>,
    ) -> Result<Self::Ok> {
        let name = by.into_inner();
        let state = self.state();
        if state.stale_reads {
            return Ok(None);
        }
        Ok(state.users.iter().find(|u| u.username == *name).cloned())
    }
}

impl<'l> Database<Select<By<Option<User>, &'l user::Email>>> for Memory {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'l user::Email>>,
    ) -> Result<Self::Ok> {
        let email = by.into_inner();
        let state = self.state();
        if state.stale_reads {
            return Ok(None);
        }
        Ok(state.users.iter().find(|u| u.email == *email).cloned())
    }
}

impl Database<Insert<User>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Insert(user): Insert<User>) -> Result<()> {
        let mut state = self.state();
        let violated = if state.users.iter().any(|u| u.username == user.username)
        {
            Some(CreateUser::USERNAME_CONSTRAINT)
        } else if state.users.iter().any(|u| u.email == user.email) {
            Some(CreateUser::EMAIL_CONSTRAINT)
        } else {
            None
        };
        if let Some(constraint) = violated {
            return Err(tracerr::new!(database::Error::UniqueViolation(
                constraint.to_owned(),
            )));
        }
        state.users.push(user);
        Ok(())
    }
}

impl Database<Update<User>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Update(user): Update<User>) -> Result<()> {
        if let Some(u) = self.state().users.iter_mut().find(|u| u.id == user.id)
        {
            *u = user;
        }
        Ok(())
    }
}

impl Database<Delete<By<User, user::Id>>> for Memory {
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<User, user::Id>>,
    ) -> Result<bool> {
        let id = by.into_inner();
        let mut state = self.state();
        let before = state.users.len();
        state.users.retain(|u| u.id != id);
        Ok(state.users.len() != before)
    }
}

impl Database<Lock<By<User, user::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Lock<By<User, user::Id>>) -> Result<()> {
        Ok(())
    }
}

impl Database<Select<By<Option<ProductType>, product_type::Id>>> for Memory {
    type Ok = Option<ProductType>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<ProductType>, product_type::Id>>,
    ) -> Result<Self::Ok> {
        let id = by.into_inner();
        Ok(self
            .state()
            .product_types
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }
}

impl Database<Select<By<Vec<ProductType>, ()>>> for Memory {
    type Ok = Vec<ProductType>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<ProductType>, ()>>,
    ) -> Result<Self::Ok> {
        let mut types = self.state().product_types.clone();
        types.sort_by_key(|t| t.name.to_string());
        Ok(types)
    }
}

impl Database<Select<By<Option<Product>, product::Id>>> for Memory {
    type Ok = Option<Product>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Product>, product::Id>>,
    ) -> Result<Self::Ok> {
        let id = by.into_inner();
        Ok(self.state().products.iter().find(|p| p.id == id).cloned())
    }
}

impl<'l> Database<Select<By<Option<Product>, &'l product::Name>>> for Memory {
    type Ok = Option<Product>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Product>, &'l product::Name>>,
    ) -> Result<Self::Ok> {
        let name = by.into_inner();
        Ok(self.state().products.iter().find(|p| p.name == *name).cloned())
    }
}

impl Database<Select<By<Option<read::Product>, product::Id>>> for Memory {
    type Ok = Option<read::Product>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<read::Product>, product::Id>>,
    ) -> Result<Self::Ok> {
        let id = by.into_inner();
        let state = self.state();
        Ok(state
            .products
            .iter()
            .find(|p| p.id == id)
            .map(|p| Self::read_product(&state, p)))
    }
}

impl
    Database<
        Select<By<read::product::list::Page, read::product::list::Selector>>,
    > for Memory
{
    type Ok = read::product::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::product::list::Page, read::product::list::Selector>,
        >,
    ) -> Result<Self::Ok> {
        let read::product::list::Selector { arguments, filter } =
            by.into_inner();
        let state = self.state();

        let mut matching = state
            .products
            .iter()
            .filter(|p| {
                filter
                    .product_type_id
                    .is_none_or(|id| p.product_type_id == id)
            })
            .collect::<Vec<_>>();
        matching.sort_by(|a, b| {
            b.created_at.cmp(&a.created_at).then_with(|| {
                Uuid::from(b.id).cmp(&Uuid::from(a.id))
            })
        });

        let total_count = matching.len() as u64;
        let nodes = matching
            .into_iter()
            .skip(usize::try_from(arguments.offset()).unwrap())
            .take(arguments.limit() as usize)
            .map(|p| Self::read_product(&state, p))
            .collect::<Vec<_>>();

        Ok(read::product::list::Page::new(nodes, total_count))
    }
}

impl Database<Insert<Product>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Insert(product): Insert<Product>) -> Result<()> {
        self.state().products.push(product);
        Ok(())
    }
}

impl Database<Update<Product>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Update(product): Update<Product>) -> Result<()> {
        if let Some(p) = self
            .state()
            .products
            .iter_mut()
            .find(|p| p.id == product.id)
        {
            *p = product;
        }
        Ok(())
    }
}

impl Database<Delete<By<Product, product::Id>>> for Memory {
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Product, product::Id>>,
    ) -> Result<bool> {
        let id = by.into_inner();
        let mut state = self.state();
        let before = state.products.len();
        state.products.retain(|p| p.id != id);
        Ok(state.products.len() != before)
    }
}

impl Database<Lock<By<Product, product::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Lock<By<Product, product::Id>>) -> Result<()> {
        Ok(())
    }
}

/// Creates a new [`Service`] over a freshly seeded [`Memory`].
pub fn service() -> Service<Memory> {
    let config = Config {
        password_hasher: PasswordHasher::new(PasswordHasher::MIN_COST)
            .unwrap(),
        token_codec: TokenCodec::new(
            &SecretString::from("test-secret"),
            Duration::from_secs(3600),
        )
        .unwrap(),
    };
    Service::new(config, Memory::seeded())
}

/// Wraps the provided `password` into a secret.
pub fn password(password: &str) -> SecretBox<user::Password> {
    SecretBox::new(Box::new(user::Password::new(password).unwrap()))
}

/// Parses the provided seeded [`ProductType`] ID.
pub fn seeded_type(index: usize) -> product_type::Id {
    PRODUCT_TYPES[index].parse().unwrap()
}
